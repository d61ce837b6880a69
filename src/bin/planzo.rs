use clap::{Parser, Subcommand};

use planzo::config::{ServerConfig, DEFAULT_BIND};
use planzo::model::{MemberRole, TaskStatus};

#[derive(Parser)]
#[command(name = "planzo", about = "Planzo workspaces, tasks and analytics")]
struct Cli {
    /// Database path (default: ~/.planzo/planzo.db)
    #[arg(long, env = "PLANZO_DB")]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "PLANZO_BIND", default_value = DEFAULT_BIND)]
        bind: String,
    },
    /// Manage users and sessions
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },
    /// Manage members of a workspace
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Month-over-month task analytics
    Analytics {
        #[command(subcommand)]
        target: AnalyticsTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user and print a session token for it
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Issue another session token for an existing user
    Token { user_id: String },
}

#[derive(Subcommand)]
enum WorkspaceAction {
    /// Create a workspace owned by --user
    Create {
        name: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List the workspaces --user belongs to
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Join a workspace with its invite code
    Join {
        workspace_id: String,
        code: String,
        #[arg(long)]
        user: String,
    },
    /// Generate a new invite code (admin only)
    ResetInvite {
        workspace_id: String,
        #[arg(long)]
        user: String,
    },
    /// Delete a workspace and everything in it (admin only)
    Delete {
        workspace_id: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum MemberAction {
    /// List members of a workspace
    List {
        workspace_id: String,
        #[arg(long)]
        user: String,
    },
    /// Change a member's role (admin only)
    Role {
        member_id: String,
        /// ADMIN or MEMBER
        role: MemberRole,
        #[arg(long)]
        user: String,
    },
    /// Remove a member
    Remove {
        member_id: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project in a workspace
    Create {
        workspace_id: String,
        name: String,
        #[arg(long)]
        user: String,
    },
    /// List projects in a workspace
    List {
        workspace_id: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task to a project
    Add {
        project_id: String,
        name: String,
        #[arg(long)]
        user: String,
        /// Assignee user id (default: --user)
        #[arg(long)]
        assignee: Option<String>,
        /// BACKLOG, TODO, IN_PROGRESS, IN_REVIEW or DONE
        #[arg(long, default_value = "TODO")]
        status: TaskStatus,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List tasks in a workspace
    List {
        workspace_id: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AnalyticsTarget {
    /// Analytics for a workspace
    Workspace {
        workspace_id: String,
        #[command(flatten)]
        opts: AnalyticsOpts,
    },
    /// Analytics for a project
    Project {
        project_id: String,
        #[command(flatten)]
        opts: AnalyticsOpts,
    },
}

#[derive(clap::Args)]
struct AnalyticsOpts {
    /// Requesting user id
    #[arg(long)]
    user: String,
    /// Evaluate as of this instant instead of now (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    now: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => planzo::Database::open_at(path).await?,
        None => planzo::Database::open().await?,
    };

    match cli.command {
        Commands::Serve { bind } => {
            let config = ServerConfig::new(&bind)?;
            planzo::web::run_server(db, &config).await?;
        }
        Commands::User { action } => handle_user(&db, action).await?,
        Commands::Workspace { action } => handle_workspace(&db, action).await?,
        Commands::Member { action } => handle_member(&db, action).await?,
        Commands::Project { action } => handle_project(&db, action).await?,
        Commands::Task { action } => handle_task(&db, action).await?,
        Commands::Analytics { target } => handle_analytics(&db, target).await?,
    }

    Ok(())
}

async fn handle_user(db: &planzo::Database, action: UserAction) -> anyhow::Result<()> {
    match action {
        UserAction::Add { name, email } => {
            let (user, token) = planzo::users::create_user(db, &name, email.as_deref()).await?;
            println!("Created user {} ({})", user.name, user.id);
            println!("Session token: {token}");
        }
        UserAction::Token { user_id } => {
            let token = planzo::users::issue_session(db, &user_id).await?;
            println!("{token}");
        }
    }
    Ok(())
}

async fn handle_workspace(db: &planzo::Database, action: WorkspaceAction) -> anyhow::Result<()> {
    use planzo::workspaces::{self, NewWorkspace};

    match action {
        WorkspaceAction::Create { name, user, image_url } => {
            let ws = workspaces::create_workspace(db, &user, NewWorkspace { name, image_url }).await?;
            println!("Created workspace {} ({})", ws.name, ws.id);
            println!("  Invite code: {}", ws.invite_code);
        }
        WorkspaceAction::List { user, json } => {
            let list = workspaces::list_workspaces(db, &user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("No workspaces.");
            } else {
                for ws in &list {
                    println!("  {:<34} {:<8} {}", ws.id, ws.invite_code, ws.name);
                }
            }
        }
        WorkspaceAction::Join { workspace_id, code, user } => {
            let ws = workspaces::join_workspace(db, &workspace_id, &user, &code).await?;
            println!("Joined workspace {}", ws.name);
        }
        WorkspaceAction::ResetInvite { workspace_id, user } => {
            let ws = workspaces::reset_invite_code(db, &workspace_id, &user).await?;
            println!("New invite code: {}", ws.invite_code);
        }
        WorkspaceAction::Delete { workspace_id, user } => {
            let id = workspaces::delete_workspace(db, &workspace_id, &user).await?;
            println!("Deleted workspace {id}");
        }
    }
    Ok(())
}

async fn handle_member(db: &planzo::Database, action: MemberAction) -> anyhow::Result<()> {
    use planzo::members;

    match action {
        MemberAction::List { workspace_id, user } => {
            for m in members::list_members(db, &workspace_id, &user).await? {
                println!(
                    "  {:<34} {:<7} {} {}",
                    m.member.id,
                    m.member.role.as_str(),
                    m.name.as_deref().unwrap_or(&m.member.user_id),
                    m.email.as_deref().map(|e| format!("<{e}>")).unwrap_or_default(),
                );
            }
        }
        MemberAction::Role { member_id, role, user } => {
            let m = members::update_member_role(db, &member_id, role, &user).await?;
            println!("Member {} is now {}", m.id, m.role.as_str());
        }
        MemberAction::Remove { member_id, user } => {
            let id = members::remove_member(db, &member_id, &user).await?;
            println!("Removed member {id}");
        }
    }
    Ok(())
}

async fn handle_project(db: &planzo::Database, action: ProjectAction) -> anyhow::Result<()> {
    use planzo::projects::{self, NewProject};

    match action {
        ProjectAction::Create { workspace_id, name, user } => {
            let input = NewProject {
                workspace_id,
                name,
                image_url: None,
            };
            let p = projects::create_project(db, &user, input).await?;
            println!("Created project {} ({})", p.name, p.id);
        }
        ProjectAction::List { workspace_id, user, json } => {
            let list = projects::list_projects(db, &workspace_id, &user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for p in &list {
                    println!("  {:<34} {}", p.id, p.name);
                }
            }
        }
    }
    Ok(())
}

async fn handle_task(db: &planzo::Database, action: TaskAction) -> anyhow::Result<()> {
    use planzo::tasks::{self, NewTask, TaskFilter};

    match action {
        TaskAction::Add {
            project_id,
            name,
            user,
            assignee,
            status,
            due,
            description,
        } => {
            let project = planzo::projects::get_project(db, &project_id, &user).await?;
            let input = NewTask {
                workspace_id: project.workspace_id,
                project_id,
                assignee_id: assignee.unwrap_or_else(|| user.clone()),
                name,
                description,
                status,
                due_date: due,
            };
            let t = tasks::create_task(db, &user, input).await?;
            println!("Created task {} ({}) at position {}", t.name, t.id, t.position);
        }
        TaskAction::List {
            workspace_id,
            user,
            project,
            assignee,
            status,
            json,
        } => {
            let filter = TaskFilter {
                project_id: project,
                assignee_id: assignee,
                status,
                ..TaskFilter::workspace(workspace_id)
            };
            let list = tasks::list_tasks(db, &filter, &user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for t in &list {
                    println!(
                        "  {:<34} {:<11} {:>7} {:<10} {}",
                        t.id,
                        t.status.as_str(),
                        t.position,
                        t.due_date.as_deref().map(|d| &d[..10]).unwrap_or("-"),
                        t.name
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_analytics(db: &planzo::Database, target: AnalyticsTarget) -> anyhow::Result<()> {
    let (label, id, opts) = match &target {
        AnalyticsTarget::Workspace { workspace_id, opts } => ("Workspace", workspace_id, opts),
        AnalyticsTarget::Project { project_id, opts } => ("Project", project_id, opts),
    };
    let now = match &opts.now {
        Some(s) => planzo::date_util::parse_instant(s)?,
        None => chrono::Utc::now(),
    };

    let result = match &target {
        AnalyticsTarget::Workspace { .. } => {
            planzo::analytics::workspace_analytics(db, id, &opts.user, now).await?
        }
        AnalyticsTarget::Project { .. } => {
            planzo::analytics::project_analytics(db, id, &opts.user, now).await?
        }
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{label} Analytics: {id} ({})", now.format("%Y-%m"));
        print_analytics(&result);
    }
    Ok(())
}

fn print_analytics(r: &planzo::AnalyticsResult) {
    println!("  {:<12} {:>6} {:>7}", "", "Count", "Δ");
    println!("  {:<12} {:>6} {:>+7}", "Total", r.task_count, r.task_difference);
    println!("  {:<12} {:>6} {:>+7}", "Assigned", r.assignee_task_count, r.assignee_task_difference);
    println!("  {:<12} {:>6} {:>+7}", "Completed", r.completed_task_count, r.completed_task_difference);
    println!("  {:<12} {:>6} {:>+7}", "Incomplete", r.incomplete_task_count, r.incomplete_task_difference);
    println!("  {:<12} {:>6} {:>+7}", "Overdue", r.overdue_task_count, r.overdue_task_difference);
}
