pub mod builder;
pub mod filter;
pub mod window;

pub use builder::TaskQuery;
pub use filter::{Filter, TaskField};
pub use window::MonthWindow;
