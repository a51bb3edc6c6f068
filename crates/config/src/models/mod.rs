pub mod app_config;
pub mod catalog;
pub mod dispatch;
pub mod observability;
pub mod retention;
pub mod server;

pub use app_config::*;
pub use catalog::*;
pub use dispatch::*;
pub use observability::*;
pub use retention::*;
pub use server::*;
