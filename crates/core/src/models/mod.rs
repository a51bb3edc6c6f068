pub mod handle;
pub mod outcome;
pub mod request;
pub mod service;
pub mod trigger;

pub use handle::InstanceHandle;
pub use outcome::CallOutcome;
pub use request::CdsRequest;
pub use service::{CatalogDocument, ServiceDefinition};
pub use trigger::{HookContext, TriggerRequest};
