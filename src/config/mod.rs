mod module;
mod project;

pub use module::{ModuleConfig, ModulesConfig};
pub use project::{HubConfig, RetrySettings};
