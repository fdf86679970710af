pub mod config;
pub mod error;
pub mod modules;
pub mod runtime;
pub mod tools;
pub mod transport;

pub use config::{HubConfig, ModuleConfig};
pub use error::{RegistryError, ToolError};
pub use modules::{AgriculturalModule, CultureModule, FinanceModule, TradeModule};
pub use tools::{
    Arguments, InputSchema, ParamSpec, ToolCallRequest, ToolCallResult, ToolContent,
    ToolDescriptor, ToolModule, ToolRegistry,
};
pub use transport::Server;
