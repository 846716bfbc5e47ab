//! Tool handler abstraction, layered directory, and connection manager.

pub mod directory;
pub mod handler;
pub mod manager;

pub use directory::ToolDirectory;
pub use handler::{ToolDefinition, ToolHandler, ToolResult, ToolSchema};
pub use manager::{HandlerStatus, ToolConnectionManager};
