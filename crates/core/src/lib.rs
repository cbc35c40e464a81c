//! Tool calling for the voice agents: the tools the live session may invoke,
//! the typed arguments they take, and the backends that resolve them.

pub mod arguments;
pub mod catalog;
pub mod content;
pub mod dispatcher;
pub mod error;
pub mod registry;

pub use dispatcher::{Backends, ToolDispatcher, ToolInvocation, ToolResponse};
pub use error::{BackendError, ToolError};
pub use registry::{ToolDeclaration, ToolRegistry};
