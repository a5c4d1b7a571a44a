//! Conversation runtime: drives a streaming chat with tool calling.
//!
//! The [`ConversationDriver`] opens a model stream, forwards text to an
//! [`EventChannel`], reassembles tool calls with a [`ToolCallAccumulator`],
//! runs them through the [`ToolDispatcher`], and resubmits until the model
//! answers without calling tools.

pub mod accumulator;
pub mod dispatcher;
pub mod driver;
pub mod events;

pub use accumulator::{ToolCallAccumulator, ToolCallRecord};
pub use dispatcher::{ToolDispatcher, ToolResult, progress_notice};
pub use driver::{
    AgentError, ConversationDriver, ConversationHandle, ConversationOutcome, DriverSettings,
};
pub use events::{ChatEvent, EventChannel, EventKind};
