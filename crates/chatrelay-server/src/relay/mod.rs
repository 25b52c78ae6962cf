//! Streaming relay core: event model, SSE framing, event sources and the
//! per-connection pump.

pub mod codec;
pub mod event;
pub mod pump;
pub mod registry;
pub mod scripts;
pub mod source;

pub use codec::{END_FRAME, encode};
pub use event::{CodeBlock, ContentType, DomainEvent, EventKind, StructuredContent, StructuredEvent};
pub use pump::{RelayContext, RelayOutcome, pump};
pub use registry::{ModelEntry, ModelRegistry, RegistryError};
pub use scripts::{ScriptKey, ScriptLibrary, ScriptPicker, ThreadRngPicker, select_script};
pub use source::{LiveCompletionSource, ScriptedSource, StreamSource};
