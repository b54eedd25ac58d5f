//! Test helpers shared across Flashdeck crates.

pub mod blob;
pub mod transport;

pub use blob::ControlledBlobStore;
pub use transport::{ScriptedTransport, api_error_body, chat_body, function_body};
