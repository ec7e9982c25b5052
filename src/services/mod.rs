//! Service implementations for the Chatty client.
//!
//! Request payload construction, the streaming processor, and model catalog
//! management.

mod models;
mod payload;
mod stream;

pub use models::{ModelCatalog, ModelsService};
pub use payload::{build_payload, PayloadOptions};
pub use stream::{
    CollectedReply, ProcessorState, StreamEvent, StreamHandle, StreamOutcome, StreamProcessor,
    StreamSummary,
};
