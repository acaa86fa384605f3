//! Inbound email processing.
//!
//! Every piped email flows through:
//! 1. `extract` — MIME parsing into an `InboundEmail`
//! 2. `sender` — automated/invalid sender rejection
//! 3. `routing` — new ticket vs. reply, from the recipient address
//! 4. `sanitize` — quote stripping and HTML-to-text
//! 5. `pipeline` — sequencing and dispatch to the `TicketStore`

pub mod extract;
pub mod pipeline;
pub mod routing;
pub mod sanitize;
pub mod sender;
pub mod types;

pub use pipeline::InboundPipeline;
pub use types::{
    Attachment, Dispatched, ExitStatus, IgnoreReason, InboundEmail, PipelineOutcome,
    RoutingDecision,
};
