//! Persistence layer — the `TicketStore` seam and its libSQL backend.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::{AttachmentOwner, LibSqlTicketStore, StoredAttachment, StoredReply};
pub use traits::{ReplyRef, TicketRef, TicketStore};
