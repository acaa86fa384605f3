//! The `TicketStore` seam — where parsed email leaves the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::inbound::types::InboundEmail;

/// A ticket as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRef {
    /// UUID-shaped ticket identifier.
    pub id: String,
    pub subject: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A reply appended to an existing ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRef {
    pub id: String,
    pub ticket_id: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence for tickets created from email.
///
/// Each call is one logical write; implementations must not partially commit.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Open a new ticket from the sender, subject, sanitized body and attachments.
    async fn create_ticket_from_email(
        &self,
        email: &InboundEmail,
    ) -> Result<TicketRef, DatabaseError>;

    /// Append a reply to `ticket_id`. Fails with `NotFound` for an unknown ticket.
    async fn create_reply_from_email(
        &self,
        ticket_id: &str,
        email: &InboundEmail,
    ) -> Result<ReplyRef, DatabaseError>;

    /// Look a ticket up by identifier.
    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<TicketRef>, DatabaseError>;
}
