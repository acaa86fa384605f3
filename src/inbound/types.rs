//! Shared types for the inbound email pipeline.

use serde::{Deserialize, Serialize};

use crate::store::{ReplyRef, TicketRef};

/// Placeholder body used when nothing human-authored survives extraction.
pub const NO_CONTENT_PLACEHOLDER: &str = "No content available.";

/// Subject used when the `Subject` header is absent.
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// MIME type used when an attachment part carries no content type.
pub const DEFAULT_ATTACHMENT_MIME: &str = "application/octet-stream";

// ── Inbound email ───────────────────────────────────────────────────

/// One parsed inbound email. Lives for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEmail {
    pub from_address: String,
    /// Falls back to the raw `From` header when no `Name <addr>` form matched.
    pub from_display_name: String,
    /// Raw `To` header, only used for routing.
    pub recipient_header: String,
    pub subject: String,
    /// Plain-text body. Sanitized once the pipeline has run; never empty.
    pub body_text: String,
    pub attachments: Vec<Attachment>,
    /// `Message-ID` header, if the message carried one.
    pub message_id: Option<String>,
}

/// A decoded attachment. Only built when both filename and content exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl Attachment {
    /// Returns `None` when either the filename or the content is missing.
    pub fn new(
        filename: Option<&str>,
        content: &[u8],
        mime_type: Option<String>,
    ) -> Option<Self> {
        let filename = filename.map(str::trim).filter(|f| !f.is_empty())?;
        if content.is_empty() {
            return None;
        }
        Some(Self {
            filename: filename.to_string(),
            content: content.to_vec(),
            mime_type: mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_MIME.to_string()),
        })
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

// ── Routing ─────────────────────────────────────────────────────────

/// New ticket vs. reply to an existing one, decided from the `To` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ticket_id", rename_all = "snake_case")]
pub enum RoutingDecision {
    NewTicket,
    ReplyTo(String),
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Why a sender was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyAddress,
    /// Address contained this denylisted substring.
    Denylisted(String),
    InvalidSyntax,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAddress => write!(f, "empty sender address"),
            Self::Denylisted(pattern) => write!(f, "sender matches denylisted pattern {pattern:?}"),
            Self::InvalidSyntax => write!(f, "sender address is not a valid email address"),
        }
    }
}

/// What the store handed back after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Ticket(TicketRef),
    Reply(ReplyRef),
}

/// Non-error result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Processed(Dispatched),
    /// The sender was rejected; nothing was written.
    Ignored { sender: String, reason: IgnoreReason },
}

impl PipelineOutcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Processed(_) => ExitStatus::Processed,
            Self::Ignored { .. } => ExitStatus::Ignored,
        }
    }
}

/// Status reported to the invoking mail transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Processed,
    Ignored,
    Failed,
}

impl ExitStatus {
    /// Process exit code. Ignored mail is a success as far as the MTA is concerned.
    pub fn code(self) -> u8 {
        match self {
            Self::Processed | Self::Ignored => 0,
            Self::Failed => 1,
        }
    }
}
