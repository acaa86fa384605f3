//! MIME extraction — raw message bytes to an `InboundEmail` draft.
//!
//! `From` and `To` are mandatory. Everything else degrades: a missing
//! subject gets a default, a missing body gets the placeholder text, and
//! an attachment that cannot be decoded is dropped with a warning.

use std::io::Read;
use std::sync::OnceLock;

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::MailError;
use crate::inbound::sanitize::html_to_text;
use crate::inbound::types::{Attachment, DEFAULT_SUBJECT, InboundEmail, NO_CONTENT_PLACEHOLDER};

/// Read a complete message from a stream.
pub fn read_message<R: Read>(mut reader: R) -> Result<Vec<u8>, MailError> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(MailError::Empty);
    }
    Ok(raw)
}

/// Parse raw MIME bytes into an `InboundEmail`.
///
/// The body is extracted but not yet quote-stripped.
pub fn extract(raw: &[u8]) -> Result<InboundEmail, MailError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(MailError::Empty);
    }

    // Input the parser cannot make sense of carries no usable headers.
    let message = MessageParser::default()
        .parse(raw)
        .ok_or(MailError::MissingHeader("From"))?;

    let from = header_text(&message, "From").ok_or(MailError::MissingHeader("From"))?;
    let to = header_text(&message, "To").ok_or(MailError::MissingHeader("To"))?;

    let (from_address, mut from_display_name) = parse_from_header(&from);

    // Encoded-word display names are only readable after MIME decoding.
    if from_display_name.contains("=?")
        && let Some(decoded) = message
            .from()
            .and_then(|addr| addr.first())
            .and_then(|a| a.name())
    {
        from_display_name = decoded.to_string();
    }

    let subject = message
        .subject()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUBJECT)
        .to_string();

    let body_text = extract_body(&message);
    let attachments = extract_attachments(&message);
    let message_id = message.message_id().map(|s| s.to_string());

    debug!(
        from = %from_address,
        subject = %subject,
        attachments = attachments.len(),
        "Email extracted"
    );

    Ok(InboundEmail {
        from_address,
        from_display_name,
        recipient_header: to,
        subject,
        body_text,
        attachments,
        message_id,
    })
}

/// Unfolded, trimmed raw header value. Blank headers count as absent.
fn header_text(message: &Message<'_>, name: &str) -> Option<String> {
    let raw = message.header_raw(name)?;
    let unfolded = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if unfolded.is_empty() {
        None
    } else {
        Some(unfolded)
    }
}

fn from_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)\s*<(.+?)>").expect("valid From regex"))
}

/// Split a `From` header into `(address, display name)`.
///
/// `Name <addr>` yields the bracketed address and the name with quotes
/// stripped. Anything else is used verbatim for both.
pub fn parse_from_header(from: &str) -> (String, String) {
    match from_pattern().captures(from) {
        Some(caps) => {
            let name = caps[1].trim().trim_matches(|c| c == '"' || c == '\'');
            (caps[2].trim().to_string(), name.trim().to_string())
        }
        None => (from.to_string(), from.to_string()),
    }
}

/// Plain text if present, else converted HTML, else the placeholder.
fn extract_body(message: &Message<'_>) -> String {
    let plain = message.text_bodies().find_map(|part| match &part.body {
        PartType::Text(text) if !text.trim().is_empty() => Some(text.to_string()),
        _ => None,
    });
    if let Some(text) = plain {
        return text;
    }

    let html = message.html_bodies().find_map(|part| match &part.body {
        PartType::Html(html) if !html.trim().is_empty() => Some(html.to_string()),
        _ => None,
    });
    if let Some(html) = html {
        debug!("No plain-text part, converting HTML body");
        return html_to_text(&html);
    }

    NO_CONTENT_PLACEHOLDER.to_string()
}

fn extract_attachments(message: &Message<'_>) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    for (index, part) in message.attachments().enumerate() {
        match attachment_from_part(part) {
            Some(att) => attachments.push(att),
            None => {
                warn!(
                    index,
                    filename = part.attachment_name().unwrap_or("(none)"),
                    "Skipping attachment without filename or content"
                );
            }
        }
    }
    attachments
}

fn attachment_from_part(part: &MessagePart<'_>) -> Option<Attachment> {
    let mime_type = part.content_type().map(|ct| match ct.subtype() {
        Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
        None => ct.ctype().to_string(),
    });
    Attachment::new(part.attachment_name(), part.contents(), mime_type)
}
