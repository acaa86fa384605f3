//! Recipient routing — new ticket vs. reply to an existing ticket.
//!
//! Replies are addressed to `<mailbox>+<ticket uuid>@host`. Anything
//! else opens a new ticket.

use regex::Regex;
use tracing::debug;

use crate::inbound::types::RoutingDecision;

/// Classifies recipient headers for one support mailbox.
#[derive(Debug, Clone)]
pub struct RoutingClassifier {
    reply_address: Regex,
}

impl RoutingClassifier {
    /// Build a classifier for the given mailbox local part (e.g. `support`).
    pub fn new(support_mailbox: &str) -> Self {
        // 36 chars of hex and hyphens, the canonical UUID shape. No version check.
        let pattern = format!(r"(?i){}\+([a-f0-9\-]{{36}})@", regex::escape(support_mailbox));
        Self {
            reply_address: Regex::new(&pattern).expect("escaped mailbox yields valid regex"),
        }
    }

    /// Classify a raw `To` header. Total: every input is either a reply or a new ticket.
    pub fn classify(&self, recipient_header: &str) -> RoutingDecision {
        match self.reply_address.captures(recipient_header) {
            Some(caps) => {
                let ticket_id = caps[1].to_string();
                debug!(ticket_id = %ticket_id, "Recipient addresses an existing ticket");
                RoutingDecision::ReplyTo(ticket_id)
            }
            None => RoutingDecision::NewTicket,
        }
    }
}

impl Default for RoutingClassifier {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SUPPORT_MAILBOX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn plus_address_is_reply() {
        let r = RoutingClassifier::default();
        assert_eq!(
            r.classify(&format!("support+{ID}@tikm.test")),
            RoutingDecision::ReplyTo(ID.into())
        );
    }

    #[test]
    fn plus_address_inside_display_form() {
        let r = RoutingClassifier::default();
        let header = format!("Acme Support <support+{ID}@tikm.test>, other@x.com");
        assert_eq!(r.classify(&header), RoutingDecision::ReplyTo(ID.into()));
    }

    #[test]
    fn plain_support_address_is_new_ticket() {
        let r = RoutingClassifier::default();
        assert_eq!(r.classify("support@tikm.test"), RoutingDecision::NewTicket);
        assert_eq!(r.classify(""), RoutingDecision::NewTicket);
    }

    #[test]
    fn mailbox_match_is_case_insensitive() {
        let r = RoutingClassifier::default();
        let upper = ID.to_uppercase();
        assert_eq!(
            r.classify(&format!("SUPPORT+{upper}@tikm.test")),
            RoutingDecision::ReplyTo(upper)
        );
    }

    #[test]
    fn wrong_length_token_is_new_ticket() {
        let r = RoutingClassifier::default();
        assert_eq!(r.classify("support+1234@tikm.test"), RoutingDecision::NewTicket);
        let long = format!("support+{ID}0@tikm.test");
        assert_eq!(r.classify(&long), RoutingDecision::NewTicket);
    }

    #[test]
    fn non_hex_token_is_new_ticket() {
        let r = RoutingClassifier::default();
        let bad = "zzze4567-e89b-12d3-a456-426614174000";
        assert_eq!(r.classify(&format!("support+{bad}@tikm.test")), RoutingDecision::NewTicket);
    }

    #[test]
    fn other_mailbox_is_new_ticket() {
        let r = RoutingClassifier::default();
        assert_eq!(r.classify(&format!("sales+{ID}@tikm.test")), RoutingDecision::NewTicket);
    }

    #[test]
    fn custom_mailbox() {
        let r = RoutingClassifier::new("help.desk");
        assert_eq!(
            r.classify(&format!("help.desk+{ID}@tikm.test")),
            RoutingDecision::ReplyTo(ID.into())
        );
        // The dot is literal, not a wildcard.
        assert_eq!(r.classify(&format!("helpXdesk+{ID}@tikm.test")), RoutingDecision::NewTicket);
    }
}
