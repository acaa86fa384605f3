//! Inbound email pipeline.
//!
//! One run per email, strictly in order:
//! 1. `extract` — MIME bytes to `InboundEmail` (failure aborts)
//! 2. `SenderValidator` — automated or malformed senders are ignored
//! 3. `RoutingClassifier` — new ticket vs. reply
//! 4. `strip_quoted_reply` — durable message body
//! 5. Dispatch to the `TicketStore` (failure aborts)
//!
//! No retries anywhere. Redelivery is the mail transport's business.

use std::io::Read;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::inbound::extract::{extract, read_message};
use crate::inbound::routing::RoutingClassifier;
use crate::inbound::sanitize::strip_quoted_reply;
use crate::inbound::sender::SenderValidator;
use crate::inbound::types::{Dispatched, PipelineOutcome, RoutingDecision};
use crate::store::TicketStore;

/// Turns raw inbound emails into tickets and replies.
pub struct InboundPipeline {
    store: Arc<dyn TicketStore>,
    validator: SenderValidator,
    router: RoutingClassifier,
}

impl InboundPipeline {
    pub fn new(config: &PipelineConfig, store: Arc<dyn TicketStore>) -> Self {
        Self {
            store,
            validator: SenderValidator::new(&config.sender_denylist),
            router: RoutingClassifier::new(&config.support_mailbox),
        }
    }

    /// Read a whole message from `reader`, then process it.
    pub async fn process_reader<R: Read>(
        &self,
        reader: R,
    ) -> Result<PipelineOutcome, PipelineError> {
        let raw = read_message(reader).inspect_err(|e| error!("Failed to read email: {e}"))?;
        self.process(&raw).await
    }

    /// Process one raw MIME message.
    pub async fn process(&self, raw: &[u8]) -> Result<PipelineOutcome, PipelineError> {
        let mut email = extract(raw).inspect_err(|e| error!("Failed to parse email: {e}"))?;

        if let Err(reason) = self.validator.check(&email.from_address) {
            info!(from = %email.from_address, %reason, "Ignoring email from rejected sender");
            return Ok(PipelineOutcome::Ignored {
                sender: email.from_address,
                reason,
            });
        }

        let route = self.router.classify(&email.recipient_header);
        email.body_text = strip_quoted_reply(&email.body_text);

        let dispatched = match route {
            RoutingDecision::NewTicket => {
                let ticket = self
                    .store
                    .create_ticket_from_email(&email)
                    .await
                    .inspect_err(|e| error!(from = %email.from_address, "Ticket creation failed: {e}"))?;
                info!(
                    ticket_id = %ticket.id,
                    from = %email.from_address,
                    attachments = email.attachments.len(),
                    "Ticket created from email"
                );
                Dispatched::Ticket(ticket)
            }
            RoutingDecision::ReplyTo(ticket_id) => {
                let reply = self
                    .store
                    .create_reply_from_email(&ticket_id, &email)
                    .await
                    .inspect_err(|e| error!(ticket_id = %ticket_id, "Reply creation failed: {e}"))?;
                info!(
                    ticket_id = %ticket_id,
                    reply_id = %reply.id,
                    from = %email.from_address,
                    "Reply added from email"
                );
                Dispatched::Reply(reply)
            }
        };

        Ok(PipelineOutcome::Processed(dispatched))
    }
}
