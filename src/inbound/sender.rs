//! Sender validation — keeps automated and malformed senders out.
//!
//! The denylist is a plain substring match over the whole address, so
//! `notnoreply@x.com` is rejected along with `noreply@x.com`.

use std::str::FromStr;

use lettre::Address;
use tracing::info;

use crate::inbound::types::IgnoreReason;

/// Gatekeeper for which senders may create or modify tickets.
#[derive(Debug, Clone)]
pub struct SenderValidator {
    denylist: Vec<String>,
}

impl SenderValidator {
    pub fn new(denylist: &[String]) -> Self {
        Self {
            denylist: denylist.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// `Ok(())` for an acceptable sender, otherwise the rejection reason.
    ///
    /// Checks run in order: empty, denylist, address syntax.
    pub fn check(&self, address: &str) -> Result<(), IgnoreReason> {
        if address.is_empty() {
            return Err(IgnoreReason::EmptyAddress);
        }

        let lowered = address.to_lowercase();
        if let Some(hit) = self.denylist.iter().find(|p| lowered.contains(p.as_str())) {
            return Err(IgnoreReason::Denylisted(hit.clone()));
        }

        if Address::from_str(address).is_err() {
            return Err(IgnoreReason::InvalidSyntax);
        }

        Ok(())
    }

    pub fn is_valid(&self, address: &str) -> bool {
        match self.check(address) {
            Ok(()) => true,
            Err(reason) => {
                info!(from = %address, %reason, "Sender rejected");
                false
            }
        }
    }
}

impl Default for SenderValidator {
    fn default() -> Self {
        Self::new(&crate::config::PipelineConfig::default().sender_denylist)
    }
}
