//! tikm-mailpipe — turns piped support email into tickets and replies.

pub mod config;
pub mod error;
pub mod inbound;
pub mod store;
