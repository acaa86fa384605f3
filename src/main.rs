use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use tikm_mailpipe::config::AppConfig;
use tikm_mailpipe::inbound::{Dispatched, ExitStatus, InboundPipeline, PipelineOutcome};
use tikm_mailpipe::store::LibSqlTicketStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // stdout may be captured by the MTA, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let status = match run().await {
        Ok(PipelineOutcome::Processed(Dispatched::Ticket(ticket))) => {
            eprintln!("Processed: created ticket {}", ticket.id);
            ExitStatus::Processed
        }
        Ok(PipelineOutcome::Processed(Dispatched::Reply(reply))) => {
            eprintln!(
                "Processed: added reply {} to ticket {}",
                reply.id, reply.ticket_id
            );
            ExitStatus::Processed
        }
        Ok(PipelineOutcome::Ignored { sender, reason }) => {
            eprintln!("Ignored: email from {sender:?} ({reason})");
            ExitStatus::Ignored
        }
        Err(e) => {
            eprintln!("Failed: {e:?}");
            ExitStatus::Failed
        }
    };

    ExitCode::from(status.code())
}

async fn run() -> anyhow::Result<PipelineOutcome> {
    let config = AppConfig::from_env().context("Invalid configuration")?;

    let store = LibSqlTicketStore::new_local(&config.db_path)
        .await
        .with_context(|| format!("Failed to open ticket database at {}", config.db_path.display()))?;

    let pipeline = InboundPipeline::new(&config.pipeline, Arc::new(store));

    let outcome = match std::env::args_os().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path.to_string_lossy()))?;
            pipeline.process_reader(file).await
        }
        None => pipeline.process_reader(std::io::stdin().lock()).await,
    };

    outcome.context("Failed to process inbound email")
}
