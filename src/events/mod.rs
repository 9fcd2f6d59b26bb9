pub mod webhook;

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc::UnboundedSender;

pub use webhook::WebhookSink;

/// Result of one asynchronous conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Success { file_name: String, content: Vec<u8> },
    Failure { file_name: String, error: String },
}

impl ConversionOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            ConversionOutcome::Success { file_name, .. } => file_name,
            ConversionOutcome::Failure { file_name, .. } => file_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }
}

/// Receives conversion outcomes. Implementations must tolerate concurrent,
/// out-of-order calls from several workers and must not block.
pub trait ResultSink: Send + Sync {
    fn publish(&self, outcome: ConversionOutcome);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&self, outcome: ConversionOutcome) {
        let worker = std::thread::current();
        let worker = worker.name().unwrap_or("unnamed");

        match &outcome {
            ConversionOutcome::Success { file_name, content } => info!(
                "Publishing successful conversion of {} ({} bytes) from thread {}",
                file_name,
                content.len(),
                worker
            ),
            ConversionOutcome::Failure { file_name, error } => info!(
                "Publishing unsuccessful conversion of {} from thread {}: {}",
                file_name, worker, error
            ),
        }
    }
}

/// Forwards outcomes into an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<ConversionOutcome>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<ConversionOutcome>) -> Self {
        Self { sender }
    }
}

impl ResultSink for ChannelSink {
    fn publish(&self, outcome: ConversionOutcome) {
        if let Err(e) = self.sender.send(outcome) {
            warn!("Dropping outcome for {}: receiver closed", e.0.file_name());
        }
    }
}

/// Fans each outcome out to every inner sink.
pub struct CompositeSink {
    sinks: Vec<Arc<dyn ResultSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn ResultSink>>) -> Self {
        Self { sinks }
    }
}

impl ResultSink for CompositeSink {
    fn publish(&self, outcome: ConversionOutcome) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.publish(outcome.clone());
            }
            last.publish(outcome);
        }
    }
}
