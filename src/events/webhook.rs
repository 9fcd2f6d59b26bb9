use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest::Client;
use serde::Serialize;
use tokio::runtime::Handle;

use crate::events::{ConversionOutcome, ResultSink};

/// JSON notice posted to the webhook. Image bytes are not forwarded; consumers
/// fetch them through the retrieval endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeNotice {
    #[serde(rename_all = "camelCase")]
    Success {
        file_name: String,
        size: usize,
        completed_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        file_name: String,
        error: String,
        completed_at: DateTime<Utc>,
    },
}

impl From<&ConversionOutcome> for OutcomeNotice {
    fn from(outcome: &ConversionOutcome) -> Self {
        let completed_at = Utc::now();
        match outcome {
            ConversionOutcome::Success { file_name, content } => OutcomeNotice::Success {
                file_name: file_name.clone(),
                size: content.len(),
                completed_at,
            },
            ConversionOutcome::Failure { file_name, error } => OutcomeNotice::Failure {
                file_name: file_name.clone(),
                error: error.clone(),
                completed_at,
            },
        }
    }
}

/// Posts outcome notices to an HTTP endpoint on a detached task.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

impl ResultSink for WebhookSink {
    fn publish(&self, outcome: ConversionOutcome) {
        let notice = OutcomeNotice::from(&outcome);

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    "No runtime available, webhook notice for {} dropped",
                    outcome.file_name()
                );
                return;
            }
        };

        let client = self.client.clone();
        let url = self.url.clone();
        handle.spawn(async move {
            match client.post(&url).json(&notice).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Webhook {} accepted notice", url);
                }
                Ok(response) => {
                    error!("Webhook {} rejected notice with status {}", url, response.status());
                }
                Err(e) => error!("Webhook {} unreachable: {}", url, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_notice_carries_size_not_content() {
        let outcome = ConversionOutcome::Success {
            file_name: "abc.png".to_string(),
            content: vec![0; 42],
        };

        let json = serde_json::to_value(OutcomeNotice::from(&outcome)).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["fileName"], "abc.png");
        assert_eq!(json["size"], 42);
        assert!(json.get("content").is_none());
        assert!(json["completedAt"].is_string());
    }

    #[test]
    fn failure_notice_carries_error() {
        let outcome = ConversionOutcome::Failure {
            file_name: "abc.svg".to_string(),
            error: "svg is not supported".to_string(),
        };

        let json = serde_json::to_value(OutcomeNotice::from(&outcome)).unwrap();

        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "svg is not supported");
    }

    #[test]
    fn publishing_outside_a_runtime_is_dropped() {
        let sink = WebhookSink::new(Client::new(), "http://127.0.0.1:9/hook".to_string());
        sink.publish(ConversionOutcome::Failure {
            file_name: "x.png".to_string(),
            error: "e".to_string(),
        });
    }
}
