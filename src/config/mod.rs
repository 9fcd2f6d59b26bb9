use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    pub timeout: u64,
    pub user_agent: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    pub result_webhook: Option<String>,
}

fn default_workers() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    500
}
