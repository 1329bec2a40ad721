use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MONTH_LABEL: &str = "{{year}}년 {{month}}월";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rag_api_url: String,
    pub calendar_api_url: String,
    pub event_limit: usize,
    pub request_timeout_secs: u64,
    pub month_label_template: String,
    pub user_display_name: String,
    pub agent_display_name: String,
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Replace the endpoints with the ones passed on the command line,
    /// if any.
    pub fn with_overrides(mut self, rag_api_url: Option<String>, calendar_api_url: Option<String>) -> Self {
        if let Some(url) = rag_api_url {
            // The calendar service lives on the same host unless told
            // otherwise
            if calendar_api_url.is_none() && self.calendar_api_url == self.rag_api_url {
                self.calendar_api_url = url.clone();
            }
            self.rag_api_url = url;
        }
        if let Some(url) = calendar_api_url {
            self.calendar_api_url = url;
        }
        self
    }
}

fn parse_env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let host = "127.0.0.1";
        let port = "8000";
        let rag_api_url =
            env::var("MINDUAL_RAG_API_URL").unwrap_or(format!("http://{}:{}", host, port));
        let calendar_api_url =
            env::var("MINDUAL_CALENDAR_API_URL").unwrap_or_else(|_| rag_api_url.clone());
        let event_limit = parse_env_or("MINDUAL_EVENT_LIMIT", 10);
        let request_timeout_secs = parse_env_or("MINDUAL_REQUEST_TIMEOUT_SECS", 30);
        let month_label_template =
            env::var("MINDUAL_MONTH_LABEL").unwrap_or_else(|_| DEFAULT_MONTH_LABEL.to_string());
        let user_display_name = env::var("MINDUAL_USER_NAME").unwrap_or_else(|_| "You".to_string());
        let agent_display_name =
            env::var("MINDUAL_AGENT_NAME").unwrap_or_else(|_| "Mindual".to_string());

        Self {
            rag_api_url: rag_api_url.trim_end_matches('/').to_string(),
            calendar_api_url: calendar_api_url.trim_end_matches('/').to_string(),
            event_limit,
            request_timeout_secs,
            month_label_template,
            user_display_name,
            agent_display_name,
        }
    }
}
