use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::chat::{ChatSession, SubmitOutcome};
use crate::core::AppConfig;
use crate::rag::RagQuery;
use crate::view::render_reply;

pub async fn run(
    config: &AppConfig,
    question: String,
    error_code: Option<String>,
    device_state: Option<String>,
) -> Result<()> {
    let mut query = RagQuery::new(&question);
    if let Some(code) = error_code {
        query = query.error_code(&code);
    }
    if let Some(raw) = device_state {
        let state: Value = serde_json::from_str(&raw)
            .with_context(|| format!("--device-state is not valid json: {}", raw))?;
        query = query.device_state(state);
    }

    let session = ChatSession::from_config(config, None);
    let outcome = session.submit_query(query).await;
    if let Some(reply) = render_reply(&session.messages()) {
        println!("{}", reply);
    }

    match outcome {
        SubmitOutcome::Rejected => bail!("Question is empty"),
        SubmitOutcome::Failed => bail!("Could not reach {}", config.rag_api_url),
        SubmitOutcome::Answered { .. } => Ok(()),
    }
}
