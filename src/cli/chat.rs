use anyhow::Result;
use chrono::Local;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::calendar::{DateGridBuilder, EventStore, EventStoreConfig};
use crate::chat::{ChatSession, SubmitOutcome};
use crate::core::AppConfig;
use crate::view::{Dashboard, render_reply};

pub async fn run(config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let events = EventStore::new(EventStoreConfig::from(config));
    let session = ChatSession::from_config(config, Some(events.clone()));
    let grid_builder = DateGridBuilder::new(&config.month_label_template)?;
    let dashboard = Dashboard::new(&session, &events, &grid_builder);

    session.initialize().await;
    let today = Local::now().date_naive();
    println!("{}", dashboard.render_calendar(today, today)?);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                session.set_draft(&line);
                let outcome = session.submit_draft().await;
                if let Some(reply) = render_reply(&session.messages()) {
                    println!("{}", reply);
                }

                // Redraw once the calendar has caught up with whatever
                // the reminder scheduled
                if outcome == (SubmitOutcome::Answered { reminder: true }) {
                    session.wait_for_background().await;
                    let today = Local::now().date_naive();
                    println!("{}", dashboard.render_calendar(today, today)?);
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                tracing::error!("Reading input failed: {:?}", err);
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}
