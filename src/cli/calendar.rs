use anyhow::{Result, anyhow};
use chrono::{Datelike, Local, NaiveDate};

use crate::calendar::{DateGridBuilder, EventStore, EventStoreConfig};
use crate::core::AppConfig;
use crate::view::render_month;

pub async fn run(config: &AppConfig, year: Option<i32>, month: Option<u32>) -> Result<()> {
    let today = Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    let reference = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(anyhow!("Invalid month {}-{}", year, month))?;

    let grid = DateGridBuilder::new(&config.month_label_template)?.build(reference, today)?;

    let events = EventStore::new(EventStoreConfig::from(config));
    events.initialize().await;

    print!("{}", render_month(&grid, &events.events()));
    Ok(())
}
