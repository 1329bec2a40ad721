//! Builds the month grid shown next to the chat. The grid always
//! starts on a Sunday and is padded with empty cells so every row is a
//! full week.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::core::config::DEFAULT_MONTH_LABEL;

const MONTH_LABEL: &str = "month_label";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub iso_date: String,
    pub day_number: u32,
    pub is_today: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CalendarCell {
    Empty,
    Day(DayCell),
}

impl CalendarCell {
    pub fn day(&self) -> Option<&DayCell> {
        match self {
            CalendarCell::Day(d) => Some(d),
            CalendarCell::Empty => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    /// 1-based month
    pub month: u32,
    pub label: String,
    pub cells: Vec<CalendarCell>,
}

impl MonthGrid {
    /// Rows of 7 cells, Sunday first.
    pub fn weeks(&self) -> std::slice::Chunks<'_, CalendarCell> {
        self.cells.chunks(7)
    }

    pub fn day_count(&self) -> usize {
        self.cells.iter().filter(|c| c.day().is_some()).count()
    }
}

fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = first_of_next
        .and_then(|d| d.pred_opt())
        .ok_or(anyhow!("Year {} is out of range", year))?;
    Ok(last.day())
}

pub struct DateGridBuilder {
    templates: Handlebars<'static>,
}

impl DateGridBuilder {
    /// `label_template` is a Handlebars template with `year` and
    /// `month` (1-based) in scope.
    pub fn new(label_template: &str) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates.register_escape_fn(handlebars::no_escape);
        templates
            .register_template_string(MONTH_LABEL, label_template)
            .with_context(|| format!("Invalid month label template {:?}", label_template))?;
        Ok(Self { templates })
    }

    pub fn label(&self, year: i32, month: u32) -> Result<String> {
        let label = self
            .templates
            .render(MONTH_LABEL, &json!({"year": year, "month": month}))?;
        Ok(label)
    }

    /// Materialize the month containing `reference`. Only the year and
    /// month of `reference` are used; `today` decides which cell is
    /// highlighted.
    pub fn build(&self, reference: NaiveDate, today: NaiveDate) -> Result<MonthGrid> {
        let year = reference.year();
        let month = reference.month();
        let first = reference
            .with_day(1)
            .ok_or(anyhow!("Invalid reference date {}", reference))?;
        let leading = first.weekday().num_days_from_sunday() as usize;
        let last_day = days_in_month(year, month)?;

        let mut cells = vec![CalendarCell::Empty; leading];
        cells.reserve(last_day as usize + 6);
        for (offset, date) in first.iter_days().take(last_day as usize).enumerate() {
            cells.push(CalendarCell::Day(DayCell {
                iso_date: date.format("%Y-%m-%d").to_string(),
                day_number: offset as u32 + 1,
                is_today: date == today,
            }));
        }
        while cells.len() % 7 != 0 {
            cells.push(CalendarCell::Empty);
        }

        Ok(MonthGrid {
            year,
            month,
            label: self.label(year, month)?,
            cells,
        })
    }

    /// Same as `build` but takes a zero-based month the way date
    /// pickers hand it over. Rejects dates that don't exist.
    pub fn build_ymd(&self, year: i32, month0: u32, day: u32, today: NaiveDate) -> Result<MonthGrid> {
        if month0 > 11 {
            bail!("Month index {} is out of range (expected 0-11)", month0);
        }
        let reference = NaiveDate::from_ymd_opt(year, month0 + 1, day)
            .ok_or(anyhow!("Invalid date {}-{}-{}", year, month0 + 1, day))?;
        self.build(reference, today)
    }
}

impl Default for DateGridBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MONTH_LABEL).expect("Failed to register template")
    }
}
