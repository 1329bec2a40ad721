//! Plain text rendering of the chat and the calendar for the terminal.
//!
//! Views never hold state of their own. They draw whatever snapshot
//! they are handed so what's on screen is always a committed state.

use std::fmt::Write;

use anyhow::Result;
use chrono::NaiveDate;

use crate::calendar::{
    CalendarCell, CalendarEvent, DateGridBuilder, EventStore, MonthGrid, events_on,
};
use crate::chat::{ChatSession, Message, Role};

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const CELL_WIDTH: usize = 5;

fn render_cell(cell: &CalendarCell, events: &[CalendarEvent]) -> String {
    match cell {
        CalendarCell::Empty => " ".repeat(CELL_WIDTH),
        CalendarCell::Day(day) => {
            let (open, close) = if day.is_today { ('[', ']') } else { (' ', ' ') };
            let marker = if events_on(events, &day.iso_date).next().is_some() {
                '*'
            } else {
                ' '
            };
            format!("{}{:>2}{}{}", open, day.day_number, close, marker)
        }
    }
}

/// Draws the month as a grid, today in brackets and days with events
/// marked `*`, followed by the events that fall inside the month in
/// the order the backend sent them.
pub fn render_month(grid: &MonthGrid, events: &[CalendarEvent]) -> String {
    let width = CELL_WIDTH * 7;
    let mut out = String::new();
    let _ = writeln!(out, "{:^width$}", grid.label, width = width);
    for name in WEEKDAYS {
        let _ = write!(out, " {:>2}  ", name);
    }
    out.push('\n');

    for week in grid.weeks() {
        let row: String = week.iter().map(|c| render_cell(c, events)).collect();
        let _ = writeln!(out, "{}", row.trim_end());
    }

    let in_month: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| {
            grid.cells
                .iter()
                .filter_map(|c| c.day())
                .any(|d| d.iso_date == e.date)
        })
        .collect();
    if !in_month.is_empty() {
        out.push('\n');
        for event in in_month {
            let _ = write!(out, "  {} {:<5} {}", event.date, event.time, event.title);
            if !event.location.is_empty() {
                let _ = write!(out, " @ {}", event.location);
            }
            out.push('\n');
        }
    }

    out
}

/// Renders a single message. Continuation lines are indented under
/// the speaker's name.
pub fn render_message(msg: &Message) -> String {
    let tag = if msg.is_reminder() { " [reminder]" } else { "" };
    let prefix = format!("{}{}: ", msg.display_name(), tag);
    let indent = " ".repeat(2);

    let mut out = String::new();
    for (i, line) in msg.content().lines().enumerate() {
        if i == 0 {
            let _ = writeln!(out, "{}{}", prefix, line);
        } else if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{}{}", indent, line);
        }
    }
    if msg.content().is_empty() {
        let _ = writeln!(out, "{}", prefix.trim_end());
    }
    for note in msg.notes() {
        let _ = writeln!(out, "{}- {}", indent, note);
    }
    out
}

pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Only the agent's side of the latest turn, used by the interactive
/// loop which already echoes what the user typed.
pub fn render_reply(messages: &[Message]) -> Option<String> {
    messages
        .last()
        .filter(|m| m.role() == Role::Agent)
        .map(render_message)
}

/// Puts the chat and the calendar side by side in one frame.
pub struct Dashboard<'a> {
    session: &'a ChatSession,
    events: &'a EventStore,
    grid_builder: &'a DateGridBuilder,
}

impl<'a> Dashboard<'a> {
    pub fn new(
        session: &'a ChatSession,
        events: &'a EventStore,
        grid_builder: &'a DateGridBuilder,
    ) -> Self {
        Self {
            session,
            events,
            grid_builder,
        }
    }

    pub fn render_calendar(&self, reference: NaiveDate, today: NaiveDate) -> Result<String> {
        let grid = self.grid_builder.build(reference, today)?;
        Ok(render_month(&grid, &self.events.events()))
    }

    pub fn render(&self, reference: NaiveDate, today: NaiveDate) -> Result<String> {
        let snapshot = self.session.snapshot();
        let mut out = self.render_calendar(reference, today)?;
        out.push('\n');
        out.push_str(&render_transcript(&snapshot.transcript.messages()));
        if snapshot.awaiting {
            out.push_str("\n...\n");
        }
        Ok(out)
    }
}
