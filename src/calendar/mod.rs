pub mod events;
pub use events::{EventStore, EventStoreConfig};

pub mod grid;
pub use grid::{CalendarCell, DateGridBuilder, DayCell, MonthGrid};

pub mod public;
pub use public::{CalendarEvent, events_on};
