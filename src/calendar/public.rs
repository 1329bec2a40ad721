//! Public types for the calendar events API
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

// The events service sends `null` for blank optional fields
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Some backends hand out integer ids
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub time: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
}

#[derive(Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<CalendarEvent>,
}

/// Events falling on `iso_date`, in the order they were given.
pub fn events_on<'a>(
    events: &'a [CalendarEvent],
    iso_date: &'a str,
) -> impl Iterator<Item = &'a CalendarEvent> {
    events.iter().filter(move |e| e.date == iso_date)
}
