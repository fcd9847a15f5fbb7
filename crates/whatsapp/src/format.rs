use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Render an event date the way cards show it, e.g. `December 20, 2025`.
pub fn format_event_date(date: DateTime<Utc>, tz: Tz) -> String {
    date.with_timezone(&tz).format("%B %d, %Y").to_string()
}

/// Button id the model later reads back to learn which event was picked.
pub fn select_button_id(event_id: i64) -> String {
    format!("I want to attend event with ID: {event_id}")
}

/// Body text of an event card: upper-cased title, blank line, date.
pub fn event_card_body(title: &str, date: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "{}\n\nDate: {}",
        title.to_uppercase(),
        format_event_date(date, tz)
    )
}
