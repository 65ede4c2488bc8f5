//! Display helpers shared by every front end.

use std::fmt;

use chrono::{DateTime, TimeZone};

use super::{Error, ErrorCode};

/// Render `at` as `dd/MM/yyyy às HH:mm` in its own time zone.
///
/// # Examples
/// ```
/// use biosuape::domain::format_timestamp;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
/// assert_eq!(format_timestamp(&at), "05/03/2024 às 14:07");
/// ```
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.format("%d/%m/%Y às %H:%M").to_string()
}

/// One decimal place, or `N/A` when the reading is absent.
#[must_use]
pub fn format_one_decimal(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_owned(), |value| format!("{value:.1}"))
}

/// How a message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// The action completed.
    Success,
    /// The action failed.
    Error,
    /// Neutral information, such as a closed form.
    Info,
}

/// Short text for a toast, alert, or terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    /// Text to show.
    pub text: String,
    /// Presentation hint.
    pub kind: MessageKind,
}

impl UserMessage {
    /// Success message with `text`.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Success,
        }
    }
}

impl From<&Error> for UserMessage {
    fn from(error: &Error) -> Self {
        let kind = match error.code() {
            ErrorCode::Cancelled => MessageKind::Info,
            _ => MessageKind::Error,
        };
        Self {
            text: error.message().to_owned(),
            kind,
        }
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
