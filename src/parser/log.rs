//! Session log lines.
//!
//! Layout: `<date> <time> <session-id> <4 service fields> <message...>`,
//! separated by single spaces.

use chrono::NaiveDateTime;

use super::error::ParseError;
use super::timestamp::parse_split_timestamp;

/// Marker the server writes when a client session ends.
pub const SESSION_END_MARKER: &str = "Сессия удалена";

/// Index of the first message token.
const MESSAGE_START: usize = 7;

/// One line of a session log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub timestamp: NaiveDateTime,
    pub session_id: String,
    pub message: String,
}

impl SessionEvent {
    /// Whether this event closes the session.
    #[must_use]
    pub fn is_session_end(&self) -> bool {
        self.message.starts_with(SESSION_END_MARKER)
    }
}

/// Parse a session log line.
///
/// Blank lines yield `Ok(None)`. Tokens are split on single spaces, so runs of
/// spaces inside the message are kept as written.
///
/// # Errors
///
/// Returns an error if the line has fewer than three tokens or the first two
/// tokens are not a timestamp.
pub fn parse_event(line: &str) -> Result<Option<SessionEvent>, ParseError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let words: Vec<&str> = line.split(' ').collect();
    if words.len() < 3 {
        return Err(ParseError::MissingColumn {
            index: 2,
            found: words.len(),
        });
    }

    let timestamp = parse_split_timestamp(words[0], words[1])?;
    let message = words
        .get(MESSAGE_START..)
        .map(|rest| rest.join(" "))
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(Some(SessionEvent {
        timestamp,
        session_id: words[2].to_string(),
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regular_line() {
        let event = parse_event("2024-01-01 10:00:00 S1 a b c d Client connected")
            .unwrap()
            .unwrap();
        assert_eq!(event.session_id, "S1");
        assert_eq!(event.message, "Client connected");
        assert_eq!(event.timestamp.to_string(), "2024-01-01 10:00:00");
        assert!(!event.is_session_end());
    }

    #[test]
    fn test_session_end_marker() {
        let event = parse_event("2024-01-01 10:00:00 SESSION123 x x x x Сессия удалена")
            .unwrap()
            .unwrap();
        assert_eq!(event.message, "Сессия удалена");
        assert!(event.is_session_end());
    }

    #[test]
    fn test_fifth_filler_token_belongs_to_message() {
        // Only four service fields precede the message, so a fifth token
        // shifts the marker off the start and the session stays open.
        let event = parse_event("2024-01-01 10:00:00 SESSION123 x x x x x Сессия удалена")
            .unwrap()
            .unwrap();
        assert_eq!(event.session_id, "SESSION123");
        assert_eq!(event.message, "x Сессия удалена");
        assert!(!event.is_session_end());
    }

    #[test]
    fn test_message_keeps_inner_spacing() {
        let event = parse_event("2024-01-01 10:00:00 S1 a b c d two  spaces ")
            .unwrap()
            .unwrap();
        assert_eq!(event.message, "two  spaces");
    }

    #[test]
    fn test_short_line_has_empty_message() {
        let event = parse_event("2024-01-01 10:00:00 S1").unwrap().unwrap();
        assert_eq!(event.message, "");
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert_eq!(parse_event("   ").unwrap(), None);
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let err = parse_event("2024-99-01 10:00:00 S1 a b c d msg").unwrap_err();
        assert!(matches!(err, ParseError::Timestamp { .. }));
    }

    #[test]
    fn test_too_few_tokens_is_error() {
        let err = parse_event("2024-01-01 10:00:00").unwrap_err();
        assert_eq!(err, ParseError::MissingColumn { index: 2, found: 2 });
    }
}
