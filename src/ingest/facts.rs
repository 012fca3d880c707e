//! Fact wrappers binding parsed records to their owning rows.

use chrono::NaiveDateTime;

use crate::parser::{AcknowledgedFile, SessionEvent, SessionSummary};
use crate::store::{Fact, Field, FieldValue, Table};

/// A session log message owned by a watched file.
#[derive(Debug, Clone, Copy)]
pub struct EventFact<'a> {
    pub file_id: i64,
    pub event: &'a SessionEvent,
}

impl Fact for EventFact<'_> {
    fn table(&self) -> Table {
        Table::Messages
    }

    fn natural_key(&self) -> Vec<Field> {
        vec![
            Field::new("timestamp", FieldValue::Timestamp(self.event.timestamp)),
            Field::new("message", FieldValue::Text(self.event.message.clone())),
            Field::new("file_id", FieldValue::Integer(self.file_id)),
        ]
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = self.natural_key();
        fields.push(Field::new(
            "session_id",
            FieldValue::Text(self.event.session_id.clone()),
        ));
        fields
    }
}

/// An acknowledgement owned by a result file.
#[derive(Debug, Clone, Copy)]
pub struct AckFact<'a> {
    pub file_id: i64,
    pub ack: &'a AcknowledgedFile,
}

impl Fact for AckFact<'_> {
    fn table(&self) -> Table {
        Table::Acknowledgements
    }

    fn natural_key(&self) -> Vec<Field> {
        vec![
            Field::new("file_name", FieldValue::Text(self.ack.file_name.clone())),
            Field::new("status_code", FieldValue::Integer(self.ack.status_code)),
            Field::new("file_id", FieldValue::Integer(self.file_id)),
        ]
    }

    fn fields(&self) -> Vec<Field> {
        self.natural_key()
    }
}

/// A summary row with its derived columns filled in.
#[derive(Debug, Clone)]
pub struct SummaryFact<'a> {
    pub summary: &'a SessionSummary,
    /// Explicit or derived start date. `None` if derivation found no events.
    pub start: Option<NaiveDateTime>,
    pub entity_id: Option<i64>,
    pub update_file_id: Option<i64>,
    pub server: &'a str,
}

impl Fact for SummaryFact<'_> {
    fn table(&self) -> Table {
        Table::Summaries
    }

    fn natural_key(&self) -> Vec<Field> {
        vec![
            Field::new(
                "distr_number",
                FieldValue::Text(self.summary.distr_number.clone()),
            ),
            Field::new(
                "session_id",
                FieldValue::Text(self.summary.session_id.clone()),
            ),
            Field::new("start_date", FieldValue::from(self.start)),
        ]
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = self.summary.fields.clone();
        fields.push(Field::new("start_date", FieldValue::from(self.start)));
        fields.push(Field::new("entity_id", FieldValue::from(self.entity_id)));
        fields.push(Field::new(
            "update_file_id",
            FieldValue::from(self.update_file_id),
        ));
        fields.push(Field::new("server", FieldValue::Text(self.server.to_string())));
        fields
    }
}
