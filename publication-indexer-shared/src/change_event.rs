//! Change event types.
//!
//! A change event describes one mutation in the canonical record store as a
//! before/after pair plus the raw change-type tag emitted by the store.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Recognized change types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// A record was created.
    Insert,
    /// A record was modified.
    Modify,
    /// A record was removed.
    Remove,
}

impl ChangeType {
    /// Parse a raw change-type tag. Returns `None` for unrecognized tags.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INSERT" => Some(Self::Insert),
            "MODIFY" => Some(Self::Modify),
            "REMOVE" => Some(Self::Remove),
            _ => None,
        }
    }

    /// The wire representation of this change type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Modify => "MODIFY",
            Self::Remove => "REMOVE",
        }
    }
}

/// A change event received from the record store.
///
/// The change type is kept as the raw tag so that unrecognized values reach
/// the classifier and are rejected there with a named error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// The record before the change.
    #[serde(default)]
    pub old_record: Option<Record>,
    /// The record after the change.
    #[serde(default)]
    pub new_record: Option<Record>,
    /// The raw change-type tag.
    pub change_type: String,
}

impl ChangeEvent {
    /// Create a change event with a recognized change type.
    pub fn new(
        change_type: ChangeType,
        old_record: Option<Record>,
        new_record: Option<Record>,
    ) -> Self {
        Self {
            old_record,
            new_record,
            change_type: change_type.as_str().to_string(),
        }
    }

    /// Create an insert event.
    pub fn insert(new_record: Record) -> Self {
        Self::new(ChangeType::Insert, None, Some(new_record))
    }

    /// Create a modify event.
    pub fn modify(old_record: Record, new_record: Record) -> Self {
        Self::new(ChangeType::Modify, Some(old_record), Some(new_record))
    }

    /// Create a remove event.
    pub fn remove(old_record: Record) -> Self {
        Self::new(ChangeType::Remove, Some(old_record), None)
    }

    /// The parsed change type, or `None` if the tag is not recognized.
    pub fn parsed_change_type(&self) -> Option<ChangeType> {
        ChangeType::parse(&self.change_type)
    }

    /// The old record, if present and non-empty.
    pub fn old_record(&self) -> Option<&Record> {
        self.old_record.as_ref().filter(|r| !r.is_empty())
    }

    /// The new record, if present and non-empty.
    pub fn new_record(&self) -> Option<&Record> {
        self.new_record.as_ref().filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_wire_event() {
        let event: ChangeEvent = serde_json::from_value(json!({
            "oldRecord": null,
            "newRecord": {"identifier": "r1", "status": "PUBLISHED"},
            "changeType": "INSERT"
        }))
        .unwrap();

        assert!(event.old_record.is_none());
        assert_eq!(event.new_record().and_then(Record::identifier), Some("r1"));
        assert_eq!(event.parsed_change_type(), Some(ChangeType::Insert));
    }

    #[test]
    fn test_unknown_change_type_is_kept_raw() {
        let event: ChangeEvent = serde_json::from_value(json!({
            "newRecord": {"identifier": "r1"},
            "changeType": "TRUNCATE"
        }))
        .unwrap();

        assert_eq!(event.change_type, "TRUNCATE");
        assert!(event.parsed_change_type().is_none());
    }

    #[test]
    fn test_empty_records_are_filtered() {
        let event = ChangeEvent::modify(Record::new(json!({})), Record::new(json!({"title": "T"})));

        assert!(event.old_record().is_none());
        assert!(event.new_record().is_none());
    }
}
