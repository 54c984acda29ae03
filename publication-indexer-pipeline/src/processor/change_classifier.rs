//! Change event classifier.
//!
//! Maps a change event to the index action it requires. Rules are evaluated
//! in priority order and the first match wins; delete rules are checked
//! before the upsert rule so demoted content never re-enters the index.

use tracing::{debug, instrument};

use crate::errors::PipelineError;
use publication_indexer_shared::{ChangeEvent, IndexAction, IndexDocument, Record};

/// Classifier that turns change events into index actions.
///
/// Classification is pure: it performs no I/O and holds no state besides the
/// name of the index upserts are routed to.
#[derive(Debug, Clone)]
pub struct ChangeEventClassifier {
    index_name: String,
}

impl ChangeEventClassifier {
    /// Create a classifier that routes upserts to `index_name`.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }

    /// The index upserts are routed to.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Classify a single change event.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexAction)` - The action the index requires
    /// * `Err(PipelineError::InvalidChangeType)` - If the change-type tag is unknown
    /// * `Err(PipelineError::EmptyChangeEvent)` - If neither record carries an identifier
    #[instrument(skip(self, event), fields(change_type = %event.change_type))]
    pub fn classify(&self, event: &ChangeEvent) -> Result<IndexAction, PipelineError> {
        if event.parsed_change_type().is_none() {
            return Err(PipelineError::InvalidChangeType(event.change_type.clone()));
        }

        let old_record = event.old_record().and_then(addressable);
        let new_record = event.new_record();

        let action = match (old_record, new_record) {
            (None, None) => return Err(PipelineError::EmptyChangeEvent),
            (Some((_, id)), None) => IndexAction::Delete(id.to_string()),
            (Some((old, id)), Some(new)) if old.is_published() && !new.is_published() => {
                debug!("Record was unpublished");
                IndexAction::Delete(id.to_string())
            }
            (_, Some(new)) if is_index_eligible(new) => {
                IndexAction::Upsert(IndexDocument::for_record(&self.index_name, new))
            }
            _ => IndexAction::Ignore,
        };

        debug!(action = action.kind(), "Classified change event");
        Ok(action)
    }
}

/// Pair a record with the identifier deletes address it by.
fn addressable(record: &Record) -> Option<(&Record, &str)> {
    record.identifier().map(|id| (record, id))
}

/// Published records with a title and a publication type are indexed.
fn is_index_eligible(record: &Record) -> bool {
    record.is_published() && record.title().is_some() && record.publication_type().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use publication_indexer_shared::{ChangeType, IndexDocumentError};
    use serde_json::{json, Value};

    fn classifier() -> ChangeEventClassifier {
        ChangeEventClassifier::new("resources")
    }

    fn record(value: Value) -> Record {
        Record::new(value)
    }

    fn published(id: &str) -> Record {
        record(json!({
            "identifier": id,
            "status": "PUBLISHED",
            "title": "T",
            "publicationType": "Report"
        }))
    }

    #[test]
    fn test_insert_published_record_is_upserted() {
        let event = ChangeEvent::insert(published("r1"));

        let action = classifier().classify(&event).unwrap();

        match action {
            IndexAction::Upsert(doc) => {
                assert_eq!(doc.document_identifier(), Ok("r1"));
                assert_eq!(doc.index_name(), Ok("resources"));
                assert_eq!(doc.payload["title"], "T");
            }
            other => panic!("expected upsert, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_is_deleted() {
        let event = ChangeEvent::remove(record(json!({"identifier": "r1", "status": "PUBLISHED"})));

        let action = classifier().classify(&event).unwrap();
        assert_eq!(action, IndexAction::Delete("r1".to_string()));
    }

    #[test]
    fn test_invalid_change_type() {
        for tag in ["", "insert", "UPSERT", "DELETE"] {
            let event = ChangeEvent {
                old_record: None,
                new_record: Some(published("r1")),
                change_type: tag.to_string(),
            };

            let result = classifier().classify(&event);
            assert!(
                matches!(result, Err(PipelineError::InvalidChangeType(ref t)) if t == tag),
                "tag {:?} gave {:?}",
                tag,
                result
            );
        }
    }

    #[test]
    fn test_invalid_change_type_wins_over_empty_event() {
        let event = ChangeEvent {
            old_record: None,
            new_record: None,
            change_type: "BOGUS".to_string(),
        };

        assert!(matches!(
            classifier().classify(&event),
            Err(PipelineError::InvalidChangeType(_))
        ));
    }

    #[test]
    fn test_empty_change_event() {
        let absent = ChangeEvent::new(ChangeType::Modify, None, None);
        let empty = ChangeEvent::new(
            ChangeType::Modify,
            Some(record(json!({"status": "PUBLISHED"}))),
            Some(record(json!({"title": "T"}))),
        );

        assert!(matches!(
            classifier().classify(&absent),
            Err(PipelineError::EmptyChangeEvent)
        ));
        assert!(matches!(
            classifier().classify(&empty),
            Err(PipelineError::EmptyChangeEvent)
        ));
    }

    #[test]
    fn test_never_deletes_by_blank_identifier() {
        let blank = record(json!({"identifier": "  ", "status": "PUBLISHED"}));
        let remove = ChangeEvent::remove(blank.clone());
        let unpublish = ChangeEvent::modify(
            blank,
            record(json!({"identifier": "r1", "status": "DRAFT"})),
        );

        assert!(matches!(
            classifier().classify(&remove),
            Err(PipelineError::EmptyChangeEvent)
        ));
        assert_eq!(classifier().classify(&unpublish).unwrap(), IndexAction::Ignore);
    }

    #[test]
    fn test_new_record_without_identifier_deletes_old() {
        let event = ChangeEvent::modify(published("r1"), record(json!({"title": "T"})));

        let action = classifier().classify(&event).unwrap();
        assert_eq!(action, IndexAction::Delete("r1".to_string()));
    }

    #[test]
    fn test_unpublish_deletes_even_when_new_is_complete() {
        for status in ["DRAFT", "UNPUBLISHED", "DELETED", "SOMETHING_ELSE"] {
            let new = record(json!({
                "identifier": "r1",
                "status": status,
                "title": "T",
                "publicationType": "Report"
            }));
            let event = ChangeEvent::modify(published("r1"), new);

            let action = classifier().classify(&event).unwrap();
            assert_eq!(action, IndexAction::Delete("r1".to_string()), "status {}", status);
        }
    }

    #[test]
    fn test_unpublish_uses_old_identifier() {
        let new = record(json!({"identifier": "r1-renamed", "status": "DRAFT"}));
        let event = ChangeEvent::modify(published("r1"), new);

        let action = classifier().classify(&event).unwrap();
        assert_eq!(action, IndexAction::Delete("r1".to_string()));
    }

    #[test]
    fn test_modify_published_to_published_is_upserted() {
        let event = ChangeEvent::modify(published("r1"), published("r1"));

        let action = classifier().classify(&event).unwrap();
        assert!(matches!(action, IndexAction::Upsert(_)));
    }

    #[test]
    fn test_draft_to_published_is_upserted() {
        let old = record(json!({"identifier": "r1", "status": "DRAFT"}));
        let event = ChangeEvent::modify(old, published("r1"));

        assert!(matches!(
            classifier().classify(&event).unwrap(),
            IndexAction::Upsert(_)
        ));
    }

    #[test]
    fn test_record_without_title_is_ignored() {
        for title in [json!(""), json!("   "), Value::Null] {
            let new = record(json!({
                "identifier": "r1",
                "status": "PUBLISHED",
                "title": title,
                "publicationType": "Report"
            }));
            let event = ChangeEvent::insert(new);

            assert_eq!(classifier().classify(&event).unwrap(), IndexAction::Ignore);
        }
    }

    #[test]
    fn test_record_without_publication_type_is_ignored() {
        let new = record(json!({"identifier": "r1", "status": "PUBLISHED", "title": "T"}));
        let event = ChangeEvent::insert(new);

        assert_eq!(classifier().classify(&event).unwrap(), IndexAction::Ignore);
    }

    #[test]
    fn test_draft_record_is_ignored() {
        let new = record(json!({
            "identifier": "r1",
            "status": "DRAFT",
            "title": "T",
            "publicationType": "Report"
        }));

        assert_eq!(
            classifier().classify(&ChangeEvent::insert(new)).unwrap(),
            IndexAction::Ignore
        );
    }

    #[test]
    fn test_upsert_document_is_valid() {
        let action = classifier()
            .classify(&ChangeEvent::insert(published("r9")))
            .unwrap();

        if let IndexAction::Upsert(doc) = action {
            assert_eq!(doc.validate(), Ok::<(), IndexDocumentError>(()));
        } else {
            panic!("expected upsert");
        }
    }
}
