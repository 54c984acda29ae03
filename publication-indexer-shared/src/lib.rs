//! # Publication Indexer Shared
//!
//! Data model shared by the publication indexer crates: records as they
//! arrive from the canonical store, change events, and the index document
//! envelope handed to the search sink.

mod change_event;
mod errors;
mod index_action;
mod index_document;
mod record;

pub use change_event::{ChangeEvent, ChangeType};
pub use errors::IndexDocumentError;
pub use index_action::IndexAction;
pub use index_document::{canonicalize, ConsumptionAttributes, IndexDocument};
pub use record::{PublicationStatus, Record};
