//! Source record representation.
//!
//! A [`Record`] is what the hosting application hands the indexer: a
//! primary key, a document type discriminator, and a field-name → value
//! map. Values are tagged [`FieldValue`]s; validation against the schema
//! happens at indexing time, not here.
//!
//! # Creating records
//!
//! ```rust
//! use weft_fts::Record;
//!
//! let record = Record::builder("product", "42")
//!     .text("title", "Red Fox Plush")
//!     .integer("price", 10)
//!     .build();
//!
//! assert_eq!(record.qualified_key(), "product.42");
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use weft_core::util::ids::qualified_key;

use crate::field::FieldValue;

/// A document to be indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key, unique within the document type.
    pub key: String,
    /// Document type discriminator, e.g. `"product"`.
    pub doc_type: String,
    /// Field values, keyed by schema field name.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Start building a record.
    pub fn builder(doc_type: impl Into<String>, key: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            record: Record {
                key: key.into(),
                doc_type: doc_type.into(),
                fields: BTreeMap::new(),
            },
        }
    }

    /// The qualified identity term, `"<doc_type>.<key>"`.
    pub fn qualified_key(&self) -> String {
        qualified_key(&self.doc_type, &self.key)
    }

    /// Look up a field value.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Set an arbitrary field value.
    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.record.fields.insert(name.into(), value);
        self
    }

    /// Set a text value.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(name, FieldValue::Text(value.into()))
    }

    /// Set an integer value.
    pub fn integer(self, name: impl Into<String>, value: i64) -> Self {
        self.field(name, FieldValue::Integer(value))
    }

    /// Set a float value.
    pub fn float(self, name: impl Into<String>, value: f64) -> Self {
        self.field(name, FieldValue::Float(value))
    }

    /// Set a boolean value.
    pub fn boolean(self, name: impl Into<String>, value: bool) -> Self {
        self.field(name, FieldValue::Bool(value))
    }

    /// Set a date value.
    pub fn date(self, name: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.field(name, FieldValue::Date(value))
    }

    /// Set a multi-valued text field.
    pub fn texts<I, S>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = values
            .into_iter()
            .map(|s| FieldValue::Text(s.into()))
            .collect();
        self.field(name, FieldValue::Multi(items))
    }

    /// Build the record.
    pub fn build(self) -> Record {
        self.record
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let record = Record::builder("product", "1").build();
        assert_eq!(record.doc_type, "product");
        assert_eq!(record.key, "1");
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_builder_field_setters() {
        let record = Record::builder("product", "1")
            .text("title", "Red Fox")
            .integer("price", 10)
            .float("weight", 0.4)
            .boolean("in_stock", true)
            .texts("tags", ["plush", "fox"])
            .build();

        assert_eq!(
            record.field("title"),
            Some(&FieldValue::Text("Red Fox".into()))
        );
        assert_eq!(record.field("price"), Some(&FieldValue::Integer(10)));
        assert_eq!(record.field("in_stock"), Some(&FieldValue::Bool(true)));
        assert!(matches!(
            record.field("tags"),
            Some(FieldValue::Multi(items)) if items.len() == 2
        ));
    }

    #[test]
    fn test_qualified_key() {
        let record = Record::builder("article", "intro-md").build();
        assert_eq!(record.qualified_key(), "article.intro-md");
    }

    #[test]
    fn test_record_serde_round_trip() {
        let record = Record::builder("product", "7")
            .text("title", "Blue Dog")
            .integer("price", 20)
            .build();

        let json = serde_json::to_string(&record).unwrap();
        let restored: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(record, restored);
    }
}
