//! Declarative field schema.
//!
//! A [`Schema`] is built once at startup from the hosting application's
//! field declarations and is immutable afterwards: every component holds it
//! read-only. Each [`FieldSpec`] declares what the field is (its
//! [`FieldKind`]), whether it accepts multiple values, whether it is indexed
//! and/or stored, and its query-time boost weight.
//!
//! Incoming record values are loosely typed on the application side, so they
//! arrive here as an explicit tagged [`FieldValue`] and are validated against
//! the declared kind at ingestion time rather than duck-typed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reserved field name holding the qualified primary key term.
pub const KEY_FIELD: &str = "_key";

/// Reserved field name holding the document type discriminator term.
pub const TYPE_FIELD: &str = "_doctype";

/// Reserved field name holding the serialized stored payload.
pub const PAYLOAD_FIELD: &str = "_payload";

/// What a field is, which decides how it is indexed and queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Tokenized, stemmed free text. Supports term and phrase queries.
    Text,
    /// A single untokenized term, matched exactly.
    Keyword,
    /// Integer or float. Value-slot only: sortable and range-filterable,
    /// plus an exact-match term.
    Numeric,
    /// Date/time. Value-slot only, like [`FieldKind::Numeric`].
    Date,
    /// A categorical value counted by facet aggregation and usable as a
    /// post-filter.
    Facet,
    /// A latitude/longitude pair, matched exactly.
    Location,
    /// Text indexed as character n-grams, for substring/prefix matching.
    Ngram,
    /// Kept in the stored payload only; never indexed.
    StoredOnly,
}

impl FieldKind {
    /// Whether values of this kind live in a sortable value slot.
    pub fn is_sortable(self) -> bool {
        matches!(self, FieldKind::Numeric | FieldKind::Date)
    }

    /// Whether this kind supports phrase queries.
    pub fn supports_phrase(self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Ngram)
    }

    /// Short name used in fingerprints and error messages.
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
            FieldKind::Numeric => "numeric",
            FieldKind::Date => "date",
            FieldKind::Facet => "facet",
            FieldKind::Location => "location",
            FieldKind::Ngram => "ngram",
            FieldKind::StoredOnly => "stored_only",
        }
    }
}

/// Stemming language for text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemLanguage {
    #[default]
    English,
    French,
    German,
    Spanish,
    Italian,
    Portuguese,
    Dutch,
    Swedish,
    Russian,
}

impl StemLanguage {
    /// The matching tantivy stemmer language.
    pub fn tantivy_language(self) -> tantivy::tokenizer::Language {
        use tantivy::tokenizer::Language;
        match self {
            StemLanguage::English => Language::English,
            StemLanguage::French => Language::French,
            StemLanguage::German => Language::German,
            StemLanguage::Spanish => Language::Spanish,
            StemLanguage::Italian => Language::Italian,
            StemLanguage::Portuguese => Language::Portuguese,
            StemLanguage::Dutch => Language::Dutch,
            StemLanguage::Swedish => Language::Swedish,
            StemLanguage::Russian => Language::Russian,
        }
    }

    /// Tokenizer name this language registers under.
    pub fn analyzer_name(self) -> &'static str {
        match self {
            StemLanguage::English => "weft_stem_en",
            StemLanguage::French => "weft_stem_fr",
            StemLanguage::German => "weft_stem_de",
            StemLanguage::Spanish => "weft_stem_es",
            StemLanguage::Italian => "weft_stem_it",
            StemLanguage::Portuguese => "weft_stem_pt",
            StemLanguage::Dutch => "weft_stem_nl",
            StemLanguage::Swedish => "weft_stem_sv",
            StemLanguage::Russian => "weft_stem_ru",
        }
    }

    /// The stop-words crate language code, where a list exists.
    pub fn stopword_language(self) -> Option<stop_words::LANGUAGE> {
        use stop_words::LANGUAGE;
        match self {
            StemLanguage::English => Some(LANGUAGE::English),
            StemLanguage::French => Some(LANGUAGE::French),
            StemLanguage::German => Some(LANGUAGE::German),
            StemLanguage::Spanish => Some(LANGUAGE::Spanish),
            StemLanguage::Italian => Some(LANGUAGE::Italian),
            StemLanguage::Portuguese => Some(LANGUAGE::Portuguese),
            StemLanguage::Dutch => Some(LANGUAGE::Dutch),
            StemLanguage::Swedish => Some(LANGUAGE::Swedish),
            StemLanguage::Russian => Some(LANGUAGE::Russian),
        }
    }
}

/// Declaration of a single schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within the schema.
    pub name: String,
    /// What the field is.
    pub kind: FieldKind,
    /// Whether the field accepts a sequence of values.
    #[serde(default)]
    pub multi_valued: bool,
    /// Query-time boost weight. Must be ≥ 0; 0 means "no extra weight".
    #[serde(default = "default_boost")]
    pub boost_weight: f32,
    /// Whether the field is searchable.
    #[serde(default = "default_true")]
    pub indexed: bool,
    /// Whether the original value is kept in the stored payload.
    #[serde(default = "default_true")]
    pub stored: bool,
    /// Stemming language for text fields. `None` uses the index default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<StemLanguage>,
}

fn default_boost() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    /// Create a field spec with the defaults: single-valued, indexed,
    /// stored, boost 1.0.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multi_valued: false,
            boost_weight: default_boost(),
            indexed: true,
            stored: true,
            language: None,
        }
    }

    /// Shorthand for a text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Shorthand for a keyword field.
    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Keyword)
    }

    /// Shorthand for a numeric field.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Numeric)
    }

    /// Shorthand for a date field.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    /// Shorthand for a facet field.
    pub fn facet(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Facet)
    }

    /// Mark the field as multi-valued.
    pub fn multi(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Set the boost weight.
    pub fn boost(mut self, weight: f32) -> Self {
        self.boost_weight = weight;
        self
    }

    /// Mark the field as not indexed (stored payload only).
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    /// Mark the field as not stored (searchable but absent from results).
    pub fn unstored(mut self) -> Self {
        self.stored = false;
        self
    }

    /// Set the stemming language.
    pub fn language(mut self, language: StemLanguage) -> Self {
        self.language = Some(language);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::schema(&self.name, "field name must not be empty"));
        }
        if self.name.starts_with('_') {
            return Err(Error::schema(
                &self.name,
                "names starting with '_' are reserved",
            ));
        }
        if !self.indexed && !self.stored {
            return Err(Error::schema(
                &self.name,
                "a field must be indexed, stored, or both",
            ));
        }
        if self.kind == FieldKind::StoredOnly && self.indexed {
            return Err(Error::schema(
                &self.name,
                "stored_only fields cannot be indexed",
            ));
        }
        if !(self.boost_weight >= 0.0) {
            return Err(Error::schema(
                &self.name,
                format!("boost weight {} must be >= 0", self.boost_weight),
            ));
        }
        Ok(())
    }
}

/// An ordered, immutable collection of field declarations.
///
/// Built once through [`Schema::builder`], then shared read-only by the
/// schema mapper, indexer, translator, and result mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaDeclBuilder {
        SchemaDeclBuilder { fields: Vec::new() }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Number of declared fields (reserved fields excluded).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no declared fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn from_fields(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(fields.len());
        for (i, spec) in fields.iter().enumerate() {
            spec.validate()?;
            if by_name.insert(spec.name.clone(), i).is_some() {
                return Err(Error::schema(&spec.name, "duplicate field name"));
            }
        }
        Ok(Self { fields, by_name })
    }

    /// Rebuild the name lookup after deserialization.
    pub(crate) fn reindex(&mut self) {
        self.by_name = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaDeclBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaDeclBuilder {
    /// Add a field declaration.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Validate and build the schema.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Schema`] on duplicate names, reserved names,
    /// `indexed=false ∧ stored=false`, or a negative boost.
    pub fn build(self) -> Result<Schema> {
        Schema::from_fields(self.fields)
    }
}

/// A tagged record value, validated against the declared field kind at
/// ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Location { lat: f64, lon: f64 },
    Multi(Vec<FieldValue>),
}

impl FieldValue {
    /// Human-readable variant name for error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Date(_) => "date",
            FieldValue::Location { .. } => "location",
            FieldValue::Multi(_) => "multi",
        }
    }

    /// Check this value against a field declaration.
    ///
    /// `Multi` is accepted only for multi-valued fields, and must not nest.
    /// Scalar kinds accept: Text/Ngram/Keyword/Facet/StoredOnly → `Text` or
    /// `Bool`; Numeric → `Integer`/`Float`; Date → `Date`; Location →
    /// `Location`.
    pub fn validate_for(&self, spec: &FieldSpec) -> Result<()> {
        match self {
            FieldValue::Multi(items) => {
                if !spec.multi_valued {
                    return Err(Error::schema(
                        &spec.name,
                        "field is single-valued but got a sequence",
                    ));
                }
                for item in items {
                    if matches!(item, FieldValue::Multi(_)) {
                        return Err(Error::schema(&spec.name, "nested multi values"));
                    }
                    item.validate_scalar_for(spec)?;
                }
                Ok(())
            }
            other => other.validate_scalar_for(spec),
        }
    }

    fn validate_scalar_for(&self, spec: &FieldSpec) -> Result<()> {
        let ok = match spec.kind {
            FieldKind::Text | FieldKind::Ngram | FieldKind::Keyword | FieldKind::Facet => {
                matches!(self, FieldValue::Text(_) | FieldValue::Bool(_))
            }
            FieldKind::Numeric => match self {
                FieldValue::Integer(_) => true,
                FieldValue::Float(f) => f.is_finite(),
                _ => false,
            },
            FieldKind::Date => matches!(self, FieldValue::Date(_)),
            FieldKind::Location => matches!(self, FieldValue::Location { .. }),
            FieldKind::StoredOnly => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::schema(
                &spec.name,
                format!(
                    "{} value not valid for a {} field",
                    self.variant_name(),
                    spec.kind.name()
                ),
            ))
        }
    }

    /// The value as an exact-match term string, where the kind has one.
    ///
    /// Booleans marshal to `"true"`/`"false"`, locations to `"lat,lon"`.
    pub fn term_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            FieldValue::Location { lat, lon } => Some(format!("{lat},{lon}")),
            _ => None,
        }
    }

    /// Iterate the scalar values: one element for scalars, each element for
    /// `Multi`.
    pub fn scalars(&self) -> impl Iterator<Item = &FieldValue> {
        match self {
            FieldValue::Multi(items) => items.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_schema() -> Schema {
        Schema::builder()
            .field(FieldSpec::text("title").boost(3.0))
            .field(FieldSpec::text("body"))
            .field(FieldSpec::numeric("price"))
            .field(FieldSpec::date("published"))
            .field(FieldSpec::facet("category"))
            .field(FieldSpec::keyword("sku"))
            .field(FieldSpec::new("tags", FieldKind::Keyword).multi())
            .field(FieldSpec::new("notes", FieldKind::StoredOnly).unindexed())
            .build()
            .unwrap()
    }

    // ------------------------------------------------------------------------
    // Schema construction
    // ------------------------------------------------------------------------

    #[test]
    fn test_schema_build_and_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.len(), 8);
        assert_eq!(schema.field("price").unwrap().kind, FieldKind::Numeric);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_schema_preserves_declaration_order() {
        let schema = sample_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names[0], "title");
        assert_eq!(names[2], "price");
    }

    #[test]
    fn test_schema_rejects_duplicate_names() {
        let result = Schema::builder()
            .field(FieldSpec::text("title"))
            .field(FieldSpec::keyword("title"))
            .build();
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_schema_rejects_reserved_names() {
        let result = Schema::builder().field(FieldSpec::text("_key")).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_rejects_unindexed_unstored() {
        let result = Schema::builder()
            .field(FieldSpec::text("ghost").unindexed().unstored())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_rejects_negative_boost() {
        let result = Schema::builder()
            .field(FieldSpec::text("title").boost(-1.0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_stored_only_cannot_be_indexed() {
        let result = Schema::builder()
            .field(FieldSpec::new("raw", FieldKind::StoredOnly))
            .build();
        assert!(result.is_err());
    }

    // ------------------------------------------------------------------------
    // FieldValue validation
    // ------------------------------------------------------------------------

    #[test]
    fn test_validate_text_for_text_field() {
        let spec = FieldSpec::text("title");
        assert!(FieldValue::Text("hello".into()).validate_for(&spec).is_ok());
        assert!(FieldValue::Integer(3).validate_for(&spec).is_err());
    }

    #[test]
    fn test_validate_numeric_accepts_int_and_float() {
        let spec = FieldSpec::numeric("price");
        assert!(FieldValue::Integer(10).validate_for(&spec).is_ok());
        assert!(FieldValue::Float(9.5).validate_for(&spec).is_ok());
        assert!(FieldValue::Text("10".into()).validate_for(&spec).is_err());
    }

    #[test]
    fn test_validate_numeric_rejects_nan() {
        let spec = FieldSpec::numeric("price");
        assert!(FieldValue::Float(f64::NAN).validate_for(&spec).is_err());
    }

    #[test]
    fn test_validate_date() {
        let spec = FieldSpec::date("published");
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(FieldValue::Date(date).validate_for(&spec).is_ok());
        assert!(FieldValue::Text("2024-05-01".into())
            .validate_for(&spec)
            .is_err());
    }

    #[test]
    fn test_validate_multi_only_on_multi_fields() {
        let single = FieldSpec::keyword("sku");
        let multi = FieldSpec::keyword("tags").multi();
        let value = FieldValue::Multi(vec![
            FieldValue::Text("a".into()),
            FieldValue::Text("b".into()),
        ]);

        assert!(value.validate_for(&single).is_err());
        assert!(value.validate_for(&multi).is_ok());
    }

    #[test]
    fn test_validate_rejects_nested_multi() {
        let multi = FieldSpec::keyword("tags").multi();
        let nested = FieldValue::Multi(vec![FieldValue::Multi(vec![])]);
        assert!(nested.validate_for(&multi).is_err());
    }

    #[test]
    fn test_term_text_marshaling() {
        assert_eq!(
            FieldValue::Bool(true).term_text().as_deref(),
            Some("true")
        );
        assert_eq!(
            FieldValue::Location { lat: 1.5, lon: -2.0 }.term_text().as_deref(),
            Some("1.5,-2")
        );
        assert!(FieldValue::Integer(3).term_text().is_none());
    }

    #[test]
    fn test_scalars_iteration() {
        let multi = FieldValue::Multi(vec![
            FieldValue::Text("a".into()),
            FieldValue::Text("b".into()),
        ]);
        assert_eq!(multi.scalars().count(), 2);
        assert_eq!(FieldValue::Text("x".into()).scalars().count(), 1);
    }

    // ------------------------------------------------------------------------
    // Serde
    // ------------------------------------------------------------------------

    #[test]
    fn test_field_value_serde_round_trip() {
        let value = FieldValue::Multi(vec![
            FieldValue::Text("rust".into()),
            FieldValue::Text("search".into()),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let restored: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, restored);
    }

    #[test]
    fn test_field_spec_deserialization_defaults() {
        let json = r#"{"name": "title", "kind": "text"}"#;
        let spec: FieldSpec = serde_json::from_str(json).unwrap();
        assert!(spec.indexed);
        assert!(spec.stored);
        assert!(!spec.multi_valued);
        assert_eq!(spec.boost_weight, 1.0);
    }

    #[test]
    fn test_schema_reindex_after_deserialization() {
        let schema = sample_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let mut restored: Schema = serde_json::from_str(&json).unwrap();
        restored.reindex();
        assert!(restored.field("price").is_some());
    }
}
