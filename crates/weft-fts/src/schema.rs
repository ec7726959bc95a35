//! Schema compilation: declarative fields → engine schema.
//!
//! [`CompiledSchema::compile`] deterministically maps every declared field
//! onto the engine's term space and value-slot layout:
//!
//! - text and ngram fields become tokenized term namespaces with positions
//!   (so phrase queries work), using a per-language stemming analyzer;
//! - keyword and location fields become raw single-term namespaces;
//! - facet fields become hierarchical facet namespaces;
//! - numeric and date fields become `u64` value slots (fast + indexed),
//!   ordered by the encodings in [`crate::marshal`];
//! - stored-only fields get no engine field at all — they live in the
//!   serialized payload.
//!
//! Slot indexes are assigned in declaration order, so compiling the same
//! schema twice yields the same layout. A persisted [`SchemaFingerprint`]
//! detects kind drift against an existing index on reopen.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tantivy::Index;
use tantivy::schema::{
    FacetOptions, Field, IndexRecordOption, Schema as EngineSchema, SchemaBuilder,
    TextFieldIndexing, TextOptions, FAST, INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{
    LowerCaser, NgramTokenizer, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer,
};
use weft_core::Error as CoreError;

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::field::{
    FieldKind, FieldSpec, Schema, StemLanguage, KEY_FIELD, PAYLOAD_FIELD, TYPE_FIELD,
};

/// Fingerprint format version, bumped when the layout rules change.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Filename of the persisted fingerprint, stored next to the index.
const FINGERPRINT_FILE: &str = "weft-schema.json";

/// Analyzer name for ngram fields.
const NGRAM_ANALYZER: &str = "weft_ngram";

/// Ngram sizes for ngram fields.
const NGRAM_MIN: usize = 2;
const NGRAM_MAX: usize = 3;

/// Text-analysis settings shared by indexing and query translation.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Default stemming language for fields that don't declare one.
    pub language: StemLanguage,
    /// Filter stopwords out of tokenized text.
    pub stopwords_enabled: bool,
    /// Extra stopwords on top of the language list.
    pub custom_stopwords: Vec<String>,
    /// Words exempt from stopword filtering.
    pub allowlist: Vec<String>,
}

impl From<&SearchConfig> for AnalyzerOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            language: config.stemming_language,
            stopwords_enabled: config.stopwords_enabled,
            custom_stopwords: config.custom_stopwords.clone(),
            allowlist: config.allowlist.clone(),
        }
    }
}

impl AnalyzerOptions {
    fn stopword_list(&self, language: StemLanguage) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        if self.stopwords_enabled {
            if let Some(lang) = language.stopword_language() {
                words.extend(
                    stop_words::get(lang)
                        .iter()
                        .map(|w| w.to_lowercase())
                        .filter(|w| !self.allowlist.iter().any(|a| a.eq_ignore_ascii_case(w))),
                );
            }
            words.extend(
                self.custom_stopwords
                    .iter()
                    .map(|w| w.to_lowercase())
                    .filter(|w| !self.allowlist.iter().any(|a| a.eq_ignore_ascii_case(w))),
            );
        }
        words
    }
}

/// One declared field, compiled onto the engine layout.
#[derive(Debug, Clone)]
pub struct CompiledField {
    /// The original declaration.
    pub spec: FieldSpec,
    /// Term namespace for indexed text/keyword/ngram/facet/location fields.
    pub term_field: Option<Field>,
    /// Value slot for numeric/date fields.
    pub slot_field: Option<Field>,
    /// Slot ordinal, assigned in declaration order.
    pub slot_index: Option<u32>,
    /// Analyzer name for tokenized fields.
    pub analyzer: Option<&'static str>,
}

impl CompiledField {
    /// The stemming language this field analyzes with.
    pub fn language(&self, default: StemLanguage) -> StemLanguage {
        self.spec.language.unwrap_or(default)
    }
}

/// The compiled schema: field prefixes, value slots, reserved fields, and
/// the engine-facing schema object.
///
/// Compilation is pure — no side effects beyond computing the mapping — and
/// idempotent: the same declarations always produce the same layout.
#[derive(Clone)]
pub struct CompiledSchema {
    source: Schema,
    engine_schema: EngineSchema,
    key_field: Field,
    type_field: Field,
    payload_field: Field,
    fields: HashMap<String, CompiledField>,
    analyzers: AnalyzerOptions,
    fingerprint: SchemaFingerprint,
}

impl CompiledSchema {
    /// Compile with default analyzer options.
    pub fn compile(schema: &Schema) -> Result<Self> {
        Self::compile_with(schema, AnalyzerOptions::default())
    }

    /// Compile with explicit analyzer options.
    pub fn compile_with(schema: &Schema, analyzers: AnalyzerOptions) -> Result<Self> {
        let mut builder = SchemaBuilder::new();

        // Reserved fields: identity term, type discriminator, stored payload.
        let key_field = builder.add_text_field(KEY_FIELD, STRING | STORED);
        let type_field = builder.add_text_field(TYPE_FIELD, STRING | STORED);
        let payload_field = builder.add_text_field(PAYLOAD_FIELD, STORED);

        let mut fields = HashMap::with_capacity(schema.len());
        let mut slot_counter: u32 = 0;

        for spec in schema.fields() {
            let compiled = Self::compile_field(&mut builder, spec, &analyzers, &mut slot_counter)?;
            fields.insert(spec.name.clone(), compiled);
        }

        let engine_schema = builder.build();
        let fingerprint = SchemaFingerprint::compute(schema);

        Ok(Self {
            source: schema.clone(),
            engine_schema,
            key_field,
            type_field,
            payload_field,
            fields,
            analyzers,
            fingerprint,
        })
    }

    fn compile_field(
        builder: &mut SchemaBuilder,
        spec: &FieldSpec,
        analyzers: &AnalyzerOptions,
        slot_counter: &mut u32,
    ) -> Result<CompiledField> {
        let mut compiled = CompiledField {
            spec: spec.clone(),
            term_field: None,
            slot_field: None,
            slot_index: None,
            analyzer: None,
        };

        if !spec.indexed {
            // Stored payload only; no engine field.
            return Ok(compiled);
        }

        match spec.kind {
            FieldKind::Text => {
                let language = spec.language.unwrap_or(analyzers.language);
                let analyzer = language.analyzer_name();
                let indexing = TextFieldIndexing::default()
                    .set_tokenizer(analyzer)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions);
                let options = TextOptions::default().set_indexing_options(indexing);
                compiled.term_field = Some(builder.add_text_field(&spec.name, options));
                compiled.analyzer = Some(analyzer);
            }
            FieldKind::Ngram => {
                let indexing = TextFieldIndexing::default()
                    .set_tokenizer(NGRAM_ANALYZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions);
                let options = TextOptions::default().set_indexing_options(indexing);
                compiled.term_field = Some(builder.add_text_field(&spec.name, options));
                compiled.analyzer = Some(NGRAM_ANALYZER);
            }
            FieldKind::Keyword | FieldKind::Location => {
                compiled.term_field = Some(builder.add_text_field(&spec.name, STRING));
            }
            FieldKind::Facet => {
                compiled.term_field =
                    Some(builder.add_facet_field(&spec.name, FacetOptions::default()));
            }
            FieldKind::Numeric | FieldKind::Date => {
                compiled.slot_field = Some(builder.add_u64_field(&spec.name, INDEXED | FAST));
                compiled.slot_index = Some(*slot_counter);
                *slot_counter += 1;
            }
            FieldKind::StoredOnly => {
                // Unreachable through Schema validation, but harmless.
                return Err(Error::schema(&spec.name, "stored_only fields cannot be indexed"));
            }
        }

        Ok(compiled)
    }

    /// The original declarations.
    pub fn source(&self) -> &Schema {
        &self.source
    }

    /// The engine-facing schema.
    pub fn engine_schema(&self) -> &EngineSchema {
        &self.engine_schema
    }

    /// Reserved identity-term field.
    pub fn key_field(&self) -> Field {
        self.key_field
    }

    /// Reserved type-discriminator field.
    pub fn type_field(&self) -> Field {
        self.type_field
    }

    /// Reserved stored-payload field.
    pub fn payload_field(&self) -> Field {
        self.payload_field
    }

    /// Analyzer settings in effect.
    pub fn analyzer_options(&self) -> &AnalyzerOptions {
        &self.analyzers
    }

    /// Look up a compiled field.
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.get(name)
    }

    /// Look up a compiled field, failing with [`Error::UnknownField`].
    pub fn require_field(&self, name: &str) -> Result<&CompiledField> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// The fingerprint of this compilation.
    pub fn fingerprint(&self) -> &SchemaFingerprint {
        &self.fingerprint
    }

    /// Register every analyzer the schema references with an index.
    ///
    /// Must be called after creating or opening an index, before indexing
    /// or searching.
    pub fn register_tokenizers(&self, index: &Index) -> Result<()> {
        let mut languages: Vec<StemLanguage> = vec![self.analyzers.language];
        let mut needs_ngram = false;
        for compiled in self.fields.values() {
            match compiled.spec.kind {
                FieldKind::Text => {
                    let lang = compiled.language(self.analyzers.language);
                    if !languages.contains(&lang) {
                        languages.push(lang);
                    }
                }
                FieldKind::Ngram => needs_ngram = true,
                _ => {}
            }
        }

        for language in languages {
            index
                .tokenizers()
                .register(language.analyzer_name(), self.stem_analyzer(language));
        }

        if needs_ngram {
            let ngram = NgramTokenizer::all_ngrams(NGRAM_MIN, NGRAM_MAX)
                .map_err(|e| Error::Core(CoreError::config(e.to_string())))?;
            let analyzer = TextAnalyzer::builder(ngram).filter(LowerCaser).build();
            index.tokenizers().register(NGRAM_ANALYZER, analyzer);
        }

        Ok(())
    }

    /// Build the stemming analyzer for a language.
    ///
    /// The same pipeline serves indexing and query analysis, so query terms
    /// stem to the same form the index stores.
    pub fn stem_analyzer(&self, language: StemLanguage) -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(
                self.analyzers.stopword_list(language),
            ))
            .filter(Stemmer::new(language.tantivy_language()))
            .build()
    }

    /// Build the analyzer for a tokenized field, `None` for raw fields.
    pub fn analyzer_for(&self, compiled: &CompiledField) -> Result<Option<TextAnalyzer>> {
        match compiled.spec.kind {
            FieldKind::Text => Ok(Some(
                self.stem_analyzer(compiled.language(self.analyzers.language)),
            )),
            FieldKind::Ngram => {
                let ngram = NgramTokenizer::all_ngrams(NGRAM_MIN, NGRAM_MAX)
                    .map_err(|e| Error::Core(CoreError::config(e.to_string())))?;
                Ok(Some(TextAnalyzer::builder(ngram).filter(LowerCaser).build()))
            }
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("fields", &self.fields.len())
            .field("fingerprint", &self.fingerprint.hash)
            .finish()
    }
}

/// A versioned hash of the field → kind mapping, persisted next to the
/// index so an incompatible schema change is caught on reopen instead of
/// silently corrupting the term space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFingerprint {
    /// Fingerprint format version.
    pub version: u32,
    /// Hash over the ordered field/kind pairs.
    pub hash: String,
    /// Field name → kind name, kept readable for diagnostics.
    pub fields: BTreeMap<String, String>,
}

impl SchemaFingerprint {
    /// Compute the fingerprint of a declarative schema.
    pub fn compute(schema: &Schema) -> Self {
        let mut hasher = DefaultHasher::new();
        FINGERPRINT_VERSION.hash(&mut hasher);

        let mut fields = BTreeMap::new();
        for spec in schema.fields() {
            spec.name.hash(&mut hasher);
            spec.kind.name().hash(&mut hasher);
            spec.multi_valued.hash(&mut hasher);
            fields.insert(spec.name.clone(), spec.kind.name().to_string());
        }

        Self {
            version: FINGERPRINT_VERSION,
            hash: format!("{:016x}", hasher.finish()),
            fields,
        }
    }

    /// Load a persisted fingerprint from the index directory.
    ///
    /// Returns `Ok(None)` if none has been written yet.
    pub fn load(index_path: &Path) -> Result<Option<Self>> {
        let path = index_path.join(FINGERPRINT_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Core(CoreError::io_with_path(e, &path)))?;
        let fingerprint: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Core(CoreError::parse(format!("invalid fingerprint JSON: {e}"))))?;

        Ok(Some(fingerprint))
    }

    /// Persist the fingerprint into the index directory.
    pub fn save(&self, index_path: &Path) -> Result<()> {
        if !index_path.exists() {
            std::fs::create_dir_all(index_path)
                .map_err(|e| Error::Core(CoreError::io_with_path(e, index_path)))?;
        }

        let path = index_path.join(FINGERPRINT_FILE);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Core(CoreError::operation(format!("serialize fingerprint: {e}"))))?;
        std::fs::write(&path, content).map_err(|e| Error::Core(CoreError::io_with_path(e, &path)))?;

        Ok(())
    }

    /// Check this fingerprint against one persisted by an earlier
    /// compilation of the same index.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Schema`] naming the first field whose kind
    /// changed. Added and removed fields are allowed — they surface later
    /// as an engine schema mismatch if the index itself is incompatible.
    pub fn verify_against(&self, persisted: &Self) -> Result<()> {
        for (name, kind) in &self.fields {
            if let Some(previous) = persisted.fields.get(name) {
                if previous != kind {
                    return Err(Error::schema(
                        name,
                        format!("kind changed from {previous} to {kind} against the existing index"),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
