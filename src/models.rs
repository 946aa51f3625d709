use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::detector::DetectorStats;
use crate::merger::MergerStats;
use crate::pipeline::PipelineStats;

/// Canonical field names shared by every stage of the pipeline.
pub mod fields {
    pub const FULL_NAME: &str = "full_name";
    pub const PREFIX: &str = "prefix";
    pub const FIRST_NAME: &str = "first_name";
    pub const MIDDLE_NAME: &str = "middle_name";
    pub const LAST_NAME: &str = "last_name";
    pub const SUFFIX: &str = "suffix";
    pub const FULL_NAME_CLEAN: &str = "full_name_clean";
    pub const NAME_PARSING_SOURCE: &str = "name_parsing_source";
    pub const NAME_SOURCE: &str = "name_source";

    pub const PRIMARY_EMAIL: &str = "primary_email";
    pub const PRIMARY_PHONE: &str = "primary_phone";

    pub const STREET_ADDRESS: &str = "street_address";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const POSTAL_CODE: &str = "postal_code";

    pub const COMPANY: &str = "company";
    pub const COMPANY_SOURCE: &str = "company_source";
    pub const COMPANY_CONFIDENCE: &str = "company_confidence";
    pub const JOB_TITLE: &str = "job_title";

    pub const QUALITY_SCORE: &str = "quality_score";
    pub const QUALITY_TIER: &str = "quality_tier";
    pub const QUALITY_COMPONENTS: &str = "quality_components";
    pub const QUALITY_ISSUES: &str = "quality_issues";

    pub const MERGE_CONFIDENCE: &str = "merge_confidence";
    pub const MERGE_MATCH_TYPE: &str = "merge_match_type";
    pub const MERGE_EVIDENCE: &str = "merge_evidence";
    pub const MERGED_FROM: &str = "merged_from";
    pub const MERGE_CONFLICTS: &str = "merge_conflicts";
    pub const MERGE_CONFLICT_FIELDS: &str = "merge_conflict_fields";

    /// Fields resolved by confidence during a merge and logged as conflicts.
    pub const CRITICAL: [&str; 4] = [PRIMARY_EMAIL, PRIMARY_PHONE, FIRST_NAME, LAST_NAME];

    /// Suffix of the per-field confidence companion (`first_name_confidence`).
    pub const CONFIDENCE_SUFFIX: &str = "_confidence";

    pub fn is_critical(field: &str) -> bool {
        CRITICAL.contains(&field)
    }

    /// `first_name` -> `first_name_confidence`.
    pub fn confidence_key(field: &str) -> String {
        format!("{}{}", field, CONFIDENCE_SUFFIX)
    }

    /// The critical field a `<field>_confidence` key belongs to.
    pub fn critical_of_companion(key: &str) -> Option<&'static str> {
        let field = key.strip_suffix(CONFIDENCE_SUFFIX)?;
        CRITICAL.iter().copied().find(|critical| *critical == field)
    }
}

/// Confidence assumed for a field without a `<field>_confidence` companion.
pub const DEFAULT_FIELD_CONFIDENCE: f64 = 50.0;

// ============ Record Models ============

/// A single contact row: field name to value.
///
/// Blank values are stored as given but read back as absent, so an empty CSV
/// cell and a missing column behave the same. On the wire a record is a flat
/// JSON object; numbers and booleans are accepted and kept as their text form,
/// `null` drops the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, String>"
)]
pub struct ContactRecord {
    fields: BTreeMap<String, String>,
}

impl ContactRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (field, value) in pairs {
            record.set(field, value);
        }
        record
    }

    /// Value of `field` when present and not blank.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Sets `field`; a blank value removes it.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, value);
        }
    }

    /// Sets `field` when `value` is `Some`, removes it otherwise.
    pub fn set_opt(&mut self, field: impl Into<String>, value: Option<impl Into<String>>) {
        match value {
            Some(v) => self.set(field, v),
            None => {
                self.fields.remove(&field.into());
            }
        }
    }

    /// Builder-style [`ContactRecord::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.fields.remove(field)
    }

    /// Every field name, including ones holding blank values.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Present (non-blank) fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Confidence recorded for `field`, if the record carries one.
    pub fn explicit_confidence(&self, field: &str) -> Option<f64> {
        self.get(&fields::confidence_key(field))
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|c| c.is_finite())
    }

    /// Confidence for `field`, defaulting to [`DEFAULT_FIELD_CONFIDENCE`].
    pub fn confidence(&self, field: &str) -> f64 {
        self.explicit_confidence(field)
            .unwrap_or(DEFAULT_FIELD_CONFIDENCE)
    }
}

impl From<BTreeMap<String, Value>> for ContactRecord {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let mut record = ContactRecord::new();
        for (field, value) in raw {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            record.fields.insert(field, text);
        }
        record
    }
}

impl From<ContactRecord> for BTreeMap<String, String> {
    fn from(record: ContactRecord) -> Self {
        record.fields
    }
}

// ============ Name Models ============

/// Where a [`ParsedName`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParsingSource {
    /// First and last name were supplied separately and taken as-is.
    SplitComponents,
    /// Components were decomposed from a full-name string.
    FullName,
    /// Nothing usable was supplied.
    None,
}

impl ParsingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParsingSource::SplitComponents => "SPLIT_COMPONENTS",
            ParsingSource::FullName => "FULL_NAME",
            ParsingSource::None => "NONE",
        }
    }
}

/// A personal name split into its canonical components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    pub prefix: Option<String>,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub suffix: Option<String>,
    /// Present components joined by single spaces in the order prefix,
    /// first, middle, last, suffix.
    pub full_name_clean: String,
    pub parsing_source: ParsingSource,
}

impl ParsedName {
    /// The well-formed result for absent input.
    pub fn empty() -> Self {
        Self {
            prefix: None,
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            suffix: None,
            full_name_clean: String::new(),
            parsing_source: ParsingSource::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full_name_clean.is_empty()
    }

    /// Joins the present components in canonical order.
    pub fn build_full_name(&self) -> String {
        [
            self.prefix.as_deref(),
            Some(self.first_name.as_str()),
            Some(self.middle_name.as_str()),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Replaces the first name with a detected compound (`T` + `J` → `TJ`)
    /// and drops the middle name that was folded into it.
    pub fn with_compound_first(mut self, compound: impl Into<String>) -> Self {
        self.first_name = compound.into();
        self.middle_name.clear();
        self.full_name_clean = self.build_full_name();
        self
    }
}

// ============ Matching Models ============

/// Strategy that produced a match candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    Email,
    Phone,
    Name,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Email => "EMAIL",
            MatchType::Phone => "PHONE",
            MatchType::Name => "NAME",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of records believed to describe the same contact.
///
/// `idx1 < idx2` always holds for candidates built by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub idx1: usize,
    pub idx2: usize,
    /// Match confidence in [0, 1].
    pub confidence: f64,
    pub match_type: MatchType,
    /// Human-readable reason, e.g. `a@x.com ≈ b@x.com`.
    pub evidence: String,
}

impl MatchCandidate {
    /// The unordered pair, canonicalized.
    pub fn pair(&self) -> (usize, usize) {
        (self.idx1.min(self.idx2), self.idx1.max(self.idx2))
    }
}

// ============ Merge Models ============

/// How accepted candidates are turned into merge groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Greedy, confidence-ordered, at most one partner per record per pass.
    #[default]
    Pairwise,
    /// Connected components over every candidate (union-find).
    Transitive,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::Pairwise => "pairwise",
            MergePolicy::Transitive => "transitive",
        }
    }
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pairwise" => Ok(MergePolicy::Pairwise),
            "transitive" => Ok(MergePolicy::Transitive),
            other => Err(format!(
                "unknown merge policy '{}' (expected 'pairwise' or 'transitive')",
                other
            )),
        }
    }
}

/// A critical field whose two values disagreed during a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field: String,
    pub value1: String,
    pub value2: String,
    pub selected: String,
}

/// One merge, as recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Deduplication pass (1-based) that performed the merge.
    pub pass: usize,
    /// Input indices folded into the output record, ascending.
    pub source_indices: Vec<usize>,
    /// Position of the merged record in the pass output.
    pub result_index: usize,
    pub match_type: MatchType,
    pub confidence: f64,
    pub num_conflicts: usize,
    pub data_recovered: usize,
    pub conflicts: Vec<FieldConflict>,
    pub evidence: String,
}

/// Result of merging one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub records: Vec<ContactRecord>,
    pub audit: Vec<AuditEntry>,
    /// Source indices behind `records[k]`; singletons have one entry.
    pub groups: Vec<Vec<usize>>,
}

// ============ Quality Models ============

/// Coarse quality bucket derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityTier {
    Premium,
    High,
    Medium,
    Low,
    Minimal,
}

impl QualityTier {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 85 => QualityTier::Premium,
            s if s >= 70 => QualityTier::High,
            s if s >= 50 => QualityTier::Medium,
            s if s >= 30 => QualityTier::Low,
            _ => QualityTier::Minimal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Premium => "PREMIUM",
            QualityTier::High => "HIGH",
            QualityTier::Medium => "MEDIUM",
            QualityTier::Low => "LOW",
            QualityTier::Minimal => "MINIMAL",
        }
    }
}

// ============ API Request/Response Models ============

/// Per-request overrides of the configured deduplication settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DedupSettingsOverride {
    pub email_threshold: Option<f64>,
    pub name_threshold: Option<f64>,
    pub confidence_min: Option<f64>,
    pub aggressive_mode: Option<bool>,
    pub merge_policy: Option<MergePolicy>,
    pub passes: Option<usize>,
    pub merge_compound_names: Option<bool>,
}

/// Request payload for a full cleaning run.
#[derive(Debug, Deserialize)]
pub struct CleanRequest {
    pub records: Vec<ContactRecord>,
    #[serde(default)]
    pub settings: Option<DedupSettingsOverride>,
}

/// Response payload for a full cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanResponse {
    pub run_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub records: Vec<ContactRecord>,
    pub candidates: Vec<MatchCandidate>,
    pub audit: Vec<AuditEntry>,
    pub stats: PipelineStats,
}

/// Request payload for parsing a single name.
#[derive(Debug, Default, Deserialize)]
pub struct ParseNameRequest {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Fold a compound first + middle (`T` `J`) into the first name.
    #[serde(default)]
    pub merge_compound: bool,
}

/// Request payload carrying a bare batch of records.
#[derive(Debug, Deserialize)]
pub struct RecordsRequest {
    pub records: Vec<ContactRecord>,
}

/// Response payload carrying a bare batch of records.
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<ContactRecord>,
}

/// Request payload for duplicate detection.
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub records: Vec<ContactRecord>,
    #[serde(default)]
    pub settings: Option<DedupSettingsOverride>,
}

/// Response payload for duplicate detection.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub candidates: Vec<MatchCandidate>,
    pub stats: DetectorStats,
}

/// Request payload for merging caller-supplied candidates.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub records: Vec<ContactRecord>,
    pub candidates: Vec<MatchCandidate>,
    #[serde(default)]
    pub policy: Option<MergePolicy>,
}

/// Response payload for a merge.
#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub records: Vec<ContactRecord>,
    pub audit: Vec<AuditEntry>,
    pub stats: MergerStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_read_as_absent() {
        let record = ContactRecord::from_pairs([("first_name", "Ana"), ("last_name", "  ")]);
        assert_eq!(record.get("first_name"), Some("Ana"));
        assert_eq!(record.get("last_name"), None);
        assert!(!record.has("primary_email"));
    }

    #[test]
    fn json_numbers_and_nulls() {
        let record: ContactRecord = serde_json::from_str(
            r#"{"first_name": "Ana", "first_name_confidence": 90, "company": null}"#,
        )
        .unwrap();

        assert_eq!(record.confidence("first_name"), 90.0);
        assert_eq!(record.confidence("last_name"), DEFAULT_FIELD_CONFIDENCE);
        assert!(!record.has("company"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["first_name_confidence"], "90");
    }

    #[test]
    fn full_name_follows_component_order() {
        let name = ParsedName {
            prefix: Some("Dr.".into()),
            first_name: "John".into(),
            middle_name: String::new(),
            last_name: "Smith".into(),
            suffix: Some("Jr.".into()),
            full_name_clean: String::new(),
            parsing_source: ParsingSource::FullName,
        };
        assert_eq!(name.build_full_name(), "Dr. John Smith Jr.");
    }

    #[test]
    fn merge_policy_parses_case_insensitively() {
        assert_eq!("Transitive".parse::<MergePolicy>(), Ok(MergePolicy::Transitive));
        assert!("chain".parse::<MergePolicy>().is_err());
    }

    #[test]
    fn tiers() {
        assert_eq!(QualityTier::from_score(115), QualityTier::Premium);
        assert_eq!(QualityTier::from_score(70), QualityTier::High);
        assert_eq!(QualityTier::from_score(50), QualityTier::Medium);
        assert_eq!(QualityTier::from_score(30), QualityTier::Low);
        assert_eq!(QualityTier::from_score(29), QualityTier::Minimal);
    }
}
