//! Personal name parsing and standardization.
//!
//! A name arrives either already split (first and last name both present) or
//! as one free-text string. Either way the result is a [`ParsedName`] whose
//! first, middle and last names have been passed through the lookup tables:
//! nickname → variation → misspelling for given names, variation →
//! misspelling for surnames.

use serde::{Deserialize, Serialize};

use crate::lookups::LookupService;
use crate::models::{fields, ContactRecord, ParsedName, ParsingSource};

/// Counters tallied while parsing a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserStats {
    pub names_parsed: usize,
    pub from_split_components: usize,
    pub from_full_name: usize,
    pub unparseable: usize,
    pub prefixes_found: usize,
    pub suffixes_found: usize,
    pub nicknames_converted: usize,
    pub variations_fixed: usize,
    pub misspellings_fixed: usize,
    pub compound_names_detected: usize,
}

/// Trimmed value, or `None` when absent or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Name parser bound to a lookup service.
pub struct NameParser<'a, L: LookupService + ?Sized> {
    lookups: &'a L,
}

impl<'a, L: LookupService + ?Sized> NameParser<'a, L> {
    pub fn new(lookups: &'a L) -> Self {
        Self { lookups }
    }

    /// Parses a name from whichever inputs are present.
    ///
    /// Split components win when both `first_name` and `last_name` are
    /// present; otherwise `full_name` is decomposed; otherwise the result is
    /// empty with [`ParsingSource::None`]. Never fails.
    pub fn parse(
        &self,
        full_name: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        middle_name: Option<&str>,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> ParsedName {
        let mut stats = ParserStats::default();
        self.parse_tallied(
            full_name,
            first_name,
            last_name,
            middle_name,
            prefix,
            suffix,
            &mut stats,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_tallied(
        &self,
        full_name: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        middle_name: Option<&str>,
        prefix: Option<&str>,
        suffix: Option<&str>,
        stats: &mut ParserStats,
    ) -> ParsedName {
        stats.names_parsed += 1;

        let mut parsed = match (present(first_name), present(last_name), present(full_name)) {
            (Some(first), Some(last), _) => {
                stats.from_split_components += 1;
                ParsedName {
                    prefix: present(prefix).map(str::to_string),
                    first_name: first.to_string(),
                    middle_name: present(middle_name).unwrap_or_default().to_string(),
                    last_name: last.to_string(),
                    suffix: present(suffix).map(str::to_string),
                    full_name_clean: String::new(),
                    parsing_source: ParsingSource::SplitComponents,
                }
            }
            (_, _, Some(full)) => {
                stats.from_full_name += 1;
                let parsed = self.decompose(full);
                if parsed.prefix.is_some() {
                    stats.prefixes_found += 1;
                }
                if parsed.suffix.is_some() {
                    stats.suffixes_found += 1;
                }
                parsed
            }
            _ => {
                stats.unparseable += 1;
                return ParsedName::empty();
            }
        };

        self.standardize(&mut parsed, stats);
        parsed.full_name_clean = parsed.build_full_name();
        parsed
    }

    /// Token-by-token decomposition of a free-text name.
    fn decompose(&self, full_name: &str) -> ParsedName {
        let mut parsed = ParsedName::empty();
        parsed.parsing_source = ParsingSource::FullName;

        let tokens: Vec<&str> = full_name.split_whitespace().collect();
        if tokens.is_empty() {
            return parsed;
        }

        let mut cursor = 0;

        if let Some(prefix) = self.lookups.resolve_prefix(tokens[cursor]) {
            parsed.prefix = Some(prefix);
            cursor += 1;
        }

        if let Some(first) = tokens.get(cursor) {
            parsed.first_name = first.to_string();
            cursor += 1;
        }

        // The first suffix found ends the name; anything after it is dropped.
        for (offset, token) in tokens[cursor.min(tokens.len())..].iter().enumerate() {
            if let Some(suffix) = self.lookups.resolve_suffix(token) {
                parsed.suffix = Some(suffix);
                split_middle_last(&tokens[cursor..cursor + offset], &mut parsed);
                return parsed;
            }
        }

        split_middle_last(&tokens[cursor.min(tokens.len())..], &mut parsed);
        parsed
    }

    fn standardize(&self, parsed: &mut ParsedName, stats: &mut ParserStats) {
        if !parsed.first_name.is_empty() {
            let original = parsed.first_name.trim().to_string();
            let formal = self.lookups.resolve_nickname(&original);
            if formal.is_some() {
                stats.nicknames_converted += 1;
            }
            let formal = formal.unwrap_or(original);
            parsed.first_name = self.variation_then_misspelling(&formal, Some(&mut *stats));
        }

        if !parsed.middle_name.is_empty() {
            let original = parsed.middle_name.trim().to_string();
            let formal = self
                .lookups
                .resolve_nickname(&original)
                .unwrap_or(original);
            parsed.middle_name = self.variation_then_misspelling(&formal, None);
        }

        if !parsed.last_name.is_empty() {
            let original = parsed.last_name.trim().to_string();
            parsed.last_name = self.variation_then_misspelling(&original, Some(&mut *stats));
        }
    }

    /// Each resolver that changes the name bumps its own counter.
    fn variation_then_misspelling(
        &self,
        name: &str,
        mut stats: Option<&mut ParserStats>,
    ) -> String {
        let standard = match self.lookups.resolve_variation(name) {
            Some(variant) if variant != name => {
                if let Some(stats) = stats.as_deref_mut() {
                    stats.variations_fixed += 1;
                }
                variant
            }
            _ => name.to_string(),
        };

        match self.lookups.resolve_misspelling(&standard) {
            Some(fixed) if fixed != standard => {
                if let Some(stats) = stats {
                    stats.misspellings_fixed += 1;
                }
                fixed
            }
            _ => standard,
        }
    }

    /// Compound first name formed by `first_name` + `middle_name`, if any.
    pub fn detect_compound_name(&self, first_name: &str, middle_name: &str) -> Option<String> {
        self.lookups.resolve_compound(first_name, middle_name)
    }

    /// Folds a compound first + middle into the first name when the tables
    /// know the compound; returns the name unchanged otherwise.
    pub fn merge_compound(&self, parsed: ParsedName) -> ParsedName {
        match self.detect_compound_name(&parsed.first_name, &parsed.middle_name) {
            Some(compound) => parsed.with_compound_first(compound),
            None => parsed,
        }
    }

    /// Parses the name fields of `record` into a new record.
    ///
    /// Name fields are replaced with the parsed components; every other field
    /// is carried over untouched.
    pub fn parse_record(&self, record: &ContactRecord) -> ContactRecord {
        let mut stats = ParserStats::default();
        self.parse_record_tallied(record, false, &mut stats)
    }

    fn parse_record_tallied(
        &self,
        record: &ContactRecord,
        merge_compounds: bool,
        stats: &mut ParserStats,
    ) -> ContactRecord {
        let mut parsed = self.parse_tallied(
            record.get(fields::FULL_NAME),
            record.get(fields::FIRST_NAME),
            record.get(fields::LAST_NAME),
            record.get(fields::MIDDLE_NAME),
            record.get(fields::PREFIX),
            record.get(fields::SUFFIX),
            stats,
        );

        if merge_compounds {
            if let Some(compound) =
                self.detect_compound_name(&parsed.first_name, &parsed.middle_name)
            {
                tracing::debug!(
                    "Compound first name {} from '{} {}'",
                    compound,
                    parsed.first_name,
                    parsed.middle_name
                );
                stats.compound_names_detected += 1;
                parsed = parsed.with_compound_first(compound);
            }
        }

        let mut out = record.clone();
        if parsed.parsing_source == ParsingSource::None {
            out.set(fields::NAME_PARSING_SOURCE, ParsingSource::None.as_str());
            return out;
        }

        out.set_opt(fields::PREFIX, parsed.prefix);
        out.set(fields::FIRST_NAME, parsed.first_name);
        out.set(fields::MIDDLE_NAME, parsed.middle_name);
        out.set(fields::LAST_NAME, parsed.last_name);
        out.set_opt(fields::SUFFIX, parsed.suffix);
        out.set(fields::FULL_NAME_CLEAN, parsed.full_name_clean);
        out.set(fields::NAME_PARSING_SOURCE, parsed.parsing_source.as_str());
        out
    }

    /// Parses every record of a batch, tallying [`ParserStats`].
    pub fn parse_records(
        &self,
        records: &[ContactRecord],
        merge_compounds: bool,
    ) -> (Vec<ContactRecord>, ParserStats) {
        let mut stats = ParserStats::default();
        let parsed = records
            .iter()
            .map(|record| self.parse_record_tallied(record, merge_compounds, &mut stats))
            .collect();

        tracing::info!(
            "Parsed {} names ({} split, {} full-name, {} empty); {} nicknames, {} prefixes, {} suffixes",
            stats.names_parsed,
            stats.from_split_components,
            stats.from_full_name,
            stats.unparseable,
            stats.nicknames_converted,
            stats.prefixes_found,
            stats.suffixes_found
        );

        (parsed, stats)
    }
}

/// Last token of `span` is the last name; anything before it is the middle.
fn split_middle_last(span: &[&str], parsed: &mut ParsedName) {
    if let Some((last, middle)) = span.split_last() {
        parsed.last_name = last.to_string();
        parsed.middle_name = middle.join(" ");
    }
}
