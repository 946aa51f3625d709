/// Record enrichment derived from fields a record already carries
///
/// This module fills gaps without any outside lookups:
/// 1. Company name from the email domain (or standardize the provided one)
/// 2. First/last name guessed from the email local part when both are missing
/// 3. Job title casing
use crate::lookups::LookupService;
use crate::models::{fields, ContactRecord};
use crate::name_parser::NameParser;
use crate::validators::{DomainQuality, EmailValidator};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("camel case pattern is valid"));

pub const SOURCE_PROVIDED: &str = "PROVIDED";
pub const SOURCE_EXTRACTED_FROM_EMAIL: &str = "EXTRACTED_FROM_EMAIL";

pub const NAME_SOURCE_HIGH: &str = "HIGH (from email)";
pub const NAME_SOURCE_GUESSED: &str = "LOW (guessed from email)";
pub const NAME_SOURCE_PARTIAL: &str = "LOW (partial from email)";

/// Company attribution for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyExtraction {
    pub company_name: String,
    pub source: &'static str,
    pub confidence: u8,
    pub domain: Option<String>,
}

/// Name guessed from an email local part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailNameGuess {
    pub first_name: String,
    pub last_name: Option<String>,
    pub name_source: &'static str,
}

/// Counters tallied while enriching a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStats {
    pub companies_provided: usize,
    pub companies_extracted: usize,
    pub names_from_email: usize,
    pub names_high_confidence: usize,
    pub names_low_confidence: usize,
}

/// Python-style title case: a letter is uppercased when it follows a
/// non-letter, lowercased otherwise.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

pub fn standardize_job_title(title: &str) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title_case(title))
    }
}

/// Guesses a name from the local part of `email`
///
/// `.`, `_` and `-` separate words. Two or more words give first and last
/// name; a single word longer than eight characters is split in half; a
/// single word of four to eight characters becomes the first name only.
pub fn guess_name_from_email(email: &str) -> Option<EmailNameGuess> {
    let email = email.trim().to_lowercase();
    let (local, _) = email.split_once('@')?;

    let spaced: String = local
        .chars()
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect();
    let parts: Vec<&str> = spaced.split_whitespace().collect();

    match parts.as_slice() {
        [first, .., last] => Some(EmailNameGuess {
            first_name: title_case(first),
            last_name: Some(title_case(last)),
            name_source: NAME_SOURCE_HIGH,
        }),
        [single] if single.chars().count() > 8 => {
            let chars: Vec<char> = single.chars().collect();
            let mid = chars.len() / 2;
            let first: String = chars[..mid].iter().collect();
            let last: String = chars[mid..].iter().collect();
            Some(EmailNameGuess {
                first_name: title_case(&first),
                last_name: Some(title_case(&last)),
                name_source: NAME_SOURCE_GUESSED,
            })
        }
        [single] if single.chars().count() > 3 => Some(EmailNameGuess {
            first_name: title_case(single),
            last_name: None,
            name_source: NAME_SOURCE_PARTIAL,
        }),
        _ => None,
    }
}

/// Enricher bound to the lookup tables
pub struct RecordEnricher<'a, L: LookupService + ?Sized> {
    lookups: &'a L,
}

impl<'a, L: LookupService + ?Sized> RecordEnricher<'a, L> {
    pub fn new(lookups: &'a L) -> Self {
        Self { lookups }
    }

    /// Title case with camelCase split and trailing business indicators
    /// (`LLC`, `Inc.`) removed
    pub fn standardize_company_name(&self, name: &str) -> String {
        let name = name.trim();
        if name.is_empty() {
            return String::new();
        }

        let spaced = CAMEL_BOUNDARY.replace_all(name, "$1 $2");
        let mut words: Vec<String> = title_case(&spaced)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        while words.len() > 1 {
            let Some(last) = words.last() else { break };
            if !self.lookups.is_business_indicator(last) {
                break;
            }
            words.pop();
        }

        words
            .join(" ")
            .trim_end_matches(|c: char| c == ',' || c.is_whitespace())
            .to_string()
    }

    /// Provided company wins; otherwise the first label of a business email
    /// domain. Free-mail and disposable domains give nothing.
    pub fn extract_company(
        &self,
        email: Option<&str>,
        provided_company: Option<&str>,
    ) -> Option<CompanyExtraction> {
        if let Some(provided) = provided_company.map(str::trim).filter(|c| !c.is_empty()) {
            let company_name = self.standardize_company_name(provided);
            if !company_name.is_empty() {
                return Some(CompanyExtraction {
                    company_name,
                    source: SOURCE_PROVIDED,
                    confidence: 95,
                    domain: None,
                });
            }
        }

        let email = email?.trim().to_lowercase();
        let (_, domain) = email.rsplit_once('@')?;

        match EmailValidator::domain_quality(Some(domain)) {
            DomainQuality::Personal | DomainQuality::Disposable | DomainQuality::Unknown => {
                return None
            }
            _ => {}
        }

        let label = domain.split('.').next().unwrap_or_default();
        let company_name = self.standardize_company_name(label);
        if company_name.is_empty() {
            return None;
        }

        Some(CompanyExtraction {
            company_name,
            source: SOURCE_EXTRACTED_FROM_EMAIL,
            confidence: 75,
            domain: Some(domain.to_string()),
        })
    }

    /// Enriched copy of `record`
    pub fn enrich_record(&self, record: &ContactRecord) -> ContactRecord {
        let mut stats = EnrichmentStats::default();
        self.enrich_record_tallied(record, &mut stats)
    }

    fn enrich_record_tallied(
        &self,
        record: &ContactRecord,
        stats: &mut EnrichmentStats,
    ) -> ContactRecord {
        let mut out = record.clone();
        let email = record.get(fields::PRIMARY_EMAIL);

        if let Some(company) = self.extract_company(email, record.get(fields::COMPANY)) {
            if company.source == SOURCE_PROVIDED {
                stats.companies_provided += 1;
            } else {
                stats.companies_extracted += 1;
            }
            out.set(fields::COMPANY, company.company_name);
            out.set(fields::COMPANY_SOURCE, company.source);
            out.set(fields::COMPANY_CONFIDENCE, company.confidence.to_string());
        }

        if let Some(title) = record.get(fields::JOB_TITLE).and_then(standardize_job_title) {
            out.set(fields::JOB_TITLE, title);
        }

        let has_name = record.has(fields::FIRST_NAME) || record.has(fields::LAST_NAME);
        if !has_name {
            if let Some(guess) = email.and_then(guess_name_from_email) {
                tracing::debug!("Name guessed from email {:?}: {:?}", email, guess);
                stats.names_from_email += 1;
                if guess.name_source == NAME_SOURCE_HIGH {
                    stats.names_high_confidence += 1;
                } else {
                    stats.names_low_confidence += 1;
                }

                out.set(fields::FIRST_NAME, guess.first_name);
                out.set_opt(fields::LAST_NAME, guess.last_name);
                out.set(fields::NAME_SOURCE, guess.name_source);

                // Guessed names get the same nickname and spelling treatment
                if out.has(fields::LAST_NAME) {
                    out = NameParser::new(self.lookups).parse_record(&out);
                }
            }
        }

        out
    }

    pub fn enrich_records(&self, records: &[ContactRecord]) -> (Vec<ContactRecord>, EnrichmentStats) {
        let mut stats = EnrichmentStats::default();
        let enriched = records
            .iter()
            .map(|record| self.enrich_record_tallied(record, &mut stats))
            .collect();

        tracing::info!(
            "Enriched {} records: {} companies provided, {} extracted from email, {} names from email ({} high, {} low)",
            records.len(),
            stats.companies_provided,
            stats.companies_extracted,
            stats.names_from_email,
            stats.names_high_confidence,
            stats.names_low_confidence
        );

        (enriched, stats)
    }
}
