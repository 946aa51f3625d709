//! Pairwise duplicate detection.
//!
//! Every unordered pair of records is tried against three strategies in a
//! fixed order (email, phone, name); the first that fires produces the pair's
//! only [`MatchCandidate`].

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{fields, ContactRecord, MatchCandidate, MatchType};
use crate::similarity::{fuzzy_match_score, normalize_email, phone_digits};

/// Local parts of same-domain emails are compared at this threshold.
const SAME_DOMAIN_LOCAL_THRESHOLD: f64 = 0.85;
const SAME_DOMAIN_SCALE: f64 = 0.95;
/// Cross-domain emails are compared whole at this threshold.
const CROSS_DOMAIN_THRESHOLD: f64 = 0.90;
const CROSS_DOMAIN_SCALE: f64 = 0.7;

const PHONE_MIN_DIGITS: usize = 10;
const PHONE_MATCH_MIN: f64 = 0.95;

/// Acceptance thresholds for the three strategies, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionThresholds {
    pub email_threshold: f64,
    pub name_threshold: f64,
    pub confidence_min: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            email_threshold: 0.90,
            name_threshold: 0.85,
            confidence_min: 0.70,
        }
    }
}

impl DetectionThresholds {
    /// Rejects any threshold outside [0, 1] (or NaN); values are never clamped.
    pub fn new(email_threshold: f64, name_threshold: f64, confidence_min: f64) -> Result<Self, AppError> {
        let thresholds = Self {
            email_threshold,
            name_threshold,
            confidence_min,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_unit_interval("email_threshold", self.email_threshold)?;
        check_unit_interval("name_threshold", self.name_threshold)?;
        check_unit_interval("confidence_min", self.confidence_min)?;
        Ok(())
    }
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> Result<(), AppError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AppError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

/// Counters tallied over one detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub records_compared: usize,
    pub pairs_compared: usize,
    pub email_matches: usize,
    pub phone_matches: usize,
    pub name_matches: usize,
    pub potential_duplicates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    pub candidates: Vec<MatchCandidate>,
    pub stats: DetectorStats,
}

/// A strategy's verdict on one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyMatch {
    pub confidence: f64,
    pub evidence: String,
}

pub struct DuplicateDetector {
    thresholds: DetectionThresholds,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self {
            thresholds: DetectionThresholds::default(),
        }
    }
}

impl DuplicateDetector {
    pub fn new(thresholds: DetectionThresholds) -> Result<Self, AppError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> DetectionThresholds {
        self.thresholds
    }

    /// Email strategy.
    ///
    /// Exact match scores 1.0. Same domain: local-part similarity × 0.95.
    /// Different domain: whole-address similarity × 0.7.
    pub fn match_emails(&self, a: &ContactRecord, b: &ContactRecord) -> Option<StrategyMatch> {
        let email1 = normalize_email(a.get(fields::PRIMARY_EMAIL)?)?;
        let email2 = normalize_email(b.get(fields::PRIMARY_EMAIL)?)?;

        let score = email_similarity(&email1, &email2);
        tracing::debug!("Email score {:.3}: {} vs {}", score, email1, email2);

        if score >= self.thresholds.email_threshold {
            Some(StrategyMatch {
                confidence: score,
                evidence: format!("{} ≈ {}", email1, email2),
            })
        } else {
            None
        }
    }

    /// Phone strategy: last ten digits must be identical.
    pub fn match_phones(&self, a: &ContactRecord, b: &ContactRecord) -> Option<StrategyMatch> {
        let raw1 = a.get(fields::PRIMARY_PHONE)?;
        let raw2 = b.get(fields::PRIMARY_PHONE)?;
        let digits1 = phone_digits(raw1)?;
        let digits2 = phone_digits(raw2)?;

        if digits1.len() < PHONE_MIN_DIGITS || digits2.len() < PHONE_MIN_DIGITS {
            return None;
        }

        let tail1 = &digits1[digits1.len() - PHONE_MIN_DIGITS..];
        let tail2 = &digits2[digits2.len() - PHONE_MIN_DIGITS..];
        let score = if tail1 == tail2 { 1.0 } else { 0.0 };

        if score >= PHONE_MATCH_MIN {
            Some(StrategyMatch {
                confidence: score,
                evidence: format!("{} = {}", raw1, raw2),
            })
        } else {
            None
        }
    }

    /// Name strategy.
    ///
    /// First and last names must each reach `name_threshold` on their own;
    /// the confidence is their mean and must reach `confidence_min`.
    pub fn match_names(&self, a: &ContactRecord, b: &ContactRecord) -> Option<StrategyMatch> {
        let first1 = a.get(fields::FIRST_NAME)?;
        let last1 = a.get(fields::LAST_NAME)?;
        let first2 = b.get(fields::FIRST_NAME)?;
        let last2 = b.get(fields::LAST_NAME)?;

        let (first_score, first_match) =
            fuzzy_match_score(first1, first2, self.thresholds.name_threshold);
        let (last_score, last_match) =
            fuzzy_match_score(last1, last2, self.thresholds.name_threshold);

        if !(first_match && last_match) {
            return None;
        }

        let confidence = (first_score + last_score) / 2.0;
        if confidence >= self.thresholds.confidence_min {
            Some(StrategyMatch {
                confidence,
                evidence: format!("{} {} ≈ {} {}", first1, last1, first2, last2),
            })
        } else {
            None
        }
    }

    /// Best candidate for one pair, strategies tried in priority order.
    pub fn compare(&self, idx1: usize, a: &ContactRecord, idx2: usize, b: &ContactRecord) -> Option<MatchCandidate> {
        let (match_type, found) = if let Some(found) = self.match_emails(a, b) {
            (MatchType::Email, found)
        } else if let Some(found) = self.match_phones(a, b) {
            (MatchType::Phone, found)
        } else if let Some(found) = self.match_names(a, b) {
            (MatchType::Name, found)
        } else {
            return None;
        };

        Some(MatchCandidate {
            idx1: idx1.min(idx2),
            idx2: idx1.max(idx2),
            confidence: found.confidence,
            match_type,
            evidence: found.evidence,
        })
    }

    /// Compares every unordered pair of `records`.
    ///
    /// Candidates come out in pair order (`idx1` ascending, then `idx2`).
    pub fn find_duplicates(&self, records: &[ContactRecord]) -> DetectionResult {
        let mut stats = DetectorStats {
            records_compared: records.len(),
            ..DetectorStats::default()
        };
        let mut candidates = Vec::new();

        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                stats.pairs_compared += 1;

                let Some(candidate) = self.compare(i, &records[i], j, &records[j]) else {
                    continue;
                };

                match candidate.match_type {
                    MatchType::Email => stats.email_matches += 1,
                    MatchType::Phone => stats.phone_matches += 1,
                    MatchType::Name => stats.name_matches += 1,
                }
                tracing::debug!(
                    "Candidate {}-{} {} {:.3}: {}",
                    candidate.idx1,
                    candidate.idx2,
                    candidate.match_type,
                    candidate.confidence,
                    candidate.evidence
                );
                candidates.push(candidate);
            }
        }

        stats.potential_duplicates = candidates.len();

        tracing::info!(
            "Compared {} pairs across {} records: {} candidates ({} email, {} phone, {} name)",
            stats.pairs_compared,
            stats.records_compared,
            stats.potential_duplicates,
            stats.email_matches,
            stats.phone_matches,
            stats.name_matches
        );

        DetectionResult { candidates, stats }
    }
}

/// Scaled email similarity in [0, 1] for two normalized addresses.
pub fn email_similarity(email1: &str, email2: &str) -> f64 {
    if email1 == email2 {
        return 1.0;
    }

    let (Some((local1, domain1)), Some((local2, domain2))) =
        (email1.rsplit_once('@'), email2.rsplit_once('@'))
    else {
        return 0.0;
    };

    if domain1 == domain2 {
        let (score, _) = fuzzy_match_score(local1, local2, SAME_DOMAIN_LOCAL_THRESHOLD);
        score * SAME_DOMAIN_SCALE
    } else {
        let (score, _) = fuzzy_match_score(email1, email2, CROSS_DOMAIN_THRESHOLD);
        score * CROSS_DOMAIN_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        assert!(DetectionThresholds::new(1.2, 0.85, 0.7).unwrap_err().is_invalid_config());
        assert!(DetectionThresholds::new(0.9, -0.1, 0.7).is_err());
        assert!(DetectionThresholds::new(0.9, 0.85, f64::NAN).is_err());
        assert!(DetectionThresholds::new(0.0, 1.0, 0.5).is_ok());
    }

    #[test]
    fn email_similarity_scaling() {
        assert_eq!(email_similarity("a@x.com", "a@x.com"), 1.0);
        // "jsmith" vs "jsmyth": one edit over six characters
        let same_domain = email_similarity("jsmith@acme.com", "jsmyth@acme.com");
        assert!((same_domain - (5.0 / 6.0) * 0.95).abs() < 1e-9);
        assert!(email_similarity("jsmith@acme.com", "jsmith@acme.org") <= 0.7);
        assert_eq!(email_similarity("not-an-email", "jsmith@acme.com"), 0.0);
    }
}
