//! Point-based record quality scoring.
//!
//! | Category | Points |
//! |---|---|
//! | Name (first + last) | 35, +5 with prefix/middle/suffix, −5 on an invalid pattern; 17 for a partial name |
//! | Email | 25 valid (−10 disposable, −5 generic); 5 present but invalid |
//! | Phone | 15 valid; 8 uncertain |
//! | Address | 15 complete; otherwise 15 × parts / 4 |
//! | Company | 10 |
//!
//! A record with every category gets a 10% bonus. The stored score is capped
//! at [`MAX_SCORE`]; the tier is taken before capping.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::models::{fields, ContactRecord, QualityTier};
use crate::validators::{
    AddressValidator, DomainQuality, EmailValidator, NameValidator, PhoneFormat, PhoneValidator,
};

pub const MAX_SCORE: i32 = 115;

pub const FLAG_MISSING_FIRST_NAME: &str = "flag_missing_first_name";
pub const FLAG_MISSING_LAST_NAME: &str = "flag_missing_last_name";
pub const FLAG_SINGLE_NAME_ONLY: &str = "flag_single_name_only";
pub const FLAG_MIDDLE_ONLY: &str = "flag_middle_only";
pub const FLAG_HAS_NUMBERS: &str = "flag_has_numbers";
pub const FLAG_POSSIBLE_COMPANY_NAME: &str = "flag_possible_company_name";

const COMPANY_KEYWORDS: &[&str] = &[
    "inc",
    "llc",
    "corp",
    "ltd",
    "company",
    "co",
    "corporation",
    "incorporated",
    "limited",
    "group",
    "associates",
    "partners",
    "foundation",
    "institute",
    "organization",
    "association",
    "trust",
    "holdings",
    "ventures",
    "capital",
    "consulting",
    "solutions",
    "services",
    "systems",
    "technologies",
    "enterprises",
];

static GENERATIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(II|III|IV|V|2nd|3rd|4th|5th)$").expect("generational pattern is valid")
});

/// Score breakdown for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityScore {
    pub score: i32,
    pub tier: QualityTier,
    pub components: Vec<String>,
    pub issues: Vec<String>,
    pub max_score: i32,
}

pub struct QualityScorer;

impl QualityScorer {
    pub fn calculate_score(record: &ContactRecord) -> QualityScore {
        let mut score: i32 = 0;
        let mut components: Vec<String> = Vec::new();
        let mut issues: Vec<String> = Vec::new();

        // Names
        let first_name = record.get(fields::FIRST_NAME);
        let last_name = record.get(fields::LAST_NAME);
        let has_name = first_name.is_some() && last_name.is_some();

        if has_name {
            score += 35;
            components.push("Name".to_string());

            if record.has(fields::PREFIX)
                || record.has(fields::SUFFIX)
                || record.has(fields::MIDDLE_NAME)
            {
                score += 5;
                components.push("Name_Complete".to_string());
            }

            let name_issues = NameValidator::detect_invalid_patterns(first_name, last_name);
            if !name_issues.is_empty() {
                score -= 5;
                issues.extend(name_issues);
            }
        } else if first_name.is_some() || last_name.is_some() {
            score += 17;
            components.push("Name_Partial".to_string());
        }

        // Email
        let email = record.get(fields::PRIMARY_EMAIL);
        if let Some(email) = email {
            let validation = EmailValidator::validate(email);
            if validation.valid {
                score += 25;
                components.push("Email".to_string());

                match EmailValidator::domain_quality(validation.domain.as_deref()) {
                    DomainQuality::Disposable => {
                        score -= 10;
                        issues.push("Disposable email domain".to_string());
                    }
                    DomainQuality::Generic => {
                        score -= 5;
                        issues.push("Generic email domain".to_string());
                    }
                    _ => {}
                }
            } else {
                score += 5;
                issues.push(format!("Invalid email: {}", validation.issues.join(", ")));
            }
        }

        // Phone
        let phone = record.get(fields::PRIMARY_PHONE);
        if let Some(phone) = phone {
            let standardized = PhoneValidator::standardize(phone, PhoneFormat::Vba);
            if standardized.valid && standardized.confidence >= 90 {
                score += 15;
                components.push("Phone".to_string());
            } else if standardized.confidence >= 70 {
                score += 8;
                components.push("Phone_Uncertain".to_string());
            } else {
                issues.push("Invalid phone format".to_string());
            }
        }

        // Address
        let street = record.get(fields::STREET_ADDRESS);
        let city = record.get(fields::CITY);
        let state = record.get(fields::STATE);
        let zip = record.get(fields::POSTAL_CODE);

        let (address_complete, address_issues) =
            AddressValidator::validate_complete(street, city, state, zip);
        if address_complete {
            score += 15;
            components.push("Address".to_string());
        } else {
            let parts = [
                street.is_some(),
                city.is_some(),
                state.and_then(AddressValidator::standardize_state).is_some(),
                zip.is_some(),
            ]
            .into_iter()
            .filter(|present| *present)
            .count() as i32;

            if parts > 0 {
                score += 15 * parts / 4;
                components.push(format!("Address_Partial({}/4)", parts));
            }
            issues.extend(address_issues);
        }

        // Company
        let has_company = record.has(fields::COMPANY);
        if has_company {
            score += 10;
            if record.get(fields::COMPANY_SOURCE) == Some("EXTRACTED_FROM_EMAIL") {
                components.push("Company_Extracted".to_string());
            } else {
                components.push("Company_Provided".to_string());
            }
        }

        if has_name && email.is_some() && phone.is_some() && address_complete && has_company {
            let bonus = score / 10;
            score += bonus;
            components.push(format!("Bonus({})", bonus));
        }

        QualityScore {
            score: score.min(MAX_SCORE),
            tier: QualityTier::from_score(score),
            components,
            issues,
            max_score: MAX_SCORE,
        }
    }

    /// Copy of `record` annotated with its score and name quality flags.
    pub fn score_record(record: &ContactRecord) -> ContactRecord {
        let result = Self::calculate_score(record);

        let mut out = record.clone();
        out.set(fields::QUALITY_SCORE, result.score.to_string());
        out.set(fields::QUALITY_TIER, result.tier.as_str());
        out.set(fields::QUALITY_COMPONENTS, result.components.join("; "));
        out.set(fields::QUALITY_ISSUES, result.issues.join("; "));

        for (flag, raised) in name_flags(record) {
            out.set(flag, raised.to_string());
        }

        out
    }

    pub fn score_records(records: &[ContactRecord]) -> Vec<ContactRecord> {
        let scored: Vec<ContactRecord> = records.iter().map(Self::score_record).collect();

        let premium = scored
            .iter()
            .filter(|r| r.get(fields::QUALITY_TIER) == Some(QualityTier::Premium.as_str()))
            .count();
        tracing::info!("Scored {} records ({} premium)", scored.len(), premium);

        scored
    }
}

/// Name quality flags, in a fixed order.
///
/// A name that looks like a company raises only
/// [`FLAG_POSSIBLE_COMPANY_NAME`]; the other checks are skipped for it.
pub fn name_flags(record: &ContactRecord) -> [(&'static str, bool); 6] {
    let first = record.get(fields::FIRST_NAME);
    let middle = record.get(fields::MIDDLE_NAME);
    let last = record.get(fields::LAST_NAME);

    let mut flags = [
        (FLAG_MISSING_FIRST_NAME, false),
        (FLAG_MISSING_LAST_NAME, false),
        (FLAG_SINGLE_NAME_ONLY, false),
        (FLAG_MIDDLE_ONLY, false),
        (FLAG_HAS_NUMBERS, false),
        (FLAG_POSSIBLE_COMPANY_NAME, false),
    ];

    if looks_like_company([first, middle, last].into_iter().flatten()) {
        flags[5].1 = true;
        return flags;
    }

    let has_first = first.is_some();
    let has_last = last.is_some();

    flags[0].1 = !has_first;
    flags[1].1 = !has_last;
    flags[2].1 = has_first != has_last;
    flags[3].1 = middle.is_some() && !(has_first && has_last);
    flags[4].1 = [first, last, middle]
        .into_iter()
        .flatten()
        .map(str::trim)
        .any(|name| name.chars().any(|c| c.is_ascii_digit()) && !GENERATIONAL.is_match(name));

    flags
}

fn looks_like_company<'a>(names: impl Iterator<Item = &'a str>) -> bool {
    names
        .flat_map(|name| name.split(|c: char| c.is_whitespace() || c == ','))
        .map(|token| token.trim_end_matches('.').to_lowercase())
        .any(|token| COMPANY_KEYWORDS.contains(&token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_keywords_match_whole_tokens() {
        assert!(looks_like_company(["Acme", "Inc."].into_iter()));
        assert!(!looks_like_company(["Colleen", "Cohen"].into_iter()));
    }

    #[test]
    fn generational_suffix_is_not_a_number_flag() {
        let record = ContactRecord::new()
            .with(fields::FIRST_NAME, "John")
            .with(fields::LAST_NAME, "III");
        let flags = name_flags(&record);
        assert!(!flags[4].1);

        let record = ContactRecord::new()
            .with(fields::FIRST_NAME, "J0hn")
            .with(fields::LAST_NAME, "Smith");
        assert!(name_flags(&record)[4].1);
    }
}
