//! Field-level format validators feeding the quality scorer.
//!
//! Validators never fail: every outcome, including "empty", is a value with a
//! list of human-readable issues.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static EMAIL_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[a-z]{2,}$").expect("email format pattern is valid")
});

static EMAIL_LOCAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%-]+$").expect("email local pattern is valid"));

static PHONE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:ext\.?|x)\s*([0-9]+)").expect("phone extension pattern is valid")
});

static ZIP5: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("zip pattern"));

static ZIP9: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}-[0-9]{4}$").expect("zip+4 pattern"));

static PO_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bP\.?O\.?\s+BOX\b|\bPOB\b").expect("po box pattern is valid")
});

// ============ Email ============

const DISPOSABLE_DOMAINS: &[&str] = &[
    "tempmail.com",
    "throwaway.email",
    "guerrillamail.com",
    "mailinator.com",
    "10minutemail.com",
    "sharklasers.com",
    "maildrop.cc",
    "yopmail.com",
    "temp-mail.org",
    "trashmail.com",
    "0-mail.com",
    "fakeinbox.com",
];

const GENERIC_DOMAINS: &[&str] = &[
    "test.com",
    "example.com",
    "sample.com",
    "demo.com",
    "tempmail.com",
];

const PERSONAL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "aol.com",
    "icloud.com",
    "mail.com",
    "protonmail.com",
];

/// Outcome of validating an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailValidation {
    pub valid: bool,
    /// Lowercased address, set only when valid.
    pub email_clean: Option<String>,
    pub domain: Option<String>,
    pub issues: Vec<String>,
}

/// Reputation class of an email domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DomainQuality {
    Unknown,
    Disposable,
    Generic,
    Personal,
    Business,
}

pub struct EmailValidator;

impl EmailValidator {
    /// Validate email format.
    ///
    /// Checks for:
    /// - Basic `local@domain.tld` shape
    /// - Allowed local-part characters
    /// - Local part ≤ 64 and domain ≤ 255 characters
    /// - No consecutive dots
    pub fn validate(email: &str) -> EmailValidation {
        let mut result = EmailValidation {
            valid: false,
            email_clean: None,
            domain: None,
            issues: Vec::new(),
        };

        let email = email.trim().to_lowercase();
        if email.is_empty() {
            result.issues.push("Empty email".to_string());
            return result;
        }

        if !EMAIL_FORMAT.is_match(&email) {
            tracing::debug!("Invalid email format: {}", email);
            result.issues.push("Invalid format".to_string());
            return result;
        }

        let Some((local, domain)) = email.rsplit_once('@') else {
            result.issues.push("Invalid format".to_string());
            return result;
        };

        if !EMAIL_LOCAL.is_match(local) {
            result.issues.push("Invalid local part".to_string());
            return result;
        }

        if local.len() > 64 {
            result.issues.push("Local part too long".to_string());
        }
        if domain.len() > 255 {
            result.issues.push("Domain too long".to_string());
        }
        if local.contains("..") || domain.contains("..") {
            result.issues.push("Consecutive dots".to_string());
        }

        if result.issues.is_empty() {
            result.valid = true;
            result.domain = Some(domain.to_string());
            result.email_clean = Some(email);
        }

        result
    }

    pub fn is_valid(email: &str) -> bool {
        Self::validate(email).valid
    }

    /// Classifies a (lowercase) domain.
    pub fn domain_quality(domain: Option<&str>) -> DomainQuality {
        let Some(domain) = domain.map(str::trim).filter(|d| !d.is_empty()) else {
            return DomainQuality::Unknown;
        };
        let domain = domain.to_lowercase();

        if DISPOSABLE_DOMAINS.contains(&domain.as_str()) {
            DomainQuality::Disposable
        } else if GENERIC_DOMAINS.contains(&domain.as_str()) {
            DomainQuality::Generic
        } else if PERSONAL_DOMAINS.contains(&domain.as_str()) {
            DomainQuality::Personal
        } else {
            DomainQuality::Business
        }
    }
}

// ============ Phone ============

/// Output layout for a standardized phone number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PhoneFormat {
    /// `314-550-0950 Ext. 12`
    #[default]
    Vba,
    /// `+13145500950`
    E164,
    /// `+1 314-550-0950`
    Intl,
    /// Bare ten digits.
    Digits,
}

/// Outcome of standardizing a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneStandardization {
    /// Formatted number when valid; the extracted digits otherwise.
    pub formatted: Option<String>,
    pub valid: bool,
    /// 0–100 confidence in the result.
    pub confidence: u8,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhoneType {
    Mobile,
    Landline,
}

const MOBILE_AREA_CODES: &[&str] = &[
    "201", "202", "203", "205", "206", "207", "208", "209", "210", "212", "213", "214", "215",
    "216", "217", "218", "219",
];

pub struct PhoneValidator;

impl PhoneValidator {
    /// Validate and standardize a North American phone number.
    ///
    /// - Extracts an extension (`ext`, `ext.`, `x`)
    /// - Requires ten digits, or eleven with a leading `1`
    /// - Formats the result as requested
    pub fn standardize(raw: &str, format: PhoneFormat) -> PhoneStandardization {
        let raw = raw.trim();
        if raw.is_empty() {
            return PhoneStandardization {
                formatted: None,
                valid: false,
                confidence: 0,
                extension: None,
            };
        }

        let (number, extension) = match PHONE_EXTENSION.captures(raw) {
            Some(caps) => {
                let start = caps.get(0).map(|m| m.start()).unwrap_or(raw.len());
                (
                    raw[..start].trim(),
                    caps.get(1).map(|m| m.as_str().to_string()),
                )
            }
            None => (raw, None),
        };

        let mut digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() < 10 {
            tracing::debug!("Phone too short: {}", raw);
            return PhoneStandardization {
                formatted: Some(digits).filter(|d| !d.is_empty()),
                valid: false,
                confidence: 20,
                extension,
            };
        }

        if digits.len() == 11 && digits.starts_with('1') {
            digits.remove(0);
        } else if digits.len() > 10 {
            tracing::debug!("Phone has invalid length: {}", raw);
            return PhoneStandardization {
                formatted: Some(digits),
                valid: false,
                confidence: 40,
                extension,
            };
        }

        let ext_suffix = extension
            .as_ref()
            .map(|e| format!(" Ext. {}", e))
            .unwrap_or_default();

        let (formatted, confidence) = match format {
            PhoneFormat::Vba => (
                format!("{}-{}-{}{}", &digits[..3], &digits[3..6], &digits[6..], ext_suffix),
                100,
            ),
            PhoneFormat::E164 => (format!("+1{}{}", digits, ext_suffix), 100),
            PhoneFormat::Intl => (
                format!(
                    "+1 {}-{}-{}{}",
                    &digits[..3],
                    &digits[3..6],
                    &digits[6..],
                    ext_suffix
                ),
                100,
            ),
            PhoneFormat::Digits => (digits, 80),
        };

        PhoneStandardization {
            formatted: Some(formatted),
            valid: true,
            confidence,
            extension,
        }
    }

    /// Rough mobile/landline guess from the area code.
    pub fn detect_phone_type(raw: &str) -> Option<PhoneType> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < 10 {
            return None;
        }
        let tail = &digits[digits.len() - 10..];
        if MOBILE_AREA_CODES.contains(&&tail[..3]) {
            Some(PhoneType::Mobile)
        } else {
            Some(PhoneType::Landline)
        }
    }
}

// ============ Address ============

const US_STATES: &[(&str, &str)] = &[
    ("ALABAMA", "AL"),
    ("ALASKA", "AK"),
    ("ARIZONA", "AZ"),
    ("ARKANSAS", "AR"),
    ("CALIFORNIA", "CA"),
    ("COLORADO", "CO"),
    ("CONNECTICUT", "CT"),
    ("DELAWARE", "DE"),
    ("FLORIDA", "FL"),
    ("GEORGIA", "GA"),
    ("HAWAII", "HI"),
    ("IDAHO", "ID"),
    ("ILLINOIS", "IL"),
    ("INDIANA", "IN"),
    ("IOWA", "IA"),
    ("KANSAS", "KS"),
    ("KENTUCKY", "KY"),
    ("LOUISIANA", "LA"),
    ("MAINE", "ME"),
    ("MARYLAND", "MD"),
    ("MASSACHUSETTS", "MA"),
    ("MICHIGAN", "MI"),
    ("MINNESOTA", "MN"),
    ("MISSISSIPPI", "MS"),
    ("MISSOURI", "MO"),
    ("MONTANA", "MT"),
    ("NEBRASKA", "NE"),
    ("NEVADA", "NV"),
    ("NEW HAMPSHIRE", "NH"),
    ("NEW JERSEY", "NJ"),
    ("NEW MEXICO", "NM"),
    ("NEW YORK", "NY"),
    ("NORTH CAROLINA", "NC"),
    ("NORTH DAKOTA", "ND"),
    ("OHIO", "OH"),
    ("OKLAHOMA", "OK"),
    ("OREGON", "OR"),
    ("PENNSYLVANIA", "PA"),
    ("RHODE ISLAND", "RI"),
    ("SOUTH CAROLINA", "SC"),
    ("SOUTH DAKOTA", "SD"),
    ("TENNESSEE", "TN"),
    ("TEXAS", "TX"),
    ("UTAH", "UT"),
    ("VERMONT", "VT"),
    ("VIRGINIA", "VA"),
    ("WASHINGTON", "WA"),
    ("WEST VIRGINIA", "WV"),
    ("WISCONSIN", "WI"),
    ("WYOMING", "WY"),
    ("DISTRICT OF COLUMBIA", "DC"),
];

pub struct AddressValidator;

impl AddressValidator {
    /// Normalized ZIP or ZIP+4, `None` when the value is not a ZIP.
    pub fn validate_zip(zip: &str) -> Option<String> {
        let zip = zip.trim().to_uppercase();
        if zip.is_empty() {
            return None;
        }
        if ZIP5.is_match(&zip) || ZIP9.is_match(&zip) {
            return Some(zip);
        }

        let digits: String = zip.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.len() {
            5 => Some(digits),
            9 => Some(format!("{}-{}", &digits[..5], &digits[5..])),
            _ => None,
        }
    }

    /// Two-letter USPS abbreviation for a state code or full state name.
    pub fn standardize_state(state: &str) -> Option<&'static str> {
        let state = state.trim().to_uppercase();
        if state.is_empty() {
            return None;
        }
        US_STATES
            .iter()
            .find(|(name, code)| *code == state || *name == state)
            .map(|(_, code)| *code)
    }

    /// Whether all four address parts are usable, with the issues found.
    pub fn validate_complete(
        street: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        zip: Option<&str>,
    ) -> (bool, Vec<String>) {
        let mut issues = Vec::new();

        if street.map(str::trim).unwrap_or_default().is_empty() {
            issues.push("Missing street".to_string());
        }
        if city.map(str::trim).unwrap_or_default().is_empty() {
            issues.push("Missing city".to_string());
        }
        if state.and_then(Self::standardize_state).is_none() {
            issues.push("Invalid state".to_string());
        }
        if zip.and_then(Self::validate_zip).is_none() {
            issues.push("Invalid ZIP".to_string());
        }

        (issues.is_empty(), issues)
    }

    pub fn is_po_box(street: &str) -> bool {
        PO_BOX.is_match(&street.to_uppercase())
    }
}

// ============ Name ============

pub struct NameValidator;

impl NameValidator {
    /// Obviously invalid name patterns: repeated single character, all
    /// digits, leading digit.
    pub fn detect_invalid_patterns(first_name: Option<&str>, last_name: Option<&str>) -> Vec<String> {
        let mut issues = Vec::new();

        if let Some(first) = first_name.map(str::trim).filter(|f| !f.is_empty()) {
            if first.chars().count() > 1 && all_same_char(first) {
                issues.push("First name: all same character".to_string());
            }
            if all_digits(first) {
                issues.push("First name: all numbers".to_string());
            }
            if first.chars().count() > 1 && first.starts_with(|c: char| c.is_ascii_digit()) {
                issues.push("First name: starts with number".to_string());
            }
        }

        if let Some(last) = last_name.map(str::trim).filter(|l| !l.is_empty()) {
            if last.chars().count() > 1 && all_same_char(last) {
                issues.push("Last name: all same character".to_string());
            }
            if all_digits(last) {
                issues.push("Last name: all numbers".to_string());
            }
        }

        issues
    }

    pub fn check_realistic_length(first_name: Option<&str>, last_name: Option<&str>) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(first) = first_name.map(str::trim) {
            let len = first.chars().count();
            if len > 50 {
                issues.push(format!("First name too long: {} chars", len));
            }
        }
        if let Some(last) = last_name.map(str::trim) {
            let len = last.chars().count();
            if len > 50 {
                issues.push(format!("Last name too long: {} chars", len));
            }
        }
        issues
    }

    /// Accented Latin letters pass; emoji and other far-off code points do not.
    pub fn validate_characters(first_name: Option<&str>, last_name: Option<&str>) -> Vec<String> {
        [first_name, last_name]
            .into_iter()
            .flatten()
            .filter(|name| name.chars().any(|c| c as u32 > 1000))
            .map(|name| format!("Invalid characters in: {}", name))
            .collect()
    }
}

fn all_same_char(value: &str) -> bool {
    let upper = value.to_uppercase();
    let mut chars = upper.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

fn all_digits(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| *c != ' ').collect();
    !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit())
}
