//! Name standardization lookup tables.
//!
//! The tables are plain data ([`LookupTables`]) loaded once, either from the
//! built-in defaults or from a JSON file, and turned into an immutable
//! [`StaticLookups`] that is shared behind an `Arc`. Every lookup is
//! case-insensitive and ignores trailing periods, so `Dr`, `dr.` and `DR.`
//! all resolve the same way.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Read-only name standardization service consumed by the name parser.
pub trait LookupService: Send + Sync {
    /// Standard form of an honorific (`dr` → `Dr.`).
    fn resolve_prefix(&self, token: &str) -> Option<String>;
    /// Standard form of a generational or professional suffix (`jr` → `Jr.`).
    fn resolve_suffix(&self, token: &str) -> Option<String>;
    /// Formal name for a nickname (`Bob` → `Robert`).
    fn resolve_nickname(&self, name: &str) -> Option<String>;
    /// Standard spelling of a name variation (`Jon` → `John`).
    fn resolve_variation(&self, name: &str) -> Option<String>;
    /// Correction for a known misspelling (`Micheal` → `Michael`).
    fn resolve_misspelling(&self, name: &str) -> Option<String>;
    /// Compound first name formed by two adjacent tokens (`T` + `J` → `TJ`).
    fn resolve_compound(&self, first: &str, second: &str) -> Option<String>;
    /// True when `text` contains a whole-word business indicator (`LLC`, `Inc.`).
    fn is_business_indicator(&self, text: &str) -> bool;
}

/// A `from → standard` table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub from: String,
    pub to: String,
}

impl Mapping {
    fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Position hint for a compound-name table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundKind {
    /// Initial pairs such as `TJ`.
    Traditional,
    /// Second halves such as `ANN` in `MaryAnn`.
    Ending,
    /// First halves such as `MARY`.
    Beginning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundEntry {
    pub kind: CompoundKind,
    pub value: String,
}

/// Raw lookup tables, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTables {
    #[serde(default)]
    pub prefixes: Vec<Mapping>,
    #[serde(default)]
    pub suffixes: Vec<Mapping>,
    #[serde(default)]
    pub nicknames: Vec<Mapping>,
    #[serde(default)]
    pub variations: Vec<Mapping>,
    #[serde(default)]
    pub misspellings: Vec<Mapping>,
    #[serde(default)]
    pub business_indicators: Vec<String>,
    #[serde(default)]
    pub compound_names: Vec<CompoundEntry>,
}

impl Default for LookupTables {
    fn default() -> Self {
        let map = |rows: &[(&str, &str)]| -> Vec<Mapping> {
            rows.iter().map(|(from, to)| Mapping::new(from, to)).collect()
        };

        let compound = |kind: CompoundKind, values: &[&str]| -> Vec<CompoundEntry> {
            values
                .iter()
                .map(|v| CompoundEntry {
                    kind,
                    value: v.to_string(),
                })
                .collect()
        };

        let mut compound_names = compound(CompoundKind::Traditional, &["TJ", "BJ", "DJ", "CJ"]);
        compound_names.extend(compound(CompoundKind::Ending, &["ANN", "SUE", "LYNN", "MARIE"]));
        compound_names.extend(compound(CompoundKind::Beginning, &["MARY", "BETTY"]));

        Self {
            prefixes: map(&[
                ("Dr.", "Dr."),
                ("Doctor", "Dr."),
                ("Mr.", "Mr."),
                ("Mrs.", "Mrs."),
                ("Ms.", "Ms."),
                ("Miss", "Miss"),
                ("Prof.", "Prof."),
                ("Professor", "Prof."),
                ("Rev.", "Rev."),
                ("Reverend", "Rev."),
            ]),
            suffixes: map(&[
                ("Jr.", "Jr."),
                ("Junior", "Jr."),
                ("Sr.", "Sr."),
                ("Senior", "Sr."),
                ("II", "II"),
                ("2nd", "II"),
                ("III", "III"),
                ("3rd", "III"),
                ("IV", "IV"),
                ("Ph.D.", "Ph.D."),
                ("PhD", "Ph.D."),
                ("M.D.", "M.D."),
                ("MD", "M.D."),
                ("Esq.", "Esq."),
                ("Esquire", "Esq."),
            ]),
            nicknames: map(&[
                ("Bob", "Robert"),
                ("Bobby", "Robert"),
                ("Rob", "Robert"),
                ("Bill", "William"),
                ("Billy", "William"),
                ("Will", "William"),
                ("Mike", "Michael"),
                ("Dave", "David"),
                ("Jim", "James"),
                ("Jimmy", "James"),
                ("Tom", "Thomas"),
                ("Tommy", "Thomas"),
                ("Joe", "Joseph"),
                ("Steve", "Steven"),
                ("Chris", "Christopher"),
                ("Rick", "Richard"),
                ("Dick", "Richard"),
                ("Dan", "Daniel"),
                ("Danny", "Daniel"),
                ("Matt", "Matthew"),
                ("Liz", "Elizabeth"),
                ("Beth", "Elizabeth"),
                ("Betty", "Elizabeth"),
                ("Sue", "Susan"),
                ("Susie", "Susan"),
                ("Kate", "Katherine"),
                ("Katie", "Katherine"),
                ("Kathy", "Katherine"),
                ("Cathy", "Catherine"),
                ("Jen", "Jennifer"),
                ("Jenny", "Jennifer"),
                ("Pam", "Pamela"),
                ("Cindy", "Cynthia"),
                ("Mandy", "Amanda"),
                ("Sam", "Samuel"),
                ("Alex", "Alexander"),
            ]),
            variations: map(&[
                ("Jon", "John"),
                ("Johnathan", "Jonathan"),
                ("Cathrine", "Catherine"),
                ("Kristina", "Christina"),
                ("Jeffrey", "Geoffrey"),
                ("Phillip", "Philip"),
                ("Stephen", "Steven"),
                ("Teresa", "Theresa"),
                ("Sara", "Sarah"),
                ("Ann", "Anne"),
            ]),
            misspellings: map(&[
                ("Micheal", "Michael"),
                ("Cristopher", "Christopher"),
                ("Stephane", "Stephanie"),
                ("Elizebeth", "Elizabeth"),
                ("Rebeca", "Rebecca"),
                ("Jennfer", "Jennifer"),
                ("Nickolas", "Nicholas"),
            ]),
            business_indicators: [
                "LLC",
                "Inc.",
                "Corp.",
                "Ltd.",
                "Company",
                "Associates",
                "Consulting",
                "Solutions",
                "Services",
                "Group",
                "Partners",
                "Enterprises",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            compound_names,
        }
    }
}

impl LookupTables {
    /// Loads tables from a JSON file. Missing sections are empty, not defaulted.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read lookup tables {}: {}", path.display(), e))?;
        let tables: LookupTables = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid lookup tables {}: {}", path.display(), e))?;
        Ok(tables)
    }
}

/// Normalizes a table key or query token: trimmed, trailing periods dropped,
/// lowercased.
fn lookup_key(token: &str) -> String {
    token.trim().trim_end_matches('.').trim().to_lowercase()
}

fn index(rows: &[Mapping]) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = lookup_key(&row.from);
        if key.is_empty() {
            continue;
        }
        // First row wins, matching a top-down table scan.
        map.entry(key).or_insert_with(|| row.to.clone());
    }
    map
}

/// Hash-indexed [`LookupService`] built from [`LookupTables`].
#[derive(Debug, Clone)]
pub struct StaticLookups {
    prefixes: HashMap<String, String>,
    suffixes: HashMap<String, String>,
    nicknames: HashMap<String, String>,
    variations: HashMap<String, String>,
    misspellings: HashMap<String, String>,
    business_indicators: HashSet<String>,
    compounds: HashMap<String, String>,
}

impl StaticLookups {
    pub fn new(tables: &LookupTables) -> Self {
        let mut prefixes = index(&tables.prefixes);
        // Standard forms resolve to themselves even when the table only lists
        // their variants.
        for standard in tables.prefixes.iter().map(|m| &m.to) {
            prefixes
                .entry(lookup_key(standard))
                .or_insert_with(|| standard.clone());
        }
        let mut suffixes = index(&tables.suffixes);
        for standard in tables.suffixes.iter().map(|m| &m.to) {
            suffixes
                .entry(lookup_key(standard))
                .or_insert_with(|| standard.clone());
        }

        let business_indicators = tables
            .business_indicators
            .iter()
            .map(|s| lookup_key(s))
            .filter(|s| !s.is_empty())
            .collect();

        let compounds = tables
            .compound_names
            .iter()
            .map(|entry| (entry.value.trim().to_uppercase(), entry.value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        let lookups = Self {
            prefixes,
            suffixes,
            nicknames: index(&tables.nicknames),
            variations: index(&tables.variations),
            misspellings: index(&tables.misspellings),
            business_indicators,
            compounds,
        };

        tracing::debug!(
            "Lookup tables indexed: {} prefixes, {} suffixes, {} nicknames, {} variations, {} misspellings, {} compounds",
            lookups.prefixes.len(),
            lookups.suffixes.len(),
            lookups.nicknames.len(),
            lookups.variations.len(),
            lookups.misspellings.len(),
            lookups.compounds.len()
        );

        lookups
    }

    /// Loads tables from `path` when given, built-in defaults otherwise.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let tables = match path {
            Some(p) => {
                tracing::info!("Loading lookup tables from {}", p);
                LookupTables::from_json_file(p)?
            }
            None => {
                tracing::info!("Using built-in lookup tables");
                LookupTables::default()
            }
        };
        Ok(Self::new(&tables))
    }
}

impl Default for StaticLookups {
    fn default() -> Self {
        Self::new(&LookupTables::default())
    }
}

impl LookupService for StaticLookups {
    fn resolve_prefix(&self, token: &str) -> Option<String> {
        self.prefixes.get(&lookup_key(token)).cloned()
    }

    fn resolve_suffix(&self, token: &str) -> Option<String> {
        self.suffixes.get(&lookup_key(token)).cloned()
    }

    fn resolve_nickname(&self, name: &str) -> Option<String> {
        self.nicknames.get(&lookup_key(name)).cloned()
    }

    fn resolve_variation(&self, name: &str) -> Option<String> {
        self.variations.get(&lookup_key(name)).cloned()
    }

    fn resolve_misspelling(&self, name: &str) -> Option<String> {
        self.misspellings.get(&lookup_key(name)).cloned()
    }

    fn resolve_compound(&self, first: &str, second: &str) -> Option<String> {
        let first = first.trim();
        let second = second.trim();
        if first.is_empty() || second.is_empty() {
            return None;
        }
        let joined = format!("{}{}", first, second).to_uppercase();
        self.compounds.get(&joined).cloned()
    }

    fn is_business_indicator(&self, text: &str) -> bool {
        text.split(|c: char| c.is_whitespace() || c == ',')
            .map(lookup_key)
            .any(|word| !word.is_empty() && self.business_indicators.contains(&word))
    }
}
