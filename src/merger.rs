//! Merging of detected duplicates.
//!
//! Candidates are validated first; a bad index, a reversed or repeated pair,
//! or a confidence outside [0, 1] is an [`AppError::InvariantViolation`].
//! Missing fields are never an error.
//!
//! Field-level conflict resolution:
//! - critical fields (email, phone, first and last name) go to the higher
//!   `<field>_confidence` (default 50), then the longer value, then the
//!   first record, and are logged as conflicts. Their companion comes from
//!   the side whose value was kept;
//! - other fields use confidence only when both records carry one, then the
//!   longer value, then the first record. Taking a value from the second
//!   record counts as recovered data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::errors::AppError;
use crate::models::{
    fields, AuditEntry, ContactRecord, FieldConflict, MatchCandidate, MergeOutcome, MergePolicy,
};

/// Counters tallied over one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergerStats {
    pub records_in: usize,
    pub records_out: usize,
    pub merges: usize,
    pub records_merged: usize,
    pub conflicts_resolved: usize,
    pub data_recovered: usize,
    pub passed_through: usize,
}

impl MergerStats {
    /// Adds the counters of a later pass; `records_out` becomes the later one.
    pub fn absorb(&mut self, later: &MergerStats) {
        if self.records_in == 0 {
            self.records_in = later.records_in;
        }
        self.records_out = later.records_out;
        self.merges += later.merges;
        self.records_merged += later.records_merged;
        self.conflicts_resolved += later.conflicts_resolved;
        self.data_recovered += later.data_recovered;
        self.passed_through = later.passed_through;
    }
}

/// Which side a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Two records folded into one, with what the fold had to decide.
#[derive(Debug, Clone)]
pub struct RecordMerge {
    pub record: ContactRecord,
    pub conflicts: Vec<FieldConflict>,
    pub data_recovered: usize,
}

/// Picks between two differing present values of `field`.
pub fn best_value(field: &str, first: &ContactRecord, second: &ContactRecord) -> Side {
    let (Some(v1), Some(v2)) = (first.get(field), second.get(field)) else {
        return if first.has(field) { Side::First } else { Side::Second };
    };

    let confidences = if fields::is_critical(field) {
        Some((first.confidence(field), second.confidence(field)))
    } else {
        first
            .explicit_confidence(field)
            .zip(second.explicit_confidence(field))
    };

    if let Some((c1, c2)) = confidences {
        if c1 > c2 {
            return Side::First;
        }
        if c2 > c1 {
            return Side::Second;
        }
    }

    if v2.chars().count() > v1.chars().count() {
        Side::Second
    } else {
        Side::First
    }
}

/// Merges two records field by field.
///
/// The `<field>_confidence` companion of a critical field travels with the
/// value that won, so later passes compare the confidence of the kept value.
pub fn merge_records(first: &ContactRecord, second: &ContactRecord) -> RecordMerge {
    let keys: BTreeSet<&str> = first
        .iter()
        .chain(second.iter())
        .map(|(field, _)| field)
        .collect();

    let mut record = ContactRecord::new();
    let mut conflicts = Vec::new();
    let mut data_recovered = 0;

    for field in keys {
        if fields::critical_of_companion(field).is_some() {
            continue;
        }

        let critical = fields::is_critical(field);
        let side = match (first.get(field), second.get(field)) {
            (Some(v1), None) => {
                record.set(field, v1);
                Side::First
            }
            (None, Some(v2)) => {
                if !critical {
                    data_recovered += 1;
                }
                record.set(field, v2);
                Side::Second
            }
            (Some(v1), Some(v2)) if v1 == v2 => {
                record.set(field, v1);
                stronger_companion(field, first, second)
            }
            (Some(v1), Some(v2)) => {
                let side = best_value(field, first, second);
                let selected = match side {
                    Side::First => v1,
                    Side::Second => v2,
                };

                if critical {
                    tracing::debug!(
                        "Conflict on {}: '{}' vs '{}', kept '{}'",
                        field,
                        v1,
                        v2,
                        selected
                    );
                    conflicts.push(FieldConflict {
                        field: field.to_string(),
                        value1: v1.to_string(),
                        value2: v2.to_string(),
                        selected: selected.to_string(),
                    });
                } else if side == Side::Second {
                    data_recovered += 1;
                }

                record.set(field, selected);
                side
            }
            (None, None) => continue,
        };

        if critical {
            let key = fields::confidence_key(field);
            let winner = match side {
                Side::First => first,
                Side::Second => second,
            };
            if let Some(confidence) = winner.get(&key) {
                record.set(&key, confidence);
            }
        }
    }

    // Companions whose field is absent on both sides are kept as found.
    for field in fields::CRITICAL {
        let key = fields::confidence_key(field);
        if record.has(field) || record.has(&key) {
            continue;
        }
        if let Some(confidence) = first.get(&key).or_else(|| second.get(&key)) {
            record.set(&key, confidence);
        }
    }

    RecordMerge {
        record,
        conflicts,
        data_recovered,
    }
}

/// Side holding the higher recorded confidence for `field`; first on a tie.
fn stronger_companion(field: &str, first: &ContactRecord, second: &ContactRecord) -> Side {
    match (first.explicit_confidence(field), second.explicit_confidence(field)) {
        (Some(c1), Some(c2)) if c2 > c1 => Side::Second,
        (None, Some(_)) => Side::Second,
        _ => Side::First,
    }
}

/// Rejects candidates that cannot have come from the detector for `len`
/// records.
pub fn validate_candidates(len: usize, candidates: &[MatchCandidate]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(candidates.len());

    for candidate in candidates {
        if candidate.idx1 >= len || candidate.idx2 >= len {
            tracing::error!(
                "Candidate {}-{} out of range for {} records",
                candidate.idx1,
                candidate.idx2,
                len
            );
            return Err(AppError::InvariantViolation(format!(
                "candidate ({}, {}) references a record outside 0..{}",
                candidate.idx1, candidate.idx2, len
            )));
        }
        if candidate.idx1 >= candidate.idx2 {
            return Err(AppError::InvariantViolation(format!(
                "candidate ({}, {}) is not an ordered pair idx1 < idx2",
                candidate.idx1, candidate.idx2
            )));
        }
        if !(0.0..=1.0).contains(&candidate.confidence) {
            return Err(AppError::InvariantViolation(format!(
                "candidate ({}, {}) has confidence {} outside [0, 1]",
                candidate.idx1, candidate.idx2, candidate.confidence
            )));
        }
        if !seen.insert(candidate.pair()) {
            tracing::error!(
                "Duplicate candidate for pair {}-{}",
                candidate.idx1,
                candidate.idx2
            );
            return Err(AppError::InvariantViolation(format!(
                "more than one candidate for pair ({}, {})",
                candidate.idx1, candidate.idx2
            )));
        }
    }

    Ok(())
}

/// Candidate positions by confidence, highest first; ties keep input order.
fn by_confidence(candidates: &[MatchCandidate]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| candidates[b].confidence.total_cmp(&candidates[a].confidence));
    order
}

/// Union-find over record indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index stays the root so roots are stable.
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

pub struct DuplicateMerger {
    policy: MergePolicy,
    pass: usize,
}

impl Default for DuplicateMerger {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}

impl DuplicateMerger {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy, pass: 1 }
    }

    /// Tags audit entries with a later pass number.
    pub fn for_pass(mut self, pass: usize) -> Self {
        self.pass = pass.max(1);
        self
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Merges `records` according to `candidates`.
    ///
    /// Merged records come first, in the order their groups were accepted,
    /// followed by untouched records in ascending index order.
    pub fn merge_groups(
        &self,
        records: &[ContactRecord],
        candidates: &[MatchCandidate],
    ) -> Result<(MergeOutcome, MergerStats), AppError> {
        validate_candidates(records.len(), candidates)?;

        let groups = match self.policy {
            MergePolicy::Pairwise => pairwise_groups(records.len(), candidates),
            MergePolicy::Transitive => transitive_groups(records.len(), candidates),
        };

        let mut outcome = MergeOutcome::default();
        let mut stats = MergerStats {
            records_in: records.len(),
            ..MergerStats::default()
        };
        let mut consumed = vec![false; records.len()];

        for (members, lead) in groups {
            let candidate = &candidates[lead];
            let merged = fold_group(records, &members);

            let mut record = merged.record;
            record.set(fields::MERGE_CONFIDENCE, candidate.confidence.to_string());
            record.set(fields::MERGE_MATCH_TYPE, candidate.match_type.as_str());
            record.set(fields::MERGE_EVIDENCE, candidate.evidence.clone());
            record.set(
                fields::MERGED_FROM,
                members
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(" + "),
            );
            record.set(fields::MERGE_CONFLICTS, merged.conflicts.len().to_string());
            record.set(
                fields::MERGE_CONFLICT_FIELDS,
                merged
                    .conflicts
                    .iter()
                    .map(|c| c.field.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            );

            for &idx in &members {
                consumed[idx] = true;
            }

            stats.merges += 1;
            stats.records_merged += members.len();
            stats.conflicts_resolved += merged.conflicts.len();
            stats.data_recovered += merged.data_recovered;

            outcome.audit.push(AuditEntry {
                pass: self.pass,
                source_indices: members.clone(),
                result_index: outcome.records.len(),
                match_type: candidate.match_type,
                confidence: candidate.confidence,
                num_conflicts: merged.conflicts.len(),
                data_recovered: merged.data_recovered,
                conflicts: merged.conflicts,
                evidence: candidate.evidence.clone(),
            });
            outcome.records.push(record);
            outcome.groups.push(members);
        }

        for (idx, record) in records.iter().enumerate() {
            if !consumed[idx] {
                outcome.records.push(record.clone());
                outcome.groups.push(vec![idx]);
                stats.passed_through += 1;
            }
        }

        stats.records_out = outcome.records.len();

        tracing::info!(
            "Pass {} ({}): {} records in, {} merges, {} out; {} conflicts resolved, {} fields recovered",
            self.pass,
            self.policy.as_str(),
            stats.records_in,
            stats.merges,
            stats.records_out,
            stats.conflicts_resolved,
            stats.data_recovered
        );

        Ok((outcome, stats))
    }
}

/// Folds `members` (ascending) left to right.
fn fold_group(records: &[ContactRecord], members: &[usize]) -> RecordMerge {
    let mut merged = RecordMerge {
        record: records[members[0]].clone(),
        conflicts: Vec::new(),
        data_recovered: 0,
    };

    for &idx in &members[1..] {
        let step = merge_records(&merged.record, &records[idx]);
        merged.record = step.record;
        merged.conflicts.extend(step.conflicts);
        merged.data_recovered += step.data_recovered;
    }

    merged
}

/// Greedy pairing: each record joins at most one accepted candidate.
///
/// Returns `(members, candidate position)` in acceptance order.
fn pairwise_groups(len: usize, candidates: &[MatchCandidate]) -> Vec<(Vec<usize>, usize)> {
    let mut consumed = vec![false; len];
    let mut groups = Vec::new();

    for pos in by_confidence(candidates) {
        let candidate = &candidates[pos];
        if consumed[candidate.idx1] || consumed[candidate.idx2] {
            tracing::debug!(
                "Skipping candidate {}-{}: record already merged",
                candidate.idx1,
                candidate.idx2
            );
            continue;
        }
        consumed[candidate.idx1] = true;
        consumed[candidate.idx2] = true;
        groups.push((vec![candidate.idx1, candidate.idx2], pos));
    }

    groups
}

/// Connected components over every candidate, each led by its
/// highest-confidence candidate and ordered by that lead.
fn transitive_groups(len: usize, candidates: &[MatchCandidate]) -> Vec<(Vec<usize>, usize)> {
    let mut sets = DisjointSet::new(len);
    for candidate in candidates {
        sets.union(candidate.idx1, candidate.idx2);
    }

    // Ascending scan keeps each member list sorted.
    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for idx in 0..len {
        let root = sets.find(idx);
        components.entry(root).or_default().push(idx);
    }

    let mut groups = Vec::new();
    for pos in by_confidence(candidates) {
        let root = sets.find(candidates[pos].idx1);
        if let Some(members) = components.remove(&root) {
            groups.push((members, pos));
        }
    }

    groups
}
