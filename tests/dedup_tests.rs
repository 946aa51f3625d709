/// Tests for duplicate detection and merging
/// Covers strategy priority, thresholds, conflict resolution and merge policies
use contact_cleaner::config::DedupSettings;
use contact_cleaner::detector::{DetectionThresholds, DuplicateDetector};
use contact_cleaner::merger::DuplicateMerger;
use contact_cleaner::models::{fields, ContactRecord, MatchCandidate, MatchType, MergePolicy};
use contact_cleaner::pipeline::DeduplicationEngine;

fn person(first: &str, last: &str) -> ContactRecord {
    ContactRecord::new()
        .with(fields::FIRST_NAME, first)
        .with(fields::LAST_NAME, last)
}

fn candidate(idx1: usize, idx2: usize, confidence: f64) -> MatchCandidate {
    MatchCandidate {
        idx1,
        idx2,
        confidence,
        match_type: MatchType::Name,
        evidence: format!("record {} ≈ record {}", idx1, idx2),
    }
}

#[cfg(test)]
mod detection_tests {
    use super::*;

    #[test]
    fn test_dissimilar_emails_fall_through_to_name() {
        let records = vec![
            person("John", "Smith").with(fields::PRIMARY_EMAIL, "john.smith@acme.com"),
            person("John", "Smith").with(fields::PRIMARY_EMAIL, "j.smith@acme.com"),
        ];

        let result = DuplicateDetector::default().find_duplicates(&records);

        assert_eq!(result.candidates.len(), 1);
        let found = &result.candidates[0];
        assert_eq!(found.match_type, MatchType::Name);
        assert_eq!(found.confidence, 1.0);
        assert_eq!(found.evidence, "John Smith ≈ John Smith");
        assert_eq!(result.stats.email_matches, 0);
        assert_eq!(result.stats.name_matches, 1);
    }

    #[test]
    fn test_punctuation_only_email_difference_matches() {
        let records = vec![
            ContactRecord::new().with(fields::PRIMARY_EMAIL, "John.Smith@acme.com"),
            ContactRecord::new().with(fields::PRIMARY_EMAIL, "johnsmith@acme.com"),
        ];

        let result = DuplicateDetector::default().find_duplicates(&records);

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].match_type, MatchType::Email);
        assert!((result.candidates[0].confidence - 0.95).abs() < 1e-9);
        assert_eq!(
            result.candidates[0].evidence,
            "john.smith@acme.com ≈ johnsmith@acme.com"
        );
    }

    #[test]
    fn test_phone_formats_match() {
        let records = vec![
            ContactRecord::new().with(fields::PRIMARY_PHONE, "(314) 550-1234"),
            ContactRecord::new().with(fields::PRIMARY_PHONE, "3145501234"),
            ContactRecord::new().with(fields::PRIMARY_PHONE, "+1 314 550 1234"),
            ContactRecord::new().with(fields::PRIMARY_PHONE, "550-1234"),
        ];

        let result = DuplicateDetector::default().find_duplicates(&records);

        let pairs: Vec<(usize, usize)> = result.candidates.iter().map(|c| c.pair()).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
        assert!(result
            .candidates
            .iter()
            .all(|c| c.match_type == MatchType::Phone && c.confidence == 1.0));
        assert_eq!(result.candidates[0].evidence, "(314) 550-1234 = 3145501234");
        assert_eq!(result.stats.pairs_compared, 6);
    }

    #[test]
    fn test_email_takes_priority_over_name() {
        let records = vec![
            person("Ana", "Lima").with(fields::PRIMARY_EMAIL, "ana@lima.com"),
            person("Ana", "Lima").with(fields::PRIMARY_EMAIL, "ANA@lima.com "),
        ];

        let result = DuplicateDetector::default().find_duplicates(&records);

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].match_type, MatchType::Email);
        assert_eq!(result.candidates[0].confidence, 1.0);
        assert_eq!(result.stats.email_matches, 1);
        assert_eq!(result.stats.name_matches, 0);
    }

    #[test]
    fn test_phone_takes_priority_over_name() {
        let records = vec![
            person("Ana", "Lima").with(fields::PRIMARY_PHONE, "(314) 550-1234"),
            person("Ana", "Lima").with(fields::PRIMARY_PHONE, "3145501234"),
        ];

        let result = DuplicateDetector::default().find_duplicates(&records);

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].match_type, MatchType::Phone);
        assert_eq!(result.candidates[0].confidence, 1.0);
        assert_eq!(result.stats.phone_matches, 1);
        assert_eq!(result.stats.name_matches, 0);
    }

    #[test]
    fn test_name_needs_both_parts() {
        let records = vec![
            person("Mary", "Smith"),
            person("Mary", "Smyth"),
            ContactRecord::new().with(fields::FIRST_NAME, "Mary"),
        ];

        let result = DuplicateDetector::default().find_duplicates(&records);
        assert!(result.candidates.is_empty());
        assert_eq!(result.stats.pairs_compared, 3);
    }

    #[test]
    fn test_aggressive_mode_lowers_thresholds() {
        let records = vec![person("Mary", "Smith"), person("Mary", "Smyth")];

        let default_engine = DeduplicationEngine::new(DedupSettings::default()).unwrap();
        assert!(default_engine.detect(&records).candidates.is_empty());

        let aggressive = DedupSettings {
            aggressive_mode: true,
            ..DedupSettings::default()
        };
        let engine = DeduplicationEngine::new(aggressive).unwrap();
        let result = engine.detect(&records);
        assert_eq!(result.candidates.len(), 1);
        assert!((result.candidates[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_thresholds_are_rejected() {
        let err = DetectionThresholds::new(1.5, 0.85, 0.7).unwrap_err();
        assert!(err.is_invalid_config());

        let settings = DedupSettings {
            name_threshold: -0.2,
            ..DedupSettings::default()
        };
        assert!(DeduplicationEngine::new(settings).is_err());

        let no_passes = DedupSettings {
            passes: 0,
            ..DedupSettings::default()
        };
        assert!(DeduplicationEngine::new(no_passes).is_err());
    }

    #[test]
    fn test_empty_and_single_batches() {
        let detector = DuplicateDetector::default();
        assert!(detector.find_duplicates(&[]).candidates.is_empty());

        let single = detector.find_duplicates(&[person("Ana", "Lima")]);
        assert!(single.candidates.is_empty());
        assert_eq!(single.stats.pairs_compared, 0);
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;

    #[test]
    fn test_three_identical_names_merge_one_pair_per_pass() {
        let records = vec![
            person("John", "Smith").with(fields::CITY, "Austin"),
            person("John", "Smith").with(fields::STATE, "TX"),
            person("John", "Smith"),
        ];
        let detection = DuplicateDetector::default().find_duplicates(&records);
        assert_eq!(detection.candidates.len(), 3);

        let (outcome, stats) = DuplicateMerger::new(MergePolicy::Pairwise)
            .merge_groups(&records, &detection.candidates)
            .unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.groups, vec![vec![0, 1], vec![2]]);
        assert_eq!(stats.merges, 1);
        assert_eq!(stats.passed_through, 1);

        let merged = &outcome.records[0];
        assert_eq!(merged.get(fields::MERGED_FROM), Some("0 + 1"));
        assert_eq!(merged.get(fields::MERGE_MATCH_TYPE), Some("NAME"));
        assert_eq!(merged.get(fields::MERGE_CONFIDENCE), Some("1"));
        assert_eq!(merged.get(fields::MERGE_CONFLICTS), Some("0"));
        assert_eq!(merged.get(fields::MERGE_EVIDENCE), Some("John Smith ≈ John Smith"));
        assert_eq!(merged.get(fields::CITY), Some("Austin"));
        assert_eq!(merged.get(fields::STATE), Some("TX"));
        assert_eq!(outcome.audit[0].data_recovered, 1);
    }

    #[test]
    fn test_transitive_policy_merges_whole_component() {
        let records = vec![
            person("John", "Smith"),
            person("John", "Smith"),
            person("John", "Smith"),
        ];
        let detection = DuplicateDetector::default().find_duplicates(&records);

        let (outcome, stats) = DuplicateMerger::new(MergePolicy::Transitive)
            .merge_groups(&records, &detection.candidates)
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.groups, vec![vec![0, 1, 2]]);
        assert_eq!(outcome.audit[0].source_indices, vec![0, 1, 2]);
        assert_eq!(outcome.records[0].get(fields::MERGED_FROM), Some("0 + 1 + 2"));
        assert_eq!(stats.records_merged, 3);
    }

    #[test]
    fn test_higher_confidence_wins_critical_conflict() {
        let records = vec![
            person("John", "Smith")
                .with(fields::PRIMARY_EMAIL, "john@a.com")
                .with("primary_email_confidence", "50"),
            person("John", "Smith")
                .with(fields::PRIMARY_EMAIL, "jsmith@b.org")
                .with("primary_email_confidence", "90"),
        ];

        let (outcome, stats) = DuplicateMerger::default()
            .merge_groups(&records, &[candidate(0, 1, 0.9)])
            .unwrap();

        let merged = &outcome.records[0];
        assert_eq!(merged.get(fields::PRIMARY_EMAIL), Some("jsmith@b.org"));
        assert_eq!(merged.get("primary_email_confidence"), Some("90"));
        assert_eq!(stats.conflicts_resolved, 1);

        let conflict = &outcome.audit[0].conflicts[0];
        assert_eq!(conflict.field, fields::PRIMARY_EMAIL);
        assert_eq!(conflict.value1, "john@a.com");
        assert_eq!(conflict.value2, "jsmith@b.org");
        assert_eq!(conflict.selected, "jsmith@b.org");
        assert_eq!(merged.get(fields::MERGE_CONFLICT_FIELDS), Some("primary_email"));
    }

    #[test]
    fn test_equal_confidence_prefers_longer_then_first() {
        let longer = vec![
            person("Jo", "Smith"),
            person("Joanna", "Smith"),
        ];
        let (outcome, _) = DuplicateMerger::default()
            .merge_groups(&longer, &[candidate(0, 1, 0.8)])
            .unwrap();
        assert_eq!(outcome.records[0].get(fields::FIRST_NAME), Some("Joanna"));

        let tie = vec![person("Anne", "Smith"), person("Anna", "Smith")];
        let (outcome, _) = DuplicateMerger::default()
            .merge_groups(&tie, &[candidate(0, 1, 0.8)])
            .unwrap();
        assert_eq!(outcome.records[0].get(fields::FIRST_NAME), Some("Anne"));
    }

    #[test]
    fn test_output_order_follows_acceptance() {
        let records = vec![
            person("A", "One"),
            person("A", "One"),
            person("B", "Two"),
            person("B", "Two"),
            person("C", "Three"),
        ];
        let candidates = vec![candidate(0, 1, 0.8), candidate(2, 3, 0.95)];

        let (outcome, _) = DuplicateMerger::default()
            .merge_groups(&records, &candidates)
            .unwrap();

        assert_eq!(outcome.groups, vec![vec![2, 3], vec![0, 1], vec![4]]);
        assert_eq!(outcome.audit[0].result_index, 0);
        assert_eq!(outcome.audit[1].result_index, 1);
        assert_eq!(outcome.records[2], records[4]);
    }

    #[test]
    fn test_bad_candidates_are_invariant_violations() {
        let records = vec![person("A", "One"), person("A", "One")];
        let merger = DuplicateMerger::default();

        let out_of_range = merger.merge_groups(&records, &[candidate(0, 5, 0.9)]);
        assert!(out_of_range.unwrap_err().is_invariant_violation());

        let reversed = merger.merge_groups(&records, &[candidate(1, 0, 0.9)]);
        assert!(reversed.unwrap_err().is_invariant_violation());

        let repeated = merger.merge_groups(&records, &[candidate(0, 1, 0.9), candidate(0, 1, 0.8)]);
        assert!(repeated.unwrap_err().is_invariant_violation());

        let bad_confidence = merger.merge_groups(&records, &[candidate(0, 1, 1.5)]);
        assert!(bad_confidence.unwrap_err().is_invariant_violation());
    }

    #[test]
    fn test_no_candidates_passes_everything_through() {
        let records = vec![person("A", "One"), person("B", "Two")];

        let (outcome, stats) = DuplicateMerger::default().merge_groups(&records, &[]).unwrap();

        assert_eq!(outcome.records, records);
        assert!(outcome.audit.is_empty());
        assert_eq!(stats.passed_through, 2);
        assert_eq!(stats.records_out, 2);
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn test_second_pass_merges_remaining_duplicate() {
        let records = vec![
            person("John", "Smith"),
            person("John", "Smith"),
            person("John", "Smith"),
        ];
        let settings = DedupSettings {
            passes: 2,
            ..DedupSettings::default()
        };

        let outcome = DeduplicationEngine::new(settings)
            .unwrap()
            .deduplicate(&records)
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.passes_run, 2);
        assert_eq!(outcome.candidates.len(), 3);
        assert_eq!(outcome.audit.len(), 2);
        assert_eq!(outcome.audit[0].pass, 1);
        assert_eq!(outcome.audit[1].pass, 2);
        assert_eq!(outcome.merger_stats.merges, 2);
        assert_eq!(outcome.merger_stats.records_out, 1);
    }

    #[test]
    fn test_passes_stop_when_nothing_left() {
        let records = vec![person("John", "Smith"), person("John", "Smith")];
        let settings = DedupSettings {
            passes: 5,
            ..DedupSettings::default()
        };

        let outcome = DeduplicationEngine::new(settings)
            .unwrap()
            .deduplicate(&records)
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.passes_run, 1);
        assert_eq!(outcome.audit.len(), 1);
    }

    #[test]
    fn test_single_pass_leaves_one_pair_unmerged() {
        let records = vec![
            person("John", "Smith"),
            person("John", "Smith"),
            person("John", "Smith"),
        ];

        let outcome = DeduplicationEngine::new(DedupSettings::default())
            .unwrap()
            .deduplicate(&records)
            .unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.passes_run, 1);
    }
}
