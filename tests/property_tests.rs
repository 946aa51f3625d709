/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use proptest::prelude::*;
use std::collections::HashSet;

use contact_cleaner::detector::DuplicateDetector;
use contact_cleaner::lookups::{LookupService, StaticLookups};
use contact_cleaner::merger::DuplicateMerger;
use contact_cleaner::models::{fields, ContactRecord, MatchType, MergePolicy, ParsingSource};
use contact_cleaner::name_parser::NameParser;
use contact_cleaner::scoring::{QualityScorer, MAX_SCORE};
use contact_cleaner::similarity::{fuzzy_match_score, levenshtein_ratio};

fn record_strategy() -> impl Strategy<Value = ContactRecord> {
    (
        proptest::option::of("(Ann|Anne|Bob|Robert|Jon)"),
        proptest::option::of("(Smith|Smyth|Jones)"),
        proptest::option::of("[ab]{1,2}\\.?[ab]{0,2}@(x|y)\\.com"),
        proptest::option::of("(314-550-0950|3145500950|212-555-0100|555-0100)"),
    )
        .prop_map(|(first, last, email, phone)| {
            let mut record = ContactRecord::new();
            record.set_opt(fields::FIRST_NAME, first);
            record.set_opt(fields::LAST_NAME, last);
            record.set_opt(fields::PRIMARY_EMAIL, email);
            record.set_opt(fields::PRIMARY_PHONE, phone);
            record
        })
}

fn batch_strategy() -> impl Strategy<Value = Vec<ContactRecord>> {
    proptest::collection::vec(record_strategy(), 0..8)
}

// Property: Name parsing never panics and always yields a consistent name
proptest! {
    #[test]
    fn parse_never_panics(
        full in proptest::option::of("\\PC*"),
        first in proptest::option::of("\\PC*"),
        last in proptest::option::of("\\PC*")
    ) {
        let lookups = StaticLookups::default();
        let parsed = NameParser::new(&lookups).parse(
            full.as_deref(),
            first.as_deref(),
            last.as_deref(),
            None,
            None,
            None,
        );

        prop_assert_eq!(&parsed.full_name_clean, &parsed.build_full_name());
        if parsed.parsing_source == ParsingSource::None {
            prop_assert!(parsed.is_empty());
        }
    }

    #[test]
    fn components_keep_canonical_order(
        prefix in "(Dr|Mr|Mrs|Ms|Prof)",
        first in "[A-Z][a-z]{2,8}",
        last in "[A-Z][a-z]{2,8}",
        suffix in "(Jr|Sr|III|PhD)"
    ) {
        let lookups = StaticLookups::default();
        for token in [&first, &last] {
            prop_assume!(lookups.resolve_prefix(token).is_none());
            prop_assume!(lookups.resolve_suffix(token).is_none());
        }

        let full = format!("{} {} {} {}", prefix, first, last, suffix);
        let parsed = NameParser::new(&lookups).parse(Some(&full), None, None, None, None, None);

        let std_prefix = lookups.resolve_prefix(&prefix).unwrap();
        let std_suffix = lookups.resolve_suffix(&suffix).unwrap();
        prop_assert_eq!(parsed.prefix.as_deref(), Some(std_prefix.as_str()));
        prop_assert_eq!(parsed.suffix.as_deref(), Some(std_suffix.as_str()));
        prop_assert_eq!(&parsed.middle_name, "");
        prop_assert_eq!(
            parsed.full_name_clean,
            format!("{} {} {} {}", std_prefix, parsed.first_name, parsed.last_name, std_suffix)
        );
    }

    #[test]
    fn split_parse_is_idempotent(
        first in "[A-Za-z]{1,10}",
        last in "[A-Za-z]{1,10}"
    ) {
        let lookups = StaticLookups::default();
        let parser = NameParser::new(&lookups);

        let once = parser.parse(None, Some(&first), Some(&last), None, None, None);
        let twice = parser.parse(
            None,
            Some(&once.first_name),
            Some(&once.last_name),
            None,
            None,
            None,
        );

        prop_assert_eq!(once, twice);
    }
}

// Property: Similarity scores stay within [0, 1]
proptest! {
    #[test]
    fn similarity_is_bounded(a in "\\PC{0,20}", b in "\\PC{0,20}") {
        let ratio = levenshtein_ratio(&a, &b);
        prop_assert!((0.0..=1.0).contains(&ratio));

        let (score, matched) = fuzzy_match_score(&a, &b, 0.85);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(matched, score >= 0.85);
    }

    #[test]
    fn quality_score_is_capped(record in record_strategy()) {
        let result = QualityScorer::calculate_score(&record);
        prop_assert!(result.score >= 0);
        prop_assert!(result.score <= MAX_SCORE);
    }
}

// Property: Detection emits at most one ordered candidate per pair
proptest! {
    #[test]
    fn candidates_are_unique_ordered_pairs(records in batch_strategy()) {
        let result = DuplicateDetector::default().find_duplicates(&records);

        let mut seen = HashSet::new();
        let mut previous: Option<(usize, usize)> = None;
        for candidate in &result.candidates {
            prop_assert!(candidate.idx1 < candidate.idx2);
            prop_assert!(candidate.idx2 < records.len());
            prop_assert!((0.0..=1.0).contains(&candidate.confidence));
            prop_assert!(seen.insert(candidate.pair()));
            if let Some(prev) = previous {
                prop_assert!(prev < candidate.pair());
            }
            previous = Some(candidate.pair());
        }
        prop_assert_eq!(result.stats.potential_duplicates, result.candidates.len());
        prop_assert_eq!(
            result.stats.pairs_compared,
            records.len() * records.len().saturating_sub(1) / 2
        );
    }

    #[test]
    fn identical_email_always_wins(
        email in "[a-z]{1,8}@[a-z]{1,8}\\.com",
        first in "[A-Z][a-z]{1,6}",
        last in "[A-Z][a-z]{1,6}"
    ) {
        let record = ContactRecord::new()
            .with(fields::FIRST_NAME, first.as_str())
            .with(fields::LAST_NAME, last.as_str())
            .with(fields::PRIMARY_EMAIL, email.as_str())
            .with(fields::PRIMARY_PHONE, "314-550-0950");
        let records = vec![record.clone(), record];

        let result = DuplicateDetector::default().find_duplicates(&records);

        prop_assert_eq!(result.candidates.len(), 1);
        prop_assert_eq!(result.candidates[0].match_type, MatchType::Email);
        prop_assert_eq!(result.candidates[0].confidence, 1.0);
    }
}

// Property: Merge groups partition the input
proptest! {
    #[test]
    fn merge_groups_partition_input(
        records in batch_strategy(),
        transitive in proptest::bool::ANY
    ) {
        let policy = if transitive { MergePolicy::Transitive } else { MergePolicy::Pairwise };
        let detection = DuplicateDetector::default().find_duplicates(&records);

        let (outcome, stats) = DuplicateMerger::new(policy)
            .merge_groups(&records, &detection.candidates)
            .unwrap();

        let mut covered: Vec<usize> = outcome.groups.iter().flatten().copied().collect();
        covered.sort_unstable();
        prop_assert_eq!(covered, (0..records.len()).collect::<Vec<_>>());

        prop_assert_eq!(outcome.records.len(), outcome.groups.len());
        prop_assert_eq!(stats.records_out, outcome.records.len());
        prop_assert_eq!(
            outcome.audit.len(),
            outcome.groups.iter().filter(|g| g.len() > 1).count()
        );
        if !transitive {
            prop_assert!(outcome.groups.iter().all(|g| g.len() <= 2));
        }
    }
}
