/// Tests for name parsing and standardization
/// Covers full-name decomposition, split components, lookups and record parsing
use contact_cleaner::lookups::{LookupService, LookupTables, StaticLookups};
use contact_cleaner::models::{fields, ContactRecord, ParsedName, ParsingSource};
use contact_cleaner::name_parser::NameParser;

fn parse_full(full_name: &str) -> ParsedName {
    let lookups = StaticLookups::default();
    NameParser::new(&lookups).parse(Some(full_name), None, None, None, None, None)
}

#[cfg(test)]
mod full_name_tests {
    use super::*;

    #[test]
    fn test_prefix_middle_suffix() {
        let parsed = parse_full("Dr. John Q Smith Jr.");

        assert_eq!(parsed.prefix.as_deref(), Some("Dr."));
        assert_eq!(parsed.first_name, "John");
        assert_eq!(parsed.middle_name, "Q");
        assert_eq!(parsed.last_name, "Smith");
        assert_eq!(parsed.suffix.as_deref(), Some("Jr."));
        assert_eq!(parsed.full_name_clean, "Dr. John Q Smith Jr.");
        assert_eq!(parsed.parsing_source, ParsingSource::FullName);
    }

    #[test]
    fn test_prefix_and_suffix_without_periods() {
        let parsed = parse_full("dr John Smith jr");

        assert_eq!(parsed.prefix.as_deref(), Some("Dr."));
        assert_eq!(parsed.suffix.as_deref(), Some("Jr."));
        assert_eq!(parsed.full_name_clean, "Dr. John Smith Jr.");
    }

    #[test]
    fn test_first_suffix_ends_the_name() {
        let parsed = parse_full("Mr. Jon Paul Jones III extra");

        assert_eq!(parsed.prefix.as_deref(), Some("Mr."));
        assert_eq!(parsed.first_name, "John");
        assert_eq!(parsed.middle_name, "Paul");
        assert_eq!(parsed.last_name, "Jones");
        assert_eq!(parsed.suffix.as_deref(), Some("III"));
        assert_eq!(parsed.full_name_clean, "Mr. John Paul Jones III");
    }

    #[test]
    fn test_multiple_middle_names() {
        let parsed = parse_full("Mary Ann Louise Parker");

        assert_eq!(parsed.first_name, "Mary");
        assert_eq!(parsed.middle_name, "Ann Louise");
        assert_eq!(parsed.last_name, "Parker");
    }

    #[test]
    fn test_single_token_is_first_name() {
        let parsed = parse_full("Smith");

        assert_eq!(parsed.first_name, "Smith");
        assert_eq!(parsed.last_name, "");
        assert_eq!(parsed.full_name_clean, "Smith");
        assert_eq!(parsed.parsing_source, ParsingSource::FullName);
    }

    #[test]
    fn test_prefix_only() {
        let parsed = parse_full("Dr");

        assert_eq!(parsed.prefix.as_deref(), Some("Dr."));
        assert_eq!(parsed.first_name, "");
        assert_eq!(parsed.full_name_clean, "Dr.");
    }

    #[test]
    fn test_nickname_and_misspelling_standardized() {
        assert_eq!(parse_full("Liz Taylor").first_name, "Elizabeth");
        assert_eq!(parse_full("Micheal Jordan").full_name_clean, "Michael Jordan");
        assert_eq!(parse_full("BOB Dylan").first_name, "Robert");
    }

    #[test]
    fn test_surname_not_nicknamed() {
        let parsed = parse_full("Anna Bob");
        assert_eq!(parsed.last_name, "Bob");
    }
}

#[cfg(test)]
mod split_component_tests {
    use super::*;

    #[test]
    fn test_split_components_win_over_full_name() {
        let lookups = StaticLookups::default();
        let parsed = NameParser::new(&lookups).parse(
            Some("Jane Doe"),
            Some("Mary"),
            Some("Major"),
            None,
            None,
            None,
        );

        assert_eq!(parsed.first_name, "Mary");
        assert_eq!(parsed.last_name, "Major");
        assert_eq!(parsed.parsing_source, ParsingSource::SplitComponents);
    }

    #[test]
    fn test_split_components_standardized() {
        let lookups = StaticLookups::default();
        let parsed = NameParser::new(&lookups).parse(
            None,
            Some("Bob"),
            Some("Smith"),
            Some("Jim"),
            Some("Mr."),
            Some("Sr."),
        );

        assert_eq!(parsed.first_name, "Robert");
        assert_eq!(parsed.middle_name, "James");
        assert_eq!(parsed.full_name_clean, "Mr. Robert James Smith Sr.");
    }

    #[test]
    fn test_missing_last_name_falls_back_to_full_name() {
        let lookups = StaticLookups::default();
        let parsed =
            NameParser::new(&lookups).parse(Some("Ann Lee"), Some("Ann"), None, None, None, None);

        assert_eq!(parsed.parsing_source, ParsingSource::FullName);
        assert_eq!(parsed.first_name, "Anne");
        assert_eq!(parsed.last_name, "Lee");
    }

    #[test]
    fn test_nothing_usable_gives_empty_name() {
        let lookups = StaticLookups::default();
        let parser = NameParser::new(&lookups);

        let parsed = parser.parse(None, None, None, None, None, None);
        assert_eq!(parsed, ParsedName::empty());

        let blank = parser.parse(Some("   "), Some(" "), None, None, None, None);
        assert_eq!(blank.parsing_source, ParsingSource::None);
        assert!(blank.is_empty());
        assert_eq!(blank.first_name, "");
        assert_eq!(blank.prefix, None);
    }
}

#[cfg(test)]
mod compound_name_tests {
    use super::*;

    #[test]
    fn test_compound_not_merged_during_parse() {
        let parsed = parse_full("T J Miller");
        assert_eq!(parsed.first_name, "T");
        assert_eq!(parsed.middle_name, "J");
    }

    #[test]
    fn test_merge_compound_folds_middle_initial() {
        let lookups = StaticLookups::default();
        let parser = NameParser::new(&lookups);

        assert_eq!(parser.detect_compound_name("t", "j"), Some("TJ".to_string()));
        assert_eq!(parser.detect_compound_name("Tom", "J"), None);

        let merged = parser.merge_compound(parse_full("T J Miller"));
        assert_eq!(merged.first_name, "TJ");
        assert_eq!(merged.middle_name, "");
        assert_eq!(merged.full_name_clean, "TJ Miller");

        let untouched = parser.merge_compound(parse_full("Tom J Miller"));
        assert_eq!(untouched.full_name_clean, "Thomas J Miller");
    }
}

#[cfg(test)]
mod record_tests {
    use super::*;

    #[test]
    fn test_parse_record_keeps_other_fields() {
        let lookups = StaticLookups::default();
        let record = ContactRecord::new()
            .with(fields::FULL_NAME, "Dr. Liz Taylor")
            .with(fields::PRIMARY_EMAIL, "liz@example.com");

        let parsed = NameParser::new(&lookups).parse_record(&record);

        assert_eq!(parsed.get(fields::PREFIX), Some("Dr."));
        assert_eq!(parsed.get(fields::FIRST_NAME), Some("Elizabeth"));
        assert_eq!(parsed.get(fields::LAST_NAME), Some("Taylor"));
        assert_eq!(parsed.get(fields::FULL_NAME_CLEAN), Some("Dr. Elizabeth Taylor"));
        assert_eq!(parsed.get(fields::NAME_PARSING_SOURCE), Some("FULL_NAME"));
        assert_eq!(parsed.get(fields::PRIMARY_EMAIL), Some("liz@example.com"));
        assert!(!parsed.has(fields::MIDDLE_NAME));
        // Input is not modified
        assert!(!record.has(fields::FIRST_NAME));
    }

    #[test]
    fn test_parse_records_tallies_stats() {
        let lookups = StaticLookups::default();
        let records = vec![
            ContactRecord::new()
                .with(fields::FIRST_NAME, "Bob")
                .with(fields::LAST_NAME, "Smith"),
            ContactRecord::new().with(fields::FULL_NAME, "Dr. Ann Lee Jr."),
            ContactRecord::new().with(fields::PRIMARY_EMAIL, "x@y.com"),
            ContactRecord::new().with(fields::FULL_NAME, "T J Miller"),
        ];

        let (parsed, stats) = NameParser::new(&lookups).parse_records(&records, true);

        assert_eq!(parsed.len(), 4);
        assert_eq!(stats.names_parsed, 4);
        assert_eq!(stats.from_split_components, 1);
        assert_eq!(stats.from_full_name, 2);
        assert_eq!(stats.unparseable, 1);
        assert_eq!(stats.prefixes_found, 1);
        assert_eq!(stats.suffixes_found, 1);
        assert_eq!(stats.nicknames_converted, 1);
        assert_eq!(stats.compound_names_detected, 1);

        assert_eq!(parsed[2].get(fields::NAME_PARSING_SOURCE), Some("NONE"));
        assert_eq!(parsed[3].get(fields::FIRST_NAME), Some("TJ"));
        assert!(!parsed[3].has(fields::MIDDLE_NAME));
    }

    #[test]
    fn test_each_correction_has_its_own_counter() {
        let tables: LookupTables = serde_json::from_str(
            r#"{
                "nicknames": [],
                "variations": [{"from": "Jon", "to": "John"}, {"from": "Smyth", "to": "Smith"}],
                "misspellings": [{"from": "Micheal", "to": "Michael"}, {"from": "Jonse", "to": "Jones"}]
            }"#,
        )
        .unwrap();
        let lookups = StaticLookups::new(&tables);
        let records = vec![
            ContactRecord::new()
                .with(fields::FIRST_NAME, "Jon")
                .with(fields::LAST_NAME, "Smyth"),
            ContactRecord::new()
                .with(fields::FIRST_NAME, "Micheal")
                .with(fields::LAST_NAME, "Jonse"),
        ];

        let (parsed, stats) = NameParser::new(&lookups).parse_records(&records, false);

        assert_eq!(parsed[0].get(fields::FULL_NAME_CLEAN), Some("John Smith"));
        assert_eq!(parsed[1].get(fields::FULL_NAME_CLEAN), Some("Michael Jones"));
        assert_eq!(stats.nicknames_converted, 0);
        assert_eq!(stats.variations_fixed, 2);
        assert_eq!(stats.misspellings_fixed, 2);
    }

    #[test]
    fn test_custom_tables() {
        let tables: LookupTables = serde_json::from_str(
            r#"{
                "prefixes": [{"from": "Sra", "to": "Sra."}],
                "nicknames": [{"from": "Pepe", "to": "José"}]
            }"#,
        )
        .unwrap();
        let lookups = StaticLookups::new(&tables);
        assert_eq!(lookups.resolve_prefix("Dr"), None);

        let parsed =
            NameParser::new(&lookups).parse(Some("sra Pepe Garcia"), None, None, None, None, None);
        assert_eq!(parsed.full_name_clean, "Sra. José Garcia");
    }
}
