/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use proptest::prelude::*;
use rust_phone_enrich::enrichment::validate_us_phone;
use rust_phone_enrich::models::*;
use rust_phone_enrich::storage::parse_phone_list;
use rust_phone_enrich::token::format_octets;
use std::collections::HashSet;

fn record_strategy() -> impl Strategy<Value = LookupRecord> {
    // Small value space so duplicates are common
    (0u8..4, prop::sample::select(vec!["ZZZ", "Yes", "No"])).prop_map(|(phone, flag)| {
        let mut record = LookupRecord::sentinel(&phone.to_string(), &TCPA_FIELDS);
        record.set(FIELD_NATIONAL_DNC, flag);
        record
    })
}

// Property: dedup is idempotent and keeps first occurrences in order
proptest! {
    #[test]
    fn dedup_is_idempotent(records in prop::collection::vec(record_strategy(), 0..40)) {
        let mut once: ResultTable = records.iter().cloned().collect();
        once.dedup();
        let mut twice = once.clone();
        prop_assert_eq!(twice.dedup(), 0);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order(records in prop::collection::vec(record_strategy(), 0..40)) {
        let mut table: ResultTable = records.iter().cloned().collect();
        let dropped = table.dedup();

        let mut seen = HashSet::new();
        let expected: Vec<LookupRecord> = records
            .iter()
            .filter(|r| seen.insert((*r).clone()))
            .cloned()
            .collect();

        prop_assert_eq!(table.rows(), expected.as_slice());
        prop_assert_eq!(dropped, records.len() - expected.len());
    }
}

// Property: every record projects onto the full header
proptest! {
    #[test]
    fn rows_match_header_width(phone in "[0-9]{1,15}", name in "\\PC{0,20}") {
        let mut record = LookupRecord::sentinel(&phone, &PERSON_FIELDS);
        record.set(FIELD_NAME, name);
        for mode in [PipelineMode::Combined, PipelineMode::Person, PipelineMode::Tcpa] {
            let row = record.to_row(mode.columns());
            prop_assert_eq!(row.len(), mode.columns().len());
            prop_assert_eq!(&row[0], &phone);
        }
    }
}

// Property: client tokens are four dotted octets
proptest! {
    #[test]
    fn token_has_four_octets(octets in any::<[u8; 4]>()) {
        let token = format_octets(octets);
        let parsed: Vec<u8> = token.split('.').map(|p| p.parse().unwrap()).collect();
        prop_assert_eq!(parsed, octets.to_vec());
    }
}

// Property: loading keeps every non-blank line, in order
proptest! {
    #[test]
    fn load_keeps_non_blank_lines(lines in prop::collection::vec("[0-9]{0,11}", 0..30)) {
        let content = lines.join("\n");
        let queue = parse_phone_list(&content);
        let expected: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
        let loaded: Vec<&String> = queue.iter().collect();
        prop_assert_eq!(loaded, expected);
    }

    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_us_phone(&phone);
    }
}
