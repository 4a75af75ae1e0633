use examvault_common::models::{Record, Status};
use examvault_common::views::{filter, sort, RecordFilter, SearchField, SortDirection, SortKey, SortSpec, TieBreak};
use proptest::prelude::*;

fn status() -> impl Strategy<Value = Status> {
    prop_oneof![Just(Status::Enabled), Just(Status::Disabled)]
}

fn branch() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("CSE".to_string()),
        Just("cse".to_string()),
        Just("IT".to_string()),
        Just("ECE".to_string()),
        Just("All_Branches".to_string()),
        Just(String::new()),
    ]
}

prop_compose! {
    fn record()(
        id in "[A-Z0-9]{1,8}",
        timestamp in prop_oneof![
            "2024-0[1-9]-[12][0-9]T[01][0-9]:[0-5][0-9]:[0-5][0-9]Z",
            "[a-z ]{0,6}",
        ],
        year in prop_oneof!["[1-4]", "1[0-2]", Just(String::new())],
        semester in "[1-8]",
        paper_code in "(BCS|BIT|bec)-[0-9]{4}",
        subject_name in "[A-Za-z ]{0,12}",
        paper_type in prop_oneof![Just("Regular".to_string()), Just("ex".to_string()), Just(String::new())],
        status in status(),
        branch in branch(),
        email in "[a-cA-C]@(x|X)\\.com",
        pdf_url in proptest::option::of(prop_oneof![
            "https://files\\.example/[a-z0-9]{1,6}\\.pdf",
            " {0,3}",
        ]),
    ) -> Record {
        Record { id, timestamp, year, semester, paper_code, subject_name, paper_type, status, branch, email, pdf_url }
    }
}

prop_compose! {
    fn predicate()(
        status in proptest::option::of(status()),
        year in proptest::option::of("[1-4]"),
        branch in proptest::option::of(branch()),
        paper_type in proptest::option::of(prop_oneof![Just("regular".to_string()), Just("Ex".to_string())]),
        needle in proptest::option::of("[a-z]{0,2}"),
        field in prop_oneof![
            Just(SearchField::SubjectName),
            Just(SearchField::PaperCode),
            Just(SearchField::Branch),
            Just(SearchField::Email),
        ],
    ) -> RecordFilter {
        let mut predicate = RecordFilter::new();
        predicate.status = status;
        predicate.year = year;
        predicate.branch = branch;
        predicate.paper_type = paper_type;
        if let Some(needle) = needle {
            predicate = predicate.search(field, needle);
        }
        predicate
    }
}

fn sort_spec() -> impl Strategy<Value = SortSpec> {
    (
        prop_oneof![
            Just(SortKey::Year),
            Just(SortKey::Semester),
            Just(SortKey::PaperCode),
            Just(SortKey::SubjectName),
            Just(SortKey::Branch),
            Just(SortKey::Status),
            Just(SortKey::Timestamp),
        ],
        prop_oneof![Just(SortDirection::Ascending), Just(SortDirection::Descending)],
        prop_oneof![Just(TieBreak::YearDescSemesterAsc), Just(TieBreak::None)],
    )
        .prop_map(|(key, direction, tie_break)| SortSpec { key, direction, tie_break })
}

proptest! {
    #[test]
    fn prop_filter_is_exact_ordered_subset(records in prop::collection::vec(record(), 0..30), p in predicate()) {
        let out = filter(&records, &p);
        let expected: Vec<Record> = records.iter().filter(|r| p.matches(r)).cloned().collect();
        prop_assert_eq!(&out, &expected);
        prop_assert_eq!(filter(&out, &p), out);
    }

    #[test]
    fn prop_sort_twice_is_a_no_op(records in prop::collection::vec(record(), 0..30), spec in sort_spec()) {
        let once = sort(&records, &spec);
        prop_assert_eq!(once.len(), records.len());
        prop_assert_eq!(sort(&once, &spec), once);
    }

    #[test]
    fn prop_dedup_key_ignores_non_key_fields(a in record(), id in "[A-Z]{3}", subject in "[a-z]{0,5}") {
        let b = Record { id, subject_name: subject, timestamp: "2030-01-01T00:00:00Z".into(), ..a.clone() };
        prop_assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn prop_dedup_key_changes_with_each_key_field(a in record(), which in 0usize..5) {
        let mut b = a.clone();
        match which {
            0 => b.year.push('9'),
            1 => b.semester.push('9'),
            2 => b.paper_code.push('9'),
            3 => b.paper_type.push('9'),
            _ => b.branch.push('9'),
        }
        prop_assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn prop_json_round_trip(a in record()) {
        let row = a.to_row().unwrap();
        prop_assert_eq!(Record::parse(&row), a);
    }
}
