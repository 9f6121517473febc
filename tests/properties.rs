use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use proptest::prelude::*;

use visit_analytics::cleaning::{hour_and_weekday, DatetimeRepair, FeatureExtractor};
use visit_analytics::columns::{Column, ColumnNameTable};
use visit_analytics::config::DEFAULT_DATE_FORMATS;
use visit_analytics::processing::{bin, deltas, Aggregator, SortedTimestamps};
use visit_analytics::types::{Checked, InvalidReason, SentinelSet, VisitRecord};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

fn record_strategy() -> impl Strategy<Value = VisitRecord> {
    (
        0i64..500_000,
        prop_oneof![Just(None), (0i64..600).prop_map(Some)],
        prop_oneof![Just("999".to_string()), "[0-9]{1,2}"],
        prop_oneof![Just("F"), Just("M"), Just("")],
        any::<bool>(),
    )
        .prop_map(|(offset, stay, department, gender, broken_entry)| {
            let entry = base() + TimeDelta::minutes(offset);
            VisitRecord {
                entry_date: if broken_entry {
                    "999".to_string()
                } else {
                    entry.format("%Y-%m-%d %H:%M:%S").to_string()
                },
                exit_date: stay
                    .map(|m| (entry + TimeDelta::minutes(m)).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
                age: Checked::Valid((offset % 100) as f64),
                gender: if gender.is_empty() {
                    Checked::Invalid(InvalidReason::Empty)
                } else {
                    Checked::Valid(gender.to_string())
                },
                department: Checked::Valid(department),
                duration: None,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn deltas_of_sorted_entries_are_non_negative(offsets in prop::collection::vec(0i64..1_000_000, 0..50)) {
        let times: Vec<NaiveDateTime> = offsets.iter().map(|m| base() + TimeDelta::minutes(*m)).collect();
        let sorted = SortedTimestamps::from_unsorted(times.clone());
        let out = deltas(&sorted);

        prop_assert_eq!(out.len(), times.len().saturating_sub(1));
        prop_assert!(out.iter().all(|d| *d >= TimeDelta::zero()));
        if let (Some(min), Some(max)) = (times.iter().min(), times.iter().max()) {
            let total = out.iter().fold(TimeDelta::zero(), |acc, d| acc + *d);
            prop_assert_eq!(total, *max - *min);
        }
    }

    #[test]
    fn sentinel_values_repair_to_invalid(code in -100_000i64..100_000) {
        let repair = DatetimeRepair::new(
            SentinelSet::new([code]),
            DEFAULT_DATE_FORMATS.iter().map(|f| (*f).to_string()).collect(),
        );
        prop_assert_eq!(
            repair.repair(&code.to_string()),
            Checked::Invalid(InvalidReason::Sentinel(code))
        );
    }

    #[test]
    fn derived_hour_and_weekday_stay_in_range(offset in 0i64..10_000_000) {
        let (hour, weekday) = hour_and_weekday(&(base() + TimeDelta::minutes(offset)));
        prop_assert!(hour < 24);
        prop_assert!((1..=7).contains(&weekday));
    }

    #[test]
    fn group_counts_reconstruct_the_cleaned_total(records in prop::collection::vec(record_strategy(), 0..80)) {
        let cleaned = FeatureExtractor::default().clean(&records);
        prop_assert_eq!(
            cleaned.report.retained + cleaned.report.dropped_invalid_entry,
            records.len()
        );

        let aggregator = Aggregator::new(ColumnNameTable::builtin().resolver("en").unwrap());
        for group in [Column::Hour, Column::Weekday, Column::Department, Column::Gender] {
            let table = aggregator.group_by(&cleaned.visits, &[group], Column::Duration).unwrap();
            prop_assert_eq!(table.total_count(), cleaned.len());
        }
        let table = aggregator
            .group_by(&cleaned.visits, &[Column::Department, Column::Gender], Column::Age)
            .unwrap();
        prop_assert_eq!(table.total_count(), cleaned.len());
    }

    #[test]
    fn binning_is_deterministic_and_complete(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 0..200),
        bins in 1usize..40,
    ) {
        let first = bin(&values, bins).unwrap();
        let second = bin(&values, bins).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.total(), values.len());
        prop_assert_eq!(first.out_of_range, 0);
        if !values.is_empty() {
            prop_assert_eq!(first.bins.len(), bins);
        }
    }
}
