use rust_decimal::Decimal;

use super::common::*;
use crate::activity::{ActivityRecordId, AssignmentId, EmissionSettings, LayerId};
use crate::calculation::domain::{IssueKind, RecordOutcome};
use crate::calculation::service::CalculationError;
use crate::calculation::store::{ResultFilter, ResultStoreError};
use crate::factors::GhgScope;

fn mixed_assignment(harness: &Harness) {
    harness.add(record(
        "r1",
        "electricity",
        "a1",
        Some(Decimal::new(100, 0)),
        "kWh",
        date(2025, 3, 31),
    ));
    harness.add(record(
        "r2",
        "diesel",
        "a1",
        Some(Decimal::new(50, 0)),
        "liters",
        date(2025, 3, 31),
    ));
    harness.add(record(
        "r3",
        "water",
        "a1",
        Some(Decimal::new(8, 0)),
        "m3",
        date(2025, 3, 31),
    ));
    harness.add(record(
        "r4",
        "electricity",
        "a1",
        Some(Decimal::new(3, 0)),
        "kg",
        date(2025, 3, 31),
    ));
    harness.add(record(
        "r5",
        "electricity",
        "a1",
        Some(Decimal::new(3, 0)),
        "kWh",
        date(2018, 3, 31),
    ));
}

#[test]
fn calculate_for_record_persists_one_row() {
    let harness = Harness::new();
    harness.add(record(
        "r1",
        "electricity",
        "a1",
        Some(Decimal::new(100, 0)),
        "kWh",
        date(2025, 3, 31),
    ));

    let report = harness
        .service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect("record calculates");
    assert!(matches!(report.outcome, RecordOutcome::Calculated { .. }));
    assert!(!report.removed_stale);

    let stored = harness.stored("r1").expect("row stored");
    assert_eq!(stored.emission_value, Decimal::new(3900, 2));
    assert_eq!(stored.layer_id, LayerId::from("hq"));

    harness
        .service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect("rerun succeeds");
    assert_eq!(harness.store.len(), 1);
}

#[test]
fn record_that_becomes_ineligible_loses_its_row() {
    let harness = Harness::new();
    harness.add(record(
        "r1",
        "electricity",
        "a1",
        Some(Decimal::new(100, 0)),
        "kWh",
        date(2025, 3, 31),
    ));
    harness
        .service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect("record calculates");

    harness
        .sources
        .put_metric(basic_metric(
            "electricity",
            EmissionSettings::default(),
            unit("kWh"),
        ))
        .expect("metric updated");

    let report = harness
        .service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect("record re-evaluates");
    assert_eq!(report.outcome.label(), "not_eligible");
    assert!(report.removed_stale);
    assert!(harness.stored("r1").is_none());
}

#[test]
fn deleted_record_reports_not_found_and_clears_row() {
    let harness = Harness::new();
    harness.add(record(
        "r1",
        "diesel",
        "a1",
        Some(Decimal::new(50, 0)),
        "liters",
        date(2025, 3, 31),
    ));
    harness
        .service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect("record calculates");
    harness
        .sources
        .remove_record(&ActivityRecordId::from("r1"))
        .expect("record removed");

    let err = harness
        .service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect_err("record is gone");
    assert!(matches!(err, CalculationError::RecordNotFound(_)));
    assert!(harness.store.is_empty());
}

#[test]
fn assignment_summary_counts_every_outcome() {
    let harness = Harness::new();
    mixed_assignment(&harness);

    let summary = harness
        .service
        .calculate_for_assignment(&AssignmentId::from("a1"))
        .expect("assignment calculates");

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.calculated, 2);
    assert_eq!(summary.skipped_ineligible, 1);
    assert_eq!(summary.skipped_no_factor, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.removed, 0);

    let kinds: Vec<_> = summary.issues.iter().map(|issue| issue.kind).collect();
    assert!(kinds.contains(&IssueKind::NoFactorFound));
    assert!(kinds.contains(&IssueKind::UnitConversionUnsupported));
    assert_eq!(harness.store.len(), 2);
}

#[test]
fn repeated_assignment_runs_leave_results_unchanged() {
    let harness = Harness::new();
    mixed_assignment(&harness);
    let assignment = AssignmentId::from("a1");

    let first = harness
        .service
        .calculate_for_assignment(&assignment)
        .expect("first run");
    let rows_after_first = harness.store.all().expect("store readable");
    let second = harness
        .service
        .calculate_for_assignment(&assignment)
        .expect("second run");

    assert_eq!(first, second);
    assert_eq!(harness.store.all().expect("store readable"), rows_after_first);
}

#[test]
fn deleting_a_record_prunes_its_row_on_the_next_sweep() {
    let harness = Harness::new();
    mixed_assignment(&harness);
    let assignment = AssignmentId::from("a1");
    harness
        .service
        .calculate_for_assignment(&assignment)
        .expect("first run");

    harness
        .sources
        .remove_record(&ActivityRecordId::from("r2"))
        .expect("record removed");
    let summary = harness
        .service
        .calculate_for_assignment(&assignment)
        .expect("second run");

    assert_eq!(summary.removed, 1);
    assert!(harness.stored("r2").is_none());
    assert!(harness.stored("r1").is_some());
}

#[test]
fn assignment_sweep_leaves_other_assignments_alone() {
    let harness = Harness::new();
    harness.add(record(
        "r1",
        "electricity",
        "a1",
        Some(Decimal::new(100, 0)),
        "kWh",
        date(2025, 3, 31),
    ));
    harness.add(record(
        "r2",
        "diesel",
        "a2",
        Some(Decimal::new(50, 0)),
        "liters",
        date(2025, 3, 31),
    ));
    harness
        .service
        .recalculate_all()
        .expect("global run");

    harness
        .sources
        .remove_record(&ActivityRecordId::from("r1"))
        .expect("record removed");
    harness
        .service
        .calculate_for_assignment(&AssignmentId::from("a1"))
        .expect("a1 sweep");

    assert!(harness.stored("r1").is_none());
    assert!(harness.stored("r2").is_some());
}

#[test]
fn global_recalculation_drops_rows_of_vanished_assignments() {
    let harness = Harness::new();
    harness.add(record(
        "r1",
        "electricity",
        "a1",
        Some(Decimal::new(100, 0)),
        "kWh",
        date(2025, 3, 31),
    ));
    harness.add(record(
        "r2",
        "diesel",
        "a2",
        Some(Decimal::new(50, 0)),
        "liters",
        date(2025, 3, 31),
    ));
    let first = harness.service.recalculate_all().expect("first run");
    assert_eq!(first.calculated, 2);

    harness
        .sources
        .remove_record(&ActivityRecordId::from("r2"))
        .expect("record removed");
    let second = harness.service.recalculate_all().expect("second run");

    assert_eq!(second.processed, 1);
    assert_eq!(second.removed, 1);
    assert_eq!(harness.store.len(), 1);
}

#[test]
fn summary_groups_stored_rows_by_scope() {
    let harness = Harness::new();
    mixed_assignment(&harness);
    harness
        .service
        .calculate_for_assignment(&AssignmentId::from("a1"))
        .expect("assignment calculates");

    let summary = harness
        .service
        .summary(&ResultFilter::for_assignment(AssignmentId::from("a1")))
        .expect("summary builds");
    assert_eq!(summary.records, 2);
    assert_eq!(summary.total_emission_value, Decimal::new(17130, 2));
    assert_eq!(summary.by_scope[0].scope, Some(GhgScope::Scope1));
}

#[test]
fn persistent_conflict_counts_records_as_failed() {
    let (sources, service) = service_with_store(ConflictStore);
    sources
        .put_record(record(
            "r1",
            "electricity",
            "a1",
            Some(Decimal::new(100, 0)),
            "kWh",
            date(2025, 3, 31),
        ))
        .expect("record stored");
    sources
        .put_record(record(
            "r2",
            "water",
            "a1",
            Some(Decimal::new(1, 0)),
            "m3",
            date(2025, 3, 31),
        ))
        .expect("record stored");

    let summary = service
        .calculate_for_assignment(&AssignmentId::from("a1"))
        .expect("conflict does not abort the batch");
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.calculated, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped_ineligible, 1);
    assert_eq!(summary.issues[0].kind, IssueKind::PersistenceConflict);

    let err = service
        .calculate_for_record(&ActivityRecordId::from("r1"))
        .expect_err("single record write surfaces the conflict");
    assert!(err.is_conflict());
}

#[test]
fn storage_outage_aborts_with_partial_summary() {
    let (sources, service) = service_with_store(UnavailableStore);
    sources
        .put_record(record(
            "r1",
            "diesel",
            "a1",
            Some(Decimal::new(50, 0)),
            "liters",
            date(2025, 3, 31),
        ))
        .expect("record stored");

    let err = service.recalculate_all().expect_err("outage aborts");
    match &err {
        CalculationError::Aborted { partial, .. } => assert_eq!(partial.processed, 0),
        other => panic!("expected aborted batch, got {other:?}"),
    }
    assert!(matches!(
        err.root(),
        CalculationError::Results(ResultStoreError::Unavailable(_))
    ));
    assert!(!err.is_conflict());
}

#[test]
fn overflowing_emission_is_failed_and_clears_the_previous_row() {
    let harness = Harness::new();
    let assignment = AssignmentId::from("a1");
    harness.add(record(
        "r1",
        "diesel",
        "a1",
        Some(Decimal::new(50, 0)),
        "liters",
        date(2025, 3, 31),
    ));
    harness
        .service
        .calculate_for_assignment(&assignment)
        .expect("first run calculates");
    assert!(harness.stored("r1").is_some());

    harness.add(record(
        "r1",
        "diesel",
        "a1",
        Some(Decimal::MAX),
        "liters",
        date(2025, 3, 31),
    ));
    let summary = harness
        .service
        .calculate_for_assignment(&assignment)
        .expect("second run completes");

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.calculated, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.issues.len(), 1);
    assert_eq!(summary.issues[0].kind, IssueKind::ValueOverflow);
    assert!(harness.stored("r1").is_none());
}

#[test]
fn concurrent_triggers_on_one_record_leave_a_single_row() {
    let harness = Harness::new();
    harness.add(record(
        "r1",
        "electricity",
        "a1",
        Some(Decimal::new(100, 0)),
        "kWh",
        date(2025, 3, 31),
    ));
    let record_id = ActivityRecordId::from("r1");
    let assignment = AssignmentId::from("a1");

    std::thread::scope(|threads| {
        for worker in 0..6 {
            let service = &harness.service;
            let (record_id, assignment) = (&record_id, &assignment);
            threads.spawn(move || {
                for _ in 0..20 {
                    if worker % 2 == 0 {
                        service
                            .calculate_for_record(record_id)
                            .expect("record trigger succeeds");
                    } else {
                        service
                            .calculate_for_assignment(assignment)
                            .expect("assignment trigger succeeds");
                    }
                }
            });
        }
    });

    assert_eq!(harness.store.len(), 1);
    assert_eq!(
        harness.stored("r1").map(|value| value.emission_value),
        Some(Decimal::new(3900, 2))
    );
}
