//! Reproducibility: identical operation sequences against freshly
//! initialized coordinators must produce identical conflict reports, in
//! the same order, with the same severities.

use converge::{Config, Coordinator, ConflictReport, OperationId};

use crate::fixtures::{edit, edit_with_parents, init_tracing};

/// Replay the same scripted session against a fresh coordinator.
fn run_session(c: &Coordinator) -> Vec<ConflictReport> {
    let root = edit(c, "agent-r", "shared.rs");
    let root_v = c.vertex_for_operation(&root).unwrap();

    // Two forks off the root plus a detached editor
    let left = edit_with_parents(c, "agent-a", "shared.rs", vec![root_v]);
    let left_v = c.vertex_for_operation(&left).unwrap();
    let _left2 = edit_with_parents(c, "agent-a", "shared.rs", vec![left_v]);

    let right = edit_with_parents(c, "agent-b", "shared.rs", vec![root_v]);
    let right_v = c.vertex_for_operation(&right).unwrap();
    let _loner = edit_with_parents(c, "agent-x", "shared.rs", vec![]);

    let candidate = edit_with_parents(c, "agent-z", "shared.rs", vec![right_v]);
    c.check_conflicts(&candidate).unwrap()
}

/// Strip the run-specific ids, keeping the comparable shape of a report.
fn shape(reports: &[ConflictReport]) -> Vec<(u8, bool, Option<u64>, u64)> {
    reports
        .iter()
        .map(|r| (r.severity.tier(), r.ancestor, r.distance, r.prior_timestamp))
        .collect()
}

#[test]
fn test_identical_sessions_produce_identical_reports() {
    init_tracing();
    let first = run_session(&Coordinator::new(Config::default()).unwrap());
    let second = run_session(&Coordinator::new(Config::default()).unwrap());

    assert_eq!(shape(&first), shape(&second));
}

#[test]
fn test_repeated_checks_are_stable() {
    init_tracing();
    let c = Coordinator::new(Config::default()).unwrap();
    let root = edit(&c, "agent-r", "f.rs");
    let root_v = c.vertex_for_operation(&root).unwrap();
    let _fork_a = edit_with_parents(&c, "agent-a", "f.rs", vec![root_v]);
    let _fork_b = edit_with_parents(&c, "agent-b", "f.rs", vec![root_v]);
    let candidate = edit(&c, "agent-z", "f.rs");

    let ids = |reports: &[ConflictReport]| -> Vec<OperationId> {
        reports.iter().map(|r| r.prior).collect()
    };

    let first = c.check_conflicts(&candidate).unwrap();
    for _ in 0..10 {
        let again = c.check_conflicts(&candidate).unwrap();
        assert_eq!(ids(&first), ids(&again));
        assert_eq!(shape(&first), shape(&again));
    }
}

#[test]
fn test_report_order_severity_then_timestamp() {
    init_tracing();
    let c = Coordinator::new(Config::default()).unwrap();
    let reports = run_session(&c);
    assert!(!reports.is_empty());

    for pair in reports.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
        if pair[0].severity == pair[1].severity {
            assert!(pair[0].prior_timestamp < pair[1].prior_timestamp);
        }
    }
}
