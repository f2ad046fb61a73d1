//! Thread-safety of the coordinator facade.
//!
//! Multiple agents submit operations and run conflict checks from parallel
//! threads. The facade promises exclusive mutation and torn-free reads;
//! conflict reports may trail racing inserts by one operation, which these
//! tests tolerate by construction.

use std::collections::HashSet;
use std::thread;

use converge::{AgentId, Config, Coordinator, Metadata};

use crate::fixtures::{coordinator, edit};

#[test]
fn test_parallel_appends_assign_unique_timestamps() {
    let c = coordinator();

    let ids: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let c = &c;
                s.spawn(move || {
                    (0..50)
                        .map(|i| {
                            c.append_operation(
                                &AgentId::from(format!("agent-{}", t).as_str()),
                                "edit",
                                vec![format!("t{}-f{}.rs", t, i)],
                                Metadata::new(),
                            )
                            .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let stats = c.stats();
    assert_eq!(stats.total_operations, 400);
    assert_eq!(stats.total_vertices, 400);
    assert_eq!(stats.total_agents, 8);

    // A single atomic counter: every timestamp distinct, none skipped
    let timestamps: HashSet<u64> = ids
        .iter()
        .map(|id| c.get_operation(id).unwrap().timestamp)
        .collect();
    assert_eq!(timestamps.len(), 400);
    assert_eq!(timestamps.iter().min(), Some(&1));
    assert_eq!(timestamps.iter().max(), Some(&400));
}

#[test]
fn test_checks_race_with_appends_without_panicking() {
    let c = coordinator();
    let seed = edit(&c, "agent-seed", "contended.rs");

    thread::scope(|s| {
        // Writers hammer the same resource
        for t in 0..4 {
            let c = &c;
            s.spawn(move || {
                for _ in 0..50 {
                    c.append_operation(
                        &AgentId::from(format!("writer-{}", t).as_str()),
                        "edit",
                        vec!["contended.rs".to_string()],
                        Metadata::new(),
                    )
                    .unwrap();
                }
            });
        }
        // Readers check conflicts on the seed operation throughout
        for _ in 0..4 {
            let c = &c;
            let seed = seed;
            s.spawn(move || {
                for _ in 0..50 {
                    let reports = c.check_conflicts(&seed).unwrap();
                    // Window bounds the report count regardless of log size
                    assert!(reports.len() <= c.config().conflict_window_size);
                }
            });
        }
    });

    let stats = c.stats();
    assert_eq!(stats.total_operations, 201);
    assert_eq!(stats.total_vertices, 201);
}

#[test]
fn test_tip_snapshot_is_never_torn() {
    let c = coordinator();

    thread::scope(|s| {
        for t in 0..4 {
            let c = &c;
            s.spawn(move || {
                for i in 0..50 {
                    c.append_operation(
                        &AgentId::from(format!("agent-{}", t).as_str()),
                        "edit",
                        vec![format!("f{}-{}.rs", t, i)],
                        Metadata::new(),
                    )
                    .unwrap();
                }
            });
        }
        for _ in 0..4 {
            let c = &c;
            s.spawn(move || {
                for _ in 0..100 {
                    // Every tip in a snapshot must resolve to a vertex with
                    // no observed successor among the snapshot itself
                    let tips = c.tips();
                    for a in &tips {
                        for b in &tips {
                            if a != b {
                                assert!(!c.is_ancestor(a, b));
                            }
                        }
                    }
                }
            });
        }
    });
}

#[test]
fn test_registry_mutations_race_safely() {
    let c = coordinator();

    thread::scope(|s| {
        for t in 0..8 {
            let c = &c;
            s.spawn(move || {
                let id = AgentId::from(format!("agent-{}", t % 4).as_str());
                for _ in 0..25 {
                    c.register_agent(&id).unwrap();
                    c.set_agent_status(&id, converge::AgentStatus::Idle).unwrap();
                }
            });
        }
    });

    // Four distinct agents despite 200 racing registrations
    assert_eq!(c.stats().total_agents, 4);
}
