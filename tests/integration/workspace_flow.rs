//! Feeding the coordination core from the version-control boundary.
//!
//! The core consumes only commit ids and changed-path lists from the VCS;
//! these tests run that flow against a real temporary repository and wire
//! the optional integrity hook around vertex insertion.

use std::fs;

use git2::{IndexAddOption, Repository, Signature};
use tempfile::TempDir;

use converge::git::GitBridge;
use converge::{
    AgentId, Blake3Integrity, Config, Coordinator, IntegrityProvider, Metadata, NoopIntegrity,
    Severity,
};

use crate::fixtures::init_tracing;

struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    fn write_and_commit(&self, file: &str, content: &str, message: &str) -> String {
        fs::write(self.dir.path().join(file), content).unwrap();
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Converge", "converge@localhost").unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }
}

/// Commits from two agents touching the same file flow through the bridge
/// into the log and come back out as a conflict report.
#[test]
fn test_commits_feed_conflict_detection() {
    init_tracing();
    let repo = TestRepo::new();
    let first = repo.write_and_commit("shared.rs", "fn a() {}\n", "agent a edit");
    let second = repo.write_and_commit("shared.rs", "fn a() {}\nfn b() {}\n", "agent b edit");

    let bridge = GitBridge::new(repo.dir.path()).unwrap();
    let c = Coordinator::new(Config::default()).unwrap();

    let mut ops = Vec::new();
    for (agent, commit_id) in [("agent-a", &first), ("agent-b", &second)] {
        let info = bridge.commit_info(commit_id).unwrap();
        let op = c
            .append_operation(
                &AgentId::from(agent),
                "commit",
                info.changed_paths,
                Metadata::new().with(Metadata::COMMIT, info.id),
            )
            .unwrap();
        ops.push(op);
    }

    assert_eq!(c.agents().len(), 2);
    assert_eq!(c.stats().total_operations, 2);
    assert_eq!(c.tips().len(), 1);

    // The second commit builds directly on the first: auto merge
    let reports = c.check_conflicts(&ops[1]).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].prior, ops[0]);
    assert!(reports[0].ancestor);
    assert_eq!(
        reports[0].resolution,
        converge::Resolution::AutoMerge
    );
}

/// The changed-path list is exactly what becomes the affected resources.
#[test]
fn test_changed_paths_become_resources() {
    init_tracing();
    let repo = TestRepo::new();
    repo.write_and_commit("a.txt", "one\n", "initial");
    let commit = repo.write_and_commit("b.txt", "two\n", "add b");

    let bridge = GitBridge::new(repo.dir.path()).unwrap();
    let info = bridge.commit_info(&commit).unwrap();

    let c = Coordinator::new(Config::default()).unwrap();
    let op = c
        .append_operation(
            &AgentId::from("agent-a"),
            "commit",
            info.changed_paths.clone(),
            Metadata::new().with(Metadata::COMMIT, info.id.clone()),
        )
        .unwrap();

    let stored = c.get_operation(&op).unwrap();
    assert_eq!(stored.resources, vec!["b.txt".to_string()]);
    assert_eq!(
        stored.metadata.get(Metadata::COMMIT).and_then(|v| v.as_str()),
        Some(info.id.as_str())
    );
}

/// The integrity hook is optional and never gates the conflict engine.
#[test]
fn test_integrity_hook_is_optional_and_pluggable() {
    init_tracing();
    let c = Coordinator::new(Config::default()).unwrap();
    let a = c
        .append_operation(
            &AgentId::from("agent-a"),
            "edit",
            vec!["f.rs".to_string()],
            Metadata::new(),
        )
        .unwrap();
    let b = c
        .append_operation(
            &AgentId::from("agent-b"),
            "edit",
            vec!["f.rs".to_string()],
            Metadata::new(),
        )
        .unwrap();

    let vertex = c.vertex_for_operation(&b).unwrap();

    // Default no-op provider accepts anything
    let noop = NoopIntegrity;
    assert!(noop.verify_proof(&vertex, b"whatever"));

    // Blake3 provider verifies a real proof, rejects a bogus one
    let blake = Blake3Integrity;
    let proof = blake3::hash(vertex.to_string().as_bytes());
    assert!(blake.verify_proof(&vertex, proof.as_bytes()));
    assert!(!blake.verify_proof(&vertex, b"bogus"));

    // Conflict detection ran fine with no provider involved at all
    let reports = c.check_conflicts(&b).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].prior, a);
    assert_eq!(reports[0].severity, Severity::Severe);
}
