//! Version-control engine boundary.
//!
//! The core treats the VCS as an opaque collaborator: all it consumes is a
//! commit identifier and the list of file paths the commit changed, used to
//! populate an operation's affected resources. Nothing else crosses this
//! boundary.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::debug;

use crate::Result;

/// What the core reads from a single commit: an opaque id plus the paths
/// it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Opaque commit identifier.
    pub id: String,
    /// File paths changed by the commit, relative to the repository root.
    pub changed_paths: Vec<String>,
}

/// Thin adapter over a git repository for extracting commit information.
pub struct GitBridge {
    repo_path: PathBuf,
}

impl GitBridge {
    pub fn new(repo_path: &Path) -> Result<Self> {
        debug!(path = %repo_path.display(), "GitBridge::new");
        let _ = Repository::discover(repo_path)?;
        Ok(Self {
            repo_path: repo_path.to_path_buf(),
        })
    }

    fn repo(&self) -> Result<Repository> {
        Ok(Repository::discover(&self.repo_path)?)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Resolve a commit and list the paths it changed.
    ///
    /// The diff is taken against the first parent; a root commit diffs
    /// against the empty tree, so every path it introduced is listed.
    pub fn commit_info(&self, commit_id: &str) -> Result<CommitInfo> {
        let repo = self.repo()?;
        let oid = git2::Oid::from_str(commit_id)?;
        let commit = repo.find_commit(oid)?;
        let tree = commit.tree()?;

        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let mut changed_paths = Vec::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path().and_then(|p| p.to_str()) {
                    if !changed_paths.iter().any(|existing| existing == path) {
                        changed_paths.push(path.to_string());
                    }
                }
            }
        }

        debug!(commit = commit_id, paths = changed_paths.len(), "commit info extracted");
        Ok(CommitInfo {
            id: commit.id().to_string(),
            changed_paths,
        })
    }

    /// Commit info for the repository HEAD.
    pub fn head_info(&self) -> Result<CommitInfo> {
        let repo = self.repo()?;
        let head = repo.head()?.peel_to_commit()?;
        self.commit_info(&head.id().to_string())
    }
}
