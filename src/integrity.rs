//! Pluggable integrity hook around vertex insertion and verification.
//!
//! The core requires only that some collision-resistant hash and some
//! proof-of-integrity mechanism exist; both are injectable and optional.
//! The conflict engine never depends on them.

use crate::core::graph::VertexId;

/// A computed content fingerprint, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Swappable fingerprint/proof primitives.
///
/// Implementations must be cheap and non-blocking; callers invoke them
/// around vertex insertion, never on the conflict-check hot path.
pub trait IntegrityProvider: Send + Sync {
    /// Compute a fingerprint over raw bytes.
    fn compute_fingerprint(&self, bytes: &[u8]) -> Fingerprint;

    /// Verify an integrity proof for a vertex.
    fn verify_proof(&self, vertex: &VertexId, proof: &[u8]) -> bool;
}

/// Always-valid provider. The default for tests and for deployments that
/// handle integrity outside the core.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIntegrity;

impl IntegrityProvider for NoopIntegrity {
    fn compute_fingerprint(&self, _bytes: &[u8]) -> Fingerprint {
        Fingerprint(String::new())
    }

    fn verify_proof(&self, _vertex: &VertexId, _proof: &[u8]) -> bool {
        true
    }
}

/// Blake3-backed provider. A proof is valid when it equals the blake3 hash
/// of the vertex id's canonical string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Integrity;

impl IntegrityProvider for Blake3Integrity {
    fn compute_fingerprint(&self, bytes: &[u8]) -> Fingerprint {
        Fingerprint(blake3::hash(bytes).to_hex().to_string())
    }

    fn verify_proof(&self, vertex: &VertexId, proof: &[u8]) -> bool {
        let expected = blake3::hash(vertex.to_string().as_bytes());
        proof == expected.as_bytes()
    }
}
