//! Cross-version identity resolution.
//!
//! A component's identity is its qualified name. Each qualified name carries a
//! *committed hash*: the content hash that was last recognized as the official
//! version of that component, and when it was recognized.
//!
//! | Previous version has the name? | Structure changed? | Result |
//! |---|---|---|
//! | no | n/a | NEW, committed = content hash, now |
//! | yes | no (same or reformatted) | ADOPT, committed hash and time carried forward |
//! | yes | yes | ADOPT, committed = new content hash, now |
//!
//! Database row ids never participate: every version gets fresh component
//! rows, and identity survives through the name alone.

use std::collections::HashMap;

use crate::extract::ExtractedComponent;
use crate::types::{ComponentId, IdentityResolution};

/// Committed identity of one qualified name in the previous version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedIdentity {
    /// Component row in the previous version
    pub component_id: ComponentId,
    /// Content hash observed in the previous version
    pub content_hash: String,
    /// Structure hash observed in the previous version
    pub structure_hash: String,
    /// Committed hash carried by the previous version
    pub committed_hash: String,
    /// When that hash was committed (unix nanoseconds)
    pub committed_at: i64,
}

/// Identity table of a version: qualified name to committed identity.
pub type IdentityTable = HashMap<String, CommittedIdentity>;

/// Identity assigned to one component of the new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// ADOPT or NEW
    pub resolution: IdentityResolution,
    /// Committed hash for the new row
    pub committed_hash: String,
    /// Committed timestamp for the new row
    pub committed_at: i64,
}

/// Resolve one component against the previous identity table.
#[must_use]
pub fn resolve(
    previous: &IdentityTable,
    qualified_name: &str,
    content_hash: &str,
    structure_hash: &str,
    now: i64,
) -> ResolvedIdentity {
    match previous.get(qualified_name) {
        Some(prior) if prior.structure_hash == structure_hash => ResolvedIdentity {
            resolution: IdentityResolution::Adopt,
            committed_hash: prior.committed_hash.clone(),
            committed_at: prior.committed_at,
        },
        Some(_) => ResolvedIdentity {
            resolution: IdentityResolution::Adopt,
            committed_hash: content_hash.to_string(),
            committed_at: now,
        },
        None => ResolvedIdentity {
            resolution: IdentityResolution::New,
            committed_hash: content_hash.to_string(),
            committed_at: now,
        },
    }
}

/// Resolve every staged component, in order.
#[must_use]
pub fn resolve_all(
    previous: &IdentityTable,
    components: &[ExtractedComponent],
    now: i64,
) -> Vec<ResolvedIdentity> {
    components
        .iter()
        .map(|c| {
            resolve(
                previous,
                &c.qualified_name,
                &c.content_hash,
                &c.structure_hash,
                now,
            )
        })
        .collect()
}
