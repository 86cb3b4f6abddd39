//! Rebuild verification.
//!
//! A version is rebuilt from its top-level segments in `order_index` order
//! (`leading + text + trailing` each), then hashed twice: the raw bytes, and
//! the serialization of a fresh parse. Both are compared with the hashes
//! recorded when the version was ingested.
//!
//! | Raw | Tree | Status |
//! |-----|------|--------|
//! | match | match | `PASS` |
//! | differ | match | `DRIFT_DETECTED` (`formatting_only`) |
//! | any | differ or unparsable | `DRIFT_DETECTED` (`structural`) |
//!
//! Every run appends one equivalence proof. A mismatch is an outcome, not an
//! error.

use std::path::Path;

use crate::db::{NewProof, Store};
use crate::error::{Error, Result};
use crate::hashing;
use crate::languages;
use crate::types::{FileId, SourceSegment, VerifyOutcome, VerifyStatus};

/// Concatenate segments into the rebuilt source.
#[must_use]
pub fn rebuild(segments: &[SourceSegment]) -> String {
    let len = segments
        .iter()
        .map(|s| s.leading.len() + s.text.len() + s.trailing.len())
        .sum();
    let mut out = String::with_capacity(len);
    for segment in segments {
        out.push_str(&segment.leading);
        out.push_str(&segment.text);
        out.push_str(&segment.trailing);
    }
    out
}

/// Rebuild the latest version of `file_id` and record a proof.
///
/// # Errors
///
/// [`Error::UnknownFile`] if the file does not exist or has no version;
/// store errors otherwise.
pub fn verify_latest(store: &Store, file_id: FileId) -> Result<VerifyOutcome> {
    let file = store
        .get_file_by_id(file_id)?
        .ok_or_else(|| Error::UnknownFile(format!("file id {file_id}")))?;
    let version = store
        .get_version(file_id, None)?
        .ok_or_else(|| Error::UnknownFile(file.path.display().to_string()))?;

    let segments = store.list_top_level_segments(version.id)?;
    let rebuilt = rebuild(&segments);
    let raw_hash = hashing::raw_hash(&rebuilt);
    let tree_hash = rebuilt_tree_hash(&file.path, &rebuilt);

    let raw_match = raw_hash == version.raw_hash;
    let tree_match = tree_hash.as_deref() == Some(version.tree_hash.as_str());
    let status = VerifyStatus::from_matches(raw_match, tree_match);

    store.record_proof(&NewProof {
        file_id,
        version_id: version.id,
        original_raw_hash: &version.raw_hash,
        rebuilt_raw_hash: &raw_hash,
        original_tree_hash: &version.tree_hash,
        rebuilt_tree_hash: tree_hash.as_deref(),
        status,
        verified_at: Store::now_ns()?,
    })?;

    if status == VerifyStatus::Pass {
        tracing::debug!(
            path = %file.path.display(),
            version = version.version_number,
            "Rebuild verified"
        );
    } else {
        tracing::warn!(
            path = %file.path.display(),
            version = version.version_number,
            status = %status,
            "Rebuild does not match ingested source"
        );
    }

    Ok(VerifyOutcome {
        file_id,
        version_number: version.version_number,
        matched: status == VerifyStatus::Pass,
        raw_match,
        tree_match,
        raw_hash,
        tree_hash,
        status,
    })
}

/// Tree hash of the rebuilt text, `None` if it no longer parses.
fn rebuilt_tree_hash(path: &Path, rebuilt: &str) -> Option<String> {
    match languages::support_for_path(path).tree_hash(path, rebuilt) {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Rebuilt source does not parse");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, ExtractOptions};
    use crate::types::ComponentId;

    fn store_with(source: &str) -> (Store, FileId) {
        let store = Store::open_in_memory().expect("store");
        let extraction = extract(Path::new("m.py"), source, &ExtractOptions::default())
            .expect("source should parse");
        let written = store.write_snapshot(&extraction).expect("write");
        (store, written.report.file_id)
    }

    #[test]
    fn rebuild_concatenates_in_order() {
        let segment = |leading: &str, text: &str, trailing: &str| SourceSegment {
            component_id: ComponentId(0),
            leading: leading.to_string(),
            text: text.to_string(),
            trailing: trailing.to_string(),
        };

        let rebuilt = rebuild(&[segment("# head\n", "a = 1", ""), segment("\n\n", "b = 2", "\n")]);

        assert_eq!(rebuilt, "# head\na = 1\n\nb = 2\n");
    }

    #[test]
    fn intact_snapshot_passes() {
        let (store, file_id) = store_with("import os\n\n\ndef f(x):\n    return os.path.join(x)\n");

        let outcome = verify_latest(&store, file_id).expect("verify");

        assert_eq!(outcome.status, VerifyStatus::Pass);
        assert!(outcome.matched);
        assert_eq!(store.list_proofs(file_id).expect("proofs").len(), 1);
    }

    #[test]
    fn empty_file_passes() {
        let (store, file_id) = store_with("");

        let outcome = verify_latest(&store, file_id).expect("verify");

        assert!(outcome.matched);
    }

    #[test]
    fn unknown_file_is_an_error() {
        let store = Store::open_in_memory().expect("store");

        let err = verify_latest(&store, FileId(42)).expect_err("no such file");

        assert!(matches!(err, Error::UnknownFile(_)));
    }
}
