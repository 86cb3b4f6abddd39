//! Content digests.
//!
//! Every hash Canon stores is a SHA-256 digest rendered as 64 lowercase hex
//! characters, so values compare equal across processes, platforms and
//! database copies.

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as lowercase hex.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Raw hash of source text (exact bytes).
#[must_use]
pub fn raw_hash(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

/// Tree hash of a deterministic tree serialization.
///
/// The serialization is produced by
/// [`LanguageSupport::serialize`](crate::languages::LanguageSupport::serialize);
/// the digest is taken the same way as the raw hash so both can be stored in
/// the same column type.
#[must_use]
pub fn tree_hash(serialized: &str) -> String {
    sha256_hex(serialized.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_has_known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_is_lowercase_hex_of_fixed_width() {
        let hash = raw_hash("def f():\n    return 1\n");

        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn single_byte_change_changes_digest() {
        assert_ne!(raw_hash("x = 1"), raw_hash("x = 2"));
        assert_ne!(raw_hash("x = 1"), raw_hash("x = 1 "));
    }

    proptest! {
        #[test]
        fn hashing_is_deterministic(text in ".*") {
            prop_assert_eq!(raw_hash(&text), raw_hash(&text));
        }
    }
}
