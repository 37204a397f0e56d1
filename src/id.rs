//! ID generation for callers that have no natural entry id.

use crate::types::EntryType;
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate an entry id from content + entropy.
/// Format: type prefix + "-" + 8 hex chars of SHA256(type + title + timestamp + random)
pub fn generate_id(entry_type: &EntryType, title: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry_type.as_str().as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(created_at.timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    // Add 8 bytes of randomness to prevent collisions
    hasher.update(rand::rng().random::<[u8; 8]>());
    let hash = hasher.finalize();
    format!(
        "{}-{:08x}",
        entry_type.id_prefix(),
        u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id(&EntryType::Knowledge, "Test title", Utc::now());
        assert!(id.starts_with("K-"));
        assert_eq!(id.len(), 10); // "K-" + 8 hex chars
        assert!(id[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_id_prefix_follows_type() {
        let now = Utc::now();
        assert!(generate_id(&EntryType::Decision, "x", now).starts_with("D-"));
        assert!(generate_id(&EntryType::Other("als_run".to_string()), "x", now).starts_with("A-"));
    }

    #[test]
    fn test_generate_id_uniqueness() {
        let now = Utc::now();
        let id1 = generate_id(&EntryType::Knowledge, "Same title", now);
        let id2 = generate_id(&EntryType::Knowledge, "Same title", now);
        // Due to random component, same inputs should produce different IDs
        assert_ne!(id1, id2);
    }
}
