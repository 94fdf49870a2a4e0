//! Content-based event identifiers used as the deduplication key.
//!
//! Two events with identical (title, date, venue) collapse to the same
//! identifier regardless of which source produced them, so the same
//! real-world event imported twice does not duplicate.

use sha2::{Digest, Sha256};

fn normalize_component(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Deterministic identifier for one event occurrence. Pure function:
/// case- and whitespace-insensitive on each component, no state, no I/O.
pub fn generate(title: &str, start_date: &str, venue: &str) -> String {
    let canonical = format!(
        "{}|{}|{}",
        normalize_component(title),
        normalize_component(start_date),
        normalize_component(venue)
    );
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_collide() {
        assert_eq!(
            generate("Jazz Night", "2026-05-01", "Blue Room"),
            generate("Jazz Night", "2026-05-01", "Blue Room")
        );
    }

    #[test]
    fn case_and_whitespace_variants_collide() {
        assert_eq!(
            generate("Jazz  Night ", "2026-05-01", "BLUE room"),
            generate("jazz night", " 2026-05-01", "Blue Room")
        );
    }

    #[test]
    fn any_differing_component_changes_the_identifier() {
        let base = generate("Jazz Night", "2026-05-01", "Blue Room");
        assert_ne!(base, generate("Jazz Might", "2026-05-01", "Blue Room"));
        assert_ne!(base, generate("Jazz Night", "2026-05-02", "Blue Room"));
        assert_ne!(base, generate("Jazz Night", "2026-05-01", "Red Room"));
    }

    #[test]
    fn output_is_hex_sha256() {
        let id = generate("a", "b", "c");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
