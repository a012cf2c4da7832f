//! Monotonic ULID generation for audit entry ids
//!
//! Entries logged within the same millisecond still sort in call order, which
//! the audit query relies on as a tie-breaker after the timestamp.

use std::sync::{Mutex, OnceLock, PoisonError};
use ulid::{Generator, Ulid};

static ULID_GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

fn generator() -> &'static Mutex<Generator> {
    ULID_GENERATOR.get_or_init(|| Mutex::new(Generator::new()))
}

/// Generate a ULID strictly greater than the previous one from this process
///
/// If the random component overflows within a single millisecond a fresh
/// non-monotonic ULID is returned instead of failing.
pub fn generate_monotonic_ulid() -> Ulid {
    let mut gen = generator().lock().unwrap_or_else(PoisonError::into_inner);
    match gen.generate() {
        Ok(ulid) => ulid,
        Err(e) => {
            tracing::debug!("monotonic ULID overflow, falling back to random: {e}");
            Ulid::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_ulids_are_ordered() {
        let ids: Vec<Ulid> = (0..1000).map(|_| generate_monotonic_ulid()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_ulids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| (0..250).map(|_| generate_monotonic_ulid()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate ULID {id}");
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
