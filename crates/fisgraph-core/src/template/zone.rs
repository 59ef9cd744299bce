//! Availability-zone selection.
//!
//! Faults scoped to one zone pick it uniformly at random from the ordered
//! list of eligible zones. The source of randomness is injectable so tests
//! and reproducible runs can pin the choice.

use super::Violation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Picks an index into a non-empty list of zones.
pub trait ZoneSource: Send + Sync {
    /// Return an index in `0..len`. Only called with `len > 0`.
    fn pick_index(&self, len: usize) -> usize;
}

/// Uniform choice from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngZones;

impl ZoneSource for ThreadRngZones {
    fn pick_index(&self, len: usize) -> usize {
        let mut rng = rand::rng();
        rng.random_range(0..len.max(1))
    }
}

/// Uniform choice from a seeded RNG; the same seed yields the same sequence.
#[derive(Debug)]
pub struct SeededZones {
    rng: Mutex<StdRng>,
}

impl SeededZones {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ZoneSource for SeededZones {
    fn pick_index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(0..len.max(1))
    }
}

/// Always returns the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedZone(pub usize);

impl ZoneSource for FixedZone {
    fn pick_index(&self, _len: usize) -> usize {
        self.0
    }
}

/// Pick one zone from `zones` with `source`.
///
/// An empty list or an index past the end is reported as a violation.
pub fn pick_zone<'z>(source: &dyn ZoneSource, zones: &'z [String]) -> Result<&'z str, Violation> {
    if zones.is_empty() {
        return Err(Violation::NoAvailabilityZones);
    }
    let index = source.pick_index(zones.len());
    zones
        .get(index)
        .map(String::as_str)
        .ok_or(Violation::ZoneIndexOutOfRange {
            index,
            len: zones.len(),
        })
}
