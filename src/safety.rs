//! Safety ceiling for power-valued tool arguments.
//!
//! The ceiling is a saturating cap: it lowers a requested level to the
//! configured maximum and leaves it untouched otherwise. Range checking
//! (1..=100) happens in the mapper before a value ever reaches [`clamp_power`].

/// Cap `requested` at `ceiling` when one is configured.
pub fn clamp_power(requested: u8, ceiling: Option<u8>) -> u8 {
    match ceiling {
        Some(max) => requested.min(max),
        None => requested,
    }
}

/// A power level after the safety ceiling has been applied.
///
/// Keeps the caller's original request so responses can report when the
/// ceiling kicked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerLevel {
    pub requested: u8,
    pub effective: u8,
}

impl PowerLevel {
    pub fn new(requested: u8, ceiling: Option<u8>) -> Self {
        Self {
            requested,
            effective: clamp_power(requested, ceiling),
        }
    }

    /// True when the ceiling lowered the requested level.
    pub fn was_limited(&self) -> bool {
        self.effective < self.requested
    }
}
