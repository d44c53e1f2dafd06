//! Identifier newtypes and field positions.
//!
//! ## InstanceId
//!
//! Every physical card copy gets a unique `InstanceId` at deck construction.
//! Instances are never created or destroyed afterwards, only relocated
//! between hand, deck, discard, and field (the conservation law the test
//! suite checks).
//!
//! ## TemplateId
//!
//! Identifies a card printing in the repository. A field card's template
//! changes when it evolves; its instance ids do not.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Number of bench slots per player (slots 1..=3).
pub const BENCH_SLOTS: u8 = 3;

/// Number of field slots per player (active + bench).
pub const FIELD_SLOTS: usize = 1 + BENCH_SLOTS as usize;

/// Unique identifier for a physical card copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// Create a new instance ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance({})", self.0)
    }
}

/// Unique identifier for a card printing.
///
/// Two printings may share a creature name; evolution conditions match by
/// name, not template, so reprints are interchangeable evolution bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

impl TemplateId {
    /// Create a new template ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Template({})", self.0)
    }
}

/// A field position: slot 0 is the active creature, 1..=3 the bench.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPos {
    /// Owner of the position.
    pub player: PlayerId,
    /// Slot index: 0 = active, 1..=3 = bench.
    pub slot: u8,
}

impl FieldPos {
    /// Create a new field position. Panics if the slot is out of range.
    #[must_use]
    pub const fn new(player: PlayerId, slot: u8) -> Self {
        assert!(slot < FIELD_SLOTS as u8, "field slot out of range");
        Self { player, slot }
    }

    /// The active position for a player.
    #[must_use]
    pub const fn active(player: PlayerId) -> Self {
        Self { player, slot: 0 }
    }

    /// A bench position (1-based bench index).
    #[must_use]
    pub const fn bench(player: PlayerId, bench_index: u8) -> Self {
        assert!(bench_index >= 1 && bench_index <= BENCH_SLOTS, "bench index out of range");
        Self { player, slot: bench_index }
    }

    /// Is this the active slot?
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.slot == 0
    }

    /// Iterate all positions for a player, active first.
    pub fn all_for(player: PlayerId) -> impl Iterator<Item = FieldPos> {
        (0..FIELD_SLOTS as u8).map(move |slot| FieldPos { player, slot })
    }
}

impl std::fmt::Display for FieldPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_active() {
            write!(f, "{} active", self.player)
        } else {
            write!(f, "{} bench {}", self.player, self.slot)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(InstanceId::new(5).raw(), 5);
        assert_eq!(TemplateId::new(9).raw(), 9);
        assert_eq!(format!("{}", InstanceId(3)), "Instance(3)");
        assert_eq!(format!("{}", TemplateId(4)), "Template(4)");
    }

    #[test]
    fn test_field_pos() {
        let p0 = PlayerId::new(0);
        assert!(FieldPos::active(p0).is_active());
        assert!(!FieldPos::bench(p0, 2).is_active());

        let all: Vec<_> = FieldPos::all_for(p0).collect();
        assert_eq!(all.len(), FIELD_SLOTS);
        assert_eq!(all[0], FieldPos::active(p0));
        assert_eq!(all[3], FieldPos::bench(p0, 3));
    }

    #[test]
    fn test_display() {
        let p1 = PlayerId::new(1);
        assert_eq!(format!("{}", FieldPos::active(p1)), "Player 1 active");
        assert_eq!(format!("{}", FieldPos::bench(p1, 2)), "Player 1 bench 2");
    }

    #[test]
    fn test_serialization() {
        let pos = FieldPos::bench(PlayerId::new(0), 1);
        let json = serde_json::to_string(&pos).unwrap();
        let back: FieldPos = serde_json::from_str(&json).unwrap();
        assert_eq!(pos, back);
    }
}
