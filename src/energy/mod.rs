//! Energy bookkeeping.
//!
//! Attached energy is tracked per field instance per type; discarded
//! energy goes to a per-player ledger. Total energy (attached plus
//! discarded) only grows through per-turn generation, never otherwise -
//! the conservation property the test suite checks.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cards::EnergyType;
use crate::core::{InstanceId, PlayerId, PlayerMap};

/// Per-type energy counts.
///
/// Iteration always follows `EnergyType::ALL` order so any-type
/// consumption is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyCounts(FxHashMap<EnergyType, u32>);

impl EnergyCounts {
    /// Empty counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of one type.
    #[must_use]
    pub fn get(&self, ty: EnergyType) -> u32 {
        self.0.get(&ty).copied().unwrap_or(0)
    }

    /// Add `n` units of a type.
    pub fn add(&mut self, ty: EnergyType, n: u32) {
        if n > 0 {
            *self.0.entry(ty).or_insert(0) += n;
        }
    }

    /// Remove up to `n` units of a type; returns the amount removed.
    pub fn remove(&mut self, ty: EnergyType, n: u32) -> u32 {
        let Some(count) = self.0.get_mut(&ty) else {
            return 0;
        };
        let removed = n.min(*count);
        *count -= removed;
        if *count == 0 {
            self.0.remove(&ty);
        }
        removed
    }

    /// Total units across all types.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Non-zero counts in canonical type order.
    pub fn iter(&self) -> impl Iterator<Item = (EnergyType, u32)> + '_ {
        EnergyType::ALL
            .iter()
            .filter_map(|ty| match self.get(*ty) {
                0 => None,
                n => Some((*ty, n)),
            })
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Energy state for one game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyStore {
    /// Attached energy per field instance.
    attached: FxHashMap<InstanceId, EnergyCounts>,
    /// Per-player discarded-energy ledger.
    discarded: PlayerMap<EnergyCounts>,
    /// Energy made available by this turn's generation, if unclaimed.
    pub current_generation: PlayerMap<Option<EnergyType>>,
    /// Types each player's generation draws from (deck-derived).
    pub generation_palette: PlayerMap<Vec<EnergyType>>,
}

impl EnergyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attached counts for an instance.
    #[must_use]
    pub fn attached(&self, instance: InstanceId) -> EnergyCounts {
        self.attached.get(&instance).cloned().unwrap_or_default()
    }

    /// Total attached units for an instance.
    #[must_use]
    pub fn attached_total(&self, instance: InstanceId) -> u32 {
        self.attached.get(&instance).map_or(0, EnergyCounts::total)
    }

    /// Attached units of one type for an instance.
    #[must_use]
    pub fn attached_of(&self, instance: InstanceId, ty: EnergyType) -> u32 {
        self.attached.get(&instance).map_or(0, |c| c.get(ty))
    }

    /// Discarded-energy ledger for a player.
    #[must_use]
    pub fn discarded(&self, player: PlayerId) -> &EnergyCounts {
        &self.discarded[player]
    }

    /// Attach `n` units of a type to an instance.
    pub fn attach(&mut self, instance: InstanceId, ty: EnergyType, n: u32) {
        self.attached.entry(instance).or_default().add(ty, n);
    }

    /// Discard up to `n` units of a type from an instance into the
    /// owner's ledger; returns the amount actually removed.
    pub fn discard_from(
        &mut self,
        instance: InstanceId,
        owner: PlayerId,
        ty: EnergyType,
        n: u32,
    ) -> u32 {
        let removed = self
            .attached
            .get_mut(&instance)
            .map_or(0, |counts| counts.remove(ty, n));
        self.discarded[owner].add(ty, removed);
        removed
    }

    /// Move up to `n` units of a type between instances; returns the
    /// amount actually moved. Per-type granularity is preserved.
    pub fn transfer(
        &mut self,
        from: InstanceId,
        to: InstanceId,
        ty: EnergyType,
        n: u32,
    ) -> u32 {
        let moved = self
            .attached
            .get_mut(&from)
            .map_or(0, |counts| counts.remove(ty, n));
        if moved > 0 {
            self.attached.entry(to).or_default().add(ty, moved);
        }
        moved
    }

    /// Move all attached energy of an instance to the owner's ledger
    /// (knockout), preserving per-type counts.
    pub fn discard_all(&mut self, instance: InstanceId, owner: PlayerId) {
        if let Some(counts) = self.attached.remove(&instance) {
            for (ty, n) in counts.iter() {
                self.discarded[owner].add(ty, n);
            }
        }
    }

    /// Re-key attached energy after an evolution changed the position's
    /// representative instance.
    pub fn rekey(&mut self, old: InstanceId, new: InstanceId) {
        if let Some(counts) = self.attached.remove(&old) {
            if !counts.is_empty() {
                self.attached.insert(new, counts);
            }
        }
    }

    /// Attached plus discarded total of one type across the whole game.
    #[must_use]
    pub fn global_total(&self, ty: EnergyType) -> u32 {
        let attached: u32 = self.attached.values().map(|c| c.get(ty)).sum();
        let discarded: u32 = PlayerId::both().map(|p| self.discarded[p].get(ty)).sum();
        attached + discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRE: EnergyType = EnergyType::Fire;
    const WATER: EnergyType = EnergyType::Water;

    #[test]
    fn test_attach_and_totals() {
        let mut store = EnergyStore::new();
        let id = InstanceId(1);

        store.attach(id, FIRE, 2);
        store.attach(id, WATER, 1);

        assert_eq!(store.attached_total(id), 3);
        assert_eq!(store.attached_of(id, FIRE), 2);
    }

    #[test]
    fn test_discard_caps_at_present() {
        let mut store = EnergyStore::new();
        let id = InstanceId(1);
        let owner = PlayerId::new(0);
        store.attach(id, FIRE, 1);

        let removed = store.discard_from(id, owner, FIRE, 3);

        assert_eq!(removed, 1);
        assert_eq!(store.attached_of(id, FIRE), 0);
        assert_eq!(store.discarded(owner).get(FIRE), 1);
    }

    #[test]
    fn test_transfer_caps_at_available() {
        let mut store = EnergyStore::new();
        let (src, dst) = (InstanceId(1), InstanceId(2));
        store.attach(src, FIRE, 1);

        let moved = store.transfer(src, dst, FIRE, 2);

        assert_eq!(moved, 1);
        assert_eq!(store.attached_of(src, FIRE), 0);
        assert_eq!(store.attached_of(dst, FIRE), 1);
    }

    #[test]
    fn test_discard_all_preserves_types() {
        let mut store = EnergyStore::new();
        let id = InstanceId(1);
        let owner = PlayerId::new(1);
        store.attach(id, FIRE, 2);
        store.attach(id, WATER, 1);

        store.discard_all(id, owner);

        assert_eq!(store.attached_total(id), 0);
        assert_eq!(store.discarded(owner).get(FIRE), 2);
        assert_eq!(store.discarded(owner).get(WATER), 1);
    }

    #[test]
    fn test_rekey() {
        let mut store = EnergyStore::new();
        store.attach(InstanceId(1), FIRE, 2);

        store.rekey(InstanceId(1), InstanceId(2));

        assert_eq!(store.attached_total(InstanceId(1)), 0);
        assert_eq!(store.attached_of(InstanceId(2), FIRE), 2);
    }

    #[test]
    fn test_counts_iter_canonical_order() {
        let mut counts = EnergyCounts::new();
        counts.add(EnergyType::Metal, 1);
        counts.add(EnergyType::Grass, 1);
        counts.add(FIRE, 1);

        let types: Vec<_> = counts.iter().map(|(ty, _)| ty).collect();
        assert_eq!(types, vec![EnergyType::Grass, FIRE, EnergyType::Metal]);
    }
}
