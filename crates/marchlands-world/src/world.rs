//! The aggregate world state: map, lords, companions, wars, relations.
//!
//! Wars and relations are private and only mutable through symmetric
//! accessors, so both directions of every pair always agree.

use std::collections::{BTreeMap, BTreeSet};

use marchlands_types::{
    AiLord, Companion, CompanionId, FactionId, Location, LocationId, LordId,
};

use crate::error::WorldError;
use crate::templates;

/// Everything in the world that is not the player.
#[derive(Debug, Clone)]
pub struct WorldState {
    /// Current day, starting at 1.
    pub day: u64,
    /// All settlements keyed by id.
    pub locations: BTreeMap<LocationId, Location>,
    /// All lords keyed by id.
    pub lords: BTreeMap<LordId, AiLord>,
    /// All companions keyed by id, recruited or not.
    pub companions: BTreeMap<CompanionId, Companion>,
    wars: BTreeMap<FactionId, BTreeSet<FactionId>>,
    relations: BTreeMap<FactionId, BTreeMap<FactionId, f64>>,
}

impl WorldState {
    /// Build the day-one world from the content templates.
    pub fn new() -> Self {
        Self {
            day: 1,
            locations: templates::starting_locations(),
            lords: templates::starting_lords(),
            companions: templates::starting_companions(),
            wars: templates::initial_wars(),
            relations: templates::initial_relations(),
        }
    }

    /// Reassemble a world from snapshot parts.
    ///
    /// Symmetry of the incoming wars and relations is not re-derived; the
    /// snapshot writer only ever captures state produced through the
    /// symmetric mutators below.
    pub const fn from_parts(
        day: u64,
        locations: BTreeMap<LocationId, Location>,
        lords: BTreeMap<LordId, AiLord>,
        companions: BTreeMap<CompanionId, Companion>,
        wars: BTreeMap<FactionId, BTreeSet<FactionId>>,
        relations: BTreeMap<FactionId, BTreeMap<FactionId, f64>>,
    ) -> Self {
        Self {
            day,
            locations,
            lords,
            companions,
            wars,
            relations,
        }
    }

    // -- lookups ------------------------------------------------------------

    /// A settlement by id.
    pub fn location(&self, id: &LocationId) -> Result<&Location, WorldError> {
        self.locations
            .get(id)
            .ok_or_else(|| WorldError::UnknownLocation { id: id.clone() })
    }

    /// A settlement by id, mutable.
    pub fn location_mut(&mut self, id: &LocationId) -> Result<&mut Location, WorldError> {
        self.locations
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownLocation { id: id.clone() })
    }

    /// A lord by id.
    pub fn lord(&self, id: &LordId) -> Result<&AiLord, WorldError> {
        self.lords
            .get(id)
            .ok_or_else(|| WorldError::UnknownLord { id: id.clone() })
    }

    /// A companion by id.
    pub fn companion(&self, id: &CompanionId) -> Result<&Companion, WorldError> {
        self.companions
            .get(id)
            .ok_or_else(|| WorldError::UnknownCompanion { id: id.clone() })
    }

    /// A companion by id, mutable.
    pub fn companion_mut(&mut self, id: &CompanionId) -> Result<&mut Companion, WorldError> {
        self.companions
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownCompanion { id: id.clone() })
    }

    /// Ids of settlements belonging to a faction.
    pub fn faction_locations(&self, faction: FactionId) -> Vec<LocationId> {
        self.locations
            .values()
            .filter(|l| l.faction_id == faction)
            .map(|l| l.id.clone())
            .collect()
    }

    /// How many undefeated lords currently stand at a settlement.
    pub fn lords_at(&self, location: &LocationId) -> u32 {
        let count = self
            .lords
            .values()
            .filter(|lord| !lord.is_defeated && &lord.current_location_id == location)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    // -- wars ---------------------------------------------------------------

    /// Whether two factions are at war. Neutral is never at war.
    pub fn at_war(&self, a: FactionId, b: FactionId) -> bool {
        self.wars.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Whether a faction is at war with anyone.
    pub fn is_at_war(&self, faction: FactionId) -> bool {
        self.wars.get(&faction).is_some_and(|set| !set.is_empty())
    }

    /// The factions a faction is at war with.
    pub fn enemies_of(&self, faction: FactionId) -> BTreeSet<FactionId> {
        self.wars.get(&faction).cloned().unwrap_or_default()
    }

    /// Open a war between two factions, both directions.
    pub fn declare_war(&mut self, a: FactionId, b: FactionId) {
        if a == b || a == FactionId::Neutral || b == FactionId::Neutral {
            return;
        }
        self.wars.entry(a).or_default().insert(b);
        self.wars.entry(b).or_default().insert(a);
    }

    /// End a war between two factions, both directions.
    pub fn make_peace(&mut self, a: FactionId, b: FactionId) {
        if let Some(set) = self.wars.get_mut(&a) {
            set.remove(&b);
        }
        if let Some(set) = self.wars.get_mut(&b) {
            set.remove(&a);
        }
    }

    /// Read access to the full war table (for snapshots).
    pub const fn wars(&self) -> &BTreeMap<FactionId, BTreeSet<FactionId>> {
        &self.wars
    }

    // -- relations ----------------------------------------------------------

    /// Standing between two factions; zero for unknown pairs.
    pub fn relation(&self, a: FactionId, b: FactionId) -> f64 {
        self.relations
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    /// Set the standing between two factions, both directions, clamped to
    /// [-100, 100].
    pub fn set_relation(&mut self, a: FactionId, b: FactionId, value: f64) {
        if a == b || a == FactionId::Neutral || b == FactionId::Neutral {
            return;
        }
        let clamped = value.clamp(-100.0, 100.0);
        self.relations.entry(a).or_default().insert(b, clamped);
        self.relations.entry(b).or_default().insert(a, clamped);
    }

    /// Shift the standing between two factions by a delta, both directions.
    pub fn shift_relation(&mut self, a: FactionId, b: FactionId, delta: f64) {
        let next = self.relation(a, b) + delta;
        self.set_relation(a, b, next);
    }

    /// Read access to the full relation table (for snapshots).
    pub const fn relations(&self) -> &BTreeMap<FactionId, BTreeMap<FactionId, f64>> {
        &self.relations
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;

    #[test]
    fn day_one_wars_match_the_seed() {
        let world = WorldState::new();
        assert!(world.at_war(FactionId::Velhart, FactionId::Norden));
        assert!(world.at_war(FactionId::Norden, FactionId::Velhart));
        assert!(!world.at_war(FactionId::Vostya, FactionId::Kherai));
    }

    #[test]
    fn declared_wars_are_symmetric() {
        let mut world = WorldState::new();
        world.declare_war(FactionId::Vostya, FactionId::Velhart);
        assert!(world.at_war(FactionId::Vostya, FactionId::Velhart));
        assert!(world.at_war(FactionId::Velhart, FactionId::Vostya));
        world.make_peace(FactionId::Velhart, FactionId::Vostya);
        assert!(!world.at_war(FactionId::Vostya, FactionId::Velhart));
        assert!(!world.at_war(FactionId::Velhart, FactionId::Vostya));
    }

    #[test]
    fn neutral_cannot_enter_wars() {
        let mut world = WorldState::new();
        world.declare_war(FactionId::Neutral, FactionId::Velhart);
        assert!(!world.at_war(FactionId::Neutral, FactionId::Velhart));
        assert!(!world.at_war(FactionId::Velhart, FactionId::Neutral));
    }

    #[test]
    fn relation_writes_hit_both_directions_and_clamp() {
        let mut world = WorldState::new();
        world.set_relation(FactionId::Velhart, FactionId::Kherai, -250.0);
        assert!((world.relation(FactionId::Velhart, FactionId::Kherai) - -100.0).abs() < 1e-9);
        assert!((world.relation(FactionId::Kherai, FactionId::Velhart) - -100.0).abs() < 1e-9);
        world.shift_relation(FactionId::Kherai, FactionId::Velhart, 30.0);
        assert!((world.relation(FactionId::Velhart, FactionId::Kherai) - -70.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_location_lookup_errors() {
        let world = WorldState::new();
        let missing = LocationId::from("atlantis");
        assert!(world.location(&missing).is_err());
    }

    #[test]
    fn lords_at_counts_only_standing_lords() {
        let mut world = WorldState::new();
        let westmere = LocationId::from("westmere");
        assert_eq!(world.lords_at(&westmere), 1);
        if let Some(lord) = world.lords.get_mut(&LordId::from("aldmar")) {
            lord.is_defeated = true;
        }
        assert_eq!(world.lords_at(&westmere), 0);
    }
}
