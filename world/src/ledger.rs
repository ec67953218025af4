//! Authoritative structure placement and economy bookkeeping.

use std::{collections::BTreeMap, time::Duration};

use tile_defence_core::{
    EconomyError, StructureDefinition, StructureId, StructureKind, StructureSnapshot, TileCoord,
};

const BASE_LEVEL: u8 = 1;
const MAX_LEVEL: u8 = 2;

/// State of a structure stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct StructureState {
    pub(crate) id: StructureId,
    pub(crate) kind: StructureKind,
    pub(crate) coord: TileCoord,
    pub(crate) level: u8,
    pub(crate) range: f32,
    pub(crate) damage: f32,
    pub(crate) fire_rate: f32,
    pub(crate) projectile_speed: f32,
    pub(crate) original_cost: u32,
    pub(crate) cooldown: Duration,
}

impl StructureState {
    pub(crate) fn snapshot(&self) -> StructureSnapshot {
        StructureSnapshot {
            id: self.id,
            kind: self.kind,
            coord: self.coord,
            level: self.level,
            range: self.range,
            damage: self.damage,
            fire_rate: self.fire_rate,
            projectile_speed: self.projectile_speed,
            original_cost: self.original_cost,
        }
    }

    /// Time between two shots at the current fire rate.
    pub(crate) fn reload(&self) -> Duration {
        if self.fire_rate > 0.0 {
            tile_defence_core::seconds(1.0 / self.fire_rate)
        } else {
            Duration::MAX
        }
    }
}

/// Registry mapping tiles to structures and allocating structure identifiers.
///
/// Every operation either succeeds completely or leaves both the ledger and
/// the currency balance untouched.
#[derive(Debug)]
pub(crate) struct PlacementLedger {
    by_coord: BTreeMap<TileCoord, StructureId>,
    entries: BTreeMap<StructureId, StructureState>,
    next_structure_id: StructureId,
}

impl PlacementLedger {
    pub(crate) fn new() -> Self {
        Self {
            by_coord: BTreeMap::new(),
            entries: BTreeMap::new(),
            next_structure_id: StructureId::new(0),
        }
    }

    pub(crate) fn place(
        &mut self,
        coord: TileCoord,
        definition: &StructureDefinition,
        currency: &mut u32,
    ) -> Result<StructureId, EconomyError> {
        if self.by_coord.contains_key(&coord) {
            return Err(EconomyError::Occupied);
        }

        *currency = debit(*currency, definition.cost)?;

        let id = self.next_structure_id;
        self.next_structure_id = StructureId::new(id.get().saturating_add(1));
        let _ = self.by_coord.insert(coord, id);
        let _ = self.entries.insert(
            id,
            StructureState {
                id,
                kind: definition.kind,
                coord,
                level: BASE_LEVEL,
                range: definition.range,
                damage: definition.damage,
                fire_rate: definition.fire_rate,
                projectile_speed: definition.projectile_speed,
                original_cost: definition.cost,
                cooldown: Duration::ZERO,
            },
        );
        Ok(id)
    }

    pub(crate) fn upgrade(
        &mut self,
        id: StructureId,
        definition: &StructureDefinition,
        currency: &mut u32,
    ) -> Result<&StructureState, EconomyError> {
        let state = self.entries.get_mut(&id).ok_or(EconomyError::NotFound)?;
        if state.level >= MAX_LEVEL {
            return Err(EconomyError::AlreadyMaxLevel);
        }

        let upgrade = &definition.upgrade;
        *currency = debit(*currency, upgrade.cost)?;

        state.level += 1;
        state.range += upgrade.range_increase;
        state.damage += upgrade.damage_increase;
        state.fire_rate += upgrade.fire_rate_increase;
        Ok(state)
    }

    /// Removes the structure and credits half of its original cost, rounded down.
    pub(crate) fn sell(
        &mut self,
        id: StructureId,
        currency: &mut u32,
    ) -> Result<(TileCoord, u32), EconomyError> {
        let state = self.entries.remove(&id).ok_or(EconomyError::NotFound)?;
        let _ = self.by_coord.remove(&state.coord);
        let refund = state.original_cost / 2;
        *currency = currency.saturating_add(refund);
        Ok((state.coord, refund))
    }

    pub(crate) fn get(&self, id: StructureId) -> Option<&StructureState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: StructureId) -> Option<&mut StructureState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn at(&self, coord: TileCoord) -> Option<StructureId> {
        self.by_coord.get(&coord).copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &StructureState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut StructureState> {
        self.entries.values_mut()
    }
}

fn debit(currency: u32, cost: u32) -> Result<u32, EconomyError> {
    currency
        .checked_sub(cost)
        .ok_or(EconomyError::InsufficientFunds {
            required: cost,
            available: currency,
        })
}
