//! Pin group store: the single source of truth for all annotation state.
//!
//! State is keyed by `(plan, group index)`. Every plan holds exactly
//! `pin_groups_count` groups, materialized lazily on first access because
//! the count can grow mid-session when a pin pack is purchased. Capacity
//! and the color pool are *cross-plan* resources of a group index: the
//! 6-pin ceiling and the 6-color slice are shared by every plan of the
//! order, so all checks recompute over the whole table, never over a
//! cached per-plan view.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::constants::{MAX_PIN_GROUPS, MAX_PINS_PER_GROUP};
use crate::model::{clamp_percent, Pin, PinGroup, PinRef, PlanId};
use crate::palette;

/// Refusals surfaced to the user as transient notices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The cross-plan pin pool of this group index is exhausted.
    #[error("pin group {group} is full ({max} pins across all plans)", max = MAX_PINS_PER_GROUP)]
    GroupFull {
        /// The full group index
        group: usize,
    },

    /// The group index is not unlocked (or past the hard ceiling).
    #[error("pin group {group} does not exist (have {count})")]
    GroupOutOfRange {
        /// The requested group index
        group: usize,
        /// Number of unlocked groups
        count: usize,
    },

    /// The color is already held by another pin in this group index.
    #[error("color {color} is already used in group {group}")]
    ColorInUse {
        /// The rejected hex color
        color: String,
        /// The group index holding it
        group: usize,
    },

    /// The color is not part of the group's palette slice.
    #[error("color {color} is not in the palette of group {group}")]
    ColorNotInPalette { color: String, group: usize },

    /// No pin at the given `(plan, group, id)` address.
    #[error("no pin {pin} in group {group} of plan {plan}")]
    PinNotFound {
        plan: PlanId,
        group: usize,
        pin: u64,
    },
}

impl StoreError {
    fn pin_not_found(r: &PinRef) -> Self {
        Self::PinNotFound {
            plan: r.plan.clone(),
            group: r.group,
            pin: r.pin,
        }
    }
}

/// The per-plan group table plus the id counter.
#[derive(Debug, Clone, Default)]
pub struct PinGroupStore {
    table: HashMap<PlanId, Vec<PinGroup>>,
    pin_groups_count: usize,
    next_pin_id: u64,
}

impl PinGroupStore {
    /// Create an empty store unlocked for `1 + purchased_packs` groups,
    /// capped at [`MAX_PIN_GROUPS`].
    pub fn new(purchased_packs: usize) -> Self {
        Self {
            table: HashMap::new(),
            pin_groups_count: groups_for_purchases(purchased_packs),
            next_pin_id: 1,
        }
    }

    /// Rebuild a store from a restored table (see the session module).
    /// The id counter resumes past the highest restored id so new pins
    /// never collide with restored ones.
    pub fn from_table(table: HashMap<PlanId, Vec<PinGroup>>, purchased_packs: usize) -> Self {
        let max_id = table
            .values()
            .flatten()
            .flat_map(|g| &g.pins)
            .map(|p| p.id)
            .max()
            .unwrap_or(0);
        let mut store = Self {
            table,
            pin_groups_count: groups_for_purchases(purchased_packs),
            next_pin_id: max_id + 1,
        };
        store.normalize();
        store
    }

    /// Number of unlocked groups per plan.
    pub fn pin_groups_count(&self) -> usize {
        self.pin_groups_count
    }

    /// Apply a new purchase count. Growth appends empty groups to every
    /// materialized plan; existing groups are never truncated or
    /// reordered, so a stale (smaller) count is ignored.
    pub fn set_purchased_packs(&mut self, purchased_packs: usize) {
        let count = groups_for_purchases(purchased_packs);
        if count < self.pin_groups_count {
            log::warn!(
                "Ignoring group count decrease {} -> {}",
                self.pin_groups_count,
                count
            );
            return;
        }
        if count != self.pin_groups_count {
            log::info!("Pin groups unlocked: {} -> {}", self.pin_groups_count, count);
        }
        self.pin_groups_count = count;
        self.normalize();
    }

    /// Pad every materialized plan up to the current group count.
    fn normalize(&mut self) {
        for groups in self.table.values_mut() {
            while groups.len() < self.pin_groups_count {
                groups.push(PinGroup::new());
            }
        }
    }

    /// The plan's groups, materializing `pin_groups_count` empty groups on
    /// first access.
    pub fn groups_for_plan(&mut self, plan: &PlanId) -> &[PinGroup] {
        self.groups_for_plan_mut(plan)
    }

    fn groups_for_plan_mut(&mut self, plan: &PlanId) -> &mut Vec<PinGroup> {
        let count = self.pin_groups_count;
        self.table
            .entry(plan.clone())
            .or_insert_with(|| vec![PinGroup::new(); count])
    }

    /// Read-only view of a plan's groups, if materialized.
    pub fn plan_groups(&self, plan: &PlanId) -> Option<&[PinGroup]> {
        self.table.get(plan).map(Vec::as_slice)
    }

    /// Total pins in a group index summed across every plan.
    pub fn group_pin_count(&self, group: usize) -> usize {
        self.table
            .values()
            .filter_map(|groups| groups.get(group))
            .map(PinGroup::len)
            .sum()
    }

    /// Colors held by any pin of this group index on any plan. Recomputed
    /// from the full table on every call, never cached.
    pub fn colors_in_use(&self, group: usize) -> HashSet<String> {
        self.table
            .values()
            .filter_map(|groups| groups.get(group))
            .flat_map(|g| &g.pins)
            .map(|p| p.color.clone())
            .collect()
    }

    /// Total pins across every plan and group.
    pub fn total_pins(&self) -> usize {
        self.table.values().flatten().map(PinGroup::len).sum()
    }

    /// Iterate every pin with its full address.
    pub fn iter_pins(&self) -> impl Iterator<Item = (PinRef, &Pin)> {
        self.table.iter().flat_map(|(plan, groups)| {
            groups.iter().enumerate().flat_map(move |(gi, group)| {
                group
                    .pins
                    .iter()
                    .map(move |pin| (PinRef::new(plan.clone(), gi, pin.id), pin))
            })
        })
    }

    /// Whether every pin in the store carries a non-empty trimmed note.
    pub fn all_pins_have_notes(&self) -> bool {
        self.iter_pins().all(|(_, pin)| pin.has_note())
    }

    /// Create a pin at the given percentage position. The color comes
    /// from the group's palette slice via the allocator; creation is
    /// refused when the cross-plan pool of the group index is full.
    pub fn add_pin(
        &mut self,
        plan: &PlanId,
        group: usize,
        x: f32,
        y: f32,
    ) -> Result<PinRef, StoreError> {
        self.check_group(group)?;
        if self.group_pin_count(group) >= MAX_PINS_PER_GROUP {
            return Err(StoreError::GroupFull { group });
        }

        let color = palette::next_available(group, &self.colors_in_use(group));
        let id = self.next_pin_id;
        self.next_pin_id += 1;

        let pin = Pin::new(id, x, y, color);
        log::debug!(
            "Pin {} added to {}/{} at ({:.1}%, {:.1}%) color {}",
            id,
            plan,
            group,
            pin.x,
            pin.y,
            color
        );
        self.groups_for_plan_mut(plan)[group].pins.push(pin);
        Ok(PinRef::new(plan.clone(), group, id))
    }

    /// Reposition a pin (percent coordinates, clamped).
    pub fn move_pin(&mut self, r: &PinRef, x: f32, y: f32) -> Result<(), StoreError> {
        let pin = self.pin_mut(r)?;
        pin.x = clamp_percent(x);
        pin.y = clamp_percent(y);
        Ok(())
    }

    /// Recolor a pin. Refused when the color belongs to a different pin
    /// of the same group index on any plan, or is outside the group's
    /// slice; re-selecting the pin's own color is always allowed.
    pub fn recolor(&mut self, r: &PinRef, color: &str) -> Result<(), StoreError> {
        self.check_group(r.group)?;
        if !palette::group_palette(r.group).iter().any(|c| c.hex == color) {
            return Err(StoreError::ColorNotInPalette {
                color: color.to_string(),
                group: r.group,
            });
        }

        let current = self.pin(r)?.color.clone();
        if current == color {
            return Ok(());
        }
        if self.colors_in_use(r.group).contains(color) {
            return Err(StoreError::ColorInUse {
                color: color.to_string(),
                group: r.group,
            });
        }

        self.pin_mut(r)?.color = color.to_string();
        log::debug!("Pin {} in {}/{} recolored to {}", r.pin, r.plan, r.group, color);
        Ok(())
    }

    /// Replace a pin's note text.
    pub fn set_note(&mut self, r: &PinRef, note: impl Into<String>) -> Result<(), StoreError> {
        self.pin_mut(r)?.note = note.into();
        Ok(())
    }

    /// Toggle the UI-only locked flag, returning the new state.
    pub fn toggle_lock(&mut self, r: &PinRef) -> Result<bool, StoreError> {
        let pin = self.pin_mut(r)?;
        pin.locked = !pin.locked;
        let locked = pin.locked;
        log::debug!("Pin {} in {}/{} locked = {}", r.pin, r.plan, r.group, locked);
        Ok(locked)
    }

    /// Delete a pin, releasing its color back to the group's pool.
    pub fn remove_pin(&mut self, r: &PinRef) -> Result<Pin, StoreError> {
        let group = self
            .table
            .get_mut(&r.plan)
            .and_then(|groups| groups.get_mut(r.group))
            .ok_or_else(|| StoreError::pin_not_found(r))?;
        let idx = group
            .pins
            .iter()
            .position(|p| p.id == r.pin)
            .ok_or_else(|| StoreError::pin_not_found(r))?;
        let pin = group.pins.remove(idx);
        log::debug!("Pin {} removed from {}/{}", r.pin, r.plan, r.group);
        Ok(pin)
    }

    /// Look up a pin by its full address.
    pub fn pin(&self, r: &PinRef) -> Result<&Pin, StoreError> {
        self.table
            .get(&r.plan)
            .and_then(|groups| groups.get(r.group))
            .and_then(|g| g.get(r.pin))
            .ok_or_else(|| StoreError::pin_not_found(r))
    }

    fn pin_mut(&mut self, r: &PinRef) -> Result<&mut Pin, StoreError> {
        self.table
            .get_mut(&r.plan)
            .and_then(|groups| groups.get_mut(r.group))
            .and_then(|g| g.get_mut(r.pin))
            .ok_or_else(|| StoreError::pin_not_found(r))
    }

    fn check_group(&self, group: usize) -> Result<(), StoreError> {
        if group >= self.pin_groups_count {
            return Err(StoreError::GroupOutOfRange {
                group,
                count: self.pin_groups_count,
            });
        }
        Ok(())
    }

    /// The raw table, for serialization at flow boundaries.
    pub fn table(&self) -> &HashMap<PlanId, Vec<PinGroup>> {
        &self.table
    }
}

/// Unlocked group count for a purchase count: one base group plus one per
/// purchased pack, capped at the hard ceiling.
pub fn groups_for_purchases(purchased_packs: usize) -> usize {
    (1 + purchased_packs).min(MAX_PIN_GROUPS)
}
