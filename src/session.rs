//! Session handoff: parking annotation state across the purchase flow.
//!
//! Buying another pin pack navigates away from the annotation screen, so
//! the whole store plus the active group and plan is serialized into
//! ephemeral client-local storage (keyed per order) before leaving and
//! restored on return. Two historical blob shapes must be accepted: the
//! current multi-group shape and a legacy shape from before pin groups
//! existed, which stored one flat pin list per plan. The blob is consumed
//! exactly once — deleted right after a successful restore — so stale
//! state can never resurrect on a later unrelated visit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Pin, PinGroup, Plan, PlanId};
use crate::store::PinGroupStore;

/// Errors from handoff serialization or the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The blob could not be encoded or decoded.
    #[error("handoff blob error: {0}")]
    Blob(#[from] serde_json::Error),

    /// The storage backend failed.
    #[error("handoff storage error: {0}")]
    Storage(String),

    /// I/O failure of the file-backed storage.
    #[error("handoff I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage key for one order's handoff blob.
pub fn handoff_key(order_id: &str) -> String {
    format!("plat-handoff-{order_id}")
}

// ============================================================================
// Blob shapes
// ============================================================================

/// The current blob shape: groups nested per plan.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentBlob {
    pins_by_plan: HashMap<PlanId, Vec<PinGroup>>,
    #[serde(default)]
    active_group_index: usize,
    #[serde(default)]
    plan_id: Option<PlanId>,
}

/// The legacy single-group shape: one flat pin list per plan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBlob {
    pin_groups: HashMap<PlanId, Vec<Pin>>,
    #[serde(default)]
    active_group_index: usize,
    #[serde(default)]
    plan_id: Option<PlanId>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredBlob {
    Current(CurrentBlob),
    Legacy(LegacyBlob),
}

/// A restored session, migrated to the live plan set and group count.
#[derive(Debug)]
pub struct RestoredSession {
    pub pins_by_plan: HashMap<PlanId, Vec<PinGroup>>,
    pub active_group_index: usize,
    pub active_plan: Option<PlanId>,
}

// ============================================================================
// Serialize / restore
// ============================================================================

/// Serialize the store plus the active cursor into a handoff blob.
pub fn serialize(
    store: &PinGroupStore,
    active_group_index: usize,
    active_plan: Option<&PlanId>,
) -> Result<String, SessionError> {
    let blob = CurrentBlob {
        pins_by_plan: store.table().clone(),
        active_group_index,
        plan_id: active_plan.cloned(),
    };
    Ok(serde_json::to_string(&blob)?)
}

/// Parse a handoff blob (either historical shape) and migrate it onto the
/// live plan set and group count.
///
/// - Legacy plans are wrapped as group 0 and padded with empty groups.
/// - Current-shape plans are padded or truncated to `groups_count`.
/// - Plans present in `current_plans` but absent from the blob get all
///   empty groups; plans in the blob that no longer exist are dropped.
pub fn deserialize(
    json: &str,
    current_plans: &[Plan],
    groups_count: usize,
) -> Result<RestoredSession, SessionError> {
    let blob: StoredBlob = serde_json::from_str(json)?;

    let (mut table, active_group_index, plan_id) = match blob {
        StoredBlob::Current(current) => {
            let table: HashMap<PlanId, Vec<PinGroup>> = current
                .pins_by_plan
                .into_iter()
                .map(|(plan, mut groups)| {
                    groups.resize_with(groups_count, PinGroup::new);
                    (plan, groups)
                })
                .collect();
            (table, current.active_group_index, current.plan_id)
        }
        StoredBlob::Legacy(legacy) => {
            log::info!("Migrating legacy single-group handoff blob");
            let table: HashMap<PlanId, Vec<PinGroup>> = legacy
                .pin_groups
                .into_iter()
                .map(|(plan, pins)| {
                    let mut groups = vec![PinGroup { pins }];
                    groups.resize_with(groups_count, PinGroup::new);
                    (plan, groups)
                })
                .collect();
            (table, legacy.active_group_index, legacy.plan_id)
        }
    };

    // Drop plans that no longer exist, extend ones the blob never saw.
    let stale: Vec<PlanId> = table
        .keys()
        .filter(|plan| !current_plans.iter().any(|p| p.id == **plan))
        .cloned()
        .collect();
    for plan in &stale {
        log::warn!("Dropping handoff state for unknown plan {}", plan);
        table.remove(plan);
    }
    for plan in current_plans {
        table
            .entry(plan.id.clone())
            .or_insert_with(|| vec![PinGroup::new(); groups_count]);
    }

    let active_plan = plan_id.filter(|id| current_plans.iter().any(|p| p.id == *id));
    let active_group_index = active_group_index.min(groups_count.saturating_sub(1));

    Ok(RestoredSession {
        pins_by_plan: table,
        active_group_index,
        active_plan,
    })
}

// ============================================================================
// Storage backends
// ============================================================================

/// Ephemeral client-local storage for handoff blobs. The host picks the
/// backend: in-memory for tests, a file under the platform cache dir on
/// native, localStorage behind this trait on a web host.
pub trait HandoffStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn save(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: std::sync::Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandoffStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// File-backed storage under the platform cache directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    /// Storage under the platform cache dir, or `None` when no cache
    /// directory can be determined.
    pub fn new() -> Option<Self> {
        dirs::cache_dir().map(|dir| Self {
            dir: dir.join("plat"),
        })
    }

    /// Storage rooted at an explicit directory.
    pub fn with_dir(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl HandoffStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// Flow-boundary helpers
// ============================================================================

/// Park the session before navigating into the purchase flow.
pub fn save_handoff<S: HandoffStorage>(
    storage: &S,
    order_id: &str,
    store: &PinGroupStore,
    active_group_index: usize,
    active_plan: Option<&PlanId>,
) -> Result<(), SessionError> {
    let blob = serialize(store, active_group_index, active_plan)?;
    storage.save(&handoff_key(order_id), &blob)?;
    log::info!("Handoff saved for order {}", order_id);
    Ok(())
}

/// Restore (and consume) a parked session, if one exists. The blob is
/// deleted only after a successful restore.
pub fn take_handoff<S: HandoffStorage>(
    storage: &S,
    order_id: &str,
    current_plans: &[Plan],
    groups_count: usize,
) -> Result<Option<RestoredSession>, SessionError> {
    let key = handoff_key(order_id);
    let Some(blob) = storage.load(&key)? else {
        return Ok(None);
    };
    let restored = deserialize(&blob, current_plans, groups_count)?;
    storage.remove(&key)?;
    log::info!("Handoff restored for order {}", order_id);
    Ok(Some(restored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::groups_for_purchases;

    fn plans(ids: &[&str]) -> Vec<Plan> {
        ids.iter().map(|id| Plan::new(*id, "")).collect()
    }

    fn store_with_pins() -> PinGroupStore {
        let mut store = PinGroupStore::new(1);
        let r = store.add_pin(&PlanId::new("a"), 0, 25.0, 75.0).unwrap();
        store.set_note(&r, "note").unwrap();
        store.add_pin(&PlanId::new("a"), 1, 10.0, 10.0).unwrap();
        store
    }

    #[test]
    fn test_round_trip_current_shape() {
        let store = store_with_pins();
        let blob = serialize(&store, 1, Some(&PlanId::new("a"))).unwrap();

        let restored = deserialize(&blob, &plans(&["a"]), 2).unwrap();
        assert_eq!(restored.active_group_index, 1);
        assert_eq!(restored.active_plan, Some(PlanId::new("a")));

        let groups = &restored.pins_by_plan[&PlanId::new("a")];
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].pins[0].note, "note");
        assert_eq!(groups[1].pins.len(), 1);
    }

    #[test]
    fn test_legacy_blob_migrates_to_group_zero() {
        // Legacy shape: flat pin list per plan, no group nesting
        let blob = r##"{
            "pinGroups": {
                "a": [{"id": 1, "x": 30.0, "y": 40.0, "color": "#e6194b", "note": "old pin"}]
            },
            "activeGroupIndex": 0,
            "planId": "a"
        }"##;

        let restored = deserialize(blob, &plans(&["a", "b"]), 3).unwrap();

        let a = &restored.pins_by_plan[&PlanId::new("a")];
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].pins.len(), 1);
        assert_eq!(a[0].pins[0].note, "old pin");
        assert!(a[1].is_empty() && a[2].is_empty());

        // Plan b was absent from the blob: all groups empty
        let b = &restored.pins_by_plan[&PlanId::new("b")];
        assert_eq!(b.len(), 3);
        assert!(b.iter().all(PinGroup::is_empty));
    }

    #[test]
    fn test_current_blob_truncated_to_groups_count() {
        let store = store_with_pins(); // two groups
        let blob = serialize(&store, 0, None).unwrap();

        let restored = deserialize(&blob, &plans(&["a"]), 1).unwrap();
        assert_eq!(restored.pins_by_plan[&PlanId::new("a")].len(), 1);
    }

    #[test]
    fn test_stale_plans_dropped_and_cursor_cleared() {
        let store = store_with_pins();
        let blob = serialize(&store, 0, Some(&PlanId::new("a"))).unwrap();

        // Plan "a" no longer exists in the live plan set
        let restored = deserialize(&blob, &plans(&["z"]), 2).unwrap();
        assert!(!restored.pins_by_plan.contains_key(&PlanId::new("a")));
        assert!(restored.pins_by_plan.contains_key(&PlanId::new("z")));
        assert_eq!(restored.active_plan, None);
    }

    #[test]
    fn test_active_group_clamped() {
        let store = store_with_pins();
        let blob = serialize(&store, 5, None).unwrap();
        let restored = deserialize(&blob, &plans(&["a"]), 2).unwrap();
        assert_eq!(restored.active_group_index, 1);
    }

    #[test]
    fn test_handoff_consumed_exactly_once() {
        let storage = MemoryStorage::new();
        let store = store_with_pins();
        save_handoff(&storage, "order-7", &store, 0, None).unwrap();

        let first = take_handoff(&storage, "order-7", &plans(&["a"]), 2).unwrap();
        assert!(first.is_some());

        let second = take_handoff(&storage, "order-7", &plans(&["a"]), 2).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_handoff_keys_are_per_order() {
        let storage = MemoryStorage::new();
        let store = store_with_pins();
        save_handoff(&storage, "order-1", &store, 0, None).unwrap();

        let other = take_handoff(&storage, "order-2", &plans(&["a"]), 2).unwrap();
        assert!(other.is_none());
        assert!(take_handoff(&storage, "order-1", &plans(&["a"]), 2)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_restored_table_feeds_store() {
        let storage = MemoryStorage::new();
        let store = store_with_pins();
        save_handoff(&storage, "order-1", &store, 0, None).unwrap();

        let restored = take_handoff(&storage, "order-1", &plans(&["a"]), 2)
            .unwrap()
            .unwrap();
        let rebuilt = PinGroupStore::from_table(restored.pins_by_plan, 1);
        assert_eq!(rebuilt.total_pins(), 2);
        assert_eq!(rebuilt.pin_groups_count(), groups_for_purchases(1));
    }
}
