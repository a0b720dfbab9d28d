//! Core data model: plans, pins, and pin groups.
//!
//! Coordinates are stored as percentages of the plan image's width and
//! height, so pins stay anchored no matter how the image is zoomed,
//! panned, or re-rendered at a different resolution.

use serde::{Deserialize, Serialize};

/// Identifier of an uploaded plan drawing.
///
/// Plans are owned by the order-management collaborator; this subsystem
/// only references them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An uploaded plan drawing. Immutable from this subsystem's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Identifier assigned by the order-management collaborator.
    pub id: PlanId,
    /// Display name shown in the plan switcher.
    #[serde(default)]
    pub name: String,
    /// Reference to the uploaded image/document.
    #[serde(default)]
    pub file_url: String,
}

impl Plan {
    pub fn new(id: impl Into<PlanId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_url: String::new(),
        }
    }
}

/// A single annotation pin on a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Identifier unique within one store generation. NOT guaranteed
    /// globally unique after a session restore; always address pins
    /// together with their `(plan, group)` pair.
    pub id: u64,
    /// Horizontal position as a percentage of image width, in `[0, 100]`.
    pub x: f32,
    /// Vertical position as a percentage of image height, in `[0, 100]`.
    pub y: f32,
    /// Hex color drawn from the group's palette slice.
    pub color: String,
    /// Free-text change request. May be empty while being authored;
    /// submission requires it to be non-empty.
    #[serde(default)]
    pub note: String,
    /// UI-only affordance guarding accidental drags. Deliberately not
    /// persisted: a restored or reloaded session comes back unlocked.
    #[serde(skip)]
    pub locked: bool,
}

impl Pin {
    /// Create a pin at the given percentage position, clamped to `[0, 100]`.
    pub fn new(id: u64, x: f32, y: f32, color: impl Into<String>) -> Self {
        Self {
            id,
            x: clamp_percent(x),
            y: clamp_percent(y),
            color: color.into(),
            note: String::new(),
            locked: false,
        }
    }

    /// Whether the pin carries a non-empty trimmed note.
    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }
}

/// Clamp a coordinate to the percentage range `[0, 100]`.
pub fn clamp_percent(v: f32) -> f32 {
    v.clamp(0.0, 100.0)
}

/// An ordered bundle of pins belonging to one plan. Its identifier is its
/// ordinal index in the plan's group list.
///
/// Serializes as a bare pin array — the session blob stores groups as
/// nested lists, not objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinGroup {
    pub pins: Vec<Pin>,
}

impl PinGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Find a pin by id within this group.
    pub fn get(&self, pin_id: u64) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == pin_id)
    }

    pub fn get_mut(&mut self, pin_id: u64) -> Option<&mut Pin> {
        self.pins.iter_mut().find(|p| p.id == pin_id)
    }
}

/// Full address of a pin: the `(plan, group)` pair plus the pin id.
///
/// Pin ids alone can collide across groups and plans after a session
/// restore, so every mutation carries the whole triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub plan: PlanId,
    pub group: usize,
    pub pin: u64,
}

impl PinRef {
    pub fn new(plan: impl Into<PlanId>, group: usize, pin: u64) -> Self {
        Self {
            plan: plan.into(),
            group,
            pin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_position_clamped() {
        let pin = Pin::new(1, -5.0, 140.0, "#e6194b");
        assert_eq!(pin.x, 0.0);
        assert_eq!(pin.y, 100.0);
    }

    #[test]
    fn test_pin_note_detection() {
        let mut pin = Pin::new(1, 10.0, 10.0, "#e6194b");
        assert!(!pin.has_note());
        pin.note = "   ".to_string();
        assert!(!pin.has_note());
        pin.note = "move this wall".to_string();
        assert!(pin.has_note());
    }

    #[test]
    fn test_locked_flag_not_serialized() {
        let mut pin = Pin::new(3, 50.0, 50.0, "#4363d8");
        pin.locked = true;

        let json = serde_json::to_string(&pin).unwrap();
        assert!(!json.contains("locked"));

        let back: Pin = serde_json::from_str(&json).unwrap();
        assert!(!back.locked);
        assert_eq!(back.id, 3);
    }

    #[test]
    fn test_group_serializes_as_array() {
        let group = PinGroup {
            pins: vec![Pin::new(1, 10.0, 20.0, "#e6194b")],
        };
        let json = serde_json::to_string(&group).unwrap();
        assert!(json.starts_with('['));
    }

    #[test]
    fn test_plan_wire_shape() {
        let json = r#"{"id":"plan-1","name":"Ground floor","fileUrl":"https://cdn/x.pdf"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.id.as_str(), "plan-1");
        assert_eq!(plan.file_url, "https://cdn/x.pdf");
    }
}
