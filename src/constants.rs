//! Contract constants for the annotation engine.
//!
//! These values are part of the platform contract, not configuration:
//! the server enforces the same group and pin ceilings, and the gesture
//! thresholds define user-visible behavior that tests pin down exactly.

use std::time::Duration;

/// Maximum number of pins per pin group, shared across all plans of an
/// order (the pool belongs to the group index, not to a single plan).
pub const MAX_PINS_PER_GROUP: usize = 6;

/// Maximum number of pin groups per plan, regardless of purchases.
pub const MAX_PIN_GROUPS: usize = 6;

/// Gesture disambiguation thresholds.
pub mod gesture {
    use super::Duration;

    /// Euclidean pointer travel (in screen pixels) below which a press is
    /// still a click; at or above it the gesture becomes a drag.
    pub const DRAG_THRESHOLD_PX: f32 = 18.0;

    /// Two presses on the same pin within this window form a double-click.
    pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
}

/// Zoom behavior of the plan viewport.
pub mod zoom {
    /// Upper zoom bound. The lower bound is the computed fit scale.
    pub const MAX: f32 = 3.0;

    /// Zoom change applied per wheel/pinch event.
    pub const STEP: f32 = 0.1;
}

/// Hit-testing dimensions.
pub mod hit {
    /// Screen-space radius around a pin marker that counts as pressing it.
    /// Pin markers render at constant screen size, so this does not scale
    /// with zoom.
    pub const PIN_RADIUS_PX: f32 = 14.0;
}
