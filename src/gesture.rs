//! Gesture disambiguation for pointer interactions with pins.
//!
//! A pointer-down on a pin can end up as three different things: a click
//! (open the pin's inspector), a drag (reposition it), or a double-click
//! (toggle its locked flag). Without a distance *and* a time threshold,
//! every inspection click would also nudge the pin and every double-click
//! would register as two selections.
//!
//! The classification is an explicit finite-state machine with pure
//! transition methods. Transitions return [`GestureEffect`]s describing
//! what the caller should do to the store and the selection; the machine
//! itself touches nothing, which keeps the click/drag/double-click
//! contract independently testable. Timestamps are passed in rather than
//! sampled, for the same reason.

use web_time::Instant;

use crate::constants::gesture::{DOUBLE_CLICK_WINDOW, DRAG_THRESHOLD_PX};
use crate::model::PinRef;

/// One pointer interaction, from press to release.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    /// No pointer held down on a pin.
    Idle,
    /// Pointer down on a pin, travel still under the drag threshold.
    Pressed {
        pin: PinRef,
        /// Pointer position at press, in screen pixels.
        start: (f32, f32),
        /// Moves are consumed without repositioning (locked pin, or the
        /// press that completed a double-click).
        suppress_moves: bool,
        /// Whether this press opened the pin's inspector; governs whether
        /// release-after-drag clears the selection.
        opened_selection: bool,
    },
    /// The drag threshold was crossed; the interaction is a drag.
    Dragging {
        pin: PinRef,
        suppress_moves: bool,
        opened_selection: bool,
    },
}

/// What the caller should apply after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEffect {
    /// Mark the pin selected and open its inspector.
    Select(PinRef),
    /// Toggle the pin's locked flag (double-click).
    ToggleLock(PinRef),
    /// Reposition the pin to this pointer position, converted through the
    /// viewport transform by the caller.
    MoveTo { pin: PinRef, pointer: (f32, f32) },
    /// Clear the pin selection (release after a drag).
    ClearSelection,
}

/// The gesture state machine plus the double-click tracker.
#[derive(Debug, Clone, Default)]
pub struct GestureDisambiguator {
    state: GestureState,
    /// Most recent press, for double-click detection. Cleared the moment
    /// a double-click fires so a third rapid press starts a fresh cycle.
    last_press: Option<(PinRef, Instant)>,
}

impl Default for GestureState {
    fn default() -> Self {
        Self::Idle
    }
}

impl GestureDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Whether a press is currently being tracked.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    /// Pointer-down on a pin (pan mode off).
    ///
    /// A second press on the same pin within the double-click window
    /// yields [`GestureEffect::ToggleLock`] and suppresses selection;
    /// otherwise the pin is selected. `locked` is the pin's flag at press
    /// time and suppresses repositioning for the whole interaction.
    pub fn press(
        &mut self,
        pin: PinRef,
        pointer: (f32, f32),
        locked: bool,
        now: Instant,
    ) -> GestureEffect {
        let double = self
            .last_press
            .as_ref()
            .is_some_and(|(prev, at)| *prev == pin && now.duration_since(*at) <= DOUBLE_CLICK_WINDOW);

        if double {
            // Reset immediately: the next press starts a new cycle.
            self.last_press = None;
            self.state = GestureState::Pressed {
                pin: pin.clone(),
                start: pointer,
                suppress_moves: true,
                opened_selection: false,
            };
            log::debug!("Gesture: double-click on pin {}", pin.pin);
            GestureEffect::ToggleLock(pin)
        } else {
            self.last_press = Some((pin.clone(), now));
            self.state = GestureState::Pressed {
                pin: pin.clone(),
                start: pointer,
                suppress_moves: locked,
                opened_selection: true,
            };
            GestureEffect::Select(pin)
        }
    }

    /// Pointer movement while the pointer is down.
    ///
    /// Travel under the drag threshold is noise and produces nothing.
    /// The crossing move, and every move after it, repositions the pin —
    /// unless moves are suppressed, in which case the gesture is consumed
    /// silently.
    pub fn pointer_move(&mut self, pointer: (f32, f32)) -> Option<GestureEffect> {
        match &self.state {
            GestureState::Idle => None,
            GestureState::Pressed {
                pin,
                start,
                suppress_moves,
                opened_selection,
            } => {
                if distance(*start, pointer) < DRAG_THRESHOLD_PX {
                    return None;
                }
                let pin = pin.clone();
                let suppress_moves = *suppress_moves;
                let opened_selection = *opened_selection;
                self.state = GestureState::Dragging {
                    pin: pin.clone(),
                    suppress_moves,
                    opened_selection,
                };
                if suppress_moves {
                    None
                } else {
                    Some(GestureEffect::MoveTo { pin, pointer })
                }
            }
            GestureState::Dragging {
                pin, suppress_moves, ..
            } => {
                if *suppress_moves {
                    None
                } else {
                    Some(GestureEffect::MoveTo {
                        pin: pin.clone(),
                        pointer,
                    })
                }
            }
        }
    }

    /// Pointer-up. A true click leaves the pin selected so its inspector
    /// stays open; a release after the threshold was crossed clears the
    /// selection this press opened.
    pub fn release(&mut self) -> Option<GestureEffect> {
        match std::mem::take(&mut self.state) {
            GestureState::Dragging {
                opened_selection: true,
                ..
            } => Some(GestureEffect::ClearSelection),
            _ => None,
        }
    }

    /// Abort the current interaction (pointer left the surface, plan
    /// switched, etc.). The double-click tracker survives.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pin() -> PinRef {
        PinRef::new("plan-a", 0, 1)
    }

    #[test]
    fn test_click_selects_and_keeps_selection() {
        let mut g = GestureDisambiguator::new();
        let t = Instant::now();

        assert_eq!(g.press(pin(), (100.0, 100.0), false, t), GestureEffect::Select(pin()));
        // Sub-threshold jitter is noise
        assert_eq!(g.pointer_move((105.0, 110.0)), None);
        assert_eq!(g.pointer_move((92.0, 101.0)), None);
        // True click: selection stays
        assert_eq!(g.release(), None);
        assert_eq!(*g.state(), GestureState::Idle);
    }

    #[test]
    fn test_drag_moves_and_clears_selection() {
        let mut g = GestureDisambiguator::new();
        g.press(pin(), (100.0, 100.0), false, Instant::now());

        // 18px of travel crosses the threshold; the crossing move already
        // repositions
        assert_eq!(
            g.pointer_move((118.0, 100.0)),
            Some(GestureEffect::MoveTo {
                pin: pin(),
                pointer: (118.0, 100.0)
            })
        );
        assert_eq!(
            g.pointer_move((130.0, 90.0)),
            Some(GestureEffect::MoveTo {
                pin: pin(),
                pointer: (130.0, 90.0)
            })
        );
        assert_eq!(g.release(), Some(GestureEffect::ClearSelection));
    }

    #[test]
    fn test_threshold_is_euclidean() {
        let mut g = GestureDisambiguator::new();
        g.press(pin(), (0.0, 0.0), false, Instant::now());
        // 12² + 12² = 288 < 324 = 18²
        assert_eq!(g.pointer_move((12.0, 12.0)), None);
        // 13² + 13² = 338 >= 324
        assert!(g.pointer_move((13.0, 13.0)).is_some());
    }

    #[test]
    fn test_locked_pin_consumes_drag() {
        let mut g = GestureDisambiguator::new();
        g.press(pin(), (0.0, 0.0), true, Instant::now());

        assert_eq!(g.pointer_move((50.0, 50.0)), None);
        assert_eq!(g.pointer_move((80.0, 0.0)), None);
        assert!(matches!(g.state(), GestureState::Dragging { .. }));
        // Threshold was crossed, so release still clears the selection
        assert_eq!(g.release(), Some(GestureEffect::ClearSelection));
    }

    #[test]
    fn test_double_click_toggles_lock_once() {
        let mut g = GestureDisambiguator::new();
        let t = Instant::now();

        assert_eq!(g.press(pin(), (10.0, 10.0), false, t), GestureEffect::Select(pin()));
        assert_eq!(g.release(), None);

        let t2 = t + Duration::from_millis(200);
        assert_eq!(g.press(pin(), (10.0, 10.0), false, t2), GestureEffect::ToggleLock(pin()));
        // Movement after the double-click press never repositions
        assert_eq!(g.pointer_move((60.0, 60.0)), None);
        assert_eq!(g.release(), None);

        // Tracker was reset: a third rapid press is a fresh single click
        let t3 = t2 + Duration::from_millis(100);
        assert_eq!(g.press(pin(), (10.0, 10.0), false, t3), GestureEffect::Select(pin()));
    }

    #[test]
    fn test_double_click_window_expires() {
        let mut g = GestureDisambiguator::new();
        let t = Instant::now();

        g.press(pin(), (10.0, 10.0), false, t);
        g.release();

        let late = t + Duration::from_millis(500);
        assert_eq!(g.press(pin(), (10.0, 10.0), false, late), GestureEffect::Select(pin()));
    }

    #[test]
    fn test_double_click_requires_same_pin() {
        let mut g = GestureDisambiguator::new();
        let t = Instant::now();
        let other = PinRef::new("plan-a", 0, 2);

        g.press(pin(), (10.0, 10.0), false, t);
        g.release();

        let t2 = t + Duration::from_millis(100);
        assert_eq!(
            g.press(other.clone(), (10.0, 10.0), false, t2),
            GestureEffect::Select(other)
        );
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut g = GestureDisambiguator::new();
        g.press(pin(), (0.0, 0.0), false, Instant::now());
        g.cancel();
        assert_eq!(*g.state(), GestureState::Idle);
        assert_eq!(g.pointer_move((100.0, 100.0)), None);
    }
}
