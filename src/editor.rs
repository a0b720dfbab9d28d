//! The annotation editor: composition root of the engine.
//!
//! Owns the store, the viewport, the gesture machine, and the active
//! `(plan, group)` cursor, and translates raw host events (pointer,
//! wheel, image/container changes) into state mutations. Capacity and
//! color refusals never escape as errors — they land in a transient
//! notice queue the host drains and displays.

use std::collections::VecDeque;

use web_time::Instant;

use crate::api::{OrderInfo, PinPackSettings, ScreenData};
use crate::constants::{hit, MAX_PIN_GROUPS, MAX_PINS_PER_GROUP};
use crate::gesture::{GestureDisambiguator, GestureEffect};
use crate::model::{Pin, PinRef, Plan, PlanId};
use crate::palette::{self, PaletteColor};
use crate::session::{self, HandoffStorage, RestoredSession, SessionError};
use crate::store::{PinGroupStore, StoreError};
use crate::submission::{self, BatchReport, SubmitError, SubmitRevisions};
use crate::viewport::ViewportTransform;

/// A transient user-facing notice. Operations that are refused (rather
/// than failed) surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The group's cross-plan pin pool is exhausted.
    GroupFull { group: usize },
    /// The chosen color is taken or outside the group's palette.
    ColorUnavailable { color: String },
    /// The group index is not unlocked.
    GroupUnavailable { group: usize },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::GroupFull { group } => write!(
                f,
                "Pin group {} already holds {} pins",
                group + 1,
                MAX_PINS_PER_GROUP
            ),
            Notice::ColorUnavailable { color } => {
                match palette::color_name(color) {
                    Some(name) => write!(f, "{name} is already used in this group"),
                    None => write!(f, "That color is not available in this group"),
                }
            }
            Notice::GroupUnavailable { group } => {
                write!(f, "Pin group {} is not unlocked yet", group + 1)
            }
        }
    }
}

impl From<StoreError> for Notice {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::GroupFull { group } => Notice::GroupFull { group },
            StoreError::ColorInUse { color, .. } | StoreError::ColorNotInPalette { color, .. } => {
                Notice::ColorUnavailable { color }
            }
            StoreError::GroupOutOfRange { group, .. } => Notice::GroupUnavailable { group },
            // Addressing failures are bugs in the caller, not user events
            StoreError::PinNotFound { plan, group, pin } => {
                log::warn!("Stale pin address {}/{}/{}", plan, group, pin);
                Notice::GroupUnavailable { group }
            }
        }
    }
}

/// One palette entry of the active group plus its availability, for the
/// color picker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorChoice {
    pub color: PaletteColor,
    pub in_use: bool,
}

/// The annotation screen's state and event surface.
pub struct PlanEditor {
    order_id: String,
    plans: Vec<Plan>,
    store: PinGroupStore,
    viewport: ViewportTransform,
    gesture: GestureDisambiguator,
    active_plan: Option<PlanId>,
    active_group: usize,
    selected: Option<PinRef>,
    pan_mode: bool,
    purchased_packs: usize,
    notices: VecDeque<Notice>,
    order: Option<OrderInfo>,
    pin_pack: Option<PinPackSettings>,
}

impl PlanEditor {
    pub fn new(order_id: impl Into<String>, plans: Vec<Plan>, purchased_packs: usize) -> Self {
        let active_plan = plans.first().map(|p| p.id.clone());
        Self {
            order_id: order_id.into(),
            plans,
            store: PinGroupStore::new(purchased_packs),
            viewport: ViewportTransform::default(),
            gesture: GestureDisambiguator::new(),
            active_plan,
            active_group: 0,
            selected: None,
            pan_mode: false,
            purchased_packs,
            notices: VecDeque::new(),
            order: None,
            pin_pack: None,
        }
    }

    /// Build the editor from a completed screen load.
    pub fn from_screen(order_id: impl Into<String>, data: ScreenData) -> Self {
        let purchases = data
            .order
            .as_ref()
            .map(|o| o.pin_pack_purchases_count)
            .unwrap_or(0);
        let mut editor = Self::new(order_id, data.plans, purchases);
        editor.order = data.order;
        editor.pin_pack = data.pin_pack;
        editor
    }

    /// Build the editor from a screen load, seeding from a parked
    /// session if one exists (and consuming it).
    pub fn resume<S: HandoffStorage>(
        order_id: impl Into<String>,
        data: ScreenData,
        storage: &S,
    ) -> Result<Self, SessionError> {
        let order_id = order_id.into();
        let mut editor = Self::from_screen(order_id.clone(), data);
        let groups_count = editor.store.pin_groups_count();
        if let Some(restored) =
            session::take_handoff(storage, &order_id, &editor.plans, groups_count)?
        {
            editor.apply_restored(restored);
        }
        Ok(editor)
    }

    fn apply_restored(&mut self, restored: RestoredSession) {
        self.store = PinGroupStore::from_table(restored.pins_by_plan, self.purchased_packs);
        self.active_group = restored.active_group_index;
        if restored.active_plan.is_some() {
            self.active_plan = restored.active_plan;
        }
    }

    /// Park the whole session before navigating into the purchase flow.
    pub fn park<S: HandoffStorage>(&self, storage: &S) -> Result<(), SessionError> {
        session::save_handoff(
            storage,
            &self.order_id,
            &self.store,
            self.active_group,
            self.active_plan.as_ref(),
        )
    }

    // ========================================================================
    // Pointer protocol
    // ========================================================================

    /// Pointer-down on the annotation surface.
    ///
    /// In pan mode this starts a viewport drag. Otherwise a press on an
    /// existing pin enters the gesture machine, and a press on empty
    /// image adds a pin to the active group at the converted position.
    pub fn pointer_down(&mut self, x: f32, y: f32, now: Instant) {
        if self.pan_mode {
            self.viewport.begin_pan((x, y));
            return;
        }
        let Some(plan) = self.active_plan.clone() else {
            return;
        };

        if let Some(r) = self.hit_test(x, y) {
            let locked = self.store.pin(&r).map(|p| p.locked).unwrap_or(false);
            let effect = self.gesture.press(r, (x, y), locked, now);
            self.apply_effect(effect);
        } else if self.viewport.rendered_bounds().contains(x, y) {
            let (px, py) = self.viewport.pointer_to_percent(x, y);
            match self.store.add_pin(&plan, self.active_group, px, py) {
                Ok(r) => self.selected = Some(r),
                Err(e) => self.notify(e),
            }
        }
    }

    /// Pointer movement with the button held.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.pan_mode {
            self.viewport.pan_to((x, y));
            return;
        }
        if let Some(effect) = self.gesture.pointer_move((x, y)) {
            self.apply_effect(effect);
        }
    }

    /// Pointer released.
    pub fn pointer_up(&mut self) {
        if self.pan_mode {
            self.viewport.end_pan();
            return;
        }
        if let Some(effect) = self.gesture.release() {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: GestureEffect) {
        match effect {
            GestureEffect::Select(r) => self.selected = Some(r),
            GestureEffect::ToggleLock(r) => {
                if let Err(e) = self.store.toggle_lock(&r) {
                    log::warn!("Lock toggle failed: {}", e);
                }
            }
            GestureEffect::MoveTo { pin, pointer } => {
                let (px, py) = self.viewport.pointer_to_percent(pointer.0, pointer.1);
                if let Err(e) = self.store.move_pin(&pin, px, py) {
                    log::warn!("Move failed: {}", e);
                }
            }
            GestureEffect::ClearSelection => self.selected = None,
        }
    }

    /// Find the pin marker under the pointer on the active plan, across
    /// all of its groups (palette slices keep them distinguishable).
    /// Returns the closest marker within the hit radius.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<PinRef> {
        let plan = self.active_plan.as_ref()?;
        let groups = self.store.plan_groups(plan)?;

        let mut best: Option<(f32, PinRef)> = None;
        for (gi, group) in groups.iter().enumerate() {
            for pin in &group.pins {
                let (sx, sy) = self.viewport.percent_to_pointer(pin.x, pin.y);
                let dist = ((sx - x).powi(2) + (sy - y).powi(2)).sqrt();
                if dist <= hit::PIN_RADIUS_PX
                    && best.as_ref().is_none_or(|(d, _)| dist < *d)
                {
                    best = Some((dist, PinRef::new(plan.clone(), gi, pin.id)));
                }
            }
        }
        best.map(|(_, r)| r)
    }

    // ========================================================================
    // Viewport events
    // ========================================================================

    /// Wheel/pinch zoom event over the image.
    pub fn wheel(&mut self, delta: f32) {
        self.viewport.wheel(delta);
    }

    /// The plan image finished loading (natural size now known).
    pub fn image_loaded(&mut self, width: f32, height: f32) {
        self.viewport.set_natural_size(width, height);
    }

    /// The viewport container was resized.
    pub fn container_resized(&mut self, width: f32, height: f32) {
        self.viewport.set_container_size(width, height);
    }

    pub fn set_pan_mode(&mut self, on: bool) {
        if self.pan_mode != on {
            self.gesture.cancel();
            self.pan_mode = on;
        }
    }

    // ========================================================================
    // Pin operations
    // ========================================================================

    /// Update the note of a pin (usually the selected one).
    pub fn set_note(&mut self, r: &PinRef, note: impl Into<String>) {
        if let Err(e) = self.store.set_note(r, note) {
            self.notify(e);
        }
    }

    /// Recolor a pin; refused colors surface as a notice and leave the
    /// pin's color untouched.
    pub fn recolor(&mut self, r: &PinRef, color: &str) {
        if let Err(e) = self.store.recolor(r, color) {
            self.notify(e);
        }
    }

    /// Delete a pin, clearing the selection if it pointed at it.
    pub fn remove_pin(&mut self, r: &PinRef) {
        match self.store.remove_pin(r) {
            Ok(_) => {
                if self.selected.as_ref() == Some(r) {
                    self.selected = None;
                }
            }
            Err(e) => self.notify(e),
        }
    }

    /// The active group's palette with per-color availability, for the
    /// color picker.
    pub fn color_choices(&self) -> Vec<ColorChoice> {
        let used = self.store.colors_in_use(self.active_group);
        palette::group_palette(self.active_group)
            .iter()
            .map(|&color| ColorChoice {
                color,
                in_use: used.contains(color.hex),
            })
            .collect()
    }

    // ========================================================================
    // Cursor (active plan / group)
    // ========================================================================

    pub fn select_plan(&mut self, plan: &PlanId) {
        if self.plans.iter().any(|p| p.id == *plan) {
            self.gesture.cancel();
            self.selected = None;
            self.active_plan = Some(plan.clone());
            self.store.groups_for_plan(plan);
        } else {
            log::warn!("Unknown plan {} selected", plan);
        }
    }

    pub fn select_group(&mut self, group: usize) {
        if group < self.store.pin_groups_count() {
            self.active_group = group;
        } else {
            self.notices.push_back(Notice::GroupUnavailable { group });
        }
    }

    /// Apply a fresh purchase count (after returning from the purchase
    /// flow). Group growth is append-only.
    pub fn apply_purchases(&mut self, purchased_packs: usize) {
        self.purchased_packs = purchased_packs;
        self.store.set_purchased_packs(purchased_packs);
    }

    // ========================================================================
    // Upsell
    // ========================================================================

    /// The pin-pack upsell copy for the active group's fill state, when
    /// the settings fetch succeeded and a message applies: one slot left
    /// or none left. Unavailable settings degrade to no upsell.
    pub fn upsell_message(&self) -> Option<&str> {
        let settings = self.pin_pack.as_ref()?;
        let remaining =
            MAX_PINS_PER_GROUP.saturating_sub(self.store.group_pin_count(self.active_group));
        match remaining {
            0 => Some(settings.message_when_0_left.as_str()),
            1 => Some(settings.message_when_1_left.as_str()),
            _ => None,
        }
    }

    /// Whether another pin pack can still unlock a group.
    pub fn can_unlock_more_groups(&self) -> bool {
        self.store.pin_groups_count() < MAX_PIN_GROUPS
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Run a submission round over the current store snapshot. Validation
    /// failures return before any network call; a mid-batch failure is
    /// described by the report. Local pin state is never cleared here.
    pub async fn submit<S: SubmitRevisions>(&self, api: &S) -> Result<BatchReport, SubmitError> {
        submission::submit_all(api, &self.order_id, &self.store, &self.plans).await
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn store(&self) -> &PinGroupStore {
        &self.store
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn active_plan(&self) -> Option<&PlanId> {
        self.active_plan.as_ref()
    }

    pub fn active_group(&self) -> usize {
        self.active_group
    }

    pub fn selected(&self) -> Option<&PinRef> {
        self.selected.as_ref()
    }

    /// The selected pin's data, if the selection is still valid.
    pub fn selected_pin(&self) -> Option<&Pin> {
        self.selected.as_ref().and_then(|r| self.store.pin(r).ok())
    }

    pub fn order_info(&self) -> Option<&OrderInfo> {
        self.order.as_ref()
    }

    pub fn pin_pack_settings(&self) -> Option<&PinPackSettings> {
        self.pin_pack.as_ref()
    }

    fn notify(&mut self, e: StoreError) {
        log::debug!("Refused: {}", e);
        self.notices.push_back(Notice::from(e));
    }

    /// Drain pending notices for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}
