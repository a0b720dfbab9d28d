//! plat — plan annotation and revision submission engine.
//!
//! The interactive core of an architectural-design ordering platform's
//! revision screen: clients drop colored pins onto uploaded plan
//! drawings, organize them into purchasable pin groups, and submit all
//! noted pins as one revision request per plan.
//!
//! The engine is headless and host-agnostic. A UI host feeds it pointer,
//! wheel, and resize events and renders from its state; the engine owns
//! the coordinate transforms, the shared color pool, the
//! click/drag/double-click disambiguation, the submission protocol, and
//! the session handoff across the pin-pack purchase flow.

pub mod api;
pub mod constants;
pub mod editor;
pub mod gesture;
pub mod model;
pub mod palette;
pub mod session;
pub mod store;
pub mod submission;
pub mod viewport;

pub use api::{ApiClient, ApiConfig, ApiError, ScreenData, ScreenLoadError};
pub use editor::{Notice, PlanEditor};
pub use gesture::{GestureDisambiguator, GestureEffect, GestureState};
pub use model::{Pin, PinGroup, PinRef, Plan, PlanId};
pub use session::{HandoffStorage, MemoryStorage, SessionError};
pub use store::{PinGroupStore, StoreError};
pub use submission::{BatchReport, PlanSubmission, SubmitError, SubmitRevisions};
pub use viewport::ViewportTransform;
