//! Submission aggregation: turning scattered pin state into revision
//! requests.
//!
//! At submit time the store is walked once: every plan's groups are
//! flattened, pins carrying a note are kept, and each plan with at least
//! one noted pin becomes exactly one outbound create-revision call. Each
//! call consumes one revision credit, so the batch runs strictly
//! sequentially and stops at the first failure — the committed prefix
//! stays committed (credits were spent), the suffix is never attempted,
//! and the report spells out both.

use serde::Serialize;

use crate::api::ApiError;
use crate::model::{Plan, PlanId};
use crate::store::PinGroupStore;

/// A pin as sent on the wire: identifier stripped, position, color, note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPin {
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub note: String,
}

/// One outbound revision request: a plan and its noted pins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSubmission {
    pub plan_id: PlanId,
    pub pins: Vec<SubmissionPin>,
}

/// Validation failures that block the batch before any network call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    /// Nothing to submit anywhere.
    #[error("no pins have been placed")]
    NoPins,

    /// Partial completeness is rejected outright: the system never
    /// silently submits a subset.
    #[error("{missing} pin(s) still need a note before submitting")]
    MissingNotes { missing: usize },
}

/// Outcome of a submission batch.
///
/// On a mid-batch failure, `submitted` is the committed prefix (credits
/// already consumed server-side, not rolled back), `failed` carries the
/// failing plan with the server's error, and `not_attempted` is the
/// untouched suffix. The engine does not clear any local pin state;
/// hosts that want to avoid re-submitting the committed prefix can use
/// `submitted` to clear those plans' pins themselves.
#[derive(Debug)]
pub struct BatchReport {
    pub submitted: Vec<PlanId>,
    pub failed: Option<(PlanId, ApiError)>,
    pub not_attempted: Vec<PlanId>,
}

impl BatchReport {
    /// Whether every plan in the batch was submitted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// The create-revision seam, one call per plan of a batch. Implemented
/// by the HTTP client and by test doubles.
pub trait SubmitRevisions {
    fn create_revision(
        &self,
        order_id: &str,
        submission: &PlanSubmission,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, ApiError>>;
}

/// Check the all-or-nothing preconditions: at least one pin exists, and
/// every pin across every group and plan carries a note.
pub fn validate(store: &PinGroupStore) -> Result<(), SubmitError> {
    if store.total_pins() == 0 {
        return Err(SubmitError::NoPins);
    }
    let missing = store
        .iter_pins()
        .filter(|(_, pin)| !pin.has_note())
        .count();
    if missing > 0 {
        return Err(SubmitError::MissingNotes { missing });
    }
    Ok(())
}

/// Aggregate the store into one submission unit per plan, in the order
/// the plans were fetched. Pins without a note are dropped; plans left
/// with no pins are omitted entirely.
pub fn build_submission(store: &PinGroupStore, plans: &[Plan]) -> Vec<PlanSubmission> {
    plans
        .iter()
        .filter_map(|plan| {
            let pins: Vec<SubmissionPin> = store
                .plan_groups(&plan.id)
                .into_iter()
                .flatten()
                .flat_map(|group| &group.pins)
                .filter(|pin| pin.has_note())
                .map(|pin| SubmissionPin {
                    x: pin.x,
                    y: pin.y,
                    color: pin.color.clone(),
                    note: pin.note.clone(),
                })
                .collect();
            (!pins.is_empty()).then(|| PlanSubmission {
                plan_id: plan.id.clone(),
                pins,
            })
        })
        .collect()
}

/// Run a full submission round: validate, aggregate, then issue one
/// create-revision call per plan, strictly in order, halting at the
/// first failure.
pub async fn submit_all<S: SubmitRevisions>(
    api: &S,
    order_id: &str,
    store: &PinGroupStore,
    plans: &[Plan],
) -> Result<BatchReport, SubmitError> {
    validate(store)?;
    let batch = build_submission(store, plans);

    let mut report = BatchReport {
        submitted: Vec::new(),
        failed: None,
        not_attempted: Vec::new(),
    };

    let mut entries = batch.into_iter();
    for entry in entries.by_ref() {
        log::info!(
            "Submitting revision for plan {} ({} pins)",
            entry.plan_id,
            entry.pins.len()
        );
        match api.create_revision(order_id, &entry).await {
            Ok(_) => report.submitted.push(entry.plan_id),
            Err(e) => {
                log::warn!("Revision for plan {} failed: {}", entry.plan_id, e);
                report.failed = Some((entry.plan_id, e));
                break;
            }
        }
    }
    report.not_attempted = entries.map(|e| e.plan_id).collect();

    if report.is_complete() {
        log::info!("Submission round complete: {} plan(s)", report.submitted.len());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PinRef;
    use std::sync::Mutex;

    fn plans(ids: &[&str]) -> Vec<Plan> {
        ids.iter().map(|id| Plan::new(*id, format!("Plan {id}"))).collect()
    }

    fn noted_pin(store: &mut PinGroupStore, plan: &str, group: usize, note: &str) -> PinRef {
        let r = store.add_pin(&PlanId::new(plan), group, 50.0, 50.0).unwrap();
        store.set_note(&r, note).unwrap();
        r
    }

    struct MockApi {
        fail_on: Option<PlanId>,
        calls: Mutex<Vec<PlanId>>,
    }

    impl MockApi {
        fn new(fail_on: Option<&str>) -> Self {
            Self {
                fail_on: fail_on.map(PlanId::new),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl SubmitRevisions for MockApi {
        async fn create_revision(
            &self,
            _order_id: &str,
            submission: &PlanSubmission,
        ) -> Result<serde_json::Value, ApiError> {
            self.calls.lock().unwrap().push(submission.plan_id.clone());
            if self.fail_on.as_ref() == Some(&submission.plan_id) {
                return Err(ApiError::Rejected {
                    message: "no revision credits left".to_string(),
                });
            }
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_validate_no_pins() {
        let store = PinGroupStore::new(0);
        assert_eq!(validate(&store), Err(SubmitError::NoPins));
    }

    #[test]
    fn test_validate_rejects_partial_notes() {
        let mut store = PinGroupStore::new(0);
        noted_pin(&mut store, "a", 0, "fix door");
        store.add_pin(&PlanId::new("a"), 0, 10.0, 10.0).unwrap();

        assert_eq!(validate(&store), Err(SubmitError::MissingNotes { missing: 1 }));
    }

    #[test]
    fn test_build_filters_unnoted_pins_and_empty_plans() {
        let mut store = PinGroupStore::new(0);
        noted_pin(&mut store, "a", 0, "widen hallway");
        store.add_pin(&PlanId::new("a"), 0, 1.0, 1.0).unwrap(); // no note
        store.add_pin(&PlanId::new("b"), 0, 2.0, 2.0).unwrap(); // no note

        let batch = build_submission(&store, &plans(&["a", "b", "c"]));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].plan_id, PlanId::new("a"));
        assert_eq!(batch[0].pins.len(), 1);
        assert_eq!(batch[0].pins[0].note, "widen hallway");
    }

    #[test]
    fn test_build_spans_all_groups_of_a_plan() {
        let mut store = PinGroupStore::new(1);
        noted_pin(&mut store, "a", 0, "note one");
        noted_pin(&mut store, "a", 1, "note two");

        let batch = build_submission(&store, &plans(&["a"]));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].pins.len(), 2);
    }

    #[test]
    fn test_wire_shape_strips_pin_id() {
        let mut store = PinGroupStore::new(0);
        noted_pin(&mut store, "a", 0, "note");
        let batch = build_submission(&store, &plans(&["a"]));

        let json = serde_json::to_string(&batch[0].pins[0]).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(json.contains("\"color\""));
    }

    #[tokio::test]
    async fn test_submit_all_happy_path() {
        let mut store = PinGroupStore::new(0);
        noted_pin(&mut store, "a", 0, "n1");
        noted_pin(&mut store, "b", 0, "n2");

        let api = MockApi::new(None);
        let report = submit_all(&api, "order-1", &store, &plans(&["a", "b"]))
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.submitted, vec![PlanId::new("a"), PlanId::new("b")]);
        assert!(report.not_attempted.is_empty());
    }

    #[tokio::test]
    async fn test_submit_halts_at_first_failure() {
        let mut store = PinGroupStore::new(0);
        noted_pin(&mut store, "a", 0, "n1");
        noted_pin(&mut store, "b", 0, "n2");
        noted_pin(&mut store, "c", 0, "n3");

        let api = MockApi::new(Some("b"));
        let report = submit_all(&api, "order-1", &store, &plans(&["a", "b", "c"]))
            .await
            .unwrap();

        // Committed prefix, failing plan, untouched suffix
        assert_eq!(report.submitted, vec![PlanId::new("a")]);
        let (failed_plan, error) = report.failed.as_ref().unwrap();
        assert_eq!(*failed_plan, PlanId::new("b"));
        assert_eq!(error.to_string(), "no revision credits left");
        assert_eq!(report.not_attempted, vec![PlanId::new("c")]);

        // Plan c was never attempted on the wire
        assert_eq!(*api.calls.lock().unwrap(), vec![PlanId::new("a"), PlanId::new("b")]);
    }

    #[tokio::test]
    async fn test_submit_blocked_before_any_call() {
        let mut store = PinGroupStore::new(0);
        store.add_pin(&PlanId::new("a"), 0, 1.0, 1.0).unwrap(); // unnoted

        let api = MockApi::new(None);
        let err = submit_all(&api, "order-1", &store, &plans(&["a"]))
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::MissingNotes { missing: 1 });
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_six_pins_one_plan_single_entry() {
        let mut store = PinGroupStore::new(0);
        for i in 0..6 {
            noted_pin(&mut store, "a", 0, &format!("note {i}"));
        }
        // The shared pool is exhausted: a seventh pin is refused
        assert!(store.add_pin(&PlanId::new("a"), 0, 1.0, 1.0).is_err());

        let api = MockApi::new(None);
        let report = submit_all(&api, "order-1", &store, &plans(&["a"]))
            .await
            .unwrap();
        assert_eq!(report.submitted, vec![PlanId::new("a")]);

        let batch = build_submission(&store, &plans(&["a"]));
        assert_eq!(batch[0].pins.len(), 6);
    }
}
