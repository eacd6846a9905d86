//! Per-participant conversation scratch state.

use std::collections::HashMap;

use broker_core::{Category, GeoPoint, RateType, RequestMode};
use tokio::sync::RwLock;

use crate::geocoder::GeocodeResult;

/// Independent multi-step flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    RoleSelect,
    RequestCreation,
    OfferSubmission,
    LocationAssignment,
}

impl FlowKind {
    pub const ALL: [FlowKind; 4] = [
        FlowKind::RoleSelect,
        FlowKind::RequestCreation,
        FlowKind::OfferSubmission,
        FlowKind::LocationAssignment,
    ];
}

/// Request-creation steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStep {
    ModeSelect,
    CategorySelect,
    DescriptionInput,
    AddressInput,
    GeoDisambiguation,
    RadiusInput,
}

/// Fields collected so far for a new request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDraft {
    pub step: RequestStep,
    pub mode: RequestMode,
    pub category: Option<Category>,
    /// Already redacted.
    pub description: Option<String>,
    /// Address as typed.
    pub address: Option<String>,
    /// Bumped on every lookup; picks from older result sets are stale.
    pub geocode_generation: u32,
    pub geocode_results: Vec<GeocodeResult>,
    pub location: Option<GeoPoint>,
    /// Display name of the picked geocode result.
    pub resolved_address: Option<String>,
}

impl RequestDraft {
    pub fn new() -> Self {
        Self {
            step: RequestStep::ModeSelect,
            mode: RequestMode::default(),
            category: None,
            description: None,
            address: None,
            geocode_generation: 0,
            geocode_results: Vec::new(),
            location: None,
            resolved_address: None,
        }
    }
}

impl Default for RequestDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// Offer-submission steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferStep {
    RateTypeSelect,
    RateValueInput,
    CommentInput,
}

/// Fields collected so far for a new offer.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferDraft {
    pub step: OfferStep,
    pub request_id: i64,
    pub executor_id: i64,
    pub rate_type: Option<RateType>,
    pub rate_value: Option<f64>,
}

impl OfferDraft {
    pub fn new(request_id: i64, executor_id: i64) -> Self {
        Self {
            step: OfferStep::RateTypeSelect,
            request_id,
            executor_id,
            rate_type: None,
            rate_value: None,
        }
    }
}

/// Scratch state of one in-flight flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    RoleSelect,
    Request(RequestDraft),
    Offer(OfferDraft),
    /// Admin is about to share the home location of an executor.
    LocationAssignment { executor_id: i64 },
}

impl FlowState {
    pub fn kind(&self) -> FlowKind {
        match self {
            Self::RoleSelect => FlowKind::RoleSelect,
            Self::Request(_) => FlowKind::RequestCreation,
            Self::Offer(_) => FlowKind::OfferSubmission,
            Self::LocationAssignment { .. } => FlowKind::LocationAssignment,
        }
    }
}

/// Scratch state keyed by (participant, flow kind).
///
/// A participant has at most one flow in progress: starting one drops any
/// other. State never expires on its own.
#[derive(Debug, Default)]
pub struct FlowStore {
    flows: RwLock<HashMap<(i64, FlowKind), FlowState>>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a flow, discarding whatever the participant had in progress.
    pub async fn begin(&self, participant: i64, state: FlowState) {
        let mut flows = self.flows.write().await;
        for kind in FlowKind::ALL {
            flows.remove(&(participant, kind));
        }
        flows.insert((participant, state.kind()), state);
    }

    /// The participant's in-flight flow, if any.
    pub async fn current(&self, participant: i64) -> Option<FlowState> {
        let flows = self.flows.read().await;
        FlowKind::ALL
            .iter()
            .find_map(|kind| flows.get(&(participant, *kind)).cloned())
    }

    /// Store the advanced state of a flow.
    pub async fn update(&self, participant: i64, state: FlowState) {
        self.flows
            .write()
            .await
            .insert((participant, state.kind()), state);
    }

    /// Drop one flow's scratch state.
    pub async fn clear(&self, participant: i64, kind: FlowKind) -> bool {
        self.flows
            .write()
            .await
            .remove(&(participant, kind))
            .is_some()
    }

    /// Drop every flow of a participant. Returns whether anything was in progress.
    pub async fn clear_all(&self, participant: i64) -> bool {
        let mut flows = self.flows.write().await;
        let mut removed = false;
        for kind in FlowKind::ALL {
            removed |= flows.remove(&(participant, kind)).is_some();
        }
        removed
    }

    /// Number of in-flight flows across all participants.
    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.flows.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_supersedes_other_flows() {
        let store = FlowStore::new();
        store.begin(1, FlowState::RoleSelect).await;
        store
            .begin(1, FlowState::Request(RequestDraft::new()))
            .await;

        assert_eq!(store.len().await, 1);
        assert!(matches!(
            store.current(1).await,
            Some(FlowState::Request(_))
        ));
    }

    #[tokio::test]
    async fn test_participants_are_independent() {
        let store = FlowStore::new();
        store.begin(1, FlowState::RoleSelect).await;
        store.begin(2, FlowState::Offer(OfferDraft::new(5, 6))).await;

        assert!(store.clear_all(1).await);
        assert!(store.current(1).await.is_none());
        assert_eq!(
            store.current(2).await.map(|s| s.kind()),
            Some(FlowKind::OfferSubmission)
        );
    }

    #[tokio::test]
    async fn test_update_and_clear() {
        let store = FlowStore::new();
        let mut draft = RequestDraft::new();
        store.begin(7, FlowState::Request(draft.clone())).await;

        draft.step = RequestStep::CategorySelect;
        store.update(7, FlowState::Request(draft.clone())).await;
        assert_eq!(store.current(7).await, Some(FlowState::Request(draft)));

        assert!(!store.clear(7, FlowKind::OfferSubmission).await);
        assert!(store.clear(7, FlowKind::RequestCreation).await);
        assert!(store.is_empty().await);
        assert!(!store.clear_all(7).await);
    }
}
