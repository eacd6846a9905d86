//! Candidate matching: which executors can serve a request, best first.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::types::{Category, ExecutorProfile};

/// The parts of a request the matcher looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRequest {
    pub category: Category,
    pub location: GeoPoint,
    /// Client's search radius in km.
    pub radius_km: f64,
}

impl MatchRequest {
    pub fn new(category: Category, location: GeoPoint, radius_km: f64) -> Self {
        Self {
            category,
            location,
            radius_km,
        }
    }
}

/// A ranked match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub executor_id: i64,
    pub distance_km: f64,
    pub is_owner_fleet: bool,
}

/// Filters and ranks executors for a request.
///
/// An executor is a candidate iff it is active, tagged with the request's
/// category, locatable, and the distance is within both its own service
/// radius and the client's search radius. Candidates are ordered by tier
/// (owner fleet first when `prefer_owner_first` is on) then ascending
/// distance. The sort is stable, so equal keys keep input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoMatcher {
    prefer_owner_first: bool,
}

impl Default for GeoMatcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl GeoMatcher {
    pub fn new(prefer_owner_first: bool) -> Self {
        Self { prefer_owner_first }
    }

    pub fn prefer_owner_first(&self) -> bool {
        self.prefer_owner_first
    }

    /// Return every serviceable executor, best first. An empty result is valid.
    pub fn find_candidates(
        &self,
        request: &MatchRequest,
        executors: &[ExecutorProfile],
    ) -> Vec<Candidate> {
        let category = request.category.label();

        let mut matches: Vec<Candidate> = executors
            .iter()
            .filter(|e| e.is_active && e.serves(category))
            .filter_map(|e| {
                let location = e.location?;
                let distance_km = request.location.distance_km(&location);
                (distance_km <= e.radius_km && distance_km <= request.radius_km).then_some(
                    Candidate {
                        executor_id: e.id,
                        distance_km,
                        is_owner_fleet: e.is_owner,
                    },
                )
            })
            .collect();

        matches.sort_by(|a, b| self.rank(a, b));
        matches
    }

    fn tier(&self, candidate: &Candidate) -> u8 {
        if self.prefer_owner_first && candidate.is_owner_fleet {
            0
        } else {
            1
        }
    }

    fn rank(&self, a: &Candidate, b: &Candidate) -> Ordering {
        self.tier(a)
            .cmp(&self.tier(b))
            .then_with(|| a.distance_km.total_cmp(&b.distance_km))
    }
}
