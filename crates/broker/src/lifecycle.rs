//! Request, offer and deal lifecycle.

use broker_core::{
    redact, Candidate, Category, ExecutorProfile, GeoMatcher, GeoPoint, MatchRequest,
    OfferStatus, RateType, RequestMode, ValidationError, MAX_DECIMAL_INPUT,
};
use database::models::{NewOffer, NewRequest};
use database::{deal, executor, offer, request, settings, Database, Executor, Offer, Request};
use tracing::{info, warn};

use crate::error::BrokerError;

/// A matched executor together with its profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedExecutor {
    pub candidate: Candidate,
    pub profile: ExecutorProfile,
}

/// Owns requests, offers and deals and the transitions between them.
///
/// Each operation is one or more single-statement writes. Notification is
/// left to the caller.
#[derive(Debug, Clone)]
pub struct LifecycleStore {
    db: Database,
}

impl LifecycleStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Publish a request. The description and typed address are redacted
    /// before they are stored.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_request(
        &self,
        client_user_id: i64,
        category: Category,
        description: &str,
        address: Option<&str>,
        location: GeoPoint,
        radius_km: f64,
        mode: RequestMode,
    ) -> Result<i64, BrokerError> {
        if !radius_km.is_finite() {
            return Err(ValidationError::NotANumber(radius_km.to_string()).into());
        }
        if radius_km <= 0.0 || radius_km > MAX_DECIMAL_INPUT {
            return Err(ValidationError::OutOfRange {
                field: "radius",
                value: radius_km,
                min: 0.0,
                max: MAX_DECIMAL_INPUT,
            }
            .into());
        }
        let description = redact(description.trim());
        if description.is_empty() {
            return Err(ValidationError::Empty("description").into());
        }
        let address_text = address
            .map(|a| redact(a.trim()))
            .filter(|a| !a.is_empty());

        let id = request::create_request(
            self.db.pool(),
            &NewRequest {
                client_user_id,
                category: category.label().to_string(),
                description,
                address_text,
                lat: location.lat,
                lon: location.lon,
                radius_km,
                mode: mode.as_str().to_string(),
            },
        )
        .await?;

        info!(request_id = id, client_user_id, category = %category.label(), mode = %mode, "Request created");
        Ok(id)
    }

    /// Record an executor's bid. The comment is redacted before it is stored.
    ///
    /// The request and executor are not checked for existence.
    pub async fn create_offer(
        &self,
        request_id: i64,
        executor_id: i64,
        rate_type: RateType,
        rate_value: f64,
        comment: &str,
    ) -> Result<i64, BrokerError> {
        if !rate_value.is_finite() {
            return Err(ValidationError::NotANumber(rate_value.to_string()).into());
        }
        if rate_value <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "rate",
                value: rate_value,
                min: 0.0,
                max: f64::INFINITY,
            }
            .into());
        }

        let id = offer::create_offer(
            self.db.pool(),
            &NewOffer {
                request_id,
                executor_id,
                rate_type: rate_type.as_str().to_string(),
                rate_value,
                comment: redact(comment.trim()),
            },
        )
        .await?;

        info!(offer_id = id, request_id, executor_id, "Offer created");
        Ok(id)
    }

    /// Accept an offer and open a deal with contacts released.
    ///
    /// Not atomic: the status update and the deal insert are two writes, so a
    /// crash in between leaves an accepted offer without a deal. Accepting the
    /// same offer again creates another deal.
    pub async fn accept_offer(&self, offer_id: i64) -> Result<i64, BrokerError> {
        let current = offer::get_offer(self.db.pool(), offer_id).await?;
        let status = OfferStatus::from_stored(&current.status);

        if status == OfferStatus::Rejected {
            return Err(BrokerError::InvalidTransition {
                offer_id,
                from: status,
                to: OfferStatus::Accepted,
            });
        }
        if status == OfferStatus::Accepted {
            warn!(offer_id, "Offer accepted again");
        }

        offer::set_status(self.db.pool(), offer_id, OfferStatus::Accepted.as_str()).await?;
        let deal_id = deal::create_deal(self.db.pool(), current.request_id, offer_id).await?;

        info!(deal_id, offer_id, request_id = current.request_id, "Deal created");
        Ok(deal_id)
    }

    /// Decline an active offer.
    pub async fn reject_offer(&self, offer_id: i64) -> Result<Offer, BrokerError> {
        let current = offer::get_offer(self.db.pool(), offer_id).await?;
        let status = OfferStatus::from_stored(&current.status);

        if status != OfferStatus::Active {
            return Err(BrokerError::InvalidTransition {
                offer_id,
                from: status,
                to: OfferStatus::Rejected,
            });
        }

        offer::set_status(self.db.pool(), offer_id, OfferStatus::Rejected.as_str()).await?;
        info!(offer_id, "Offer rejected");

        Ok(Offer {
            status: OfferStatus::Rejected.as_str().to_string(),
            ..current
        })
    }

    pub async fn get_request(&self, request_id: i64) -> Result<Request, BrokerError> {
        Ok(request::get_request(self.db.pool(), request_id).await?)
    }

    pub async fn get_offer(&self, offer_id: i64) -> Result<Offer, BrokerError> {
        Ok(offer::get_offer(self.db.pool(), offer_id).await?)
    }

    pub async fn list_offers_for_request(&self, request_id: i64) -> Result<Vec<Offer>, BrokerError> {
        Ok(offer::list_offers_for_request(self.db.pool(), request_id).await?)
    }

    pub async fn count_offers(&self, request_id: i64) -> Result<i64, BrokerError> {
        Ok(offer::count_offers_for_request(self.db.pool(), request_id).await?)
    }

    pub async fn list_requests_for_client(
        &self,
        client_user_id: i64,
    ) -> Result<Vec<Request>, BrokerError> {
        Ok(request::list_requests_for_client(self.db.pool(), client_user_id).await?)
    }

    /// Every executor profile, newest first.
    pub async fn list_executors(&self) -> Result<Vec<ExecutorProfile>, BrokerError> {
        let rows = executor::list_executors(self.db.pool()).await?;
        Ok(rows.into_iter().map(executor_profile).collect())
    }

    pub async fn get_executor(&self, executor_id: i64) -> Result<ExecutorProfile, BrokerError> {
        let row = executor::get_executor(self.db.pool(), executor_id).await?;
        Ok(executor_profile(row))
    }

    /// The profile owned by a user, if they have one.
    pub async fn executor_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<ExecutorProfile>, BrokerError> {
        let row = executor::find_executor_by_user(self.db.pool(), user_id).await?;
        Ok(row.map(executor_profile))
    }

    /// Ranked candidates for a stored request under the current ranking setting.
    pub async fn candidates_for(&self, request_id: i64) -> Result<Vec<RankedExecutor>, BrokerError> {
        let stored = self.get_request(request_id).await?;
        let category = Category::parse(&stored.category)?;
        let target = MatchRequest::new(
            category,
            GeoPoint::new(stored.lat, stored.lon),
            stored.radius_km,
        );

        let profiles: Vec<ExecutorProfile> = executor::list_active_executors(self.db.pool())
            .await?
            .into_iter()
            .map(executor_profile)
            .collect();
        let matcher = GeoMatcher::new(self.prefer_owner_first().await?);

        let ranked = matcher
            .find_candidates(&target, &profiles)
            .into_iter()
            .filter_map(|candidate| {
                profiles
                    .iter()
                    .find(|p| p.id == candidate.executor_id)
                    .cloned()
                    .map(|profile| RankedExecutor { candidate, profile })
            })
            .collect();

        Ok(ranked)
    }

    pub async fn prefer_owner_first(&self) -> Result<bool, BrokerError> {
        Ok(settings::prefer_owner_first(self.db.pool()).await?)
    }

    pub async fn set_prefer_owner_first(&self, value: bool) -> Result<(), BrokerError> {
        settings::set_prefer_owner_first(self.db.pool(), value).await?;
        info!(prefer_owner_first = value, "Ranking preference changed");
        Ok(())
    }
}

/// Convert a stored executor row into the matcher's view.
pub fn executor_profile(row: Executor) -> ExecutorProfile {
    ExecutorProfile {
        id: row.id,
        user_id: row.user_id,
        pending_handle: row.pending_handle,
        direct_channel_id: row.direct_channel_id,
        categories: ExecutorProfile::parse_tags(&row.categories),
        city: row.city,
        location: GeoPoint::from_parts(row.lat, row.lon),
        radius_km: row.radius_km,
        is_owner: row.is_owner,
        is_active: row.is_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use database::models::NewExecutor;

    async fn store() -> LifecycleStore {
        LifecycleStore::new(test_db().await)
    }

    async fn request(store: &LifecycleStore) -> i64 {
        store
            .create_request(
                1,
                Category::Excavator,
                "Dig a pit",
                Some("Moscow"),
                GeoPoint::new(55.75, 37.62),
                50.0,
                RequestMode::Auction,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_request_validates_radius() {
        let store = store().await;
        for radius in [0.0, -1.0, 1000.5, f64::NAN] {
            let result = store
                .create_request(
                    1,
                    Category::Loader,
                    "x",
                    None,
                    GeoPoint::new(0.0, 0.0),
                    radius,
                    RequestMode::Catalog,
                )
                .await;
            assert!(
                matches!(result, Err(BrokerError::Validation(_))),
                "radius {} accepted",
                radius
            );
        }
    }

    #[tokio::test]
    async fn test_create_request_redacts_description() {
        let store = store().await;
        let id = store
            .create_request(
                1,
                Category::Excavator,
                "Звоните +7 999 123-45-67 или @ivan_builder",
                None,
                GeoPoint::new(55.75, 37.62),
                1000.0,
                RequestMode::Auction,
            )
            .await
            .unwrap();

        let stored = store.get_request(id).await.unwrap();
        assert_eq!(stored.description, "Звоните [[hidden]] или [[hidden]]");
        assert_eq!(stored.mode.as_deref(), Some("auction"));
        assert_eq!(stored.category, "Экскаватор");
    }

    #[tokio::test]
    async fn test_create_request_redacts_address() {
        let store = store().await;
        let id = store
            .create_request(
                1,
                Category::Excavator,
                "Pit for a foundation",
                Some("Lenina 5, call +7 999 123-45-67 or @ivan_builder"),
                GeoPoint::new(55.75, 37.62),
                50.0,
                RequestMode::Auction,
            )
            .await
            .unwrap();

        let stored = store.get_request(id).await.unwrap();
        assert_eq!(
            stored.address_text.as_deref(),
            Some("Lenina 5, call [[hidden]] or [[hidden]]")
        );
    }

    #[tokio::test]
    async fn test_create_offer_validates_rate() {
        let store = store().await;
        for rate in [0.0, -5.0, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                store.create_offer(1, 1, RateType::Hourly, rate, "").await,
                Err(BrokerError::Validation(_))
            ));
        }

        // Orphaned offers are allowed.
        let id = store
            .create_offer(999, 888, RateType::Shift, 1500.0, "see https://example.com")
            .await
            .unwrap();
        let stored = store.get_offer(id).await.unwrap();
        assert_eq!(stored.comment, "see [[hidden]]");
        assert_eq!(stored.status, "active");
    }

    #[tokio::test]
    async fn test_accept_offer_twice_creates_two_deals() {
        let store = store().await;
        let request_id = request(&store).await;
        let offer_id = store
            .create_offer(request_id, 1, RateType::Fixed, 100.0, "")
            .await
            .unwrap();

        let first = store.accept_offer(offer_id).await.unwrap();
        let second = store.accept_offer(offer_id).await.unwrap();
        assert_ne!(first, second);

        let deals = deal::list_deals_for_offer(store.database().pool(), offer_id)
            .await
            .unwrap();
        assert_eq!(deals.len(), 2);
        assert!(deals.iter().all(|d| d.contacts_released && d.request_id == request_id));
        assert_eq!(store.get_offer(offer_id).await.unwrap().status, "accepted");
    }

    #[tokio::test]
    async fn test_accept_unknown_offer() {
        let store = store().await;
        assert!(matches!(
            store.accept_offer(404).await,
            Err(BrokerError::NotFound { entity: "Offer", .. })
        ));
        assert_eq!(deal::count_deals(store.database().pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let store = store().await;
        let request_id = request(&store).await;
        let offer_id = store
            .create_offer(request_id, 1, RateType::Hourly, 10.0, "")
            .await
            .unwrap();

        let rejected = store.reject_offer(offer_id).await.unwrap();
        assert_eq!(rejected.status, "rejected");

        assert!(matches!(
            store.accept_offer(offer_id).await,
            Err(BrokerError::InvalidTransition {
                from: OfferStatus::Rejected,
                to: OfferStatus::Accepted,
                ..
            })
        ));
        assert!(matches!(
            store.reject_offer(offer_id).await,
            Err(BrokerError::InvalidTransition { .. })
        ));
        assert_eq!(deal::count_deals(store.database().pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sibling_offers_stay_acceptable() {
        let store = store().await;
        let request_id = request(&store).await;
        let a = store
            .create_offer(request_id, 1, RateType::Hourly, 10.0, "")
            .await
            .unwrap();
        let b = store
            .create_offer(request_id, 2, RateType::Hourly, 12.0, "")
            .await
            .unwrap();

        store.accept_offer(a).await.unwrap();
        store.accept_offer(b).await.unwrap();

        let offers = store.list_offers_for_request(request_id).await.unwrap();
        assert!(offers.iter().all(|o| o.status == "accepted"));
        assert_eq!(store.count_offers(request_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_candidates_for_request() {
        let store = store().await;
        let pool = store.database().pool();
        let request_id = request(&store).await;

        let mut ids = Vec::new();
        // (lat offset, radius, owner): ~10 km owner, ~5 km subcontractor, ~5 km with 3 km radius
        for (dlat, radius, owner) in [(0.0899, 100.0, true), (0.04497, 100.0, false), (0.04497, 3.0, false)] {
            let id = executor::create_executor(
                pool,
                &NewExecutor {
                    pending_handle: None,
                    direct_channel_id: None,
                    categories: vec!["Экскаватор".to_string()],
                    city: Some("Moscow".to_string()),
                    radius_km: radius,
                    is_owner: owner,
                },
            )
            .await
            .unwrap();
            executor::set_location(pool, id, 55.75 + dlat, 37.62).await.unwrap();
            ids.push(id);
        }

        let ranked = store.candidates_for(request_id).await.unwrap();
        let order: Vec<i64> = ranked.iter().map(|r| r.candidate.executor_id).collect();
        assert_eq!(order, vec![ids[0], ids[1]]);
        assert_eq!(ranked[0].profile.city.as_deref(), Some("Moscow"));

        store.set_prefer_owner_first(false).await.unwrap();
        let ranked = store.candidates_for(request_id).await.unwrap();
        let order: Vec<i64> = ranked.iter().map(|r| r.candidate.executor_id).collect();
        assert_eq!(order, vec![ids[1], ids[0]]);
    }
}
