//! End-to-end conversation scenarios against an in-memory store.

use std::sync::Arc;

use broker::{
    ActionToken, Category, ConversationEngine, Database, FlowState, GeoPoint, GeocodeResult,
    InboundEvent, OfferStep, Participant, RateType, RecordingSender, RequestMode, RequestStep,
    StaticAdminList, StaticGeocoder,
};
use database::{deal, offer, request};

const ADMIN: i64 = 900;
const CLIENT: i64 = 200;
const SITE: (f64, f64) = (55.75, 37.62);
/// Degrees of latitude per ~10 km.
const TEN_KM: f64 = 0.0899;
const FIVE_KM: f64 = 0.04497;

struct Harness {
    engine: ConversationEngine<RecordingSender>,
    sender: Arc<RecordingSender>,
    db: Database,
}

impl Harness {
    async fn new() -> Self {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();

        let geocoder = StaticGeocoder::new()
            .with(
                "Moscow, Red Square",
                vec![
                    GeocodeResult::new("Red Square, Moscow", SITE.0, SITE.1),
                    GeocodeResult::new("Red Square, Elsewhere", 10.0, 10.0),
                ],
            )
            .with(
                "Tverskaya 1",
                vec![GeocodeResult::new("Tverskaya 1, Moscow", SITE.0, SITE.1)],
            );

        let sender = Arc::new(RecordingSender::new());
        let engine = ConversationEngine::new(
            db.clone(),
            sender.clone(),
            Arc::new(geocoder),
            Arc::new(StaticAdminList::new([ADMIN])),
        );

        Self { engine, sender, db }
    }

    async fn text(&self, participant: &Participant, text: &str) {
        self.engine
            .process(InboundEvent::text(participant.clone(), text))
            .await;
    }

    async fn press(&self, participant: &Participant, token: ActionToken) {
        self.engine
            .process(InboundEvent::action(participant.clone(), token))
            .await;
    }

    async fn share(&self, participant: &Participant, lat: f64, lon: f64) {
        self.engine
            .process(InboundEvent::location(
                participant.clone(),
                GeoPoint::new(lat, lon),
            ))
            .await;
    }

    async fn last_text(&self, chat_id: i64) -> String {
        self.sender
            .last_to(chat_id)
            .await
            .map(|m| m.text)
            .unwrap_or_default()
    }

    /// Provision an excavator executor `dlat` degrees north of the site.
    async fn provision(&self, channel_id: i64, radius_km: f64, owner: bool, dlat: f64) -> i64 {
        let admin = Participant::new(ADMIN);
        let command = format!(
            r#"/admin add_exec_id {} "Moscow" {} "Экскаватор"{}"#,
            channel_id,
            radius_km,
            if owner { " --owner" } else { "" }
        );
        self.text(&admin, &command).await;
        assert!(self.last_text(ADMIN).await.contains("added"));

        let executor_id = self.engine.store().list_executors().await.unwrap()[0].id;
        self.text(&admin, &format!("/admin set_loc {}", executor_id))
            .await;
        self.share(&admin, SITE.0 + dlat, SITE.1).await;
        assert!(self.last_text(ADMIN).await.contains("updated"));
        executor_id
    }

    /// Walk a client up to the address prompt.
    async fn start_request(&self, client: &Participant, mode: RequestMode) {
        self.text(client, "/new_request").await;
        self.press(client, ActionToken::Mode(mode)).await;
        self.press(client, ActionToken::Category(Category::Excavator))
            .await;
        self.text(client, "Dig a foundation pit").await;
    }

    /// The geocode pick buttons currently shown to a chat.
    async fn geo_picks(&self, chat_id: i64) -> Vec<ActionToken> {
        self.sender
            .last_to(chat_id)
            .await
            .unwrap()
            .actions
            .into_iter()
            .map(|a| a.token)
            .filter(|t| matches!(t, ActionToken::GeoPick { .. }))
            .collect()
    }

    /// Full request creation at the site with the given radius input.
    async fn publish(&self, client: &Participant, mode: RequestMode, radius: &str) {
        self.start_request(client, mode).await;
        self.text(client, "Moscow, Red Square").await;
        let picks = self.geo_picks(client.channel_id).await;
        self.press(client, picks[0]).await;
        self.text(client, radius).await;
    }

    async fn step(&self, chat_id: i64) -> Option<RequestStep> {
        match self.engine.flows().current(chat_id).await {
            Some(FlowState::Request(draft)) => Some(draft.step),
            _ => None,
        }
    }

    async fn offer_step(&self, chat_id: i64) -> Option<OfferStep> {
        match self.engine.flows().current(chat_id).await {
            Some(FlowState::Offer(draft)) => Some(draft.step),
            _ => None,
        }
    }
}

fn has_offer_action(actions: &[broker::Action], request_id: i64, executor_id: i64) -> bool {
    actions.iter().any(|a| {
        a.token
            == ActionToken::Offer {
                request_id,
                executor_id,
            }
    })
}

#[tokio::test]
async fn test_auction_reaches_candidates_in_rank_order() {
    let h = Harness::new().await;
    let a = h.provision(101, 100.0, true, TEN_KM).await;
    let b = h.provision(102, 100.0, false, FIVE_KM).await;
    let _c = h.provision(103, 3.0, false, FIVE_KM).await;

    let client = Participant::new(CLIENT);
    h.publish(&client, RequestMode::Auction, "50").await;

    let messages = h.sender.messages().await;
    let pos_a = messages
        .iter()
        .position(|m| m.chat_id == 101 && has_offer_action(&m.actions, 1, a))
        .expect("A notified");
    let pos_b = messages
        .iter()
        .position(|m| m.chat_id == 102 && has_offer_action(&m.actions, 1, b))
        .expect("B notified");
    assert!(pos_a < pos_b, "owner fleet ranks first");
    assert!(h.sender.messages_to(103).await.is_empty());

    let notice = &h.sender.messages_to(101).await[0].text;
    assert!(notice.contains("New request #1"));
    assert!(notice.contains("~10.0 km"));
    assert!(h.last_text(CLIENT).await.contains("sent to 2 executor(s)"));
    assert!(h.engine.flows().current(CLIENT).await.is_none());
}

#[tokio::test]
async fn test_cancel_during_description_persists_nothing() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);

    h.text(&client, "/new_request").await;
    h.press(&client, ActionToken::Mode(RequestMode::Auction)).await;
    h.press(&client, ActionToken::Category(Category::Loader)).await;
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::DescriptionInput));

    h.press(&client, ActionToken::Cancel).await;

    assert!(h.engine.flows().current(CLIENT).await.is_none());
    assert_eq!(h.last_text(CLIENT).await, "Cancelled.");
    assert!(request::get_request(h.db.pool(), 1).await.is_err());

    h.text(&client, "/cancel").await;
    assert_eq!(h.last_text(CLIENT).await, "Nothing to cancel.");
}

#[tokio::test]
async fn test_cancel_at_radius_persists_nothing() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);
    h.start_request(&client, RequestMode::Auction).await;
    h.text(&client, "Moscow, Red Square").await;
    let picks = h.geo_picks(CLIENT).await;
    h.press(&client, picks[0]).await;
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::RadiusInput));

    h.text(&client, "/cancel").await;

    assert!(h.engine.flows().current(CLIENT).await.is_none());
    assert_eq!(h.last_text(CLIENT).await, "Cancelled.");
    assert!(request::get_request(h.db.pool(), 1).await.is_err());

    // A radius after cancelling is not picked up by any flow.
    h.text(&client, "50").await;
    assert!(request::get_request(h.db.pool(), 1).await.is_err());
}

#[tokio::test]
async fn test_cancel_during_offer_persists_nothing() {
    let h = Harness::new().await;
    let exec_id = h.provision(101, 100.0, false, TEN_KM).await;
    let executor = Participant::new(101);
    let client = Participant::new(CLIENT);
    h.publish(&client, RequestMode::Auction, "50").await;
    let respond = ActionToken::Offer {
        request_id: 1,
        executor_id: exec_id,
    };

    h.press(&executor, respond).await;
    h.press(&executor, ActionToken::RateType(RateType::Hourly))
        .await;
    assert_eq!(h.offer_step(101).await, Some(OfferStep::RateValueInput));
    h.press(&executor, ActionToken::Cancel).await;
    assert!(h.engine.flows().current(101).await.is_none());
    assert_eq!(h.last_text(101).await, "Cancelled.");

    h.press(&executor, respond).await;
    h.press(&executor, ActionToken::RateType(RateType::Hourly))
        .await;
    h.text(&executor, "120").await;
    assert_eq!(h.offer_step(101).await, Some(OfferStep::CommentInput));
    h.text(&executor, "/cancel").await;
    assert!(h.engine.flows().current(101).await.is_none());
    assert_eq!(h.last_text(101).await, "Cancelled.");

    assert_eq!(
        offer::count_offers_for_request(h.db.pool(), 1).await.unwrap(),
        0
    );
    let offered = h.sender.messages_to(CLIENT).await.into_iter().any(|m| {
        m.actions
            .iter()
            .any(|a| matches!(a.token, ActionToken::Accept(_)))
    });
    assert!(!offered);
}

#[tokio::test]
async fn test_typed_address_is_redacted_for_executors() {
    let h = Harness::new().await;
    h.provision(101, 100.0, false, TEN_KM).await;
    let client = Participant::new(CLIENT);
    h.start_request(&client, RequestMode::Auction).await;

    h.text(&client, "Lenina 5, call +7 999 123-45-67 or @ivan_builder")
        .await;
    assert!(h.last_text(CLIENT).await.contains("Address not found"));
    h.share(&client, SITE.0, SITE.1).await;
    h.text(&client, "50").await;

    let notice = &h.sender.messages_to(101).await[0].text;
    assert!(notice.contains("Address: Lenina 5, call [[hidden]] or [[hidden]]"));
    assert!(!notice.contains("999"));
    assert!(!notice.contains("ivan_builder"));

    let stored = request::get_request(h.db.pool(), 1).await.unwrap();
    assert_eq!(
        stored.address_text.as_deref(),
        Some("Lenina 5, call [[hidden]] or [[hidden]]")
    );
}

#[tokio::test]
async fn test_stale_geocode_pick_reprompts_address() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);
    h.start_request(&client, RequestMode::Auction).await;

    h.text(&client, "Moscow, Red Square").await;
    let first = h.geo_picks(CLIENT).await;
    assert_eq!(first.len(), 2);
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::GeoDisambiguation));

    // Re-entering the address supersedes the first result set.
    h.text(&client, "Tverskaya 1").await;
    h.press(&client, first[0]).await;
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::AddressInput));
    assert!(h.last_text(CLIENT).await.contains("no longer valid"));

    // Out-of-range index on a current result set.
    h.text(&client, "Tverskaya 1").await;
    let generation = match h.geo_picks(CLIENT).await[0] {
        ActionToken::GeoPick { generation, .. } => generation,
        other => panic!("unexpected token {:?}", other),
    };
    h.press(&client, ActionToken::GeoPick { generation, index: 4 })
        .await;
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::AddressInput));

    h.text(&client, "Atlantis").await;
    assert!(h.last_text(CLIENT).await.contains("Address not found"));
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::AddressInput));
}

#[tokio::test]
async fn test_shared_location_skips_geocoding() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);
    h.start_request(&client, RequestMode::Catalog).await;

    h.share(&client, SITE.0, SITE.1).await;
    assert_eq!(h.step(CLIENT).await, Some(RequestStep::RadiusInput));

    h.text(&client, "25").await;
    let stored = request::get_request(h.db.pool(), 1).await.unwrap();
    assert_eq!(stored.lat, SITE.0);
    assert_eq!(stored.address_text, None);
    assert_eq!(stored.mode.as_deref(), Some("catalog"));
}

#[tokio::test]
async fn test_invalid_radius_reprompts_until_valid() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);
    h.start_request(&client, RequestMode::Auction).await;
    h.text(&client, "Moscow, Red Square").await;
    let picks = h.geo_picks(CLIENT).await;
    h.press(&client, picks[0]).await;

    for bad in ["abc", "0", "-1", "1001"] {
        h.text(&client, bad).await;
        assert_eq!(h.step(CLIENT).await, Some(RequestStep::RadiusInput), "{}", bad);
        assert!(h.last_text(CLIENT).await.contains("between 0 and 1000"));
    }

    h.text(&client, "50,5").await;
    let stored = request::get_request(h.db.pool(), 1).await.unwrap();
    assert_eq!(stored.radius_km, 50.5);
    assert_eq!(stored.address_text.as_deref(), Some("Red Square, Moscow"));
    assert_eq!(stored.description, "Dig a foundation pit");
}

#[tokio::test]
async fn test_offer_accept_releases_contacts() {
    let h = Harness::new().await;
    let exec_id = h.provision(101, 100.0, true, TEN_KM).await;
    let executor = Participant::new(101).with_handle("ivan_builder");
    let client = Participant::new(CLIENT).with_handle("client_joe");

    h.publish(&client, RequestMode::Auction, "50").await;

    h.press(
        &executor,
        ActionToken::Offer {
            request_id: 1,
            executor_id: exec_id,
        },
    )
    .await;
    h.press(&executor, ActionToken::RateType(RateType::Hourly))
        .await;
    h.text(&executor, "many").await;
    assert!(h.last_text(101).await.contains("between 0 and 1000"));
    h.text(&executor, "45,5").await;
    h.text(&executor, "Call me +7 999 123-45-67 or @ivan_builder").await;
    assert_eq!(h.last_text(101).await, "Offer sent to the client.");

    let offer_msg = h.sender.last_to(CLIENT).await.unwrap();
    assert!(offer_msg.text.contains("Call me [[hidden]] or [[hidden]]"));
    assert!(!offer_msg.text.contains("999"));
    assert!(!offer_msg.text.contains("ivan_builder"));
    assert!(offer_msg.actions.iter().any(|a| a.token == ActionToken::Accept(1)));
    assert!(offer_msg.actions.iter().any(|a| a.token == ActionToken::Decline(1)));

    h.press(&client, ActionToken::Accept(1)).await;

    assert!(h.last_text(CLIENT).await.contains("Executor contact: @ivan_builder"));
    assert!(h.last_text(101).await.contains("Client contact: @client_joe"));
    assert_eq!(deal::count_deals(h.db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_double_accept_creates_two_deals() {
    let h = Harness::new().await;
    let exec_id = h.provision(101, 100.0, false, TEN_KM).await;
    let executor = Participant::new(101);
    let client = Participant::new(CLIENT);
    h.publish(&client, RequestMode::Auction, "50").await;

    h.press(
        &executor,
        ActionToken::Offer {
            request_id: 1,
            executor_id: exec_id,
        },
    )
    .await;
    h.text(&executor, "shift").await;
    h.text(&executor, "300").await;
    h.text(&executor, "-").await;

    h.press(&client, ActionToken::Accept(1)).await;
    h.press(&client, ActionToken::Accept(1)).await;

    assert_eq!(deal::count_deals(h.db.pool()).await.unwrap(), 2);
    let offer = h.engine.store().get_offer(1).await.unwrap();
    assert_eq!(offer.status, "accepted");
    assert_eq!(offer.comment, "");
    assert_eq!(offer.rate_type, "shift");
}

#[tokio::test]
async fn test_accepting_unknown_offer_reports_not_found() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);

    h.press(&client, ActionToken::Accept(404)).await;

    assert!(h.last_text(CLIENT).await.starts_with("Not found"));
    assert_eq!(deal::count_deals(h.db.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_declined_offer_cannot_be_accepted() {
    let h = Harness::new().await;
    let exec_id = h.provision(101, 100.0, false, TEN_KM).await;
    let executor = Participant::new(101);
    let client = Participant::new(CLIENT);
    h.publish(&client, RequestMode::Auction, "50").await;

    h.press(
        &executor,
        ActionToken::Offer {
            request_id: 1,
            executor_id: exec_id,
        },
    )
    .await;
    h.press(&executor, ActionToken::RateType(RateType::Fixed))
        .await;
    h.text(&executor, "900").await;
    h.text(&executor, "-").await;

    h.press(&client, ActionToken::Decline(1)).await;
    assert!(h.last_text(101).await.contains("declined"));

    h.press(&client, ActionToken::Accept(1)).await;
    assert_eq!(h.last_text(CLIENT).await, "This offer is already closed.");
    assert_eq!(deal::count_deals(h.db.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delivery_failure_does_not_abort_broadcast() {
    let h = Harness::new().await;
    h.provision(101, 100.0, true, TEN_KM).await;
    h.provision(102, 100.0, false, FIVE_KM).await;
    h.sender.fail_for(101).await;

    let client = Participant::new(CLIENT);
    h.publish(&client, RequestMode::Auction, "50").await;

    assert_eq!(h.sender.messages_to(102).await.len(), 1);
    assert!(h.last_text(CLIENT).await.contains("sent to 1 executor(s)"));
    assert!(request::get_request(h.db.pool(), 1).await.is_ok());
}

#[tokio::test]
async fn test_no_candidates_alerts_admins() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);

    h.publish(&client, RequestMode::Auction, "50").await;

    assert!(h.last_text(CLIENT).await.contains("No matching executors"));
    assert!(h.last_text(ADMIN).await.contains("Request #1 has no matching executors"));
}

#[tokio::test]
async fn test_catalog_lists_candidates_and_requests_offer() {
    let h = Harness::new().await;
    let a = h.provision(101, 100.0, true, TEN_KM).await;
    let b = h.provision(102, 100.0, false, FIVE_KM).await;
    let client = Participant::new(CLIENT);

    h.publish(&client, RequestMode::Catalog, "50").await;

    let to_client = h.sender.messages_to(CLIENT).await;
    let listing = &to_client[to_client.len() - 2];
    assert!(listing
        .text
        .contains(&format!("E-{:05} | Moscow | ~10.0 km | fleet", a)));
    assert!(listing
        .text
        .contains(&format!("E-{:05} | Moscow | ~5.0 km | subcontractor", b)));
    let buttons = &to_client[to_client.len() - 1].actions;
    assert_eq!(
        buttons[0].token,
        ActionToken::RequestOffer {
            request_id: 1,
            executor_id: a
        }
    );
    assert!(h.sender.messages_to(101).await.is_empty());

    h.press(&client, buttons[1].token).await;
    let pushed = h.sender.last_to(102).await.unwrap();
    assert!(pushed.text.contains("Offer requested for request #1"));
    assert!(has_offer_action(&pushed.actions, 1, b));
    assert!(h.last_text(CLIENT).await.contains("Offer request sent"));
}

#[tokio::test]
async fn test_admin_commands_are_ignored_for_others() {
    let h = Harness::new().await;
    let stranger = Participant::new(555);

    h.text(&stranger, r#"/admin add_exec_id 1 "Moscow" 10 "Сварщики""#)
        .await;

    assert!(h.sender.messages_to(555).await.is_empty());
    assert!(h.engine.store().list_executors().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_provisioning_and_listing() {
    let h = Harness::new().await;
    let admin = Participant::new(ADMIN);

    h.text(&admin, r#"/admin add_executor @Ivan_Builder "Tula" "Сварщики, Электрики""#)
        .await;
    assert!(h.last_text(ADMIN).await.contains("known as @Ivan_Builder"));

    h.text(&admin, "/admin list_exec").await;
    let listing = h.last_text(ADMIN).await;
    assert!(listing.contains("E-00001 | @Ivan_Builder"));
    assert!(listing.contains("50 km"));

    h.text(&admin, "/admin active 1 off").await;
    assert!(!h.engine.store().get_executor(1).await.unwrap().is_active);

    h.text(&admin, "/admin prefer_owner off").await;
    assert!(!h.engine.store().prefer_owner_first().await.unwrap());

    h.text(&admin, "/admin add_executor broken").await;
    assert!(h.last_text(ADMIN).await.starts_with("/admin add_executor"));

    // First contact links the provisioned profile.
    let ivan = Participant::new(4242).with_handle("ivan_builder");
    h.text(&ivan, "/me").await;
    assert!(h.last_text(4242).await.contains("Executor profile E-00001"));
}

#[tokio::test]
async fn test_role_selection() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);

    h.text(&client, "/start").await;
    let welcome = h.sender.last_to(CLIENT).await.unwrap();
    assert_eq!(welcome.actions.len(), 2);

    h.text(&client, "I'm a client").await;
    assert!(h.last_text(CLIENT).await.contains("/new_request"));

    h.press(&client, ActionToken::Role(broker::Role::Admin)).await;
    assert!(h.last_text(CLIENT).await.contains("allow-listed"));

    h.text(&Participant::new(ADMIN), "/start").await;
    assert_eq!(h.sender.last_to(ADMIN).await.unwrap().actions.len(), 3);
}

#[tokio::test]
async fn test_my_requests_counts_offers() {
    let h = Harness::new().await;
    let client = Participant::new(CLIENT);

    h.text(&client, "/my_requests").await;
    assert!(h.last_text(CLIENT).await.contains("no requests"));

    h.publish(&client, RequestMode::Auction, "50").await;
    h.engine
        .store()
        .create_offer(1, 77, RateType::Hourly, 10.0, "")
        .await
        .unwrap();

    h.text(&client, "/my_requests").await;
    let summary = h.last_text(CLIENT).await;
    assert!(summary.contains("#1 | Экскаватор"));
    assert!(summary.contains("offers: 1"));
}
