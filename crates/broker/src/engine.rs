//! Conversation engine: turns inbound events into lifecycle operations.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use broker_core::{
    parse_positive_decimal, redact, Category, GeoPoint, RateType, RequestMode, Role,
};
use database::models::NewExecutor;
use database::{executor, user, Database, DatabaseError, Request, User};
use tracing::{debug, error, info, warn};

use crate::action::{Action, ActionToken};
use crate::admin::{AdminCommand, AdminPolicy, ProvisionalIdentity};
use crate::config::DEFAULT_EXECUTOR_RADIUS_KM;
use crate::dispatcher::{NotificationDispatcher, Recipient};
use crate::error::BrokerError;
use crate::event::{InboundEvent, Payload};
use crate::flow::{
    FlowKind, FlowState, FlowStore, OfferDraft, OfferStep, RequestDraft, RequestStep,
};
use crate::formatting as fmt;
use crate::geocoder::Geocoder;
use crate::identity::{declare_role, reconcile_identity};
use crate::lifecycle::{LifecycleStore, RankedExecutor};
use crate::sender::MessageSender;

/// Input to an in-flight flow.
#[derive(Debug, Clone, Copy)]
enum FlowInput<'a> {
    Text(&'a str),
    Action(ActionToken),
    Location(GeoPoint),
}

/// Per-participant state machine over role selection, request creation,
/// offer submission and admin location assignment.
///
/// Events of one participant must be fed in arrival order; events of
/// different participants may be processed concurrently.
pub struct ConversationEngine<S: MessageSender> {
    db: Database,
    store: LifecycleStore,
    flows: FlowStore,
    dispatcher: NotificationDispatcher<S>,
    sender: Arc<S>,
    geocoder: Arc<dyn Geocoder>,
    admins: Arc<dyn AdminPolicy>,
    default_executor_radius_km: f64,
    geocode_generation: AtomicU32,
}

impl<S: MessageSender> ConversationEngine<S> {
    pub fn new(
        db: Database,
        sender: Arc<S>,
        geocoder: Arc<dyn Geocoder>,
        admins: Arc<dyn AdminPolicy>,
    ) -> Self {
        Self {
            store: LifecycleStore::new(db.clone()),
            dispatcher: NotificationDispatcher::new(sender.clone(), db.clone()),
            db,
            flows: FlowStore::new(),
            sender,
            geocoder,
            admins,
            default_executor_radius_km: DEFAULT_EXECUTOR_RADIUS_KM,
            geocode_generation: AtomicU32::new(1),
        }
    }

    /// Radius given to executors provisioned without one.
    pub fn with_default_executor_radius(mut self, radius_km: f64) -> Self {
        self.default_executor_radius_km = radius_km;
        self
    }

    pub fn store(&self) -> &LifecycleStore {
        &self.store
    }

    pub fn flows(&self) -> &FlowStore {
        &self.flows
    }

    /// Handle one inbound event end-to-end.
    ///
    /// Never fails: errors are reported to the participant, whose flows are
    /// then cleared.
    pub async fn process(&self, event: InboundEvent) {
        let channel_id = event.channel_id();

        if let Err(e) = self.handle(&event).await {
            let reply = match &e {
                BrokerError::NotFound { .. } => {
                    info!(channel_id, "{}", e);
                    fmt::NOT_FOUND
                }
                BrokerError::InvalidTransition { .. } => {
                    info!(channel_id, "{}", e);
                    fmt::OFFER_CLOSED
                }
                _ => {
                    error!(channel_id, "Failed to process event: {}", e);
                    fmt::APOLOGY
                }
            };
            self.flows.clear_all(channel_id).await;
            self.reply(channel_id, reply, &[]).await;
        }
    }

    async fn handle(&self, event: &InboundEvent) -> Result<(), BrokerError> {
        let user = reconcile_identity(&self.db, &event.participant, self.admins.as_ref()).await?;

        match &event.payload {
            Payload::Text(text) => self.on_text(&user, text.trim()).await,
            Payload::Action(token) => self.on_action(&user, *token).await,
            Payload::Location(point) => self.continue_flow(&user, FlowInput::Location(*point)).await,
        }
    }

    /// Send to the participant; failures are logged only.
    async fn reply(&self, channel_id: i64, text: &str, actions: &[Action]) {
        if let Err(e) = self.sender.send_message(channel_id, text, actions).await {
            warn!(channel_id, "Failed to reply: {}", e);
        }
    }

    async fn on_text(&self, user: &User, text: &str) -> Result<(), BrokerError> {
        if !text.starts_with('/') {
            return self.continue_flow(user, FlowInput::Text(text)).await;
        }

        let (command, args) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        // Group chats append the bot name: /start@broker_bot
        let command = command.split('@').next().unwrap_or(command);
        debug!(user_id = user.id, command, "Command");

        match command {
            "/start" => self.start(user).await,
            "/new_request" => self.new_request(user).await,
            "/cancel" => self.cancel(user).await,
            "/me" => self.me(user).await,
            "/my_requests" => self.my_requests(user).await,
            "/admin" => self.admin(user, args).await,
            "/help" => {
                self.reply(user.channel_id, fmt::HELP_TEXT, &[]).await;
                Ok(())
            }
            _ => {
                self.reply(user.channel_id, fmt::UNKNOWN_INPUT, &[]).await;
                Ok(())
            }
        }
    }

    async fn on_action(&self, user: &User, token: ActionToken) -> Result<(), BrokerError> {
        debug!(user_id = user.id, action = %token, "Action");

        match token {
            ActionToken::Cancel => self.cancel(user).await,
            ActionToken::Role(role) => self.select_role(user, role).await,
            ActionToken::Offer {
                request_id,
                executor_id,
            } => self.start_offer(user, request_id, executor_id).await,
            ActionToken::RequestOffer {
                request_id,
                executor_id,
            } => self.request_offer(user, request_id, executor_id).await,
            ActionToken::Accept(offer_id) => self.accept(user, offer_id).await,
            ActionToken::Decline(offer_id) => self.decline(user, offer_id).await,
            ActionToken::Mode(_)
            | ActionToken::Category(_)
            | ActionToken::GeoPick { .. }
            | ActionToken::RateType(_) => self.continue_flow(user, FlowInput::Action(token)).await,
        }
    }

    async fn continue_flow(&self, user: &User, input: FlowInput<'_>) -> Result<(), BrokerError> {
        match self.flows.current(user.channel_id).await {
            Some(FlowState::RoleSelect) => self.role_step(user, input).await,
            Some(FlowState::Request(draft)) => self.request_step(user, draft, input).await,
            Some(FlowState::Offer(draft)) => self.offer_step(user, draft, input).await,
            Some(FlowState::LocationAssignment { executor_id }) => {
                self.location_step(user, executor_id, input).await
            }
            None => {
                let text = match input {
                    FlowInput::Action(_) => fmt::STALE_BUTTON,
                    _ => fmt::UNKNOWN_INPUT,
                };
                self.reply(user.channel_id, text, &[]).await;
                Ok(())
            }
        }
    }

    async fn cancel(&self, user: &User) -> Result<(), BrokerError> {
        let text = if self.flows.clear_all(user.channel_id).await {
            debug!(user_id = user.id, "Flow cancelled");
            fmt::CANCELLED
        } else {
            fmt::NOTHING_TO_CANCEL
        };
        self.reply(user.channel_id, text, &[]).await;
        Ok(())
    }

    // ---- role selection ----

    fn role_actions(&self, user: &User) -> Vec<Action> {
        let mut roles = vec![Role::Client, Role::Executor];
        if self.admins.is_admin(user.channel_id) {
            roles.push(Role::Admin);
        }
        roles
            .into_iter()
            .map(|role| Action::new(role.label(), ActionToken::Role(role)))
            .collect()
    }

    async fn start(&self, user: &User) -> Result<(), BrokerError> {
        self.flows.begin(user.channel_id, FlowState::RoleSelect).await;
        self.reply(user.channel_id, fmt::WELCOME, &self.role_actions(user))
            .await;
        Ok(())
    }

    async fn role_step(&self, user: &User, input: FlowInput<'_>) -> Result<(), BrokerError> {
        let picked = match input {
            FlowInput::Text(text) => Role::parse(text).ok(),
            FlowInput::Action(ActionToken::Role(role)) => Some(role),
            _ => None,
        };

        match picked {
            Some(role) => self.select_role(user, role).await,
            None => {
                self.reply(user.channel_id, fmt::PICK_BUTTON, &self.role_actions(user))
                    .await;
                Ok(())
            }
        }
    }

    async fn select_role(&self, user: &User, role: Role) -> Result<(), BrokerError> {
        self.flows.clear(user.channel_id, FlowKind::RoleSelect).await;

        match declare_role(&self.db, user, role, self.admins.as_ref()).await {
            Ok(_) => {}
            Err(BrokerError::Unauthorized(reason)) => {
                warn!(user_id = user.id, "Rejected role change: {}", reason);
                self.reply(user.channel_id, fmt::ADMIN_ONLY, &[]).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let text = match role {
            Role::Client => fmt::CLIENT_READY.to_string(),
            Role::Executor => fmt::EXECUTOR_READY.to_string(),
            Role::Admin => fmt::admin_help(),
        };
        self.reply(user.channel_id, &text, &[]).await;
        Ok(())
    }

    // ---- request creation ----

    async fn new_request(&self, user: &User) -> Result<(), BrokerError> {
        let draft = RequestDraft::new();
        let (text, actions) = self.request_prompt(&draft);
        self.flows
            .begin(user.channel_id, FlowState::Request(draft))
            .await;
        self.reply(user.channel_id, &text, &actions).await;
        Ok(())
    }

    /// The prompt for the draft's current step.
    fn request_prompt(&self, draft: &RequestDraft) -> (String, Vec<Action>) {
        let mut actions: Vec<Action> = match draft.step {
            RequestStep::ModeSelect => [RequestMode::Auction, RequestMode::Catalog]
                .into_iter()
                .map(|mode| Action::new(mode.label(), ActionToken::Mode(mode)))
                .collect(),
            RequestStep::CategorySelect => Category::ALL
                .into_iter()
                .map(|category| Action::new(category.label(), ActionToken::Category(category)))
                .collect(),
            RequestStep::GeoDisambiguation => draft
                .geocode_results
                .iter()
                .enumerate()
                .map(|(index, result)| {
                    Action::new(
                        fmt::button_label(&result.display_name),
                        ActionToken::GeoPick {
                            generation: draft.geocode_generation,
                            index,
                        },
                    )
                })
                .collect(),
            _ => Vec::new(),
        };
        actions.push(Action::cancel());

        let text = match draft.step {
            RequestStep::ModeSelect => fmt::ASK_MODE,
            RequestStep::CategorySelect => fmt::ASK_CATEGORY,
            RequestStep::DescriptionInput => fmt::ASK_DESCRIPTION,
            RequestStep::AddressInput => fmt::ASK_ADDRESS,
            RequestStep::GeoDisambiguation => fmt::PICK_ADDRESS,
            RequestStep::RadiusInput => fmt::ASK_RADIUS,
        };
        (text.to_string(), actions)
    }

    /// Store the draft and show the prompt for its step, prefixed by `notice`.
    async fn save_and_prompt(
        &self,
        user: &User,
        draft: RequestDraft,
        notice: Option<&str>,
    ) -> Result<(), BrokerError> {
        let (prompt, actions) = self.request_prompt(&draft);
        let text = match notice {
            Some(notice) => format!("{}\n{}", notice, prompt),
            None => prompt,
        };
        self.flows
            .update(user.channel_id, FlowState::Request(draft))
            .await;
        self.reply(user.channel_id, &text, &actions).await;
        Ok(())
    }

    async fn request_step(
        &self,
        user: &User,
        mut draft: RequestDraft,
        input: FlowInput<'_>,
    ) -> Result<(), BrokerError> {
        use RequestStep::*;

        match (draft.step, input) {
            (ModeSelect, FlowInput::Action(ActionToken::Mode(mode))) => {
                draft.mode = mode;
                draft.step = CategorySelect;
                self.save_and_prompt(user, draft, None).await
            }
            (ModeSelect, FlowInput::Text(text)) => match RequestMode::parse(text) {
                Ok(mode) => {
                    draft.mode = mode;
                    draft.step = CategorySelect;
                    self.save_and_prompt(user, draft, None).await
                }
                Err(e) => {
                    debug!(user_id = user.id, "Re-prompting mode: {}", e);
                    self.save_and_prompt(user, draft, Some(fmt::PICK_BUTTON)).await
                }
            },
            (CategorySelect, FlowInput::Action(ActionToken::Category(category))) => {
                draft.category = Some(category);
                draft.step = DescriptionInput;
                self.save_and_prompt(user, draft, None).await
            }
            (CategorySelect, FlowInput::Text(text)) => match Category::parse(text) {
                Ok(category) => {
                    draft.category = Some(category);
                    draft.step = DescriptionInput;
                    self.save_and_prompt(user, draft, None).await
                }
                Err(e) => {
                    debug!(user_id = user.id, "Re-prompting category: {}", e);
                    self.save_and_prompt(user, draft, Some(fmt::PICK_BUTTON)).await
                }
            },
            (DescriptionInput, FlowInput::Text(text)) => {
                let description = redact(text.trim());
                if description.trim().is_empty() {
                    self.reply(user.channel_id, fmt::EMPTY_DESCRIPTION, &[Action::cancel()])
                        .await;
                    return Ok(());
                }
                draft.description = Some(description);
                draft.step = AddressInput;
                self.save_and_prompt(user, draft, None).await
            }
            (AddressInput | GeoDisambiguation, FlowInput::Text(text)) => {
                self.lookup_address(user, draft, text).await
            }
            (AddressInput | GeoDisambiguation, FlowInput::Location(point)) => {
                draft.location = Some(point);
                draft.resolved_address = None;
                draft.geocode_results.clear();
                draft.step = RadiusInput;
                self.save_and_prompt(user, draft, None).await
            }
            (
                AddressInput | GeoDisambiguation | RadiusInput,
                FlowInput::Action(ActionToken::GeoPick { generation, index }),
            ) => {
                let picked = (draft.step == GeoDisambiguation
                    && generation == draft.geocode_generation)
                    .then(|| draft.geocode_results.get(index).cloned())
                    .flatten();

                match picked {
                    Some(result) => {
                        debug!(user_id = user.id, address = %result.display_name, "Address picked");
                        draft.location = Some(result.location);
                        draft.resolved_address = Some(result.display_name);
                        draft.geocode_results.clear();
                        draft.step = RadiusInput;
                        self.save_and_prompt(user, draft, None).await
                    }
                    None => {
                        debug!(user_id = user.id, generation, index, "Stale address pick");
                        draft.geocode_results.clear();
                        draft.location = None;
                        draft.resolved_address = None;
                        draft.step = AddressInput;
                        self.flows
                            .update(user.channel_id, FlowState::Request(draft))
                            .await;
                        self.reply(user.channel_id, fmt::STALE_PICK, &[Action::cancel()])
                            .await;
                        Ok(())
                    }
                }
            }
            (RadiusInput, FlowInput::Text(text)) => match parse_positive_decimal(text, "radius") {
                Ok(radius_km) => self.complete_request(user, draft, radius_km).await,
                Err(e) => {
                    debug!(user_id = user.id, "Re-prompting radius: {}", e);
                    self.reply(user.channel_id, fmt::BAD_RADIUS, &[Action::cancel()])
                        .await;
                    Ok(())
                }
            },
            _ => self.save_and_prompt(user, draft, None).await,
        }
    }

    async fn lookup_address(
        &self,
        user: &User,
        mut draft: RequestDraft,
        query: &str,
    ) -> Result<(), BrokerError> {
        let results = self.geocoder.search(query).await;
        draft.address = Some(query.to_string());
        draft.location = None;
        draft.resolved_address = None;

        if results.is_empty() {
            draft.geocode_results.clear();
            draft.step = RequestStep::AddressInput;
            self.flows
                .update(user.channel_id, FlowState::Request(draft))
                .await;
            self.reply(user.channel_id, fmt::ADDRESS_NOT_FOUND, &[Action::cancel()])
                .await;
            return Ok(());
        }

        draft.geocode_generation = self.geocode_generation.fetch_add(1, Ordering::Relaxed);
        draft.geocode_results = results;
        draft.step = RequestStep::GeoDisambiguation;
        self.save_and_prompt(user, draft, None).await
    }

    async fn complete_request(
        &self,
        user: &User,
        draft: RequestDraft,
        radius_km: f64,
    ) -> Result<(), BrokerError> {
        self.flows
            .clear(user.channel_id, FlowKind::RequestCreation)
            .await;

        let category = draft
            .category
            .ok_or(broker_core::ValidationError::Empty("category"))?;
        let description = draft
            .description
            .ok_or(broker_core::ValidationError::Empty("description"))?;
        let location = draft
            .location
            .ok_or(broker_core::ValidationError::Empty("location"))?;
        let address = draft.resolved_address.or(draft.address);

        let request_id = self
            .store
            .create_request(
                user.id,
                category,
                &description,
                address.as_deref(),
                location,
                radius_km,
                draft.mode,
            )
            .await?;
        self.reply(user.channel_id, &fmt::request_created(request_id), &[])
            .await;

        let request = self.store.get_request(request_id).await?;
        let candidates = self.store.candidates_for(request_id).await?;
        info!(request_id, candidates = candidates.len(), mode = %draft.mode, "Matched request");

        match draft.mode {
            RequestMode::Auction => self.broadcast(user, &request, &candidates).await,
            RequestMode::Catalog => self.show_catalog(user, &request, &candidates).await,
        }
        Ok(())
    }

    /// Push the request to every candidate; alert admins when there are none.
    async fn broadcast(&self, user: &User, request: &Request, candidates: &[RankedExecutor]) {
        if candidates.is_empty() {
            self.reply(user.channel_id, fmt::NO_CANDIDATES_AUCTION, &[])
                .await;
            let admins: Vec<Recipient> = self
                .admins
                .admin_channels()
                .into_iter()
                .map(Recipient::Channel)
                .collect();
            self.dispatcher
                .notify_all(&admins, &fmt::unmatched_request_alert(request), &[])
                .await;
            return;
        }

        let mut delivered = 0;
        for ranked in candidates {
            let executor_id = ranked.candidate.executor_id;
            let text = fmt::request_for_executor(request, Some(ranked.candidate.distance_km), false);
            let respond = Action::new(
                fmt::respond_label(request.id),
                ActionToken::Offer {
                    request_id: request.id,
                    executor_id,
                },
            );
            if self
                .dispatcher
                .notify(&Recipient::executor(&ranked.profile), &text, &[respond])
                .await
            {
                delivered += 1;
            }
        }

        info!(request_id = request.id, delivered, total = candidates.len(), "Request broadcast");
        self.reply(user.channel_id, &fmt::request_broadcast(delivered), &[])
            .await;
    }

    async fn show_catalog(&self, user: &User, request: &Request, candidates: &[RankedExecutor]) {
        if candidates.is_empty() {
            self.reply(user.channel_id, fmt::NO_CANDIDATES_CATALOG, &[])
                .await;
            return;
        }

        let actions: Vec<Action> = candidates
            .iter()
            .take(fmt::MAX_CATALOG_CANDIDATES)
            .map(|ranked| {
                Action::new(
                    fmt::request_offer_label(ranked.candidate.executor_id),
                    ActionToken::RequestOffer {
                        request_id: request.id,
                        executor_id: ranked.candidate.executor_id,
                    },
                )
            })
            .collect();

        self.reply(user.channel_id, &fmt::candidate_list(candidates), &[])
            .await;
        self.reply(user.channel_id, fmt::PICK_CANDIDATE, &actions)
            .await;
    }

    /// Client picked an executor from the catalog.
    async fn request_offer(
        &self,
        user: &User,
        request_id: i64,
        executor_id: i64,
    ) -> Result<(), BrokerError> {
        let request = self.store.get_request(request_id).await?;
        let profile = self.store.get_executor(executor_id).await?;

        let distance_km = profile
            .location
            .map(|at| GeoPoint::new(request.lat, request.lon).distance_km(&at));
        let text = fmt::request_for_executor(&request, distance_km, true);
        let respond = Action::new(
            fmt::respond_label(request_id),
            ActionToken::Offer {
                request_id,
                executor_id,
            },
        );

        let reply = if self
            .dispatcher
            .notify(&Recipient::executor(&profile), &text, &[respond])
            .await
        {
            info!(request_id, executor_id, "Offer requested");
            fmt::offer_requested(executor_id)
        } else {
            fmt::OFFER_REQUEST_UNDELIVERED.to_string()
        };
        self.reply(user.channel_id, &reply, &[]).await;
        Ok(())
    }

    // ---- offer submission ----

    fn rate_actions() -> Vec<Action> {
        let mut actions: Vec<Action> = RateType::ALL
            .into_iter()
            .map(|rate| Action::new(rate.label(), ActionToken::RateType(rate)))
            .collect();
        actions.push(Action::cancel());
        actions
    }

    async fn start_offer(
        &self,
        user: &User,
        request_id: i64,
        executor_id: i64,
    ) -> Result<(), BrokerError> {
        self.store.get_request(request_id).await?;

        self.flows
            .begin(
                user.channel_id,
                FlowState::Offer(OfferDraft::new(request_id, executor_id)),
            )
            .await;
        self.reply(
            user.channel_id,
            &fmt::offer_prompt(request_id),
            &Self::rate_actions(),
        )
        .await;
        Ok(())
    }

    async fn offer_step(
        &self,
        user: &User,
        mut draft: OfferDraft,
        input: FlowInput<'_>,
    ) -> Result<(), BrokerError> {
        let rate_type = match (draft.step, input) {
            (OfferStep::RateTypeSelect, FlowInput::Action(ActionToken::RateType(rate))) => {
                Some(rate)
            }
            (OfferStep::RateTypeSelect, FlowInput::Text(text)) => RateType::parse(text).ok(),
            _ => None,
        };

        match (draft.step, input) {
            (OfferStep::RateTypeSelect, _) => match rate_type {
                Some(rate) => {
                    draft.rate_type = Some(rate);
                    draft.step = OfferStep::RateValueInput;
                    self.flows
                        .update(user.channel_id, FlowState::Offer(draft))
                        .await;
                    self.reply(user.channel_id, fmt::ASK_RATE_VALUE, &[Action::cancel()])
                        .await;
                }
                None => {
                    self.reply(user.channel_id, fmt::ASK_RATE_TYPE, &Self::rate_actions())
                        .await;
                }
            },
            (OfferStep::RateValueInput, FlowInput::Text(text)) => {
                match parse_positive_decimal(text, "rate") {
                    Ok(value) => {
                        draft.rate_value = Some(value);
                        draft.step = OfferStep::CommentInput;
                        self.flows
                            .update(user.channel_id, FlowState::Offer(draft))
                            .await;
                        self.reply(user.channel_id, fmt::ASK_COMMENT, &[Action::cancel()])
                            .await;
                    }
                    Err(e) => {
                        debug!(user_id = user.id, "Re-prompting rate: {}", e);
                        self.reply(user.channel_id, fmt::BAD_RATE, &[Action::cancel()])
                            .await;
                    }
                }
            }
            (OfferStep::CommentInput, FlowInput::Text(text)) => {
                let comment = if text.trim() == "-" { "" } else { text };
                return self.complete_offer(user, draft, comment).await;
            }
            (OfferStep::RateValueInput, _) => {
                self.reply(user.channel_id, fmt::ASK_RATE_VALUE, &[Action::cancel()])
                    .await;
            }
            (OfferStep::CommentInput, _) => {
                self.reply(user.channel_id, fmt::ASK_COMMENT, &[Action::cancel()])
                    .await;
            }
        }
        Ok(())
    }

    async fn complete_offer(
        &self,
        user: &User,
        draft: OfferDraft,
        comment: &str,
    ) -> Result<(), BrokerError> {
        self.flows
            .clear(user.channel_id, FlowKind::OfferSubmission)
            .await;

        let rate_type = draft
            .rate_type
            .ok_or(broker_core::ValidationError::Empty("rate type"))?;
        let rate_value = draft
            .rate_value
            .ok_or(broker_core::ValidationError::Empty("rate"))?;

        let offer_id = self
            .store
            .create_offer(
                draft.request_id,
                draft.executor_id,
                rate_type,
                rate_value,
                comment,
            )
            .await?;
        let offer = self.store.get_offer(offer_id).await?;

        match self.store.get_request(draft.request_id).await {
            Ok(request) => {
                let actions = [
                    Action::new(fmt::accept_label(offer_id), ActionToken::Accept(offer_id)),
                    Action::new(fmt::decline_label(offer_id), ActionToken::Decline(offer_id)),
                ];
                self.dispatcher
                    .notify(
                        &Recipient::User(request.client_user_id),
                        &fmt::offer_for_client(&offer, rate_type.label()),
                        &actions,
                    )
                    .await;
            }
            Err(BrokerError::NotFound { .. }) => {
                warn!(offer_id, request_id = draft.request_id, "Offer for unknown request");
            }
            Err(e) => return Err(e),
        }

        self.reply(user.channel_id, fmt::OFFER_SENT, &[]).await;
        Ok(())
    }

    // ---- decisions ----

    async fn accept(&self, user: &User, offer_id: i64) -> Result<(), BrokerError> {
        let deal_id = self.store.accept_offer(offer_id).await?;
        let offer = self.store.get_offer(offer_id).await?;

        let profile = match self.store.get_executor(offer.executor_id).await {
            Ok(profile) => Some(profile),
            Err(BrokerError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let executor_contact = match profile.as_ref().and_then(|p| p.user_id) {
            Some(user_id) => {
                let linked = user::get_user(self.db.pool(), user_id).await?;
                fmt::executor_contact(linked.handle.as_deref(), Some(linked.channel_id))
            }
            None => fmt::executor_contact(None, profile.as_ref().and_then(|p| p.direct_channel_id)),
        };
        self.reply(
            user.channel_id,
            &fmt::deal_for_client(deal_id, &executor_contact),
            &[],
        )
        .await;

        let client = match self.store.get_request(offer.request_id).await {
            Ok(request) => user::get_user(self.db.pool(), request.client_user_id).await?,
            Err(BrokerError::NotFound { .. }) => user.clone(),
            Err(e) => return Err(e),
        };
        if let Some(profile) = profile {
            let contact = fmt::client_contact(client.handle.as_deref(), client.channel_id);
            self.dispatcher
                .notify(
                    &Recipient::executor(&profile),
                    &fmt::deal_for_executor(offer.request_id, &contact),
                    &[],
                )
                .await;
        }
        Ok(())
    }

    async fn decline(&self, user: &User, offer_id: i64) -> Result<(), BrokerError> {
        let offer = self.store.reject_offer(offer_id).await?;
        self.reply(user.channel_id, &fmt::offer_declined_for_client(offer_id), &[])
            .await;

        match self.store.get_executor(offer.executor_id).await {
            Ok(profile) => {
                self.dispatcher
                    .notify(
                        &Recipient::executor(&profile),
                        &fmt::offer_declined_for_executor(offer.request_id),
                        &[],
                    )
                    .await;
            }
            Err(BrokerError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }

    // ---- views ----

    async fn me(&self, user: &User) -> Result<(), BrokerError> {
        let text = match self.store.executor_for_user(user.id).await? {
            Some(profile) => fmt::executor_profile(&profile),
            None => fmt::NO_EXECUTOR_PROFILE.to_string(),
        };
        self.reply(user.channel_id, &text, &[]).await;
        Ok(())
    }

    async fn my_requests(&self, user: &User) -> Result<(), BrokerError> {
        let requests = self.store.list_requests_for_client(user.id).await?;
        if requests.is_empty() {
            self.reply(user.channel_id, fmt::NO_REQUESTS, &[]).await;
            return Ok(());
        }

        let mut rows = Vec::with_capacity(requests.len());
        for request in requests {
            let offers = self.store.count_offers(request.id).await?;
            rows.push((request, offers));
        }
        self.reply(user.channel_id, &fmt::client_requests(&rows), &[])
            .await;
        Ok(())
    }

    // ---- admin ----

    async fn admin(&self, user: &User, args: &str) -> Result<(), BrokerError> {
        if !self.admins.is_admin(user.channel_id) {
            debug!(user_id = user.id, "Ignoring admin command from non-admin");
            return Ok(());
        }

        let command = match AdminCommand::parse(args) {
            Ok(command) => command,
            Err(usage) => {
                self.reply(user.channel_id, usage, &[]).await;
                return Ok(());
            }
        };
        info!(user_id = user.id, ?command, "Admin command");

        let text = match command {
            AdminCommand::Help => fmt::admin_help(),
            AdminCommand::PreferOwner(value) => {
                self.store.set_prefer_owner_first(value).await?;
                fmt::prefer_owner_changed(value)
            }
            AdminCommand::AddExecutor(spec) => {
                let (pending_handle, direct_channel_id) = match &spec.identity {
                    ProvisionalIdentity::Handle(handle) => (Some(handle.clone()), None),
                    ProvisionalIdentity::ChannelId(id) => (None, Some(*id)),
                };
                let new = NewExecutor {
                    pending_handle,
                    direct_channel_id,
                    categories: spec.categories.clone(),
                    city: Some(spec.city.clone()),
                    radius_km: spec.radius_km.unwrap_or(self.default_executor_radius_km),
                    is_owner: spec.is_owner,
                };

                match executor::create_executor(self.db.pool(), &new).await {
                    Ok(executor_id) => match spec.identity {
                        ProvisionalIdentity::Handle(handle) => {
                            fmt::executor_added_by_handle(executor_id, &handle)
                        }
                        ProvisionalIdentity::ChannelId(channel_id) => {
                            fmt::executor_added_by_id(executor_id, channel_id)
                        }
                    },
                    Err(DatabaseError::Invalid { source, .. }) => {
                        format!("Invalid executor: {}", source)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            AdminCommand::ListExecutors => {
                let profiles = self.store.list_executors().await?;
                if profiles.is_empty() {
                    fmt::NO_EXECUTORS.to_string()
                } else {
                    fmt::executor_list(&profiles)
                }
            }
            AdminCommand::SetLocation { executor_id } => {
                self.store.get_executor(executor_id).await?;
                self.flows
                    .begin(
                        user.channel_id,
                        FlowState::LocationAssignment { executor_id },
                    )
                    .await;
                self.reply(user.channel_id, fmt::SHARE_LOCATION, &[Action::cancel()])
                    .await;
                return Ok(());
            }
            AdminCommand::SetActive {
                executor_id,
                active,
            } => {
                executor::set_active(self.db.pool(), executor_id, active).await?;
                fmt::active_changed(executor_id, active)
            }
            AdminCommand::Assign {
                request_id,
                executor_id,
            } => {
                let request = self.store.get_request(request_id).await?;
                let profile = self.store.get_executor(executor_id).await?;
                let distance_km = profile
                    .location
                    .map(|at| GeoPoint::new(request.lat, request.lon).distance_km(&at));
                let respond = Action::new(
                    fmt::respond_label(request_id),
                    ActionToken::Offer {
                        request_id,
                        executor_id,
                    },
                );
                let delivered = self
                    .dispatcher
                    .notify(
                        &Recipient::executor(&profile),
                        &fmt::request_for_executor(&request, distance_km, false),
                        &[respond],
                    )
                    .await;
                if delivered {
                    fmt::ASSIGNED.to_string()
                } else {
                    fmt::ASSIGN_UNDELIVERED.to_string()
                }
            }
        };

        self.reply(user.channel_id, &text, &[]).await;
        Ok(())
    }

    async fn location_step(
        &self,
        user: &User,
        executor_id: i64,
        input: FlowInput<'_>,
    ) -> Result<(), BrokerError> {
        let FlowInput::Location(point) = input else {
            self.reply(user.channel_id, fmt::NEED_LOCATION, &[Action::cancel()])
                .await;
            return Ok(());
        };

        executor::set_location(self.db.pool(), executor_id, point.lat, point.lon).await?;
        self.flows
            .clear(user.channel_id, FlowKind::LocationAssignment)
            .await;
        info!(executor_id, lat = point.lat, lon = point.lon, "Executor location set");

        self.reply(user.channel_id, &fmt::location_updated(executor_id), &[])
            .await;
        Ok(())
    }
}
