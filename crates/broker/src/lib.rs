//! Conversation engine and request lifecycle for the equipment broker bot.
//!
//! This crate provides the [`ConversationEngine`] type which turns inbound
//! chat events into requests, offers and deals, and fans notifications out
//! to the participants involved.
//!
//! # Features
//!
//! - Multi-step flows for role selection, request creation and offer submission
//! - Address lookup with disambiguation through a [`Geocoder`]
//! - Candidate matching with owner-fleet ranking (see [`broker_core::GeoMatcher`])
//! - Contact redaction on every free-text field before it is stored
//! - Contact release to both sides once an offer is accepted
//! - Admin commands behind an injected [`AdminPolicy`]
//!
//! # Architecture
//!
//! ```text
//! InboundEvent (from the transport)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CONVERSATION ENGINE                       │
//! │                                                             │
//! │  1. Reconcile identity (user row, provisioned executors)    │
//! │         ↓                                                   │
//! │  2. Command / button / flow step                            │
//! │         ↓                                                   │
//! │  3. On flow completion:                                     │
//! │     • request → LifecycleStore → candidates → dispatcher    │
//! │     • offer   → LifecycleStore → client                     │
//! │     • accept  → deal → contacts to both sides               │
//! │         ↓                                                   │
//! │  4. Errors → failure message, participant back to idle      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use broker::{ConversationEngine, InboundEvent, LoggingSender, Participant, StaticAdminList, StaticGeocoder};
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite::memory:").await?;
//!     db.migrate().await?;
//!
//!     let engine = ConversationEngine::new(
//!         db,
//!         Arc::new(LoggingSender),
//!         Arc::new(StaticGeocoder::new()),
//!         Arc::new(StaticAdminList::parse("12345")),
//!     );
//!
//!     engine.process(InboundEvent::text(Participant::new(42), "/new_request")).await;
//!     Ok(())
//! }
//! ```

mod action;
mod admin;
mod config;
mod dispatcher;
mod engine;
mod error;
mod event;
mod flow;
mod formatting;
mod geocoder;
mod identity;
mod lifecycle;
mod sender;

// Public exports
pub use action::{Action, ActionToken};
pub use admin::{AdminCommand, AdminPolicy, ExecutorSpec, ProvisionalIdentity, StaticAdminList};
pub use config::{sqlite_url_from_path, BrokerConfig, DEFAULT_EXECUTOR_RADIUS_KM, DEFAULT_GEOCODE_UA};
pub use dispatcher::{NotificationDispatcher, Recipient};
pub use engine::ConversationEngine;
pub use error::BrokerError;
pub use event::{InboundEvent, Participant, Payload};
pub use flow::{FlowKind, FlowState, FlowStore, OfferDraft, OfferStep, RequestDraft, RequestStep};
pub use formatting::{HELP_TEXT, MAX_CATALOG_CANDIDATES, MAX_MESSAGE_CHARS};
pub use geocoder::{
    GeocodeResult, Geocoder, NominatimGeocoder, StaticGeocoder, DEFAULT_GEOCODE_URL,
    MAX_GEOCODE_RESULTS,
};
pub use identity::{declare_role, reconcile_identity};
pub use lifecycle::{executor_profile, LifecycleStore, RankedExecutor};
pub use sender::{LoggingSender, MessageSender, NoOpSender, RecordingSender, SentMessage};

// Re-export commonly used types from dependencies
pub use broker_core::{Category, GeoPoint, OfferStatus, RateType, RequestMode, Role};
pub use database::Database;
