//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A participant, identified by their messaging channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Channel identity (chat id); unique.
    pub channel_id: i64,
    /// Public handle without the leading `@`, if the participant has one.
    pub handle: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// "client", "executor" or "admin"; unset until the participant picks one.
    pub role: Option<String>,
}

/// An executor profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Executor {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Linked user, once the executor has contacted the bot.
    pub user_id: Option<i64>,
    /// Handle the profile was provisioned under, cleared once linked.
    pub pending_handle: Option<String>,
    /// Raw channel id the profile was provisioned under.
    pub direct_channel_id: Option<i64>,
    /// Comma-separated category tags.
    pub categories: String,
    /// Free-form city name.
    pub city: Option<String>,
    /// Home latitude, unset until an admin assigns a location.
    pub lat: Option<f64>,
    /// Home longitude.
    pub lon: Option<f64>,
    /// Service radius in km.
    pub radius_km: f64,
    /// In-house fleet rather than subcontractor.
    pub is_owner: bool,
    /// Participates in matching.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: String,
}

/// Fields for provisioning an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExecutor {
    pub pending_handle: Option<String>,
    pub direct_channel_id: Option<i64>,
    pub categories: Vec<String>,
    pub city: Option<String>,
    pub radius_km: f64,
    pub is_owner: bool,
}

/// A client's published request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Request {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning client (users.id).
    pub client_user_id: i64,
    /// Category label.
    pub category: String,
    /// Contact-redacted description.
    pub description: String,
    /// Resolved address, if one was geocoded.
    pub address_text: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Client's search radius in km.
    pub radius_km: f64,
    /// "auction" or "catalog"; NULL on rows older than the column.
    pub mode: Option<String>,
    /// Always "published".
    pub status: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Fields for creating a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    pub client_user_id: i64,
    pub category: String,
    pub description: String,
    pub address_text: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub mode: String,
}

/// An executor's priced response to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Offer {
    /// Auto-incrementing ID.
    pub id: i64,
    pub request_id: i64,
    pub executor_id: i64,
    /// "hourly", "shift" or "fixed".
    pub rate_type: String,
    pub rate_value: f64,
    /// Contact-redacted comment, possibly empty.
    pub comment: String,
    /// "active", "accepted" or "rejected".
    pub status: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Fields for creating an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub request_id: i64,
    pub executor_id: i64,
    pub rate_type: String,
    pub rate_value: f64,
    pub comment: String,
}

/// The record of an accepted offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Deal {
    /// Auto-incrementing ID.
    pub id: i64,
    pub request_id: i64,
    pub offer_id: i64,
    /// Contacts may be shown to both sides.
    pub contacts_released: bool,
    /// Creation timestamp.
    pub created_at: String,
}
