//! Fixed enumerations and the executor profile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::GeoPoint;

/// Equipment or crew category a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Excavator,
    Loader,
    Manipulator,
    TruckCrane,
    DumpTruck,
    ConcreteMixer,
    DemolitionCrew,
    FinishingCrew,
    RebarWorkers,
    Welders,
    Electricians,
    Roofers,
}

impl Category {
    /// Every category, in keyboard order.
    pub const ALL: [Category; 12] = [
        Category::Excavator,
        Category::Loader,
        Category::Manipulator,
        Category::TruckCrane,
        Category::DumpTruck,
        Category::ConcreteMixer,
        Category::DemolitionCrew,
        Category::FinishingCrew,
        Category::RebarWorkers,
        Category::Welders,
        Category::Electricians,
        Category::Roofers,
    ];

    /// The stored and displayed name. Executor tags are matched against it.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excavator => "Экскаватор",
            Self::Loader => "Погрузчик",
            Self::Manipulator => "Манипулятор",
            Self::TruckCrane => "Автокран",
            Self::DumpTruck => "Самосвал",
            Self::ConcreteMixer => "Бетономешалка",
            Self::DemolitionCrew => "Демонтажная бригада",
            Self::FinishingCrew => "Отделочная бригада",
            Self::RebarWorkers => "Арматурщики",
            Self::Welders => "Сварщики",
            Self::Electricians => "Электрики",
            Self::Roofers => "Кровельщики",
        }
    }

    /// Position in [`Category::ALL`].
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a category from its label, ignoring case and surrounding whitespace.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let wanted = text.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().to_lowercase() == wanted)
            .ok_or_else(|| ValidationError::UnknownCategory(text.trim().to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How an offer is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    Hourly,
    Shift,
    Fixed,
}

impl RateType {
    pub const ALL: [RateType; 3] = [RateType::Hourly, RateType::Shift, RateType::Fixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Shift => "shift",
            Self::Fixed => "fixed",
        }
    }

    /// Button caption.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hourly => "Rate per hour",
            Self::Shift => "Rate per shift",
            Self::Fixed => "Fixed price per job",
        }
    }

    /// Accepts the stored name or the legacy Russian unit word.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        match text.trim().to_lowercase().as_str() {
            "hourly" | "hour" | "час" => Ok(Self::Hourly),
            "shift" | "смена" => Ok(Self::Shift),
            "fixed" | "job" | "объект" => Ok(Self::Fixed),
            _ => Err(ValidationError::UnknownRateType(text.trim().to_string())),
        }
    }
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How a request reaches executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Pushed to every matching executor at once.
    #[default]
    Auction,
    /// Client browses ranked candidates and pulls offers one at a time.
    Catalog,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auction => "auction",
            Self::Catalog => "catalog",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Auction => "Auction",
            Self::Catalog => "Catalog",
        }
    }

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        match text.trim().to_lowercase().as_str() {
            "auction" | "аукцион" => Ok(Self::Auction),
            "catalog" | "каталог" => Ok(Self::Catalog),
            _ => Err(ValidationError::UnknownMode(text.trim().to_string())),
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a participant uses the bot as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Executor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Executor => "executor",
            Self::Admin => "admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Client => "I'm a client",
            Self::Executor => "I'm an executor",
            Self::Admin => "Admin",
        }
    }

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let wanted = text.trim().to_lowercase();
        [Self::Client, Self::Executor, Self::Admin]
            .into_iter()
            .find(|r| r.as_str() == wanted || r.label().to_lowercase() == wanted)
            .ok_or_else(|| ValidationError::UnknownRole(text.trim().to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Offer lifecycle: `active -> accepted` or `active -> rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Active,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Unknown stored values read as `Active`, matching rows written before statuses existed.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => Self::Active,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executor as seen by the matcher and the dispatcher.
///
/// A profile can exist before its owner ever contacts the bot: it is then
/// addressed by `pending_handle` or `direct_channel_id` until identity
/// reconciliation links `user_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorProfile {
    pub id: i64,
    pub user_id: Option<i64>,
    pub pending_handle: Option<String>,
    pub direct_channel_id: Option<i64>,
    pub categories: Vec<String>,
    pub city: Option<String>,
    /// Unset means "not yet locatable"; such executors never match.
    pub location: Option<GeoPoint>,
    pub radius_km: f64,
    /// In-house fleet rather than subcontracted.
    pub is_owner: bool,
    pub is_active: bool,
}

impl ExecutorProfile {
    /// Whether the tag set contains the category label.
    pub fn serves(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c.trim() == category)
    }

    /// Split a comma-separated tag list, dropping blanks.
    pub fn parse_tags(csv: &str) -> Vec<String> {
        csv.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Short public code, e.g. `E-00042`. Used wherever the executor stays anonymous.
    pub fn code(&self) -> String {
        format_executor_code(self.id)
    }
}

/// Anonymous executor code, e.g. `E-00042`.
pub fn format_executor_code(id: i64) -> String {
    format!("E-{:05}", id)
}
