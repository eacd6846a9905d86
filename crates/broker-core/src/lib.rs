//! Core domain for the construction equipment broker.
//!
//! This crate holds everything that does not need I/O:
//!
//! - [`Category`], [`RateType`], [`RequestMode`], [`Role`], [`OfferStatus`] - fixed enumerations
//! - [`GeoPoint`] and [`ExecutorProfile`] - what the matcher works on
//! - [`GeoMatcher`] - filters and ranks executors for a request
//! - [`redact`] - strips phone numbers, handles and links from free text
//! - [`parse_positive_decimal`] - the numeric input rule shared by radius and rate prompts
//!
//! # Example
//!
//! ```rust
//! use broker_core::{Category, ExecutorProfile, GeoMatcher, GeoPoint, MatchRequest};
//!
//! let site = GeoPoint::new(55.75, 37.62);
//! let executor = ExecutorProfile {
//!     id: 1,
//!     categories: vec![Category::Excavator.label().to_string()],
//!     location: Some(GeoPoint::new(55.80, 37.62)),
//!     radius_km: 100.0,
//!     ..ExecutorProfile::default()
//! };
//!
//! let request = MatchRequest::new(Category::Excavator, site, 50.0);
//! let candidates = GeoMatcher::new(true).find_candidates(&request, &[executor]);
//! assert_eq!(candidates.len(), 1);
//! ```

mod error;
mod geo;
mod matcher;
mod parse;
mod redact;
mod types;

pub use error::ValidationError;
pub use geo::{haversine_km, GeoPoint, EARTH_RADIUS_KM};
pub use matcher::{Candidate, GeoMatcher, MatchRequest};
pub use parse::{parse_positive_decimal, MAX_DECIMAL_INPUT};
pub use redact::{redact, REDACTED_PLACEHOLDER};
pub use types::{
    format_executor_code, Category, ExecutorProfile, OfferStatus, RateType, RequestMode, Role,
};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
