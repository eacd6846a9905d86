//! Button actions and their wire tokens.
//!
//! Every button the bot renders carries an [`ActionToken`], encoded as a short
//! colon-separated string that fits the transport's 64-byte callback limit:
//!
//! | token | meaning |
//! |---|---|
//! | `role:client` | role selection |
//! | `mode:auction` | request mode |
//! | `cat:3` | category by index |
//! | `geo:2:0` | geocode pick: result set generation, index |
//! | `rt:hourly` | rate type |
//! | `offer:12:4` | executor starts an offer on request 12 as executor 4 |
//! | `req_offer:12:4` | client asks executor 4 for an offer on request 12 |
//! | `accept:7` / `decline:7` | client decision on offer 7 |
//! | `cancel` | abort the current flow |

use std::fmt;
use std::str::FromStr;

use broker_core::{Category, RateType, RequestMode, Role};

/// Decoded button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionToken {
    Role(Role),
    Mode(RequestMode),
    Category(Category),
    GeoPick { generation: u32, index: usize },
    RateType(RateType),
    Offer { request_id: i64, executor_id: i64 },
    RequestOffer { request_id: i64, executor_id: i64 },
    Accept(i64),
    Decline(i64),
    Cancel,
}

impl ActionToken {
    /// Wire form of the token.
    pub fn encode(&self) -> String {
        match self {
            Self::Role(role) => format!("role:{}", role.as_str()),
            Self::Mode(mode) => format!("mode:{}", mode.as_str()),
            Self::Category(category) => format!("cat:{}", category.index()),
            Self::GeoPick { generation, index } => format!("geo:{}:{}", generation, index),
            Self::RateType(rate) => format!("rt:{}", rate.as_str()),
            Self::Offer {
                request_id,
                executor_id,
            } => format!("offer:{}:{}", request_id, executor_id),
            Self::RequestOffer {
                request_id,
                executor_id,
            } => format!("req_offer:{}:{}", request_id, executor_id),
            Self::Accept(offer_id) => format!("accept:{}", offer_id),
            Self::Decline(offer_id) => format!("decline:{}", offer_id),
            Self::Cancel => "cancel".to_string(),
        }
    }

    /// Parse a wire token. Unknown or malformed tokens yield `None`.
    pub fn decode(data: &str) -> Option<Self> {
        let mut parts = data.trim().split(':');
        let kind = parts.next()?;
        let args: Vec<&str> = parts.collect();

        let token = match (kind, args.as_slice()) {
            ("role", [role]) => Self::Role(Role::parse(role).ok()?),
            ("mode", [mode]) => Self::Mode(RequestMode::parse(mode).ok()?),
            ("cat", [index]) => Self::Category(Category::from_index(index.parse().ok()?)?),
            ("geo", [generation, index]) => Self::GeoPick {
                generation: generation.parse().ok()?,
                index: index.parse().ok()?,
            },
            ("rt", [rate]) => Self::RateType(RateType::parse(rate).ok()?),
            ("offer", [request, executor]) => Self::Offer {
                request_id: request.parse().ok()?,
                executor_id: executor.parse().ok()?,
            },
            ("req_offer", [request, executor]) => Self::RequestOffer {
                request_id: request.parse().ok()?,
                executor_id: executor.parse().ok()?,
            },
            ("accept", [offer]) => Self::Accept(offer.parse().ok()?),
            ("decline", [offer]) => Self::Decline(offer.parse().ok()?),
            ("cancel", []) => Self::Cancel,
            _ => return None,
        };

        Some(token)
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ActionToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s).ok_or_else(|| format!("unknown action token: {}", s))
    }
}

/// A labelled button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub token: ActionToken,
}

impl Action {
    pub fn new(label: impl Into<String>, token: ActionToken) -> Self {
        Self {
            label: label.into(),
            token,
        }
    }

    /// The "Cancel" button shown under every flow prompt.
    pub fn cancel() -> Self {
        Self::new("Cancel", ActionToken::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_forms() {
        assert_eq!(ActionToken::Role(Role::Executor).encode(), "role:executor");
        assert_eq!(ActionToken::Category(Category::Roofers).encode(), "cat:11");
        assert_eq!(
            ActionToken::GeoPick {
                generation: 3,
                index: 1
            }
            .encode(),
            "geo:3:1"
        );
        assert_eq!(
            ActionToken::RequestOffer {
                request_id: 12,
                executor_id: 4
            }
            .encode(),
            "req_offer:12:4"
        );
        assert_eq!(ActionToken::Cancel.encode(), "cancel");
    }

    #[test]
    fn test_decode_accepts_every_encoded_token() {
        let tokens = [
            ActionToken::Role(Role::Admin),
            ActionToken::Mode(RequestMode::Catalog),
            ActionToken::Category(Category::Excavator),
            ActionToken::GeoPick {
                generation: 0,
                index: 4,
            },
            ActionToken::RateType(RateType::Shift),
            ActionToken::Offer {
                request_id: 1,
                executor_id: 2,
            },
            ActionToken::Accept(99),
            ActionToken::Decline(100),
            ActionToken::Cancel,
        ];
        for token in tokens {
            assert_eq!(ActionToken::decode(&token.encode()), Some(token));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(ActionToken::decode(""), None);
        assert_eq!(ActionToken::decode("cat:12"), None);
        assert_eq!(ActionToken::decode("accept:x"), None);
        assert_eq!(ActionToken::decode("accept:1:2"), None);
        assert_eq!(ActionToken::decode("geo:1"), None);
        assert_eq!(ActionToken::decode("cancel:now"), None);
        assert!("launch:1".parse::<ActionToken>().is_err());
    }
}
