//! Admin allow-list and admin command parsing.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use broker_core::{parse_positive_decimal, ExecutorProfile};
use regex::Regex;
use tracing::warn;

/// Capability check for admin-only operations.
pub trait AdminPolicy: Send + Sync {
    /// Whether the participant with this channel identity is an admin.
    fn is_admin(&self, channel_id: i64) -> bool;

    /// Channels to alert about operational events.
    fn admin_channels(&self) -> Vec<i64>;
}

/// Fixed set of admin identities, usually from `ADMIN_IDS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAdminList {
    ids: BTreeSet<i64>,
}

impl StaticAdminList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Parse a comma-separated id list. Entries that are not integers are skipped.
    pub fn parse(csv: &str) -> Self {
        let ids = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("Ignoring malformed admin id {:?}", s);
                    None
                }
            });
        Self::new(ids)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl AdminPolicy for StaticAdminList {
    fn is_admin(&self, channel_id: i64) -> bool {
        self.ids.contains(&channel_id)
    }

    fn admin_channels(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }
}

/// Usage lines shown for `/admin` without arguments and on parse errors.
pub const ADD_EXECUTOR_USAGE: &str =
    "/admin add_executor @handle \"City\" 50 \"cat1,cat2\" [--owner]";
pub const ADD_EXEC_ID_USAGE: &str =
    "/admin add_exec_id 123456789 \"City\" 50 \"cat1,cat2\" [--owner]";
pub const PREFER_OWNER_USAGE: &str = "/admin prefer_owner on|off";
pub const SET_LOC_USAGE: &str = "/admin set_loc <exec_id> (then share a location)";
pub const ACTIVE_USAGE: &str = "/admin active <exec_id> on|off";
pub const ASSIGN_USAGE: &str = "/admin assign <request_id> <executor_id>";

/// How a provisioned executor is addressed until they contact the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionalIdentity {
    /// Handle without the leading `@`.
    Handle(String),
    /// Raw numeric channel identity.
    ChannelId(i64),
}

/// Fields of an `add_executor` / `add_exec_id` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSpec {
    pub identity: ProvisionalIdentity,
    pub city: String,
    /// `None` when the command omitted the radius.
    pub radius_km: Option<f64>,
    pub categories: Vec<String>,
    pub is_owner: bool,
}

/// A parsed `/admin` sub-command.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Help,
    PreferOwner(bool),
    AddExecutor(ExecutorSpec),
    ListExecutors,
    SetLocation { executor_id: i64 },
    SetActive { executor_id: i64, active: bool },
    Assign { request_id: i64, executor_id: i64 },
}

static ADD_EXECUTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^add_executor\s+@?(\w+)\s+"([^"]+)"(?:\s+([\d.,]+))?\s+"([^"]+)"(\s+--owner)?\s*$"#)
        .expect("add_executor pattern is valid")
});

static ADD_EXEC_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^add_exec_id\s+(-?\d+)\s+"([^"]+)"(?:\s+([\d.,]+))?\s+"([^"]+)"(\s+--owner)?\s*$"#)
        .expect("add_exec_id pattern is valid")
});

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "1" | "true" | "yes" => Some(true),
        "off" | "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl AdminCommand {
    /// Parse the text after `/admin`. Errors carry the usage line to show.
    pub fn parse(args: &str) -> Result<Self, &'static str> {
        let args = args.trim();
        let words: Vec<&str> = args.split_whitespace().collect();

        match words.as_slice() {
            [] | ["help"] => Ok(Self::Help),
            ["prefer_owner", value] => parse_switch(value)
                .map(Self::PreferOwner)
                .ok_or(PREFER_OWNER_USAGE),
            ["prefer_owner", ..] => Err(PREFER_OWNER_USAGE),
            ["add_executor", ..] => {
                let caps = ADD_EXECUTOR_RE.captures(args).ok_or(ADD_EXECUTOR_USAGE)?;
                let identity = ProvisionalIdentity::Handle(caps[1].to_string());
                Self::executor_spec(identity, &caps).ok_or(ADD_EXECUTOR_USAGE)
            }
            ["add_exec_id", ..] => {
                let caps = ADD_EXEC_ID_RE.captures(args).ok_or(ADD_EXEC_ID_USAGE)?;
                let channel_id = caps[1].parse().map_err(|_| ADD_EXEC_ID_USAGE)?;
                let identity = ProvisionalIdentity::ChannelId(channel_id);
                Self::executor_spec(identity, &caps).ok_or(ADD_EXEC_ID_USAGE)
            }
            ["list_exec"] => Ok(Self::ListExecutors),
            ["set_loc", id] => id
                .parse()
                .map(|executor_id| Self::SetLocation { executor_id })
                .map_err(|_| SET_LOC_USAGE),
            ["set_loc", ..] => Err(SET_LOC_USAGE),
            ["active", id, value] => match (id.parse(), parse_switch(value)) {
                (Ok(executor_id), Some(active)) => Ok(Self::SetActive {
                    executor_id,
                    active,
                }),
                _ => Err(ACTIVE_USAGE),
            },
            ["active", ..] => Err(ACTIVE_USAGE),
            ["assign", request, executor] => match (request.parse(), executor.parse()) {
                (Ok(request_id), Ok(executor_id)) => Ok(Self::Assign {
                    request_id,
                    executor_id,
                }),
                _ => Err(ASSIGN_USAGE),
            },
            ["assign", ..] => Err(ASSIGN_USAGE),
            _ => Err("Unknown sub-command. Send /admin for help."),
        }
    }

    fn executor_spec(identity: ProvisionalIdentity, caps: &regex::Captures<'_>) -> Option<Self> {
        let radius_km = match caps.get(3) {
            Some(m) => Some(parse_positive_decimal(m.as_str(), "radius").ok()?),
            None => None,
        };
        let categories = ExecutorProfile::parse_tags(&caps[4]);
        if categories.is_empty() {
            return None;
        }

        Some(Self::AddExecutor(ExecutorSpec {
            identity,
            city: caps[2].trim().to_string(),
            radius_km,
            categories,
            is_owner: caps.get(5).is_some(),
        }))
    }
}
