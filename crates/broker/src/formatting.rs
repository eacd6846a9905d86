//! Participant-facing message texts.

use broker_core::{format_executor_code, ExecutorProfile};
use database::{Offer, Request};

use crate::admin::{
    ACTIVE_USAGE, ADD_EXECUTOR_USAGE, ADD_EXEC_ID_USAGE, ASSIGN_USAGE, PREFER_OWNER_USAGE,
    SET_LOC_USAGE,
};
use crate::lifecycle::RankedExecutor;

/// Longest text sent in one message.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Most candidates listed for a catalog request.
pub const MAX_CATALOG_CANDIDATES: usize = 20;

pub const WELCOME: &str = "Hi! I broker construction equipment and crews. How will you use the bot?";
pub const CLIENT_READY: &str = "OK. Send /new_request to publish a request.\n/my_requests lists what you have published.";
pub const EXECUTOR_READY: &str = "You are an executor. An admin adds you by @handle or by numeric id.\n\
The bot can only message you after your first /start.\n\
Check your profile with /me";
pub const PICK_BUTTON: &str = "Please pick one of the buttons.";

pub const HELP_TEXT: &str = "Commands:\n\
/start - choose your role\n\
/new_request - publish a request\n\
/my_requests - your requests and offer counts\n\
/me - your executor profile\n\
/cancel - abort the current step\n\
/help - this message";

pub const CANCELLED: &str = "Cancelled.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const APOLOGY: &str = "Sorry, something went wrong. Please start again.";
pub const NOT_FOUND: &str = "Not found. It may have been removed or the id is wrong.";
pub const OFFER_CLOSED: &str = "This offer is already closed.";
pub const UNKNOWN_INPUT: &str = "I didn't understand that. Send /help for the list of commands.";
pub const STALE_BUTTON: &str = "That button is no longer active.";
pub const ADMIN_ONLY: &str = "The admin role is only available to allow-listed participants.";

pub const ASK_MODE: &str = "Choose how to publish:\nAuction - every matching executor is notified.\nCatalog - you browse executors and ask selected ones for offers.";
pub const ASK_CATEGORY: &str = "Choose a category:";
pub const ASK_DESCRIPTION: &str = "Describe the job (no contact details):";
pub const ASK_ADDRESS: &str = "Send the address (city, street, number; landmarks are fine) or share a location.";
pub const ADDRESS_NOT_FOUND: &str = "Address not found. Try wording it differently.";
pub const PICK_ADDRESS: &str = "Pick the matching address:";
pub const STALE_PICK: &str = "That choice is no longer valid. Send the address again:";
pub const ASK_RADIUS: &str = "Search radius for executors, km (e.g. 50):";
pub const BAD_RADIUS: &str = "Send a number of km between 0 and 1000, e.g. 50 or 50,5.";
pub const EMPTY_DESCRIPTION: &str = "The description cannot be empty. Describe the job:";

pub const ASK_RATE_TYPE: &str = "Choose the rate type:";
pub const ASK_RATE_VALUE: &str = "Send the rate as a number (e.g. 50.0):";
pub const BAD_RATE: &str = "Send a number between 0 and 1000, e.g. 50 or 50,5.";
pub const ASK_COMMENT: &str = "Comment for the client (optional, no contact details). Send - to skip:";
pub const OFFER_SENT: &str = "Offer sent to the client.";

pub const NO_EXECUTOR_PROFILE: &str = "You have not been added as an executor yet. Ask an admin to run /admin add_exec_id or add_executor.";
pub const NO_REQUESTS: &str = "You have no requests yet. Send /new_request to publish one.";
pub const NO_EXECUTORS: &str = "No executors.";
pub const SHARE_LOCATION: &str = "OK. Share the executor's location now.";
pub const NEED_LOCATION: &str = "A location is needed. Share it with the attachment menu.";

/// Usage text for `/admin` without arguments.
pub fn admin_help() -> String {
    [
        "Admin commands:",
        PREFER_OWNER_USAGE,
        ADD_EXECUTOR_USAGE,
        ADD_EXEC_ID_USAGE,
        "/admin list_exec",
        SET_LOC_USAGE,
        ACTIVE_USAGE,
        ASSIGN_USAGE,
    ]
    .join("\n")
}

/// Cut text to [`MAX_MESSAGE_CHARS`] characters.
pub fn truncate(text: &str) -> String {
    text.chars().take(MAX_MESSAGE_CHARS).collect()
}

/// Longest button caption.
pub const MAX_BUTTON_CHARS: usize = 60;

/// Shorten a caption to [`MAX_BUTTON_CHARS`], marking the cut with an ellipsis.
pub fn button_label(text: &str) -> String {
    if text.chars().count() <= MAX_BUTTON_CHARS {
        return text.to_string();
    }
    let mut label: String = text.chars().take(MAX_BUTTON_CHARS - 1).collect();
    label.push('…');
    label
}

fn fleet_label(is_owner: bool) -> &'static str {
    if is_owner {
        "fleet"
    } else {
        "subcontractor"
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "-",
    }
}

pub fn request_created(request_id: i64) -> String {
    format!("Request #{} created. Looking for executors...", request_id)
}

pub fn request_broadcast(delivered: usize) -> String {
    format!(
        "Request sent to {} executor(s). I'll forward offers as they arrive.",
        delivered
    )
}

pub const NO_CANDIDATES_AUCTION: &str = "No matching executors found. An admin has been notified.";
pub const NO_CANDIDATES_CATALOG: &str = "No executors found within the radius.";
pub const PICK_CANDIDATE: &str = "Pick an executor to ask for an offer:";

/// Alert for admins when a request has no candidates.
pub fn unmatched_request_alert(request: &Request) -> String {
    format!(
        "Request #{} has no matching executors.\nCategory: {}\nAddress: {}\nRadius: {} km",
        request.id,
        request.category,
        or_dash(request.address_text.as_deref()),
        request.radius_km
    )
}

/// The request as shown to an executor, with the distance when known.
pub fn request_for_executor(request: &Request, distance_km: Option<f64>, solicited: bool) -> String {
    let heading = if solicited {
        format!("Offer requested for request #{}", request.id)
    } else {
        format!("New request #{}", request.id)
    };
    let mut text = format!(
        "{}\nCategory: {}\nAddress: {}\nDescription: {}",
        heading,
        request.category,
        or_dash(request.address_text.as_deref()),
        request.description
    );
    if let Some(distance) = distance_km {
        text.push_str(&format!("\nDistance to site: ~{:.1} km", distance));
    }
    text.push_str("\n\nSend your offer:");
    truncate(&text)
}

pub fn respond_label(request_id: i64) -> String {
    format!("Respond to #{}", request_id)
}

/// One catalog line: `E-00042 | city | ~12.3 km | fleet`.
pub fn candidate_line(ranked: &RankedExecutor) -> String {
    format!(
        "{} | {} | ~{:.1} km | {}",
        format_executor_code(ranked.candidate.executor_id),
        or_dash(ranked.profile.city.as_deref()),
        ranked.candidate.distance_km,
        fleet_label(ranked.candidate.is_owner_fleet)
    )
}

/// The catalog listing for a request.
pub fn candidate_list(candidates: &[RankedExecutor]) -> String {
    let mut lines = vec!["Executors found (own fleet first, then by distance):".to_string()];
    lines.extend(
        candidates
            .iter()
            .take(MAX_CATALOG_CANDIDATES)
            .map(candidate_line),
    );
    truncate(&lines.join("\n"))
}

pub fn request_offer_label(executor_id: i64) -> String {
    format!("Ask {} for an offer", format_executor_code(executor_id))
}

pub fn offer_requested(executor_id: i64) -> String {
    format!(
        "Offer request sent to executor {}.",
        format_executor_code(executor_id)
    )
}

pub const OFFER_REQUEST_UNDELIVERED: &str =
    "Could not deliver the request. The executor may not have started the bot yet.";

pub fn offer_prompt(request_id: i64) -> String {
    format!("Offer for request #{}. {}", request_id, ASK_RATE_TYPE)
}

/// A new offer as shown to the client. The executor stays anonymous.
pub fn offer_for_client(offer: &Offer, rate_label: &str) -> String {
    let comment = if offer.comment.is_empty() {
        "-"
    } else {
        offer.comment.as_str()
    };
    truncate(&format!(
        "New offer #{} for request #{}\nRate type: {}\nRate: {}\nComment: {}\nExecutor: {} (hidden)\n\n\
Accept to open contacts.",
        offer.id,
        offer.request_id,
        rate_label,
        offer.rate_value,
        comment,
        format_executor_code(offer.executor_id)
    ))
}

pub fn accept_label(offer_id: i64) -> String {
    format!("Accept offer #{}", offer_id)
}

pub fn decline_label(offer_id: i64) -> String {
    format!("Decline offer #{}", offer_id)
}

/// Contact handed to the client after a deal.
pub fn executor_contact(handle: Option<&str>, direct_channel_id: Option<i64>) -> String {
    match (handle, direct_channel_id) {
        (Some(handle), _) => format!("@{}", handle),
        (None, Some(id)) => format!("tg://user?id={}", id),
        (None, None) => "will appear after the executor's first /start".to_string(),
    }
}

pub fn deal_for_client(deal_id: i64, contact: &str) -> String {
    format!(
        "Offer accepted. Deal #{}.\nExecutor contact: {}",
        deal_id, contact
    )
}

/// Contact handed to the executor after a deal.
pub fn client_contact(handle: Option<&str>, channel_id: i64) -> String {
    match handle {
        Some(handle) => format!("@{}", handle),
        None => format!("tg://user?id={}", channel_id),
    }
}

pub fn deal_for_executor(request_id: i64, contact: &str) -> String {
    format!(
        "Your offer for request #{} was accepted. Client contact: {}",
        request_id, contact
    )
}

pub fn offer_declined_for_client(offer_id: i64) -> String {
    format!("Offer #{} declined.", offer_id)
}

pub fn offer_declined_for_executor(request_id: i64) -> String {
    format!("Your offer for request #{} was declined.", request_id)
}

/// `/me` output.
pub fn executor_profile(profile: &ExecutorProfile) -> String {
    format!(
        "Executor profile {}\nCity: {} | Radius: {} km | Categories: {}\n{} | {}\nLocation: {}",
        profile.code(),
        or_dash(profile.city.as_deref()),
        profile.radius_km,
        profile.categories.join(", "),
        if profile.is_owner {
            "own fleet"
        } else {
            "subcontractor"
        },
        if profile.is_active { "active" } else { "inactive" },
        if profile.location.is_some() {
            "set"
        } else {
            "not set"
        }
    )
}

/// `/my_requests` output; `requests` pairs each request with its offer count.
pub fn client_requests(requests: &[(Request, i64)]) -> String {
    let lines: Vec<String> = requests
        .iter()
        .map(|(r, offers)| {
            format!(
                "#{} | {} | {} | {} km | {} | offers: {}",
                r.id,
                r.category,
                or_dash(r.address_text.as_deref()),
                r.radius_km,
                r.mode.as_deref().unwrap_or("auction"),
                offers
            )
        })
        .collect();
    truncate(&lines.join("\n"))
}

/// `/admin list_exec` output.
pub fn executor_list(profiles: &[ExecutorProfile]) -> String {
    let lines: Vec<String> = profiles
        .iter()
        .map(|p| {
            format!(
                "{} | @{} | channel={} | user_id={} | {} | {} km | [{}] | {} | {}",
                p.code(),
                or_dash(p.pending_handle.as_deref()),
                p.direct_channel_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                p.user_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                or_dash(p.city.as_deref()),
                p.radius_km,
                p.categories.join(","),
                fleet_label(p.is_owner),
                if p.is_active { "ON" } else { "OFF" }
            )
        })
        .collect();
    truncate(&lines.join("\n"))
}

pub fn executor_added_by_handle(executor_id: i64, handle: &str) -> String {
    format!(
        "Executor {} added. Until their first /start they are known as @{}.",
        format_executor_code(executor_id),
        handle
    )
}

pub fn executor_added_by_id(executor_id: i64, channel_id: i64) -> String {
    format!(
        "Executor {} added (id={}). Remind them to start the bot.",
        format_executor_code(executor_id),
        channel_id
    )
}

pub fn location_updated(executor_id: i64) -> String {
    format!(
        "Location of executor {} updated.",
        format_executor_code(executor_id)
    )
}

pub fn active_changed(executor_id: i64, active: bool) -> String {
    format!(
        "Executor {} is now {}.",
        format_executor_code(executor_id),
        if active { "active" } else { "inactive" }
    )
}

pub fn prefer_owner_changed(value: bool) -> String {
    format!("prefer_owner_first = {}", value)
}

pub const ASSIGNED: &str = "Assigned.";
pub const ASSIGN_UNDELIVERED: &str =
    "Could not deliver. The executor may not have started the bot yet.";
