//! Notification fan-out.

use std::sync::Arc;

use broker_core::ExecutorProfile;
use database::{user, Database};
use tracing::{debug, warn};

use crate::action::Action;
use crate::error::BrokerError;
use crate::sender::MessageSender;

/// Who a notification is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A known user (users.id).
    User(i64),
    /// A raw channel address.
    Channel(i64),
    /// An executor profile, possibly not yet linked to a user.
    Executor {
        user_id: Option<i64>,
        direct_channel_id: Option<i64>,
        pending_handle: Option<String>,
    },
}

impl Recipient {
    pub fn executor(profile: &ExecutorProfile) -> Self {
        Self::Executor {
            user_id: profile.user_id,
            direct_channel_id: profile.direct_channel_id,
            pending_handle: profile.pending_handle.clone(),
        }
    }
}

/// Delivers messages through a [`MessageSender`], never failing the caller.
pub struct NotificationDispatcher<S: MessageSender> {
    sender: Arc<S>,
    db: Database,
}

impl<S: MessageSender> NotificationDispatcher<S> {
    pub fn new(sender: Arc<S>, db: Database) -> Self {
        Self { sender, db }
    }

    /// Resolve a recipient to a channel address.
    ///
    /// A linked user wins over a provisioned channel id. A profile known only
    /// by handle has no address until its owner contacts the bot.
    pub async fn resolve(&self, recipient: &Recipient) -> Result<Option<i64>, BrokerError> {
        match recipient {
            Recipient::Channel(channel_id) => Ok(Some(*channel_id)),
            Recipient::User(user_id) => {
                let found = user::get_user(self.db.pool(), *user_id).await?;
                Ok(Some(found.channel_id))
            }
            Recipient::Executor {
                user_id,
                direct_channel_id,
                ..
            } => {
                if let Some(user_id) = user_id {
                    let found = user::get_user(self.db.pool(), *user_id).await?;
                    return Ok(Some(found.channel_id));
                }
                Ok(*direct_channel_id)
            }
        }
    }

    /// Deliver one message. Returns whether it went out.
    pub async fn notify(&self, recipient: &Recipient, text: &str, actions: &[Action]) -> bool {
        let channel_id = match self.resolve(recipient).await {
            Ok(Some(channel_id)) => channel_id,
            Ok(None) => {
                debug!(?recipient, "Recipient has no channel yet");
                return false;
            }
            Err(e) => {
                warn!(?recipient, "Could not resolve recipient: {}", e);
                return false;
            }
        };

        match self.sender.send_message(channel_id, text, actions).await {
            Ok(()) => true,
            Err(e) => {
                warn!(channel_id, "Delivery failed: {}", e);
                false
            }
        }
    }

    /// Deliver the same message to several recipients. Returns how many got it.
    pub async fn notify_all(
        &self,
        recipients: &[Recipient],
        text: &str,
        actions: &[Action],
    ) -> usize {
        let mut delivered = 0;
        for recipient in recipients {
            if self.notify(recipient, text, actions).await {
                delivered += 1;
            }
        }
        delivered
    }
}
