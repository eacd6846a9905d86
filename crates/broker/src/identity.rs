//! Identity reconciliation and role self-declaration.

use broker_core::Role;
use database::{executor, user, Database, DatabaseError, User};
use tracing::{debug, info};

use crate::admin::AdminPolicy;
use crate::error::BrokerError;
use crate::event::Participant;

/// Bring the stored user in line with the transport's view of the participant.
///
/// Runs on every inbound event. Creates the user on first contact (as admin
/// when allow-listed), refreshes handle and display name, then links any
/// executor profiles provisioned under the participant's handle or raw
/// channel id.
pub async fn reconcile_identity(
    db: &Database,
    participant: &Participant,
    admins: &dyn AdminPolicy,
) -> Result<User, BrokerError> {
    let pool = db.pool();
    let handle = participant.handle.as_deref();
    let display_name = participant.display_name.as_deref();

    let stored = match user::find_user_by_channel(pool, participant.channel_id).await? {
        Some(existing) => {
            if existing.handle.as_deref() != handle
                || existing.display_name.as_deref() != display_name
            {
                user::update_identity(pool, existing.id, handle, display_name).await?;
            }
            User {
                handle: handle.map(str::to_string),
                display_name: display_name.map(str::to_string),
                ..existing
            }
        }
        None => {
            let role = admins
                .is_admin(participant.channel_id)
                .then_some(Role::Admin.as_str());
            match user::create_user(pool, participant.channel_id, handle, display_name, role).await
            {
                Ok(created) => {
                    info!(
                        user_id = created.id,
                        channel_id = participant.channel_id,
                        "New participant"
                    );
                    created
                }
                // Lost a race with a concurrent first event from the same channel.
                Err(DatabaseError::AlreadyExists { .. }) => {
                    user::find_user_by_channel(pool, participant.channel_id)
                        .await?
                        .ok_or_else(|| {
                            BrokerError::not_found("User", participant.channel_id)
                        })?
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let mut linked = 0;
    if let Some(handle) = handle {
        linked += executor::link_pending_handle(pool, stored.id, handle).await?;
    }
    linked += executor::link_direct_channel(pool, stored.id, participant.channel_id).await?;
    if linked > 0 {
        info!(user_id = stored.id, linked, "Linked provisioned executor profiles");
    }

    Ok(stored)
}

/// Record the role a participant picked for themselves.
///
/// Choosing admin requires the allow-list. An admin picking another role
/// keeps the stored admin role. Returns the role now in effect.
pub async fn declare_role(
    db: &Database,
    user: &User,
    requested: Role,
    admins: &dyn AdminPolicy,
) -> Result<Role, BrokerError> {
    let is_admin = admins.is_admin(user.channel_id);

    if requested == Role::Admin && !is_admin {
        return Err(BrokerError::Unauthorized(
            "admin role is reserved for allow-listed participants".to_string(),
        ));
    }

    let effective = if is_admin || user.role.as_deref() == Some(Role::Admin.as_str()) {
        Role::Admin
    } else {
        requested
    };

    if user.role.as_deref() != Some(effective.as_str()) {
        user::set_role(db.pool(), user.id, effective.as_str()).await?;
    }
    debug!(user_id = user.id, role = %effective, "Role declared");

    Ok(effective)
}
