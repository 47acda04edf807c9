//! Audit log recorders.
//!
//! Mutating handlers record who did what to which object. Entries land in
//! the `action_log` table and are listed by the admin API.

use crate::store::models::{ActionKind, User};
use crate::store::{Repository, StoreError};

/// Record the creation of an object.
pub async fn log_addition(
    store: &Repository,
    user: &User,
    object_kind: &str,
    object_name: &str,
) -> Result<(), StoreError> {
    store
        .log_action(
            Some(user.id),
            ActionKind::Addition,
            object_kind,
            object_name,
            "",
        )
        .await
}

/// Record a change to an object.
pub async fn log_change(
    store: &Repository,
    user: &User,
    object_kind: &str,
    object_name: &str,
    message: &str,
) -> Result<(), StoreError> {
    store
        .log_action(
            Some(user.id),
            ActionKind::Change,
            object_kind,
            object_name,
            message,
        )
        .await
}

/// Record the deletion of an object.
pub async fn log_deletion(
    store: &Repository,
    user: &User,
    object_kind: &str,
    object_name: &str,
) -> Result<(), StoreError> {
    store
        .log_action(
            Some(user.id),
            ActionKind::Deletion,
            object_kind,
            object_name,
            "",
        )
        .await
}
