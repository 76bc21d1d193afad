use chrono::Utc;
use common::random_id;
use common::storage::{BlobId, BlobStore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionSession, TransactionTrait,
};
use tracing::info;

use super::{MAX_ID_ATTEMPTS, map_id_collision};
use crate::entity::{user, user_profile, workflow};
use crate::error::AppError;
use crate::utils::hash;

/// Principals and their one-to-one profiles.
///
/// A profile is created in the same transaction as its principal, so a
/// committed principal always has exactly one profile.
pub struct IdentityService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> IdentityService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Create a principal and its profile atomically.
    pub async fn create_principal(
        &self,
        username: &str,
        password: &str,
        is_staff: bool,
    ) -> Result<(user::Model, user_profile::Model), AppError>
    where
        C: TransactionTrait,
    {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > 150 {
            return Err(AppError::Validation(
                "Username must be 1-150 characters".into(),
            ));
        }
        if password.is_empty() {
            return Err(AppError::Validation("Password must not be empty".into()));
        }

        let password_hash = hash::hash_password(password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

        let txn = self.conn.begin().await?;

        let new_user = user::ActiveModel {
            username: Set(username.to_string()),
            password: Set(password_hash),
            is_staff: Set(is_staff),
            date_joined: Set(Utc::now()),
            ..Default::default()
        };
        let user = new_user.insert(&txn).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::UsernameTaken,
            _ => AppError::from(e),
        })?;

        let profile = insert_profile(&txn, user.id).await?;
        txn.commit().await?;

        info!(
            user_id = user.id,
            profile_id = %profile.id,
            is_staff,
            "Created principal"
        );
        Ok((user, profile))
    }

    /// Return the principal's profile, creating it if it is missing.
    pub async fn resolve_profile(&self, user_id: i32) -> Result<user_profile::Model, AppError> {
        if let Some(profile) = find_profile_for_user(self.conn, user_id).await? {
            return Ok(profile);
        }

        match insert_profile(self.conn, user_id).await {
            Ok(profile) => {
                info!(user_id, profile_id = %profile.id, "Created missing profile");
                Ok(profile)
            }
            // Lost a race with a concurrent request for the same principal.
            Err(AppError::Conflict(_)) => find_profile_for_user(self.conn, user_id)
                .await?
                .ok_or_else(|| AppError::Internal("profile missing after conflict".into())),
            Err(e) => Err(e),
        }
    }

    /// Check a username/password pair.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<user::Model, AppError> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(self.conn)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let is_valid = hash::verify_password(password, &user.password)
            .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;
        if !is_valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Delete a principal together with its profile, workflows and their
    /// blobs. Returns the number of workflows removed.
    ///
    /// Records go first in one transaction; blobs are removed only after the
    /// commit, and a failed blob removal is logged rather than undoing it.
    pub async fn delete_principal(
        &self,
        username: &str,
        blob_store: &dyn BlobStore,
    ) -> Result<usize, AppError>
    where
        C: TransactionTrait,
    {
        let txn = self.conn.begin().await?;

        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{username}' not found")))?;

        let mut orphaned = Vec::new();
        if let Some(profile) = find_profile_for_user(&txn, user.id).await? {
            let workflows = workflow::Entity::find()
                .filter(workflow::Column::OwnerId.eq(&profile.id))
                .all(&txn)
                .await?;
            orphaned = workflows.into_iter().map(|w| w.content).collect();

            workflow::Entity::delete_many()
                .filter(workflow::Column::OwnerId.eq(&profile.id))
                .exec(&txn)
                .await?;
            user_profile::Entity::delete_by_id(profile.id.as_str())
                .exec(&txn)
                .await?;
        }
        user::Entity::delete_by_id(user.id).exec(&txn).await?;
        txn.commit().await?;

        for content in &orphaned {
            match BlobId::parse(content) {
                Ok(blob_id) => {
                    if let Err(e) = blob_store.delete(&blob_id).await {
                        tracing::error!(blob_id = %blob_id, error = %e, "Failed to delete blob of removed principal");
                    }
                }
                Err(_) => tracing::warn!(content = %content, "Skipping malformed blob reference"),
            }
        }

        info!(user_id = user.id, workflows = orphaned.len(), "Deleted principal");
        Ok(orphaned.len())
    }
}

async fn find_profile_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<user_profile::Model>, AppError> {
    Ok(user_profile::Entity::find()
        .filter(user_profile::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

async fn insert_profile<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<user_profile::Model, AppError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = random_id();
        let taken = user_profile::Entity::find_by_id(id.as_str())
            .one(conn)
            .await?
            .is_some();
        if taken {
            continue;
        }

        let profile = user_profile::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            ..Default::default()
        };
        return profile.insert(conn).await.map_err(map_id_collision);
    }

    Err(AppError::Conflict(
        "Could not allocate a unique profile identifier".into(),
    ))
}
