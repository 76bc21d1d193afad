use common::random_id;
use common::storage::{BlobId, BlobStore};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionSession, TransactionTrait,
};
use tracing::{info, instrument};

use super::{MAX_ID_ATTEMPTS, map_id_collision};
use crate::entity::workflow;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::utils::policy::{Action, WorkflowScope, require_write, workflow_scope};

/// Workflows visible under `scope`, in id order.
///
/// Every read and write path goes through this one filter, so retrieve,
/// update and delete can never disagree about what a caller may address.
pub fn scoped(scope: &WorkflowScope) -> Select<workflow::Entity> {
    let select = workflow::Entity::find().order_by_asc(workflow::Column::Id);
    match scope {
        WorkflowScope::All => select,
        WorkflowScope::OwnedBy(profile_id) => {
            select.filter(workflow::Column::OwnerId.eq(profile_id.as_str()))
        }
    }
}

/// Result of committing a new content reference.
#[derive(Debug)]
pub struct ContentSwap {
    pub workflow: workflow::Model,
    /// The previous blob, now unreferenced. `None` when the content did not
    /// change.
    pub stale: Option<BlobId>,
}

pub struct WorkflowService<'a, C: ConnectionTrait> {
    conn: &'a C,
    blobs: &'a dyn BlobStore,
}

impl<'a, C: ConnectionTrait> WorkflowService<'a, C> {
    pub fn new(conn: &'a C, blobs: &'a dyn BlobStore) -> Self {
        Self { conn, blobs }
    }

    /// One page of the workflows `principal` may list, plus the total count.
    pub async fn list(
        &self,
        principal: &AuthUser,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<workflow::Model>, u64), AppError> {
        let scope = workflow_scope(principal, Action::List);
        let paginator = scoped(&scope).paginate(self.conn, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Look a workflow up inside the caller's scope for `action`.
    ///
    /// Anything outside the scope is reported as not found.
    pub async fn find(
        &self,
        principal: &AuthUser,
        action: Action,
        id: &str,
    ) -> Result<workflow::Model, AppError> {
        let scope = workflow_scope(principal, action);
        scoped(&scope)
            .filter(workflow::Column::Id.eq(id))
            .one(self.conn)
            .await?
            .ok_or_else(not_found)
    }

    /// Scope lookup plus the object-level ownership check, without locking.
    /// Lets handlers reject a request before consuming an upload.
    pub async fn ensure_writable(
        &self,
        principal: &AuthUser,
        action: Action,
        id: &str,
    ) -> Result<workflow::Model, AppError> {
        let model = self.find(principal, action, id).await?;
        require_write(principal, action, &model.owner_id)?;
        Ok(model)
    }

    /// Persist a new workflow owned by `principal` pointing at an already
    /// stored blob. The blob is removed again if the record cannot be saved.
    #[instrument(skip(self, principal), fields(owner = %principal.profile_id))]
    pub async fn create(
        &self,
        principal: &AuthUser,
        content: BlobId,
    ) -> Result<workflow::Model, AppError> {
        match self.insert(&principal.profile_id, &content).await {
            Ok(model) => {
                info!(workflow_id = %model.id, "Created workflow");
                Ok(model)
            }
            Err(e) => {
                self.discard_blob(&content).await;
                Err(e)
            }
        }
    }

    async fn insert(&self, owner_id: &str, content: &BlobId) -> Result<workflow::Model, AppError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = random_id();
            let taken = workflow::Entity::find_by_id(id.as_str())
                .one(self.conn)
                .await?
                .is_some();
            if taken {
                continue;
            }

            let model = workflow::ActiveModel {
                id: Set(id),
                owner_id: Set(owner_id.to_string()),
                content: Set(content.to_string()),
                ..Default::default()
            };
            return model.insert(self.conn).await.map_err(map_id_collision);
        }

        Err(AppError::Conflict(
            "Could not allocate a unique workflow identifier".into(),
        ))
    }

    /// Point a workflow at `new_content`, which must already be stored.
    ///
    /// The row is locked inside the caller's scope and ownership re-checked
    /// before the reference is written. On success the previous blob is
    /// handed back for deletion instead of being deleted here; on any failure
    /// `new_content` is removed and the old blob stays referenced.
    pub async fn replace_content(
        &self,
        principal: &AuthUser,
        action: Action,
        id: &str,
        new_content: BlobId,
    ) -> Result<ContentSwap, AppError>
    where
        C: TransactionTrait,
    {
        match self.commit_content(principal, action, id, &new_content).await {
            Ok(swap) => Ok(swap),
            Err(e) => {
                self.discard_blob(&new_content).await;
                Err(e)
            }
        }
    }

    async fn commit_content(
        &self,
        principal: &AuthUser,
        action: Action,
        id: &str,
        new_content: &BlobId,
    ) -> Result<ContentSwap, AppError>
    where
        C: TransactionTrait,
    {
        let scope = workflow_scope(principal, action);
        let txn = self.conn.begin().await?;

        let current = scoped(&scope)
            .filter(workflow::Column::Id.eq(id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(not_found)?;
        require_write(principal, action, &current.owner_id)?;

        if current.content == new_content.as_str() {
            return Ok(ContentSwap {
                workflow: current,
                stale: None,
            });
        }

        let old_content = current.content.clone();
        let mut active: workflow::ActiveModel = current.into();
        active.content = Set(new_content.to_string());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        let stale = match BlobId::parse(&old_content) {
            Ok(blob_id) => Some(blob_id),
            Err(_) => {
                tracing::warn!(workflow_id = %id, content = %old_content, "Previous content reference is malformed");
                None
            }
        };

        Ok(ContentSwap {
            workflow: updated,
            stale,
        })
    }

    /// Replace the content and then remove the stale blob.
    #[instrument(skip(self, principal), fields(user_id = principal.user_id))]
    pub async fn update_content(
        &self,
        principal: &AuthUser,
        action: Action,
        id: &str,
        new_content: BlobId,
    ) -> Result<workflow::Model, AppError>
    where
        C: TransactionTrait,
    {
        let swap = self.replace_content(principal, action, id, new_content).await?;
        if let Some(stale) = &swap.stale {
            self.discard_blob(stale).await;
        }
        info!(workflow_id = %swap.workflow.id, content = %swap.workflow.content, "Replaced workflow content");
        Ok(swap.workflow)
    }

    /// Delete a workflow, then its blob.
    ///
    /// The record deletion is committed first; blob removal never touches the
    /// record again, so a storage failure cannot resurrect it.
    #[instrument(skip(self, principal), fields(user_id = principal.user_id))]
    pub async fn delete(&self, principal: &AuthUser, id: &str) -> Result<(), AppError>
    where
        C: TransactionTrait,
    {
        let scope = workflow_scope(principal, Action::Destroy);
        let txn = self.conn.begin().await?;

        let current = scoped(&scope)
            .filter(workflow::Column::Id.eq(id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(not_found)?;
        require_write(principal, Action::Destroy, &current.owner_id)?;

        workflow::Entity::delete_by_id(current.id.as_str())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        match BlobId::parse(&current.content) {
            Ok(blob_id) => self.discard_blob(&blob_id).await,
            Err(_) => {
                tracing::warn!(workflow_id = %id, content = %current.content, "Deleted workflow had a malformed content reference")
            }
        }

        info!(workflow_id = %id, "Deleted workflow");
        Ok(())
    }

    /// Remove a blob that is no longer referenced. Idempotent; failures are
    /// logged and otherwise ignored so they never undo a committed change.
    pub async fn discard_blob(&self, blob_id: &BlobId) {
        match self.blobs.delete(blob_id).await {
            Ok(true) => tracing::debug!(blob_id = %blob_id, "Deleted blob"),
            Ok(false) => tracing::debug!(blob_id = %blob_id, "Blob already absent"),
            Err(e) => {
                tracing::error!(blob_id = %blob_id, error = %e, "Failed to delete unreferenced blob")
            }
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Not found.".into())
}
