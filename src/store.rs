//! MongoDB persistence for groups.
//!
//! Every write goes through [`GroupStore::replace`], which only succeeds when
//! the stored version is the one the writer read. Two concurrent edits of the
//! same group therefore end with one of them getting a conflict.

use chrono::Utc;
use mongodb::bson::doc;
use mongodb::{Client, Collection};

use crate::error::ApiError;
use crate::schemas::Group;

#[derive(Clone)]
pub struct GroupStore {
    groups: Collection<Group>,
}

impl GroupStore {
    pub fn new(client: &Client, database: &str) -> Self {
        GroupStore {
            groups: client.database(database).collection::<Group>("Groups"),
        }
    }

    pub async fn create(&self, group: &Group) -> Result<(), ApiError> {
        self.groups.insert_one(group, None).await?;
        tracing::info!(group = %group.id, "group created");
        Ok(())
    }

    /// Loads a group with a balance snapshot computed from its current ledgers.
    pub async fn find(&self, id: &str) -> Result<Option<Group>, ApiError> {
        let group = self.groups.find_one(doc! { "id": id }, None).await?;
        Ok(group.map(|mut group| {
            group.refresh_balances();
            group
        }))
    }

    pub async fn get(&self, id: &str) -> Result<Group, ApiError> {
        self.find(id)
            .await?
            .ok_or_else(|| ApiError::group_not_found(id))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ApiError> {
        let result = self.groups.delete_one(doc! { "id": id }, None).await?;
        if result.deleted_count > 0 {
            tracing::info!(group = %id, "group deleted");
        }
        Ok(result.deleted_count > 0)
    }

    /// Stores `group` if the stored copy is still at `expected_version`.
    pub async fn replace(&self, group: &Group, expected_version: i64) -> Result<(), ApiError> {
        let result = self
            .groups
            .replace_one(
                doc! { "id": group.id.as_str(), "version": expected_version },
                group,
                None,
            )
            .await?;
        if result.matched_count > 0 {
            return Ok(());
        }

        match self.groups.find_one(doc! { "id": group.id.as_str() }, None).await? {
            Some(current) => {
                tracing::warn!(
                    group = %group.id,
                    expected_version,
                    current_version = current.version,
                    "rejected stale write"
                );
                Err(ApiError::Conflict {
                    current_version: current.version,
                })
            }
            None => Err(ApiError::group_not_found(&group.id)),
        }
    }

    /// Read, change, recompute and write back a group in one optimistic step.
    ///
    /// `mutate` sees the group as loaded; the balance snapshot, version and
    /// update time are handled here.
    pub async fn update<T, F>(&self, id: &str, mutate: F) -> Result<(Group, T), ApiError>
    where
        F: FnOnce(&mut Group) -> Result<T, ApiError>,
    {
        let mut group = self.get(id).await?;
        let expected_version = group.version;

        let output = mutate(&mut group)?;
        group.refresh_balances();
        group.touch(Utc::now());

        self.replace(&group, expected_version).await?;
        tracing::info!(group = %id, version = group.version, "group updated");
        Ok((group, output))
    }
}
