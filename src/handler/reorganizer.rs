//! Keeps aliases in line with changes of the location tree

use std::collections::BTreeMap;
use std::collections::VecDeque;

use crate::aliases::Action;
use crate::aliases::AliasId;
use crate::aliases::LocationId;
use crate::locations::Location;
use crate::storage::Gateway;
use crate::storage::Storage;

use super::Error;
use super::Result;
use super::UrlAliasHandler;

impl<S: Storage> UrlAliasHandler<S> {
    /// Add a location below an existing one
    ///
    /// The location has no alias until one is published
    pub async fn create_location(
        &self,
        location_id: LocationId,
        parent_id: LocationId,
    ) -> Result<Location> {
        if location_id <= 0 {
            return Err(Error::InvalidArgument(format!("Invalid location ID {location_id}")));
        }

        let mut transaction = self.storage.begin().await?;

        if transaction.load_location(location_id).await?.is_some() {
            return Err(Error::Conflict(format!("Location {location_id} already exists")));
        }

        Self::load_location(&mut transaction, parent_id).await?;

        let location = Location {
            id: location_id,
            parent_id,
        };

        transaction.insert_location(&location).await?;
        transaction.commit().await?;

        tracing::debug!("Created location {location_id} below {parent_id}");

        Ok(location)
    }

    /// Move a location below another parent
    ///
    /// The aliases of the location are recreated below the alias of the new parent, the old
    /// ones become history. Descendants follow, their old paths are not kept.
    pub async fn location_moved(
        &self,
        location_id: LocationId,
        new_parent_id: LocationId,
    ) -> Result<()> {
        if location_id == self.root_location_id {
            return Err(Error::InvalidArgument("The root location can not be moved".to_string()));
        }

        let mut transaction = self.storage.begin().await?;

        let location = Self::load_location(&mut transaction, location_id).await?;
        Self::load_location(&mut transaction, new_parent_id).await?;

        if Self::is_within_subtree(&mut transaction, new_parent_id, location_id).await? {
            return Err(Error::InvalidArgument(format!(
                "Location {location_id} can not be moved into its own subtree"
            )));
        }

        if location.parent_id == new_parent_id {
            return Ok(());
        }

        transaction
            .update_location_parent(location_id, new_parent_id)
            .await?;

        let rows = transaction
            .load_location_entries(location_id, false)
            .await?;

        if let Some(old_id) = rows.first().map(|row| row.id) {
            let parent_alias_id = self.real_alias_id(&mut transaction, new_parent_id).await?;
            let new_id = transaction.next_id().await?;
            let action = Action::Location(location_id);

            transaction.historize(old_id, new_id).await?;

            for row in &rows {
                self.place_autogenerated(
                    &mut transaction,
                    &action,
                    parent_alias_id,
                    &row.text,
                    row.language_mask,
                    Some(new_id),
                )
                .await?;
            }

            transaction.reparent(old_id, new_id).await?;
        }

        transaction.commit().await?;

        tracing::debug!("Moved location {location_id} below {new_parent_id}");

        Ok(())
    }

    /// Copy a location and its subtree below another parent
    ///
    /// Copies get new location IDs and fresh autogenerated aliases, history and custom
    /// aliases are not copied. Returns the new location ID for every copied one.
    pub async fn location_copied(
        &self,
        location_id: LocationId,
        new_parent_id: LocationId,
    ) -> Result<BTreeMap<LocationId, LocationId>> {
        if location_id == self.root_location_id {
            return Err(Error::InvalidArgument("The root location can not be copied".to_string()));
        }

        let mut transaction = self.storage.begin().await?;

        Self::load_location(&mut transaction, location_id).await?;
        Self::load_location(&mut transaction, new_parent_id).await?;

        if Self::is_within_subtree(&mut transaction, new_parent_id, location_id).await? {
            return Err(Error::InvalidArgument(format!(
                "Location {location_id} can not be copied into its own subtree"
            )));
        }

        let parent_alias_id = self
            .alias_id_for_location(&mut transaction, new_parent_id)
            .await?;

        let mut copies = BTreeMap::new();
        let mut queue: VecDeque<(LocationId, LocationId, Option<AliasId>)> =
            VecDeque::from([(location_id, new_parent_id, parent_alias_id)]);

        while let Some((source_id, parent_id, parent_alias_id)) = queue.pop_front() {
            let copy_id = transaction.next_location_id().await?;

            transaction
                .insert_location(&Location {
                    id: copy_id,
                    parent_id,
                })
                .await?;

            copies.insert(source_id, copy_id);

            let mut alias_id = None;

            if let Some(parent_alias_id) = parent_alias_id {
                let action = Action::Location(copy_id);
                let rows = transaction
                    .load_location_entries(source_id, false)
                    .await?;

                for row in rows {
                    let copy = self
                        .place_autogenerated(
                            &mut transaction,
                            &action,
                            parent_alias_id,
                            &row.text,
                            row.language_mask,
                            alias_id,
                        )
                        .await?;

                    alias_id = Some(copy.id);
                }
            }

            for child in transaction.load_child_locations(source_id).await? {
                queue.push_back((child.id, copy_id, alias_id));
            }
        }

        transaction.commit().await?;

        tracing::debug!(
            "Copied {} location(s) from {location_id} below {new_parent_id}",
            copies.len()
        );

        Ok(copies)
    }

    /// Delete a location and its subtree
    ///
    /// Their autogenerated rows become NOP rows, custom aliases are kept
    pub async fn location_deleted(&self, location_id: LocationId) -> Result<()> {
        if location_id == self.root_location_id {
            return Err(Error::InvalidArgument("The root location can not be deleted".to_string()));
        }

        let mut transaction = self.storage.begin().await?;

        Self::load_location(&mut transaction, location_id).await?;

        let mut pending = vec![location_id];
        let mut deleted = 0;

        while let Some(current) = pending.pop() {
            pending.extend(
                transaction
                    .load_child_locations(current)
                    .await?
                    .into_iter()
                    .map(|child| child.id),
            );

            transaction
                .remove_by_action(&Action::Location(current))
                .await?;
            transaction.delete_location(current).await?;

            deleted += 1;
        }

        transaction.commit().await?;

        tracing::debug!("Deleted {deleted} location(s) starting at {location_id}");

        Ok(())
    }
}
