//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::aliases::Action;
use crate::aliases::AliasId;
use crate::aliases::AliasRow;
use crate::aliases::LocationId;
use crate::languages::LanguageMask;
use crate::locations::Location;

use super::Error;
use super::Gateway;
use super::InsertRowValues;
use super::Result;
use super::Storage;
use super::UpdateRowValues;

/// All tables of the memory storage
#[derive(Clone, Debug, Default)]
struct Tables {
    /// Alias rows by composite key
    rows: BTreeMap<(AliasId, String), AliasRow>,

    /// Locations by ID
    locations: BTreeMap<LocationId, Location>,

    /// Last handed out row ID
    last_id: AliasId,
}

impl Tables {
    /// Iterate all live autogenerated rows pointing to an action
    fn autogenerated_entries<'a>(
        &'a self,
        action: &'a Action,
    ) -> impl Iterator<Item = &'a AliasRow> + 'a {
        self.rows
            .values()
            .filter(move |row| &row.action == action && !row.is_custom && !row.is_history)
    }

    /// Move all rows matching `filter` below `new_parent_id`
    fn move_rows<F>(&mut self, new_parent_id: AliasId, filter: F) -> Result<()>
    where
        F: Fn(&AliasRow) -> bool,
    {
        let keys = self
            .rows
            .values()
            .filter(|row| filter(*row))
            .map(|row| (row.parent_id, row.text_md5.clone()))
            .collect::<Vec<_>>();

        for key in keys {
            let new_key = (new_parent_id, key.1.clone());

            if self.rows.contains_key(&new_key) {
                return Err(Error::Conflict(format!(
                    "Row {}-{} already exists",
                    new_key.0, new_key.1
                )));
            }

            if let Some(mut row) = self.rows.remove(&key) {
                row.parent_id = new_parent_id;
                self.rows.insert(new_key, row);
            }
        }

        Ok(())
    }
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All tables, one transaction at a time
    tables: Arc<Mutex<Tables>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for Memory {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let working = committed.clone();

        Ok(MemoryTransaction { committed, working })
    }
}

/// Transaction on the memory storage
///
/// Holds the lock for its whole lifetime, changes are made on a working copy
#[derive(Debug)]
pub struct MemoryTransaction {
    /// The committed state, locked
    committed: OwnedMutexGuard<Tables>,

    /// The state including the changes of this transaction
    working: Tables,
}

#[async_trait]
impl Gateway for MemoryTransaction {
    async fn load_row(&mut self, parent_id: AliasId, text_md5: &str) -> Result<Option<AliasRow>> {
        Ok(self
            .working
            .rows
            .get(&(parent_id, text_md5.to_string()))
            .cloned())
    }

    async fn load_url_alias_data(&mut self, hashes: &[String]) -> Result<Vec<AliasRow>> {
        Ok(self
            .working
            .rows
            .values()
            .filter(|row| !row.is_custom && hashes.contains(&row.text_md5))
            .cloned()
            .collect())
    }

    async fn load_rows_by_id(&mut self, id: AliasId) -> Result<Vec<AliasRow>> {
        Ok(self
            .working
            .rows
            .values()
            .filter(|row| row.id == id)
            .cloned()
            .collect())
    }

    async fn load_location_entries(
        &mut self,
        location_id: LocationId,
        custom: bool,
    ) -> Result<Vec<AliasRow>> {
        let action = Action::Location(location_id);

        Ok(self
            .working
            .rows
            .values()
            .filter(|row| row.action == action && row.is_custom == custom && !row.is_history)
            .cloned()
            .collect())
    }

    async fn load_global_entries(
        &mut self,
        language_mask: Option<LanguageMask>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<AliasRow>> {
        Ok(self
            .working
            .rows
            .values()
            .filter(|row| {
                matches!(row.action, Action::Resource(_))
                    && row.is_custom
                    && !row.is_history
                    && language_mask.is_none_or(|mask| row.language_mask.matches(mask))
            })
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn load_autogenerated_entry(
        &mut self,
        action: &Action,
        parent_id: Option<AliasId>,
    ) -> Result<Option<AliasRow>> {
        Ok(self
            .working
            .autogenerated_entries(action)
            .find(|row| parent_id.is_none_or(|parent_id| row.parent_id == parent_id))
            .cloned())
    }

    async fn insert_row(&mut self, values: &InsertRowValues<'_>) -> Result<AliasId> {
        let key = (values.parent_id, values.text_md5.to_string());

        if self.working.rows.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "Row {}-{} already exists",
                values.parent_id, values.text_md5
            )));
        }

        let id = match values.id {
            Some(id) => {
                self.working.last_id = self.working.last_id.max(id);
                id
            }
            None => self.next_id().await?,
        };

        let row = AliasRow {
            id,
            parent_id: values.parent_id,
            text_md5: values.text_md5.to_string(),
            text: values.text.to_string(),
            action: values.action.clone(),
            language_mask: values.language_mask,
            is_custom: values.is_custom,
            is_history: false,
            forward: values.forward,
            link: id,
        };

        self.working.rows.insert(key, row);

        Ok(id)
    }

    async fn update_row(
        &mut self,
        parent_id: AliasId,
        text_md5: &str,
        values: &UpdateRowValues<'_>,
    ) -> Result<()> {
        if let Some(row) = self
            .working
            .rows
            .get_mut(&(parent_id, text_md5.to_string()))
        {
            values.apply(row);

            self.working.last_id = self.working.last_id.max(row.id);
        }

        Ok(())
    }

    async fn historize(&mut self, id: AliasId, link: AliasId) -> Result<()> {
        for row in self.working.rows.values_mut() {
            if row.id == id && !row.is_custom && !row.is_history {
                row.is_history = true;
                row.link = link;
            }
        }

        Ok(())
    }

    async fn reparent(&mut self, old_parent_id: AliasId, new_parent_id: AliasId) -> Result<()> {
        self.working.move_rows(new_parent_id, |row| {
            row.parent_id == old_parent_id && !row.is_custom
        })
    }

    async fn move_children(
        &mut self,
        old_parent_id: AliasId,
        new_parent_id: AliasId,
    ) -> Result<()> {
        self.working.move_rows(new_parent_id, |row| row.parent_id == old_parent_id)
    }

    async fn next_id(&mut self) -> Result<AliasId> {
        self.working.last_id += 1;

        Ok(self.working.last_id)
    }

    async fn is_root_entry(&mut self, id: AliasId) -> Result<bool> {
        Ok(self
            .working
            .rows
            .values()
            .any(|row| row.id == id && row.is_root_entry()))
    }

    async fn remove_custom_alias(&mut self, parent_id: AliasId, text_md5: &str) -> Result<bool> {
        match self
            .working
            .rows
            .get_mut(&(parent_id, text_md5.to_string()))
        {
            Some(row) if row.is_custom => {
                row.action = Action::Nop;
                row.language_mask = row.language_mask.with_always_available(true);
                row.is_custom = false;
                row.forward = false;

                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_by_action(&mut self, action: &Action) -> Result<()> {
        for row in self.working.rows.values_mut() {
            if &row.action == action && !row.is_custom {
                row.action = Action::Nop;
                row.language_mask = row.language_mask.with_always_available(true);
            }
        }

        Ok(())
    }

    async fn load_location(&mut self, location_id: LocationId) -> Result<Option<Location>> {
        Ok(self.working.locations.get(&location_id).cloned())
    }

    async fn load_child_locations(&mut self, parent_id: LocationId) -> Result<Vec<Location>> {
        Ok(self
            .working
            .locations
            .values()
            .filter(|location| location.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn insert_location(&mut self, location: &Location) -> Result<()> {
        if self.working.locations.contains_key(&location.id) {
            return Err(Error::Conflict(format!(
                "Location {} already exists",
                location.id
            )));
        }

        self.working.locations.insert(location.id, location.clone());

        Ok(())
    }

    async fn update_location_parent(
        &mut self,
        location_id: LocationId,
        parent_id: LocationId,
    ) -> Result<()> {
        if let Some(location) = self.working.locations.get_mut(&location_id) {
            location.parent_id = parent_id;
        }

        Ok(())
    }

    async fn delete_location(&mut self, location_id: LocationId) -> Result<()> {
        self.working.locations.remove(&location_id);

        Ok(())
    }

    async fn next_location_id(&mut self) -> Result<LocationId> {
        Ok(self
            .working
            .locations
            .keys()
            .next_back()
            .map_or(1, |last| last + 1))
    }

    async fn commit(mut self) -> Result<()> {
        *self.committed = std::mem::take(&mut self.working);

        Ok(())
    }
}
