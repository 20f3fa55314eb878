//! All things related to the storage of alias rows and locations

use async_trait::async_trait;
use thiserror::Error;

pub use memory::Memory;
pub use postgres::Postgres;

use crate::aliases::Action;
use crate::aliases::AliasId;
use crate::aliases::AliasRow;
use crate::aliases::LocationId;
use crate::languages::LanguageMask;
use crate::locations::Location;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),

    /// A row with the same key already exists
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to insert an alias row
pub struct InsertRowValues<'a> {
    /// ID to use, a fresh ID is taken when `None`
    pub id: Option<AliasId>,

    /// Parent ID
    pub parent_id: AliasId,

    /// Segment text
    pub text: &'a str,

    /// Hash of the lowercased text
    pub text_md5: &'a str,

    /// Target of the row
    pub action: &'a Action,

    /// Languages of the row
    pub language_mask: LanguageMask,

    /// User chosen alias
    pub is_custom: bool,

    /// Redirect to the canonical path
    pub forward: bool,
}

/// Values to update an alias row, only provided values are touched
#[derive(Default)]
pub struct UpdateRowValues<'a> {
    /// New ID
    pub id: Option<AliasId>,

    /// New link
    pub link: Option<AliasId>,

    /// New text, keeps the hash the same but can change the casing
    pub text: Option<&'a str>,

    /// New target
    pub action: Option<&'a Action>,

    /// New languages
    pub language_mask: Option<LanguageMask>,

    /// New custom flag
    pub is_custom: Option<bool>,

    /// New history flag
    pub is_history: Option<bool>,

    /// New forward flag
    pub forward: Option<bool>,
}

impl UpdateRowValues<'_> {
    /// Apply the values to a row
    pub fn apply(&self, row: &mut AliasRow) {
        if let Some(id) = self.id {
            row.id = id;
        }

        if let Some(link) = self.link {
            row.link = link;
        }

        if let Some(text) = self.text {
            row.text = text.to_string();
        }

        if let Some(action) = self.action {
            row.action = action.clone();
        }

        if let Some(language_mask) = self.language_mask {
            row.language_mask = language_mask;
        }

        if let Some(is_custom) = self.is_custom {
            row.is_custom = is_custom;
        }

        if let Some(is_history) = self.is_history {
            row.is_history = is_history;
        }

        if let Some(forward) = self.forward {
            row.forward = forward;
        }
    }
}

/// Storage that hands out transactions
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Transaction type of the storage
    type Transaction: Gateway;

    /// Start a transaction
    ///
    /// Dropping the transaction without committing rolls back all changes
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// All supported row operations, executed within a single transaction
#[async_trait]
pub trait Gateway: Send + Sized {
    /// Load a single row by its composite key
    async fn load_row(&mut self, parent_id: AliasId, text_md5: &str) -> Result<Option<AliasRow>>;

    /// Load all autogenerated rows with a text hash in `hashes`
    ///
    /// Includes history and NOP rows, excludes custom rows
    async fn load_url_alias_data(&mut self, hashes: &[String]) -> Result<Vec<AliasRow>>;

    /// Load all rows with the given ID, any state
    async fn load_rows_by_id(&mut self, id: AliasId) -> Result<Vec<AliasRow>>;

    /// Load all live rows pointing to a location
    ///
    /// Either the custom or the autogenerated ones
    async fn load_location_entries(
        &mut self,
        location_id: LocationId,
        custom: bool,
    ) -> Result<Vec<AliasRow>>;

    /// Load live global aliases, optionally limited to a language
    async fn load_global_entries(
        &mut self,
        language_mask: Option<LanguageMask>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<AliasRow>>;

    /// Load a live autogenerated row for an action, optionally on a given level
    async fn load_autogenerated_entry(
        &mut self,
        action: &Action,
        parent_id: Option<AliasId>,
    ) -> Result<Option<AliasRow>>;

    /// Insert a row, returns its ID
    ///
    /// Fails with a conflict when the composite key already exists
    async fn insert_row(&mut self, values: &InsertRowValues<'_>) -> Result<AliasId>;

    /// Update a single row by its composite key
    async fn update_row(
        &mut self,
        parent_id: AliasId,
        text_md5: &str,
        values: &UpdateRowValues<'_>,
    ) -> Result<()>;

    /// Mark all live autogenerated rows with `id` as history, redirecting to `link`
    async fn historize(&mut self, id: AliasId, link: AliasId) -> Result<()>;

    /// Move all autogenerated rows, history included, to another parent
    async fn reparent(&mut self, old_parent_id: AliasId, new_parent_id: AliasId) -> Result<()>;

    /// Move all rows, custom ones included, to another parent
    ///
    /// Fails with a conflict when the new parent already has a row with the same key
    async fn move_children(&mut self, old_parent_id: AliasId, new_parent_id: AliasId) -> Result<()>;

    /// Reserve the next row ID
    async fn next_id(&mut self) -> Result<AliasId>;

    /// Is the row with `id` the special root entry?
    ///
    /// The root entry has `parent_id=0` and an empty text
    async fn is_root_entry(&mut self, id: AliasId) -> Result<bool>;

    /// Convert a custom row into an always available NOP row, `false` when there was no such row
    async fn remove_custom_alias(&mut self, parent_id: AliasId, text_md5: &str) -> Result<bool>;

    /// Convert all autogenerated rows with the action into always available NOP rows
    async fn remove_by_action(&mut self, action: &Action) -> Result<()>;

    /// Load a location
    async fn load_location(&mut self, location_id: LocationId) -> Result<Option<Location>>;

    /// Load the direct children of a location
    async fn load_child_locations(&mut self, parent_id: LocationId) -> Result<Vec<Location>>;

    /// Insert a location
    async fn insert_location(&mut self, location: &Location) -> Result<()>;

    /// Move a location to another parent
    async fn update_location_parent(
        &mut self,
        location_id: LocationId,
        parent_id: LocationId,
    ) -> Result<()>;

    /// Delete a location
    async fn delete_location(&mut self, location_id: LocationId) -> Result<()>;

    /// Reserve the next location ID
    async fn next_location_id(&mut self) -> Result<LocationId>;

    /// Make all changes of the transaction permanent
    async fn commit(self) -> Result<()>;
}
