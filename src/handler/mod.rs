//! URL alias handler
//!
//! Publishes, resolves and reorganizes aliases on top of a [`Storage`](Storage). Every public
//! operation runs in a single storage transaction.

use std::sync::Arc;

use thiserror::Error;

pub use publisher::Disambiguation;
pub use publisher::NumericSuffix;
pub use publisher::Reject;

use crate::aliases::Action;
use crate::aliases::AliasId;
use crate::aliases::AliasRow;
use crate::aliases::LocationId;
use crate::aliases::UrlAlias;
use crate::languages::Language;
use crate::languages::LanguageMask;
use crate::languages::Languages;
use crate::locations::Location;
use crate::locations::NO_PARENT;
use crate::storage;
use crate::storage::Gateway;
use crate::storage::Storage;

mod publisher;
mod reorganizer;
mod resolver;

/// Deepest supported alias or location hierarchy
const MAX_DEPTH: usize = 255;

/// Handler errors
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing found for the request, including language mismatches
    #[error("{0}")]
    NotFound(String),

    /// The operation is not allowed, like overwriting an existing path
    #[error("{0}")]
    Forbidden(String),

    /// No free path element could be found
    #[error("{0}")]
    Conflict(String),

    /// Malformed input or hierarchy data
    #[error("{0}")]
    InvalidArgument(String),

    /// The storage failed, passed on unchanged
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// Result type for all handler operations
pub type Result<T> = core::result::Result<T, Error>;

/// The URL alias handler
#[derive(Clone)]
pub struct UrlAliasHandler<S: Storage> {
    /// Storage of the rows and locations
    storage: S,

    /// Configured languages
    languages: Arc<Languages>,

    /// Location the root entry points to
    root_location_id: LocationId,

    /// Strategy for path element collisions
    disambiguation: Arc<dyn Disambiguation>,
}

impl<S: Storage> UrlAliasHandler<S> {
    /// Create a new handler
    pub fn new(
        storage: S,
        languages: Languages,
        root_location_id: LocationId,
        disambiguation: Arc<dyn Disambiguation>,
    ) -> Self {
        Self {
            storage,
            languages: Arc::new(languages),
            root_location_id,
            disambiguation,
        }
    }

    /// Make sure the root location and its root entry exist
    ///
    /// The root entry is always available in the default language
    pub async fn ensure_root(&self) -> Result<()> {
        let mut transaction = self.storage.begin().await?;

        if transaction
            .load_location(self.root_location_id)
            .await?
            .is_none()
        {
            tracing::info!("Creating root location {}", self.root_location_id);

            transaction
                .insert_location(&Location {
                    id: self.root_location_id,
                    parent_id: NO_PARENT,
                })
                .await?;
        }

        let action = Action::Location(self.root_location_id);

        if transaction
            .load_autogenerated_entry(&action, Some(0))
            .await?
            .is_none()
        {
            tracing::info!("Creating root entry for location {}", self.root_location_id);

            let mask = LanguageMask::from_language(self.languages.default_language())
                .with_always_available(true);

            self.place_autogenerated(&mut transaction, &action, 0, "", mask, None)
                .await?;
        }

        transaction.commit().await?;

        Ok(())
    }

    /// Find a configured language
    fn language(&self, code: &str) -> Result<&Language> {
        self.languages
            .by_code(code)
            .ok_or_else(|| Error::NotFound(format!("Language '{code}' not found")))
    }

    /// Load a location or fail
    async fn load_location(
        transaction: &mut S::Transaction,
        location_id: LocationId,
    ) -> Result<Location> {
        transaction
            .load_location(location_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {location_id} not found")))
    }

    /// ID the children of a location hang on, if it has an alias
    ///
    /// Children of the root location are top level rows
    async fn alias_id_for_location(
        &self,
        transaction: &mut S::Transaction,
        location_id: LocationId,
    ) -> Result<Option<AliasId>> {
        if location_id == self.root_location_id {
            return Ok(Some(0));
        }

        Ok(transaction
            .load_autogenerated_entry(&Action::Location(location_id), None)
            .await?
            .map(|row| row.id))
    }

    /// Like [`alias_id_for_location`](Self::alias_id_for_location), but the alias must exist
    async fn real_alias_id(
        &self,
        transaction: &mut S::Transaction,
        location_id: LocationId,
    ) -> Result<AliasId> {
        self.alias_id_for_location(transaction, location_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Could not find URL alias for location {location_id}"))
            })
    }

    /// Is `location_id` the same as or a descendant of `ancestor_id`?
    async fn is_within_subtree(
        transaction: &mut S::Transaction,
        location_id: LocationId,
        ancestor_id: LocationId,
    ) -> Result<bool> {
        let mut current = location_id;

        for _ in 0..MAX_DEPTH {
            if current == ancestor_id {
                return Ok(true);
            }

            match transaction.load_location(current).await? {
                Some(location) if location.parent_id != NO_PARENT => current = location.parent_id,
                _ => return Ok(false),
            }
        }

        Err(Error::InvalidArgument(format!("Location hierarchy of {location_id} is too deep")))
    }

    /// Pick the row best matching the prioritized languages
    ///
    /// Live rows win over history rows
    fn best_row(&self, rows: Vec<AliasRow>, prioritized: &[String]) -> Option<AliasRow> {
        rows.into_iter().min_by_key(|row| {
            (
                row.is_history,
                self.languages.rank(row.language_mask, prioritized),
            )
        })
    }

    /// Compose the full path of a row, bottom-up
    async fn compose_path(
        &self,
        transaction: &mut S::Transaction,
        row: &AliasRow,
        prioritized: &[String],
    ) -> Result<String> {
        let mut texts = vec![row.text.clone()];
        let mut parent_id = row.parent_id;

        while parent_id != 0 {
            if texts.len() > MAX_DEPTH {
                return Err(Error::InvalidArgument(format!(
                    "Alias hierarchy of {} is too deep",
                    row.key()
                )));
            }

            if transaction.is_root_entry(parent_id).await? {
                break;
            }

            let parents = transaction.load_rows_by_id(parent_id).await?;

            let parent = self.best_row(parents, prioritized).ok_or_else(|| {
                Error::InvalidArgument(format!("Missing parent alias {parent_id}"))
            })?;

            parent_id = parent.parent_id;
            texts.push(parent.text);
        }

        texts.reverse();

        Ok(texts.join("/"))
    }

    /// Turn a row into a resolved alias
    async fn build_url_alias(
        &self,
        transaction: &mut S::Transaction,
        row: &AliasRow,
        prioritized: &[String],
    ) -> Result<UrlAlias> {
        let path = self.compose_path(transaction, row, prioritized).await?;

        Ok(UrlAlias {
            id: row.key().to_string(),
            destination: row.action.clone(),
            path,
            language_codes: self.languages.codes_for(row.language_mask),
            always_available: row.language_mask.is_always_available(),
            is_history: row.is_history,
            is_custom: row.is_custom,
            forward: row.forward,
        })
    }
}
