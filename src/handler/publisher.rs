//! Publishing of autogenerated, custom and global aliases

use core::fmt;

use crate::aliases::Action;
use crate::aliases::AliasId;
use crate::aliases::AliasRow;
use crate::aliases::LocationId;
use crate::aliases::UrlAlias;
use crate::aliases::hash_text;
use crate::aliases::path_segments;
use crate::languages::Language;
use crate::languages::LanguageMask;
use crate::slug;
use crate::storage::Gateway;
use crate::storage::InsertRowValues;
use crate::storage::Storage;
use crate::storage::UpdateRowValues;

use super::Error;
use super::MAX_DEPTH;
use super::Result;
use super::UrlAliasHandler;

/// Fallback for names without any usable character
const DEFAULT_NAME: &str = "noname";

/// Strategy to find a free path element when the wanted one is taken
pub trait Disambiguation: fmt::Debug + Send + Sync {
    /// Candidate for the given attempt, starting at 1 with the base itself
    ///
    /// `None` gives up
    fn candidate(&self, base: &str, attempt: u32) -> Option<String>;
}

/// Append an increasing number, `name`, `name2`, `name3` and so on
#[derive(Clone, Copy, Debug, Default)]
pub struct NumericSuffix;

impl NumericSuffix {
    /// Highest suffix tried before giving up
    const MAX_ATTEMPTS: u32 = 10_000;
}

impl Disambiguation for NumericSuffix {
    fn candidate(&self, base: &str, attempt: u32) -> Option<String> {
        match attempt {
            1 => Some(base.to_string()),
            attempt if attempt <= Self::MAX_ATTEMPTS => Some(format!("{base}{attempt}")),
            _ => None,
        }
    }
}

/// Never disambiguate, a taken path element is a conflict
#[derive(Clone, Copy, Debug, Default)]
pub struct Reject;

impl Disambiguation for Reject {
    fn candidate(&self, base: &str, attempt: u32) -> Option<String> {
        (attempt == 1).then(|| base.to_string())
    }
}

impl<S: Storage> UrlAliasHandler<S> {
    /// Publish the autogenerated alias of a location in a language
    ///
    /// A changed name turns the previous alias in that language into history, other languages
    /// sharing the previous alias keep it.
    pub async fn publish_url_alias_for_location(
        &self,
        location_id: LocationId,
        name: &str,
        language_code: &str,
        always_available: bool,
    ) -> Result<UrlAlias> {
        let language = self.language(language_code)?.clone();

        let mut transaction = self.storage.begin().await?;

        let location = Self::load_location(&mut transaction, location_id).await?;

        let (parent_id, text) = if location_id == self.root_location_id {
            (0, String::new())
        } else {
            (
                self.real_alias_id(&mut transaction, location.parent_id)
                    .await?,
                slug::convert(name, DEFAULT_NAME),
            )
        };

        let action = Action::Location(location_id);
        let language_mask =
            LanguageMask::from_language(&language).with_always_available(always_available);

        let row = self
            .place_autogenerated(
                &mut transaction,
                &action,
                parent_id,
                &text,
                language_mask,
                None,
            )
            .await?;

        self.cleanup_after_publish(&mut transaction, location_id, &language, &row)
            .await?;

        let alias = self
            .build_url_alias(&mut transaction, &row, &[language.code.clone()])
            .await?;

        transaction.commit().await?;

        tracing::debug!(
            "Published '{}' for location {location_id} in {}",
            alias.path,
            language.code
        );

        Ok(alias)
    }

    /// Store an autogenerated row on a level, disambiguating the text when it is taken
    ///
    /// NOP rows, history rows and rows with the same action are taken over. The row gets the ID
    /// `id`, else the ID of the existing entry of the action on this level.
    pub(super) async fn place_autogenerated(
        &self,
        transaction: &mut S::Transaction,
        action: &Action,
        parent_id: AliasId,
        base: &str,
        language_mask: LanguageMask,
        id: Option<AliasId>,
    ) -> Result<AliasRow> {
        let mut attempt = 1;

        loop {
            let text = if base.is_empty() {
                (attempt == 1).then(String::new)
            } else {
                self.disambiguation.candidate(base, attempt)
            }
            .ok_or_else(|| Error::Conflict(format!("Path element '{base}' is already taken")))?;

            let text_md5 = hash_text(&text);

            let existing = transaction.load_row(parent_id, &text_md5).await?;

            let reusable = existing
                .as_ref()
                .is_none_or(|row| row.is_nop() || row.is_history || &row.action == action);

            if !reusable {
                attempt += 1;
                continue;
            }

            let entry_id = match id {
                Some(id) => Some(id),
                None => transaction
                    .load_autogenerated_entry(action, Some(parent_id))
                    .await?
                    .map(|row| row.id),
            };

            let row = match existing {
                None => {
                    let new_id = transaction
                        .insert_row(&InsertRowValues {
                            id: entry_id,
                            parent_id,
                            text: &text,
                            text_md5: &text_md5,
                            action,
                            language_mask,
                            is_custom: false,
                            forward: false,
                        })
                        .await?;

                    AliasRow {
                        id: new_id,
                        parent_id,
                        text_md5,
                        text,
                        action: action.clone(),
                        language_mask,
                        is_custom: false,
                        is_history: false,
                        forward: false,
                        link: new_id,
                    }
                }
                Some(mut row) => {
                    let new_id = entry_id.unwrap_or(row.id);

                    let is_same_entry = &row.action == action && !row.is_history && !row.is_custom;

                    let language_mask = if is_same_entry {
                        row.language_mask
                            .with_always_available(false)
                            .merge(language_mask)
                    } else {
                        language_mask
                    };

                    // Rows below the taken over row must stay reachable with its new ID
                    if row.id != new_id {
                        transaction.move_children(row.id, new_id).await?;
                    }

                    let values = UpdateRowValues {
                        id: Some(new_id),
                        link: Some(new_id),
                        text: Some(&text),
                        action: Some(action),
                        language_mask: Some(language_mask),
                        is_custom: Some(false),
                        is_history: Some(false),
                        forward: Some(false),
                    };

                    transaction
                        .update_row(parent_id, &text_md5, &values)
                        .await?;

                    values.apply(&mut row);
                    row
                }
            };

            return Ok(row);
        }
    }

    /// Retire the previous rows of a location in the published language
    ///
    /// Rows shared with other languages only lose the language, all others become history
    /// redirecting to the new row
    async fn cleanup_after_publish(
        &self,
        transaction: &mut S::Transaction,
        location_id: LocationId,
        language: &Language,
        published: &AliasRow,
    ) -> Result<()> {
        let rows = transaction
            .load_location_entries(location_id, false)
            .await?;

        for row in rows {
            if row.parent_id != published.parent_id
                || row.text_md5 == published.text_md5
                || !row.language_mask.contains(language)
            {
                continue;
            }

            if row.language_mask.is_composite() {
                let values = UpdateRowValues {
                    language_mask: Some(row.language_mask.strip(language)),
                    ..Default::default()
                };

                transaction
                    .update_row(row.parent_id, &row.text_md5, &values)
                    .await?;
            } else {
                let history_id = transaction.next_id().await?;

                let values = UpdateRowValues {
                    id: Some(history_id),
                    link: Some(published.id),
                    is_history: Some(true),
                    ..Default::default()
                };

                transaction
                    .update_row(row.parent_id, &row.text_md5, &values)
                    .await?;

                tracing::debug!(
                    "Moved '{}' of location {location_id} to history",
                    row.text
                );
            }
        }

        Ok(())
    }

    /// Create a custom alias for a location
    ///
    /// With `forwarding` the alias redirects to the autogenerated alias of the location
    pub async fn create_custom_url_alias(
        &self,
        location_id: LocationId,
        path: &str,
        forwarding: bool,
        language_code: Option<&str>,
        always_available: bool,
    ) -> Result<UrlAlias> {
        let language = self.language_or_default(language_code)?;

        let mut transaction = self.storage.begin().await?;

        Self::load_location(&mut transaction, location_id).await?;

        let alias = self
            .create_url_alias(
                &mut transaction,
                Action::Location(location_id),
                path,
                forwarding,
                &language,
                always_available,
            )
            .await?;

        transaction.commit().await?;

        tracing::debug!("Created custom alias '{}' for location {location_id}", alias.path);

        Ok(alias)
    }

    /// Create a global alias pointing to a resource, like `module:content/search`
    pub async fn create_global_url_alias(
        &self,
        resource: &str,
        path: &str,
        forwarding: bool,
        language_code: Option<&str>,
        always_available: bool,
    ) -> Result<UrlAlias> {
        let action = match Action::parse(resource) {
            Some(action @ Action::Resource(_)) => action,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "Resource '{resource}' is not supported, expected 'module:<path>'"
                )));
            }
        };

        let language = self.language_or_default(language_code)?;

        let mut transaction = self.storage.begin().await?;

        let alias = self
            .create_url_alias(
                &mut transaction,
                action,
                path,
                forwarding,
                &language,
                always_available,
            )
            .await?;

        transaction.commit().await?;

        tracing::debug!("Created global alias '{}' for {resource}", alias.path);

        Ok(alias)
    }

    /// Remove custom and global aliases, autogenerated aliases are skipped
    ///
    /// The rows stay as NOP rows, `false` when any alias was not removed
    pub async fn remove_url_aliases(&self, aliases: &[UrlAlias]) -> Result<bool> {
        let mut transaction = self.storage.begin().await?;
        let mut removed_all = true;

        for alias in aliases {
            if !alias.is_custom {
                removed_all = false;
                continue;
            }

            let key = alias.key().ok_or_else(|| {
                Error::InvalidArgument(format!("Invalid alias ID '{}'", alias.id))
            })?;

            if !transaction
                .remove_custom_alias(key.parent_id, &key.text_md5)
                .await?
            {
                removed_all = false;
            }
        }

        transaction.commit().await?;

        Ok(removed_all)
    }

    /// A language by code, the default language without one
    fn language_or_default(&self, language_code: Option<&str>) -> Result<Language> {
        match language_code {
            Some(code) => self.language(code).cloned(),
            None => Ok(self.languages.default_language().clone()),
        }
    }

    /// Store a user chosen path
    ///
    /// Missing intermediate elements become NOP rows. The leaf can take over NOP and history
    /// rows, or add the language to a custom row with the same target.
    async fn create_url_alias(
        &self,
        transaction: &mut S::Transaction,
        action: Action,
        path: &str,
        forward: bool,
        language: &Language,
        always_available: bool,
    ) -> Result<UrlAlias> {
        let segments = path_segments(path);

        let Some((leaf, elements)) = segments.split_last() else {
            return Err(Error::InvalidArgument("Path can not be empty".to_string()));
        };

        if segments.len() > MAX_DEPTH {
            return Err(Error::InvalidArgument(format!("Path '{path}' is too deep")));
        }

        let mut parent_id = 0;
        let mut is_path_new = false;

        for (level, element) in elements.iter().enumerate() {
            let text = slug::convert(element, &format!("{DEFAULT_NAME}{}", level + 1));
            let text_md5 = hash_text(&text);

            if !is_path_new {
                match transaction.load_row(parent_id, &text_md5).await? {
                    Some(row) => {
                        parent_id = row.link;
                        continue;
                    }
                    None => is_path_new = true,
                }
            }

            parent_id = transaction
                .insert_row(&InsertRowValues {
                    id: None,
                    parent_id,
                    text: &text,
                    text_md5: &text_md5,
                    action: &Action::Nop,
                    language_mask: LanguageMask::EMPTY.with_always_available(true),
                    is_custom: false,
                    forward: false,
                })
                .await?;
        }

        let text = slug::convert(leaf, &format!("{DEFAULT_NAME}{}", elements.len() + 1));
        let text_md5 = hash_text(&text);
        let language_mask =
            LanguageMask::from_language(language).with_always_available(always_available);

        let existing = if is_path_new {
            None
        } else {
            transaction.load_row(parent_id, &text_md5).await?
        };

        let row = match existing {
            None => {
                let id = transaction
                    .insert_row(&InsertRowValues {
                        id: None,
                        parent_id,
                        text: &text,
                        text_md5: &text_md5,
                        action: &action,
                        language_mask,
                        is_custom: true,
                        forward,
                    })
                    .await?;

                AliasRow {
                    id,
                    parent_id,
                    text_md5,
                    text,
                    action,
                    language_mask,
                    is_custom: true,
                    is_history: false,
                    forward,
                    link: id,
                }
            }
            Some(mut row) if row.is_nop() || row.is_history => {
                let values = UpdateRowValues {
                    id: Some(row.id),
                    link: Some(row.id),
                    text: Some(&text),
                    action: Some(&action),
                    language_mask: Some(language_mask),
                    is_custom: Some(true),
                    is_history: Some(false),
                    forward: Some(forward),
                };

                transaction
                    .update_row(parent_id, &text_md5, &values)
                    .await?;

                values.apply(&mut row);
                row
            }
            Some(mut row)
                if row.is_custom && row.action == action && !row.language_mask.contains(language) =>
            {
                let values = UpdateRowValues {
                    language_mask: Some(row.language_mask.merge(language_mask)),
                    forward: Some(forward),
                    ..Default::default()
                };

                transaction
                    .update_row(parent_id, &text_md5, &values)
                    .await?;

                values.apply(&mut row);
                row
            }
            Some(_) => {
                return Err(Error::Forbidden(format!(
                    "Path '{path}' already exists for the given language"
                )));
            }
        };

        self.build_url_alias(transaction, &row, &[language.code.clone()])
            .await
    }
}
