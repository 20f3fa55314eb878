//! Path resolution, forward and reverse

use std::collections::HashMap;

use crate::aliases::Action;
use crate::aliases::AliasId;
use crate::aliases::AliasKey;
use crate::aliases::AliasRow;
use crate::aliases::LocationId;
use crate::aliases::UrlAlias;
use crate::aliases::hash_text;
use crate::aliases::path_segments;
use crate::languages::LanguageMask;
use crate::storage::Gateway;
use crate::storage::Storage;

use super::Error;
use super::MAX_DEPTH;
use super::Result;
use super::UrlAliasHandler;

/// Maximum number of history links followed for a redirect
const MAX_REDIRECT_HOPS: usize = 16;

impl<S: Storage> UrlAliasHandler<S> {
    /// Resolve a path into an alias
    ///
    /// The last segment must be valid in one of the prioritized languages or be always
    /// available, intermediate segments only have to be live. History rows only match the last
    /// segment.
    pub async fn lookup(&self, url: &str, prioritized: &[String]) -> Result<UrlAlias> {
        let mut transaction = self.storage.begin().await?;

        let wanted = self.languages.mask_for(prioritized);
        let segments = path_segments(url);

        if segments.len() > MAX_DEPTH {
            return Err(Error::NotFound(format!("Could not find URL alias for '{url}'")));
        }

        let row = if segments.is_empty() {
            transaction
                .load_row(0, &hash_text(""))
                .await?
                .filter(|row| is_usable(row, true, wanted))
        } else {
            self.walk(&mut transaction, &segments, wanted).await?
        };

        let row = row
            .ok_or_else(|| Error::NotFound(format!("Could not find URL alias for '{url}'")))?;

        tracing::debug!("Resolved '{url}' to {} ({})", row.key(), row.action);

        self.build_url_alias(&mut transaction, &row, prioritized).await
    }

    /// Walk the segments top-down, returns the matching leaf row
    ///
    /// Autogenerated rows for all segments are loaded at once. Levels missing from that batch
    /// and everything below a custom row are loaded one by one.
    async fn walk(
        &self,
        transaction: &mut S::Transaction,
        segments: &[&str],
        wanted: LanguageMask,
    ) -> Result<Option<AliasRow>> {
        let hashes = segments
            .iter()
            .map(|segment| hash_text(segment))
            .collect::<Vec<_>>();

        let batch = transaction
            .load_url_alias_data(&hashes)
            .await?
            .into_iter()
            .map(|row| ((row.parent_id, row.text_md5.clone()), row))
            .collect::<HashMap<_, _>>();

        let mut batched = true;
        let mut parent_ids: Vec<AliasId> = vec![0];
        let last = hashes.len() - 1;

        for (level, text_md5) in hashes.iter().enumerate() {
            let is_leaf = level == last;
            let mut found = None;

            for parent_id in &parent_ids {
                let row = match batch.get(&(*parent_id, text_md5.clone())) {
                    Some(row) if batched => Some(row.clone()),
                    _ => {
                        batched = false;
                        transaction.load_row(*parent_id, text_md5).await?
                    }
                };

                if let Some(row) = row.filter(|row| is_usable(row, is_leaf, wanted)) {
                    found = Some(row);
                    break;
                }
            }

            let Some(row) = found else {
                return Ok(None);
            };

            if is_leaf {
                return Ok(Some(row));
            }

            parent_ids = vec![row.id];

            // Custom location aliases also act as the real alias of their location
            if row.is_custom {
                batched = false;

                if let Action::Location(location_id) = row.action {
                    if let Some(alias_id) = self
                        .alias_id_for_location(transaction, location_id)
                        .await?
                        .filter(|alias_id| *alias_id != row.id)
                    {
                        parent_ids.push(alias_id);
                    }
                }
            }
        }

        Ok(None)
    }

    /// All aliases of a location usable in the prioritized languages
    ///
    /// Autogenerated aliases come first, then custom aliases
    pub async fn reverse_lookup(
        &self,
        location_id: LocationId,
        prioritized: &[String],
    ) -> Result<Vec<UrlAlias>> {
        let mut transaction = self.storage.begin().await?;

        Self::load_location(&mut transaction, location_id).await?;

        let wanted = self.languages.mask_for(prioritized);

        let mut rows = transaction
            .load_location_entries(location_id, false)
            .await?;
        rows.extend(transaction.load_location_entries(location_id, true).await?);
        rows.retain(|row| row.language_mask.matches(wanted));

        let mut aliases = Vec::with_capacity(rows.len());

        for row in &rows {
            aliases.push(
                self.build_url_alias(&mut transaction, row, prioritized)
                    .await?,
            );
        }

        Ok(aliases)
    }

    /// List the live aliases of a location, either custom or autogenerated
    ///
    /// Without prioritized languages all aliases are listed
    pub async fn list_url_aliases_for_location(
        &self,
        location_id: LocationId,
        custom: bool,
        prioritized: &[String],
    ) -> Result<Vec<UrlAlias>> {
        let mut transaction = self.storage.begin().await?;

        Self::load_location(&mut transaction, location_id).await?;

        let mut rows = transaction
            .load_location_entries(location_id, custom)
            .await?;

        if !prioritized.is_empty() {
            let wanted = self.languages.mask_for(prioritized);
            rows.retain(|row| row.language_mask.matches(wanted));
        }

        let mut aliases = Vec::with_capacity(rows.len());

        for row in &rows {
            aliases.push(
                self.build_url_alias(&mut transaction, row, prioritized)
                    .await?,
            );
        }

        Ok(aliases)
    }

    /// List global aliases, optionally only those usable in a language
    pub async fn list_global_url_aliases(
        &self,
        language_code: Option<&str>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<UrlAlias>> {
        let language_mask = match language_code {
            Some(code) => Some(LanguageMask::from_language(self.language(code)?)),
            None => None,
        };

        let prioritized = language_code
            .map(|code| vec![code.to_string()])
            .unwrap_or_default();

        let mut transaction = self.storage.begin().await?;

        let rows = transaction
            .load_global_entries(language_mask, offset, limit)
            .await?;

        let mut aliases = Vec::with_capacity(rows.len());

        for row in &rows {
            aliases.push(
                self.build_url_alias(&mut transaction, row, &prioritized)
                    .await?,
            );
        }

        Ok(aliases)
    }

    /// Load a single alias by its ID, see [`AliasKey`](AliasKey)
    pub async fn load_url_alias(&self, id: &str) -> Result<UrlAlias> {
        let key = AliasKey::parse(id)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid alias ID '{id}'")))?;

        let mut transaction = self.storage.begin().await?;

        let row = transaction
            .load_row(key.parent_id, &key.text_md5)
            .await?
            .filter(|row| !row.is_nop())
            .ok_or_else(|| Error::NotFound(format!("URL alias '{id}' not found")))?;

        self.build_url_alias(&mut transaction, &row, &[]).await
    }

    /// Path a history or forwarding alias redirects to
    ///
    /// History rows follow their links to the live row that replaced them, forwarding rows
    /// point to the autogenerated alias of their location or to their resource.
    /// `None` when the alias does not redirect or the target is gone.
    pub async fn redirect_path(
        &self,
        alias: &UrlAlias,
        prioritized: &[String],
    ) -> Result<Option<String>> {
        let key = alias
            .key()
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid alias ID '{}'", alias.id)))?;

        let mut transaction = self.storage.begin().await?;

        let Some(row) = transaction
            .load_row(key.parent_id, &key.text_md5)
            .await?
        else {
            return Ok(None);
        };

        if row.is_history {
            return self
                .follow_links(&mut transaction, row.link, prioritized)
                .await;
        }

        if !row.forward {
            return Ok(None);
        }

        match row.action {
            Action::Location(location_id) => {
                let rows = transaction
                    .load_location_entries(location_id, false)
                    .await?;

                match self.best_row(rows, prioritized) {
                    Some(target) => Ok(Some(
                        self.compose_path(&mut transaction, &target, prioritized)
                            .await?,
                    )),
                    None => Ok(None),
                }
            }
            Action::Resource(resource) => Ok(Some(
                resource
                    .split_once(':')
                    .map_or(resource.clone(), |(_, path)| path.to_string()),
            )),
            Action::Nop => Ok(None),
        }
    }

    /// Follow history links until a live row is reached
    async fn follow_links(
        &self,
        transaction: &mut S::Transaction,
        mut link: AliasId,
        prioritized: &[String],
    ) -> Result<Option<String>> {
        for _ in 0..MAX_REDIRECT_HOPS {
            let rows = transaction.load_rows_by_id(link).await?;

            let next_link = rows
                .iter()
                .find(|row| row.is_history && row.link != link)
                .map(|row| row.link);

            let live = rows
                .into_iter()
                .filter(|row| !row.is_history && !row.is_nop())
                .collect::<Vec<_>>();

            if let Some(target) = self.best_row(live, prioritized) {
                return Ok(Some(
                    self.compose_path(transaction, &target, prioritized)
                        .await?,
                ));
            }

            match next_link {
                Some(next_link) => link = next_link,
                None => return Ok(None),
            }
        }

        Ok(None)
    }
}

/// Can the row be used on its level?
///
/// Intermediate levels take live rows and NOP placeholders in any language. The leaf takes
/// live rows and history rows in the wanted languages, never NOP rows.
fn is_usable(row: &AliasRow, is_leaf: bool, wanted: LanguageMask) -> bool {
    if is_leaf {
        !row.is_nop() && row.language_mask.matches(wanted)
    } else {
        !row.is_history
    }
}
