//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

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

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// `SQLx` version of an alias row
#[derive(sqlx::FromRow)]
struct SqlxAliasRow {
    /// Row ID
    id: i64,

    /// Parent ID
    parent_id: i64,

    /// Hash of the lowercased text
    text_md5: String,

    /// Segment text
    text: String,

    /// Persisted action
    action: String,

    /// Raw language mask
    language_mask: i64,

    /// Custom flag
    is_custom: bool,

    /// History flag
    is_history: bool,

    /// Forward flag
    forward: bool,

    /// Link
    link: i64,
}

impl SqlxAliasRow {
    /// Create alias row from `SQLx` version
    fn into_alias_row(self) -> Result<AliasRow> {
        let action = Action::parse(&self.action).ok_or_else(|| {
            Error::Connection(format!("Invalid action stored: {}", self.action))
        })?;

        Ok(AliasRow {
            id: self.id,
            parent_id: self.parent_id,
            text_md5: self.text_md5,
            text: self.text,
            action,
            language_mask: LanguageMask::from_raw(self.language_mask),
            is_custom: self.is_custom,
            is_history: self.is_history,
            forward: self.forward,
            link: self.link,
        })
    }

    /// Maybe create alias row from `SQLx` version
    fn into_alias_row_optional(row: Option<Self>) -> Result<Option<AliasRow>> {
        row.map(Self::into_alias_row).transpose()
    }

    /// Create multiple alias rows from `SQLx` version
    fn into_alias_row_multiple(rows: Vec<Self>) -> Result<Vec<AliasRow>> {
        rows.into_iter().map(Self::into_alias_row).collect()
    }
}

/// `SQLx` version of a location
#[derive(sqlx::FromRow)]
struct SqlxLocation {
    /// Location ID
    id: i64,

    /// Parent location ID
    parent_id: i64,
}

impl From<SqlxLocation> for Location {
    fn from(location: SqlxLocation) -> Self {
        Self {
            id: location.id,
            parent_id: location.parent_id,
        }
    }
}

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage
    ///
    /// Migrations will be run
    pub async fn new(database_url: &str) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

#[async_trait]
impl Storage for Postgres {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let transaction = self
            .connection_pool
            .begin()
            .await
            .map_err(connection_error)?;

        Ok(PostgresTransaction { transaction })
    }
}

/// Transaction on the Postgres storage
pub struct PostgresTransaction {
    /// The `SQLx` transaction, rolled back on drop
    transaction: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl Gateway for PostgresTransaction {
    async fn load_row(&mut self, parent_id: AliasId, text_md5: &str) -> Result<Option<AliasRow>> {
        let row = sqlx::query_as::<_, SqlxAliasRow>(
            r"
            SELECT *
            FROM urlalias
            WHERE parent_id = $1 AND text_md5 = $2
            LIMIT 1
            ",
        )
        .bind(parent_id)
        .bind(text_md5)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        SqlxAliasRow::into_alias_row_optional(row)
    }

    async fn load_url_alias_data(&mut self, hashes: &[String]) -> Result<Vec<AliasRow>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, SqlxAliasRow>(
            r"
            SELECT *
            FROM urlalias
            WHERE NOT is_custom AND text_md5 = ANY($1)
            ORDER BY parent_id, text_md5
            ",
        )
        .bind(hashes.to_vec())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        SqlxAliasRow::into_alias_row_multiple(rows)
    }

    async fn load_rows_by_id(&mut self, id: AliasId) -> Result<Vec<AliasRow>> {
        let rows = sqlx::query_as::<_, SqlxAliasRow>(
            r"
            SELECT *
            FROM urlalias
            WHERE id = $1
            ORDER BY parent_id, text_md5
            ",
        )
        .bind(id)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        SqlxAliasRow::into_alias_row_multiple(rows)
    }

    async fn load_location_entries(
        &mut self,
        location_id: LocationId,
        custom: bool,
    ) -> Result<Vec<AliasRow>> {
        let rows = sqlx::query_as::<_, SqlxAliasRow>(
            r"
            SELECT *
            FROM urlalias
            WHERE action = $1 AND is_custom = $2 AND NOT is_history
            ORDER BY parent_id, text_md5
            ",
        )
        .bind(Action::Location(location_id).to_string())
        .bind(custom)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        SqlxAliasRow::into_alias_row_multiple(rows)
    }

    async fn load_global_entries(
        &mut self,
        language_mask: Option<LanguageMask>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<AliasRow>> {
        let rows = sqlx::query_as::<_, SqlxAliasRow>(
            r"
            SELECT *
            FROM urlalias
            WHERE action LIKE 'module:%'
                AND is_custom
                AND NOT is_history
                AND (
                    $1::BIGINT IS NULL
                    OR (language_mask & 1) = 1
                    OR (language_mask & ($1::BIGINT & ~1::BIGINT)) <> 0
                )
            ORDER BY parent_id, text_md5
            OFFSET $2
            LIMIT $3
            ",
        )
        .bind(language_mask.map(LanguageMask::raw))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .bind(limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)))
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        SqlxAliasRow::into_alias_row_multiple(rows)
    }

    async fn load_autogenerated_entry(
        &mut self,
        action: &Action,
        parent_id: Option<AliasId>,
    ) -> Result<Option<AliasRow>> {
        let row = sqlx::query_as::<_, SqlxAliasRow>(
            r"
            SELECT *
            FROM urlalias
            WHERE action = $1
                AND NOT is_custom
                AND NOT is_history
                AND ($2::BIGINT IS NULL OR parent_id = $2)
            ORDER BY parent_id, text_md5
            LIMIT 1
            ",
        )
        .bind(action.to_string())
        .bind(parent_id)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        SqlxAliasRow::into_alias_row_optional(row)
    }

    async fn insert_row(&mut self, values: &InsertRowValues<'_>) -> Result<AliasId> {
        let id = match values.id {
            Some(id) => id,
            None => self.next_id().await?,
        };

        sqlx::query(
            r"
            INSERT INTO urlalias
                (id, parent_id, text_md5, text, action, language_mask,
                is_custom, is_history, forward, link)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $1)
            ",
        )
        .bind(id)
        .bind(values.parent_id)
        .bind(values.text_md5)
        .bind(values.text)
        .bind(values.action.to_string())
        .bind(values.language_mask.raw())
        .bind(values.is_custom)
        .bind(values.forward)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(id)
    }

    async fn update_row(
        &mut self,
        parent_id: AliasId,
        text_md5: &str,
        values: &UpdateRowValues<'_>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE urlalias
            SET id = COALESCE($3, id),
                link = COALESCE($4, link),
                text = COALESCE($5, text),
                action = COALESCE($6, action),
                language_mask = COALESCE($7, language_mask),
                is_custom = COALESCE($8, is_custom),
                is_history = COALESCE($9, is_history),
                forward = COALESCE($10, forward)
            WHERE parent_id = $1 AND text_md5 = $2
            ",
        )
        .bind(parent_id)
        .bind(text_md5)
        .bind(values.id)
        .bind(values.link)
        .bind(values.text)
        .bind(values.action.map(ToString::to_string))
        .bind(values.language_mask.map(LanguageMask::raw))
        .bind(values.is_custom)
        .bind(values.is_history)
        .bind(values.forward)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn historize(&mut self, id: AliasId, link: AliasId) -> Result<()> {
        sqlx::query(
            r"
            UPDATE urlalias
            SET is_history = TRUE, link = $2
            WHERE id = $1 AND NOT is_custom AND NOT is_history
            ",
        )
        .bind(id)
        .bind(link)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn reparent(&mut self, old_parent_id: AliasId, new_parent_id: AliasId) -> Result<()> {
        sqlx::query(
            r"
            UPDATE urlalias
            SET parent_id = $2
            WHERE parent_id = $1 AND NOT is_custom
            ",
        )
        .bind(old_parent_id)
        .bind(new_parent_id)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn move_children(
        &mut self,
        old_parent_id: AliasId,
        new_parent_id: AliasId,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE urlalias
            SET parent_id = $2
            WHERE parent_id = $1
            ",
        )
        .bind(old_parent_id)
        .bind(new_parent_id)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn next_id(&mut self) -> Result<AliasId> {
        sqlx::query_scalar::<_, i64>("SELECT nextval('urlalias_id_seq')")
            .fetch_one(&mut *self.transaction)
            .await
            .map_err(connection_error)
    }

    async fn is_root_entry(&mut self, id: AliasId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM urlalias
                WHERE id = $1 AND parent_id = 0 AND text = ''
            )
            ",
        )
        .bind(id)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(connection_error)
    }

    async fn remove_custom_alias(&mut self, parent_id: AliasId, text_md5: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE urlalias
            SET action = 'nop:',
                language_mask = language_mask | 1,
                is_custom = FALSE,
                forward = FALSE
            WHERE parent_id = $1 AND text_md5 = $2 AND is_custom
            ",
        )
        .bind(parent_id)
        .bind(text_md5)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_by_action(&mut self, action: &Action) -> Result<()> {
        sqlx::query(
            r"
            UPDATE urlalias
            SET action = 'nop:', language_mask = language_mask | 1
            WHERE action = $1 AND NOT is_custom
            ",
        )
        .bind(action.to_string())
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn load_location(&mut self, location_id: LocationId) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, SqlxLocation>(
            r"
            SELECT *
            FROM locations
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(location_id)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        Ok(location.map(Location::from))
    }

    async fn load_child_locations(&mut self, parent_id: LocationId) -> Result<Vec<Location>> {
        let locations = sqlx::query_as::<_, SqlxLocation>(
            r"
            SELECT *
            FROM locations
            WHERE parent_id = $1
            ORDER BY id
            ",
        )
        .bind(parent_id)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(connection_error)?;

        Ok(locations.into_iter().map(Location::from).collect())
    }

    async fn insert_location(&mut self, location: &Location) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO locations (id, parent_id)
            VALUES ($1, $2)
            ",
        )
        .bind(location.id)
        .bind(location.parent_id)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn update_location_parent(
        &mut self,
        location_id: LocationId,
        parent_id: LocationId,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE locations
            SET parent_id = $2
            WHERE id = $1
            ",
        )
        .bind(location_id)
        .bind(parent_id)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn delete_location(&mut self, location_id: LocationId) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM locations
            WHERE id = $1
            ",
        )
        .bind(location_id)
        .execute(&mut *self.transaction)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn next_location_id(&mut self) -> Result<LocationId> {
        // concurrent copies would otherwise hand out the same ID
        sqlx::query("LOCK TABLE locations IN EXCLUSIVE MODE")
            .execute(&mut *self.transaction)
            .await
            .map_err(connection_error)?;

        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(id), 0) + 1 FROM locations")
            .fetch_one(&mut *self.transaction)
            .await
            .map_err(connection_error)
    }

    async fn commit(self) -> Result<()> {
        self.transaction.commit().await.map_err(connection_error)
    }
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}

/// Convert `SQLx` write errors, unique violations become conflicts
fn write_error(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(database_error) if database_error.is_unique_violation() => {
            Error::Conflict(database_error.message().to_string())
        }
        _ => connection_error(err),
    }
}
