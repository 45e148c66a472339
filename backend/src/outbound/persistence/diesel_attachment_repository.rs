//! Diesel-backed attachment metadata persistence.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::ports::{AttachmentRepository, RepositoryError};
use crate::domain::{AttachmentRecord, FileFilter, FileKind, FileSort, StorageKey, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{FileRow, NewFileRow, attachment_from_row};
use super::pool::DbPool;
use super::schema::files;

/// [`AttachmentRepository`] backed by PostgreSQL via Diesel.
#[derive(Debug, Clone)]
pub struct DieselAttachmentRepository {
    pool: DbPool,
}

impl DieselAttachmentRepository {
    /// Construct a repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards in a user-supplied search term.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

type BoxedFileQuery<'a> = files::BoxedQuery<'a, diesel::pg::Pg>;

/// Apply the owner scope and filter to a boxed `files` query.
fn filtered<'a>(owner: &'a UserId, filter: &FileFilter) -> BoxedFileQuery<'a> {
    let mut query = files::table
        .filter(files::user_id.eq(owner.as_uuid()))
        .into_boxed();
    match filter.kind {
        Some(FileKind::Image) => {
            query = query.filter(files::content_type.like("image/%"));
        }
        Some(FileKind::Document) => {
            query = query.filter(files::content_type.not_like("image/%"));
        }
        None => {}
    }
    if let Some(search) = filter.search.as_deref() {
        let trimmed = search.trim();
        if !trimmed.is_empty() {
            query = query.filter(files::name.ilike(format!("%{}%", escape_like(trimmed))));
        }
    }
    query
}

#[async_trait]
impl AttachmentRepository for DieselAttachmentRepository {
    async fn insert(&self, record: &AttachmentRecord) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let size = i64::try_from(record.size)
            .map_err(|_| RepositoryError::query("file size exceeds the storable range"))?;
        let row = NewFileRow {
            key: record.key.as_str(),
            user_id: *record.owner.as_uuid(),
            name: &record.filename,
            content_type: &record.content_type,
            size,
            tags: &record.tags,
            created_at: record.created_at,
        };
        diesel::insert_into(files::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find(&self, key: &StorageKey) -> Result<Option<AttachmentRecord>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = files::table
            .filter(files::key.eq(key.as_str()))
            .select(FileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(attachment_from_row).transpose()
    }

    async fn list(
        &self,
        owner: &UserId,
        filter: &FileFilter,
        page: &PageRequest,
    ) -> Result<(Vec<AttachmentRecord>, u64), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(owner, filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let query = filtered(owner, filter)
            .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .limit(i64::from(page.limit()))
            .select(FileRow::as_select());
        let rows: Vec<FileRow> = match filter.sort {
            FileSort::Recency => {
                query
                    .order(files::created_at.desc())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?
            }
            FileSort::Size => {
                query
                    .order(files::size.desc())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?
            }
        };
        let records = rows
            .into_iter()
            .map(attachment_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, u64::try_from(total).unwrap_or_default()))
    }

    async fn delete(&self, key: &StorageKey) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(files::table.filter(files::key.eq(key.as_str())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }
}
