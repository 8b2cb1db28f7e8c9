use chrono::NaiveDate;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::models::client::{Client, ClientPayload};
use crate::db::models::user::{ROLE_ADMIN, ROLE_SUPERADMIN};

/// Store-layer failures, handled at the handler boundary (never propagated
/// as an uncaught error). Persistence failures are not retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("client {0} not found")]
    NotFound(i32),
    #[error("activity entry {0} not found")]
    EntryNotFound(i32),
    #[error("operation requires administrator privileges")]
    Forbidden,
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Permanent deletion is restricted to admin/superadmin. The check lives
/// here, at the single choke point where the row is removed, so no caller
/// with store access can bypass it.
pub fn can_purge(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_SUPERADMIN
}

/// Active or trashed partition, ordered the way the portal lists clients.
pub async fn fetch_clients(pool: &PgPool, deleted: bool) -> Result<Vec<Client>, StoreError> {
    let clients = sqlx::query_as::<_, Client>(
        "SELECT * FROM clients WHERE deleted = $1 ORDER BY upload_date DESC, id DESC",
    )
    .bind(deleted)
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

pub async fn fetch_client(pool: &PgPool, id: i32) -> Result<Client, StoreError> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound(id))
}

/// Inserts a validated draft. The id is issued by the database sequence and
/// `upload_date` is stamped here, date-only.
pub async fn insert_client(
    pool: &PgPool,
    payload: &ClientPayload,
    added_by: &str,
    today: NaiveDate,
) -> Result<Client, StoreError> {
    let client = sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients
            (name, phone, identity_number, status, upload_date, completion_date,
             rejection_reason, pending_reason, acqara_approved, mawara_approved,
             completed_service, incomplete_reason, installment_notes,
             service_completion_date, added_by, processed_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NULL)
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.phone)
    .bind(&payload.identity_number)
    .bind(&payload.status)
    .bind(today)
    .bind(payload.completion_date)
    .bind(&payload.rejection_reason)
    .bind(&payload.pending_reason)
    .bind(payload.acqara_approved)
    .bind(payload.mawara_approved)
    .bind(payload.completed_service)
    .bind(&payload.incomplete_reason)
    .bind(&payload.installment_notes)
    .bind(payload.service_completion_date)
    .bind(added_by)
    .fetch_one(pool)
    .await?;
    Ok(client)
}

/// Writes the full mutable field set of an existing row. Identity,
/// `upload_date`, `added_by` and the partition fields are never touched by
/// an update; soft delete and restore have their own operations.
pub async fn update_client(pool: &PgPool, client: &Client) -> Result<Client, StoreError> {
    sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients SET
            name = $2, phone = $3, identity_number = $4, status = $5,
            completion_date = $6, rejection_reason = $7, pending_reason = $8,
            acqara_approved = $9, mawara_approved = $10, completed_service = $11,
            incomplete_reason = $12, installment_notes = $13,
            service_completion_date = $14, processed_by = $15
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(client.id)
    .bind(&client.name)
    .bind(&client.phone)
    .bind(&client.identity_number)
    .bind(&client.status)
    .bind(client.completion_date)
    .bind(&client.rejection_reason)
    .bind(&client.pending_reason)
    .bind(client.acqara_approved)
    .bind(client.mawara_approved)
    .bind(client.completed_service)
    .bind(&client.incomplete_reason)
    .bind(&client.installment_notes)
    .bind(client.service_completion_date)
    .bind(&client.processed_by)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound(client.id))
}

/// Moves an active client to the trash partition. The `deleted = FALSE`
/// predicate keeps the two partitions mutually exclusive: deleting an
/// already-trashed (or missing) client is a not-found, not a double delete.
pub async fn soft_delete_client(
    pool: &PgPool,
    id: i32,
    today: NaiveDate,
) -> Result<Client, StoreError> {
    sqlx::query_as::<_, Client>(
        "UPDATE clients SET deleted = TRUE, delete_date = $2 WHERE id = $1 AND deleted = FALSE RETURNING *",
    )
    .bind(id)
    .bind(today)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound(id))
}

/// Brings a trashed client back to the active partition.
pub async fn restore_client(pool: &PgPool, id: i32) -> Result<Client, StoreError> {
    sqlx::query_as::<_, Client>(
        "UPDATE clients SET deleted = FALSE, delete_date = NULL WHERE id = $1 AND deleted = TRUE RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound(id))
}

/// Irrecoverable removal, reachable only from the trash partition and only
/// for admin/superadmin actors.
pub async fn permanently_delete_client(
    pool: &PgPool,
    id: i32,
    actor_role: &str,
) -> Result<Client, StoreError> {
    if !can_purge(actor_role) {
        return Err(StoreError::Forbidden);
    }

    sqlx::query_as::<_, Client>(
        "DELETE FROM clients WHERE id = $1 AND deleted = TRUE RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound(id))
}

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// Case-insensitive substring search over name, phone and identity number in
/// the active partition. An empty term returns nothing by policy, never the
/// full list.
pub async fn search_clients(pool: &PgPool, term: &str) -> Result<Vec<Client>, StoreError> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = like_pattern(term);
    let clients = sqlx::query_as::<_, Client>(
        r#"
        SELECT * FROM clients
        WHERE deleted = FALSE
          AND (name ILIKE $1 OR phone ILIKE $1 OR identity_number ILIKE $1)
        ORDER BY upload_date DESC, id DESC
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_pool() -> PgPool {
        // Never actually connects; enough to exercise pre-query policy.
        PgPool::connect_lazy("postgres://localhost/unused").unwrap()
    }

    #[tokio::test]
    async fn empty_search_term_returns_nothing() {
        let pool = lazy_pool();
        assert!(search_clients(&pool, "").await.unwrap().is_empty());
        assert!(search_clients(&pool, "   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_is_refused_before_touching_the_database() {
        let pool = lazy_pool();
        let result = permanently_delete_client(&pool, 1, "employee").await;
        assert!(matches!(result, Err(StoreError::Forbidden)));
    }

    #[test]
    fn only_admin_roles_may_purge() {
        assert!(can_purge("admin"));
        assert!(can_purge("superadmin"));
        assert!(!can_purge("employee"));
        assert!(!can_purge(""));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a%b"), "%a\\%b%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
