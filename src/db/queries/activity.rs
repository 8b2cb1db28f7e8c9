use chrono::Duration;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::activity::{ActivityLogEntry, ActivityLogFilter, ActivityLogPage};
use crate::db::queries::client::StoreError;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

pub async fn fetch_entry(pool: &PgPool, id: i32) -> Result<ActivityLogEntry, StoreError> {
    sqlx::query_as::<_, ActivityLogEntry>("SELECT * FROM activity_logs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::EntryNotFound(id))
}

/// Sortable columns are whitelisted; anything else falls back to the
/// default creation-time ordering.
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("id") => "id",
        Some("action_type") => "action_type",
        Some("actor_id") => "actor_id",
        Some("actor_name") => "actor_name",
        Some("details") => "details",
        Some("affected_id") => "affected_id",
        Some("affected_type") => "affected_type",
        _ => "created_at",
    }
}

fn sort_direction(requested: Option<&str>) -> &'static str {
    match requested {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

fn paging(filter: &ActivityLogFilter) -> (i64, i64) {
    let page = filter.page.unwrap_or(1).max(1);
    let page_size = filter
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ActivityLogFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(actor) = &filter.actor {
        builder.push(" AND actor_name = ").push_bind(actor.clone());
    }
    if let Some(action_type) = &filter.action_type {
        builder
            .push(" AND action_type = ")
            .push_bind(action_type.clone());
    }
    if let Some(affected_type) = &filter.affected_type {
        builder
            .push(" AND affected_type = ")
            .push_bind(affected_type.clone());
    }
    if let Some(search) = &filter.search {
        let term = search.trim();
        if !term.is_empty() {
            let pattern = format!("%{term}%");
            builder
                .push(" AND (action_type ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR actor_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR details ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR affected_id ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR affected_type ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
    // Inclusive date range on the creation timestamp, taken as UTC days.
    if let Some(from) = filter.from {
        builder
            .push(" AND created_at >= ")
            .push_bind(from.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc());
    }
    if let Some(to) = filter.to {
        let end = (to + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("valid midnight")
            .and_utc();
        builder.push(" AND created_at < ").push_bind(end);
    }
}

/// Filtered, sorted, paginated view of the audit trail, newest first by
/// default, with the total row count for the pager.
pub async fn fetch_entries(
    pool: &PgPool,
    filter: &ActivityLogFilter,
) -> Result<ActivityLogPage, StoreError> {
    let (page, page_size) = paging(filter);

    let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs");
    push_filters(&mut count_builder, filter);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM activity_logs");
    push_filters(&mut builder, filter);
    builder.push(format!(
        " ORDER BY {} {}",
        sort_column(filter.sort_by.as_deref()),
        sort_direction(filter.sort_dir.as_deref())
    ));
    builder.push(" LIMIT ").push_bind(page_size);
    builder.push(" OFFSET ").push_bind((page - 1) * page_size);

    let entries = builder
        .build_query_as::<ActivityLogEntry>()
        .fetch_all(pool)
        .await?;

    Ok(ActivityLogPage {
        entries,
        total,
        page,
        page_size,
    })
}

/// Filtered trail in chronological order, without pagination, for exports.
pub async fn fetch_all_entries(
    pool: &PgPool,
    filter: &ActivityLogFilter,
) -> Result<Vec<ActivityLogEntry>, StoreError> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM activity_logs");
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY created_at, id");

    let entries = builder
        .build_query_as::<ActivityLogEntry>()
        .fetch_all(pool)
        .await?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_column_is_whitelisted() {
        for column in [
            "id",
            "action_type",
            "actor_id",
            "actor_name",
            "details",
            "affected_id",
            "affected_type",
        ] {
            assert_eq!(sort_column(Some(column)), column);
        }
        assert_eq!(sort_column(Some("details; DROP TABLE")), "created_at");
        assert_eq!(sort_column(None), "created_at");
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        assert_eq!(sort_direction(Some("asc")), "ASC");
        assert_eq!(sort_direction(Some("desc")), "DESC");
        assert_eq!(sort_direction(Some("sideways")), "DESC");
        assert_eq!(sort_direction(None), "DESC");
    }

    #[test]
    fn paging_clamps_out_of_range_values() {
        let mut filter = ActivityLogFilter::default();
        assert_eq!(paging(&filter), (1, DEFAULT_PAGE_SIZE));

        filter.page = Some(0);
        filter.page_size = Some(10_000);
        assert_eq!(paging(&filter), (1, MAX_PAGE_SIZE));

        filter.page = Some(3);
        filter.page_size = Some(25);
        assert_eq!(paging(&filter), (3, 25));
    }
}
