use axum::{extract::State, http::StatusCode, routing::get, Extension, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::{OpenApi, ToSchema};

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::client::{Client, STATUS_TAMMAM};
use crate::db::queries::client as store;
use crate::utils::api_response::ApiResponse;
use crate::utils::reminders::{
    days_remaining, describe_days_remaining, is_expiring_soon, needs_completion_reminder,
};

#[derive(OpenApi)]
#[openapi(
    paths(get_notifications),
    components(schemas(Reminder, NotificationSummary))
)]
pub struct NotificationDoc;

pub fn notification_routes() -> Router<PgPool> {
    Router::new().route("/notifications", get(get_notifications))
}

/// One client whose tracked date has entered a reminder window.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct Reminder {
    pub client: Client,
    pub days_remaining: i64,
    /// Ready-to-display phrase, e.g. "5 days remaining" or "due today".
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct NotificationSummary {
    /// Service completion dates approaching within the lookahead window.
    pub expiring: Vec<Reminder>,
    /// Installment completion dates due for follow-up.
    pub completion_due: Vec<Reminder>,
}

fn reminder(client: Client, days: i64) -> Reminder {
    Reminder {
        days_remaining: days,
        message: describe_days_remaining(days),
        client,
    }
}

/// Splits the active clients into the two reminder groups. Pure over its
/// inputs so the windows can be tested without a clock or a database.
pub fn collect_reminders(
    clients: Vec<Client>,
    today: NaiveDate,
    lookahead: i64,
    lookback: i64,
) -> NotificationSummary {
    let mut expiring = Vec::new();
    let mut completion_due = Vec::new();

    for client in clients {
        if client.status == STATUS_TAMMAM {
            if let Some(date) = client.completion_date {
                let days = days_remaining(date, today);
                if needs_completion_reminder(days, lookahead, lookback) {
                    completion_due.push(reminder(client, days));
                }
            }
        } else if let Some(date) = client.service_completion_date {
            let days = days_remaining(date, today);
            if is_expiring_soon(days, lookahead) {
                expiring.push(reminder(client, days));
            }
        }
    }

    // Soonest (or most overdue) first.
    expiring.sort_by_key(|r| r.days_remaining);
    completion_due.sort_by_key(|r| r.days_remaining);

    NotificationSummary {
        expiring,
        completion_due,
    }
}

/// Reminder digest computed on demand from the active partition.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    responses(
        (status = 200, description = "Current reminder groups", body = NotificationSummary),
        (status = 500, description = "Failed to retrieve clients")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_notifications(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
) -> Result<ApiResponse<NotificationSummary>, ApiResponse<()>> {
    let clients = store::fetch_clients(&pool, false)
        .await
        .map_err(ApiResponse::store)?;

    let config = Config::get();
    let summary = collect_reminders(
        clients,
        Local::now().date_naive(),
        config.reminder_lookahead_days,
        config.reminder_lookback_days,
    );

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Notifications retrieved successfully",
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::client::{STATUS_APPROVED, STATUS_PENDING};

    fn client(id: i32, status: &str) -> Client {
        Client {
            id,
            name: format!("client {id}"),
            phone: "0551234567".to_string(),
            identity_number: None,
            status: status.to_string(),
            upload_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            completion_date: None,
            rejection_reason: None,
            pending_reason: None,
            acqara_approved: None,
            mawara_approved: None,
            completed_service: None,
            incomplete_reason: None,
            installment_notes: None,
            service_completion_date: None,
            added_by: "employee1".to_string(),
            processed_by: None,
            deleted: false,
            delete_date: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn service_dates_inside_the_lookahead_are_flagged() {
        let mut near = client(1, STATUS_APPROVED);
        near.service_completion_date = Some(today() + chrono::Duration::days(3));
        let mut far = client(2, STATUS_APPROVED);
        far.service_completion_date = Some(today() + chrono::Duration::days(30));

        let summary = collect_reminders(vec![near, far], today(), 10, 60);
        assert_eq!(summary.expiring.len(), 1);
        assert_eq!(summary.expiring[0].client.id, 1);
        assert_eq!(summary.expiring[0].days_remaining, 3);
        assert!(summary.completion_due.is_empty());
    }

    #[test]
    fn installment_clients_use_the_completion_window() {
        let mut overdue = client(1, STATUS_TAMMAM);
        overdue.completion_date = Some(today() - chrono::Duration::days(5));
        let mut ancient = client(2, STATUS_TAMMAM);
        ancient.completion_date = Some(today() - chrono::Duration::days(90));

        let summary = collect_reminders(vec![overdue, ancient], today(), 10, 60);
        assert_eq!(summary.completion_due.len(), 1);
        assert_eq!(summary.completion_due[0].days_remaining, -5);
        assert_eq!(summary.completion_due[0].message, "expired 5 days ago");
    }

    #[test]
    fn groups_are_sorted_soonest_first() {
        let mut a = client(1, STATUS_PENDING);
        a.service_completion_date = Some(today() + chrono::Duration::days(9));
        let mut b = client(2, STATUS_PENDING);
        b.service_completion_date = Some(today() + chrono::Duration::days(2));

        let summary = collect_reminders(vec![a, b], today(), 10, 60);
        let order: Vec<i32> = summary.expiring.iter().map(|r| r.client.id).collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn clients_without_tracked_dates_are_skipped() {
        let summary = collect_reminders(
            vec![client(1, STATUS_PENDING), client(2, STATUS_TAMMAM)],
            today(),
            10,
            60,
        );
        assert!(summary.expiring.is_empty());
        assert!(summary.completion_due.is_empty());
    }
}
