use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// ✅ **Client Record Stored in PostgreSQL**
///
/// A client lives in exactly one of two partitions, decided solely by
/// `deleted`: active (`deleted = false`) or trashed (`deleted = true`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub identity_number: Option<String>,
    /// One of: pending, approved, rejected, tammam
    pub status: String,
    /// Stamped at creation, never updated afterwards.
    pub upload_date: NaiveDate,
    /// Required while status is tammam.
    pub completion_date: Option<NaiveDate>,
    /// Required while status is rejected.
    pub rejection_reason: Option<String>,
    /// Required while status is pending.
    pub pending_reason: Option<String>,
    pub acqara_approved: Option<bool>,
    pub mawara_approved: Option<bool>,
    /// Approved but the service was NOT completed.
    pub completed_service: Option<bool>,
    pub incomplete_reason: Option<String>,
    pub installment_notes: Option<String>,
    /// Tracked for any status except tammam.
    pub service_completion_date: Option<NaiveDate>,
    pub added_by: String,
    /// Whoever last changed the status.
    pub processed_by: Option<String>,
    pub deleted: bool,
    pub delete_date: Option<NaiveDate>,
}

/// ✅ **Client Create/Update Request (Frontend Sends This)**
///
/// `added_by` and `processed_by` are never accepted from the payload; both
/// come from the authenticated actor's claims.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ClientPayload {
    pub name: String,
    pub phone: String,
    pub identity_number: Option<String>,
    pub status: String,
    pub completion_date: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub pending_reason: Option<String>,
    pub acqara_approved: Option<bool>,
    pub mawara_approved: Option<bool>,
    pub completed_service: Option<bool>,
    pub incomplete_reason: Option<String>,
    pub installment_notes: Option<String>,
    pub service_completion_date: Option<NaiveDate>,
}

/// Client statuses understood by the lifecycle engine.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";
/// "Completed via installment plan."
pub const STATUS_TAMMAM: &str = "tammam";

pub const ALL_STATUSES: [&str; 4] = [
    STATUS_PENDING,
    STATUS_APPROVED,
    STATUS_REJECTED,
    STATUS_TAMMAM,
];

impl Client {
    /// Builds the post-update image of this client from a validated payload.
    /// Identity, upload date, ownership and partition fields are carried
    /// over from the current row; `processed_by` switches to `actor` when
    /// the write changes the status.
    pub fn with_payload(&self, payload: &ClientPayload, actor: &str) -> Client {
        let processed_by = if payload.status != self.status {
            Some(actor.to_string())
        } else {
            self.processed_by.clone()
        };

        Client {
            id: self.id,
            name: payload.name.clone(),
            phone: payload.phone.clone(),
            identity_number: payload.identity_number.clone(),
            status: payload.status.clone(),
            upload_date: self.upload_date,
            completion_date: payload.completion_date,
            rejection_reason: payload.rejection_reason.clone(),
            pending_reason: payload.pending_reason.clone(),
            acqara_approved: payload.acqara_approved,
            mawara_approved: payload.mawara_approved,
            completed_service: payload.completed_service,
            incomplete_reason: payload.incomplete_reason.clone(),
            installment_notes: payload.installment_notes.clone(),
            service_completion_date: payload.service_completion_date,
            added_by: self.added_by.clone(),
            processed_by,
            deleted: self.deleted,
            delete_date: self.delete_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_client() -> Client {
        Client {
            id: 1,
            name: "Ahmed".to_string(),
            phone: "0551234567".to_string(),
            identity_number: Some("1098765432".to_string()),
            status: STATUS_PENDING.to_string(),
            upload_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            completion_date: None,
            rejection_reason: None,
            pending_reason: Some("awaiting documents".to_string()),
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

    #[test]
    fn with_payload_keeps_identity_and_partition_fields() {
        let client = sample_client();
        let payload = ClientPayload {
            name: "Ahmed".to_string(),
            phone: "0551234567".to_string(),
            identity_number: client.identity_number.clone(),
            status: STATUS_PENDING.to_string(),
            completion_date: None,
            rejection_reason: None,
            pending_reason: Some("awaiting documents".to_string()),
            acqara_approved: None,
            mawara_approved: None,
            completed_service: None,
            incomplete_reason: None,
            installment_notes: None,
            service_completion_date: None,
        };

        let updated = client.with_payload(&payload, "admin");
        assert_eq!(updated.id, client.id);
        assert_eq!(updated.upload_date, client.upload_date);
        assert_eq!(updated.added_by, client.added_by);
        assert!(!updated.deleted);
        // Status unchanged, so processed_by must not be overwritten.
        assert_eq!(updated.processed_by, None);
    }

    #[test]
    fn with_payload_stamps_processed_by_on_status_change() {
        let client = sample_client();
        let payload = ClientPayload {
            name: client.name.clone(),
            phone: client.phone.clone(),
            identity_number: client.identity_number.clone(),
            status: STATUS_APPROVED.to_string(),
            completion_date: None,
            rejection_reason: None,
            pending_reason: None,
            acqara_approved: None,
            mawara_approved: None,
            completed_service: None,
            incomplete_reason: None,
            installment_notes: None,
            service_completion_date: None,
        };

        let updated = client.with_payload(&payload, "admin");
        assert_eq!(updated.processed_by.as_deref(), Some("admin"));
    }
}
