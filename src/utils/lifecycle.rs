use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::db::models::client::{
    Client, ClientPayload, ALL_STATUSES, STATUS_APPROVED, STATUS_PENDING, STATUS_REJECTED,
    STATUS_TAMMAM,
};

/// Errors raised by the lifecycle engine before any persistence attempt.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("validation failed on `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

static PHONE_RE: OnceLock<Regex> = OnceLock::new();

fn phone_regex() -> &'static Regex {
    PHONE_RE.get_or_init(|| Regex::new(r"^05\d{8}$").expect("invalid phone pattern"))
}

/// Local mobile numbers only: 10 digits starting with "05".
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "phone",
            "must start with 05 and contain exactly 10 digits",
        ))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Enforces the status-conditional field rules and normalizes the payload
/// in place:
///
/// | status   | required          | cleared                                    |
/// |----------|-------------------|--------------------------------------------|
/// | approved | (none)            | rejection_reason                           |
/// | rejected | rejection_reason  | acqara/mawara approvals, incomplete_reason |
/// | pending  | pending_reason    | (none)                                     |
/// | tammam   | completion_date   | service_completion_date                    |
pub fn validate_payload(payload: &mut ClientPayload) -> Result<(), ValidationError> {
    if payload.name.trim().is_empty() {
        return Err(ValidationError::new("name", "is required"));
    }
    validate_phone(&payload.phone)?;

    if !ALL_STATUSES.contains(&payload.status.as_str()) {
        return Err(ValidationError::new(
            "status",
            format!("must be one of {:?}", ALL_STATUSES),
        ));
    }

    match payload.status.as_str() {
        STATUS_APPROVED => {
            payload.rejection_reason = None;
            if payload.completed_service == Some(true) && is_blank(&payload.incomplete_reason) {
                return Err(ValidationError::new(
                    "incomplete_reason",
                    "is required when the service was not completed",
                ));
            }
        }
        STATUS_REJECTED => {
            if is_blank(&payload.rejection_reason) {
                return Err(ValidationError::new("rejection_reason", "is required"));
            }
            payload.acqara_approved = None;
            payload.mawara_approved = None;
            payload.incomplete_reason = None;
        }
        STATUS_PENDING => {
            if is_blank(&payload.pending_reason) {
                return Err(ValidationError::new("pending_reason", "is required"));
            }
        }
        STATUS_TAMMAM => {
            if payload.completion_date.is_none() {
                return Err(ValidationError::new("completion_date", "is required"));
            }
            // The installment completion date takes over; the generic
            // service date is not tracked under tammam.
            payload.service_completion_date = None;
        }
        _ => unreachable!(),
    }

    Ok(())
}

/// One field-level before/after descriptor. Values are recorded as display
/// strings so an undo can re-apply them without knowing the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: String,
    pub new: String,
}

impl FieldChange {
    fn new(field: &str, old: String, new: String) -> Self {
        Self {
            field: field.to_string(),
            old,
            new,
        }
    }

    /// Human-readable phrasing for the audit trail. Status changes and
    /// installment notes get specialized wording; everything else is the
    /// generic before/after arrow.
    pub fn describe(&self) -> String {
        match self.field.as_str() {
            "status" => format!("status: from \"{}\" to \"{}\"", self.old, self.new),
            "installment_notes" => {
                if self.old.is_empty() {
                    format!("installment notes added: \"{}\"", self.new)
                } else if self.new.is_empty() {
                    format!(
                        "installment notes removed, previous value: \"{}\"",
                        self.old
                    )
                } else {
                    format!("installment notes: \"{}\" ← \"{}\"", self.old, self.new)
                }
            }
            _ => format!("{}: \"{}\" ← \"{}\"", self.field, self.old, self.new),
        }
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn flag(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

/// Computes the ordered change list between two versions of a client.
/// Status first, installment notes second, remaining fields in declaration
/// order; unchanged fields are omitted. `diff(x, x)` is always empty.
pub fn diff(old: &Client, new: &Client) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if old.status != new.status {
        changes.push(FieldChange::new(
            "status",
            old.status.clone(),
            new.status.clone(),
        ));
    }

    let old_notes = text(&old.installment_notes);
    let new_notes = text(&new.installment_notes);
    if old_notes != new_notes {
        changes.push(FieldChange::new("installment_notes", old_notes, new_notes));
    }

    let pairs: [(&str, String, String); 12] = [
        ("name", old.name.clone(), new.name.clone()),
        ("phone", old.phone.clone(), new.phone.clone()),
        (
            "identity_number",
            text(&old.identity_number),
            text(&new.identity_number),
        ),
        (
            "completion_date",
            date(old.completion_date),
            date(new.completion_date),
        ),
        (
            "rejection_reason",
            text(&old.rejection_reason),
            text(&new.rejection_reason),
        ),
        (
            "pending_reason",
            text(&old.pending_reason),
            text(&new.pending_reason),
        ),
        (
            "acqara_approved",
            flag(old.acqara_approved),
            flag(new.acqara_approved),
        ),
        (
            "mawara_approved",
            flag(old.mawara_approved),
            flag(new.mawara_approved),
        ),
        (
            "completed_service",
            flag(old.completed_service),
            flag(new.completed_service),
        ),
        (
            "incomplete_reason",
            text(&old.incomplete_reason),
            text(&new.incomplete_reason),
        ),
        (
            "service_completion_date",
            date(old.service_completion_date),
            date(new.service_completion_date),
        ),
        (
            "processed_by",
            text(&old.processed_by),
            text(&new.processed_by),
        ),
    ];

    for (field, old_value, new_value) in pairs {
        if old_value != new_value {
            changes.push(FieldChange::new(field, old_value, new_value));
        }
    }

    changes
}

fn parse_opt_text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_opt_flag(field: &str, value: &str) -> Result<Option<bool>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<bool>()
        .map(Some)
        .map_err(|_| ValidationError::new(field, format!("`{value}` is not a boolean")))
}

fn parse_opt_date(field: &str, value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<NaiveDate>()
        .map(Some)
        .map_err(|_| ValidationError::new(field, format!("`{value}` is not a date")))
}

/// Writes a recorded display value back onto the client. This is the reverse
/// of the stringification used by [`diff`], so replaying a change list with
/// the old values reconstructs the prior record state.
pub fn apply_field(client: &mut Client, field: &str, value: &str) -> Result<(), ValidationError> {
    match field {
        "status" => client.status = value.to_string(),
        "name" => client.name = value.to_string(),
        "phone" => client.phone = value.to_string(),
        "identity_number" => client.identity_number = parse_opt_text(value),
        "installment_notes" => client.installment_notes = parse_opt_text(value),
        "rejection_reason" => client.rejection_reason = parse_opt_text(value),
        "pending_reason" => client.pending_reason = parse_opt_text(value),
        "incomplete_reason" => client.incomplete_reason = parse_opt_text(value),
        "processed_by" => client.processed_by = parse_opt_text(value),
        "acqara_approved" => client.acqara_approved = parse_opt_flag(field, value)?,
        "mawara_approved" => client.mawara_approved = parse_opt_flag(field, value)?,
        "completed_service" => client.completed_service = parse_opt_flag(field, value)?,
        "completion_date" => client.completion_date = parse_opt_date(field, value)?,
        "service_completion_date" => {
            client.service_completion_date = parse_opt_date(field, value)?
        }
        _ => {
            return Err(ValidationError::new(
                field,
                "is not a reversible client field",
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client() -> Client {
        Client {
            id: 7,
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

    fn pending_payload() -> ClientPayload {
        ClientPayload {
            name: "Ahmed".to_string(),
            phone: "0551234567".to_string(),
            identity_number: None,
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
        }
    }

    #[test]
    fn accepts_valid_local_mobile_number() {
        assert!(validate_phone("0551234567").is_ok());
    }

    #[test]
    fn rejects_number_without_leading_zero_five() {
        assert!(validate_phone("551234567").is_err());
        assert!(validate_phone("0651234567").is_err());
    }

    #[test]
    fn rejects_number_with_wrong_length() {
        assert!(validate_phone("05512345").is_err());
        assert!(validate_phone("05512345678").is_err());
    }

    #[test]
    fn rejects_non_digit_characters() {
        assert!(validate_phone("05-1234567").is_err());
        assert!(validate_phone("05x1234567").is_err());
    }

    #[test]
    fn rejected_status_requires_a_reason() {
        let mut payload = pending_payload();
        payload.status = STATUS_REJECTED.to_string();
        payload.rejection_reason = None;
        let err = validate_payload(&mut payload).unwrap_err();
        assert_eq!(err.field, "rejection_reason");
    }

    #[test]
    fn tammam_status_requires_a_completion_date() {
        let mut payload = pending_payload();
        payload.status = STATUS_TAMMAM.to_string();
        let err = validate_payload(&mut payload).unwrap_err();
        assert_eq!(err.field, "completion_date");
    }

    #[test]
    fn pending_status_requires_a_reason() {
        let mut payload = pending_payload();
        payload.pending_reason = Some("   ".to_string());
        let err = validate_payload(&mut payload).unwrap_err();
        assert_eq!(err.field, "pending_reason");
    }

    #[test]
    fn approved_status_needs_no_extra_fields() {
        let mut payload = pending_payload();
        payload.status = STATUS_APPROVED.to_string();
        payload.pending_reason = None;
        assert!(validate_payload(&mut payload).is_ok());
    }

    #[test]
    fn approving_clears_the_rejection_reason() {
        let mut payload = pending_payload();
        payload.status = STATUS_APPROVED.to_string();
        payload.rejection_reason = Some("stale".to_string());
        validate_payload(&mut payload).unwrap();
        assert_eq!(payload.rejection_reason, None);
    }

    #[test]
    fn rejecting_clears_approval_flags_and_incomplete_reason() {
        let mut payload = pending_payload();
        payload.status = STATUS_REJECTED.to_string();
        payload.rejection_reason = Some("missing papers".to_string());
        payload.acqara_approved = Some(true);
        payload.mawara_approved = Some(false);
        payload.incomplete_reason = Some("stale".to_string());
        validate_payload(&mut payload).unwrap();
        assert_eq!(payload.acqara_approved, None);
        assert_eq!(payload.mawara_approved, None);
        assert_eq!(payload.incomplete_reason, None);
    }

    #[test]
    fn incomplete_service_requires_a_reason() {
        let mut payload = pending_payload();
        payload.status = STATUS_APPROVED.to_string();
        payload.completed_service = Some(true);
        let err = validate_payload(&mut payload).unwrap_err();
        assert_eq!(err.field, "incomplete_reason");
    }

    #[test]
    fn tammam_drops_the_service_completion_date() {
        let mut payload = pending_payload();
        payload.status = STATUS_TAMMAM.to_string();
        payload.completion_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        payload.service_completion_date = NaiveDate::from_ymd_opt(2026, 7, 1);
        validate_payload(&mut payload).unwrap();
        assert_eq!(payload.service_completion_date, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut payload = pending_payload();
        payload.status = "archived".to_string();
        let err = validate_payload(&mut payload).unwrap_err();
        assert_eq!(err.field, "status");
    }

    #[test]
    fn diff_of_identical_clients_is_empty() {
        let client = sample_client();
        assert!(diff(&client, &client).is_empty());
    }

    #[test]
    fn diff_reports_a_single_changed_field_once() {
        let old = sample_client();
        let mut new = old.clone();
        new.phone = "0559998877".to_string();

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "phone");
        assert_eq!(changes[0].old, "0551234567");
        assert_eq!(changes[0].new, "0559998877");
    }

    #[test]
    fn diff_puts_the_status_change_first() {
        let old = sample_client();
        let mut new = old.clone();
        new.status = STATUS_APPROVED.to_string();
        new.name = "Ahmed Ali".to_string();

        let changes = diff(&old, &new);
        assert_eq!(changes[0].field, "status");
        assert_eq!(
            changes[0].describe(),
            "status: from \"pending\" to \"approved\""
        );
    }

    #[test]
    fn installment_notes_addition_is_phrased_as_addition() {
        let old = sample_client();
        let mut new = old.clone();
        new.installment_notes = Some("pays monthly".to_string());

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].describe(),
            "installment notes added: \"pays monthly\""
        );
    }

    #[test]
    fn installment_notes_removal_keeps_the_previous_value() {
        let mut old = sample_client();
        old.installment_notes = Some("pays monthly".to_string());
        let mut new = old.clone();
        new.installment_notes = None;

        let changes = diff(&old, &new);
        assert_eq!(
            changes[0].describe(),
            "installment notes removed, previous value: \"pays monthly\""
        );
    }

    #[test]
    fn installment_notes_modification_shows_both_values() {
        let mut old = sample_client();
        old.installment_notes = Some("monthly".to_string());
        let mut new = old.clone();
        new.installment_notes = Some("quarterly".to_string());

        let changes = diff(&old, &new);
        assert_eq!(
            changes[0].describe(),
            "installment notes: \"monthly\" ← \"quarterly\""
        );
    }

    #[test]
    fn generic_change_uses_the_arrow_phrasing() {
        let change = FieldChange::new("name", "Ahmed".to_string(), "Ali".to_string());
        assert_eq!(change.describe(), "name: \"Ahmed\" ← \"Ali\"");
    }

    #[test]
    fn replaying_old_values_reconstructs_the_prior_state() {
        let old = sample_client();
        let mut new = old.clone();
        new.status = STATUS_APPROVED.to_string();
        new.pending_reason = None;
        new.acqara_approved = Some(true);
        new.processed_by = Some("admin".to_string());

        let changes = diff(&old, &new);
        let mut reverted = new.clone();
        for change in &changes {
            apply_field(&mut reverted, &change.field, &change.old).unwrap();
        }
        assert_eq!(reverted, old);
    }

    #[test]
    fn apply_field_parses_dates_and_flags() {
        let mut client = sample_client();
        apply_field(&mut client, "completion_date", "2026-09-01").unwrap();
        assert_eq!(
            client.completion_date,
            NaiveDate::from_ymd_opt(2026, 9, 1)
        );
        apply_field(&mut client, "completion_date", "").unwrap();
        assert_eq!(client.completion_date, None);
        apply_field(&mut client, "acqara_approved", "true").unwrap();
        assert_eq!(client.acqara_approved, Some(true));
        assert!(apply_field(&mut client, "acqara_approved", "maybe").is_err());
    }

    #[test]
    fn apply_field_rejects_unknown_fields() {
        let mut client = sample_client();
        assert!(apply_field(&mut client, "upload_date", "2026-01-01").is_err());
        assert!(apply_field(&mut client, "deleted", "true").is_err());
    }
}
