use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

use crate::api::auth::Claims;

/// Action tags recorded in the audit trail.
pub const ACTION_CLIENT_ADDED: &str = "client added";
pub const ACTION_CLIENT_EDITED: &str = "client edited";
pub const ACTION_STATUS_CHANGED: &str = "client status changed";
pub const ACTION_NOTES_UPDATED: &str = "installment notes updated";
pub const ACTION_CLIENT_DELETED: &str = "client deleted";
pub const ACTION_CLIENT_RESTORED: &str = "client restored";
pub const ACTION_CLIENT_PURGED: &str = "client permanently deleted";
pub const ACTION_UNDO: &str = "undo operation";

pub const AFFECTED_CLIENT: &str = "client";

/// Builder for audit entries, invoked strictly AFTER the primary mutation
/// succeeds. Recording is fire-and-log: an insert failure is written to the
/// diagnostic sink and swallowed, never propagated to fail the mutation.
pub struct ActivityEntryBuilder {
    action_type: String,
    actor_id: String,
    actor_name: String,
    details: String,
    affected_id: Option<String>,
    affected_type: Option<String>,
    extra: Option<Value>,
}

impl ActivityEntryBuilder {
    pub fn new(action_type: impl Into<String>, actor: &Claims) -> Self {
        Self {
            action_type: action_type.into(),
            actor_id: actor.sub.clone(),
            actor_name: actor.username.clone(),
            details: String::new(),
            affected_id: None,
            affected_type: None,
            extra: None,
        }
    }

    /// Set the human-readable summary line.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Set the affected entity (id plus entity kind, e.g. "client").
    pub fn affected(mut self, id: impl ToString, kind: impl Into<String>) -> Self {
        self.affected_id = Some(id.to_string());
        self.affected_type = Some(kind.into());
        self
    }

    /// Attach a structured diff or contextual snapshot.
    pub fn extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Append the entry. Returns the new entry id, or `None` when the write
    /// failed and was swallowed.
    pub async fn record(self, pool: &PgPool) -> Option<i32> {
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO activity_logs
                (action_type, actor_id, actor_name, details, affected_id, affected_type, extra, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING id
            "#,
        )
        .bind(&self.action_type)
        .bind(&self.actor_id)
        .bind(&self.actor_name)
        .bind(&self.details)
        .bind(&self.affected_id)
        .bind(&self.affected_type)
        .bind(&self.extra)
        .fetch_one(pool)
        .await;

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(
                    action_type = %self.action_type,
                    affected_id = ?self.affected_id,
                    "audit entry dropped: {e}"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn actor() -> Claims {
        Claims {
            sub: "12".to_string(),
            username: "employee1".to_string(),
            role: "employee".to_string(),
            exp: 0,
        }
    }

    #[test]
    fn builder_carries_actor_identity_from_claims() {
        let entry = ActivityEntryBuilder::new(ACTION_CLIENT_ADDED, &actor())
            .details("added client (Ahmed)")
            .affected(7, AFFECTED_CLIENT)
            .extra(json!({ "status": "pending" }));

        assert_eq!(entry.action_type, ACTION_CLIENT_ADDED);
        assert_eq!(entry.actor_id, "12");
        assert_eq!(entry.actor_name, "employee1");
        assert_eq!(entry.affected_id.as_deref(), Some("7"));
        assert_eq!(entry.affected_type.as_deref(), Some(AFFECTED_CLIENT));
        assert_eq!(entry.extra, Some(json!({ "status": "pending" })));
    }
}
