//! Audit trail service
//!
//! Records who did what to which record. Writes happen after the business
//! transaction commits and never fail the request, a lost audit row is
//! logged and tolerated.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Audit service
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record an audit entry in the background
    pub fn record(
        &self,
        actor_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        detail: Value,
    ) {
        let db = self.db.clone();
        let action = action.to_string();
        let entity_type = entity_type.to_string();

        tokio::spawn(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO audit_log (actor_id, action, entity_type, entity_id, detail)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(actor_id)
            .bind(&action)
            .bind(&entity_type)
            .bind(entity_id)
            .bind(&detail)
            .execute(&db)
            .await;

            if let Err(e) = result {
                tracing::warn!(
                    "Failed to write audit entry {} {} {}: {}",
                    action,
                    entity_type,
                    entity_id,
                    e
                );
            }
        });
    }
}
