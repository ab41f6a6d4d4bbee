//! Transactional email outbox.
//!
//! Messages are enqueued as `pending` rows in `email_outbox`; the relay in
//! [`super::relay`] delivers them. Bodies are stored sealed. Enqueue failures
//! surface as `EmailDeliveryError` so callers can undo whatever the message
//! was meant to announce.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::sealing::OutboxCipher;
use crate::domain::errors::EmailDeliveryError;
use crate::domain::user::ports::EmailSender;
use crate::domain::user::ports::OutgoingEmail;

/// Column values for one `email_outbox` insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRow {
    pub id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body_sealed: String,
    pub created_at: DateTime<Utc>,
}

pub struct PostgresEmailOutbox {
    pool: PgPool,
    from: String,
    cipher: Arc<OutboxCipher>,
}

impl PostgresEmailOutbox {
    /// # Arguments
    /// * `pool` - Connection pool for the outbox table
    /// * `from` - Sender address stamped on every message
    /// * `cipher` - Seals bodies before they reach the table
    pub fn new(pool: PgPool, from: String, cipher: Arc<OutboxCipher>) -> Self {
        Self { pool, from, cipher }
    }
}

/// Build the row to persist for `email`; the body only leaves sealed.
pub fn outbox_row(
    cipher: &OutboxCipher,
    from: &str,
    email: OutgoingEmail,
) -> Result<OutboxRow, EmailDeliveryError> {
    let id = Uuid::new_v4();
    let body_sealed = cipher
        .seal(id, &email.body)
        .map_err(|e| EmailDeliveryError::Rejected(e.to_string()))?;

    Ok(OutboxRow {
        id,
        sender: from.to_string(),
        recipient: email.to,
        subject: email.subject,
        body_sealed,
        created_at: Utc::now(),
    })
}

#[async_trait]
impl EmailSender for PostgresEmailOutbox {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailDeliveryError> {
        let row = outbox_row(&self.cipher, &self.from, email)?;

        sqlx::query(
            r#"
            INSERT INTO email_outbox
                (id, sender, recipient, subject, body_sealed, status, created_at, next_attempt_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $6)
            "#,
        )
        .bind(row.id)
        .bind(&row.sender)
        .bind(&row.recipient)
        .bind(&row.subject)
        .bind(&row.body_sealed)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| EmailDeliveryError::Unavailable(e.to_string()))?;

        tracing::debug!(outbox_id = %row.id, "Email enqueued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::email::sealing::OUTBOX_KEY_BYTES;

    #[test]
    fn test_outbox_row_never_holds_plaintext_body() {
        let cipher = OutboxCipher::new(&[3u8; OUTBOX_KEY_BYTES]);
        let secret = "Zr4q9w-reset-secret-value";
        let body = format!(
            "Forgot your password? Submit a PATCH request to: \
             http://localhost:8080/api/v1/users/resetPassword/{}",
            secret
        );

        let row = outbox_row(
            &cipher,
            "accounts@example.com",
            OutgoingEmail {
                to: "nicola@example.com".to_string(),
                subject: "Your password reset token (valid for 10 min)".to_string(),
                body: body.clone(),
            },
        )
        .unwrap();

        for column in [&row.sender, &row.recipient, &row.subject, &row.body_sealed] {
            assert!(!column.contains(secret));
        }
        assert_eq!(row.recipient, "nicola@example.com");
        assert_eq!(cipher.open(row.id, &row.body_sealed).unwrap(), body);
    }
}
