//! Outbox relay.
//!
//! A background task polls `email_outbox`, locks a batch with
//! `FOR UPDATE SKIP LOCKED`, opens each sealed body and hands the message to
//! the configured transport. Failed rows are retried with exponential backoff
//! and jitter until `max_attempts`, then marked `failed`. Bodies are erased
//! once a row reaches a final state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use sqlx::PgPool;
use sqlx::Row;
use tokio::time::sleep;
use uuid::Uuid;

use super::sealing::OutboxCipher;
use crate::domain::errors::EmailDeliveryError;
use crate::domain::user::ports::EmailSender;
use crate::domain::user::ports::OutgoingEmail;

/// Transport for local development: logs the envelope, never the body.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailDeliveryError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Email delivered to log transport");
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RelayConfig {
    /// 5s poll interval, 10 messages per batch, 5 attempts, 5s to 5m backoff.
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }
}

impl RelayConfig {
    pub fn normalize(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.poll_interval
        };
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        Self {
            poll_interval,
            batch_size: self.batch_size.max(1),
            max_attempts: self.max_attempts.max(1),
            backoff_base,
            backoff_max: self.backoff_max.max(backoff_base),
        }
    }
}

/// What to write back after one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
    Sent,
    Retry { error: String, delay: Duration },
    Failed { error: String },
}

/// Spawn the background task that drains the outbox.
pub fn spawn_outbox_relay(
    pool: PgPool,
    cipher: Arc<OutboxCipher>,
    transport: Arc<dyn EmailSender>,
    config: RelayConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();

        loop {
            if let Err(e) = relay_batch(&pool, &cipher, transport.as_ref(), &config).await {
                tracing::error!(error = %e, "Email outbox batch failed");
            }
            sleep(config.poll_interval).await;
        }
    })
}

async fn relay_batch(
    pool: &PgPool,
    cipher: &OutboxCipher,
    transport: &dyn EmailSender,
    config: &RelayConfig,
) -> Result<usize> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to start email outbox transaction")?;

    let rows = sqlx::query(
        r#"
        SELECT id, recipient, subject, body_sealed, attempts
        FROM email_outbox
        WHERE status = 'pending'
          AND next_attempt_at <= NOW()
        ORDER BY next_attempt_at ASC, created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(i64::try_from(config.batch_size).unwrap_or(1))
    .fetch_all(&mut *tx)
    .await
    .context("failed to load email outbox batch")?;

    let row_count = rows.len();
    for row in rows {
        let id: Uuid = row.get("id");
        let attempts: i32 = row.get("attempts");
        let attempts = u32::try_from(attempts).unwrap_or(0).saturating_add(1);
        let body_sealed: Option<String> = row.get("body_sealed");

        let disposition = match body_sealed.as_deref().map(|b| cipher.open(id, b)) {
            Some(Ok(body)) => {
                let email = OutgoingEmail {
                    to: row.get("recipient"),
                    subject: row.get("subject"),
                    body,
                };
                dispose(transport.send(email).await, attempts, config)
            }
            // Undecryptable rows never succeed on retry.
            Some(Err(e)) => Disposition::Failed {
                error: e.to_string(),
            },
            None => Disposition::Failed {
                error: "Email body missing".to_string(),
            },
        };

        record(&mut tx, id, attempts, &disposition).await?;
    }

    tx.commit()
        .await
        .context("failed to commit email outbox batch")?;

    if row_count > 0 {
        tracing::debug!(rows = row_count, "Email outbox batch relayed");
    }
    Ok(row_count)
}

fn dispose(
    result: Result<(), EmailDeliveryError>,
    attempts: u32,
    config: &RelayConfig,
) -> Disposition {
    match result {
        Ok(()) => Disposition::Sent,
        Err(e) if attempts >= config.max_attempts => Disposition::Failed {
            error: e.to_string(),
        },
        Err(e) => Disposition::Retry {
            error: e.to_string(),
            delay: backoff_delay(attempts, config.backoff_base, config.backoff_max),
        },
    }
}

async fn record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempts: u32,
    disposition: &Disposition,
) -> Result<()> {
    let attempts = i32::try_from(attempts).unwrap_or(i32::MAX);

    match disposition {
        Disposition::Sent => {
            sqlx::query(
                r#"
                UPDATE email_outbox
                SET status = 'sent',
                    attempts = $2,
                    body_sealed = NULL,
                    last_error = NULL,
                    sent_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(attempts)
            .execute(&mut **tx)
            .await
            .context("failed to mark outbox row sent")?;
            tracing::info!(outbox_id = %id, attempts, "Email sent");
        }
        Disposition::Retry { error, delay } => {
            let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
            sqlx::query(
                r#"
                UPDATE email_outbox
                SET attempts = $2,
                    last_error = $3,
                    next_attempt_at = NOW() + ($4 * INTERVAL '1 millisecond')
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(attempts)
            .bind(error)
            .bind(delay_ms)
            .execute(&mut **tx)
            .await
            .context("failed to schedule outbox retry")?;
            tracing::warn!(outbox_id = %id, attempts, error = %error, "Email delivery failed, will retry");
        }
        Disposition::Failed { error } => {
            sqlx::query(
                r#"
                UPDATE email_outbox
                SET status = 'failed',
                    attempts = $2,
                    body_sealed = NULL,
                    last_error = $3
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(attempts)
            .bind(error)
            .execute(&mut **tx)
            .await
            .context("failed to mark outbox row failed")?;
            tracing::error!(outbox_id = %id, attempts, error = %error, "Email delivery abandoned");
        }
    }

    Ok(())
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let delay = base.checked_mul(1u32 << shift).unwrap_or(max).min(max);
    jitter(delay)
}

/// Pick uniformly from the upper half of `delay`.
fn jitter(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    Duration::from_millis(half + rand::thread_rng().gen_range(0..=half))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RelayConfig {
        RelayConfig {
            max_attempts: 3,
            ..RelayConfig::default()
        }
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(300);

        let first = backoff_delay(1, base, max);
        assert!(first >= Duration::from_millis(2500) && first <= base);

        let third = backoff_delay(3, base, max);
        assert!(third >= Duration::from_secs(10) && third <= Duration::from_secs(20));

        let late = backoff_delay(30, base, max);
        assert!(late >= Duration::from_secs(150) && late <= max);
    }

    #[test]
    fn test_dispose_retries_until_max_attempts() {
        let error = || Err(EmailDeliveryError::Unavailable("smtp down".to_string()));

        assert_eq!(dispose(Ok(()), 1, &config()), Disposition::Sent);
        assert!(matches!(
            dispose(error(), 2, &config()),
            Disposition::Retry { .. }
        ));
        assert!(matches!(
            dispose(error(), 3, &config()),
            Disposition::Failed { .. }
        ));
    }

    #[test]
    fn test_normalize_clamps_degenerate_settings() {
        let config = RelayConfig {
            poll_interval: Duration::ZERO,
            batch_size: 0,
            max_attempts: 0,
            backoff_base: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
        .normalize();

        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.backoff_max, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_log_sender_accepts_every_message() {
        let sender = LogEmailSender;
        let result = sender
            .send(OutgoingEmail {
                to: "nicola@example.com".to_string(),
                subject: "Subject".to_string(),
                body: "Body".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
