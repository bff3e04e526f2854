//! Push-with-retry policy used by record producers.

use bytes::Bytes;
use serde::Serialize;

use crate::config::RetryConfig;
use crate::gateway::{GatewayClient, GatewayError};
use crate::observability::metrics;
use crate::resilience::calculate_backoff;

/// How a push ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The gateway answered 200.
    Accepted,
    /// The gateway answered with another status; not retried.
    Rejected { code: u16, body: Bytes },
    /// Every attempt failed at the transport level.
    Failed { attempts: u32 },
}

impl PushOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushOutcome::Accepted)
    }

    fn label(&self) -> &'static str {
        match self {
            PushOutcome::Accepted => "accepted",
            PushOutcome::Rejected { .. } => "rejected",
            PushOutcome::Failed { .. } => "failed",
        }
    }
}

/// Pushes `record`, redialing and retrying on transport failures.
///
/// A disconnected client is reconnected before each attempt. A failed attempt
/// closes the connection and waits out the backoff before the next one.
pub async fn push_with_retry<T: Serialize + ?Sized>(
    client: &mut GatewayClient,
    key: &str,
    record: &T,
    storage: &str,
    policy: &RetryConfig,
) -> PushOutcome {
    let mut failures = 0u32;
    let outcome = loop {
        if failures >= policy.max_attempts {
            break PushOutcome::Failed { attempts: failures };
        }
        let delay = calculate_backoff(failures, policy);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match attempt(client, key, record, storage).await {
            Ok((200, _)) => break PushOutcome::Accepted,
            Ok((code, body)) => {
                tracing::warn!(
                    gateway = %client.address(),
                    code,
                    reason = %String::from_utf8_lossy(&body),
                    "Gateway rejected record"
                );
                break PushOutcome::Rejected { code, body };
            }
            Err(err) => {
                client.close().await;
                failures += 1;
                tracing::error!(
                    gateway = %client.address(),
                    retry = failures,
                    error = %err,
                    "Gateway push failed"
                );
            }
        }
    };
    metrics::record_push(outcome.label());
    outcome
}

async fn attempt<T: Serialize + ?Sized>(
    client: &mut GatewayClient,
    key: &str,
    record: &T,
    storage: &str,
) -> Result<(u16, Bytes), GatewayError> {
    if !client.is_connected() {
        client.reconnect().await?;
    }
    client.push(key, record, storage).await
}
