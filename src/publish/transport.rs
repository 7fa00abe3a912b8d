use crate::publish::auth::CredentialProvider;
use crate::publish::backoff::{Backoff, BackoffPolicy};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// A single attempt exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Last attempt resolved with a non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Shutdown was signalled during a backoff sleep
    #[error("Delivery cancelled by shutdown")]
    Cancelled,
}

/// Retrying POST transport for the publish endpoint.
///
/// Every send walks the same handler chain on failure:
///
/// 1. offer a non-2xx status to the credential provider; if it reports
///    handled (token rotated on 401/403), retry immediately with zero
///    backoff — granted at most once per delivery, so a provider that
///    keeps reporting handled cannot pin the loop;
/// 2. otherwise consult the backoff budget: sleep and retry while it
///    lasts, racing the sleep against the shutdown signal;
/// 3. budget spent, resolve with the last error.
///
/// Timeouts and network errors skip straight to step 2.
pub struct ResilientTransport {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    policy: BackoffPolicy,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl ResilientTransport {
    pub fn new(
        client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
        policy: BackoffPolicy,
        timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            credentials,
            policy,
            timeout,
            shutdown,
        }
    }

    /// POSTs `body` to `url`, retrying per the policy. Resolves `Ok(())`
    /// on the first 2xx response.
    pub async fn send(&self, url: &str, body: &serde_json::Value) -> Result<(), TransportError> {
        let mut shutdown = self.shutdown.clone();
        let mut backoff = Backoff::new(self.policy.clone());
        let mut credential_retry_used = false;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let error = match self.attempt(url, body).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if let TransportError::HttpStatus(status) = error {
                if !credential_retry_used && self.credentials.handle_unsuccessful(status) {
                    credential_retry_used = true;
                    tracing::debug!(
                        status = status,
                        attempt = attempt,
                        "Credentials refreshed, retrying immediately"
                    );
                    continue;
                }
            }

            let Some(delay) = backoff.next_delay() else {
                tracing::debug!(error = %error, attempts = attempt, "Retry budget exhausted");
                return Err(error);
            };

            tracing::debug!(
                error = %error,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Publish attempt failed, backing off"
            );

            if *shutdown.borrow() {
                return Err(TransportError::Cancelled);
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return Err(TransportError::Cancelled),
            }
        }
    }

    async fn attempt(&self, url: &str, body: &serde_json::Value) -> Result<(), TransportError> {
        let request = self.credentials.attach(self.client.post(url).json(body));

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(TransportError::Network)?;

        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status().as_u16()));
        }

        Ok(())
    }
}
