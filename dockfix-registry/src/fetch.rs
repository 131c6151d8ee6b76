use crate::error::RegistryError;
use crate::transport::HttpTransport;
use dockfix_types::retry::{Attempt, RetryFailure, RetryPolicy};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// GETs `url` and decodes the JSON body, retrying transient failures.
///
/// - 2xx: decoded.
/// - 404: `NotFound`, never retried.
/// - other 4xx: `Client`, never retried.
/// - 5xx and transport errors: retried per `retry`, then `Unavailable`.
pub fn fetch_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    url: &str,
    retry: &RetryPolicy,
) -> Result<T, RegistryError> {
    let body = retry
        .run(|attempt| {
            debug!(url, attempt, "GET");
            match transport.get(url) {
                Ok(resp) if (200..300).contains(&resp.status) => Ok(resp.body),
                Ok(resp) if resp.status == 404 => Err(Attempt::Permanent(RegistryError::NotFound {
                    url: url.to_string(),
                })),
                Ok(resp) if resp.status >= 500 => {
                    warn!(url, attempt, status = resp.status, "registry server error");
                    Err(Attempt::Transient(unavailable(url, attempt, format!("HTTP {}", resp.status))))
                }
                Ok(resp) => Err(Attempt::Permanent(RegistryError::Client {
                    url: url.to_string(),
                    status: resp.status,
                })),
                Err(e) => {
                    warn!(url, attempt, error = %e, "registry request failed");
                    Err(Attempt::Transient(unavailable(url, attempt, e.message)))
                }
            }
        })
        .map_err(|failure| match failure {
            RetryFailure::Exhausted { attempts, last } => match last {
                RegistryError::Unavailable { url, reason, .. } => RegistryError::Unavailable {
                    url,
                    attempts,
                    reason,
                },
                other => other,
            },
            RetryFailure::Permanent(e) => e,
        })?;

    serde_json::from_str(&body).map_err(|e| RegistryError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn unavailable(url: &str, attempts: u32, reason: String) -> RegistryError {
    RegistryError::Unavailable {
        url: url.to_string(),
        attempts,
        reason,
    }
}
