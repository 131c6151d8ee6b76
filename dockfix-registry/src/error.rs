use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// 404: the registry has no such resource. Callers treat this as "no data".
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other 4xx. Not retried.
    #[error("{url} answered HTTP {status}")]
    Client { url: String, status: u16 },

    /// 5xx or connection failures that outlived the retry budget.
    #[error("{url} unavailable after {attempts} attempt(s): {reason}")]
    Unavailable {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}
