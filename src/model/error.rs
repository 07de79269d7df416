use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API server unavailable: {0}")]
    Unavailable(String),
    #[error("Conflicting write: {0}")]
    Conflict(String),
    #[error("Request exceeded its deadline")]
    Timeout,
    #[error("Reconciliation cancelled")]
    Cancelled,
    #[error("Invalid WebDeployment spec: {0}")]
    InvalidSpec(String),
    #[error("Deployment rejected by the API server: {0}")]
    Rejected(String),
    #[error("Scheme error: {0}")]
    SchemeError(String),
    #[error("Deployment {0} is controlled by another owner")]
    AlreadyOwned(String),
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
}

impl Error {
    /// Transient failures are requeued with backoff, everything else needs an
    /// external change (spec edit, redeploy) before another pass can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Conflict(_) | Error::Timeout | Error::Cancelled)
    }

    /// Classifies a raw API error. Not found is handled by callers before
    /// reaching this point, so a 404 here means a write target vanished and is
    /// retried.
    pub fn from_api(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => match resp.code {
                409 => Error::Conflict(resp.message),
                400 | 422 => Error::Rejected(resp.message),
                _ => Error::Unavailable(format!("{} ({})", resp.message, resp.code)),
            },
            other => Error::Unavailable(other.to_string()),
        }
    }
}
