use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebtoolError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("webtool API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl WebtoolError {
    /// Only `Api` carries a real status code; network/timeout failures
    /// never signal a credential problem no matter what digits happen to
    /// appear in their message text (spec.md §4.A).
    pub fn credential_signal(&self) -> Option<CredentialSignal> {
        match self {
            WebtoolError::Api { status: 402, .. } => Some(CredentialSignal::BillingExhausted),
            WebtoolError::Api { status: 401, .. } => Some(CredentialSignal::Unauthorized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSignal {
    Unauthorized,
    BillingExhausted,
}

impl From<reqwest::Error> for WebtoolError {
    fn from(err: reqwest::Error) -> Self {
        WebtoolError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_402_in_api_error() {
        let err = WebtoolError::Api {
            status: 402,
            message: "payment required".to_string(),
        };
        assert_eq!(err.credential_signal(), Some(CredentialSignal::BillingExhausted));
    }

    #[test]
    fn detects_401_in_api_error() {
        let err = WebtoolError::Api {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.credential_signal(), Some(CredentialSignal::Unauthorized));
    }

    #[test]
    fn other_statuses_have_no_signal() {
        let err = WebtoolError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.credential_signal(), None);
    }
}
