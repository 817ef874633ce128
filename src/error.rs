use thiserror::Error;

/// Why a page could not be fetched. Every variant ends the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("still rate limited (HTTP 429) after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("listing endpoint answered HTTP {status}")]
    Http { status: u16 },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// What the operator can try next.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            FetchError::RetriesExhausted { .. } => Some(
                "open avito.ru in a browser, copy the cookies and pass them with --cookies, or use --mode browser",
            ),
            FetchError::Http { status: 401 | 403 } => {
                Some("access was refused; refresh the cookies or use --mode browser")
            }
            FetchError::Malformed(_) => Some(
                "the site may be showing a block page or the API changed; rerun with --debug and inspect the dumps",
            ),
            FetchError::Transport(_) => Some("check the network connection and try again"),
            _ => None,
        }
    }
}
