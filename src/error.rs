use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("daily upload limit reached ({limit})")]
    QuotaExceeded { limit: u32 },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("other error: {0}")]
    Other(String),
}

pub type HubResult<T> = Result<T, HubError>;
