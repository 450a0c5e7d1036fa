use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EliaError {
    #[error("http request error")]
    Reqwest(#[from] reqwest::Error),
    #[error("api responded with status {status} for dataset {dataset}")]
    Status {
        dataset: String,
        status: reqwest::StatusCode,
    },
    #[error("api responded with an unsupported response: {0}")]
    UnsupportedResponse(String),
    #[error("dataset {dataset} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        dataset: String,
        columns: Vec<String>,
    },
    #[error("dataset {dataset} has a malformed timestamp: {value}")]
    MalformedTimestamp { dataset: String, value: String },
    #[error("local time {0} does not exist in the configured timezone")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("chart rendering failed: {0}")]
    Render(String),
    #[error("report rendering failed")]
    Template(#[from] askama::Error),
    #[error("io error")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EliaError {
    /// Fetch failures abort a whole invocation, everything else only affects
    /// the dataset it was raised for.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            EliaError::Reqwest(_) | EliaError::Status { .. } | EliaError::UnsupportedResponse(_)
        )
    }
}

impl From<::config::ConfigError> for EliaError {
    fn from(err: ::config::ConfigError) -> Self {
        EliaError::Config(err.to_string())
    }
}
