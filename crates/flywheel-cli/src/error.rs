use flywheel_kernel::adoption::AdoptionError;
use flywheel_kernel::config::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] ConfigError),

    /// A precondition for the step is not met. Fatal, never retried.
    #[error("Preflight check failed: {0}")]
    Preflight(String),

    #[error("`{command}` exited with status {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cluster error: {0}")]
    Cluster(#[from] AdoptionError),

    #[error("Timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Adoption left {0} object(s) unadopted")]
    AdoptionIncomplete(usize),

    #[error("Verification failed with {0} failing check(s)")]
    VerificationFailed(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for CliError {
    fn from(s: &str) -> Self {
        CliError::Other(s.to_string())
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError::Other(s)
    }
}

pub type CliResult<T> = Result<T, CliError>;
