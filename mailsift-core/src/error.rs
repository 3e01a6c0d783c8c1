use mailsift_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("No domains provided")]
    NoDomains,

    #[error("Too many domains: received {received}, maximum is {max}")]
    TooManyDomains { received: usize, max: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl HarvestError {
    /// Machine-readable reason code for API error payloads
    pub fn reason(&self) -> &'static str {
        match self {
            HarvestError::NoDomains => "no_domains",
            HarvestError::TooManyDomains { .. } => "too_many_domains",
            HarvestError::InvalidConfig(_) | HarvestError::Config(_) => "invalid_config",
            HarvestError::Scan(_) => "scan_error",
        }
    }

    /// Request-level validation failures, as opposed to server-side faults
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HarvestError::NoDomains | HarvestError::TooManyDomains { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
