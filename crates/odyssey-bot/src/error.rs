//! Error types for the odyssey bot.

/// Server code for a stage that was already claimed.
pub const CODE_ALREADY_CLAIMED: i64 = 100015;
/// Alternate server code for an already-claimed stage.
pub const CODE_ALREADY_CLAIMED_ALT: i64 = 100016;

const MSG_INTERACT_NOT_FINISHED: &str = "interact task not finished";
const MSG_ALREADY_CHECKED_IN: &str = "current account already checked in";

/// A decoded error returned by the reward API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status of the response.
    pub status: u16,
    /// Application code from the response envelope.
    pub code: i64,
    pub message: String,
}

/// What an [`ApiError`] means to the reward workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    AlreadyClaimed,
    InteractTaskNotFinished,
    AlreadyCheckedIn,
    Other,
}

impl ApiError {
    pub fn new(status: u16, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Classify the error by its code and message.
    pub fn kind(&self) -> ApiErrorKind {
        match (self.code, self.message.as_str()) {
            (CODE_ALREADY_CLAIMED | CODE_ALREADY_CLAIMED_ALT, _) => ApiErrorKind::AlreadyClaimed,
            (_, MSG_INTERACT_NOT_FINISHED) => ApiErrorKind::InteractTaskNotFinished,
            (_, MSG_ALREADY_CHECKED_IN) => ApiErrorKind::AlreadyCheckedIn,
            _ => ApiErrorKind::Other,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HTTP {} (code {}): {}",
            self.status, self.code, self.message
        )
    }
}

/// All errors that can occur in odyssey operations.
#[derive(Debug, thiserror::Error)]
pub enum OdysseyError {
    #[error("Credential file error: {0}")]
    CredentialFile(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Reward API error: {0}")]
    Api(ApiError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Chain RPC error: {0}")]
    Chain(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<OdysseyError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OdysseyError {
    /// The API error behind this failure, looking through retry exhaustion.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            OdysseyError::Api(e) => Some(e),
            OdysseyError::RetriesExhausted { source, .. } => source.api_error(),
            _ => None,
        }
    }

    /// Classification of the API error behind this failure, if any.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        self.api_error().map(ApiError::kind)
    }
}

impl From<reqwest::Error> for OdysseyError {
    fn from(e: reqwest::Error) -> Self {
        OdysseyError::Network(e.to_string())
    }
}

impl From<solana_client::client_error::ClientError> for OdysseyError {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        OdysseyError::Chain(e.to_string())
    }
}

impl From<bincode::Error> for OdysseyError {
    fn from(e: bincode::Error) -> Self {
        OdysseyError::Transaction(e.to_string())
    }
}

impl From<base64::DecodeError> for OdysseyError {
    fn from(e: base64::DecodeError) -> Self {
        OdysseyError::Transaction(format!("invalid base64 payload: {e}"))
    }
}

impl From<toml::de::Error> for OdysseyError {
    fn from(e: toml::de::Error) -> Self {
        OdysseyError::Config(e.to_string())
    }
}

/// Convenience type alias.
pub type OdysseyResult<T> = Result<T, OdysseyError>;
