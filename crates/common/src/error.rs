use thiserror::Error;

/// Crate-wide error type for the gateway workspace.
///
/// A handful of plain string variants for the common failure modes,
/// structured variants where the caller needs fields back, and
/// `#[from]` conversions for the errors that show up at crate
/// boundaries.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("channel parse error: {0}")]
    ChannelParse(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("subscription denied: {reason}")]
    SubscriptionDenied { reason: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::SubscriptionDenied {
            reason: reason.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable wire error code for this failure, per the codec's `error` envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ChannelParse(_) | Self::ChannelNotFound(_) => "INVALID_CHANNEL",
            Self::SubscriptionDenied { .. } => "WS_SUBSCRIPTION_DENIED",
            Self::Serialization(_) => "INVALID_FORMAT",
            _ => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
