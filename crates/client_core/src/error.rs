use shared::{domain::Cid, error::ApiException};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("channel {0} is not active in this client")]
    UnknownChannel(Cid),
    #[error("transport request failed: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("channel cache failed: {0}")]
    Cache(#[source] anyhow::Error),
    #[error("server rejected request: {0}")]
    Server(#[from] ApiException),
    #[error("invalid channel cid '{0}'")]
    InvalidCid(String),
}

impl ClientError {
    /// Collaborator failures that carry a server error payload surface as
    /// `Server`; anything else is a transport failure.
    pub fn from_transport(err: anyhow::Error) -> Self {
        match err.downcast::<ApiException>() {
            Ok(api) => Self::Server(api),
            Err(err) => Self::Transport(err),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Server(err) => err.code.is_transient(),
            Self::UnknownChannel(_) | Self::Cache(_) | Self::InvalidCid(_) => false,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
