use kvring_proto::Identifier;
use thiserror::Error;
use tonic::Status;

pub type Result<T> = std::result::Result<T, ChordError>;

#[derive(Debug, Error)]
pub enum ChordError {
    #[error("{0}: lack valid address")]
    MissingAddress(&'static str),

    #[error("identifier must be exactly 20 bytes, got {0}")]
    InvalidIdentifier(usize),

    #[error("{addr} unreachable: {reason}")]
    Unreachable { addr: String, reason: String },

    #[error("{addr} answered with an error: {status}")]
    Remote { addr: String, status: Status },

    #[error("successor not found for {0}")]
    SuccessorNotFound(Identifier),

    #[error("node is not listening")]
    NotListening,

    #[error("node already created or joined")]
    AlreadyRunning,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine local network address: {0}")]
    LocalAddress(String),
}

impl From<ChordError> for Status {
    fn from(err: ChordError) -> Self {
        match err {
            ChordError::MissingAddress(_) | ChordError::InvalidIdentifier(_) => {
                Status::invalid_argument(err.to_string())
            }
            ChordError::Unreachable { .. } | ChordError::NotListening => {
                Status::unavailable(err.to_string())
            }
            ChordError::Remote { status, .. } => status,
            ChordError::SuccessorNotFound(_) => Status::not_found(err.to_string()),
            ChordError::AlreadyRunning => Status::failed_precondition(err.to_string()),
            ChordError::Bind { .. } | ChordError::LocalAddress(_) => {
                Status::internal(err.to_string())
            }
        }
    }
}
