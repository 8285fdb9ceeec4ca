//! #Error
use std::fmt;

use crate::ChannelId;

/// A fatal protocol failure. The transport layer must forward the peer facing
/// message to the counterparty and tear the channel down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolError {
    /// The id of the concerned channel.
    pub channel_id: ChannelId,
    /// The message to forward to the peer.
    pub peer_message: String,
    /// Additional context kept local to this node.
    pub internal_message: String,
}

impl ProtocolError {
    /// Creates a new [`ProtocolError`].
    pub fn new(channel_id: ChannelId, peer_message: &str, internal_message: String) -> Self {
        ProtocolError {
            channel_id,
            peer_message: peer_message.to_string(),
            internal_message,
        }
    }
}

/// A recoverable protocol anomaly. The operation is a no-op and the transport
/// layer may forward the peer facing message as a warning without closing the
/// connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolWarning {
    /// The id of the concerned channel.
    pub channel_id: ChannelId,
    /// The message to forward to the peer.
    pub peer_message: String,
    /// Additional context kept local to this node.
    pub internal_message: String,
}

impl ProtocolWarning {
    /// Creates a new [`ProtocolWarning`].
    pub fn new(channel_id: ChannelId, peer_message: &str, internal_message: String) -> Self {
        ProtocolWarning {
            channel_id,
            peer_message: peer_message.to_string(),
            internal_message,
        }
    }
}

/// An error raised by the storage component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// A record with the same id already exists.
    AlreadyExists,
    /// No record was found for the requested id.
    NotFound,
    /// The storage backend failed.
    Internal(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::AlreadyExists => write!(f, "Record already exists"),
            StorageError::NotFound => write!(f, "Record not found"),
            StorageError::Internal(ref s) => write!(f, "Storage failure: {}", s),
        }
    }
}

/// An error code.
#[derive(Debug)]
pub enum Error {
    /// A fatal protocol failure on a channel.
    Protocol(ProtocolError),
    /// A recoverable protocol anomaly on a channel.
    Warning(ProtocolWarning),
    /// An invalid state was encountered, likely to indicate a bug.
    InvalidState(String),
    /// Some invalid parameters were provided.
    InvalidParameters(String),
    /// An error occurred in the wallet component.
    WalletError(String),
    /// An error occurred in the blockchain component.
    BlockchainError(String),
    /// The storage component encountered an error.
    StorageError(StorageError),
    /// The signer component encountered an error.
    SignerError(String),
    /// An error occurred in the transaction construction library.
    TxError(lnc::Error),
    /// An error occurred in the Secp library.
    SecpError(secp256k1::Error),
}

impl Error {
    /// Shorthand for a [`ProtocolError`] wrapped in an [`Error`].
    pub fn protocol(channel_id: ChannelId, peer_message: &str, internal_message: String) -> Error {
        Error::Protocol(ProtocolError::new(channel_id, peer_message, internal_message))
    }

    /// Shorthand for a [`ProtocolWarning`] wrapped in an [`Error`].
    pub fn warning(channel_id: ChannelId, peer_message: &str, internal_message: String) -> Error {
        Error::Warning(ProtocolWarning::new(
            channel_id,
            peer_message,
            internal_message,
        ))
    }

    /// A protocol error for a message received in a state where it is not
    /// valid.
    pub fn unexpected_state(
        channel_id: ChannelId,
        message_type: &str,
        state: &dyn fmt::Display,
    ) -> Error {
        Error::protocol(
            channel_id,
            "Message received in unexpected state",
            format!("{} received in state {}", message_type, state),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Protocol(ref e) => write!(f, "Protocol error: {}", e.internal_message),
            Error::Warning(ref w) => write!(f, "Protocol warning: {}", w.internal_message),
            Error::InvalidState(ref s) => write!(f, "Invalid state: {}", s),
            Error::InvalidParameters(ref s) => write!(f, "Invalid parameters were provided: {}", s),
            Error::WalletError(ref s) => write!(f, "Wallet error {}", s),
            Error::BlockchainError(ref s) => write!(f, "Blockchain error {}", s),
            Error::StorageError(ref e) => write!(f, "Storage error {}", e),
            Error::SignerError(ref s) => write!(f, "Signer error {}", s),
            Error::TxError(ref e) => write!(f, "Transaction error {}", e),
            Error::SecpError(_) => write!(f, "Secp error"),
        }
    }
}

impl From<lnc::Error> for Error {
    fn from(e: lnc::Error) -> Error {
        Error::TxError(e)
    }
}

impl From<secp256k1::Error> for Error {
    fn from(e: secp256k1::Error) -> Error {
        Error::SecpError(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Error {
        Error::StorageError(e)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TxError(e) => Some(e),
            Error::SecpError(e) => Some(e),
            _ => None,
        }
    }
}
