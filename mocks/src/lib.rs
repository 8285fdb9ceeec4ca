//! In-memory implementations of the collaborator traits of `lnc-manager`,
//! used for testing the channel state machine without external services.

pub mod memory_storage_provider;
pub mod mock_blockchain;
pub mod mock_signer;
pub mod mock_wallet;
