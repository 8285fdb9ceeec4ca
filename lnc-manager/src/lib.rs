//! # Library providing the channel lifecycle state machine of a Lightning
//! style payment channel network: message handlers driving a channel from
//! negotiation to an open, usable state, and the coordination of funding and
//! commitment transaction signing with the external signer, wallet, storage
//! and chain collaborators.

#![crate_name = "lnc_manager"]
// Coding conventions
#![forbid(unsafe_code)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(missing_docs)]

extern crate bitcoin;
extern crate core;
extern crate lnc;
extern crate lnc_messages;
extern crate log;
extern crate secp256k1;

pub mod chain_monitor;
pub mod channel;
pub mod channel_updater;
pub mod error;
pub mod manager;
pub mod registry;
mod utils;
pub mod validation;

use bitcoin::{Address, Network, OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use chain_monitor::ChainMonitor;
use channel::Channel;
use error::Error;
use lnc_messages::ChannelPublicKeys;
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

/// Type alias for a channel id.
pub type ChannelId = [u8; 32];

/// The information the signer needs to produce and validate signatures for
/// the transactions of a channel. Registered with the signer before any
/// signature is requested.
#[derive(Clone, Debug)]
pub struct ChannelSigningInfo {
    /// The temporary id under which the channel keys were generated.
    pub temporary_channel_id: ChannelId,
    /// The witness script of the funding output.
    pub funding_script: ScriptBuf,
    /// The value of the funding output.
    pub funding_value: u64,
    /// The funding public key of the local party.
    pub own_funding_pubkey: PublicKey,
    /// The funding public key of the remote party.
    pub counterparty_funding_pubkey: PublicKey,
}

/// Provides the signing operations needed during the lifetime of a channel.
/// Implementations hold all private key material internally; no secret ever
/// crosses this boundary.
pub trait ChannelSigner {
    /// Generates the channel key set for a new channel identified by its
    /// temporary id, including the first per-commitment point.
    fn generate_channel_keys(&self, temporary_channel_id: &ChannelId)
        -> Result<ChannelPublicKeys, Error>;
    /// Registers a channel with the signer. Must be called before any
    /// signature is produced or validated for the channel.
    fn register_channel(&self, channel_id: ChannelId, info: ChannelSigningInfo)
        -> Result<(), Error>;
    /// Signs the funding input of the given channel transaction with the
    /// local funding key.
    fn sign_channel_transaction(
        &self,
        channel_id: &ChannelId,
        transaction: &Transaction,
    ) -> Result<Signature, Error>;
    /// Validates a counterparty signature over the funding input of the given
    /// channel transaction.
    fn validate_signature(
        &self,
        channel_id: &ChannelId,
        signature: &Signature,
        transaction: &Transaction,
    ) -> Result<(), Error>;
    /// Signs the inputs of the funding transaction spending the given coins.
    /// Returns whether all inputs could be signed.
    fn sign_funding_transaction(
        &self,
        channel_id: &ChannelId,
        transaction: &mut Transaction,
        spent_coins: &[Utxo],
    ) -> Result<bool, Error>;
    /// Returns the per-commitment point of the channel at the given index.
    fn get_per_commitment_point(
        &self,
        channel_id: &ChannelId,
        index: u64,
    ) -> Result<PublicKey, Error>;
}

/// Wallet trait providing addresses and coin reservation for channel funding.
pub trait Wallet {
    /// Returns a new (unused) address.
    fn get_new_address(&self) -> Result<Address, Error>;
    /// Returns a new (unused) change address.
    fn get_new_change_address(&self) -> Result<Address, Error>;
    /// Selects and reserves a set of UTXOs covering the given amount plus fee
    /// headroom for the given channel.
    fn lock_utxos_for_channel(
        &self,
        channel_id: &ChannelId,
        amount: u64,
        fee_rate_per_kw: u64,
    ) -> Result<Vec<Utxo>, Error>;
    /// Returns the UTXOs previously reserved for the given channel.
    fn get_locked_utxos_for_channel(&self, channel_id: &ChannelId) -> Result<Vec<Utxo>, Error>;
    /// Releases previously reserved UTXOs.
    fn unreserve_utxos(&self, outpoints: &[OutPoint]) -> Result<(), Error>;
}

/// Blockchain trait provides access to the bitcoin blockchain.
pub trait Blockchain {
    /// Broadcast the given transaction to the bitcoin network.
    fn send_transaction(&self, transaction: &Transaction) -> Result<(), Error>;
    /// Returns the network currently used (mainnet, testnet or regtest).
    fn get_network(&self) -> Result<Network, Error>;
    /// Returns the height of the blockchain.
    fn get_blockchain_height(&self) -> Result<u64, Error>;
    /// Get the number of confirmations for the transaction with given id.
    fn get_transaction_confirmations(&self, tx_id: &Txid) -> Result<u32, Error>;
    /// Get the block height and intra-block index of a confirmed transaction,
    /// if known.
    fn get_transaction_position(&self, tx_id: &Txid) -> Result<Option<(u32, u32)>, Error>;
}

/// Storage trait provides functionalities to store and retrieve channels.
pub trait Storage {
    /// Returns the channel with given id if found.
    fn get_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>, Error>;
    /// Returns all stored channels.
    fn get_channels(&self) -> Result<Vec<Channel>, Error>;
    /// Creates a record for the given channel, failing with
    /// [`error::StorageError::AlreadyExists`] if one exists.
    fn create_channel(&self, channel: &Channel) -> Result<(), Error>;
    /// Updates the record of the given channel, failing with
    /// [`error::StorageError::NotFound`] if none exists.
    fn update_channel(&self, channel: &Channel) -> Result<(), Error>;
    /// Writes the [`ChainMonitor`] data to the store.
    fn persist_chain_monitor(&self, monitor: &ChainMonitor) -> Result<(), Error>;
    /// Returns the latest [`ChainMonitor`] in the store if any.
    fn get_chain_monitor(&self) -> Result<Option<ChainMonitor>, Error>;
}

/// Represents a UTXO.
#[derive(Clone, Debug)]
pub struct Utxo {
    /// The TxOut containing the value and script pubkey of the referenced output.
    pub tx_out: TxOut,
    /// The outpoint containing the txid and vout of the referenced output.
    pub outpoint: OutPoint,
    /// The address associated with the referenced output.
    pub address: Address,
    /// The redeem script for the referenced output.
    pub redeem_script: ScriptBuf,
    /// Whether this Utxo has been reserved for a channel funding.
    pub reserved: bool,
}
