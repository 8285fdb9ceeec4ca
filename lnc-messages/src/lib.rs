//! Data structures for the messages exchanged during the establishment of a
//! Lightning-style payment channel. Handlers consume and produce these
//! already-parsed objects; the wire encoding lives in a separate layer.

#![crate_name = "lnc_messages"]
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
extern crate secp256k1;

use bitcoin::{ScriptBuf, Txid};
use secp256k1::ecdsa::Signature;
use secp256k1::rand::Rng;
use secp256k1::PublicKey;

pub mod factory;

/// A compact identifier of a channel by the chain position of its funding
/// output, or a random privacy-preserving substitute for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortChannelId(pub u64);

impl ShortChannelId {
    /// Creates a [`ShortChannelId`] from the chain position of the funding
    /// output.
    pub fn new(block_height: u32, transaction_index: u32, output_index: u16) -> Self {
        ShortChannelId(
            ((block_height as u64 & 0xffffff) << 40)
                | ((transaction_index as u64 & 0xffffff) << 16)
                | output_index as u64,
        )
    }

    /// Creates a random alias usable in place of the real identifier.
    pub fn random_alias<R: Rng>(rng: &mut R) -> Self {
        ShortChannelId(rng.gen())
    }

    /// The block height part of the identifier.
    pub fn block_height(&self) -> u32 {
        ((self.0 >> 40) & 0xffffff) as u32
    }

    /// The transaction index part of the identifier.
    pub fn transaction_index(&self) -> u32 {
        ((self.0 >> 16) & 0xffffff) as u32
    }

    /// The output index part of the identifier.
    pub fn output_index(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

/// The channel base points and first per-commitment point a party reveals
/// when negotiating a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPublicKeys {
    /// The public key used in the 2-of-2 funding output.
    pub funding_pubkey: PublicKey,
    /// The base point used to derive revocation keys.
    pub revocation_basepoint: PublicKey,
    /// The base point receiving the party's balance on the remote commitment.
    pub payment_basepoint: PublicKey,
    /// The base point used to derive delayed payment keys.
    pub delayed_payment_basepoint: PublicKey,
    /// The base point used to derive HTLC keys.
    pub htlc_basepoint: PublicKey,
    /// The per-commitment point for the first commitment transaction.
    pub first_per_commitment_point: PublicKey,
}

/// Requests the opening of a channel, sent by the channel initiator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenChannel {
    /// The identifier of the chain the channel lives on.
    pub chain_hash: [u8; 32],
    /// A random nonce identifying the channel until the funding transaction
    /// is created.
    pub temporary_channel_id: [u8; 32],
    /// The capacity of the channel in satoshi.
    pub funding_amount: u64,
    /// The amount pushed to the responder at opening, in millisatoshi.
    pub push_amount: u64,
    /// The dust limit the initiator applies to its commitment transaction.
    pub dust_limit: u64,
    /// The maximum total value of in-flight HTLCs, in millisatoshi.
    pub max_htlc_value_in_flight: u64,
    /// The reserve the responder must keep on its side, in satoshi.
    pub channel_reserve: u64,
    /// The smallest HTLC the initiator accepts, in millisatoshi.
    pub htlc_minimum: u64,
    /// The fee rate for commitment transactions, in satoshi per kiloweight.
    pub fee_rate_per_kw: u64,
    /// The delay imposed on the responder's balance when it broadcasts.
    pub to_self_delay: u16,
    /// The maximum number of HTLCs the initiator accepts.
    pub max_accepted_htlcs: u16,
    /// The initiator's channel keys.
    pub public_keys: ChannelPublicKeys,
    /// Channel flags, bit zero indicating a public channel.
    pub channel_flags: u8,
    /// The script the initiator commits to closing to, if any.
    pub upfront_shutdown_script: Option<ScriptBuf>,
    /// Whether anchor outputs are used on the channel.
    pub use_anchors: bool,
    /// Whether short channel id aliases must be exchanged.
    pub require_scid_alias: bool,
}

/// Accepts a channel opening, sent by the responder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptChannel {
    /// The temporary id from the [`OpenChannel`] being accepted.
    pub temporary_channel_id: [u8; 32],
    /// The dust limit the responder applies to its commitment transaction.
    pub dust_limit: u64,
    /// The maximum total value of in-flight HTLCs, in millisatoshi.
    pub max_htlc_value_in_flight: u64,
    /// The reserve the initiator must keep on its side, in satoshi.
    pub channel_reserve: u64,
    /// The smallest HTLC the responder accepts, in millisatoshi.
    pub htlc_minimum: u64,
    /// The number of confirmations the responder requires on the funding
    /// transaction.
    pub minimum_depth: u32,
    /// The delay imposed on the initiator's balance when it broadcasts.
    pub to_self_delay: u16,
    /// The maximum number of HTLCs the responder accepts.
    pub max_accepted_htlcs: u16,
    /// The responder's channel keys.
    pub public_keys: ChannelPublicKeys,
    /// The script the responder commits to closing to, if any.
    pub upfront_shutdown_script: Option<ScriptBuf>,
}

/// Reveals the funding outpoint chosen by the initiator together with its
/// signature for the responder's first commitment transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingCreated {
    /// The temporary id of the channel being funded.
    pub temporary_channel_id: [u8; 32],
    /// The id of the funding transaction.
    pub funding_txid: Txid,
    /// The index of the funding output.
    pub funding_output_index: u16,
    /// The initiator's signature for the responder's commitment transaction.
    pub signature: Signature,
}

/// The responder's signature for the initiator's first commitment
/// transaction, allowing the funding transaction to be broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingSigned {
    /// The funding-derived id of the channel.
    pub channel_id: [u8; 32],
    /// The responder's signature for the initiator's commitment transaction.
    pub signature: Signature,
}

/// Announces that the funding transaction reached the negotiated depth and
/// reveals the sender's second per-commitment point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelReady {
    /// The funding-derived id of the channel.
    pub channel_id: [u8; 32],
    /// The per-commitment point for the sender's next commitment.
    pub second_per_commitment_point: PublicKey,
    /// An alias the peer may use to refer to the channel.
    pub short_channel_id: Option<ShortChannelId>,
}

/// A recoverable anomaly reported to the peer without closing the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarningMessage {
    /// The id of the concerned channel.
    pub channel_id: [u8; 32],
    /// A human readable description of the anomaly.
    pub message: String,
}

/// A fatal failure reported to the peer before tearing the channel down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage {
    /// The id of the concerned channel.
    pub channel_id: [u8; 32],
    /// A human readable description of the failure.
    pub message: String,
}

/// A message exchanged between channel peers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Message {
    /// An open channel request.
    Open(OpenChannel),
    /// An accept channel reply.
    Accept(AcceptChannel),
    /// A funding created message.
    FundingCreated(FundingCreated),
    /// A funding signed message.
    FundingSigned(FundingSigned),
    /// A channel ready message.
    ChannelReady(ChannelReady),
    /// A warning message.
    Warning(WarningMessage),
    /// An error message.
    Error(ErrorMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::rand::rngs::mock::StepRng;

    #[test]
    fn short_channel_id_round_trips() {
        let scid = ShortChannelId::new(654_321, 1_234, 7);
        assert_eq!(scid.block_height(), 654_321);
        assert_eq!(scid.transaction_index(), 1_234);
        assert_eq!(scid.output_index(), 7);
    }

    #[test]
    fn random_alias_uses_provided_rng() {
        let mut rng = StepRng::new(42, 0);
        let alias = ShortChannelId::random_alias(&mut rng);
        assert_eq!(alias, ShortChannelId(42));
    }
}
