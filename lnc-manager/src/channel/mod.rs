//! # Module containing the channel aggregate: the mutable record of a
//! channel's negotiated parameters, key material, balances and lifecycle
//! state, owned exclusively by the message handlers.

use bitcoin::Transaction;
use lnc::outputs::FundingOutput;
use lnc_messages::ShortChannelId;
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use crate::ChannelId;

pub mod config;
pub mod keys;

use self::config::ChannelConfig;
use self::keys::ChannelKeySet;
use lnc::keys::CommitmentNumber;

/// The lifecycle state of a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// Parameters are being negotiated, the channel only has a temporary id.
    Opening,
    /// The funding transaction was created and the initiator signed the
    /// responder's first commitment transaction.
    FundingCreated,
    /// Both first commitment transactions are signed; the funding transaction
    /// can safely confirm.
    FundingSigned,
    /// The peer announced its readiness, our funding depth is not reached yet.
    ReadyForThem,
    /// Our funding depth was reached and our readiness announced, the peer's
    /// announcement is pending.
    ReadyForUs,
    /// The channel is fully open and usable.
    Open,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            ChannelState::Opening => "Opening",
            ChannelState::FundingCreated => "FundingCreated",
            ChannelState::FundingSigned => "FundingSigned",
            ChannelState::ReadyForThem => "ReadyForThem",
            ChannelState::ReadyForUs => "ReadyForUs",
            ChannelState::Open => "Open",
        };
        f.write_str(state)
    }
}

/// An HTLC pending on a channel. Trimming an HTLC output from a commitment
/// round does not remove the HTLC from this bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingHtlc {
    /// The id of the HTLC on its sender's side.
    pub id: u64,
    /// Whether the HTLC was offered by the local party.
    pub offered: bool,
    /// The amount of the HTLC in millisatoshi.
    pub amount_msat: u64,
    /// The block height at which the HTLC times out.
    pub cltv_expiry: u32,
    /// The hash whose preimage unlocks the HTLC.
    pub payment_hash: [u8; 32],
}

/// The aggregate record of a channel.
#[derive(Clone, Debug)]
pub struct Channel {
    /// The id of the channel, equal to the temporary id until the funding
    /// outpoint is known.
    pub channel_id: ChannelId,
    /// The temporary id the channel was negotiated under.
    pub temporary_channel_id: ChannelId,
    /// The node id of the counter party.
    pub counter_party: PublicKey,
    /// The negotiated channel configuration.
    pub config: ChannelConfig,
    /// The local key material.
    pub own_keys: ChannelKeySet,
    /// The remote key material, known once negotiation messages have been
    /// exchanged.
    pub counter_keys: Option<ChannelKeySet>,
    /// The commitment number of the current round, computable once both
    /// payment base points are known.
    pub commitment_number: Option<CommitmentNumber>,
    /// The negotiated channel capacity in satoshi.
    pub funding_amount: u64,
    /// The funding output, with its chain position once known.
    pub funding_output: Option<FundingOutput>,
    /// The funding transaction, kept by the initiator until broadcast.
    pub funding_transaction: Option<Transaction>,
    /// The local balance in millisatoshi.
    pub own_balance_msat: u64,
    /// The remote balance in millisatoshi.
    pub counter_balance_msat: u64,
    /// The id the next locally offered HTLC will get.
    pub own_next_htlc_id: u64,
    /// The id the next remotely offered HTLC will get.
    pub counter_next_htlc_id: u64,
    /// The HTLCs currently pending on the channel.
    pub pending_htlcs: Vec<PendingHtlc>,
    /// The last commitment signature we produced for the peer.
    pub last_sent_signature: Option<Signature>,
    /// The last commitment signature received from the peer.
    pub last_received_signature: Option<Signature>,
    /// Whether the local party initiated (and funded) the channel.
    pub is_initiator: bool,
    /// The real short channel id, known once the funding output confirmed.
    pub short_channel_id: Option<ShortChannelId>,
    /// The aliases we minted for the peer to use.
    pub own_aliases: Vec<ShortChannelId>,
    /// The alias the peer asked us to use.
    pub counter_alias: Option<ShortChannelId>,
    /// The peer's second per-commitment point, revealed in its channel ready
    /// message.
    pub counter_next_per_commitment_point: Option<PublicKey>,
    /// The lifecycle state of the channel.
    pub state: ChannelState,
}

impl Channel {
    /// The channel capacity in millisatoshi.
    pub fn capacity_msat(&self) -> u64 {
        self.funding_amount * 1000
    }

    /// The total value of the pending HTLCs in millisatoshi.
    pub fn pending_htlc_value_msat(&self) -> u64 {
        self.pending_htlcs.iter().map(|h| h.amount_msat).sum()
    }

    /// Checks that the balances plus the live HTLC amounts never exceed the
    /// funding amount.
    pub fn balances_are_consistent(&self) -> bool {
        self.own_balance_msat + self.counter_balance_msat + self.pending_htlc_value_msat()
            <= self.capacity_msat()
    }

    /// Whether the channel still lives under its temporary id.
    pub fn is_temporary(&self) -> bool {
        self.channel_id == self.temporary_channel_id && self.state == ChannelState::Opening
    }
}
