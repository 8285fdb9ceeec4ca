//! Negotiated channel policy and the local defaults it is derived from.

use bitcoin::ScriptBuf;
use lnc_messages::{AcceptChannel, OpenChannel};

/// The negotiated, immutable policy of a channel. Remote supplied fields are
/// learned during negotiation by replacing the whole value, never field by
/// field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    /// The dust limit applied to the local commitment transaction.
    pub local_dust_limit: u64,
    /// The dust limit applied to the remote commitment transaction.
    pub remote_dust_limit: u64,
    /// The reserve the local party must keep, imposed by the peer.
    pub local_channel_reserve: u64,
    /// The reserve the remote party must keep, imposed by us.
    pub remote_channel_reserve: u64,
    /// The maximum total value of in-flight HTLCs, in millisatoshi.
    pub max_htlc_value_in_flight: u64,
    /// The smallest accepted HTLC, in millisatoshi.
    pub htlc_minimum: u64,
    /// The maximum number of pending HTLCs.
    pub max_accepted_htlcs: u16,
    /// The fee rate for commitment transactions, in satoshi per kiloweight.
    pub fee_rate_per_kw: u64,
    /// The number of confirmations required on the funding transaction.
    pub minimum_depth: u32,
    /// The delay applied to the local balance on the local commitment,
    /// imposed by the peer.
    pub local_to_self_delay: u16,
    /// The delay applied to the remote balance on the remote commitment,
    /// imposed by us.
    pub remote_to_self_delay: u16,
    /// Whether anchor outputs are used on the channel.
    pub use_anchors: bool,
    /// Whether short channel id aliases must be exchanged.
    pub require_scid_alias: bool,
    /// The script we committed to closing to, if any.
    pub local_upfront_shutdown_script: Option<ScriptBuf>,
    /// The script the peer committed to closing to, if any.
    pub remote_upfront_shutdown_script: Option<ScriptBuf>,
}

impl ChannelConfig {
    /// The configuration of a channel from the point of view of the responder
    /// having received the given [`OpenChannel`] message, combined with the
    /// responder's own policy.
    pub fn from_open_channel(open: &OpenChannel, policy: &ChannelPolicy) -> Self {
        ChannelConfig {
            local_dust_limit: policy.dust_limit,
            remote_dust_limit: open.dust_limit,
            local_channel_reserve: open.channel_reserve,
            remote_channel_reserve: policy.reserve_for(open.funding_amount),
            max_htlc_value_in_flight: open
                .max_htlc_value_in_flight
                .min(policy.max_htlc_value_in_flight),
            htlc_minimum: open.htlc_minimum.max(policy.htlc_minimum),
            max_accepted_htlcs: open.max_accepted_htlcs.min(policy.max_accepted_htlcs),
            fee_rate_per_kw: open.fee_rate_per_kw,
            minimum_depth: policy.minimum_depth,
            local_to_self_delay: open.to_self_delay,
            remote_to_self_delay: policy.to_self_delay,
            use_anchors: open.use_anchors,
            require_scid_alias: open.require_scid_alias,
            local_upfront_shutdown_script: policy.upfront_shutdown_script.clone(),
            remote_upfront_shutdown_script: open.upfront_shutdown_script.clone(),
        }
    }

    /// The configuration of a channel from the point of view of the initiator
    /// at the time it sends an [`OpenChannel`] built from its own policy. The
    /// remote supplied fields keep their defaults until the accept message is
    /// received.
    pub fn from_own_policy(policy: &ChannelPolicy, funding_amount: u64, fee_rate_per_kw: u64) -> Self {
        ChannelConfig {
            local_dust_limit: policy.dust_limit,
            remote_dust_limit: policy.dust_limit,
            local_channel_reserve: 0,
            remote_channel_reserve: policy.reserve_for(funding_amount),
            max_htlc_value_in_flight: policy.max_htlc_value_in_flight,
            htlc_minimum: policy.htlc_minimum,
            max_accepted_htlcs: policy.max_accepted_htlcs,
            fee_rate_per_kw,
            minimum_depth: policy.minimum_depth,
            local_to_self_delay: policy.to_self_delay,
            remote_to_self_delay: policy.to_self_delay,
            use_anchors: policy.use_anchors,
            require_scid_alias: policy.require_scid_alias,
            local_upfront_shutdown_script: policy.upfront_shutdown_script.clone(),
            remote_upfront_shutdown_script: None,
        }
    }

    /// Returns the configuration updated with the fields supplied by the
    /// responder in the given [`AcceptChannel`] message. The whole value is
    /// replaced.
    pub fn with_accept_channel(&self, accept: &AcceptChannel) -> Self {
        ChannelConfig {
            local_dust_limit: self.local_dust_limit,
            remote_dust_limit: accept.dust_limit,
            local_channel_reserve: accept.channel_reserve,
            remote_channel_reserve: self.remote_channel_reserve,
            max_htlc_value_in_flight: self
                .max_htlc_value_in_flight
                .min(accept.max_htlc_value_in_flight),
            htlc_minimum: self.htlc_minimum.max(accept.htlc_minimum),
            max_accepted_htlcs: self.max_accepted_htlcs.min(accept.max_accepted_htlcs),
            fee_rate_per_kw: self.fee_rate_per_kw,
            minimum_depth: accept.minimum_depth,
            local_to_self_delay: accept.to_self_delay,
            remote_to_self_delay: self.remote_to_self_delay,
            use_anchors: self.use_anchors,
            require_scid_alias: self.require_scid_alias,
            local_upfront_shutdown_script: self.local_upfront_shutdown_script.clone(),
            remote_upfront_shutdown_script: accept.upfront_shutdown_script.clone(),
        }
    }
}

/// The local policy applied when opening and accepting channels.
#[derive(Clone, Debug)]
pub struct ChannelPolicy {
    /// The hash identifying the chain channels must live on.
    pub chain_hash: [u8; 32],
    /// The dust limit applied to our commitment transactions.
    pub dust_limit: u64,
    /// The maximum total value of in-flight HTLCs we accept, in millisatoshi.
    pub max_htlc_value_in_flight: u64,
    /// The smallest HTLC we accept, in millisatoshi.
    pub htlc_minimum: u64,
    /// The maximum number of pending HTLCs we accept.
    pub max_accepted_htlcs: u16,
    /// The confirmation depth we require on funding transactions.
    pub minimum_depth: u32,
    /// The delay we impose on the peer's balance.
    pub to_self_delay: u16,
    /// The largest delay we accept on our own balance.
    pub max_to_self_delay: u16,
    /// The reserve we impose on the peer, in permille of the funding amount.
    pub reserve_permille: u64,
    /// The smallest channel we accept, in satoshi.
    pub min_funding_amount: u64,
    /// The largest channel we accept, in satoshi.
    pub max_funding_amount: u64,
    /// The lowest commitment fee rate we accept, in satoshi per kiloweight.
    pub min_fee_rate_per_kw: u64,
    /// Whether we open channels with anchor outputs.
    pub use_anchors: bool,
    /// Whether we require short channel id aliases.
    pub require_scid_alias: bool,
    /// Whether the peer must commit to a closing script upfront.
    pub require_upfront_shutdown_script: bool,
    /// The closing script we commit to, if any.
    pub upfront_shutdown_script: Option<bitcoin::ScriptBuf>,
}

impl ChannelPolicy {
    /// The reserve to impose on a peer for a channel of the given capacity.
    /// Never below our dust limit so that the reserve output always remains
    /// spendable.
    pub fn reserve_for(&self, funding_amount: u64) -> u64 {
        (funding_amount * self.reserve_permille / 1000).max(self.dust_limit)
    }
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        ChannelPolicy {
            chain_hash: [0; 32],
            dust_limit: 354,
            max_htlc_value_in_flight: 100_000_000_000,
            htlc_minimum: 1_000,
            max_accepted_htlcs: 483,
            minimum_depth: 3,
            to_self_delay: 144,
            max_to_self_delay: 2016,
            reserve_permille: 10,
            min_funding_amount: 20_000,
            max_funding_amount: 16_777_215,
            min_fee_rate_per_kw: 253,
            use_anchors: false,
            require_scid_alias: false,
            require_upfront_shutdown_script: false,
            upfront_shutdown_script: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_never_below_dust() {
        let policy = ChannelPolicy::default();
        assert_eq!(policy.reserve_for(1_000_000), 10_000);
        assert_eq!(policy.reserve_for(10_000), policy.dust_limit);
    }
}
