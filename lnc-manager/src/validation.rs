//! Validation of the channel parameters supplied by a peer during channel
//! negotiation. All checks return typed protocol errors that handlers surface
//! unchanged; no money moving action happens before the relevant check
//! passed.

use lnc_messages::{AcceptChannel, OpenChannel};

use crate::channel::config::ChannelPolicy;
use crate::channel::Channel;
use crate::error::Error;
use crate::ChannelId;

/// The protocol level maximum number of one-way in-flight HTLCs.
const MAX_HTLCS: u16 = 483;

/// The dust limit floor under which a peer's commitment transactions could
/// carry unrelayable outputs.
const MIN_DUST_LIMIT: u64 = 354;

fn parameter_error(channel_id: ChannelId, peer_message: &str, detail: String) -> Error {
    Error::protocol(channel_id, peer_message, detail)
}

/// Validates the parameters of a received [`OpenChannel`] message against the
/// local policy.
pub fn validate_open_channel(open: &OpenChannel, policy: &ChannelPolicy) -> Result<(), Error> {
    let id = open.temporary_channel_id;

    if open.chain_hash != policy.chain_hash {
        return Err(parameter_error(
            id,
            "Unknown chain hash",
            format!("chain hash {:?} not accepted", open.chain_hash),
        ));
    }
    if open.funding_amount < policy.min_funding_amount
        || open.funding_amount > policy.max_funding_amount
    {
        return Err(parameter_error(
            id,
            "Funding amount is not acceptable",
            format!("funding amount {} outside accepted range", open.funding_amount),
        ));
    }
    if open.push_amount > open.funding_amount * 1000 {
        return Err(parameter_error(
            id,
            "Push amount exceeds funding amount",
            format!(
                "push {} msat with funding {} sat",
                open.push_amount, open.funding_amount
            ),
        ));
    }
    if open.dust_limit < MIN_DUST_LIMIT {
        return Err(parameter_error(
            id,
            "Dust limit is too low",
            format!("dust limit {} below {}", open.dust_limit, MIN_DUST_LIMIT),
        ));
    }
    if open.dust_limit > open.channel_reserve {
        return Err(parameter_error(
            id,
            "Dust limit exceeds channel reserve",
            format!(
                "dust limit {} above reserve {}",
                open.dust_limit, open.channel_reserve
            ),
        ));
    }
    if open.to_self_delay > policy.max_to_self_delay {
        return Err(parameter_error(
            id,
            "To-self delay is too large",
            format!(
                "to-self delay {} above maximum {}",
                open.to_self_delay, policy.max_to_self_delay
            ),
        ));
    }
    if open.max_accepted_htlcs == 0 || open.max_accepted_htlcs > MAX_HTLCS {
        return Err(parameter_error(
            id,
            "Maximum accepted HTLCs is not acceptable",
            format!("max accepted HTLCs {}", open.max_accepted_htlcs),
        ));
    }
    if open.fee_rate_per_kw < policy.min_fee_rate_per_kw {
        return Err(parameter_error(
            id,
            "Fee rate is too low",
            format!(
                "fee rate {} below minimum {}",
                open.fee_rate_per_kw, policy.min_fee_rate_per_kw
            ),
        ));
    }
    if policy.require_upfront_shutdown_script && open.upfront_shutdown_script.is_none() {
        return Err(parameter_error(
            id,
            "Missing upfront shutdown script",
            "upfront shutdown script required by local policy".to_string(),
        ));
    }

    Ok(())
}

/// Validates the parameters of a received [`AcceptChannel`] message against
/// the local policy and the channel negotiated so far.
pub fn validate_accept_channel(
    accept: &AcceptChannel,
    channel: &Channel,
    policy: &ChannelPolicy,
) -> Result<(), Error> {
    let id = accept.temporary_channel_id;

    if accept.minimum_depth != policy.minimum_depth {
        return Err(parameter_error(
            id,
            "Minimum depth is not acceptable",
            format!(
                "minimum depth {} does not match configured {}",
                accept.minimum_depth, policy.minimum_depth
            ),
        ));
    }
    if accept.dust_limit < MIN_DUST_LIMIT {
        return Err(parameter_error(
            id,
            "Dust limit is too low",
            format!("dust limit {} below {}", accept.dust_limit, MIN_DUST_LIMIT),
        ));
    }
    if accept.dust_limit > accept.channel_reserve {
        return Err(parameter_error(
            id,
            "Dust limit exceeds channel reserve",
            format!(
                "dust limit {} above reserve {}",
                accept.dust_limit, accept.channel_reserve
            ),
        ));
    }
    // The reserve the responder demands must itself be spendable.
    if accept.channel_reserve < channel.config.local_dust_limit {
        return Err(parameter_error(
            id,
            "Channel reserve is below our dust limit",
            format!(
                "reserve {} below local dust limit {}",
                accept.channel_reserve, channel.config.local_dust_limit
            ),
        ));
    }
    if accept.to_self_delay > policy.max_to_self_delay {
        return Err(parameter_error(
            id,
            "To-self delay is too large",
            format!(
                "to-self delay {} above maximum {}",
                accept.to_self_delay, policy.max_to_self_delay
            ),
        ));
    }
    if accept.max_accepted_htlcs == 0 || accept.max_accepted_htlcs > MAX_HTLCS {
        return Err(parameter_error(
            id,
            "Maximum accepted HTLCs is not acceptable",
            format!("max accepted HTLCs {}", accept.max_accepted_htlcs),
        ));
    }
    if policy.require_upfront_shutdown_script && accept.upfront_shutdown_script.is_none() {
        return Err(parameter_error(
            id,
            "Missing upfront shutdown script",
            "upfront shutdown script required by local policy".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnc_messages::ChannelPublicKeys;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn public_keys() -> ChannelPublicKeys {
        ChannelPublicKeys {
            funding_pubkey: pk(1),
            revocation_basepoint: pk(2),
            payment_basepoint: pk(3),
            delayed_payment_basepoint: pk(4),
            htlc_basepoint: pk(5),
            first_per_commitment_point: pk(6),
        }
    }

    fn test_open() -> OpenChannel {
        OpenChannel {
            chain_hash: [0; 32],
            temporary_channel_id: [1; 32],
            funding_amount: 1_000_000,
            push_amount: 0,
            dust_limit: 354,
            max_htlc_value_in_flight: 100_000_000,
            channel_reserve: 10_000,
            htlc_minimum: 1_000,
            fee_rate_per_kw: 2500,
            to_self_delay: 144,
            max_accepted_htlcs: 100,
            public_keys: public_keys(),
            channel_flags: 0,
            upfront_shutdown_script: None,
            use_anchors: false,
            require_scid_alias: false,
        }
    }

    fn peer_message(res: Result<(), Error>) -> String {
        match res {
            Err(Error::Protocol(e)) => e.peer_message,
            _ => panic!("Expected a protocol error"),
        }
    }

    #[test]
    fn accepts_reasonable_parameters() {
        assert!(validate_open_channel(&test_open(), &ChannelPolicy::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_chain() {
        let open = OpenChannel {
            chain_hash: [9; 32],
            ..test_open()
        };
        assert_eq!(
            peer_message(validate_open_channel(&open, &ChannelPolicy::default())),
            "Unknown chain hash"
        );
    }

    #[test]
    fn rejects_dust_limit_above_reserve() {
        let open = OpenChannel {
            dust_limit: 20_000,
            channel_reserve: 10_000,
            ..test_open()
        };
        assert_eq!(
            peer_message(validate_open_channel(&open, &ChannelPolicy::default())),
            "Dust limit exceeds channel reserve"
        );
    }

    #[test]
    fn rejects_push_above_funding() {
        let open = OpenChannel {
            push_amount: 1_000_000_001_000,
            ..test_open()
        };
        assert_eq!(
            peer_message(validate_open_channel(&open, &ChannelPolicy::default())),
            "Push amount exceeds funding amount"
        );
    }

    #[test]
    fn rejects_excessive_to_self_delay() {
        let open = OpenChannel {
            to_self_delay: 5_000,
            ..test_open()
        };
        assert_eq!(
            peer_message(validate_open_channel(&open, &ChannelPolicy::default())),
            "To-self delay is too large"
        );
    }

    #[test]
    fn rejects_missing_upfront_script_when_required() {
        let policy = ChannelPolicy {
            require_upfront_shutdown_script: true,
            ..ChannelPolicy::default()
        };
        assert_eq!(
            peer_message(validate_open_channel(&test_open(), &policy)),
            "Missing upfront shutdown script"
        );
    }
}
