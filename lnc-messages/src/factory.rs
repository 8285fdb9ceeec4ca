//! Pure constructors for outbound protocol messages. Handlers assemble every
//! message they emit through these functions; none of them has side effects.

use bitcoin::{ScriptBuf, Txid};
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use crate::{
    AcceptChannel, ChannelPublicKeys, ChannelReady, ErrorMessage, FundingCreated, FundingSigned,
    OpenChannel, ShortChannelId, WarningMessage,
};

/// Builds an [`OpenChannel`] message.
#[allow(clippy::too_many_arguments)]
pub fn open_channel(
    chain_hash: [u8; 32],
    temporary_channel_id: [u8; 32],
    funding_amount: u64,
    push_amount: u64,
    dust_limit: u64,
    max_htlc_value_in_flight: u64,
    channel_reserve: u64,
    htlc_minimum: u64,
    fee_rate_per_kw: u64,
    to_self_delay: u16,
    max_accepted_htlcs: u16,
    public_keys: ChannelPublicKeys,
    channel_flags: u8,
    upfront_shutdown_script: Option<ScriptBuf>,
    use_anchors: bool,
    require_scid_alias: bool,
) -> OpenChannel {
    OpenChannel {
        chain_hash,
        temporary_channel_id,
        funding_amount,
        push_amount,
        dust_limit,
        max_htlc_value_in_flight,
        channel_reserve,
        htlc_minimum,
        fee_rate_per_kw,
        to_self_delay,
        max_accepted_htlcs,
        public_keys,
        channel_flags,
        upfront_shutdown_script,
        use_anchors,
        require_scid_alias,
    }
}

/// Builds an [`AcceptChannel`] message.
#[allow(clippy::too_many_arguments)]
pub fn accept_channel(
    temporary_channel_id: [u8; 32],
    dust_limit: u64,
    max_htlc_value_in_flight: u64,
    channel_reserve: u64,
    htlc_minimum: u64,
    minimum_depth: u32,
    to_self_delay: u16,
    max_accepted_htlcs: u16,
    public_keys: ChannelPublicKeys,
    upfront_shutdown_script: Option<ScriptBuf>,
) -> AcceptChannel {
    AcceptChannel {
        temporary_channel_id,
        dust_limit,
        max_htlc_value_in_flight,
        channel_reserve,
        htlc_minimum,
        minimum_depth,
        to_self_delay,
        max_accepted_htlcs,
        public_keys,
        upfront_shutdown_script,
    }
}

/// Builds a [`FundingCreated`] message.
pub fn funding_created(
    temporary_channel_id: [u8; 32],
    funding_txid: Txid,
    funding_output_index: u16,
    signature: Signature,
) -> FundingCreated {
    FundingCreated {
        temporary_channel_id,
        funding_txid,
        funding_output_index,
        signature,
    }
}

/// Builds a [`FundingSigned`] message.
pub fn funding_signed(channel_id: [u8; 32], signature: Signature) -> FundingSigned {
    FundingSigned {
        channel_id,
        signature,
    }
}

/// Builds a [`ChannelReady`] message.
pub fn channel_ready(
    channel_id: [u8; 32],
    second_per_commitment_point: PublicKey,
    short_channel_id: Option<ShortChannelId>,
) -> ChannelReady {
    ChannelReady {
        channel_id,
        second_per_commitment_point,
        short_channel_id,
    }
}

/// Builds a [`WarningMessage`].
pub fn warning(channel_id: [u8; 32], message: String) -> WarningMessage {
    WarningMessage {
        channel_id,
        message,
    }
}

/// Builds an [`ErrorMessage`].
pub fn error(channel_id: [u8; 32], message: String) -> ErrorMessage {
    ErrorMessage {
        channel_id,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_are_pure() {
        let first = funding_signed([3; 32], sig());
        let second = funding_signed([3; 32], sig());
        assert_eq!(first, second);
    }

    fn sig() -> Signature {
        use std::str::FromStr;
        Signature::from_str(
            "3045\
             0221\
             00f7c3648c390d87578cd79c8016940aa8e3511c4104cb78daa8fb8e429375efc1\
             0220\
             531d75c136272f127a5dc14acc0722301cbddc222262934151f140da345af177",
        )
        .unwrap()
    }
}
