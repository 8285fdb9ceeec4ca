//! The transition functions of the channel state machine, one per protocol
//! message. Each function validates its preconditions, builds the relevant
//! transactions, drives the external signer, mutates the channel record and
//! produces the outbound message. Persistence and registry bookkeeping are
//! the caller's responsibility and must happen after the mutation and before
//! the outbound message is released.

use std::ops::Deref;

use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;
use bitcoin::Sequence;
use lnc::builder::{InputKind, TxInputSpec};
use lnc::commitment::{
    build_commitment_transaction, CommitmentTransaction, CommitmentTransactionModel, HtlcInfo,
};
use lnc::funding::{build_funding_transaction, FundingTransactionModel};
use lnc::keys::CommitmentNumber;
use lnc::outputs::{FundingOutput, HtlcOutputInfo, OutputPosition};
use lnc_messages::{
    factory, AcceptChannel, ChannelReady, FundingCreated, FundingSigned, OpenChannel,
};
use secp256k1::rand::Rng;
use secp256k1::{All, PublicKey, Secp256k1};

use crate::channel::config::{ChannelConfig, ChannelPolicy};
use crate::channel::keys::ChannelKeySet;
use crate::channel::{Channel, ChannelState, PendingHtlc};
use crate::error::Error;
use crate::utils::{compute_channel_id, generate_alias_batch, get_new_temporary_id};
use crate::validation::{validate_accept_channel, validate_open_channel};
use crate::{ChannelSigner, ChannelSigningInfo, Wallet};

/// Creates the channel record and [`OpenChannel`] message initiating a new
/// channel with the given peer.
pub fn initiate_channel<S: Deref>(
    policy: &ChannelPolicy,
    counter_party: PublicKey,
    funding_amount: u64,
    push_amount_msat: u64,
    fee_rate_per_kw: u64,
    signer: &S,
) -> Result<(Channel, OpenChannel), Error>
where
    S::Target: ChannelSigner,
{
    if push_amount_msat > funding_amount * 1000 {
        return Err(Error::InvalidParameters(
            "Push amount exceeds funding amount".to_string(),
        ));
    }

    let temporary_channel_id = get_new_temporary_id();
    let public_keys = signer.generate_channel_keys(&temporary_channel_id)?;
    let own_keys = ChannelKeySet::from_public_keys(&public_keys);
    let config = ChannelConfig::from_own_policy(policy, funding_amount, fee_rate_per_kw);

    let channel = Channel {
        channel_id: temporary_channel_id,
        temporary_channel_id,
        counter_party,
        config: config.clone(),
        own_keys,
        counter_keys: None,
        commitment_number: None,
        funding_amount,
        funding_output: None,
        funding_transaction: None,
        own_balance_msat: funding_amount * 1000 - push_amount_msat,
        counter_balance_msat: push_amount_msat,
        own_next_htlc_id: 0,
        counter_next_htlc_id: 0,
        pending_htlcs: Vec::new(),
        last_sent_signature: None,
        last_received_signature: None,
        is_initiator: true,
        short_channel_id: None,
        own_aliases: Vec::new(),
        counter_alias: None,
        counter_next_per_commitment_point: None,
        state: ChannelState::Opening,
    };

    let message = factory::open_channel(
        policy.chain_hash,
        temporary_channel_id,
        funding_amount,
        push_amount_msat,
        config.local_dust_limit,
        config.max_htlc_value_in_flight,
        config.remote_channel_reserve,
        config.htlc_minimum,
        fee_rate_per_kw,
        config.remote_to_self_delay,
        config.max_accepted_htlcs,
        public_keys,
        0,
        config.local_upfront_shutdown_script.clone(),
        config.use_anchors,
        config.require_scid_alias,
    );

    Ok((channel, message))
}

/// Handles a received [`OpenChannel`] message on the responder side,
/// producing the temporary channel record and the [`AcceptChannel`] reply.
pub fn accept_channel_open<S: Deref>(
    open: &OpenChannel,
    counter_party: PublicKey,
    policy: &ChannelPolicy,
    signer: &S,
) -> Result<(Channel, AcceptChannel), Error>
where
    S::Target: ChannelSigner,
{
    validate_open_channel(open, policy)?;

    let public_keys = signer.generate_channel_keys(&open.temporary_channel_id)?;
    let own_keys = ChannelKeySet::from_public_keys(&public_keys);
    let counter_keys = ChannelKeySet::from_public_keys(&open.public_keys);
    let config = ChannelConfig::from_open_channel(open, policy);

    let commitment_number = CommitmentNumber::new(
        0,
        &counter_keys.payment_basepoint,
        &own_keys.payment_basepoint,
    );

    let channel = Channel {
        channel_id: open.temporary_channel_id,
        temporary_channel_id: open.temporary_channel_id,
        counter_party,
        config: config.clone(),
        own_keys,
        counter_keys: Some(counter_keys),
        commitment_number: Some(commitment_number),
        funding_amount: open.funding_amount,
        funding_output: None,
        funding_transaction: None,
        own_balance_msat: open.push_amount,
        counter_balance_msat: open.funding_amount * 1000 - open.push_amount,
        own_next_htlc_id: 0,
        counter_next_htlc_id: 0,
        pending_htlcs: Vec::new(),
        last_sent_signature: None,
        last_received_signature: None,
        is_initiator: false,
        short_channel_id: None,
        own_aliases: Vec::new(),
        counter_alias: None,
        counter_next_per_commitment_point: None,
        state: ChannelState::Opening,
    };

    let message = factory::accept_channel(
        open.temporary_channel_id,
        config.local_dust_limit,
        config.max_htlc_value_in_flight,
        config.remote_channel_reserve,
        config.htlc_minimum,
        config.minimum_depth,
        config.remote_to_self_delay,
        config.max_accepted_htlcs,
        channel.own_keys.public_keys(),
        config.local_upfront_shutdown_script.clone(),
    );

    Ok((channel, message))
}

/// Handles a received [`AcceptChannel`] message on the initiator side:
/// merges the responder's parameters, builds the funding transaction from the
/// previously reserved coins, registers the channel with the signer, signs
/// the responder's commitment transaction and produces the
/// [`FundingCreated`] message. The channel moves under its real,
/// funding-derived id.
pub fn fund_channel<S: Deref, W: Deref>(
    secp: &Secp256k1<All>,
    channel: &mut Channel,
    accept: &AcceptChannel,
    policy: &ChannelPolicy,
    signer: &S,
    wallet: &W,
) -> Result<FundingCreated, Error>
where
    S::Target: ChannelSigner,
    W::Target: Wallet,
{
    if channel.state != ChannelState::Opening || !channel.is_initiator {
        return Err(Error::unexpected_state(
            channel.channel_id,
            "AcceptChannel",
            &channel.state,
        ));
    }

    validate_accept_channel(accept, channel, policy)?;

    let counter_keys = ChannelKeySet::from_public_keys(&accept.public_keys);
    channel.config = channel.config.with_accept_channel(accept);
    channel.commitment_number = Some(CommitmentNumber::new(
        0,
        &channel.own_keys.payment_basepoint,
        &counter_keys.payment_basepoint,
    ));

    let funding_output = FundingOutput {
        amount: channel.funding_amount,
        local_funding_pubkey: channel.own_keys.funding_pubkey,
        remote_funding_pubkey: counter_keys.funding_pubkey,
        position: None,
    };
    channel.counter_keys = Some(counter_keys);

    let utxos = wallet.get_locked_utxos_for_channel(&channel.temporary_channel_id)?;
    let inputs = utxos
        .iter()
        .map(|utxo| TxInputSpec {
            outpoint: utxo.outpoint,
            value: utxo.tx_out.value,
            sequence: Sequence(0xffffffff),
            // TODO: support reserved coins that are not P2WPKH.
            kind: InputKind::SegwitPubkey,
            counterparty_signature: None,
        })
        .collect();
    let change_address = wallet.get_new_change_address()?;

    let funding_transaction = build_funding_transaction(FundingTransactionModel {
        funding_output,
        inputs,
        change_script_pubkey: change_address.script_pubkey(),
        fee_rate_per_kw: channel.config.fee_rate_per_kw,
        dust_limit: channel.config.local_dust_limit,
        lock_time: 0,
    })?;

    let funding_position = funding_transaction
        .funding_output
        .position
        .expect("position is recorded at finalization");
    let channel_id = compute_channel_id(
        &funding_transaction.txid,
        funding_position.vout as u16,
    );

    channel.funding_output = Some(funding_transaction.funding_output.clone());
    channel.funding_transaction = Some(funding_transaction.transaction);

    signer.register_channel(channel_id, signing_info(channel)?)?;

    let counter_commitment = build_counter_commitment(secp, channel)?;
    let signature = signer.sign_channel_transaction(&channel_id, &counter_commitment.transaction)?;

    channel.last_sent_signature = Some(signature);
    channel.channel_id = channel_id;
    channel.state = ChannelState::FundingCreated;

    Ok(factory::funding_created(
        channel.temporary_channel_id,
        funding_transaction.txid,
        funding_position.vout as u16,
        signature,
    ))
}

/// Handles a received [`FundingCreated`] message on the responder side:
/// learns the funding outpoint, registers the channel with the signer,
/// validates the initiator's signature against the locally rebuilt local
/// commitment transaction before anything is persisted, signs the
/// initiator's commitment transaction and produces the [`FundingSigned`]
/// reply.
pub fn verify_funding_created<S: Deref>(
    secp: &Secp256k1<All>,
    channel: &mut Channel,
    funding_created: &FundingCreated,
    signer: &S,
) -> Result<FundingSigned, Error>
where
    S::Target: ChannelSigner,
{
    if channel.state != ChannelState::Opening || channel.is_initiator {
        return Err(Error::unexpected_state(
            channel.channel_id,
            "FundingCreated",
            &channel.state,
        ));
    }

    let counter_funding_pubkey = channel
        .counter_keys
        .as_ref()
        .ok_or_else(|| Error::InvalidState("Missing counter party keys".to_string()))?
        .funding_pubkey;

    channel.funding_output = Some(FundingOutput {
        amount: channel.funding_amount,
        local_funding_pubkey: channel.own_keys.funding_pubkey,
        remote_funding_pubkey: counter_funding_pubkey,
        position: Some(OutputPosition {
            txid: funding_created.funding_txid,
            vout: funding_created.funding_output_index as u32,
        }),
    });

    let channel_id = compute_channel_id(
        &funding_created.funding_txid,
        funding_created.funding_output_index,
    );

    signer.register_channel(channel_id, signing_info(channel)?)?;

    let own_commitment = build_own_commitment(secp, channel)?;
    signer
        .validate_signature(
            &channel_id,
            &funding_created.signature,
            &own_commitment.transaction,
        )
        .map_err(|e| {
            Error::protocol(
                channel_id,
                "Invalid commitment transaction signature",
                format!("funding created signature validation failed: {}", e),
            )
        })?;

    let counter_commitment = build_counter_commitment(secp, channel)?;
    let signature = signer.sign_channel_transaction(&channel_id, &counter_commitment.transaction)?;

    channel.last_received_signature = Some(funding_created.signature);
    channel.last_sent_signature = Some(signature);
    channel.channel_id = channel_id;
    channel.state = ChannelState::FundingSigned;

    Ok(factory::funding_signed(channel_id, signature))
}

/// Handles a received [`FundingSigned`] message on the initiator side:
/// validates the responder's signature against the locally rebuilt local
/// commitment transaction and records it. Broadcasting the funding
/// transaction only happens after the updated channel was persisted.
pub fn verify_funding_signed<S: Deref>(
    secp: &Secp256k1<All>,
    channel: &mut Channel,
    funding_signed: &FundingSigned,
    signer: &S,
) -> Result<(), Error>
where
    S::Target: ChannelSigner,
{
    if channel.state != ChannelState::FundingCreated {
        return Err(Error::unexpected_state(
            channel.channel_id,
            "FundingSigned",
            &channel.state,
        ));
    }

    let own_commitment = build_own_commitment(secp, channel)?;
    signer
        .validate_signature(
            &channel.channel_id,
            &funding_signed.signature,
            &own_commitment.transaction,
        )
        .map_err(|e| {
            Error::protocol(
                channel.channel_id,
                "Invalid commitment transaction signature",
                format!("funding signed signature validation failed: {}", e),
            )
        })?;

    channel.last_received_signature = Some(funding_signed.signature);
    channel.state = ChannelState::FundingSigned;

    Ok(())
}

/// Handles the internal funding-confirmed event: advances the
/// per-commitment point, mints short channel id aliases when the channel
/// requires them, and produces the [`ChannelReady`] announcements, one per
/// alias.
pub fn confirm_funding<S: Deref, R: Rng>(
    channel: &mut Channel,
    chain_position: Option<(u32, u32)>,
    signer: &S,
    rng: &mut R,
) -> Result<Vec<ChannelReady>, Error>
where
    S::Target: ChannelSigner,
{
    match channel.state {
        ChannelState::FundingSigned | ChannelState::ReadyForThem => {}
        _ => {
            return Err(Error::InvalidState(format!(
                "Funding confirmed for channel in state {}",
                channel.state
            )))
        }
    }

    let next_point = signer.get_per_commitment_point(
        &channel.channel_id,
        channel.own_keys.per_commitment_index + 1,
    )?;
    channel.own_keys.advance(next_point);

    if let (Some((height, tx_index)), Some(funding)) = (chain_position, &channel.funding_output) {
        if let Some(position) = funding.position {
            channel.short_channel_id = Some(lnc_messages::ShortChannelId::new(
                height,
                tx_index,
                position.vout as u16,
            ));
        }
    }

    let messages = if channel.config.require_scid_alias {
        let aliases = generate_alias_batch(rng);
        channel.own_aliases = aliases.clone();
        aliases
            .into_iter()
            .map(|alias| {
                factory::channel_ready(
                    channel.channel_id,
                    channel.own_keys.per_commitment_point,
                    Some(alias),
                )
            })
            .collect()
    } else {
        vec![factory::channel_ready(
            channel.channel_id,
            channel.own_keys.per_commitment_point,
            channel.short_channel_id,
        )]
    };

    channel.state = match channel.state {
        ChannelState::FundingSigned => ChannelState::ReadyForUs,
        _ => ChannelState::Open,
    };

    Ok(messages)
}

/// Handles a received [`ChannelReady`] message. Stores the peer's second
/// per-commitment point the first time it is revealed and advances the state
/// towards `Open`; an already open alias-capable channel may rotate the
/// remembered remote alias on a coin flip.
pub fn apply_channel_ready<R: Rng>(
    channel: &mut Channel,
    channel_ready: &ChannelReady,
    rng: &mut R,
) -> Result<(), Error> {
    let requires_alias = channel.config.require_scid_alias;

    match channel.state {
        ChannelState::Open => {
            if requires_alias {
                let alias = channel_ready.short_channel_id.ok_or_else(|| {
                    Error::warning(
                        channel.channel_id,
                        "No ShortChannelIdTlv provided",
                        "channel ready without alias on alias channel".to_string(),
                    )
                })?;
                if rng.gen::<bool>() {
                    channel.counter_alias = Some(alias);
                }
                Ok(())
            } else {
                Err(Error::warning(
                    channel.channel_id,
                    "Channel is already open",
                    "duplicate channel ready".to_string(),
                ))
            }
        }
        ChannelState::FundingSigned | ChannelState::ReadyForUs => {
            if requires_alias && channel_ready.short_channel_id.is_none() {
                return Err(Error::warning(
                    channel.channel_id,
                    "No ShortChannelIdTlv provided",
                    "channel ready without alias on alias channel".to_string(),
                ));
            }
            if channel.counter_next_per_commitment_point.is_none() {
                channel.counter_next_per_commitment_point =
                    Some(channel_ready.second_per_commitment_point);
            }
            if channel_ready.short_channel_id.is_some() {
                channel.counter_alias = channel_ready.short_channel_id;
            }
            channel.state = match channel.state {
                ChannelState::FundingSigned => ChannelState::ReadyForThem,
                _ => ChannelState::Open,
            };
            Ok(())
        }
        ChannelState::ReadyForThem => {
            if requires_alias && channel_ready.short_channel_id.is_none() {
                return Err(Error::warning(
                    channel.channel_id,
                    "No ShortChannelIdTlv provided",
                    "channel ready without alias on alias channel".to_string(),
                ));
            }
            Err(Error::warning(
                channel.channel_id,
                "Channel ready already received",
                "duplicate channel ready".to_string(),
            ))
        }
        ChannelState::Opening | ChannelState::FundingCreated => Err(Error::unexpected_state(
            channel.channel_id,
            "ChannelReady",
            &channel.state,
        )),
    }
}

/// Registers an HTLC offered by the local party in the channel bookkeeping,
/// debiting the local balance. Returns the id assigned to the HTLC. The HTLC
/// appears on the next commitment round unless it is trimmed; trimming never
/// removes it from the bookkeeping.
pub fn offer_htlc(
    channel: &mut Channel,
    amount_msat: u64,
    cltv_expiry: u32,
    payment_hash: [u8; 32],
) -> Result<u64, Error> {
    if channel.state != ChannelState::Open {
        return Err(Error::InvalidState(format!(
            "Cannot offer an HTLC on a channel in state {}",
            channel.state
        )));
    }
    validate_htlc(channel, amount_msat)?;

    let reserve_msat = channel.config.local_channel_reserve * 1000;
    let available = channel.own_balance_msat.saturating_sub(reserve_msat);
    if amount_msat > available {
        return Err(Error::InvalidParameters(format!(
            "HTLC of {} msat exceeds available balance of {} msat",
            amount_msat, available
        )));
    }

    let id = channel.own_next_htlc_id;
    channel.own_balance_msat -= amount_msat;
    channel.own_next_htlc_id += 1;
    channel.pending_htlcs.push(PendingHtlc {
        id,
        offered: true,
        amount_msat,
        cltv_expiry,
        payment_hash,
    });

    Ok(id)
}

/// Registers an HTLC offered by the remote party, debiting the remote
/// balance. Returns the id assigned to the HTLC.
pub fn receive_htlc(
    channel: &mut Channel,
    amount_msat: u64,
    cltv_expiry: u32,
    payment_hash: [u8; 32],
) -> Result<u64, Error> {
    if channel.state != ChannelState::Open {
        return Err(Error::InvalidState(format!(
            "Cannot receive an HTLC on a channel in state {}",
            channel.state
        )));
    }
    validate_htlc(channel, amount_msat)?;

    let reserve_msat = channel.config.remote_channel_reserve * 1000;
    let available = channel.counter_balance_msat.saturating_sub(reserve_msat);
    if amount_msat > available {
        return Err(Error::InvalidParameters(format!(
            "HTLC of {} msat exceeds available balance of {} msat",
            amount_msat, available
        )));
    }

    let id = channel.counter_next_htlc_id;
    channel.counter_balance_msat -= amount_msat;
    channel.counter_next_htlc_id += 1;
    channel.pending_htlcs.push(PendingHtlc {
        id,
        offered: false,
        amount_msat,
        cltv_expiry,
        payment_hash,
    });

    Ok(id)
}

/// Settles a pending HTLC with its preimage, crediting the receiving side.
pub fn settle_htlc(
    channel: &mut Channel,
    id: u64,
    offered: bool,
    preimage: &[u8; 32],
) -> Result<(), Error> {
    let index = channel
        .pending_htlcs
        .iter()
        .position(|h| h.id == id && h.offered == offered)
        .ok_or_else(|| Error::InvalidParameters(format!("Unknown HTLC with id {}", id)))?;

    let payment_hash = Sha256::hash(preimage).to_byte_array();
    if payment_hash != channel.pending_htlcs[index].payment_hash {
        return Err(Error::InvalidParameters(
            "Preimage does not match the HTLC payment hash".to_string(),
        ));
    }

    let htlc = channel.pending_htlcs.remove(index);
    if htlc.offered {
        channel.counter_balance_msat += htlc.amount_msat;
    } else {
        channel.own_balance_msat += htlc.amount_msat;
    }
    Ok(())
}

/// Fails a pending HTLC, refunding the side that offered it.
pub fn fail_htlc(channel: &mut Channel, id: u64, offered: bool) -> Result<(), Error> {
    let index = channel
        .pending_htlcs
        .iter()
        .position(|h| h.id == id && h.offered == offered)
        .ok_or_else(|| Error::InvalidParameters(format!("Unknown HTLC with id {}", id)))?;

    let htlc = channel.pending_htlcs.remove(index);
    if htlc.offered {
        channel.own_balance_msat += htlc.amount_msat;
    } else {
        channel.counter_balance_msat += htlc.amount_msat;
    }
    Ok(())
}

fn validate_htlc(channel: &Channel, amount_msat: u64) -> Result<(), Error> {
    if amount_msat < channel.config.htlc_minimum {
        return Err(Error::InvalidParameters(format!(
            "HTLC of {} msat below the minimum of {} msat",
            amount_msat, channel.config.htlc_minimum
        )));
    }
    if channel.pending_htlcs.len() >= channel.config.max_accepted_htlcs as usize {
        return Err(Error::InvalidParameters(format!(
            "Channel already carries {} HTLCs",
            channel.pending_htlcs.len()
        )));
    }
    if channel.pending_htlc_value_msat() + amount_msat > channel.config.max_htlc_value_in_flight {
        return Err(Error::InvalidParameters(
            "HTLC exceeds the maximum in-flight value".to_string(),
        ));
    }
    Ok(())
}

/// Rebuilds the commitment transaction the local party can broadcast.
pub fn build_own_commitment(
    secp: &Secp256k1<All>,
    channel: &Channel,
) -> Result<CommitmentTransaction, Error> {
    build_commitment(secp, channel, true)
}

/// Builds the commitment transaction the counter party can broadcast.
pub fn build_counter_commitment(
    secp: &Secp256k1<All>,
    channel: &Channel,
) -> Result<CommitmentTransaction, Error> {
    build_commitment(secp, channel, false)
}

fn build_commitment(
    secp: &Secp256k1<All>,
    channel: &Channel,
    local: bool,
) -> Result<CommitmentTransaction, Error> {
    if !channel.balances_are_consistent() {
        return Err(Error::InvalidState(
            "Channel balances exceed funding amount".to_string(),
        ));
    }

    let counter_keys = channel
        .counter_keys
        .as_ref()
        .ok_or_else(|| Error::InvalidState("Missing counter party keys".to_string()))?;
    let commitment_number = channel
        .commitment_number
        .ok_or_else(|| Error::InvalidState("Missing commitment number".to_string()))?;
    let funding_output = channel
        .funding_output
        .clone()
        .ok_or_else(|| Error::InvalidState("Missing funding output".to_string()))?;

    let config = &channel.config;
    let (broadcaster, countersignatory) = if local {
        (&channel.own_keys, counter_keys)
    } else {
        (counter_keys, &channel.own_keys)
    };
    let (to_broadcaster_value, to_countersignatory_value) = if local {
        (
            channel.own_balance_msat / 1000,
            channel.counter_balance_msat / 1000,
        )
    } else {
        (
            channel.counter_balance_msat / 1000,
            channel.own_balance_msat / 1000,
        )
    };
    let (dust_limit, to_self_delay) = if local {
        (config.local_dust_limit, config.local_to_self_delay)
    } else {
        (config.remote_dust_limit, config.remote_to_self_delay)
    };
    let broadcaster_is_funder = if local {
        channel.is_initiator
    } else {
        !channel.is_initiator
    };

    let keys = broadcaster.commitment_keys(secp, countersignatory)?;
    let countersignatory_payment_key =
        broadcaster.countersignatory_payment_key(secp, countersignatory)?;

    let htlcs = channel
        .pending_htlcs
        .iter()
        .map(|h| HtlcInfo {
            offered: if local { h.offered } else { !h.offered },
            htlc: HtlcOutputInfo {
                amount_msat: h.amount_msat,
                cltv_expiry: h.cltv_expiry,
                payment_hash: h.payment_hash,
            },
        })
        .collect();

    Ok(build_commitment_transaction(CommitmentTransactionModel {
        commitment_number,
        fee_rate_per_kw: config.fee_rate_per_kw,
        funding_output,
        keys,
        countersignatory_payment_key,
        broadcaster_funding_pubkey: broadcaster.funding_pubkey,
        countersignatory_funding_pubkey: countersignatory.funding_pubkey,
        to_broadcaster_value,
        to_countersignatory_value,
        broadcaster_is_funder,
        to_self_delay,
        dust_limit,
        anchors: config.use_anchors,
        htlcs,
    })?)
}

/// The signing information registered with the external signer for a
/// channel.
pub(crate) fn signing_info(channel: &Channel) -> Result<ChannelSigningInfo, Error> {
    let funding_output = channel
        .funding_output
        .as_ref()
        .ok_or_else(|| Error::InvalidState("Missing funding output".to_string()))?;
    let counter_keys = channel
        .counter_keys
        .as_ref()
        .ok_or_else(|| Error::InvalidState("Missing counter party keys".to_string()))?;
    Ok(ChannelSigningInfo {
        temporary_channel_id: channel.temporary_channel_id,
        funding_script: funding_output.witness_script(),
        funding_value: funding_output.amount,
        own_funding_pubkey: channel.own_keys.funding_pubkey,
        counterparty_funding_pubkey: counter_keys.funding_pubkey,
    })
}
