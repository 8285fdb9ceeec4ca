//! Construction of the per-party commitment transaction of a channel: fee and
//! anchor accounting against the funder's balance, trimming of uneconomical
//! outputs, deterministic output ordering and recording of output positions
//! for later spend path construction.

use bitcoin::{Transaction, Txid};
use secp256k1::PublicKey;

use crate::builder::{InputKind, TransactionBuilder, TxInputSpec};
use crate::keys::{CommitmentKeys, CommitmentNumber};
use crate::outputs::{
    sort_commitment_outputs, CommitmentOutput, FundingOutput, HtlcCommitmentOutput,
    HtlcOutputInfo, OutputPosition,
};
use crate::util::weight_to_fee;
use crate::{
    commitment_tx_base_weight, htlc_success_tx_weight, htlc_timeout_tx_weight, Error,
    ANCHOR_OUTPUT_VALUE, COMMITMENT_TX_WEIGHT_PER_HTLC,
};

/// An HTLC candidate for inclusion in a commitment transaction. The direction
/// is relative to the broadcaster of the transaction being built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcInfo {
    /// Whether the HTLC is offered by the broadcaster.
    pub offered: bool,
    /// The HTLC amount, expiry and payment hash.
    pub htlc: HtlcOutputInfo,
}

/// The per-round input to the commitment transaction builder. Built from the
/// channel state at the start of a commitment round, consumed once, and
/// discarded; a new model is assembled for every round.
#[derive(Clone)]
pub struct CommitmentTransactionModel {
    /// The commitment number of this round.
    pub commitment_number: CommitmentNumber,
    /// The fee rate snapshot for this round, in satoshi per kiloweight.
    pub fee_rate_per_kw: u64,
    /// The funding output being spent. Its position must be known.
    pub funding_output: FundingOutput,
    /// The key set derived for the broadcaster of this version.
    pub keys: CommitmentKeys,
    /// The counter signatory's payment key for the `to_remote` output.
    pub countersignatory_payment_key: PublicKey,
    /// The funding public key of the broadcaster, binding its anchor.
    pub broadcaster_funding_pubkey: PublicKey,
    /// The funding public key of the counter signatory, binding its anchor.
    pub countersignatory_funding_pubkey: PublicKey,
    /// The broadcaster's balance before fees, in satoshi.
    pub to_broadcaster_value: u64,
    /// The counter signatory's balance, in satoshi.
    pub to_countersignatory_value: u64,
    /// Whether the broadcaster funded the channel and thus pays the fee.
    pub broadcaster_is_funder: bool,
    /// The contest delay restricting the broadcaster's balance output.
    pub to_self_delay: u16,
    /// The dust limit under which outputs are trimmed.
    pub dust_limit: u64,
    /// Whether anchor outputs are in use on the channel.
    pub anchors: bool,
    /// The HTLCs to consider for this round.
    pub htlcs: Vec<HtlcInfo>,
}

/// A built commitment transaction, with its surviving outputs and their
/// positions recorded.
pub struct CommitmentTransaction {
    /// The unsigned transaction.
    pub transaction: Transaction,
    /// The transaction id, fixed at finalization.
    pub txid: Txid,
    /// The outputs of the transaction in output order, positions filled.
    pub outputs: Vec<CommitmentOutput>,
    /// The HTLCs trimmed from this round, in model order. They remain pending
    /// at the channel layer; only their outputs are omitted.
    pub trimmed_htlcs: Vec<HtlcInfo>,
    /// The fee paid by the transaction, including any trimmed amounts.
    pub fee: u64,
    to_broadcaster_value: u64,
    to_countersignatory_value: u64,
}

impl CommitmentTransaction {
    /// The broadcaster's balance after fees, zero if its output was trimmed.
    pub fn to_broadcaster_value(&self) -> u64 {
        self.to_broadcaster_value
    }

    /// The counter signatory's balance, zero if its output was trimmed.
    pub fn to_countersignatory_value(&self) -> u64 {
        self.to_countersignatory_value
    }

    /// The positions of the HTLC outputs included in the transaction, in
    /// output order.
    pub fn htlc_output_positions(&self) -> Vec<(HtlcOutputInfo, OutputPosition)> {
        let mut res = Vec::new();
        for (idx, output) in self.outputs.iter().enumerate() {
            if let CommitmentOutput::OfferedHtlc(h) | CommitmentOutput::ReceivedHtlc(h) = output {
                res.push((
                    h.htlc.clone(),
                    OutputPosition {
                        txid: self.txid,
                        vout: idx as u32,
                    },
                ));
            }
        }
        res
    }
}

/// The fee of the second-stage transaction required to claim an HTLC of the
/// given direction.
pub fn htlc_second_stage_fee(offered: bool, anchors: bool, fee_rate_per_kw: u64) -> u64 {
    let weight = if offered {
        htlc_timeout_tx_weight(anchors)
    } else {
        htlc_success_tx_weight(anchors)
    };
    weight_to_fee(weight, fee_rate_per_kw)
}

/// Returns whether an HTLC output would be uneconomical on a commitment
/// transaction: its amount minus the second-stage fee falls under the dust
/// limit.
pub fn is_htlc_trimmed(htlc: &HtlcInfo, dust_limit: u64, anchors: bool, fee_rate_per_kw: u64) -> bool {
    let fee = htlc_second_stage_fee(htlc.offered, anchors, fee_rate_per_kw);
    htlc.htlc.amount_sat() < dust_limit + fee
}

/// The fee of a commitment transaction carrying the given number of untrimmed
/// HTLC outputs.
pub fn commit_tx_fee(fee_rate_per_kw: u64, num_untrimmed_htlcs: usize, anchors: bool) -> u64 {
    weight_to_fee(
        commitment_tx_base_weight(anchors) + num_untrimmed_htlcs * COMMITMENT_TX_WEIGHT_PER_HTLC,
        fee_rate_per_kw,
    )
}

/// Builds the commitment transaction for the broadcaster described by the
/// model. The same function is invoked twice per commitment round with the
/// roles swapped, once for each party's asymmetric version.
pub fn build_commitment_transaction(
    model: CommitmentTransactionModel,
) -> Result<CommitmentTransaction, Error> {
    let funding_position = model.funding_output.position.ok_or(Error::InvalidArgument)?;

    // Partition HTLCs before fee computation, the base fee depends on the
    // number of surviving outputs.
    let mut untrimmed = Vec::new();
    let mut trimmed_htlcs = Vec::new();
    for htlc in model.htlcs {
        if is_htlc_trimmed(&htlc, model.dust_limit, model.anchors, model.fee_rate_per_kw) {
            trimmed_htlcs.push(htlc);
        } else {
            untrimmed.push(htlc);
        }
    }

    let base_fee = commit_tx_fee(model.fee_rate_per_kw, untrimmed.len(), model.anchors);

    // The fee only ever comes out of the funder's balance.
    let (mut to_broadcaster, mut to_countersignatory) = if model.broadcaster_is_funder {
        (
            model.to_broadcaster_value.saturating_sub(base_fee),
            model.to_countersignatory_value,
        )
    } else {
        (
            model.to_broadcaster_value,
            model.to_countersignatory_value.saturating_sub(base_fee),
        )
    };

    if model.anchors {
        let funder_value = if model.broadcaster_is_funder {
            &mut to_broadcaster
        } else {
            &mut to_countersignatory
        };
        if *funder_value > 0 {
            *funder_value = funder_value.saturating_sub(2 * ANCHOR_OUTPUT_VALUE);
        }
    }

    // Below the dust limit a balance reads as zero and its output is omitted.
    if to_broadcaster < model.dust_limit {
        to_broadcaster = 0;
    }
    if to_countersignatory < model.dust_limit {
        to_countersignatory = 0;
    }

    let mut outputs: Vec<CommitmentOutput> = Vec::new();

    if to_countersignatory > 0 {
        outputs.push(CommitmentOutput::ToRemote {
            amount: to_countersignatory,
            payment_key: model.countersignatory_payment_key,
            anchors: model.anchors,
        });
    }

    if to_broadcaster > 0 {
        outputs.push(CommitmentOutput::ToLocal {
            amount: to_broadcaster,
            revocation_key: model.keys.revocation_key,
            delayed_payment_key: model.keys.broadcaster_delayed_payment_key,
            to_self_delay: model.to_self_delay,
        });
    }

    // Anchors have nothing to bump on a transaction with no balance output
    // and no HTLC output.
    if model.anchors
        && (to_broadcaster > 0 || to_countersignatory > 0 || !untrimmed.is_empty())
    {
        outputs.push(CommitmentOutput::Anchor {
            funding_pubkey: model.broadcaster_funding_pubkey,
        });
        outputs.push(CommitmentOutput::Anchor {
            funding_pubkey: model.countersignatory_funding_pubkey,
        });
    }

    for htlc in &untrimmed {
        let htlc_output = HtlcCommitmentOutput {
            htlc: htlc.htlc.clone(),
            broadcaster_htlc_key: model.keys.broadcaster_htlc_key,
            countersignatory_htlc_key: model.keys.countersignatory_htlc_key,
            revocation_key: model.keys.revocation_key,
            anchors: model.anchors,
        };
        outputs.push(if htlc.offered {
            CommitmentOutput::OfferedHtlc(htlc_output)
        } else {
            CommitmentOutput::ReceivedHtlc(htlc_output)
        });
    }

    sort_commitment_outputs(&mut outputs);

    let mut builder = TransactionBuilder::new(model.commitment_number.lock_time());
    builder.add_input(TxInputSpec {
        outpoint: funding_position.outpoint(),
        value: model.funding_output.amount,
        sequence: model.commitment_number.sequence(),
        kind: InputKind::SegwitMultisig {
            witness_script: model.funding_output.witness_script(),
        },
        counterparty_signature: None,
    })?;
    for output in &outputs {
        builder.add_output(output.to_tx_out())?;
    }

    // Everything not paid to an output, including trimmed amounts, is fee.
    let total_output_value = builder.total_output_value();
    let fee = model
        .funding_output
        .amount
        .checked_sub(total_output_value)
        .ok_or(Error::InsufficientInputAmount)?;

    let transaction = builder.finalize(fee)?.clone();
    let txid = transaction.txid();

    Ok(CommitmentTransaction {
        transaction,
        txid,
        outputs,
        trimmed_htlcs,
        fee,
        to_broadcaster_value: to_broadcaster,
        to_countersignatory_value: to_countersignatory,
    })
}
