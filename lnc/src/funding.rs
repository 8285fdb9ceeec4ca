//! Construction of the 2-of-2 funding transaction of a channel from a set of
//! previously reserved unspent outputs, with an optional change output.

use bitcoin::{ScriptBuf, Transaction, TxOut, Txid};

use crate::builder::{TransactionBuilder, TxInputSpec};
use crate::outputs::{FundingOutput, OutputPosition};
use crate::util::{compute_var_int_prefix_size, get_output_for_script_pubkey, weight_to_fee};
use crate::Error;

/// Weight of the funding output: value (8) + script length (1) + P2WSH script
/// pubkey (34), all non-witness.
const FUNDING_OUTPUT_WEIGHT: usize = 172;

/// The input to the funding transaction builder.
pub struct FundingTransactionModel {
    /// The funding output to create. Its position must not be known yet.
    pub funding_output: FundingOutput,
    /// The reserved coins consumed by the transaction.
    pub inputs: Vec<TxInputSpec>,
    /// The script to pay any change to.
    pub change_script_pubkey: ScriptBuf,
    /// The fee rate to apply, in satoshi per kiloweight.
    pub fee_rate_per_kw: u64,
    /// The dust limit under which a change output may not be created.
    pub dust_limit: u64,
    /// The lock time of the transaction.
    pub lock_time: u32,
}

/// A built funding transaction.
pub struct FundingTransaction {
    /// The unsigned transaction.
    pub transaction: Transaction,
    /// The transaction id, fixed at finalization.
    pub txid: Txid,
    /// The funding output with its position recorded.
    pub funding_output: FundingOutput,
    /// The value of the change output, if one was emitted.
    pub change_value: u64,
    /// The fee paid by the transaction.
    pub fee: u64,
}

/// Builds the funding transaction described by the model. The caller is
/// responsible for having selected and reserved inputs carrying enough value
/// for the channel capacity plus fees: a projected change below the dust
/// limit is an input selection error, it is never silently absorbed into the
/// funding output.
pub fn build_funding_transaction(
    model: FundingTransactionModel,
) -> Result<FundingTransaction, Error> {
    if model.funding_output.position.is_some() {
        return Err(Error::AlreadyFinalized);
    }
    if model.inputs.is_empty() {
        return Err(Error::InvalidArgument);
    }

    let mut builder = TransactionBuilder::new(bitcoin::absolute::LockTime::from_consensus(
        model.lock_time,
    ));

    let mut input_value: u64 = 0;
    let mut inputs_weight: usize = 0;
    for input in model.inputs {
        input_value += input.value;
        inputs_weight += input.kind.input_weight();
        builder.add_input(input)?;
    }

    let change_spk_len = model.change_script_pubkey.len();
    let change_weight = (8 + compute_var_int_prefix_size(change_spk_len) + change_spk_len) * 4;
    let total_weight =
        crate::TX_BASE_WEIGHT + inputs_weight + FUNDING_OUTPUT_WEIGHT + change_weight;
    let fee = weight_to_fee(total_weight, model.fee_rate_per_kw);

    let required = model
        .funding_output
        .amount
        .checked_add(fee)
        .ok_or(Error::InvalidArgument)?;
    if input_value < required {
        return Err(Error::InsufficientInputAmount);
    }
    let change_value = input_value - required;
    if change_value < model.dust_limit {
        return Err(Error::InvalidArgument);
    }

    let funding_script_pubkey = model.funding_output.script_pubkey();
    builder.add_output(TxOut {
        value: model.funding_output.amount,
        script_pubkey: funding_script_pubkey.clone(),
    })?;
    builder.add_output(TxOut {
        value: change_value,
        script_pubkey: model.change_script_pubkey,
    })?;

    let transaction = builder.finalize(fee)?.clone();
    let txid = transaction.txid();
    let (funding_vout, _) = get_output_for_script_pubkey(&transaction, &funding_script_pubkey)
        .expect("the funding output was just added");

    let mut funding_output = model.funding_output;
    funding_output.position = Some(OutputPosition {
        txid,
        vout: funding_vout as u32,
    });

    Ok(FundingTransaction {
        transaction,
        txid,
        funding_output,
        change_value,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::InputKind;
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, Sequence};
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn p2wpkh_input(value: u64, vout: u32) -> TxInputSpec {
        TxInputSpec {
            outpoint: OutPoint {
                txid: bitcoin::Txid::all_zeros(),
                vout,
            },
            value,
            sequence: Sequence(0xffffffff),
            kind: InputKind::SegwitPubkey,
            counterparty_signature: None,
        }
    }

    fn test_model(input_values: &[u64], capacity: u64) -> FundingTransactionModel {
        FundingTransactionModel {
            funding_output: FundingOutput {
                amount: capacity,
                local_funding_pubkey: pk(1),
                remote_funding_pubkey: pk(2),
                position: None,
            },
            inputs: input_values
                .iter()
                .enumerate()
                .map(|(i, v)| p2wpkh_input(*v, i as u32))
                .collect(),
            change_script_pubkey: crate::outputs::p2wpkh_script_pubkey(&pk(3)),
            fee_rate_per_kw: 2500,
            dust_limit: 354,
            lock_time: 0,
        }
    }

    #[test]
    fn creates_funding_and_change_outputs() {
        let built = build_funding_transaction(test_model(&[1_500_000], 1_000_000)).unwrap();

        assert_eq!(built.transaction.output.len(), 2);
        let funding_vout = built.funding_output.position.unwrap().vout as usize;
        assert_eq!(built.transaction.output[funding_vout].value, 1_000_000);
        assert_eq!(built.change_value, 500_000 - built.fee);
        let total_out: u64 = built.transaction.output.iter().map(|o| o.value).sum();
        assert_eq!(total_out + built.fee, 1_500_000);
    }

    #[test]
    fn funding_output_script_is_2_of_2() {
        let built = build_funding_transaction(test_model(&[1_500_000], 1_000_000)).unwrap();
        let expected = crate::scripts::make_funding_redeemscript(&pk(1), &pk(2)).to_v0_p2wsh();
        let vout = built.funding_output.position.unwrap().vout as usize;
        assert_eq!(built.transaction.output[vout].script_pubkey, expected);
    }

    #[test]
    fn insufficient_inputs_are_rejected() {
        let res = build_funding_transaction(test_model(&[1_000_000], 1_000_000));
        assert_eq!(res.err(), Some(Error::InsufficientInputAmount));
    }

    #[test]
    fn change_below_dust_is_an_input_selection_error() {
        // Inputs cover capacity and fee but leave less than the dust limit.
        let probe = build_funding_transaction(test_model(&[1_500_000], 1_000_000)).unwrap();
        let res = build_funding_transaction(test_model(&[1_000_000 + probe.fee + 100], 1_000_000));
        assert_eq!(res.err(), Some(Error::InvalidArgument));
    }

    #[test]
    fn multiple_inputs_are_consumed() {
        let built =
            build_funding_transaction(test_model(&[600_000, 600_000, 600_000], 1_500_000)).unwrap();
        assert_eq!(built.transaction.input.len(), 3);
    }

    #[test]
    fn no_inputs_is_an_error() {
        let res = build_funding_transaction(test_model(&[], 1_000_000));
        assert_eq!(res.err(), Some(Error::InvalidArgument));
    }
}
