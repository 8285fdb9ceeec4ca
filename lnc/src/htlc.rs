//! Construction of the second-stage transactions claiming HTLC outputs of a
//! commitment transaction: HTLC-timeout for offered HTLCs and HTLC-success
//! for received ones.

use bitcoin::absolute::LockTime;
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use crate::commitment::htlc_second_stage_fee;
use crate::outputs::{HtlcOutputInfo, OutputPosition};
use crate::scripts::get_revokeable_redeemscript;
use crate::util::finalize_sig;
use crate::{Error, TX_VERSION};

/// Builds the unsigned HTLC-timeout or HTLC-success transaction spending the
/// commitment output recorded at `position`. `offered` is relative to the
/// broadcaster of the commitment transaction, which is also the broadcaster
/// of this transaction.
pub fn build_htlc_transaction(
    position: &OutputPosition,
    htlc: &HtlcOutputInfo,
    offered: bool,
    fee_rate_per_kw: u64,
    contest_delay: u16,
    revocation_key: &PublicKey,
    broadcaster_delayed_payment_key: &PublicKey,
    anchors: bool,
) -> Result<Transaction, Error> {
    let fee = htlc_second_stage_fee(offered, anchors, fee_rate_per_kw);
    let output_value = htlc
        .amount_sat()
        .checked_sub(fee)
        .ok_or(Error::InsufficientInputAmount)?;

    let lock_time = if offered { htlc.cltv_expiry } else { 0 };

    Ok(Transaction {
        version: TX_VERSION,
        lock_time: LockTime::from_consensus(lock_time),
        input: vec![TxIn {
            previous_output: position.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence(if anchors { 1 } else { 0 }),
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: output_value,
            script_pubkey: get_revokeable_redeemscript(
                revocation_key,
                contest_delay,
                broadcaster_delayed_payment_key,
            )
            .to_v0_p2wsh(),
        }],
    })
}

/// Builds the witness satisfying an HTLC output spent by a second-stage
/// transaction: both HTLC signatures, the preimage for the success path (an
/// empty element for the timeout path), and the witness script.
pub fn build_htlc_input_witness(
    local_sig: &Signature,
    remote_sig: &Signature,
    preimage: Option<&[u8; 32]>,
    witness_script: &Script,
    anchors: bool,
) -> Witness {
    let remote_sighash_type = if anchors {
        EcdsaSighashType::SinglePlusAnyoneCanPay
    } else {
        EcdsaSighashType::All
    };

    let mut witness = Witness::new();
    // The extra multisig stack item must be empty per BIP147 (NULLDUMMY).
    witness.push(Vec::new());
    witness.push(finalize_sig(remote_sig, remote_sighash_type));
    witness.push(finalize_sig(local_sig, EcdsaSighashType::All));
    match preimage {
        Some(preimage) => witness.push(preimage.to_vec()),
        // An empty element selects the timeout path per BIP146 (MINIMALIF).
        None => witness.push(Vec::new()),
    }
    witness.push(witness_script.to_bytes());
    witness
}

/// Builds the witness spending an anchor output with the funding key it is
/// bound to.
pub fn build_anchor_input_witness(funding_sig: &Signature, witness_script: &Script) -> Witness {
    let mut witness = Witness::new();
    witness.push(finalize_sig(funding_sig, EcdsaSighashType::All));
    witness.push(witness_script.to_bytes());
    witness
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::Txid;
    use secp256k1::{Secp256k1, SecretKey};

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn position() -> OutputPosition {
        OutputPosition {
            txid: Txid::all_zeros(),
            vout: 2,
        }
    }

    fn htlc() -> HtlcOutputInfo {
        HtlcOutputInfo {
            amount_msat: 50_000_000,
            cltv_expiry: 505_000,
            payment_hash: [9; 32],
        }
    }

    #[test]
    fn timeout_transaction_is_cltv_locked() {
        let tx = build_htlc_transaction(&position(), &htlc(), true, 2500, 144, &pk(1), &pk(2), false)
            .unwrap();

        assert_eq!(tx.lock_time.to_consensus_u32(), 505_000);
        assert_eq!(tx.input[0].sequence, Sequence(0));
        assert_eq!(
            tx.output[0].value,
            50_000 - htlc_second_stage_fee(true, false, 2500)
        );
    }

    #[test]
    fn success_transaction_has_no_lock_time() {
        let tx = build_htlc_transaction(&position(), &htlc(), false, 2500, 144, &pk(1), &pk(2), true)
            .unwrap();

        assert_eq!(tx.lock_time.to_consensus_u32(), 0);
        assert_eq!(tx.input[0].sequence, Sequence(1));
        assert_eq!(
            tx.output[0].value,
            50_000 - htlc_second_stage_fee(false, true, 2500)
        );
    }

    #[test]
    fn htlc_witness_carries_preimage_on_success_path() {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[5; 32]).unwrap();
        let msg = secp256k1::Message::from_slice(&[6; 32]).unwrap();
        let sig = secp.sign_ecdsa(&msg, &sk);
        let script = get_revokeable_redeemscript(&pk(1), 144, &pk(2));

        let success = build_htlc_input_witness(&sig, &sig, Some(&[7; 32]), &script, false);
        let success_items: Vec<_> = success.iter().collect();
        assert_eq!(success_items.len(), 5);
        assert!(success_items[0].is_empty());
        assert_eq!(success_items[3], &[7; 32]);
        assert_eq!(success_items[4], script.as_bytes());

        let timeout = build_htlc_input_witness(&sig, &sig, None, &script, false);
        let timeout_items: Vec<_> = timeout.iter().collect();
        assert_eq!(timeout_items.len(), 5);
        assert!(timeout_items[3].is_empty());
    }

    #[test]
    fn remote_htlc_signature_uses_single_anyone_can_pay_with_anchors() {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[5; 32]).unwrap();
        let msg = secp256k1::Message::from_slice(&[6; 32]).unwrap();
        let sig = secp.sign_ecdsa(&msg, &sk);
        let script = get_revokeable_redeemscript(&pk(1), 144, &pk(2));

        let witness = build_htlc_input_witness(&sig, &sig, None, &script, true);
        let items: Vec<_> = witness.iter().collect();
        assert_eq!(
            *items[1].last().unwrap(),
            EcdsaSighashType::SinglePlusAnyoneCanPay.to_u32() as u8
        );
        assert_eq!(*items[2].last().unwrap(), EcdsaSighashType::All.to_u32() as u8);
    }

    #[test]
    fn amount_below_fee_is_rejected() {
        let small = HtlcOutputInfo {
            amount_msat: 1_000,
            cltv_expiry: 505_000,
            payment_hash: [9; 32],
        };
        let res = build_htlc_transaction(&position(), &small, true, 2500, 144, &pk(1), &pk(2), false);
        assert_eq!(res.err(), Some(Error::InsufficientInputAmount));
    }
}
