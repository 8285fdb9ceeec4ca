//! Utility functions not uniquely related to channels

use bitcoin::hash_types::PubkeyHash;
use bitcoin::hashes::Hash;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Script, ScriptBuf, Transaction, TxOut, Witness};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey, Signing};

use crate::Error;

/// Get a BIP143 (https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki)
/// signature hash with sighash all flag for a segwit transaction input as
/// a Message instance
pub fn get_sig_hash_msg(
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &Script,
    value: u64,
) -> Result<Message, Error> {
    let sig_hash = SighashCache::new(tx).segwit_signature_hash(
        input_index,
        script_pubkey,
        value,
        EcdsaSighashType::All,
    )?;
    Ok(Message::from_slice(&sig_hash.to_byte_array()).expect("a 32 byte digest"))
}

/// Convert a raw signature to DER encoded and append the sighash type, to use
/// a signature in a witness or signature script
pub(crate) fn finalize_sig(sig: &Signature, sig_hash_type: EcdsaSighashType) -> Vec<u8> {
    [
        sig.serialize_der().as_ref(),
        &[sig_hash_type.to_u32() as u8],
    ]
    .concat()
}

/// Generate a signature for a given transaction input using the given secret key.
pub fn get_raw_sig_for_tx_input<C: Signing>(
    secp: &Secp256k1<C>,
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &Script,
    value: u64,
    sk: &SecretKey,
) -> Result<Signature, Error> {
    let sig_hash_msg = get_sig_hash_msg(tx, input_index, script_pubkey, value)?;
    Ok(secp.sign_ecdsa_low_r(&sig_hash_msg, sk))
}

/// Returns a DER encoded signature with appended sighash for the specified input
/// in the provided transaction (assumes a segwit input)
pub fn get_sig_for_tx_input<C: Signing>(
    secp: &Secp256k1<C>,
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &Script,
    value: u64,
    sig_hash_type: EcdsaSighashType,
    sk: &SecretKey,
) -> Result<Vec<u8>, Error> {
    let sig = get_raw_sig_for_tx_input(secp, tx, input_index, script_pubkey, value, sk)?;
    Ok(finalize_sig(&sig, sig_hash_type))
}

/// Verify a signature for a given segwit transaction input.
pub fn verify_tx_input_sig<C: secp256k1::Verification>(
    secp: &Secp256k1<C>,
    signature: &Signature,
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &Script,
    value: u64,
    pk: &PublicKey,
) -> Result<(), Error> {
    let sig_hash_msg = get_sig_hash_msg(tx, input_index, script_pubkey, value)?;
    secp.verify_ecdsa(&sig_hash_msg, signature, pk)?;
    Ok(())
}

/// Create a signature for a p2wpkh transaction input using the provided secret
/// key and place the signature and associated public key on the witness stack.
pub fn sign_p2wpkh_input<C: Signing>(
    secp: &Secp256k1<C>,
    sk: &SecretKey,
    tx: &mut Transaction,
    input_index: usize,
    sig_hash_type: EcdsaSighashType,
    value: u64,
) -> Result<(), Error> {
    tx.input[input_index].witness =
        get_witness_for_p2wpkh_input(secp, sk, tx, input_index, sig_hash_type, value)?;
    Ok(())
}

/// Generates the witness data for a P2WPKH input using the provided secret key.
pub fn get_witness_for_p2wpkh_input<C: Signing>(
    secp: &Secp256k1<C>,
    sk: &SecretKey,
    tx: &Transaction,
    input_index: usize,
    sig_hash_type: EcdsaSighashType,
    value: u64,
) -> Result<Witness, Error> {
    let script_pubkey = get_pkh_script_pubkey_from_sk(secp, sk);
    let full_sig = get_sig_for_tx_input(
        secp,
        tx,
        input_index,
        &script_pubkey,
        value,
        sig_hash_type,
        sk,
    )?;
    Ok(Witness::from_slice(&[
        full_sig,
        PublicKey::from_secret_key(secp, sk).serialize().to_vec(),
    ]))
}

fn get_pkh_script_pubkey_from_sk<C: Signing>(secp: &Secp256k1<C>, sk: &SecretKey) -> ScriptBuf {
    let pk = PublicKey::from_secret_key(secp, sk);
    let pkh = PubkeyHash::hash(&pk.serialize());
    ScriptBuf::new_p2pkh(&pkh)
}

/// Builds the witness for a 2-of-2 multisig witness input from two finalized
/// signatures, ordering the signatures based on the ordering of the associated
/// public keys.
pub fn build_multisig_witness(
    first_sig: &[u8],
    first_pk: &PublicKey,
    second_sig: &[u8],
    second_pk: &PublicKey,
    script_pubkey: &Script,
) -> Witness {
    // Due to BIP147 (NULLDUMMY) the extra multisig stack item must be empty.
    if first_pk < second_pk {
        Witness::from_slice(&[
            Vec::new(),
            first_sig.to_vec(),
            second_sig.to_vec(),
            script_pubkey.to_bytes(),
        ])
    } else {
        Witness::from_slice(&[
            Vec::new(),
            second_sig.to_vec(),
            first_sig.to_vec(),
            script_pubkey.to_bytes(),
        ])
    }
}

/// Generates a signature for a given p2wsh transaction input using the given
/// secret key and info, and places the generated and provided signatures on the
/// input's witness stack, ordering the signatures based on the ordering of the
/// associated public keys.
pub fn sign_multi_sig_input<C: Signing>(
    secp: &Secp256k1<C>,
    transaction: &mut Transaction,
    other_sig: &Signature,
    other_pk: &PublicKey,
    sk: &SecretKey,
    script_pubkey: &Script,
    input_value: u64,
    input_index: usize,
) -> Result<(), Error> {
    let own_sig = get_sig_for_tx_input(
        secp,
        transaction,
        input_index,
        script_pubkey,
        input_value,
        EcdsaSighashType::All,
        sk,
    )?;

    let own_pk = PublicKey::from_secret_key(secp, sk);
    let other_finalized_sig = finalize_sig(other_sig, EcdsaSighashType::All);

    transaction.input[input_index].witness = build_multisig_witness(
        &own_sig,
        &own_pk,
        &other_finalized_sig,
        other_pk,
        script_pubkey,
    );

    Ok(())
}

/// Computes the fee for the given weight at the given fee rate, rounding up.
pub fn weight_to_fee(weight: usize, fee_rate_per_kw: u64) -> u64 {
    (weight as u64 * fee_rate_per_kw + 999) / 1000
}

/// Get the vout and TxOut of the first output with a matching `script_pubkey`
/// if any.
pub fn get_output_for_script_pubkey<'a>(
    tx: &'a Transaction,
    script_pubkey: &Script,
) -> Option<(usize, &'a TxOut)> {
    tx.output
        .iter()
        .enumerate()
        .find(|(_, x)| x.script_pubkey == *script_pubkey)
}

pub(crate) fn compute_var_int_prefix_size(len: usize) -> usize {
    bitcoin::VarInt(len as u64).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_to_fee_rounds_up() {
        assert_eq!(weight_to_fee(724, 1000), 724);
        assert_eq!(weight_to_fee(724, 253), 184);
        assert_eq!(weight_to_fee(1, 1), 1);
        assert_eq!(weight_to_fee(0, 1000), 0);
    }

    #[test]
    fn multisig_witness_orders_by_pubkey() {
        let secp = Secp256k1::new();
        let sk1 = SecretKey::from_slice(&[1u8; 32]).unwrap();
        let sk2 = SecretKey::from_slice(&[2u8; 32]).unwrap();
        let pk1 = PublicKey::from_secret_key(&secp, &sk1);
        let pk2 = PublicKey::from_secret_key(&secp, &sk2);
        let script = ScriptBuf::new();

        let witness = build_multisig_witness(&[1u8], &pk1, &[2u8], &pk2, &script);
        let reversed = build_multisig_witness(&[2u8], &pk2, &[1u8], &pk1, &script);

        let items: Vec<_> = witness.iter().collect();
        let reversed_items: Vec<_> = reversed.iter().collect();
        assert_eq!(items, reversed_items);
        assert!(items[0].is_empty());
        if pk1 < pk2 {
            assert_eq!(items[1], &[1u8]);
            assert_eq!(items[2], &[2u8]);
        } else {
            assert_eq!(items[1], &[2u8]);
            assert_eq!(items[2], &[1u8]);
        }
    }
}
