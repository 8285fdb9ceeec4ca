//! Construction of the witness scripts locking the outputs of channel
//! transactions.

use bitcoin::blockdata::opcodes;
use bitcoin::blockdata::script::Builder;
use bitcoin::hash_types::PubkeyHash;
use bitcoin::hashes::ripemd160::Hash as Ripemd160;
use bitcoin::hashes::Hash;
use bitcoin::ScriptBuf;
use secp256k1::PublicKey;

/// Create the multisig redeem script for the funding output. The keys are
/// ordered by their serialization so that both parties derive the same script.
pub fn make_funding_redeemscript(a: &PublicKey, b: &PublicKey) -> ScriptBuf {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    Builder::new()
        .push_opcode(opcodes::all::OP_PUSHNUM_2)
        .push_slice(first.serialize())
        .push_slice(second.serialize())
        .push_opcode(opcodes::all::OP_PUSHNUM_2)
        .push_opcode(opcodes::all::OP_CHECKMULTISIG)
        .into_script()
}

/// A script either spendable by the revocation key or by the broadcaster's
/// delayed payment key after the contest delay. Used for the `to_local` output
/// of a commitment transaction and for the output of second-stage HTLC
/// transactions.
pub fn get_revokeable_redeemscript(
    revocation_key: &PublicKey,
    contest_delay: u16,
    broadcaster_delayed_payment_key: &PublicKey,
) -> ScriptBuf {
    Builder::new()
        .push_opcode(opcodes::all::OP_IF)
        .push_slice(revocation_key.serialize())
        .push_opcode(opcodes::all::OP_ELSE)
        .push_int(contest_delay as i64)
        .push_opcode(opcodes::all::OP_CSV)
        .push_opcode(opcodes::all::OP_DROP)
        .push_slice(broadcaster_delayed_payment_key.serialize())
        .push_opcode(opcodes::all::OP_ENDIF)
        .push_opcode(opcodes::all::OP_CHECKSIG)
        .into_script()
}

/// The witness script for the `to_remote` output when anchor outputs are in
/// use, spendable by the counter signatory after a single block.
pub fn get_to_countersignatory_with_anchors_redeemscript(payment_key: &PublicKey) -> ScriptBuf {
    Builder::new()
        .push_slice(payment_key.serialize())
        .push_opcode(opcodes::all::OP_CHECKSIGVERIFY)
        .push_int(1)
        .push_opcode(opcodes::all::OP_CSV)
        .into_script()
}

/// The witness script for an anchor output, spendable by the funding key it is
/// bound to, or by anyone after sixteen blocks of confirmation.
pub fn get_anchor_redeemscript(funding_pubkey: &PublicKey) -> ScriptBuf {
    Builder::new()
        .push_slice(funding_pubkey.serialize())
        .push_opcode(opcodes::all::OP_CHECKSIG)
        .push_opcode(opcodes::all::OP_IFDUP)
        .push_opcode(opcodes::all::OP_NOTIF)
        .push_int(16)
        .push_opcode(opcodes::all::OP_CSV)
        .push_opcode(opcodes::all::OP_ENDIF)
        .into_script()
}

/// The witness script for an offered or received HTLC output on a commitment
/// transaction. `offered` is relative to the broadcaster of the transaction.
pub fn get_htlc_redeemscript(
    offered: bool,
    payment_hash: &[u8; 32],
    cltv_expiry: u32,
    anchors: bool,
    broadcaster_htlc_key: &PublicKey,
    countersignatory_htlc_key: &PublicKey,
    revocation_key: &PublicKey,
) -> ScriptBuf {
    let payment_hash160 = Ripemd160::hash(payment_hash).to_byte_array();
    let revocation_key_hash = PubkeyHash::hash(&revocation_key.serialize()).to_byte_array();

    let bldr = Builder::new()
        .push_opcode(opcodes::all::OP_DUP)
        .push_opcode(opcodes::all::OP_HASH160)
        .push_slice(revocation_key_hash)
        .push_opcode(opcodes::all::OP_EQUAL)
        .push_opcode(opcodes::all::OP_IF)
        .push_opcode(opcodes::all::OP_CHECKSIG)
        .push_opcode(opcodes::all::OP_ELSE)
        .push_slice(countersignatory_htlc_key.serialize())
        .push_opcode(opcodes::all::OP_SWAP)
        .push_opcode(opcodes::all::OP_SIZE)
        .push_int(32)
        .push_opcode(opcodes::all::OP_EQUAL);

    let mut bldr = if offered {
        bldr.push_opcode(opcodes::all::OP_NOTIF)
            .push_opcode(opcodes::all::OP_DROP)
            .push_int(2)
            .push_opcode(opcodes::all::OP_SWAP)
            .push_slice(broadcaster_htlc_key.serialize())
            .push_int(2)
            .push_opcode(opcodes::all::OP_CHECKMULTISIG)
            .push_opcode(opcodes::all::OP_ELSE)
            .push_opcode(opcodes::all::OP_HASH160)
            .push_slice(payment_hash160)
            .push_opcode(opcodes::all::OP_EQUALVERIFY)
            .push_opcode(opcodes::all::OP_CHECKSIG)
            .push_opcode(opcodes::all::OP_ENDIF)
    } else {
        bldr.push_opcode(opcodes::all::OP_IF)
            .push_opcode(opcodes::all::OP_HASH160)
            .push_slice(payment_hash160)
            .push_opcode(opcodes::all::OP_EQUALVERIFY)
            .push_int(2)
            .push_opcode(opcodes::all::OP_SWAP)
            .push_slice(broadcaster_htlc_key.serialize())
            .push_int(2)
            .push_opcode(opcodes::all::OP_CHECKMULTISIG)
            .push_opcode(opcodes::all::OP_ELSE)
            .push_opcode(opcodes::all::OP_DROP)
            .push_int(cltv_expiry as i64)
            .push_opcode(opcodes::all::OP_CLTV)
            .push_opcode(opcodes::all::OP_DROP)
            .push_opcode(opcodes::all::OP_CHECKSIG)
            .push_opcode(opcodes::all::OP_ENDIF)
    };
    if anchors {
        bldr = bldr
            .push_opcode(opcodes::all::OP_PUSHNUM_1)
            .push_opcode(opcodes::all::OP_CSV)
            .push_opcode(opcodes::all::OP_DROP);
    }
    bldr.push_opcode(opcodes::all::OP_ENDIF).into_script()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Secp256k1, SecretKey};

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    #[test]
    fn funding_redeemscript_is_symmetric() {
        let (a, b) = (pk(1), pk(2));
        assert_eq!(make_funding_redeemscript(&a, &b), make_funding_redeemscript(&b, &a));
    }

    #[test]
    fn funding_redeemscript_is_2_of_2() {
        let script = make_funding_redeemscript(&pk(1), &pk(2));
        // OP_2 <33 byte key> <33 byte key> OP_2 OP_CHECKMULTISIG
        assert_eq!(script.len(), 1 + 34 + 34 + 1 + 1);
    }

    #[test]
    fn htlc_scripts_have_expected_weights() {
        // The witness script sizes the weight tables assume.
        let offered = get_htlc_redeemscript(true, &[17; 32], 500000, false, &pk(1), &pk(2), &pk(3));
        assert_eq!(offered.len(), 133);
        let offered_anchors =
            get_htlc_redeemscript(true, &[17; 32], 500000, true, &pk(1), &pk(2), &pk(3));
        assert_eq!(offered_anchors.len(), 136);
        let received =
            get_htlc_redeemscript(false, &[17; 32], 500000, false, &pk(1), &pk(2), &pk(3));
        assert_eq!(received.len(), 139);
        let received_anchors =
            get_htlc_redeemscript(false, &[17; 32], 500000, true, &pk(1), &pk(2), &pk(3));
        assert_eq!(received_anchors.len(), 142);
    }

    #[test]
    fn anchor_script_bound_to_funding_key() {
        let script_a = get_anchor_redeemscript(&pk(1));
        let script_b = get_anchor_redeemscript(&pk(2));
        assert_ne!(script_a, script_b);
    }
}
