//! Typed model of the outputs appearing in channel transactions, with the
//! deterministic ordering both parties must apply when composing a commitment
//! transaction.

use bitcoin::hash_types::WPubkeyHash;
use bitcoin::hashes::Hash;
use bitcoin::{OutPoint, ScriptBuf, TxOut, Txid};
use secp256k1::PublicKey;

use crate::scripts;
use crate::ANCHOR_OUTPUT_VALUE;

/// The position of an output within its owning transaction, known once the
/// transaction has been finalized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputPosition {
    /// The id of the owning transaction.
    pub txid: Txid,
    /// The output index within the owning transaction.
    pub vout: u32,
}

impl OutputPosition {
    /// Returns the outpoint referencing this output.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }
}

/// The 2-of-2 output created by the funding transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingOutput {
    /// The channel capacity locked in the output.
    pub amount: u64,
    /// The funding public key of the local party.
    pub local_funding_pubkey: PublicKey,
    /// The funding public key of the remote party.
    pub remote_funding_pubkey: PublicKey,
    /// The location of the output, once the funding transaction is known.
    pub position: Option<OutputPosition>,
}

impl FundingOutput {
    /// The multisig witness script locking the output.
    pub fn witness_script(&self) -> ScriptBuf {
        scripts::make_funding_redeemscript(&self.local_funding_pubkey, &self.remote_funding_pubkey)
    }

    /// The script pubkey of the output.
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.witness_script().to_v0_p2wsh()
    }

    /// Returns the outpoint of the funding output, if known.
    pub fn outpoint(&self) -> Option<OutPoint> {
        self.position.map(|p| p.outpoint())
    }
}

/// An HTLC as it appears on a commitment transaction. The direction is
/// relative to the broadcaster of the transaction: an offered HTLC was sent by
/// the broadcaster, a received HTLC is claimable by it with the preimage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcOutputInfo {
    /// The amount of the HTLC in millisatoshi. The commitment output carries
    /// this divided by 1000.
    pub amount_msat: u64,
    /// The block height at which the HTLC times out.
    pub cltv_expiry: u32,
    /// The hash whose preimage unlocks the HTLC.
    pub payment_hash: [u8; 32],
}

impl HtlcOutputInfo {
    /// The amount the commitment output for this HTLC carries.
    pub fn amount_sat(&self) -> u64 {
        self.amount_msat / 1000
    }
}

/// A possible output of a commitment transaction. Amounts can be adjusted
/// during fee computation and trimming until the owning transaction is
/// finalized, at which point the output position is recorded and the output
/// becomes immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitmentOutput {
    /// The broadcaster's balance, spendable by them after the contest delay or
    /// by the counter signatory through the revocation path.
    ToLocal {
        /// The output amount in satoshi.
        amount: u64,
        /// The revocation key for this commitment.
        revocation_key: PublicKey,
        /// The broadcaster's delayed payment key for this commitment.
        delayed_payment_key: PublicKey,
        /// The delay before the broadcaster can spend.
        to_self_delay: u16,
    },
    /// The counter signatory's balance, immediately spendable by them (after
    /// one block when anchors are in use).
    ToRemote {
        /// The output amount in satoshi.
        amount: u64,
        /// The counter signatory's payment key.
        payment_key: PublicKey,
        /// Whether the anchors variant of the output script is used.
        anchors: bool,
    },
    /// A fee-bumping anchor bound to one party's funding key.
    Anchor {
        /// The funding public key the anchor is bound to.
        funding_pubkey: PublicKey,
    },
    /// An HTLC offered by the broadcaster.
    OfferedHtlc(HtlcCommitmentOutput),
    /// An HTLC received by the broadcaster.
    ReceivedHtlc(HtlcCommitmentOutput),
}

/// The common content of the two HTLC output variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcCommitmentOutput {
    /// The HTLC this output settles.
    pub htlc: HtlcOutputInfo,
    /// The broadcaster's HTLC key for this commitment.
    pub broadcaster_htlc_key: PublicKey,
    /// The counter signatory's HTLC key for this commitment.
    pub countersignatory_htlc_key: PublicKey,
    /// The revocation key for this commitment.
    pub revocation_key: PublicKey,
    /// Whether the anchors variant of the script is used.
    pub anchors: bool,
}

impl CommitmentOutput {
    /// The amount carried by the output, in satoshi.
    pub fn amount(&self) -> u64 {
        match self {
            CommitmentOutput::ToLocal { amount, .. } => *amount,
            CommitmentOutput::ToRemote { amount, .. } => *amount,
            CommitmentOutput::Anchor { .. } => ANCHOR_OUTPUT_VALUE,
            CommitmentOutput::OfferedHtlc(h) | CommitmentOutput::ReceivedHtlc(h) => {
                h.htlc.amount_sat()
            }
        }
    }

    /// The witness script of the output. For the non-anchor `to_remote`
    /// variant (a P2WPKH output) this is the script pubkey itself.
    pub fn witness_script(&self) -> ScriptBuf {
        match self {
            CommitmentOutput::ToLocal {
                revocation_key,
                delayed_payment_key,
                to_self_delay,
                ..
            } => scripts::get_revokeable_redeemscript(
                revocation_key,
                *to_self_delay,
                delayed_payment_key,
            ),
            CommitmentOutput::ToRemote {
                payment_key,
                anchors,
                ..
            } => {
                if *anchors {
                    scripts::get_to_countersignatory_with_anchors_redeemscript(payment_key)
                } else {
                    p2wpkh_script_pubkey(payment_key)
                }
            }
            CommitmentOutput::Anchor { funding_pubkey } => {
                scripts::get_anchor_redeemscript(funding_pubkey)
            }
            CommitmentOutput::OfferedHtlc(h) => scripts::get_htlc_redeemscript(
                true,
                &h.htlc.payment_hash,
                h.htlc.cltv_expiry,
                h.anchors,
                &h.broadcaster_htlc_key,
                &h.countersignatory_htlc_key,
                &h.revocation_key,
            ),
            CommitmentOutput::ReceivedHtlc(h) => scripts::get_htlc_redeemscript(
                false,
                &h.htlc.payment_hash,
                h.htlc.cltv_expiry,
                h.anchors,
                &h.broadcaster_htlc_key,
                &h.countersignatory_htlc_key,
                &h.revocation_key,
            ),
        }
    }

    /// The script pubkey of the output as it appears in the transaction.
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self {
            CommitmentOutput::ToRemote { anchors: false, .. } => self.witness_script(),
            _ => self.witness_script().to_v0_p2wsh(),
        }
    }

    /// The CLTV expiry used to break ordering ties, for HTLC outputs.
    pub fn cltv_expiry(&self) -> Option<u32> {
        match self {
            CommitmentOutput::OfferedHtlc(h) | CommitmentOutput::ReceivedHtlc(h) => {
                Some(h.htlc.cltv_expiry)
            }
            _ => None,
        }
    }

    /// Whether the output settles an HTLC.
    pub fn is_htlc(&self) -> bool {
        matches!(
            self,
            CommitmentOutput::OfferedHtlc(_) | CommitmentOutput::ReceivedHtlc(_)
        )
    }

    /// The `TxOut` this output translates to.
    pub fn to_tx_out(&self) -> TxOut {
        TxOut {
            value: self.amount(),
            script_pubkey: self.script_pubkey(),
        }
    }
}

pub(crate) fn p2wpkh_script_pubkey(key: &PublicKey) -> ScriptBuf {
    ScriptBuf::new_v0_p2wpkh(&WPubkeyHash::hash(&key.serialize()))
}

/// Sorts the outputs of a commitment transaction into the order both parties
/// must derive: amount ascending, then script pubkey bytes, with HTLC ties
/// broken by CLTV expiry and finally by payment hash.
pub fn sort_commitment_outputs(outputs: &mut [CommitmentOutput]) {
    outputs.sort_by_cached_key(|o| {
        let tie_break = match o {
            CommitmentOutput::OfferedHtlc(h) | CommitmentOutput::ReceivedHtlc(h) => {
                (h.htlc.cltv_expiry, h.htlc.payment_hash)
            }
            _ => (0, [0; 32]),
        };
        (
            o.amount(),
            o.script_pubkey().into_bytes(),
            tie_break.0,
            tie_break.1,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{Secp256k1, SecretKey};

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn offered_htlc(amount_msat: u64, cltv_expiry: u32, payment_hash: [u8; 32]) -> CommitmentOutput {
        CommitmentOutput::OfferedHtlc(HtlcCommitmentOutput {
            htlc: HtlcOutputInfo {
                amount_msat,
                cltv_expiry,
                payment_hash,
            },
            broadcaster_htlc_key: pk(1),
            countersignatory_htlc_key: pk(2),
            revocation_key: pk(3),
            anchors: false,
        })
    }

    #[test]
    fn outputs_ordered_by_amount_first() {
        let mut outputs = vec![
            CommitmentOutput::ToLocal {
                amount: 5000,
                revocation_key: pk(3),
                delayed_payment_key: pk(4),
                to_self_delay: 144,
            },
            CommitmentOutput::ToRemote {
                amount: 2000,
                payment_key: pk(5),
                anchors: false,
            },
            offered_htlc(3_000_000, 100, [7; 32]),
        ];

        sort_commitment_outputs(&mut outputs);

        assert_eq!(outputs[0].amount(), 2000);
        assert_eq!(outputs[1].amount(), 3000);
        assert_eq!(outputs[2].amount(), 5000);
    }

    #[test]
    fn htlc_ties_broken_by_cltv_expiry() {
        // Same amount and same payment hash gives identical scripts except for
        // the CLTV tie break.
        let mut outputs = vec![
            offered_htlc(3_000_000, 200, [7; 32]),
            offered_htlc(3_000_000, 100, [7; 32]),
        ];

        sort_commitment_outputs(&mut outputs);

        assert_eq!(outputs[0].cltv_expiry(), Some(100));
        assert_eq!(outputs[1].cltv_expiry(), Some(200));
    }

    #[test]
    fn equal_amounts_ordered_by_script_bytes() {
        let to_local = CommitmentOutput::ToLocal {
            amount: 3000,
            revocation_key: pk(3),
            delayed_payment_key: pk(4),
            to_self_delay: 144,
        };
        let to_remote = CommitmentOutput::ToRemote {
            amount: 3000,
            payment_key: pk(5),
            anchors: false,
        };

        let mut outputs = vec![to_local.clone(), to_remote.clone()];
        sort_commitment_outputs(&mut outputs);
        let first_spk = outputs[0].script_pubkey();
        let second_spk = outputs[1].script_pubkey();
        assert!(first_spk.as_bytes() <= second_spk.as_bytes());

        // The order is independent of the starting permutation.
        let mut reversed = vec![to_remote, to_local];
        sort_commitment_outputs(&mut reversed);
        assert_eq!(reversed[0].script_pubkey(), first_spk);
        assert_eq!(reversed[1].script_pubkey(), second_spk);
    }

    #[test]
    fn anchor_amount_is_fixed() {
        let anchor = CommitmentOutput::Anchor {
            funding_pubkey: pk(6),
        };
        assert_eq!(anchor.amount(), ANCHOR_OUTPUT_VALUE);
    }
}
