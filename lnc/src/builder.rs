//! Shared machinery for assembling channel transactions: input bookkeeping,
//! weight based fee computation, conservation checks, one shot finalization
//! and signature application.

use bitcoin::absolute::LockTime;
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{OutPoint, Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use crate::util;
use crate::Error;
use crate::{
    FUNDING_SPEND_WITNESS_WEIGHT, P2PKH_SCRIPT_SIG_SIZE, P2WPKH_WITNESS_WEIGHT, TX_BASE_WEIGHT,
    TX_INPUT_BASE_WEIGHT, TX_VERSION,
};

/// The script type of a transaction input, determining its weight and how it
/// is signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// A pre-segwit pay-to-pubkey-hash input.
    Legacy,
    /// A native segwit pay-to-witness-pubkey-hash input.
    SegwitPubkey,
    /// A segwit input spending a 2-of-2 multisig witness script.
    SegwitMultisig {
        /// The witness script of the spent output.
        witness_script: ScriptBuf,
    },
}

impl InputKind {
    fn script_sig_size(&self) -> usize {
        match self {
            InputKind::Legacy => P2PKH_SCRIPT_SIG_SIZE,
            _ => 0,
        }
    }

    fn witness_weight(&self) -> usize {
        match self {
            InputKind::Legacy => 0,
            InputKind::SegwitPubkey => P2WPKH_WITNESS_WEIGHT,
            InputKind::SegwitMultisig { .. } => FUNDING_SPEND_WITNESS_WEIGHT,
        }
    }

    /// The weight this input adds to its transaction.
    pub fn input_weight(&self) -> usize {
        TX_INPUT_BASE_WEIGHT + 4 * self.script_sig_size() + self.witness_weight()
    }
}

/// An input consumed by a transaction under construction.
#[derive(Clone, Debug)]
pub struct TxInputSpec {
    /// The outpoint being spent.
    pub outpoint: OutPoint,
    /// The value of the spent output.
    pub value: u64,
    /// The sequence to set on the input.
    pub sequence: Sequence,
    /// The script type of the spent output.
    pub kind: InputKind,
    /// The counterparty's signature for this input, once received.
    pub counterparty_signature: Option<Signature>,
}

/// Assembles a transaction from inputs and outputs, enforcing that the value
/// of the outputs plus the fee never exceeds the value of the inputs and that
/// the transaction is finalized exactly once. After finalization the
/// transaction id is fixed and the input and output lists can no longer be
/// mutated.
pub struct TransactionBuilder {
    lock_time: LockTime,
    inputs: Vec<TxInputSpec>,
    outputs: Vec<TxOut>,
    finalized: Option<Transaction>,
}

impl TransactionBuilder {
    /// Creates a new builder producing a transaction with the given lock time.
    pub fn new(lock_time: LockTime) -> Self {
        TransactionBuilder {
            lock_time,
            inputs: Vec::new(),
            outputs: Vec::new(),
            finalized: None,
        }
    }

    /// Adds an input to the transaction.
    pub fn add_input(&mut self, input: TxInputSpec) -> Result<(), Error> {
        if self.finalized.is_some() {
            return Err(Error::AlreadyFinalized);
        }
        self.inputs.push(input);
        Ok(())
    }

    /// Adds an output to the transaction.
    pub fn add_output(&mut self, output: TxOut) -> Result<(), Error> {
        if self.finalized.is_some() {
            return Err(Error::AlreadyFinalized);
        }
        self.outputs.push(output);
        Ok(())
    }

    /// The total value of the inputs.
    pub fn total_input_value(&self) -> u64 {
        self.inputs.iter().map(|i| i.value).sum()
    }

    /// The total value of the outputs added so far.
    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// The estimated weight of the transaction, from the base weight, the per
    /// input weight table and the serialized size of each output.
    pub fn weight(&self) -> usize {
        let input_weight: usize = self.inputs.iter().map(|i| i.kind.input_weight()).sum();
        let output_weight: usize = self
            .outputs
            .iter()
            .map(|o| {
                let spk_len = o.script_pubkey.len();
                (8 + util::compute_var_int_prefix_size(spk_len) + spk_len) * 4
            })
            .sum();
        TX_BASE_WEIGHT + input_weight + output_weight
    }

    /// The fee implied by the current weight at the given fee rate.
    pub fn fee(&self, fee_rate_per_kw: u64) -> u64 {
        util::weight_to_fee(self.weight(), fee_rate_per_kw)
    }

    /// Builds the final transaction, checking that the outputs and the given
    /// fee are covered by the inputs. Any later attempt to mutate or finalize
    /// again fails.
    pub fn finalize(&mut self, fee: u64) -> Result<&Transaction, Error> {
        if self.finalized.is_some() {
            return Err(Error::AlreadyFinalized);
        }
        let total_out = self
            .total_output_value()
            .checked_add(fee)
            .ok_or(Error::InvalidArgument)?;
        if total_out > self.total_input_value() {
            return Err(Error::InsufficientInputAmount);
        }

        let input = self
            .inputs
            .iter()
            .map(|i| TxIn {
                previous_output: i.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: i.sequence,
                witness: Witness::new(),
            })
            .collect();

        self.finalized = Some(Transaction {
            version: TX_VERSION,
            lock_time: self.lock_time,
            input,
            output: self.outputs.clone(),
        });
        Ok(self.finalized.as_ref().expect("was just set"))
    }

    /// The finalized transaction.
    pub fn transaction(&self) -> Result<&Transaction, Error> {
        self.finalized.as_ref().ok_or(Error::NotFinalized)
    }

    /// The id of the finalized transaction.
    pub fn txid(&self) -> Result<Txid, Error> {
        Ok(self.transaction()?.txid())
    }

    /// Records the counterparty's signature for the input spending the given
    /// outpoint.
    pub fn apply_counterparty_signature(
        &mut self,
        outpoint: OutPoint,
        signature: Signature,
    ) -> Result<(), Error> {
        let input = self
            .inputs
            .iter_mut()
            .find(|i| i.outpoint == outpoint)
            .ok_or(Error::InvalidArgument)?;
        input.counterparty_signature = Some(signature);
        Ok(())
    }

    /// Completes the witness of a multisig input of the finalized transaction
    /// from the local signature and the previously applied counterparty
    /// signature, ordering both by funding public key. Returns the signed
    /// transaction.
    pub fn complete_multisig_input(
        &mut self,
        input_index: usize,
        local_signature: &Signature,
        local_pubkey: &PublicKey,
        counterparty_pubkey: &PublicKey,
    ) -> Result<&Transaction, Error> {
        if self.finalized.is_none() {
            return Err(Error::NotFinalized);
        }
        let spec = self.inputs.get(input_index).ok_or(Error::InvalidArgument)?;
        let witness_script = match &spec.kind {
            InputKind::SegwitMultisig { witness_script } => witness_script.clone(),
            _ => return Err(Error::InvalidArgument),
        };
        let counterparty_signature = spec
            .counterparty_signature
            .ok_or(Error::InvalidArgument)?;

        let local_sig = util::finalize_sig(local_signature, EcdsaSighashType::All);
        let counterparty_sig =
            util::finalize_sig(&counterparty_signature, EcdsaSighashType::All);
        let witness = util::build_multisig_witness(
            &local_sig,
            local_pubkey,
            &counterparty_sig,
            counterparty_pubkey,
            &witness_script,
        );

        let tx = self.finalized.as_mut().expect("checked above");
        tx.input[input_index].witness = witness;
        Ok(tx)
    }

    /// The witness script of a multisig input, used to compute its signature
    /// hash.
    pub fn input_witness_script(&self, input_index: usize) -> Result<&Script, Error> {
        match self.inputs.get(input_index).map(|i| &i.kind) {
            Some(InputKind::SegwitMultisig { witness_script }) => Ok(witness_script),
            _ => Err(Error::InvalidArgument),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p2wpkh_input(value: u64) -> TxInputSpec {
        TxInputSpec {
            outpoint: OutPoint::default(),
            value,
            sequence: Sequence(0xffffffff),
            kind: InputKind::SegwitPubkey,
            counterparty_signature: None,
        }
    }

    fn output(value: u64) -> TxOut {
        TxOut {
            value,
            script_pubkey: ScriptBuf::new(),
        }
    }

    #[test]
    fn finalize_rejects_outputs_exceeding_inputs() {
        let mut builder = TransactionBuilder::new(LockTime::ZERO);
        builder.add_input(p2wpkh_input(1000)).unwrap();
        builder.add_output(output(900)).unwrap();
        assert_eq!(builder.finalize(200), Err(Error::InsufficientInputAmount));
    }

    #[test]
    fn finalize_is_one_shot() {
        let mut builder = TransactionBuilder::new(LockTime::ZERO);
        builder.add_input(p2wpkh_input(1000)).unwrap();
        builder.add_output(output(900)).unwrap();
        builder.finalize(100).unwrap();

        assert_eq!(builder.finalize(100).err(), Some(Error::AlreadyFinalized));
        assert_eq!(
            builder.add_output(output(1)).err(),
            Some(Error::AlreadyFinalized)
        );
        assert_eq!(
            builder.add_input(p2wpkh_input(1)).err(),
            Some(Error::AlreadyFinalized)
        );
    }

    #[test]
    fn txid_requires_finalization() {
        let mut builder = TransactionBuilder::new(LockTime::ZERO);
        builder.add_input(p2wpkh_input(1000)).unwrap();
        builder.add_output(output(1000)).unwrap();
        assert_eq!(builder.txid().err(), Some(Error::NotFinalized));
        builder.finalize(0).unwrap();
        let txid = builder.txid().unwrap();
        assert_eq!(txid, builder.transaction().unwrap().txid());
    }

    #[test]
    fn counterparty_signature_is_applied_into_the_input_slot() {
        use crate::scripts::make_funding_redeemscript;
        use crate::util;
        use secp256k1::{Secp256k1, SecretKey};

        let secp = Secp256k1::new();
        let local_sk = SecretKey::from_slice(&[1u8; 32]).unwrap();
        let counter_sk = SecretKey::from_slice(&[2u8; 32]).unwrap();
        let local_pk = PublicKey::from_secret_key(&secp, &local_sk);
        let counter_pk = PublicKey::from_secret_key(&secp, &counter_sk);
        let witness_script = make_funding_redeemscript(&local_pk, &counter_pk);

        let mut builder = TransactionBuilder::new(LockTime::ZERO);
        builder
            .add_input(TxInputSpec {
                outpoint: OutPoint::default(),
                value: 100_000,
                sequence: Sequence(0xffffffff),
                kind: InputKind::SegwitMultisig {
                    witness_script: witness_script.clone(),
                },
                counterparty_signature: None,
            })
            .unwrap();
        builder.add_output(output(99_000)).unwrap();

        // The witness can only be completed on a finalized transaction with
        // the counterparty signature in place.
        assert_eq!(
            builder
                .complete_multisig_input(0, &dummy_sig(&secp, &local_sk), &local_pk, &counter_pk)
                .err(),
            Some(Error::NotFinalized)
        );

        builder.finalize(1000).unwrap();
        let tx = builder.transaction().unwrap().clone();
        let counter_sig = util::get_raw_sig_for_tx_input(
            &secp,
            &tx,
            0,
            &witness_script,
            100_000,
            &counter_sk,
        )
        .unwrap();
        let local_sig =
            util::get_raw_sig_for_tx_input(&secp, &tx, 0, &witness_script, 100_000, &local_sk)
                .unwrap();

        assert_eq!(
            builder
                .complete_multisig_input(0, &local_sig, &local_pk, &counter_pk)
                .err(),
            Some(Error::InvalidArgument)
        );

        builder
            .apply_counterparty_signature(OutPoint::default(), counter_sig)
            .unwrap();
        let signed = builder
            .complete_multisig_input(0, &local_sig, &local_pk, &counter_pk)
            .unwrap();

        let witness: Vec<_> = signed.input[0].witness.iter().collect();
        assert_eq!(witness.len(), 4);
        assert!(witness[0].is_empty());
        assert_eq!(witness[3], witness_script.as_bytes());
    }

    fn dummy_sig(
        secp: &secp256k1::Secp256k1<secp256k1::All>,
        sk: &secp256k1::SecretKey,
    ) -> Signature {
        let msg = secp256k1::Message::from_slice(&[42u8; 32]).unwrap();
        secp.sign_ecdsa(&msg, sk)
    }

    #[test]
    fn weight_accounts_for_input_kinds() {
        let mut segwit = TransactionBuilder::new(LockTime::ZERO);
        segwit.add_input(p2wpkh_input(1000)).unwrap();

        let mut legacy = TransactionBuilder::new(LockTime::ZERO);
        legacy
            .add_input(TxInputSpec {
                kind: InputKind::Legacy,
                ..p2wpkh_input(1000)
            })
            .unwrap();

        // A legacy input carries its signature in the script sig, scaled by
        // four, where the segwit input carries it in the witness.
        assert_eq!(
            legacy.weight() - segwit.weight(),
            4 * P2PKH_SCRIPT_SIG_SIZE - P2WPKH_WITNESS_WEIGHT
        );
    }
}
