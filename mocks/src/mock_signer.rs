use std::collections::HashMap;
use std::sync::RwLock;

use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::Transaction;
use lnc::keys::{build_commitment_secret, MAX_COMMITMENT_INDEX};
use lnc::util;
use lnc_manager::error::Error;
use lnc_manager::{ChannelId, ChannelSigner, ChannelSigningInfo, Utxo};
use lnc_messages::ChannelPublicKeys;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};

use crate::mock_wallet::get_wallet_secret_key;

struct ChannelSecrets {
    funding: SecretKey,
    commitment_seed: [u8; 32],
}

/// A [`ChannelSigner`] deriving all channel secrets deterministically from a
/// node seed and the temporary channel id, so that the same keys can be
/// re-derived after a restart. Secrets never leave the signer.
pub struct MockSigner {
    secp: Secp256k1<All>,
    node_seed: [u8; 32],
    channels: RwLock<HashMap<ChannelId, ChannelSigningInfo>>,
}

impl MockSigner {
    pub fn new(node_seed: [u8; 32]) -> Self {
        MockSigner {
            secp: Secp256k1::new(),
            node_seed,
            channels: RwLock::new(HashMap::new()),
        }
    }

    fn derive_secret(&self, temporary_channel_id: &ChannelId, tag: &[u8]) -> SecretKey {
        let mut engine = Sha256::engine();
        engine.input(&self.node_seed);
        engine.input(temporary_channel_id);
        engine.input(tag);
        SecretKey::from_slice(&Sha256::from_engine(engine).to_byte_array())
            .expect("hash output is a valid secret key")
    }

    fn secrets_for(&self, temporary_channel_id: &ChannelId) -> ChannelSecrets {
        ChannelSecrets {
            funding: self.derive_secret(temporary_channel_id, b"funding"),
            commitment_seed: self
                .derive_secret(temporary_channel_id, b"commitment seed")
                .secret_bytes(),
        }
    }

    fn public(&self, secret: &SecretKey) -> PublicKey {
        PublicKey::from_secret_key(&self.secp, secret)
    }

    fn per_commitment_point(&self, seed: &[u8; 32], index: u64) -> PublicKey {
        let secret = build_commitment_secret(seed, MAX_COMMITMENT_INDEX - index);
        self.public(&SecretKey::from_slice(&secret).expect("valid commitment secret"))
    }

    fn get_info(&self, channel_id: &ChannelId) -> Result<ChannelSigningInfo, Error> {
        self.channels
            .read()
            .unwrap()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| Error::SignerError("Channel not registered".to_string()))
    }
}

impl ChannelSigner for MockSigner {
    fn generate_channel_keys(
        &self,
        temporary_channel_id: &ChannelId,
    ) -> Result<ChannelPublicKeys, Error> {
        let secrets = self.secrets_for(temporary_channel_id);

        Ok(ChannelPublicKeys {
            funding_pubkey: self.public(&secrets.funding),
            revocation_basepoint: self
                .public(&self.derive_secret(temporary_channel_id, b"revocation")),
            payment_basepoint: self.public(&self.derive_secret(temporary_channel_id, b"payment")),
            delayed_payment_basepoint: self
                .public(&self.derive_secret(temporary_channel_id, b"delayed")),
            htlc_basepoint: self.public(&self.derive_secret(temporary_channel_id, b"htlc")),
            first_per_commitment_point: self.per_commitment_point(&secrets.commitment_seed, 0),
        })
    }

    fn register_channel(
        &self,
        channel_id: ChannelId,
        info: ChannelSigningInfo,
    ) -> Result<(), Error> {
        self.channels.write().unwrap().insert(channel_id, info);
        Ok(())
    }

    fn sign_channel_transaction(
        &self,
        channel_id: &ChannelId,
        transaction: &Transaction,
    ) -> Result<secp256k1::ecdsa::Signature, Error> {
        let info = self.get_info(channel_id)?;
        let secrets = self.secrets_for(&info.temporary_channel_id);
        util::get_raw_sig_for_tx_input(
            &self.secp,
            transaction,
            0,
            &info.funding_script,
            info.funding_value,
            &secrets.funding,
        )
        .map_err(|e| Error::SignerError(e.to_string()))
    }

    fn validate_signature(
        &self,
        channel_id: &ChannelId,
        signature: &secp256k1::ecdsa::Signature,
        transaction: &Transaction,
    ) -> Result<(), Error> {
        let info = self.get_info(channel_id)?;
        util::verify_tx_input_sig(
            &self.secp,
            signature,
            transaction,
            0,
            &info.funding_script,
            info.funding_value,
            &info.counterparty_funding_pubkey,
        )
        .map_err(|e| Error::SignerError(e.to_string()))
    }

    fn sign_funding_transaction(
        &self,
        _channel_id: &ChannelId,
        transaction: &mut Transaction,
        spent_coins: &[Utxo],
    ) -> Result<bool, Error> {
        let wallet_key = get_wallet_secret_key();
        for index in 0..transaction.input.len() {
            let outpoint = transaction.input[index].previous_output;
            let coin = match spent_coins.iter().find(|c| c.outpoint == outpoint) {
                Some(coin) => coin,
                None => return Ok(false),
            };
            util::sign_p2wpkh_input(
                &self.secp,
                &wallet_key,
                transaction,
                index,
                EcdsaSighashType::All,
                coin.tx_out.value,
            )
            .map_err(|e| Error::SignerError(e.to_string()))?;
        }
        Ok(true)
    }

    fn get_per_commitment_point(
        &self,
        channel_id: &ChannelId,
        index: u64,
    ) -> Result<PublicKey, Error> {
        let info = self.get_info(channel_id)?;
        let secrets = self.secrets_for(&info.temporary_channel_id);
        Ok(self.per_commitment_point(&secrets.commitment_seed, index))
    }
}
