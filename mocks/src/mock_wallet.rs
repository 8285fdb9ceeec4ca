use std::collections::HashMap;
use std::sync::RwLock;

use bitcoin::hashes::Hash;
use bitcoin::{Address, Network, OutPoint, ScriptBuf, TxOut, Txid};
use lnc_manager::error::Error;
use lnc_manager::{ChannelId, Utxo, Wallet};
use secp256k1::{Secp256k1, SecretKey};

/// An in-memory [`Wallet`] holding a pool of P2WPKH coins paying to a fixed
/// key shared with [`crate::mock_signer::MockSigner`].
pub struct MockWallet {
    utxos: RwLock<Vec<Utxo>>,
    locked: RwLock<HashMap<ChannelId, Vec<Utxo>>>,
}

impl MockWallet {
    /// Creates a wallet holding `nb_utxo` coins of increasing value.
    pub fn new(nb_utxo: u16) -> Self {
        let mut utxos = Vec::with_capacity(nb_utxo as usize);
        for i in 0..nb_utxo {
            let tx_out = TxOut {
                value: 1000000 * (i as u64 + 1),
                script_pubkey: get_address().script_pubkey(),
            };
            let mut txid = [0u8; 32];
            txid[0] = (i >> 8) as u8;
            txid[1] = (i & 0xff) as u8;
            txid[31] = 0x77;
            utxos.push(Utxo {
                tx_out,
                outpoint: OutPoint {
                    txid: Txid::from_byte_array(txid),
                    vout: 0,
                },
                address: get_address(),
                redeem_script: ScriptBuf::new(),
                reserved: false,
            });
        }

        Self {
            utxos: RwLock::new(utxos),
            locked: RwLock::new(HashMap::new()),
        }
    }
}

impl Wallet for MockWallet {
    fn get_new_address(&self) -> Result<Address, Error> {
        Ok(get_address())
    }

    fn get_new_change_address(&self) -> Result<Address, Error> {
        Ok(get_address())
    }

    fn lock_utxos_for_channel(
        &self,
        channel_id: &ChannelId,
        amount: u64,
        _fee_rate_per_kw: u64,
    ) -> Result<Vec<Utxo>, Error> {
        // Head room for the funding fee and a non-dust change output.
        let required = amount + 50_000;
        let mut pool = self.utxos.write().unwrap();

        let mut sum = 0;
        let mut selected = Vec::new();
        for utxo in pool.iter_mut().filter(|x| !x.reserved) {
            if sum >= required {
                break;
            }
            utxo.reserved = true;
            sum += utxo.tx_out.value;
            selected.push(utxo.clone());
        }

        if sum < required {
            return Err(Error::WalletError("Not enough funds".to_string()));
        }

        self.locked
            .write()
            .unwrap()
            .insert(*channel_id, selected.clone());
        Ok(selected)
    }

    fn get_locked_utxos_for_channel(&self, channel_id: &ChannelId) -> Result<Vec<Utxo>, Error> {
        Ok(self
            .locked
            .read()
            .unwrap()
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    fn unreserve_utxos(&self, outpoints: &[OutPoint]) -> Result<(), Error> {
        let mut pool = self.utxos.write().unwrap();
        for utxo in pool.iter_mut() {
            if outpoints.contains(&utxo.outpoint) {
                utxo.reserved = false;
            }
        }
        Ok(())
    }
}

fn get_address() -> Address {
    let secp = Secp256k1::new();
    Address::p2wpkh(
        &bitcoin::PublicKey::new(secp256k1::PublicKey::from_secret_key(
            &secp,
            &get_wallet_secret_key(),
        )),
        Network::Regtest,
    )
    .unwrap()
}

/// The key all mock wallet coins pay to, shared with the mock signer so that
/// funding inputs can be signed.
pub fn get_wallet_secret_key() -> SecretKey {
    SecretKey::from_slice(&[
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 1,
    ])
    .unwrap()
}
