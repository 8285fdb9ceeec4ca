use std::collections::HashMap;
use std::sync::RwLock;

use bitcoin::{Network, Transaction, Txid};
use lnc_manager::error::Error;
use lnc_manager::Blockchain;

/// A mocked blockchain allowing tests to control confirmation counts and
/// chain positions.
pub struct MockBlockchain {
    transactions: RwLock<Vec<Transaction>>,
    confirmations: RwLock<HashMap<Txid, u32>>,
    positions: RwLock<HashMap<Txid, (u32, u32)>>,
    height: RwLock<u64>,
}

impl MockBlockchain {
    pub fn new() -> Self {
        MockBlockchain {
            transactions: RwLock::new(Vec::new()),
            confirmations: RwLock::new(HashMap::new()),
            positions: RwLock::new(HashMap::new()),
            height: RwLock::new(100),
        }
    }

    /// Returns the transactions broadcast so far.
    pub fn get_broadcast_transactions(&self) -> Vec<Transaction> {
        self.transactions.read().unwrap().clone()
    }

    /// Marks a transaction as confirmed at the given chain position with the
    /// given number of confirmations.
    pub fn confirm_transaction(
        &self,
        txid: Txid,
        confirmations: u32,
        block_height: u32,
        tx_index: u32,
    ) {
        self.confirmations
            .write()
            .unwrap()
            .insert(txid, confirmations);
        self.positions
            .write()
            .unwrap()
            .insert(txid, (block_height, tx_index));
        *self.height.write().unwrap() = block_height as u64 + confirmations as u64 - 1;
    }
}

impl Default for MockBlockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain for MockBlockchain {
    fn send_transaction(&self, transaction: &Transaction) -> Result<(), Error> {
        self.transactions.write().unwrap().push(transaction.clone());
        Ok(())
    }

    fn get_network(&self) -> Result<Network, Error> {
        Ok(Network::Regtest)
    }

    fn get_blockchain_height(&self) -> Result<u64, Error> {
        Ok(*self.height.read().unwrap())
    }

    fn get_transaction_confirmations(&self, tx_id: &Txid) -> Result<u32, Error> {
        Ok(*self.confirmations.read().unwrap().get(tx_id).unwrap_or(&0))
    }

    fn get_transaction_position(&self, tx_id: &Txid) -> Result<Option<(u32, u32)>, Error> {
        Ok(self.positions.read().unwrap().get(tx_id).copied())
    }
}
