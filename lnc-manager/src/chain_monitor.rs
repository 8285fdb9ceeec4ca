//! Tracks the funding transactions whose confirmation a node is waiting for,
//! and detects when a watched transaction reached its required depth.

use std::collections::HashMap;
use std::ops::Deref;

use bitcoin::Txid;

use crate::error::Error;
use crate::{Blockchain, ChannelId};

/// A watched funding transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchedTransaction {
    /// The channel waiting for the transaction.
    pub channel_id: ChannelId,
    /// The confirmation depth required before the channel becomes usable.
    pub min_depth: u32,
}

/// A `ChainMonitor` keeps the list of funding transaction ids to watch in the
/// blockchain together with the confirmation depth each channel negotiated.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ChainMonitor {
    watched_tx: HashMap<Txid, WatchedTransaction>,
}

impl ChainMonitor {
    /// Returns a new [`ChainMonitor`] with no watched transaction.
    pub fn new() -> Self {
        ChainMonitor {
            watched_tx: HashMap::new(),
        }
    }

    /// Returns true if the monitor doesn't contain any transaction to watch.
    pub fn is_empty(&self) -> bool {
        self.watched_tx.is_empty()
    }

    /// Starts watching a funding transaction for the given channel.
    pub fn watch_funding(&mut self, txid: Txid, channel_id: ChannelId, min_depth: u32) {
        self.watched_tx.insert(
            txid,
            WatchedTransaction {
                channel_id,
                min_depth,
            },
        );
    }

    /// Stops watching the given transaction.
    pub fn remove_tx(&mut self, txid: &Txid) {
        self.watched_tx.remove(txid);
    }

    /// Queries the blockchain for the confirmation count of every watched
    /// transaction and returns those that reached their required depth.
    pub fn newly_confirmed<B: Deref>(&self, blockchain: &B) -> Result<Vec<(Txid, ChannelId)>, Error>
    where
        B::Target: Blockchain,
    {
        let mut res = Vec::new();
        for (txid, watched) in &self.watched_tx {
            let confirmations = blockchain.get_transaction_confirmations(txid)?;
            if confirmations >= watched.min_depth {
                res.push((*txid, watched.channel_id));
            }
        }
        Ok(res)
    }
}
