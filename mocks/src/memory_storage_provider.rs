use lnc_manager::chain_monitor::ChainMonitor;
use lnc_manager::channel::Channel;
use lnc_manager::error::{Error as DaemonError, StorageError};
use lnc_manager::{ChannelId, Storage};
use std::collections::HashMap;
use std::sync::RwLock;

/// An in-memory [`Storage`] implementation.
pub struct MemoryStorage {
    channels: RwLock<HashMap<ChannelId, Channel>>,
    chain_monitor: RwLock<Option<ChainMonitor>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            channels: RwLock::new(HashMap::new()),
            chain_monitor: RwLock::new(None),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>, DaemonError> {
        let map = self.channels.read().expect("Could not get read lock");
        Ok(map.get(channel_id).cloned())
    }

    fn get_channels(&self) -> Result<Vec<Channel>, DaemonError> {
        Ok(self
            .channels
            .read()
            .expect("Could not get read lock")
            .values()
            .cloned()
            .collect())
    }

    fn create_channel(&self, channel: &Channel) -> Result<(), DaemonError> {
        let mut map = self.channels.write().expect("Could not get write lock");
        if map.contains_key(&channel.channel_id) {
            return Err(DaemonError::StorageError(StorageError::AlreadyExists));
        }
        map.insert(channel.channel_id, channel.clone());
        Ok(())
    }

    fn update_channel(&self, channel: &Channel) -> Result<(), DaemonError> {
        let mut map = self.channels.write().expect("Could not get write lock");
        if !map.contains_key(&channel.channel_id) {
            return Err(DaemonError::StorageError(StorageError::NotFound));
        }
        map.insert(channel.channel_id, channel.clone());
        Ok(())
    }

    fn persist_chain_monitor(&self, monitor: &ChainMonitor) -> Result<(), DaemonError> {
        *self
            .chain_monitor
            .write()
            .expect("Could not get write lock") = Some(monitor.clone());
        Ok(())
    }

    fn get_chain_monitor(&self) -> Result<Option<ChainMonitor>, DaemonError> {
        Ok(self
            .chain_monitor
            .read()
            .expect("Could not get read lock")
            .clone())
    }
}
