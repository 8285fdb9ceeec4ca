//! In-memory registry of the channels currently handled by a node. Temporary
//! channels are keyed by the pair of peer node id and temporary channel id,
//! since a responder may have several negotiations in flight with the same
//! peer before any of them reaches a real channel id.

use std::collections::HashMap;
use std::sync::RwLock;

use secp256k1::PublicKey;

use crate::channel::Channel;
use crate::ChannelId;

/// Shared mutable map of established and temporary channels, internally
/// synchronized. Handlers treat it as an atomic key-value store.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelId, Channel>>,
    temporary_channels: RwLock<HashMap<(PublicKey, ChannelId), Channel>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ChannelRegistry {
            channels: RwLock::new(HashMap::new()),
            temporary_channels: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a copy of the channel with the given id, if any.
    pub fn get_channel(&self, channel_id: &ChannelId) -> Option<Channel> {
        self.channels
            .read()
            .expect("Could not get read lock")
            .get(channel_id)
            .cloned()
    }

    /// Inserts or replaces the channel record for its id.
    pub fn insert_channel(&self, channel: Channel) {
        self.channels
            .write()
            .expect("Could not get write lock")
            .insert(channel.channel_id, channel);
    }

    /// Removes the channel with the given id.
    pub fn remove_channel(&self, channel_id: &ChannelId) -> Option<Channel> {
        self.channels
            .write()
            .expect("Could not get write lock")
            .remove(channel_id)
    }

    /// Returns a copy of the temporary channel negotiated with the given peer
    /// under the given temporary id, if any.
    pub fn get_temporary_channel(
        &self,
        peer: &PublicKey,
        temporary_channel_id: &ChannelId,
    ) -> Option<Channel> {
        self.temporary_channels
            .read()
            .expect("Could not get read lock")
            .get(&(*peer, *temporary_channel_id))
            .cloned()
    }

    /// Inserts or replaces a temporary channel record.
    pub fn insert_temporary_channel(&self, peer: PublicKey, channel: Channel) {
        self.temporary_channels
            .write()
            .expect("Could not get write lock")
            .insert((peer, channel.temporary_channel_id), channel);
    }

    /// Removes a temporary channel record.
    pub fn remove_temporary_channel(
        &self,
        peer: &PublicKey,
        temporary_channel_id: &ChannelId,
    ) -> Option<Channel> {
        self.temporary_channels
            .write()
            .expect("Could not get write lock")
            .remove(&(*peer, *temporary_channel_id))
    }

    /// Atomically replaces the temporary record of a channel with its record
    /// under the real, funding-derived channel id.
    pub fn promote_temporary_channel(
        &self,
        peer: &PublicKey,
        temporary_channel_id: &ChannelId,
        channel: Channel,
    ) {
        let mut temporary = self
            .temporary_channels
            .write()
            .expect("Could not get write lock");
        let mut channels = self.channels.write().expect("Could not get write lock");
        temporary.remove(&(*peer, *temporary_channel_id));
        channels.insert(channel.channel_id, channel);
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::config::{ChannelConfig, ChannelPolicy};
    use crate::channel::keys::ChannelKeySet;
    use crate::channel::ChannelState;
    use secp256k1::{Secp256k1, SecretKey};

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn test_channel(temporary_id: [u8; 32]) -> Channel {
        let keys = ChannelKeySet {
            funding_pubkey: pk(1),
            revocation_basepoint: pk(2),
            payment_basepoint: pk(3),
            delayed_payment_basepoint: pk(4),
            htlc_basepoint: pk(5),
            per_commitment_point: pk(6),
            per_commitment_index: 0,
        };
        Channel {
            channel_id: temporary_id,
            temporary_channel_id: temporary_id,
            counter_party: pk(7),
            config: ChannelConfig::from_own_policy(&ChannelPolicy::default(), 1_000_000, 2500),
            own_keys: keys,
            counter_keys: None,
            commitment_number: None,
            funding_amount: 1_000_000,
            funding_output: None,
            funding_transaction: None,
            own_balance_msat: 0,
            counter_balance_msat: 0,
            own_next_htlc_id: 0,
            counter_next_htlc_id: 0,
            pending_htlcs: Vec::new(),
            last_sent_signature: None,
            last_received_signature: None,
            is_initiator: true,
            short_channel_id: None,
            own_aliases: Vec::new(),
            counter_alias: None,
            counter_next_per_commitment_point: None,
            state: ChannelState::Opening,
        }
    }

    #[test]
    fn temporary_channels_keyed_by_peer_and_id() {
        let registry = ChannelRegistry::new();
        registry.insert_temporary_channel(pk(8), test_channel([1; 32]));
        registry.insert_temporary_channel(pk(9), test_channel([1; 32]));

        assert!(registry.get_temporary_channel(&pk(8), &[1; 32]).is_some());
        assert!(registry.get_temporary_channel(&pk(9), &[1; 32]).is_some());
        assert!(registry.get_temporary_channel(&pk(8), &[2; 32]).is_none());
    }

    #[test]
    fn promote_moves_temporary_to_real_id() {
        let registry = ChannelRegistry::new();
        let peer = pk(8);
        registry.insert_temporary_channel(peer, test_channel([1; 32]));

        let mut promoted = test_channel([1; 32]);
        promoted.channel_id = [2; 32];
        promoted.state = ChannelState::FundingCreated;
        registry.promote_temporary_channel(&peer, &[1; 32], promoted);

        assert!(registry.get_temporary_channel(&peer, &[1; 32]).is_none());
        assert!(registry.get_channel(&[2; 32]).is_some());
    }
}
