//! #Manager a component to create channels and drive them through the
//! establishment protocol.

use std::ops::Deref;

use lnc_messages::{AcceptChannel, ChannelReady, FundingCreated, FundingSigned, Message, OpenChannel};
use log::{error, warn};
use secp256k1::rand::thread_rng;
use secp256k1::{All, PublicKey, Secp256k1};

use crate::chain_monitor::ChainMonitor;
use crate::channel::config::ChannelPolicy;
use crate::channel::Channel;
use crate::channel_updater::{
    accept_channel_open, apply_channel_ready, confirm_funding, fund_channel, initiate_channel,
    signing_info, verify_funding_created, verify_funding_signed,
};
use crate::error::Error;
use crate::registry::ChannelRegistry;
use crate::{Blockchain, ChannelId, ChannelSigner, Storage, Wallet};

/// Drives channels through the establishment protocol. All handlers for a
/// given channel run with mutual exclusion: the manager is borrowed mutably
/// for the duration of a message, and every state change is persisted before
/// the outbound message is returned to the transport layer.
pub struct ChannelManager<W: Deref, B: Deref, S: Deref, G: Deref>
where
    W::Target: Wallet,
    B::Target: Blockchain,
    S::Target: Storage,
    G::Target: ChannelSigner,
{
    wallet: W,
    blockchain: B,
    store: S,
    signer: G,
    secp: Secp256k1<All>,
    policy: ChannelPolicy,
    registry: ChannelRegistry,
    chain_monitor: ChainMonitor,
}

impl<W: Deref, B: Deref, S: Deref, G: Deref> ChannelManager<W, B, S, G>
where
    W::Target: Wallet,
    B::Target: Blockchain,
    S::Target: Storage,
    G::Target: ChannelSigner,
{
    /// Creates a new [`ChannelManager`], reloading the persisted channels and
    /// chain monitor state. Channels past the funding exchange are registered
    /// again with the signer so that the same deterministic transactions can
    /// be re-derived after a restart.
    pub fn new(
        wallet: W,
        blockchain: B,
        store: S,
        signer: G,
        policy: ChannelPolicy,
    ) -> Result<Self, Error> {
        let registry = ChannelRegistry::new();
        for channel in store.get_channels()? {
            if channel.funding_output.is_some() && channel.counter_keys.is_some() {
                signer.register_channel(channel.channel_id, signing_info(&channel)?)?;
            }
            registry.insert_channel(channel);
        }
        let chain_monitor = store.get_chain_monitor()?.unwrap_or_default();

        Ok(ChannelManager {
            wallet,
            blockchain,
            store,
            signer,
            secp: Secp256k1::new(),
            policy,
            registry,
            chain_monitor,
        })
    }

    /// Get the store from the Manager to access channels.
    pub fn get_store(&self) -> &S {
        &self.store
    }

    /// Function called to pass a protocol message to the manager. Returns the
    /// reply to send back to the peer, if any.
    pub fn on_message(
        &mut self,
        message: &Message,
        counter_party: PublicKey,
    ) -> Result<Option<Message>, Error> {
        let res = match message {
            Message::Open(o) => self.on_open_channel(o, counter_party).map(Message::Accept).map(Some),
            Message::Accept(a) => self
                .on_accept_channel(a, counter_party)
                .map(Message::FundingCreated)
                .map(Some),
            Message::FundingCreated(f) => self
                .on_funding_created(f, counter_party)
                .map(Message::FundingSigned)
                .map(Some),
            Message::FundingSigned(f) => {
                self.on_funding_signed(f, counter_party).map(|_| None)
            }
            Message::ChannelReady(c) => self.on_channel_ready(c, counter_party).map(|_| None),
            Message::Warning(w) => {
                warn!(
                    "Received warning for channel {:02x?}: {}",
                    w.channel_id, w.message
                );
                Ok(None)
            }
            Message::Error(e) => {
                error!(
                    "Received error for channel {:02x?}: {}",
                    e.channel_id, e.message
                );
                Ok(None)
            }
        };

        if let Err(e) = &res {
            match e {
                Error::Warning(w) => warn!(
                    "Warning handling message from {}: {}",
                    counter_party, w.internal_message
                ),
                _ => error!("Error handling message from {}: {}", counter_party, e),
            }
        }

        res
    }

    /// Initiates the opening of a channel with the given peer, reserving
    /// wallet coins for the funding. The returned message must be delivered
    /// to the peer.
    pub fn send_open_channel(
        &mut self,
        counter_party: PublicKey,
        funding_amount: u64,
        push_amount_msat: u64,
        fee_rate_per_kw: u64,
    ) -> Result<OpenChannel, Error> {
        let (channel, message) = initiate_channel(
            &self.policy,
            counter_party,
            funding_amount,
            push_amount_msat,
            fee_rate_per_kw,
            &self.signer,
        )?;

        self.wallet.lock_utxos_for_channel(
            &channel.temporary_channel_id,
            funding_amount,
            fee_rate_per_kw,
        )?;

        self.registry
            .insert_temporary_channel(counter_party, channel);

        Ok(message)
    }

    fn on_open_channel(
        &mut self,
        open_channel: &OpenChannel,
        counter_party: PublicKey,
    ) -> Result<AcceptChannel, Error> {
        if self
            .registry
            .get_channel(&open_channel.temporary_channel_id)
            .is_some()
        {
            return Err(Error::protocol(
                open_channel.temporary_channel_id,
                "Channel id already in use",
                "open channel for an id bound to an established channel".to_string(),
            ));
        }
        // A temporary channel still negotiating may be re-offered; any other
        // situation was excluded above.
        let (channel, accept) =
            accept_channel_open(open_channel, counter_party, &self.policy, &self.signer)?;

        self.registry
            .insert_temporary_channel(counter_party, channel);

        Ok(accept)
    }

    fn on_accept_channel(
        &mut self,
        accept_channel: &AcceptChannel,
        counter_party: PublicKey,
    ) -> Result<FundingCreated, Error> {
        let mut channel = self
            .registry
            .get_temporary_channel(&counter_party, &accept_channel.temporary_channel_id)
            .ok_or_else(|| {
                Error::protocol(
                    accept_channel.temporary_channel_id,
                    "Unknown channel",
                    "accept channel for unknown temporary channel".to_string(),
                )
            })?;

        let funding_created = match fund_channel(
            &self.secp,
            &mut channel,
            accept_channel,
            &self.policy,
            &self.signer,
            &self.wallet,
        ) {
            Ok(message) => message,
            Err(e) => {
                // A protocol error tears the channel down: release the
                // reserved coins and forget the negotiation. Local failures
                // are propagated as-is so that the message can be retried.
                if let Error::Protocol(_) = e {
                    if let Err(we) = self.unreserve_channel_utxos(&channel.temporary_channel_id) {
                        error!(
                            "Error releasing coins reserved for channel {:02x?}: {}",
                            channel.temporary_channel_id, we
                        );
                    }
                    self.registry
                        .remove_temporary_channel(&counter_party, &channel.temporary_channel_id);
                }
                return Err(e);
            }
        };

        self.store.create_channel(&channel)?;
        let temporary_channel_id = channel.temporary_channel_id;
        self.registry
            .promote_temporary_channel(&counter_party, &temporary_channel_id, channel);

        Ok(funding_created)
    }

    fn on_funding_created(
        &mut self,
        funding_created: &FundingCreated,
        counter_party: PublicKey,
    ) -> Result<FundingSigned, Error> {
        let mut channel = self
            .registry
            .get_temporary_channel(&counter_party, &funding_created.temporary_channel_id)
            .ok_or_else(|| {
                Error::protocol(
                    funding_created.temporary_channel_id,
                    "Unknown channel",
                    "funding created for unknown temporary channel".to_string(),
                )
            })?;

        let funding_signed =
            match verify_funding_created(&self.secp, &mut channel, funding_created, &self.signer) {
                Ok(message) => message,
                Err(e) => {
                    if let Error::Protocol(_) = e {
                        self.registry
                            .remove_temporary_channel(&counter_party, &channel.temporary_channel_id);
                    }
                    return Err(e);
                }
            };

        self.store.create_channel(&channel)?;
        self.chain_monitor.watch_funding(
            funding_created.funding_txid,
            channel.channel_id,
            channel.config.minimum_depth,
        );
        self.store.persist_chain_monitor(&self.chain_monitor)?;
        let temporary_channel_id = channel.temporary_channel_id;
        self.registry
            .promote_temporary_channel(&counter_party, &temporary_channel_id, channel);

        Ok(funding_signed)
    }

    fn on_funding_signed(
        &mut self,
        funding_signed: &FundingSigned,
        counter_party: PublicKey,
    ) -> Result<(), Error> {
        let mut channel = self.get_established_channel(&funding_signed.channel_id, &counter_party)?;

        verify_funding_signed(&self.secp, &mut channel, funding_signed, &self.signer)?;

        self.store.update_channel(&channel)?;
        self.registry.insert_channel(channel.clone());

        // The counterparty signature is recorded and persisted: the funding
        // transaction can now safely leave this node.
        let mut funding_transaction = channel.funding_transaction.clone().ok_or_else(|| {
            Error::InvalidState("Missing funding transaction on initiator channel".to_string())
        })?;
        let utxos = self
            .wallet
            .get_locked_utxos_for_channel(&channel.temporary_channel_id)?;
        let all_signed = self.signer.sign_funding_transaction(
            &channel.channel_id,
            &mut funding_transaction,
            &utxos,
        )?;
        if !all_signed {
            return Err(Error::SignerError(
                "Could not sign all funding transaction inputs".to_string(),
            ));
        }

        self.blockchain.send_transaction(&funding_transaction)?;
        self.chain_monitor.watch_funding(
            funding_transaction.txid(),
            channel.channel_id,
            channel.config.minimum_depth,
        );
        self.store.persist_chain_monitor(&self.chain_monitor)?;

        Ok(())
    }

    fn on_channel_ready(
        &mut self,
        channel_ready: &ChannelReady,
        counter_party: PublicKey,
    ) -> Result<(), Error> {
        let mut channel = self.get_established_channel(&channel_ready.channel_id, &counter_party)?;

        apply_channel_ready(&mut channel, channel_ready, &mut thread_rng())?;

        self.store.update_channel(&channel)?;
        self.registry.insert_channel(channel);

        Ok(())
    }

    /// Checks the confirmation state of the watched funding transactions and
    /// advances the channels whose funding reached the negotiated depth.
    /// Returns the channel ready announcements to deliver, with the peer each
    /// must go to.
    pub fn periodic_check(&mut self) -> Result<Vec<(PublicKey, Message)>, Error> {
        let mut messages = Vec::new();

        let confirmed = self.chain_monitor.newly_confirmed(&self.blockchain)?;
        for (txid, channel_id) in confirmed {
            match self.on_funding_confirmed(&channel_id) {
                Ok(channel_messages) => {
                    self.chain_monitor.remove_tx(&txid);
                    self.store.persist_chain_monitor(&self.chain_monitor)?;
                    messages.extend(channel_messages);
                }
                Err(e) => {
                    error!(
                        "Error processing confirmed funding for channel {:02x?}: {}",
                        channel_id, e
                    );
                }
            }
        }

        Ok(messages)
    }

    fn on_funding_confirmed(
        &mut self,
        channel_id: &ChannelId,
    ) -> Result<Vec<(PublicKey, Message)>, Error> {
        let mut channel = self.registry.get_channel(channel_id).ok_or_else(|| {
            Error::InvalidState("Funding confirmed for unknown channel".to_string())
        })?;

        let funding_txid = channel
            .funding_output
            .as_ref()
            .and_then(|f| f.position)
            .map(|p| p.txid)
            .ok_or_else(|| Error::InvalidState("Missing funding outpoint".to_string()))?;
        let chain_position = self.blockchain.get_transaction_position(&funding_txid)?;

        let ready_messages =
            confirm_funding(&mut channel, chain_position, &self.signer, &mut thread_rng())?;

        self.store.update_channel(&channel)?;
        let counter_party = channel.counter_party;
        self.registry.insert_channel(channel);

        Ok(ready_messages
            .into_iter()
            .map(|m| (counter_party, Message::ChannelReady(m)))
            .collect())
    }

    fn unreserve_channel_utxos(&self, channel_id: &ChannelId) -> Result<(), Error> {
        let utxos = self.wallet.get_locked_utxos_for_channel(channel_id)?;
        let outpoints: Vec<_> = utxos.iter().map(|u| u.outpoint).collect();
        self.wallet.unreserve_utxos(&outpoints)
    }

    fn get_established_channel(
        &self,
        channel_id: &ChannelId,
        counter_party: &PublicKey,
    ) -> Result<Channel, Error> {
        let channel = self.registry.get_channel(channel_id).ok_or_else(|| {
            Error::protocol(
                *channel_id,
                "Unknown channel",
                "message for unknown channel".to_string(),
            )
        })?;
        if channel.counter_party != *counter_party {
            return Err(Error::protocol(
                *channel_id,
                "Unknown channel",
                "message from a peer not party to the channel".to_string(),
            ));
        }
        Ok(channel)
    }
}
