#![allow(dead_code)]
#![allow(unused_macros)]

extern crate lnc_manager;
extern crate mocks;

use std::rc::Rc;

use lnc_manager::channel::config::ChannelPolicy;
use lnc_manager::manager::ChannelManager;
use mocks::memory_storage_provider::MemoryStorage;
use mocks::mock_blockchain::MockBlockchain;
use mocks::mock_signer::MockSigner;
use mocks::mock_wallet::MockWallet;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

pub const FUNDING_AMOUNT: u64 = 1_000_000;
pub const PUSH_AMOUNT_MSAT: u64 = 10_000_000;
pub const FEE_RATE_PER_KW: u64 = 2500;

pub type TestManager =
    ChannelManager<Rc<MockWallet>, Rc<MockBlockchain>, Rc<MemoryStorage>, Rc<MockSigner>>;

pub struct TestNode {
    pub manager: TestManager,
    pub store: Rc<MemoryStorage>,
}

pub fn node_id(byte: u8) -> PublicKey {
    let secp = Secp256k1::new();
    PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
}

pub fn create_node(seed: u8, blockchain: &Rc<MockBlockchain>, policy: ChannelPolicy) -> TestNode {
    let wallet = Rc::new(MockWallet::new(10));
    let store = Rc::new(MemoryStorage::new());
    let signer = Rc::new(MockSigner::new([seed; 32]));
    let manager = ChannelManager::new(
        wallet,
        Rc::clone(blockchain),
        Rc::clone(&store),
        signer,
        policy,
    )
    .expect("to create the channel manager");
    TestNode { manager, store }
}

macro_rules! assert_channel_state {
    ($node:expr, $channel_id:expr, $state:ident) => {
        let channel = $node
            .store
            .get_channel(&$channel_id)
            .expect("Could not retrieve channel")
            .expect("Channel not found in store");
        assert_eq!(
            channel.state,
            lnc_manager::channel::ChannelState::$state,
            "unexpected channel state {}",
            channel.state
        );
    };
}
