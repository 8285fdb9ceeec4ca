//! The per-party channel key set: static base points plus the rotating
//! per-commitment point, with derivation of the per-commitment key set used
//! by the transaction builders.

use lnc::keys::{derive_public_key, CommitmentKeys};
use lnc_messages::ChannelPublicKeys;
use secp256k1::{All, PublicKey, Secp256k1};

use crate::error::Error;

/// The key material of one party of a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelKeySet {
    /// The public key used in the 2-of-2 funding output.
    pub funding_pubkey: PublicKey,
    /// The base point used to derive revocation keys.
    pub revocation_basepoint: PublicKey,
    /// The base point receiving the party's balance on the remote commitment.
    pub payment_basepoint: PublicKey,
    /// The base point used to derive delayed payment keys.
    pub delayed_payment_basepoint: PublicKey,
    /// The base point used to derive HTLC keys.
    pub htlc_basepoint: PublicKey,
    /// The current per-commitment point of the party.
    pub per_commitment_point: PublicKey,
    /// The index of the current per-commitment point, monotonically
    /// increasing over the lifetime of the channel.
    pub per_commitment_index: u64,
}

impl ChannelKeySet {
    /// Creates a [`ChannelKeySet`] from the public keys revealed in a channel
    /// negotiation message.
    pub fn from_public_keys(keys: &ChannelPublicKeys) -> Self {
        ChannelKeySet {
            funding_pubkey: keys.funding_pubkey,
            revocation_basepoint: keys.revocation_basepoint,
            payment_basepoint: keys.payment_basepoint,
            delayed_payment_basepoint: keys.delayed_payment_basepoint,
            htlc_basepoint: keys.htlc_basepoint,
            per_commitment_point: keys.first_per_commitment_point,
            per_commitment_index: 0,
        }
    }

    /// The public keys to reveal in a channel negotiation message.
    pub fn public_keys(&self) -> ChannelPublicKeys {
        ChannelPublicKeys {
            funding_pubkey: self.funding_pubkey,
            revocation_basepoint: self.revocation_basepoint,
            payment_basepoint: self.payment_basepoint,
            delayed_payment_basepoint: self.delayed_payment_basepoint,
            htlc_basepoint: self.htlc_basepoint,
            first_per_commitment_point: self.per_commitment_point,
        }
    }

    /// Derives the per-commitment key set for the commitment transaction this
    /// party can broadcast, given the counter party's key set.
    pub fn commitment_keys(
        &self,
        secp: &Secp256k1<All>,
        countersignatory: &ChannelKeySet,
    ) -> Result<CommitmentKeys, Error> {
        Ok(CommitmentKeys::derive_new(
            secp,
            &self.per_commitment_point,
            &self.delayed_payment_basepoint,
            &self.htlc_basepoint,
            &countersignatory.revocation_basepoint,
            &countersignatory.htlc_basepoint,
        )?)
    }

    /// Derives the key paying the counter party's balance on this party's
    /// commitment transaction.
    pub fn countersignatory_payment_key(
        &self,
        secp: &Secp256k1<All>,
        countersignatory: &ChannelKeySet,
    ) -> Result<PublicKey, Error> {
        Ok(derive_public_key(
            secp,
            &self.per_commitment_point,
            &countersignatory.payment_basepoint,
        )?)
    }

    /// Rotates the per-commitment point.
    pub fn advance(&mut self, next_per_commitment_point: PublicKey) {
        self.per_commitment_point = next_per_commitment_point;
        self.per_commitment_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::SecretKey;

    fn pk(byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[byte; 32]).unwrap())
    }

    fn key_set(base: u8) -> ChannelKeySet {
        ChannelKeySet {
            funding_pubkey: pk(base),
            revocation_basepoint: pk(base + 1),
            payment_basepoint: pk(base + 2),
            delayed_payment_basepoint: pk(base + 3),
            htlc_basepoint: pk(base + 4),
            per_commitment_point: pk(base + 5),
            per_commitment_index: 0,
        }
    }

    #[test]
    fn public_keys_round_trip() {
        let keys = key_set(1);
        assert_eq!(ChannelKeySet::from_public_keys(&keys.public_keys()), keys);
    }

    #[test]
    fn advance_rotates_point_and_index() {
        let mut keys = key_set(1);
        keys.advance(pk(42));
        assert_eq!(keys.per_commitment_point, pk(42));
        assert_eq!(keys.per_commitment_index, 1);
    }

    #[test]
    fn commitment_keys_are_asymmetric() {
        let secp = Secp256k1::new();
        let own = key_set(1);
        let counter = key_set(10);
        let own_keys = own.commitment_keys(&secp, &counter).unwrap();
        let counter_keys = counter.commitment_keys(&secp, &own).unwrap();
        assert_ne!(own_keys, counter_keys);
    }
}
