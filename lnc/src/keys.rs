//! Derivation of the per-commitment key material of a channel: commitment
//! secrets, tweaked public keys, revocation keys, and the obscured commitment
//! number encoded in the commitment transaction lock time and sequence fields.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::Sequence;
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey, Signing, Verification};

use crate::Error;

/// The highest commitment index that can be encoded in the 48 obscured bits of
/// a commitment transaction.
pub const MAX_COMMITMENT_INDEX: u64 = (1 << 48) - 1;

/// Build the commitment secret from the seed and the commitment index.
pub fn build_commitment_secret(commitment_seed: &[u8; 32], idx: u64) -> [u8; 32] {
    let mut res: [u8; 32] = *commitment_seed;
    for i in 0..48 {
        let bitpos = 47 - i;
        if idx & (1 << bitpos) == (1 << bitpos) {
            res[bitpos / 8] ^= 1 << (bitpos & 7);
            res = Sha256::hash(&res).to_byte_array();
        }
    }
    res
}

/// Derives a per-commitment private key (eg an htlc key or delayed payment
/// key) from the base secret and the per-commitment point.
pub fn derive_private_key<C: Signing>(
    secp: &Secp256k1<C>,
    per_commitment_point: &PublicKey,
    base_secret: &SecretKey,
) -> Result<SecretKey, Error> {
    let mut sha = Sha256::engine();
    sha.input(&per_commitment_point.serialize());
    sha.input(&PublicKey::from_secret_key(secp, base_secret).serialize());
    let res = Sha256::from_engine(sha).to_byte_array();

    let tweak = Scalar::from_be_bytes(res).map_err(|_| Error::InvalidArgument)?;
    Ok(base_secret.add_tweak(&tweak)?)
}

/// Derives a per-commitment public key (eg an htlc key or a delayed payment
/// key) from the base point and the per-commitment point. This is the public
/// equivalent of `derive_private_key`.
pub fn derive_public_key<C: Signing>(
    secp: &Secp256k1<C>,
    per_commitment_point: &PublicKey,
    base_point: &PublicKey,
) -> Result<PublicKey, Error> {
    let mut sha = Sha256::engine();
    sha.input(&per_commitment_point.serialize());
    sha.input(&base_point.serialize());
    let res = Sha256::from_engine(sha).to_byte_array();

    let hashkey = PublicKey::from_secret_key(
        secp,
        &SecretKey::from_slice(&res).map_err(|_| Error::InvalidArgument)?,
    );
    Ok(base_point.combine(&hashkey)?)
}

/// Derives a per-commitment revocation public key. The per-commitment point
/// comes from the party that can be punished, the revocation base point from
/// the party that would broadcast the punishment transaction.
pub fn derive_public_revocation_key<C: Verification>(
    secp: &Secp256k1<C>,
    per_commitment_point: &PublicKey,
    countersignatory_revocation_base_point: &PublicKey,
) -> Result<PublicKey, Error> {
    let rev_append_commit_hash_key = {
        let mut sha = Sha256::engine();
        sha.input(&countersignatory_revocation_base_point.serialize());
        sha.input(&per_commitment_point.serialize());
        Sha256::from_engine(sha).to_byte_array()
    };
    let commit_append_rev_hash_key = {
        let mut sha = Sha256::engine();
        sha.input(&per_commitment_point.serialize());
        sha.input(&countersignatory_revocation_base_point.serialize());
        Sha256::from_engine(sha).to_byte_array()
    };

    let countersignatory_contrib = countersignatory_revocation_base_point.mul_tweak(
        secp,
        &Scalar::from_be_bytes(rev_append_commit_hash_key).map_err(|_| Error::InvalidArgument)?,
    )?;
    let broadcaster_contrib = per_commitment_point.mul_tweak(
        secp,
        &Scalar::from_be_bytes(commit_append_rev_hash_key).map_err(|_| Error::InvalidArgument)?,
    )?;
    Ok(countersignatory_contrib.combine(&broadcaster_contrib)?)
}

/// The set of public keys used in the creation of one commitment transaction,
/// derived from the channel base points and the broadcaster's per-commitment
/// point. The key set is asymmetric and cannot be used for the counter
/// signatory's version of the transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentKeys {
    /// The broadcaster's per-commitment point used to derive the other keys.
    pub per_commitment_point: PublicKey,
    /// The key allowing the countersignatory to punish a revoked broadcast.
    pub revocation_key: PublicKey,
    /// The broadcaster's HTLC key.
    pub broadcaster_htlc_key: PublicKey,
    /// The countersignatory's HTLC key.
    pub countersignatory_htlc_key: PublicKey,
    /// The broadcaster's delayed payment key.
    pub broadcaster_delayed_payment_key: PublicKey,
}

impl CommitmentKeys {
    /// Derives the per-commitment key set for the broadcaster of a commitment
    /// transaction.
    pub fn derive_new<C: Signing + Verification>(
        secp: &Secp256k1<C>,
        per_commitment_point: &PublicKey,
        broadcaster_delayed_payment_base: &PublicKey,
        broadcaster_htlc_base: &PublicKey,
        countersignatory_revocation_base: &PublicKey,
        countersignatory_htlc_base: &PublicKey,
    ) -> Result<CommitmentKeys, Error> {
        Ok(CommitmentKeys {
            per_commitment_point: *per_commitment_point,
            revocation_key: derive_public_revocation_key(
                secp,
                per_commitment_point,
                countersignatory_revocation_base,
            )?,
            broadcaster_htlc_key: derive_public_key(
                secp,
                per_commitment_point,
                broadcaster_htlc_base,
            )?,
            countersignatory_htlc_key: derive_public_key(
                secp,
                per_commitment_point,
                countersignatory_htlc_base,
            )?,
            broadcaster_delayed_payment_key: derive_public_key(
                secp,
                per_commitment_point,
                broadcaster_delayed_payment_base,
            )?,
        })
    }
}

/// The commitment index of a channel paired with the obscuring factor derived
/// from both parties' payment base points. The obscured value is spread over
/// the lock time and the funding input sequence of the commitment transaction
/// so that the index is only recoverable by the channel parties.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommitmentNumber {
    /// The commitment index, starting at zero and increasing with every new
    /// commitment round.
    pub index: u64,
    obscure_factor: u64,
}

impl CommitmentNumber {
    /// Creates a new [`CommitmentNumber`] for the given index, computing the
    /// obscuring factor from the payment base points of the channel initiator
    /// and non-initiator.
    pub fn new(
        index: u64,
        initiator_payment_basepoint: &PublicKey,
        non_initiator_payment_basepoint: &PublicKey,
    ) -> Self {
        let mut sha = Sha256::engine();
        sha.input(&initiator_payment_basepoint.serialize());
        sha.input(&non_initiator_payment_basepoint.serialize());
        let res = Sha256::from_engine(sha).to_byte_array();

        let mut obscure_factor = 0;
        for b in res[26..].iter() {
            obscure_factor = (obscure_factor << 8) | (*b as u64);
        }

        CommitmentNumber {
            index,
            obscure_factor,
        }
    }

    /// Returns the [`CommitmentNumber`] for the next commitment round.
    pub fn next(&self) -> Self {
        CommitmentNumber {
            index: self.index + 1,
            obscure_factor: self.obscure_factor,
        }
    }

    /// The 48 bit obscured commitment number.
    pub fn obscured(&self) -> u64 {
        (self.index ^ self.obscure_factor) & MAX_COMMITMENT_INDEX
    }

    /// The lock time to set on the commitment transaction, carrying the lower
    /// 24 bits of the obscured commitment number.
    pub fn lock_time(&self) -> LockTime {
        LockTime::from_consensus((0x20 << 24) | (self.obscured() & 0xffffff) as u32)
    }

    /// The sequence to set on the funding input of the commitment transaction,
    /// carrying the upper 24 bits of the obscured commitment number.
    pub fn sequence(&self) -> Sequence {
        Sequence((0x80 << 24) | ((self.obscured() >> 24) & 0xffffff) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::hex::FromHex;
    use std::str::FromStr;

    fn pk(sk_byte: u8) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[sk_byte; 32]).unwrap())
    }

    #[test]
    fn commitment_secret_generation() {
        // Test vector for the all-zero seed ladder.
        let seed = [0u8; 32];
        let secret = build_commitment_secret(&seed, 281474976710655);
        assert_eq!(
            secret.to_vec(),
            Vec::from_hex("02a40c85b6f28da08dfdbe0926c53fab2de6d28c10301f8f7c4073d5e42e3148")
                .unwrap()
        );
    }

    #[test]
    fn key_derivation_matches_test_vector() {
        // BOLT3 key derivation test vector.
        let secp = Secp256k1::new();
        let base_secret = SecretKey::from_str(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        )
        .unwrap();
        let per_commitment_secret = SecretKey::from_str(
            "1f1e1d1c1b1a191817161514131211100f0e0d0c0b0a09080706050403020100",
        )
        .unwrap();
        let base_point = PublicKey::from_secret_key(&secp, &base_secret);
        let per_commitment_point = PublicKey::from_secret_key(&secp, &per_commitment_secret);

        let derived = derive_public_key(&secp, &per_commitment_point, &base_point).unwrap();
        assert_eq!(
            derived.to_string(),
            "0235f2dbfaa89b57ec7b055afe29849ef7ddfeb1cefdb9ebdc43f5494984db29e5"
        );

        let derived_secret =
            derive_private_key(&secp, &per_commitment_point, &base_secret).unwrap();
        assert_eq!(PublicKey::from_secret_key(&secp, &derived_secret), derived);

        let revocation = derive_public_revocation_key(&secp, &per_commitment_point, &base_point)
            .unwrap();
        assert_eq!(
            revocation.to_string(),
            "02916e326636d19c33f13e8c0c3a03dd157f332f3e99c317c141dd865eb01f8ff0"
        );
    }

    #[test]
    fn obscured_commitment_number_encoding() {
        let number = CommitmentNumber::new(42, &pk(1), &pk(2));
        let obscured = number.obscured();

        let lock_time = number.lock_time().to_consensus_u32();
        let sequence = number.sequence().0;

        assert_eq!(lock_time >> 24, 0x20);
        assert_eq!(sequence >> 24, 0x80);

        let recovered =
            ((sequence as u64 & 0xffffff) << 24) | (lock_time as u64 & 0xffffff);
        assert_eq!(recovered, obscured);

        // Same basepoints, same factor: the index is recoverable.
        let other = CommitmentNumber::new(43, &pk(1), &pk(2));
        assert_eq!(other.obscured() ^ number.obscured(), 42 ^ 43);
    }

    #[test]
    fn commitment_number_advances() {
        let number = CommitmentNumber::new(0, &pk(1), &pk(2));
        let next = number.next();
        assert_eq!(next.index, 1);
        assert_eq!(next.obscured() ^ next.index, number.obscured() ^ number.index);
    }
}
