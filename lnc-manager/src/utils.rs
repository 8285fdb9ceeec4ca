use bitcoin::hashes::Hash;
use bitcoin::Txid;
use lnc_messages::ShortChannelId;
use secp256k1::rand::{thread_rng, Rng};

use crate::ChannelId;

/// The number of aliases minted for a channel is picked uniformly in this
/// inclusive range.
pub(crate) const MIN_ALIAS_COUNT: usize = 2;
pub(crate) const MAX_ALIAS_COUNT: usize = 5;

pub(crate) fn get_new_temporary_id() -> ChannelId {
    thread_rng().gen::<[u8; 32]>()
}

/// The real channel id is the funding transaction id with the funding output
/// index folded into its last two bytes.
pub(crate) fn compute_channel_id(funding_txid: &Txid, funding_output_index: u16) -> ChannelId {
    let mut res = funding_txid.to_byte_array();
    res[30] ^= (funding_output_index >> 8) as u8;
    res[31] ^= (funding_output_index & 0xff) as u8;
    res
}

pub(crate) fn generate_alias_batch<R: Rng>(rng: &mut R) -> Vec<ShortChannelId> {
    let count = rng.gen_range(MIN_ALIAS_COUNT..=MAX_ALIAS_COUNT);
    (0..count)
        .map(|_| ShortChannelId::random_alias(rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::rand::rngs::mock::StepRng;

    #[test]
    fn channel_id_folds_output_index() {
        let txid = Txid::all_zeros();
        let id = compute_channel_id(&txid, 0x0102);
        assert_eq!(id[30], 0x01);
        assert_eq!(id[31], 0x02);
        assert_eq!(&id[..30], &[0; 30]);

        // Index zero leaves the txid unchanged.
        assert_eq!(compute_channel_id(&txid, 0), txid.to_byte_array());
    }

    #[test]
    fn alias_batch_size_is_bounded() {
        let mut rng = StepRng::new(7, 11);
        for _ in 0..10 {
            let batch = generate_alias_batch(&mut rng);
            assert!((MIN_ALIAS_COUNT..=MAX_ALIAS_COUNT).contains(&batch.len()));
        }
    }
}
