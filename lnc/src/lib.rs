//! # Rust LNC Library
//! Library for creating, signing and verifying the funding and commitment
//! transactions of two-party Lightning-style payment channels.

#![crate_name = "lnc"]
// Coding conventions
#![forbid(unsafe_code)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(missing_docs)]

extern crate bitcoin;
extern crate core;
extern crate secp256k1;

use std::fmt;

pub mod builder;
pub mod commitment;
pub mod funding;
pub mod htlc;
pub mod keys;
pub mod outputs;
pub mod scripts;
pub mod util;

/// The transaction version used for all channel transactions.
const TX_VERSION: i32 = 2;

/// Weight of the parts of a transaction that do not depend on its inputs and
/// outputs: version (4) + lock time (4) + input and output counts (1 + 1),
/// all non-witness, plus the segwit marker and flag bytes.
pub const TX_BASE_WEIGHT: usize = 42;

/// The base weight of a transaction input computed as:
/// (outpoint(36) + sequence(4) + scriptSigLength(1)) * 4.
pub const TX_INPUT_BASE_WEIGHT: usize = 164;

/// The witness weight of a P2WPKH input: signature (73) + compressed public
/// key (34).
pub const P2WPKH_WITNESS_WEIGHT: usize = 107;

/// The witness weight of a 2-of-2 multisig witness input: empty item (1) +
/// two signatures (73 each) + witness script (72 including its size byte).
pub const FUNDING_SPEND_WITNESS_WEIGHT: usize = 220;

/// The script sig size of a pre-segwit P2PKH input: signature (73) + public
/// key (34).
pub const P2PKH_SCRIPT_SIG_SIZE: usize = 107;

/// Base weight of a commitment transaction without anchor outputs.
pub const COMMITMENT_TX_BASE_WEIGHT: usize = 724;

/// Base weight of a commitment transaction carrying the two anchor outputs.
pub const COMMITMENT_TX_BASE_WEIGHT_ANCHORS: usize = 1124;

/// Weight added to a commitment transaction for each untrimmed HTLC output.
pub const COMMITMENT_TX_WEIGHT_PER_HTLC: usize = 172;

/// The amount locked in each anchor output.
pub const ANCHOR_OUTPUT_VALUE: u64 = 330;

/// Returns the base weight of a commitment transaction.
pub fn commitment_tx_base_weight(anchors: bool) -> usize {
    if anchors {
        COMMITMENT_TX_BASE_WEIGHT_ANCHORS
    } else {
        COMMITMENT_TX_BASE_WEIGHT
    }
}

/// Returns the weight of an HTLC-timeout transaction, spending an offered
/// HTLC output on the broadcaster's commitment transaction.
pub fn htlc_timeout_tx_weight(anchors: bool) -> usize {
    if anchors {
        666
    } else {
        663
    }
}

/// Returns the weight of an HTLC-success transaction, spending a received
/// HTLC output on the broadcaster's commitment transaction.
pub fn htlc_success_tx_weight(anchors: bool) -> usize {
    if anchors {
        706
    } else {
        703
    }
}

/// An error code.
#[derive(Copy, PartialEq, Eq, Clone, Debug)]
pub enum Error {
    /// Secp256k1 error
    Secp256k1(secp256k1::Error),
    /// An invalid argument was provided
    InvalidArgument,
    /// An error occurred computing a signature hash
    Sighash,
    /// The transaction was already finalized and can no longer be mutated
    AlreadyFinalized,
    /// The transaction was not finalized yet
    NotFinalized,
    /// The transaction outputs and fee exceed the value of its inputs
    InsufficientInputAmount,
}

impl From<secp256k1::Error> for Error {
    fn from(error: secp256k1::Error) -> Error {
        Error::Secp256k1(error)
    }
}

impl From<bitcoin::sighash::Error> for Error {
    fn from(_: bitcoin::sighash::Error) -> Error {
        Error::Sighash
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Secp256k1(ref e) => write!(f, "Secp256k1 error {}", e),
            Error::InvalidArgument => write!(f, "Invalid argument"),
            Error::Sighash => write!(f, "Error computing signature hash"),
            Error::AlreadyFinalized => write!(f, "Transaction is already finalized"),
            Error::NotFinalized => write!(f, "Transaction is not finalized"),
            Error::InsufficientInputAmount => {
                write!(f, "Transaction outputs and fee exceed input amount")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Secp256k1(e) => Some(e),
            _ => None,
        }
    }
}
