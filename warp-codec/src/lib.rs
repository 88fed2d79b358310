//! Warp Message Codec Library
//!
//! This crate implements the binary wire format exchanged between the EVM-style
//! chain and the native ledger chain: the unsigned message envelope, the
//! addressed-call wrapper, and the typed validator-lifecycle payloads
//! (registration, weight update, registration acknowledgement, and
//! subnet-conversion).
//!
//! All multi-byte integers are big-endian and fixed-width; every
//! variable-length field is preceded by an explicit 4-byte length. Parsing is
//! total: it never reads past declared length fields and reports every
//! structural violation as a typed [`CodecError`].

pub mod addressed_call;
pub mod conversion;
pub mod envelope;
pub mod error;
pub mod payload;

mod reader;

// Re-export commonly used types
pub use addressed_call::{AddressedCall, ADDRESSED_CALL_TYPE_ID};
pub use conversion::{
    ConversionValidator, SubnetToL1ConversionData, SubnetToL1ConversionMessage,
};
pub use envelope::{UnsignedMessage, CODEC_VERSION};
pub use error::CodecError;
pub use payload::{
    L1ValidatorRegistrationMessage, L1ValidatorWeightMessage, PChainOwner,
    RegisterL1ValidatorMessage,
};
