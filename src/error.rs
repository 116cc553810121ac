use thiserror::Error;

use crate::address::{AddressParseError, BluetoothAddress};
use crate::bleuuid::BleUuid;

pub type Result<T> = core::result::Result<T, Error>;

/// Failures surfaced while retrieving or decoding a GATT attribute tree.
///
/// Empty data is deliberately *not* represented here: a missing attribute
/// set or an unavailable characteristic/descriptor value surfaces as
/// `Ok(None)` (or an empty collection) at the call site. Everything below
/// aborts the current device build.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// A probe call succeeded where only a buffer-too-small reply is valid.
    #[error("unexpected successful call to {call}")]
    BufferTooSmallExpected { call: &'static str },

    /// A probe call reported success while still announcing pending bytes.
    #[error("call to {call} reported success with {required} bytes pending")]
    UnexpectedSuccess { call: &'static str, required: usize },

    /// The platform rejected the call outright.
    #[error("error calling {call}, status={status}")]
    CallFailed { call: &'static str, status: i32 },

    /// Fetch used a different length than the probe required. The attribute
    /// set changed between the two calls; the buffer must not be trusted.
    #[error(
        "returned length {actual} does not match required length {requested} when calling {call}"
    )]
    LengthMismatch {
        call: &'static str,
        requested: usize,
        actual: usize,
    },

    /// More than one platform access path matched one device+service pair.
    #[error("more than one access path matches service {service} on device {address}")]
    AmbiguousServiceMatch {
        service: BleUuid,
        address: BluetoothAddress,
    },

    #[error(transparent)]
    AddressParse(#[from] AddressParseError),

    /// A record buffer ended before the named field set was complete.
    #[error("truncated {0} record")]
    Truncated(&'static str),

    #[error("unknown uuid encoding tag {0}")]
    UnknownUuidKind(u8),

    #[error("unknown descriptor type code {0}")]
    UnknownDescriptorType(u8),

    /// A device property expected to be text carried a different type tag.
    #[error("device property is not a text value")]
    PropertyNotText,
}
