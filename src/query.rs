//! Two-phase buffered queries.
//!
//! Every attribute retrieval against the platform has the same shape: a
//! capacity probe with no buffer, then a fetch with a buffer of exactly the
//! reported size. The platform reports both phases through [`CallResult`];
//! this module owns the interpretation of that protocol so the five resource
//! kinds (device properties, interface paths, services, characteristics,
//! descriptors and their values) share one correct implementation.

use crate::error::{Error, Result};

/// Named platform status codes used by this crate and its simulator.
pub mod status {
    pub const FILE_NOT_FOUND: i32 = 2;
    pub const ACCESS_DENIED: i32 = 5;
    pub const INVALID_HANDLE: i32 = 6;
    pub const MORE_DATA: i32 = 234;
    pub const NOT_FOUND: i32 = 1168;
}

/// Outcome of one platform query invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    /// The queried attribute set or value does not exist. An empty result,
    /// not a failure, when reported by a probe.
    NotFound,
    /// The supplied capacity is insufficient; `length` bytes are required.
    MoreData,
    /// Platform failure carrying its native status code.
    Failed(i32),
}

/// One query call's status plus the byte count it reports: bytes required
/// when probing, bytes used when fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallResult {
    pub status: CallStatus,
    pub length: usize,
}

impl CallResult {
    pub fn new(status: CallStatus, length: usize) -> Self {
        CallResult { status, length }
    }

    pub fn failed(status: i32) -> Self {
        CallResult {
            status: CallStatus::Failed(status),
            length: 0,
        }
    }
}

/// Runs a probe-then-fetch query for an attribute-style resource, where a
/// missing attribute set is an ordinary empty result.
///
/// `query` is invoked with `None` to probe and with `Some(buffer)` to fetch;
/// `call` names the resource for error messages.
///
/// Example:
///
/// ```
/// use gatt_tree::query::{read_buffered, CallResult, CallStatus};
///
/// let data: &[u8] = &[1, 2, 3];
/// let result = read_buffered("example", |buffer| match buffer {
///     None => CallResult::new(CallStatus::MoreData, data.len()),
///     Some(out) => {
///         out.copy_from_slice(data);
///         CallResult::new(CallStatus::Success, data.len())
///     }
/// });
/// assert_eq!(result.unwrap(), Some(vec![1, 2, 3]));
/// ```
pub fn read_buffered<F>(call: &'static str, mut query: F) -> Result<Option<Vec<u8>>>
where
    F: FnMut(Option<&mut [u8]>) -> CallResult,
{
    let probe = query(None);
    let required = match probe.status {
        CallStatus::NotFound => return Ok(None),
        CallStatus::Success if probe.length == 0 => return Ok(None),
        CallStatus::Success => {
            return Err(Error::UnexpectedSuccess {
                call,
                required: probe.length,
            })
        }
        CallStatus::MoreData => probe.length,
        CallStatus::Failed(status) => return Err(Error::CallFailed { call, status }),
    };

    fetch(call, required, &mut query).map(Some)
}

/// Runs a probe-then-fetch query for a registry-style resource that is
/// always present: the probe must report "buffer too small", anything else
/// is a protocol error.
pub fn read_required<F>(call: &'static str, mut query: F) -> Result<Vec<u8>>
where
    F: FnMut(Option<&mut [u8]>) -> CallResult,
{
    let probe = query(None);
    let required = match probe.status {
        CallStatus::Success => return Err(Error::BufferTooSmallExpected { call }),
        CallStatus::NotFound => {
            return Err(Error::CallFailed {
                call,
                status: status::NOT_FOUND,
            })
        }
        CallStatus::MoreData => probe.length,
        CallStatus::Failed(status) => return Err(Error::CallFailed { call, status }),
    };

    fetch(call, required, &mut query)
}

fn fetch<F>(call: &'static str, required: usize, query: &mut F) -> Result<Vec<u8>>
where
    F: FnMut(Option<&mut [u8]>) -> CallResult,
{
    let mut buffer = vec![0u8; required];
    let result = query(Some(&mut buffer));
    match result.status {
        CallStatus::Failed(status) => Err(Error::CallFailed { call, status }),
        // The attribute vanished between probe and fetch.
        CallStatus::NotFound => Err(Error::CallFailed {
            call,
            status: status::NOT_FOUND,
        }),
        CallStatus::Success | CallStatus::MoreData if result.length != required => {
            Err(Error::LengthMismatch {
                call,
                requested: required,
                actual: result.length,
            })
        }
        // Still "more data" at the probed capacity; the protocol cannot
        // terminate.
        CallStatus::MoreData => Err(Error::CallFailed {
            call,
            status: status::MORE_DATA,
        }),
        CallStatus::Success => Ok(buffer),
    }
}
