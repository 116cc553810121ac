//! 48-bit Bluetooth device addresses.
//!
//! The canonical text form is 12 uppercase hex characters with the byte
//! order reversed relative to storage: stored bytes `[01 02 03 04 05 06]`
//! print as `"060504030201"`. Platform access paths embed the same digits in
//! lower case, which is what `to_lower_hex` is for.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("bluetooth address length is incorrect ({0} hex characters, expected 12)")]
    WrongLength(usize),
    #[error("bluetooth address contains invalid characters")]
    InvalidHex,
    #[error("device instance id does not seem to contain a bluetooth address")]
    NoAddressInInstanceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BluetoothAddress([u8; 6]);

impl BluetoothAddress {
    /// The reserved all-zero address a `DeviceInfo` starts out with.
    pub const NULL: BluetoothAddress = BluetoothAddress([0; 6]);

    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        BluetoothAddress(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Lowercase variant of the canonical form, used to match platform
    /// access paths.
    pub fn to_lower_hex(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// Extracts the address embedded in a device instance id: the substring
    /// between the first `_` and the `\` that follows it.
    ///
    /// ```
    /// use gatt_tree::address::BluetoothAddress;
    ///
    /// let address =
    ///     BluetoothAddress::from_instance_id(r"BTHLE\DEV_C4BE84702F1A\8&2D0E7D5E&0").unwrap();
    /// assert_eq!(address.to_string(), "C4BE84702F1A");
    /// ```
    pub fn from_instance_id(id: &str) -> Result<Self, AddressParseError> {
        let start = id
            .find('_')
            .ok_or(AddressParseError::NoAddressInInstanceId)?
            + 1;
        let end = id[start..]
            .find('\\')
            .ok_or(AddressParseError::NoAddressInInstanceId)?
            + start;
        id[start..end].parse()
    }
}

impl Default for BluetoothAddress {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for BluetoothAddress {
    type Err = AddressParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != 12 {
            return Err(AddressParseError::WrongLength(value.len()));
        }

        let mut bytes = [0u8; 6];
        for (index, chunk) in value.as_bytes().chunks(2).enumerate() {
            // from_str_radix also accepts a sign; only bare hex digits are
            // valid here.
            if !chunk.iter().all(u8::is_ascii_hexdigit) {
                return Err(AddressParseError::InvalidHex);
            }
            let pair = core::str::from_utf8(chunk).map_err(|_| AddressParseError::InvalidHex)?;
            bytes[5 - index] =
                u8::from_str_radix(pair, 16).map_err(|_| AddressParseError::InvalidHex)?;
        }
        Ok(BluetoothAddress(bytes))
    }
}

impl Serialize for BluetoothAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
