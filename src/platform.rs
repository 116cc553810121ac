//! Traits abstracting the host Bluetooth stack.
//!
//! Everything the tree builder needs from the operating system goes through
//! [`DeviceEnumerator`] and [`GattPlatform`]. All attribute queries use the
//! two-phase buffered protocol from [`crate::query`]: called with `None`
//! they report the required capacity, called with `Some(buffer)` they fill
//! it. The [`crate::sim`] module provides an in-memory implementation.

use crate::bleuuid::BleUuid;
use crate::error::Result;
use crate::query::CallResult;

/// A device surfaced by enumeration, identified by its platform access path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub path: String,
}

/// Requested access level when opening a device or service path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    ReadWrite,
}

/// An open platform handle. Deliberately not `Copy`; it is consumed by
/// [`GattPlatform::close`] so a handle cannot be used after release.
#[derive(Debug, PartialEq, Eq)]
pub struct AccessHandle(pub u64);

/// Properties readable from the device registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProperty {
    FriendlyName,
}

/// Walks the set of BLE devices known to the platform.
pub trait DeviceEnumerator {
    /// Returns the next device, or `None` once the set is exhausted.
    fn next_device(&mut self) -> Result<Option<DeviceCandidate>>;
}

/// Attribute-level access to one Bluetooth stack.
///
/// The buffered methods follow one convention: `buffer` of `None` is a
/// capacity probe, `Some` is the fetch. Services, characteristics and
/// descriptors are addressed by the 16-bit attribute handle of their parent.
pub trait GattPlatform {
    /// Device instance id (registry form, address embedded). Text record,
    /// always present.
    fn instance_id(&mut self, path: &str, buffer: Option<&mut [u8]>) -> CallResult;

    /// A registry property of the device. Text property record.
    fn device_property(
        &mut self,
        path: &str,
        property: DeviceProperty,
        buffer: Option<&mut [u8]>,
    ) -> CallResult;

    /// The `index`-th access path registered for a service class, across
    /// all devices. `NotFound` past the end. Text record.
    fn service_path_at(
        &mut self,
        service: BleUuid,
        index: usize,
        buffer: Option<&mut [u8]>,
    ) -> CallResult;

    fn open(&mut self, path: &str, access: Access) -> Result<AccessHandle>;

    fn close(&mut self, handle: AccessHandle);

    /// Service records of an open device.
    fn services(&mut self, handle: &AccessHandle, buffer: Option<&mut [u8]>) -> CallResult;

    /// Characteristic records under one service attribute handle.
    fn characteristics(
        &mut self,
        handle: &AccessHandle,
        service_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult;

    /// Descriptor records under one characteristic attribute handle.
    fn descriptors(
        &mut self,
        handle: &AccessHandle,
        characteristic_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult;

    /// Current value of a characteristic, raw bytes.
    fn characteristic_value(
        &mut self,
        handle: &AccessHandle,
        characteristic_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult;

    /// Current value of a descriptor, as a descriptor value record.
    fn descriptor_value(
        &mut self,
        handle: &AccessHandle,
        descriptor_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult;

    /// Writes a characteristic value. The handle must have been opened
    /// with [`Access::ReadWrite`].
    fn write_characteristic(
        &mut self,
        handle: &AccessHandle,
        characteristic_handle: u16,
        data: &[u8],
    ) -> Result<()>;
}
