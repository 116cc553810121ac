//! In-memory platform for demos and tests.
//!
//! `SimPlatform` answers the buffered query protocol from a fixture of
//! devices built with the `Sim*` types. It tracks open handles and
//! characteristic writes so tests can assert on resource hygiene, and it
//! can inject targeted faults into the services query.

use std::collections::{HashMap, VecDeque};

use crate::bleuuid::BleUuid;
use crate::error::{Error, Result};
use crate::platform::{
    Access, AccessHandle, DeviceCandidate, DeviceEnumerator, DeviceProperty, GattPlatform,
};
use crate::query::{status, CallResult, CallStatus};
use crate::records::{
    self, CharacteristicRecord, DescriptorRecord, DescriptorValueRecord, ServiceRecord,
};
use crate::tree::{CharacteristicProperties, DescriptorKind};

#[derive(Debug, Clone)]
pub struct SimDescriptor {
    pub kind: DescriptorKind,
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    pub characteristic_handle: u16,
    pub value: Option<Vec<u8>>,
}

impl SimDescriptor {
    pub fn new(
        kind: DescriptorKind,
        uuid: BleUuid,
        attribute_handle: u16,
        characteristic_handle: u16,
    ) -> Self {
        SimDescriptor {
            kind,
            uuid,
            attribute_handle,
            characteristic_handle,
            value: None,
        }
    }

    pub fn with_value(mut self, value: &[u8]) -> Self {
        self.value = Some(value.to_vec());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SimCharacteristic {
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    pub value_handle: u16,
    pub properties: CharacteristicProperties,
    pub value: Option<Vec<u8>>,
    pub descriptors: Vec<SimDescriptor>,
}

impl SimCharacteristic {
    pub fn new(
        uuid: BleUuid,
        attribute_handle: u16,
        properties: CharacteristicProperties,
    ) -> Self {
        SimCharacteristic {
            uuid,
            attribute_handle,
            value_handle: attribute_handle + 1,
            properties,
            value: None,
            descriptors: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: &[u8]) -> Self {
        self.value = Some(value.to_vec());
        self
    }

    pub fn with_descriptor(mut self, descriptor: SimDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SimService {
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    /// Access path registered for this service instance, when any.
    pub path: Option<String>,
    pub characteristics: Vec<SimCharacteristic>,
}

impl SimService {
    pub fn new(uuid: BleUuid, attribute_handle: u16) -> Self {
        SimService {
            uuid,
            attribute_handle,
            path: None,
            characteristics: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_characteristic(mut self, characteristic: SimCharacteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SimDevice {
    pub path: String,
    pub instance_id: String,
    pub friendly_name: String,
    pub services: Vec<SimService>,
}

impl SimDevice {
    pub fn new(path: &str, instance_id: &str, friendly_name: &str) -> Self {
        SimDevice {
            path: path.to_string(),
            instance_id: instance_id.to_string(),
            friendly_name: friendly_name.to_string(),
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: SimService) -> Self {
        self.services.push(service);
        self
    }
}

/// Targeted misbehavior for failure-path tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The services fetch reports one byte fewer than the probe required.
    ServicesLengthMismatch,
    /// The services query fails outright with this status code.
    ServicesFailed(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub characteristic_handle: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct SimPlatform {
    devices: Vec<SimDevice>,
    handles: HashMap<u64, usize>,
    handle_access: HashMap<u64, Access>,
    next_handle: u64,
    fault: Option<Fault>,
    writes: Vec<WriteRecord>,
}

impl SimPlatform {
    pub fn new() -> Self {
        SimPlatform::default()
    }

    pub fn add_device(&mut self, device: SimDevice) {
        self.devices.push(device);
    }

    pub fn set_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Enumerator over every registered device, in insertion order.
    pub fn enumerator(&self) -> SimEnumerator {
        SimEnumerator {
            queue: self
                .devices
                .iter()
                .map(|device| DeviceCandidate {
                    path: device.path.clone(),
                })
                .collect(),
        }
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Characteristic writes observed so far, oldest first.
    pub fn writes(&self) -> &[WriteRecord] {
        &self.writes
    }

    fn device_by_path(&self, path: &str) -> Option<usize> {
        self.devices.iter().position(|device| {
            device.path == path
                || device
                    .services
                    .iter()
                    .any(|service| service.path.as_deref() == Some(path))
        })
    }

    fn device_for(&self, handle: &AccessHandle) -> Option<&SimDevice> {
        self.handles
            .get(&handle.0)
            .map(|&index| &self.devices[index])
    }

    fn characteristic(
        device: &SimDevice,
        characteristic_handle: u16,
    ) -> Option<&SimCharacteristic> {
        device
            .services
            .iter()
            .flat_map(|service| service.characteristics.iter())
            .find(|characteristic| characteristic.attribute_handle == characteristic_handle)
    }
}

/// Serves optional data through the lenient probe-and-fetch convention.
fn serve(data: Option<&[u8]>, buffer: Option<&mut [u8]>) -> CallResult {
    let data = match data {
        Some(data) => data,
        None => return CallResult::new(CallStatus::NotFound, 0),
    };
    serve_present(data, buffer)
}

/// Serves data that is always present: the probe reports the required
/// capacity even for empty data.
fn serve_required(data: &[u8], buffer: Option<&mut [u8]>) -> CallResult {
    match buffer {
        None => CallResult::new(CallStatus::MoreData, data.len()),
        Some(buffer) => fill(data, buffer),
    }
}

fn serve_present(data: &[u8], buffer: Option<&mut [u8]>) -> CallResult {
    match buffer {
        None if data.is_empty() => CallResult::new(CallStatus::Success, 0),
        None => CallResult::new(CallStatus::MoreData, data.len()),
        Some(buffer) => fill(data, buffer),
    }
}

fn fill(data: &[u8], buffer: &mut [u8]) -> CallResult {
    if buffer.len() < data.len() {
        return CallResult::new(CallStatus::MoreData, data.len());
    }
    buffer[..data.len()].copy_from_slice(data);
    CallResult::new(CallStatus::Success, data.len())
}

impl GattPlatform for SimPlatform {
    fn instance_id(&mut self, path: &str, buffer: Option<&mut [u8]>) -> CallResult {
        match self.device_by_path(path) {
            Some(index) => {
                let mut encoded = Vec::new();
                records::encode_text(&mut encoded, &self.devices[index].instance_id);
                serve_required(&encoded, buffer)
            }
            None => CallResult::failed(status::FILE_NOT_FOUND),
        }
    }

    fn device_property(
        &mut self,
        path: &str,
        property: DeviceProperty,
        buffer: Option<&mut [u8]>,
    ) -> CallResult {
        let DeviceProperty::FriendlyName = property;
        match self.device_by_path(path) {
            Some(index) => {
                let mut encoded = Vec::new();
                records::encode_text_property(&mut encoded, &self.devices[index].friendly_name);
                serve_required(&encoded, buffer)
            }
            None => CallResult::failed(status::FILE_NOT_FOUND),
        }
    }

    fn service_path_at(
        &mut self,
        service: BleUuid,
        index: usize,
        buffer: Option<&mut [u8]>,
    ) -> CallResult {
        // The platform service registry keys on the expanded 128-bit value.
        let path = self
            .devices
            .iter()
            .flat_map(|device| device.services.iter())
            .filter(|candidate| candidate.uuid.expanded() == service.expanded())
            .filter_map(|candidate| candidate.path.as_deref())
            .nth(index);
        match path {
            Some(path) => {
                let mut encoded = Vec::new();
                records::encode_text(&mut encoded, path);
                serve_present(&encoded, buffer)
            }
            None => CallResult::new(CallStatus::NotFound, 0),
        }
    }

    fn open(&mut self, path: &str, access: Access) -> Result<AccessHandle> {
        let index = self.device_by_path(path).ok_or(Error::CallFailed {
            call: "open",
            status: status::FILE_NOT_FOUND,
        })?;
        self.next_handle += 1;
        self.handles.insert(self.next_handle, index);
        self.handle_access.insert(self.next_handle, access);
        Ok(AccessHandle(self.next_handle))
    }

    fn close(&mut self, handle: AccessHandle) {
        self.handles.remove(&handle.0);
        self.handle_access.remove(&handle.0);
    }

    fn services(&mut self, handle: &AccessHandle, buffer: Option<&mut [u8]>) -> CallResult {
        if let Some(Fault::ServicesFailed(code)) = self.fault {
            return CallResult::failed(code);
        }
        let device = match self.device_for(handle) {
            Some(device) => device,
            None => return CallResult::failed(status::INVALID_HANDLE),
        };

        let mut encoded = Vec::new();
        for service in &device.services {
            records::encode_service(
                &mut encoded,
                &ServiceRecord {
                    uuid: service.uuid,
                    attribute_handle: service.attribute_handle,
                },
            );
        }

        let result = serve_present(&encoded, buffer);
        if self.fault == Some(Fault::ServicesLengthMismatch)
            && result.status == CallStatus::Success
            && result.length > 0
        {
            return CallResult::new(CallStatus::Success, result.length - 1);
        }
        result
    }

    fn characteristics(
        &mut self,
        handle: &AccessHandle,
        service_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult {
        let device = match self.device_for(handle) {
            Some(device) => device,
            None => return CallResult::failed(status::INVALID_HANDLE),
        };
        let service = device
            .services
            .iter()
            .find(|service| service.attribute_handle == service_handle);
        let service = match service {
            Some(service) => service,
            None => return CallResult::new(CallStatus::NotFound, 0),
        };

        let mut encoded = Vec::new();
        for characteristic in &service.characteristics {
            records::encode_characteristic(
                &mut encoded,
                &CharacteristicRecord {
                    uuid: characteristic.uuid,
                    attribute_handle: characteristic.attribute_handle,
                    value_handle: characteristic.value_handle,
                    properties: characteristic.properties.bits(),
                },
            );
        }
        serve_present(&encoded, buffer)
    }

    fn descriptors(
        &mut self,
        handle: &AccessHandle,
        characteristic_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult {
        let device = match self.device_for(handle) {
            Some(device) => device,
            None => return CallResult::failed(status::INVALID_HANDLE),
        };
        let characteristic = match Self::characteristic(device, characteristic_handle) {
            Some(characteristic) => characteristic,
            None => return CallResult::new(CallStatus::NotFound, 0),
        };

        let mut encoded = Vec::new();
        for descriptor in &characteristic.descriptors {
            records::encode_descriptor(
                &mut encoded,
                &DescriptorRecord {
                    kind: descriptor.kind.code(),
                    uuid: descriptor.uuid,
                    attribute_handle: descriptor.attribute_handle,
                    characteristic_handle: descriptor.characteristic_handle,
                },
            );
        }
        serve_present(&encoded, buffer)
    }

    fn characteristic_value(
        &mut self,
        handle: &AccessHandle,
        characteristic_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult {
        let device = match self.device_for(handle) {
            Some(device) => device,
            None => return CallResult::failed(status::INVALID_HANDLE),
        };
        let value = Self::characteristic(device, characteristic_handle)
            .and_then(|characteristic| characteristic.value.as_deref());
        serve(value, buffer)
    }

    fn descriptor_value(
        &mut self,
        handle: &AccessHandle,
        descriptor_handle: u16,
        buffer: Option<&mut [u8]>,
    ) -> CallResult {
        let device = match self.device_for(handle) {
            Some(device) => device,
            None => return CallResult::failed(status::INVALID_HANDLE),
        };
        let descriptor = device
            .services
            .iter()
            .flat_map(|service| service.characteristics.iter())
            .flat_map(|characteristic| characteristic.descriptors.iter())
            .find(|descriptor| descriptor.attribute_handle == descriptor_handle);

        let encoded = descriptor.and_then(|descriptor| {
            descriptor.value.as_ref().map(|value| {
                let mut out = Vec::new();
                records::encode_descriptor_value(
                    &mut out,
                    &DescriptorValueRecord {
                        kind: descriptor.kind.code(),
                        uuid: descriptor.uuid,
                        data: value.clone(),
                    },
                );
                out
            })
        });
        serve(encoded.as_deref(), buffer)
    }

    fn write_characteristic(
        &mut self,
        handle: &AccessHandle,
        characteristic_handle: u16,
        data: &[u8],
    ) -> Result<()> {
        match self.handle_access.get(&handle.0) {
            Some(Access::ReadWrite) => {}
            Some(Access::Read) => {
                return Err(Error::CallFailed {
                    call: "write characteristic",
                    status: status::ACCESS_DENIED,
                })
            }
            None => {
                return Err(Error::CallFailed {
                    call: "write characteristic",
                    status: status::INVALID_HANDLE,
                })
            }
        }

        let device = self.device_for(handle).ok_or(Error::CallFailed {
            call: "write characteristic",
            status: status::INVALID_HANDLE,
        })?;
        if Self::characteristic(device, characteristic_handle).is_none() {
            return Err(Error::CallFailed {
                call: "write characteristic",
                status: status::NOT_FOUND,
            });
        }

        self.writes.push(WriteRecord {
            characteristic_handle,
            data: data.to_vec(),
        });
        Ok(())
    }
}

/// Enumerator over a fixed list of candidates.
#[derive(Debug, Default)]
pub struct SimEnumerator {
    queue: VecDeque<DeviceCandidate>,
}

impl DeviceEnumerator for SimEnumerator {
    fn next_device(&mut self) -> Result<Option<DeviceCandidate>> {
        Ok(self.queue.pop_front())
    }
}
