//! Assembles attribute trees from a platform.
//!
//! Retrieval is fail-fast: any platform or decode error aborts the current
//! device and no partial tree is returned for it. Children are fully
//! populated before their parent is pushed, so a returned [`Device`] is
//! always complete.

use log::{debug, info, warn};

use crate::address::BluetoothAddress;
use crate::bleuuid::BleUuid;
use crate::error::{Error, Result};
use crate::platform::{Access, AccessHandle, DeviceEnumerator, DeviceProperty, GattPlatform};
use crate::query::{read_buffered, read_required};
use crate::records;
use crate::tree::{
    Characteristic, CharacteristicProperties, Descriptor, DescriptorKind, DescriptorValue, Device,
    DeviceInfo, Service,
};

pub struct TreeBuilder<P: GattPlatform> {
    platform: P,
}

impl<P: GattPlatform> TreeBuilder<P> {
    pub fn new(platform: P) -> Self {
        TreeBuilder { platform }
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Builds a tree for every device the enumerator yields.
    pub fn build_all(&mut self, enumerator: &mut dyn DeviceEnumerator) -> Result<Vec<Device>> {
        let mut infos = Vec::new();
        while let Some(candidate) = enumerator.next_device()? {
            infos.push(self.collect_device_info(&candidate.path)?);
        }
        info!("Enumerated {} device(s)", infos.len());

        let mut devices = Vec::with_capacity(infos.len());
        for info in infos {
            devices.push(self.build(info)?);
        }
        Ok(devices)
    }

    /// Reads the identity of one device without touching its attributes.
    pub fn collect_device_info(&mut self, path: &str) -> Result<DeviceInfo> {
        let raw_id = read_required("device instance id", |buffer| {
            self.platform.instance_id(path, buffer)
        })?;
        let instance_id = records::decode_text(&raw_id);

        let raw_name = read_required("device friendly name", |buffer| {
            self.platform
                .device_property(path, DeviceProperty::FriendlyName, buffer)
        })?;
        let friendly_name = records::decode_text_property(&raw_name)?;

        let address = BluetoothAddress::from_instance_id(&instance_id)?;
        debug!("Device {} at {}", friendly_name, address);

        Ok(DeviceInfo {
            path: path.to_string(),
            instance_id,
            friendly_name,
            address,
        })
    }

    /// Builds the full attribute tree of one device.
    pub fn build(&mut self, info: DeviceInfo) -> Result<Device> {
        info!("Building tree for {}", info.friendly_name);
        let handle = self.platform.open(&info.path, Access::ReadWrite)?;
        let services = self.collect_services(&handle, &info);
        self.platform.close(handle);
        Ok(Device::new(info, services?))
    }

    fn collect_services(
        &mut self,
        handle: &AccessHandle,
        info: &DeviceInfo,
    ) -> Result<Vec<Service>> {
        let buffer = read_buffered("services", |buffer| self.platform.services(handle, buffer))?;
        let records = match buffer {
            Some(buffer) => records::decode_services(&buffer)?,
            None => return Ok(Vec::new()),
        };

        let mut services = Vec::with_capacity(records.len());
        for record in records {
            debug!("  service {}", record.uuid.annotated());
            let characteristics =
                self.collect_characteristics(handle, info, record.uuid, record.attribute_handle)?;
            services.push(Service {
                uuid: record.uuid,
                attribute_handle: record.attribute_handle,
                characteristics,
            });
        }
        Ok(services)
    }

    fn collect_characteristics(
        &mut self,
        handle: &AccessHandle,
        info: &DeviceInfo,
        service: BleUuid,
        service_handle: u16,
    ) -> Result<Vec<Characteristic>> {
        let buffer = read_buffered("characteristics", |buffer| {
            self.platform.characteristics(handle, service_handle, buffer)
        })?;
        let records = match buffer {
            Some(buffer) => records::decode_characteristics(&buffer)?,
            None => return Ok(Vec::new()),
        };

        let mut characteristics = Vec::with_capacity(records.len());
        for record in records {
            let properties = CharacteristicProperties::from_bits_truncate(record.properties);
            debug!("    characteristic {} ({})", record.uuid.annotated(), properties);

            // Values are served through the service's own access path, not
            // the device handle. The monitor loop re-runs the same query.
            let value = if properties.is_readable() {
                read_characteristic_value(
                    &mut self.platform,
                    info,
                    service,
                    record.attribute_handle,
                )?
            } else {
                None
            };

            let descriptors =
                self.collect_descriptors(handle, info, service, record.attribute_handle)?;
            characteristics.push(Characteristic {
                uuid: record.uuid,
                attribute_handle: record.attribute_handle,
                value_handle: record.value_handle,
                properties,
                value,
                descriptors,
            });
        }
        Ok(characteristics)
    }

    fn collect_descriptors(
        &mut self,
        handle: &AccessHandle,
        info: &DeviceInfo,
        service: BleUuid,
        characteristic_handle: u16,
    ) -> Result<Vec<Descriptor>> {
        let buffer = read_buffered("descriptors", |buffer| {
            self.platform
                .descriptors(handle, characteristic_handle, buffer)
        })?;
        let records = match buffer {
            Some(buffer) => records::decode_descriptors(&buffer)?,
            None => return Ok(Vec::new()),
        };

        let mut descriptors = Vec::with_capacity(records.len());
        for record in records {
            debug!("      descriptor {}", record.uuid.annotated());
            let kind = DescriptorKind::from_code(record.kind)
                .ok_or(Error::UnknownDescriptorType(record.kind))?;

            // Descriptor values go through the service's own access path,
            // not the device handle.
            let raw_value = read_descriptor_value(
                &mut self.platform,
                info,
                service,
                record.attribute_handle,
            )?;
            let value = match raw_value {
                Some(buffer) => {
                    let record = records::decode_descriptor_value(&buffer)?;
                    match DescriptorValue::from_record(&record) {
                        Some(value) => Some(value),
                        None => return Err(Error::UnknownDescriptorType(record.kind)),
                    }
                }
                None => None,
            };

            descriptors.push(Descriptor {
                uuid: record.uuid,
                kind,
                attribute_handle: record.attribute_handle,
                characteristic_handle: record.characteristic_handle,
                value,
            });
        }
        Ok(descriptors)
    }
}

/// Finds the platform access path serving `service` on the device `info`
/// describes.
///
/// The platform registers service paths globally per service class, so the
/// candidates are filtered down to the ones embedding this device's
/// address. No match is `Ok(None)`; more than one match means the address
/// filter cannot disambiguate and the caller must not guess.
pub fn resolve_service_path<P: GattPlatform>(
    platform: &mut P,
    info: &DeviceInfo,
    service: BleUuid,
) -> Result<Option<String>> {
    let address_hex = info.address.to_lower_hex();
    let mut matched = None;

    for index in 0.. {
        let raw = read_buffered("service interface path", |buffer| {
            platform.service_path_at(service, index, buffer)
        })?;
        let path = match raw {
            Some(raw) => records::decode_text(&raw),
            None => break,
        };

        if !path.to_lowercase().contains(&address_hex) {
            continue;
        }
        if matched.is_some() {
            return Err(Error::AmbiguousServiceMatch {
                service,
                address: info.address,
            });
        }
        matched = Some(path);
    }

    if matched.is_none() {
        warn!(
            "No access path for service {} on {}",
            service.annotated(),
            info.address
        );
    }
    Ok(matched)
}

/// Reads a descriptor value through the service's own access path.
/// `Ok(None)` when the path cannot be resolved or the value is unavailable.
pub fn read_descriptor_value<P: GattPlatform>(
    platform: &mut P,
    info: &DeviceInfo,
    service: BleUuid,
    descriptor_handle: u16,
) -> Result<Option<Vec<u8>>> {
    let path = match resolve_service_path(platform, info, service)? {
        Some(path) => path,
        None => return Ok(None),
    };

    let handle = platform.open(&path, Access::Read)?;
    let value = read_buffered("descriptor value", |buffer| {
        platform.descriptor_value(&handle, descriptor_handle, buffer)
    });
    platform.close(handle);
    value
}

/// Re-reads a characteristic value through the service's own access path.
/// `Ok(None)` when the path cannot be resolved or the value is unavailable.
pub fn read_characteristic_value<P: GattPlatform>(
    platform: &mut P,
    info: &DeviceInfo,
    service: BleUuid,
    characteristic_handle: u16,
) -> Result<Option<Vec<u8>>> {
    let path = match resolve_service_path(platform, info, service)? {
        Some(path) => path,
        None => return Ok(None),
    };

    let handle = platform.open(&path, Access::Read)?;
    let value = read_buffered("characteristic value", |buffer| {
        platform.characteristic_value(&handle, characteristic_handle, buffer)
    });
    platform.close(handle);
    value
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bleuuid::services;
    use crate::sim::{SimDevice, SimPlatform, SimService};
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_a_path_by_embedded_address() {
        let mut platform = SimPlatform::new();
        platform.add_device(
            SimDevice::new(
                r"\\?\bthledevice#dev_060504030201",
                r"BTHLE\DEV_060504030201\8&1",
                "Widget",
            )
            .with_service(
                SimService::new(services::BATTERY, 0x0010)
                    .with_path(r"\\?\bthledevice#180f#dev_060504030201"),
            ),
        );
        let info = DeviceInfo {
            address: "060504030201".parse().unwrap(),
            ..DeviceInfo::default()
        };

        assert_eq!(
            resolve_service_path(&mut platform, &info, services::BATTERY).unwrap(),
            Some(r"\\?\bthledevice#180f#dev_060504030201".to_string())
        );
        assert_eq!(
            resolve_service_path(&mut platform, &info, services::HEART_RATE).unwrap(),
            None
        );
    }

    #[test]
    fn foreign_addresses_are_filtered_out() {
        let mut platform = SimPlatform::new();
        platform.add_device(
            SimDevice::new("dev-a", r"BTHLE\DEV_AAAAAAAAAAAA\8&1", "A").with_service(
                SimService::new(services::BATTERY, 0x0010)
                    .with_path("svc#180f#dev_aaaaaaaaaaaa"),
            ),
        );
        let info = DeviceInfo {
            address: "060504030201".parse().unwrap(),
            ..DeviceInfo::default()
        };

        assert_eq!(
            resolve_service_path(&mut platform, &info, services::BATTERY).unwrap(),
            None
        );
    }
}
