use std::time::Duration;

use pretty_assertions::assert_eq;

use gatt_tree::bleuuid::{characteristics, descriptors, services, BleUuid};
use gatt_tree::builder::TreeBuilder;
use gatt_tree::monitor::{self, MonitorOptions, SENSOR_TAG_NAME};
use gatt_tree::sim::{
    Fault, SimCharacteristic, SimDescriptor, SimDevice, SimPlatform, SimService, WriteRecord,
};
use gatt_tree::tree::{CharacteristicProperties, DescriptorKind, Device};
use gatt_tree::Error;

fn sensor_tag() -> SimDevice {
    SimDevice::new(
        "dev#c4be84702f1a",
        r"BTHLE\DEV_C4BE84702F1A\8&2D0E7D5E&0",
        SENSOR_TAG_NAME,
    )
    .with_service(
        SimService::new(services::GENERIC_ACCESS, 0x0001)
            .with_path("svc#1800#dev_c4be84702f1a")
            .with_characteristic(
                SimCharacteristic::new(
                    characteristics::DEVICE_NAME,
                    0x0002,
                    CharacteristicProperties::READ,
                )
                .with_value(b"SensorTag"),
            ),
    )
    .with_service(
        SimService::new(services::IR_TEMPERATURE, 0x0023)
            .with_path("svc#f000aa00#dev_c4be84702f1a")
            .with_characteristic(
                SimCharacteristic::new(
                    characteristics::IR_TEMPERATURE_DATA,
                    0x0024,
                    CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
                )
                .with_value(&[0x00, 0x00, 0x80, 0x0C])
                .with_descriptor(
                    SimDescriptor::new(
                        DescriptorKind::ClientConfiguration,
                        descriptors::CLIENT_CHARACTERISTIC_CONFIGURATION,
                        0x0026,
                        0x0024,
                    )
                    .with_value(&[0x01, 0x00]),
                ),
            )
            .with_characteristic(SimCharacteristic::new(
                characteristics::IR_TEMPERATURE_CONFIG,
                0x0028,
                CharacteristicProperties::WRITE,
            )),
    )
}

fn build(platform: SimPlatform) -> (TreeBuilder<SimPlatform>, Vec<Device>) {
    let mut enumerator = platform.enumerator();
    let mut builder = TreeBuilder::new(platform);
    let devices = builder
        .build_all(&mut enumerator)
        .expect("tree build should succeed");
    (builder, devices)
}

#[test]
fn builds_the_full_tree() {
    let mut platform = SimPlatform::new();
    platform.add_device(sensor_tag());
    let (_, devices) = build(platform);

    assert_eq!(devices.len(), 1);
    let device = &devices[0];
    assert_eq!(device.info.friendly_name, SENSOR_TAG_NAME);
    assert_eq!(device.info.address.to_string(), "C4BE84702F1A");
    assert_eq!(device.services.len(), 2);

    let name = devices[0]
        .find_service(services::GENERIC_ACCESS)
        .and_then(|service| service.find_characteristic(characteristics::DEVICE_NAME))
        .expect("device name characteristic");
    assert_eq!(name.value, Some(b"SensorTag".to_vec()));

    let ir = device
        .find_service(services::IR_TEMPERATURE)
        .expect("ir temperature service");
    let data = ir
        .find_characteristic(characteristics::IR_TEMPERATURE_DATA)
        .expect("ir data characteristic");
    assert_eq!(data.value, Some(vec![0x00, 0x00, 0x80, 0x0C]));
    assert_eq!(data.descriptors.len(), 1);

    let ccc = &data.descriptors[0];
    assert_eq!(ccc.kind, DescriptorKind::ClientConfiguration);
    assert_eq!(ccc.characteristic_handle, 0x0024);
    let configuration = ccc
        .value
        .as_ref()
        .and_then(|value| value.client_configuration())
        .expect("client configuration value");
    assert!(configuration.notify);
    assert!(!configuration.indicate);

    // Write-only characteristics are never read.
    let config = ir
        .find_characteristic(characteristics::IR_TEMPERATURE_CONFIG)
        .expect("ir config characteristic");
    assert_eq!(config.value, None);
}

#[test]
fn a_device_without_services_builds_an_empty_tree() {
    let mut platform = SimPlatform::new();
    platform.add_device(SimDevice::new(
        "dev-empty",
        r"BTHLE\DEV_060504030201\8&1",
        "Empty",
    ));
    let (_, devices) = build(platform);

    assert_eq!(devices.len(), 1);
    assert!(devices[0].services.is_empty());
    assert_eq!(devices[0].info.address.to_string(), "060504030201");
}

#[test]
fn build_releases_every_handle() {
    let mut platform = SimPlatform::new();
    platform.add_device(sensor_tag());
    let (mut builder, _) = build(platform);
    assert_eq!(builder.platform_mut().open_handles(), 0);
}

#[test]
fn length_mismatch_aborts_the_build() {
    let mut platform = SimPlatform::new();
    platform.add_device(sensor_tag());
    platform.set_fault(Fault::ServicesLengthMismatch);

    let mut enumerator = platform.enumerator();
    let result = TreeBuilder::new(platform).build_all(&mut enumerator);
    assert!(matches!(
        result,
        Err(Error::LengthMismatch {
            call: "services",
            ..
        })
    ));
}

#[test]
fn platform_failures_keep_their_status_code() {
    let mut platform = SimPlatform::new();
    platform.add_device(sensor_tag());
    platform.set_fault(Fault::ServicesFailed(1167));

    let mut enumerator = platform.enumerator();
    let result = TreeBuilder::new(platform).build_all(&mut enumerator);
    assert_eq!(
        result,
        Err(Error::CallFailed {
            call: "services",
            status: 1167,
        })
    );
}

#[test]
fn values_need_a_service_path() {
    let mut platform = SimPlatform::new();
    platform.add_device(
        SimDevice::new("dev-nopath", r"BTHLE\DEV_060504030201\8&1", "NoPath").with_service(
            SimService::new(services::BATTERY, 0x0010).with_characteristic(
                SimCharacteristic::new(
                    characteristics::BATTERY_LEVEL,
                    0x0011,
                    CharacteristicProperties::READ,
                )
                .with_value(&[0x64])
                .with_descriptor(
                    SimDescriptor::new(
                        DescriptorKind::ClientConfiguration,
                        descriptors::CLIENT_CHARACTERISTIC_CONFIGURATION,
                        0x0013,
                        0x0011,
                    )
                    .with_value(&[0x01, 0x00]),
                ),
            ),
        ),
    );
    let (_, devices) = build(platform);

    // Readable, but there is no path to serve the value through.
    let characteristic = &devices[0].services[0].characteristics[0];
    assert!(characteristic.properties.is_readable());
    assert_eq!(characteristic.value, None);

    let descriptor = &characteristic.descriptors[0];
    assert_eq!(descriptor.kind, DescriptorKind::ClientConfiguration);
    assert_eq!(descriptor.value, None);
}

#[test]
fn two_matching_service_paths_are_ambiguous() {
    let mut platform = SimPlatform::new();
    platform.add_device(
        SimDevice::new("dev#c4be84702f1a", r"BTHLE\DEV_C4BE84702F1A\8&1", "Twin")
            .with_service(
                SimService::new(services::BATTERY, 0x0010)
                    .with_path("svc#180f#dev_c4be84702f1a#0"),
            )
            .with_service(
                SimService::new(services::BATTERY, 0x0020)
                    .with_path("svc#180f#dev_c4be84702f1a#1"),
            ),
    );
    let (mut builder, devices) = build(platform);

    let result = gatt_tree::builder::resolve_service_path(
        builder.platform_mut(),
        &devices[0].info,
        services::BATTERY,
    );
    assert_eq!(
        result,
        Err(Error::AmbiguousServiceMatch {
            service: services::BATTERY,
            address: "C4BE84702F1A".parse().unwrap(),
        })
    );
}

#[test]
fn lookups_follow_the_declared_uuid_encoding() {
    let mut platform = SimPlatform::new();
    platform.add_device(
        SimDevice::new("dev-enc", r"BTHLE\DEV_060504030201\8&1", "Enc").with_service(
            SimService::new(
                BleUuid::Long(services::BATTERY.expanded()),
                0x0010,
            ),
        ),
    );
    let (_, devices) = build(platform);

    assert!(devices[0].find_service(services::BATTERY).is_none());
    assert!(devices[0]
        .find_service(BleUuid::Long(services::BATTERY.expanded()))
        .is_some());
}

#[test]
fn monitoring_enables_then_polls() {
    let mut platform = SimPlatform::new();
    platform.add_device(sensor_tag());
    let (mut builder, devices) = build(platform);

    let options = MonitorOptions {
        samples: 2,
        interval: Duration::from_millis(1),
    };
    let readings =
        monitor::monitor_sensor_tags(builder.platform_mut(), &devices, options).unwrap();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].ambient_celsius, 25.0);

    let platform = builder.platform_mut();
    assert_eq!(
        platform.writes(),
        &[WriteRecord {
            characteristic_handle: 0x0028,
            data: vec![0x01],
        }]
    );
    assert_eq!(platform.open_handles(), 0);
}

#[test]
fn monitoring_skips_devices_without_the_sensor() {
    let mut platform = SimPlatform::new();
    platform.add_device(SimDevice::new(
        "dev-plain",
        r"BTHLE\DEV_060504030201\8&1",
        SENSOR_TAG_NAME,
    ));
    platform.add_device(SimDevice::new(
        "dev-other",
        r"BTHLE\DEV_AAAAAAAAAAAA\8&1",
        "Mouse",
    ));
    let (mut builder, devices) = build(platform);

    let readings = monitor::monitor_sensor_tags(
        builder.platform_mut(),
        &devices,
        MonitorOptions {
            samples: 2,
            interval: Duration::from_millis(1),
        },
    )
    .unwrap();
    assert!(readings.is_empty());
    assert!(builder.platform_mut().writes().is_empty());
}
