use std::time::Duration;

use anyhow::Result;
use log::info;

use gatt_tree::bleuuid::{characteristics, descriptors, services};
use gatt_tree::builder::TreeBuilder;
use gatt_tree::monitor::{self, MonitorOptions, SENSOR_TAG_NAME};
use gatt_tree::sim::{SimCharacteristic, SimDescriptor, SimDevice, SimPlatform, SimService};
use gatt_tree::tree::{CharacteristicProperties, DescriptorKind};

/// A simulated CC2650 SensorTag, close to what the real device registers.
fn sensor_tag() -> SimDevice {
    let read = CharacteristicProperties::READ;

    SimDevice::new(
        r"\\?\bthledevice#dev_c4be84702f1a#8&2d0e7d5e",
        r"BTHLE\DEV_C4BE84702F1A\8&2D0E7D5E&0",
        SENSOR_TAG_NAME,
    )
    .with_service(
        SimService::new(services::GENERIC_ACCESS, 0x0001)
            .with_path(r"\\?\bthledevice#1800#dev_c4be84702f1a")
            .with_characteristic(
                SimCharacteristic::new(characteristics::DEVICE_NAME, 0x0002, read)
                    .with_value(b"SensorTag"),
            )
            .with_characteristic(
                SimCharacteristic::new(characteristics::APPEARANCE, 0x0004, read)
                    .with_value(&[0x00, 0x00]),
            ),
    )
    .with_service(
        SimService::new(services::DEVICE_INFORMATION, 0x0010)
            .with_path(r"\\?\bthledevice#180a#dev_c4be84702f1a")
            .with_characteristic(
                SimCharacteristic::new(characteristics::MANUFACTURER_NAME, 0x0011, read)
                    .with_value(b"Texas Instruments"),
            )
            .with_characteristic(
                SimCharacteristic::new(characteristics::MODEL_NUMBER, 0x0013, read)
                    .with_value(b"CC2650 SensorTag"),
            ),
    )
    .with_service(
        SimService::new(services::IR_TEMPERATURE, 0x0023)
            .with_path(r"\\?\bthledevice#f000aa00#dev_c4be84702f1a")
            .with_characteristic(
                // 0x0D60 raw die reading is 26.75 C ambient.
                SimCharacteristic::new(
                    characteristics::IR_TEMPERATURE_DATA,
                    0x0024,
                    read | CharacteristicProperties::NOTIFY,
                )
                .with_value(&[0x54, 0x01, 0x60, 0x0D])
                .with_descriptor(
                    SimDescriptor::new(
                        DescriptorKind::ClientConfiguration,
                        descriptors::CLIENT_CHARACTERISTIC_CONFIGURATION,
                        0x0026,
                        0x0024,
                    )
                    .with_value(&[0x00, 0x00]),
                )
                .with_descriptor(
                    SimDescriptor::new(
                        DescriptorKind::UserDescription,
                        descriptors::CHARACTERISTIC_USER_DESCRIPTION,
                        0x0027,
                        0x0024,
                    )
                    .with_value(b"Temp. Data\0"),
                ),
            )
            .with_characteristic(
                SimCharacteristic::new(
                    characteristics::IR_TEMPERATURE_CONFIG,
                    0x0028,
                    read | CharacteristicProperties::WRITE,
                )
                .with_value(&[0x00])
                .with_descriptor(
                    SimDescriptor::new(
                        DescriptorKind::UserDescription,
                        descriptors::CHARACTERISTIC_USER_DESCRIPTION,
                        0x002A,
                        0x0028,
                    )
                    .with_value(b"Temp. Conf.\0"),
                ),
            ),
    )
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let mut platform = SimPlatform::new();
    platform.add_device(sensor_tag());
    let mut enumerator = platform.enumerator();

    let mut builder = TreeBuilder::new(platform);
    let devices = builder.build_all(&mut enumerator)?;

    info!("Built {} attribute tree(s)", devices.len());
    for device in &devices {
        println!("{}", serde_json::to_string_pretty(device)?);
    }

    let options = MonitorOptions {
        samples: 3,
        interval: Duration::from_millis(100),
    };
    let readings = monitor::monitor_sensor_tags(builder.platform_mut(), &devices, options)?;

    for reading in &readings {
        println!(
            "ambient: {:.2} C, object: {:.2} C",
            reading.ambient_celsius, reading.object_celsius
        );
    }

    Ok(())
}
