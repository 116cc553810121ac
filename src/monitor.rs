//! IR temperature monitoring for TI SensorTag devices.
//!
//! Enables the thermopile via the config characteristic, then polls the
//! data characteristic on a fixed interval, decoding each sample with
//! [`crate::sensor::decode_temperature`].

use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::bleuuid::{characteristics, services};
use crate::builder;
use crate::error::Result;
use crate::platform::{Access, GattPlatform};
use crate::sensor::{self, TemperatureReading};
use crate::tree::Device;

/// Friendly name the SensorTag registers under.
pub const SENSOR_TAG_NAME: &str = "TI BLE Sensor Tag";

const ENABLE_MEASUREMENTS: [u8; 1] = [0x01];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    pub samples: u32,
    pub interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions {
            samples: 200,
            interval: Duration::from_millis(500),
        }
    }
}

/// Monitors the IR temperature service of one device.
///
/// Returns an empty vector, with a warning logged, when the device does not
/// carry the service or no access path can be resolved for it. Platform
/// failures during enabling or polling are errors.
pub fn monitor_ir_temperature<P: GattPlatform>(
    platform: &mut P,
    device: &Device,
    options: MonitorOptions,
) -> Result<Vec<TemperatureReading>> {
    let service = match device.find_service(services::IR_TEMPERATURE) {
        Some(service) => service,
        None => {
            warn!(
                "{} does not serve IR temperature",
                device.info.friendly_name
            );
            return Ok(Vec::new());
        }
    };
    let config = service.find_characteristic(characteristics::IR_TEMPERATURE_CONFIG);
    let data = service.find_characteristic(characteristics::IR_TEMPERATURE_DATA);
    let (config, data) = match (config, data) {
        (Some(config), Some(data)) => (config, data),
        _ => {
            warn!(
                "{} serves an incomplete IR temperature service",
                device.info.friendly_name
            );
            return Ok(Vec::new());
        }
    };

    let path = match builder::resolve_service_path(
        platform,
        &device.info,
        services::IR_TEMPERATURE,
    )? {
        Some(path) => path,
        None => return Ok(Vec::new()),
    };

    let handle = platform.open(&path, Access::ReadWrite)?;
    let enabled =
        platform.write_characteristic(&handle, config.attribute_handle, &ENABLE_MEASUREMENTS);
    platform.close(handle);
    enabled?;
    info!("Enabled IR temperature measurements on {}", device.info.address);

    let mut readings = Vec::with_capacity(options.samples as usize);
    for sample in 0..options.samples {
        if sample > 0 {
            thread::sleep(options.interval);
        }

        let value = builder::read_characteristic_value(
            platform,
            &device.info,
            services::IR_TEMPERATURE,
            data.attribute_handle,
        )?;
        let value = match value {
            Some(value) => value,
            None => continue,
        };

        let reading = sensor::decode_temperature(&value)?;
        info!(
            "Ambient: {:.2} C, object: {:.2} C",
            reading.ambient_celsius, reading.object_celsius
        );
        readings.push(reading);
    }
    Ok(readings)
}

/// Runs [`monitor_ir_temperature`] against every device registered under
/// the SensorTag friendly name.
pub fn monitor_sensor_tags<P: GattPlatform>(
    platform: &mut P,
    devices: &[Device],
    options: MonitorOptions,
) -> Result<Vec<TemperatureReading>> {
    let mut readings = Vec::new();
    for device in devices {
        if device.info.friendly_name != SENSOR_TAG_NAME {
            continue;
        }
        readings.extend(monitor_ir_temperature(platform, device, options)?);
    }
    Ok(readings)
}
