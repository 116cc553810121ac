//! GATT attribute identity.
//!
//! Bluetooth attributes are identified either by a 16-bit SIG-assigned alias
//! or by a full 128-bit UUID. The two encodings never compare equal to each
//! other, even when expanding the short alias into the Bluetooth base UUID
//! would produce the same 128-bit value: lookups follow the declared
//! encoding, not the conceptual one. `expanded()` exists for platform
//! service-class enumeration only and is not consulted by equality.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// The Bluetooth base UUID. Short UUIDs alias into its top 32 bits.
pub const BLUETOOTH_BASE: Uuid = Uuid::from_u128(0x00000000_0000_1000_8000_00805F9B34FB);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BleUuid {
    /// 16-bit SIG-assigned alias.
    Short(u16),
    /// Full 128-bit UUID.
    Long(Uuid),
}

impl BleUuid {
    /// Maps a short alias into the Bluetooth base 128-bit space; long UUIDs
    /// pass through unchanged.
    pub fn expanded(&self) -> Uuid {
        match *self {
            BleUuid::Short(value) => {
                Uuid::from_u128(BLUETOOTH_BASE.as_u128() | (u128::from(value) << 96))
            }
            BleUuid::Long(uuid) => uuid,
        }
    }

    /// Display string suffixed with the well-known name, when there is one.
    ///
    /// ```
    /// use gatt_tree::bleuuid::BleUuid;
    ///
    /// assert_eq!(BleUuid::Short(0x180F).annotated(), "0x180f ['Battery Service']");
    /// assert_eq!(BleUuid::Short(0xFFF4).annotated(), "0xfff4");
    /// ```
    pub fn annotated(&self) -> String {
        match WELL_KNOWN_NAMES.get(self) {
            Some(name) => format!("{} ['{}']", self, name),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for BleUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BleUuid::Short(value) => write!(f, "0x{:x}", value),
            BleUuid::Long(uuid) => write!(f, "{}", uuid.hyphenated()),
        }
    }
}

impl Serialize for BleUuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

pub mod services {
    use super::BleUuid;
    use uuid::Uuid;

    pub const GENERIC_ACCESS: BleUuid = BleUuid::Short(0x1800);
    pub const GENERIC_ATTRIBUTE: BleUuid = BleUuid::Short(0x1801);
    pub const IMMEDIATE_ALERT: BleUuid = BleUuid::Short(0x1802);
    pub const LINK_LOSS: BleUuid = BleUuid::Short(0x1803);
    pub const TX_POWER: BleUuid = BleUuid::Short(0x1804);
    pub const CURRENT_TIME: BleUuid = BleUuid::Short(0x1805);
    pub const DEVICE_INFORMATION: BleUuid = BleUuid::Short(0x180A);
    pub const HEART_RATE: BleUuid = BleUuid::Short(0x180D);
    pub const BATTERY: BleUuid = BleUuid::Short(0x180F);

    /// TI SensorTag IR temperature service (TMP006 thermopile).
    pub const IR_TEMPERATURE: BleUuid =
        BleUuid::Long(Uuid::from_u128(0xF000AA00_0451_4000_B000_000000000000));
    pub const ACCELEROMETER: BleUuid =
        BleUuid::Long(Uuid::from_u128(0xF000AA10_0451_4000_B000_000000000000));
    pub const SIMPLE_KEYS: BleUuid = BleUuid::Short(0xFFE0);
}

pub mod characteristics {
    use super::BleUuid;
    use uuid::Uuid;

    pub const DEVICE_NAME: BleUuid = BleUuid::Short(0x2A00);
    pub const APPEARANCE: BleUuid = BleUuid::Short(0x2A01);
    pub const PERIPHERAL_PREFERRED_CONNECTION_PARAMETERS: BleUuid = BleUuid::Short(0x2A04);
    pub const SERVICE_CHANGED: BleUuid = BleUuid::Short(0x2A05);
    pub const BATTERY_LEVEL: BleUuid = BleUuid::Short(0x2A19);
    pub const SYSTEM_ID: BleUuid = BleUuid::Short(0x2A23);
    pub const MODEL_NUMBER: BleUuid = BleUuid::Short(0x2A24);
    pub const SERIAL_NUMBER: BleUuid = BleUuid::Short(0x2A25);
    pub const FIRMWARE_REVISION: BleUuid = BleUuid::Short(0x2A26);
    pub const HARDWARE_REVISION: BleUuid = BleUuid::Short(0x2A27);
    pub const SOFTWARE_REVISION: BleUuid = BleUuid::Short(0x2A28);
    pub const MANUFACTURER_NAME: BleUuid = BleUuid::Short(0x2A29);

    /// TI SensorTag IR temperature sample (object + ambient raw readings).
    pub const IR_TEMPERATURE_DATA: BleUuid =
        BleUuid::Long(Uuid::from_u128(0xF000AA01_0451_4000_B000_000000000000));
    /// TI SensorTag IR temperature enable switch. Write 0x01 to start
    /// measurements.
    pub const IR_TEMPERATURE_CONFIG: BleUuid =
        BleUuid::Long(Uuid::from_u128(0xF000AA02_0451_4000_B000_000000000000));
}

pub mod descriptors {
    use super::BleUuid;

    pub const CHARACTERISTIC_EXTENDED_PROPERTIES: BleUuid = BleUuid::Short(0x2900);
    pub const CHARACTERISTIC_USER_DESCRIPTION: BleUuid = BleUuid::Short(0x2901);
    pub const CLIENT_CHARACTERISTIC_CONFIGURATION: BleUuid = BleUuid::Short(0x2902);
    pub const SERVER_CHARACTERISTIC_CONFIGURATION: BleUuid = BleUuid::Short(0x2903);
    pub const CHARACTERISTIC_PRESENTATION_FORMAT: BleUuid = BleUuid::Short(0x2904);
    pub const CHARACTERISTIC_AGGREGATE_FORMAT: BleUuid = BleUuid::Short(0x2905);
}

lazy_static! {
    /// Names for the UUIDs this crate knows by heart, keyed by value
    /// equality. Built once, queried by `BleUuid::annotated`.
    static ref WELL_KNOWN_NAMES: HashMap<BleUuid, &'static str> = {
        let mut names = HashMap::new();

        names.insert(services::GENERIC_ACCESS, "Generic Access");
        names.insert(services::GENERIC_ATTRIBUTE, "Generic Attribute");
        names.insert(services::IMMEDIATE_ALERT, "Immediate Alert");
        names.insert(services::LINK_LOSS, "Link Loss");
        names.insert(services::TX_POWER, "Tx Power");
        names.insert(services::CURRENT_TIME, "Current Time");
        names.insert(services::DEVICE_INFORMATION, "Device Information");
        names.insert(services::HEART_RATE, "Heart Rate");
        names.insert(services::BATTERY, "Battery Service");
        names.insert(services::IR_TEMPERATURE, "IR Temperature Service");
        names.insert(services::ACCELEROMETER, "Accelerometer Service");
        names.insert(services::SIMPLE_KEYS, "Simple Keys Service");

        names.insert(characteristics::DEVICE_NAME, "Device Name");
        names.insert(characteristics::APPEARANCE, "Appearance");
        names.insert(
            characteristics::PERIPHERAL_PREFERRED_CONNECTION_PARAMETERS,
            "Peripheral Preferred Connection Parameters",
        );
        names.insert(characteristics::SERVICE_CHANGED, "Service Changed");
        names.insert(characteristics::BATTERY_LEVEL, "Battery Level");
        names.insert(characteristics::SYSTEM_ID, "System ID");
        names.insert(characteristics::MODEL_NUMBER, "Model Number String");
        names.insert(characteristics::SERIAL_NUMBER, "Serial Number String");
        names.insert(characteristics::FIRMWARE_REVISION, "Firmware Revision String");
        names.insert(characteristics::HARDWARE_REVISION, "Hardware Revision String");
        names.insert(characteristics::SOFTWARE_REVISION, "Software Revision String");
        names.insert(characteristics::MANUFACTURER_NAME, "Manufacturer Name String");
        names.insert(characteristics::IR_TEMPERATURE_DATA, "IR Temperature Data");
        names.insert(characteristics::IR_TEMPERATURE_CONFIG, "IR Temperature Config");

        names.insert(
            descriptors::CHARACTERISTIC_EXTENDED_PROPERTIES,
            "Characteristic Extended Properties",
        );
        names.insert(
            descriptors::CHARACTERISTIC_USER_DESCRIPTION,
            "Characteristic User Description",
        );
        names.insert(
            descriptors::CLIENT_CHARACTERISTIC_CONFIGURATION,
            "Client Characteristic Configuration",
        );
        names.insert(
            descriptors::SERVER_CHARACTERISTIC_CONFIGURATION,
            "Server Characteristic Configuration",
        );
        names.insert(
            descriptors::CHARACTERISTIC_PRESENTATION_FORMAT,
            "Characteristic Presentation Format",
        );
        names.insert(
            descriptors::CHARACTERISTIC_AGGREGATE_FORMAT,
            "Characteristic Aggregate Format",
        );

        names
    };
}
