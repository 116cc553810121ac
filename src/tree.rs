//! The retrieved attribute tree.
//!
//! Devices own services, services own characteristics, characteristics own
//! descriptors. A tree is assembled bottom-up by [`crate::builder`] and is
//! immutable by convention afterwards; there is no sharing between nodes.
//! Every node serializes to JSON for snapshots.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::address::BluetoothAddress;
use crate::bleuuid::BleUuid;
use crate::records::DescriptorValueRecord;

/// Identity of a device, gathered before its attribute tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Platform access path used to open the device.
    pub path: String,
    /// Registry instance id, with the address embedded.
    pub instance_id: String,
    pub friendly_name: String,
    pub address: BluetoothAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub services: Vec<Service>,
}

impl Device {
    pub fn new(info: DeviceInfo, services: Vec<Service>) -> Self {
        Device { info, services }
    }

    /// First service declared with exactly this UUID encoding.
    pub fn find_service(&self, uuid: BleUuid) -> Option<&Service> {
        self.services.iter().find(|service| service.uuid == uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    /// First characteristic declared with exactly this UUID encoding.
    pub fn find_characteristic(&self, uuid: BleUuid) -> Option<&Characteristic> {
        self.characteristics
            .iter()
            .find(|characteristic| characteristic.uuid == uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Characteristic {
    pub uuid: BleUuid,
    pub attribute_handle: u16,
    pub value_handle: u16,
    pub properties: CharacteristicProperties,
    /// Raw value bytes, read at build time. `None` when the characteristic
    /// is not readable or no access path could be resolved for it.
    #[serde(serialize_with = "hex::serialize_opt")]
    pub value: Option<Vec<u8>>,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub uuid: BleUuid,
    pub kind: DescriptorKind,
    pub attribute_handle: u16,
    pub characteristic_handle: u16,
    pub value: Option<DescriptorValue>,
}

/// Descriptor type codes as the platform reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DescriptorKind {
    ExtendedProperties,
    UserDescription,
    ClientConfiguration,
    ServerConfiguration,
    Format,
    AggregateFormat,
    Custom,
}

impl DescriptorKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DescriptorKind::ExtendedProperties),
            1 => Some(DescriptorKind::UserDescription),
            2 => Some(DescriptorKind::ClientConfiguration),
            3 => Some(DescriptorKind::ServerConfiguration),
            4 => Some(DescriptorKind::Format),
            5 => Some(DescriptorKind::AggregateFormat),
            6 => Some(DescriptorKind::Custom),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            DescriptorKind::ExtendedProperties => 0,
            DescriptorKind::UserDescription => 1,
            DescriptorKind::ClientConfiguration => 2,
            DescriptorKind::ServerConfiguration => 3,
            DescriptorKind::Format => 4,
            DescriptorKind::AggregateFormat => 5,
            DescriptorKind::Custom => 6,
        }
    }
}

/// A retrieved descriptor value, kept as the raw record plus typed views.
///
/// The views return `None` rather than failing when the stored kind does
/// not match or the data is shorter than the view needs; a device serving
/// odd descriptor payloads should not break tree retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorValue {
    pub kind: DescriptorKind,
    pub uuid: BleUuid,
    #[serde(serialize_with = "hex::serialize")]
    pub data: Vec<u8>,
}

impl DescriptorValue {
    pub fn from_record(record: &DescriptorValueRecord) -> Option<Self> {
        Some(DescriptorValue {
            kind: DescriptorKind::from_code(record.kind)?,
            uuid: record.uuid,
            data: record.data.clone(),
        })
    }

    pub fn extended_properties(&self) -> Option<ExtendedProperties> {
        if self.kind != DescriptorKind::ExtendedProperties {
            return None;
        }
        let bits = *self.data.first()?;
        Some(ExtendedProperties {
            reliable_write: bits & 0x01 != 0,
            writable_auxiliaries: bits & 0x02 != 0,
        })
    }

    pub fn user_description(&self) -> Option<String> {
        if self.kind != DescriptorKind::UserDescription {
            return None;
        }
        Some(crate::records::decode_text(&self.data))
    }

    pub fn client_configuration(&self) -> Option<ClientConfiguration> {
        if self.kind != DescriptorKind::ClientConfiguration || self.data.len() < 2 {
            return None;
        }
        let bits = u16::from_le_bytes([self.data[0], self.data[1]]);
        Some(ClientConfiguration {
            notify: bits & 0x0001 != 0,
            indicate: bits & 0x0002 != 0,
        })
    }

    pub fn server_configuration(&self) -> Option<ServerConfiguration> {
        if self.kind != DescriptorKind::ServerConfiguration || self.data.len() < 2 {
            return None;
        }
        let bits = u16::from_le_bytes([self.data[0], self.data[1]]);
        Some(ServerConfiguration {
            broadcast: bits & 0x0001 != 0,
        })
    }

    pub fn format(&self) -> Option<PresentationFormat> {
        if self.kind != DescriptorKind::Format || self.data.len() < 7 {
            return None;
        }
        Some(PresentationFormat {
            format: self.data[0],
            exponent: self.data[1] as i8,
            unit: BleUuid::Short(u16::from_le_bytes([self.data[2], self.data[3]])),
            namespace: self.data[4],
            description: u16::from_le_bytes([self.data[5], self.data[6]]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtendedProperties {
    pub reliable_write: bool,
    pub writable_auxiliaries: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientConfiguration {
    pub notify: bool,
    pub indicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerConfiguration {
    pub broadcast: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresentationFormat {
    pub format: u8,
    pub exponent: i8,
    pub unit: BleUuid,
    pub namespace: u8,
    pub description: u16,
}

bitflags::bitflags! {
    /// GATT characteristic property bits, declaration byte order.
    pub struct CharacteristicProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

impl CharacteristicProperties {
    pub fn is_readable(&self) -> bool {
        self.contains(CharacteristicProperties::READ)
    }

    pub fn is_writable(&self) -> bool {
        self.contains(CharacteristicProperties::WRITE)
            || self.contains(CharacteristicProperties::WRITE_WITHOUT_RESPONSE)
    }
}

impl fmt::Display for CharacteristicProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Serialize for CharacteristicProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CharacteristicProperties", 8)?;
        state.serialize_field("broadcast", &self.contains(Self::BROADCAST))?;
        state.serialize_field("read", &self.contains(Self::READ))?;
        state.serialize_field(
            "write_without_response",
            &self.contains(Self::WRITE_WITHOUT_RESPONSE),
        )?;
        state.serialize_field("write", &self.contains(Self::WRITE))?;
        state.serialize_field("notify", &self.contains(Self::NOTIFY))?;
        state.serialize_field("indicate", &self.contains(Self::INDICATE))?;
        state.serialize_field(
            "authenticated_signed_writes",
            &self.contains(Self::AUTHENTICATED_SIGNED_WRITES),
        )?;
        state.serialize_field(
            "extended_properties",
            &self.contains(Self::EXTENDED_PROPERTIES),
        )?;
        state.end()
    }
}

mod hex {
    use serde::Serializer;

    fn to_hex(bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(bytes))
    }

    pub fn serialize_opt<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&to_hex(bytes)),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bleuuid::{characteristics, descriptors, services};
    use pretty_assertions::assert_eq;

    fn characteristic(uuid: BleUuid, handle: u16) -> Characteristic {
        Characteristic {
            uuid,
            attribute_handle: handle,
            value_handle: handle + 1,
            properties: CharacteristicProperties::READ,
            value: None,
            descriptors: vec![],
        }
    }

    #[test]
    fn lookups_honor_insertion_order_and_encoding() {
        let device = Device::new(
            DeviceInfo::default(),
            vec![
                Service {
                    uuid: services::GENERIC_ACCESS,
                    attribute_handle: 0x0001,
                    characteristics: vec![
                        characteristic(characteristics::DEVICE_NAME, 0x0002),
                        characteristic(characteristics::DEVICE_NAME, 0x0008),
                    ],
                },
                Service {
                    uuid: services::GENERIC_ACCESS,
                    attribute_handle: 0x0020,
                    characteristics: vec![],
                },
            ],
        );

        let service = device.find_service(services::GENERIC_ACCESS).unwrap();
        assert_eq!(service.attribute_handle, 0x0001);
        assert_eq!(
            service
                .find_characteristic(characteristics::DEVICE_NAME)
                .unwrap()
                .attribute_handle,
            0x0002
        );

        assert_eq!(device.find_service(services::BATTERY), None);
        // A short alias does not match a service declared with the
        // expanded long form.
        assert_eq!(
            device.find_service(BleUuid::Long(services::GENERIC_ACCESS.expanded())),
            None
        );
    }

    #[test]
    fn client_configuration_view() {
        let value = DescriptorValue {
            kind: DescriptorKind::ClientConfiguration,
            uuid: descriptors::CLIENT_CHARACTERISTIC_CONFIGURATION,
            data: vec![0x01, 0x00],
        };
        assert_eq!(
            value.client_configuration(),
            Some(ClientConfiguration {
                notify: true,
                indicate: false,
            })
        );
        assert_eq!(value.user_description(), None);
        assert_eq!(value.format(), None);

        let short = DescriptorValue {
            data: vec![0x01],
            ..value
        };
        assert_eq!(short.client_configuration(), None);
    }

    #[test]
    fn user_description_view() {
        let value = DescriptorValue {
            kind: DescriptorKind::UserDescription,
            uuid: descriptors::CHARACTERISTIC_USER_DESCRIPTION,
            data: b"Temp. Data\0".to_vec(),
        };
        assert_eq!(value.user_description(), Some("Temp. Data".to_string()));
        assert_eq!(value.client_configuration(), None);
    }

    #[test]
    fn format_view() {
        let value = DescriptorValue {
            kind: DescriptorKind::Format,
            uuid: descriptors::CHARACTERISTIC_PRESENTATION_FORMAT,
            data: vec![0x0E, 0xFE, 0x2F, 0x27, 0x01, 0x00, 0x00],
        };
        assert_eq!(
            value.format(),
            Some(PresentationFormat {
                format: 0x0E,
                exponent: -2,
                unit: BleUuid::Short(0x272F),
                namespace: 0x01,
                description: 0x0000,
            })
        );
    }

    #[test]
    fn extended_and_server_configuration_views() {
        let extended = DescriptorValue {
            kind: DescriptorKind::ExtendedProperties,
            uuid: descriptors::CHARACTERISTIC_EXTENDED_PROPERTIES,
            data: vec![0x03, 0x00],
        };
        assert_eq!(
            extended.extended_properties(),
            Some(ExtendedProperties {
                reliable_write: true,
                writable_auxiliaries: true,
            })
        );

        let server = DescriptorValue {
            kind: DescriptorKind::ServerConfiguration,
            uuid: descriptors::SERVER_CHARACTERISTIC_CONFIGURATION,
            data: vec![0x01, 0x00],
        };
        assert_eq!(
            server.server_configuration(),
            Some(ServerConfiguration { broadcast: true })
        );
        assert_eq!(server.extended_properties(), None);
    }

    #[test]
    fn descriptor_kind_codes_round_trip() {
        for code in 0..=6 {
            let kind = DescriptorKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(DescriptorKind::from_code(7), None);
    }

    #[test]
    fn properties_accessors() {
        let properties = CharacteristicProperties::READ | CharacteristicProperties::NOTIFY;
        assert!(properties.is_readable());
        assert!(!properties.is_writable());
        assert!(CharacteristicProperties::WRITE_WITHOUT_RESPONSE.is_writable());
        assert_eq!(properties.to_string(), "READ | NOTIFY");
    }
}
