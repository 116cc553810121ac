//! Retrieval of complete GATT attribute trees from BLE devices.
//!
//! The crate enumerates devices through a [`platform::DeviceEnumerator`],
//! reads every service, characteristic and descriptor over the platform's
//! two-phase buffered query protocol, and returns an owned [`tree::Device`]
//! per device. On top of the tree it decodes TI SensorTag thermopile
//! samples and can poll them over time.
//!
//! ```
//! use gatt_tree::builder::TreeBuilder;
//! use gatt_tree::sim::{SimDevice, SimPlatform};
//!
//! let mut platform = SimPlatform::new();
//! platform.add_device(SimDevice::new(
//!     "dev-path",
//!     r"BTHLE\DEV_060504030201\8&1",
//!     "Widget",
//! ));
//! let mut enumerator = platform.enumerator();
//!
//! let devices = TreeBuilder::new(platform)
//!     .build_all(&mut enumerator)
//!     .unwrap();
//! assert_eq!(devices[0].info.address.to_string(), "060504030201");
//! ```

pub mod address;
pub mod bleuuid;
pub mod builder;
pub mod error;
pub mod monitor;
pub mod platform;
pub mod query;
pub mod records;
pub mod sensor;
pub mod sim;
pub mod tree;

pub use crate::error::{Error, Result};
