// Drive identification
//
// - classifier.rs: USB bridge detection selecting the ATA command dialect
// - resolve.rs: /dev/disk/by-* name resolution

pub mod classifier;
pub mod resolve;

#[cfg(test)]
mod classifier_tests;

pub use classifier::{BridgeDescriptor, CommandDialect, DeviceClassifier};
pub use resolve::canonical_device_name;
