/// Tests for USB bridge classification against fake sysfs trees
use super::classifier::*;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_case::test_case;

/// Build a sysfs-like tree:
///   <root>/devices/pci0000:00/0000:00:15.0/usb2/2-2/2-2.3/2-2.3.2/{idVendor,idProduct,bcdDevice}
///   <root>/devices/.../2-2.3.2/2-2.3.2:1.0/host5/target5:0:0/5:0:0:0/block/<disk>
///   <root>/block/<disk> -> the block directory above
fn fake_sysfs(disk: &str, vendor: &str, product: &str, revision: &str) -> (TempDir, PathBuf) {
    let root = TempDir::new().unwrap();
    let usb_dir = root
        .path()
        .join("devices/pci0000:00/0000:00:15.0/usb2/2-2/2-2.3/2-2.3.2");
    let block_dir = usb_dir
        .join("2-2.3.2:1.0/host5/target5:0:0/5:0:0:0/block")
        .join(disk);
    fs::create_dir_all(&block_dir).unwrap();

    fs::write(usb_dir.join("idVendor"), vendor).unwrap();
    fs::write(usb_dir.join("idProduct"), product).unwrap();
    fs::write(usb_dir.join("bcdDevice"), revision).unwrap();

    let sys_block = root.path().join("block");
    fs::create_dir_all(&sys_block).unwrap();
    symlink(&block_dir, sys_block.join(disk)).unwrap();

    (root, sys_block)
}

#[test_case("152d\n", "2339\n", CommandDialect::JMicron ; "jmicron 2339")]
#[test_case("152d", "2329", CommandDialect::JMicron ; "jmicron 2329")]
#[test_case("152d", "0578", CommandDialect::Standard ; "jmicron unsupported product")]
#[test_case("1058", "25a3", CommandDialect::Standard ; "western digital enclosure")]
fn test_classify_usb_bridge(vendor: &str, product: &str, expected: CommandDialect) {
    let (_root, sys_block) = fake_sysfs("sde", vendor, product, "0100");
    let classifier = DeviceClassifier::new(&sys_block);

    assert_eq!(classifier.classify("sde"), expected);
}

#[test]
fn test_bridge_descriptor_values_are_hex() {
    let (_root, sys_block) = fake_sysfs("sde", "152d", "2339", "0100");
    let descriptor = DeviceClassifier::new(&sys_block)
        .bridge_descriptor("sde")
        .expect("descriptor should be found");

    assert_eq!(
        descriptor,
        BridgeDescriptor {
            vendor_id: 0x152d,
            product_id: 0x2339,
            device_revision: 0x0100,
        }
    );
}

#[test]
fn test_malformed_attribute_falls_back_to_standard() {
    let (_root, sys_block) = fake_sysfs("sde", "not-hex", "2339", "0100");
    let classifier = DeviceClassifier::new(&sys_block);

    assert!(classifier.bridge_descriptor("sde").is_none());
    assert_eq!(classifier.classify("sde"), CommandDialect::Standard);
}

#[test]
fn test_unknown_disk_is_standard() {
    let root = TempDir::new().unwrap();
    let classifier = DeviceClassifier::new(root.path());

    assert_eq!(classifier.classify("sdx"), CommandDialect::Standard);
}

#[test]
fn test_attribute_on_device_itself() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("idVendor"), "abcd").unwrap();

    let dir = find_attribute_dir(root.path(), "idVendor").unwrap();
    assert_eq!(read_hex_attribute(&dir, "idVendor"), Some(0xabcd));
}

#[test]
fn test_walk_up_is_bounded() {
    let root = TempDir::new().unwrap();
    let mut deep: PathBuf = root.path().to_path_buf();
    for level in 0..(MAX_WALK_UP_DEPTH + 5) {
        deep.push(format!("l{}", level));
    }
    fs::create_dir_all(&deep).unwrap();
    fs::write(root.path().join("bcdDevice"), "0100").unwrap();

    assert!(find_attribute_dir(Path::new(&deep), "bcdDevice").is_none());
}

// ==================== SAME-NODE ATTRIBUTE TESTS ====================

#[test]
fn test_ids_are_read_from_the_vendor_node() {
    let (root, sys_block) = fake_sysfs("sde", "152d", "2339", "0100");
    // a nearer interface node carrying a stray idProduct must be ignored
    let interface = root
        .path()
        .join("devices/pci0000:00/0000:00:15.0/usb2/2-2/2-2.3/2-2.3.2/2-2.3.2:1.0");
    fs::write(interface.join("idProduct"), "0578").unwrap();

    let classifier = DeviceClassifier::new(&sys_block);
    let descriptor = classifier.bridge_descriptor("sde").unwrap();

    assert_eq!(descriptor.product_id, 0x2339);
    assert_eq!(classifier.classify("sde"), CommandDialect::JMicron);
}

#[test]
fn test_ids_split_across_nodes_are_not_combined() {
    let (root, sys_block) = fake_sysfs("sde", "152d", "2339", "0100");
    let usb_dir = root
        .path()
        .join("devices/pci0000:00/0000:00:15.0/usb2/2-2/2-2.3/2-2.3.2");
    // vendor node lacks idProduct; its parent hub still has one
    fs::remove_file(usb_dir.join("idProduct")).unwrap();
    fs::write(usb_dir.parent().unwrap().join("idProduct"), "2339").unwrap();

    let classifier = DeviceClassifier::new(&sys_block);
    assert!(classifier.bridge_descriptor("sde").is_none());
    assert_eq!(classifier.classify("sde"), CommandDialect::Standard);
}
