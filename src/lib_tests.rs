// Tests for lib.rs: interrupt flag handling and error formatting

use super::*;
use serial_test::serial;

// ==================== INTERRUPT HANDLING TESTS ====================

#[test]
#[serial]
fn test_interrupt_initially_not_set() {
    reset_interrupted();
    assert!(
        !is_interrupted(),
        "Interrupt flag should initially be not set"
    );
}

#[test]
#[serial]
fn test_set_interrupt_flag() {
    reset_interrupted();
    set_interrupted();
    assert!(is_interrupted(), "Interrupt flag should be set");
    reset_interrupted();
}

#[test]
#[serial]
fn test_interrupt_flag_persistence() {
    reset_interrupted();
    set_interrupted();
    assert!(is_interrupted());
    assert!(
        is_interrupted(),
        "Flag should remain set on subsequent calls"
    );
    reset_interrupted();
}

#[test]
#[serial]
fn test_interrupt_visible_across_threads() {
    reset_interrupted();
    std::thread::spawn(set_interrupted).join().unwrap();
    assert!(is_interrupted());
    reset_interrupted();
    assert!(!is_interrupted());
}

// ==================== ERROR TYPE TESTS ====================

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: IdleError = io.into();
    assert!(matches!(err, IdleError::IoError(_)));
    assert_eq!(err.to_string(), "I/O error: gone");
}

#[test]
fn test_stats_source_error_keeps_source() {
    use std::error::Error;

    let err = IdleError::StatsSource {
        path: "/proc/diskstats".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    };
    assert_eq!(
        err.to_string(),
        "Cannot read disk statistics from /proc/diskstats: denied"
    );
    assert!(err.source().is_some());
}

#[test]
fn test_ioctl_error_display() {
    let err = IdleError::Ioctl {
        device: "/dev/sda".to_string(),
        errno: nix::errno::Errno::EACCES,
    };
    let text = err.to_string();
    assert!(text.starts_with("ioctl on /dev/sda failed"));
}

#[test]
fn test_command_and_resolution_errors_display() {
    let failed = IdleError::CommandFailed {
        device: "/dev/sdb".to_string(),
        details: "sense key NOT READY".to_string(),
    };
    assert_eq!(
        failed.to_string(),
        "Command failed on /dev/sdb: sense key NOT READY"
    );

    let missing = IdleError::SymlinkResolution("/dev/disk/by-id/usb-x".to_string());
    assert_eq!(
        missing.to_string(),
        "Cannot find device for /dev/disk/by-id/usb-x"
    );

    let not_sg = IdleError::NotSgDevice("/dev/sdc".to_string());
    assert!(not_sg.to_string().contains("sg device"));
}

#[test]
fn test_close_error_display() {
    let err = IdleError::DeviceClose {
        device: "/dev/sdd".to_string(),
        source: nix::errno::Errno::EBADF,
    };
    assert!(err.to_string().starts_with("Cannot close file /dev/sdd"));
}

#[test]
fn test_result_alias_propagates() {
    fn inner() -> IdleResult<u8> {
        Err(IdleError::InvalidArgument("bad".to_string()))
    }
    fn outer() -> IdleResult<u8> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert!(matches!(outer(), Err(IdleError::InvalidArgument(_))));
}

#[test]
fn test_open_error_names_the_device() {
    use std::error::Error;

    let err = IdleError::DeviceOpen {
        device: "/dev/sde".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
    };
    assert_eq!(
        err.to_string(),
        "Cannot open file /dev/sde. Error: No such file or directory"
    );
    assert!(err.source().is_some());
}
