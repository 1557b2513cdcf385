// Resolution of user-supplied device names
//
// Accepts `sda`, `/dev/sda` or a `/dev/disk/by-*/...` link and returns the
// kernel name of the whole disk.

use crate::{IdleError, IdleResult};
use std::fs;
use std::path::Path;

/// Canonical kernel name for a user-supplied device identifier
pub fn canonical_device_name(given: &str) -> IdleResult<String> {
    if !given.starts_with('/') {
        return Ok(given.to_string());
    }

    if !given.contains("by-") {
        return last_component(Path::new(given))
            .ok_or_else(|| IdleError::SymlinkResolution(given.to_string()));
    }

    let target = fs::read_link(given).map_err(|_| IdleError::SymlinkResolution(given.to_string()))?;
    let name = last_component(&target)
        .ok_or_else(|| IdleError::SymlinkResolution(given.to_string()))?;

    // by-id links may point at a partition; strip its number
    let disk = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if disk.is_empty() {
        return Err(IdleError::SymlinkResolution(given.to_string()));
    }
    Ok(disk.to_string())
}

fn last_component(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
