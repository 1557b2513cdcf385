/// Linux generic SCSI (sg) transport
///
/// Commands go through the `SG_IO` ioctl on a block device node. The
/// `sg_io_hdr` layout mirrors `<scsi/sg.h>`; nothing outside this module
/// touches it.
use super::sense::SgStatus;
use crate::{IdleError, IdleResult};
use std::fs::OpenOptions;
use std::os::unix::io::{IntoRawFd, RawFd};
use std::path::Path;

pub const SENSE_BUF_LEN: usize = 32;

/// Oldest sg driver with the `SG_IO` v3 interface
pub const SG_MIN_VERSION: libc::c_int = 30000;

pub const SG_GET_VERSION_NUM: libc::c_ulong = 0x2282;
pub const SG_IO: libc::c_ulong = 0x2285;

pub const SG_DXFER_NONE: libc::c_int = -1;
pub const SG_DXFER_FROM_DEV: libc::c_int = -3;

/// Timeout for commands that read data back (probes)
pub const PROBE_TIMEOUT_MS: u32 = 20_000;
/// Zero lets the kernel apply its own default
pub const NO_TIMEOUT: u32 = 0;

/// `struct sg_io_hdr` (v3 interface, interface_id 'S')
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHdr {
    pub interface_id: libc::c_int,
    pub dxfer_direction: libc::c_int,
    pub cmd_len: libc::c_uchar,
    pub mx_sb_len: libc::c_uchar,
    pub iovec_count: libc::c_ushort,
    pub dxfer_len: libc::c_uint,
    pub dxferp: *mut libc::c_void,
    pub cmdp: *const libc::c_uchar,
    pub sbp: *mut libc::c_uchar,
    pub timeout: libc::c_uint,
    pub flags: libc::c_uint,
    pub pack_id: libc::c_int,
    pub usr_ptr: *mut libc::c_void,
    pub status: libc::c_uchar,
    pub masked_status: libc::c_uchar,
    pub msg_status: libc::c_uchar,
    pub sb_len_wr: libc::c_uchar,
    pub host_status: libc::c_ushort,
    pub driver_status: libc::c_ushort,
    pub resid: libc::c_int,
    pub duration: libc::c_uint,
    pub info: libc::c_uint,
}

#[cfg(target_os = "linux")]
mod ioctl {
    use super::{SgIoHdr, SG_GET_VERSION_NUM, SG_IO};

    nix::ioctl_read_bad!(sg_get_version_num, SG_GET_VERSION_NUM, libc::c_int);
    nix::ioctl_readwrite_bad!(sg_io, SG_IO, SgIoHdr);
}

/// How the device node is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Data phase of a command
#[derive(Debug)]
pub enum DataTransfer<'a> {
    None,
    FromDevice(&'a mut [u8]),
}

/// Anything that executes CDBs and reports their completion status
pub trait SgTarget {
    /// Device path used in error messages
    fn path(&self) -> &str;

    fn submit(
        &self,
        cdb: &[u8],
        data: DataTransfer<'_>,
        timeout_ms: u32,
    ) -> IdleResult<SgStatus>;
}

/// An open sg-capable device node
#[derive(Debug)]
pub struct SgDevice {
    path: String,
    fd: Option<RawFd>,
}

impl SgDevice {
    /// Open `path` and make sure it speaks the sg v3 interface
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> IdleResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == AccessMode::ReadWrite)
            .open(path)
            .map_err(|source| IdleError::DeviceOpen {
                device: path.display().to_string(),
                source,
            })?;

        let device = Self {
            path: path.display().to_string(),
            fd: Some(file.into_raw_fd()),
        };

        // dropping `device` on the error path closes the descriptor
        match device.version() {
            Ok(version) if version >= SG_MIN_VERSION => Ok(device),
            _ => Err(IdleError::NotSgDevice(device.path.clone())),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn raw_fd(&self) -> IdleResult<RawFd> {
        self.fd
            .ok_or_else(|| IdleError::NotSgDevice(self.path.clone()))
    }

    #[cfg(target_os = "linux")]
    fn version(&self) -> IdleResult<libc::c_int> {
        let fd = self.raw_fd()?;
        let mut version: libc::c_int = 0;
        unsafe { ioctl::sg_get_version_num(fd, &mut version) }.map_err(|errno| {
            IdleError::Ioctl {
                device: self.path.clone(),
                errno,
            }
        })?;
        Ok(version)
    }

    #[cfg(not(target_os = "linux"))]
    fn version(&self) -> IdleResult<libc::c_int> {
        Err(IdleError::Unsupported("SG_IO requires Linux".to_string()))
    }

    /// Submit one command and return its completion status.
    ///
    /// Only ioctl-level failures are errors here; the caller decides what
    /// the returned status means.
    #[cfg(target_os = "linux")]
    pub fn submit(
        &self,
        cdb: &[u8],
        data: DataTransfer<'_>,
        timeout_ms: u32,
    ) -> IdleResult<SgStatus> {
        let fd = self.raw_fd()?;
        let mut sense = [0u8; SENSE_BUF_LEN];

        let (direction, dxferp, dxfer_len) = match data {
            DataTransfer::None => (SG_DXFER_NONE, std::ptr::null_mut(), 0),
            DataTransfer::FromDevice(buf) => (
                SG_DXFER_FROM_DEV,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len() as libc::c_uint,
            ),
        };

        let mut hdr = SgIoHdr {
            interface_id: 'S' as libc::c_int,
            dxfer_direction: direction,
            cmd_len: cdb.len() as libc::c_uchar,
            mx_sb_len: SENSE_BUF_LEN as libc::c_uchar,
            iovec_count: 0,
            dxfer_len,
            dxferp,
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: timeout_ms,
            flags: 0,
            pack_id: 0,
            usr_ptr: std::ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        unsafe { ioctl::sg_io(fd, &mut hdr) }.map_err(|errno| IdleError::Ioctl {
            device: self.path.clone(),
            errno,
        })?;

        let written = (hdr.sb_len_wr as usize).min(SENSE_BUF_LEN);
        Ok(SgStatus {
            status: hdr.status,
            masked_status: hdr.masked_status,
            host_status: hdr.host_status,
            driver_status: hdr.driver_status,
            info: hdr.info,
            sense: sense[..written].to_vec(),
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn submit(
        &self,
        _cdb: &[u8],
        _data: DataTransfer<'_>,
        _timeout_ms: u32,
    ) -> IdleResult<SgStatus> {
        Err(IdleError::Unsupported("SG_IO requires Linux".to_string()))
    }

    /// Close the node, reporting a failed close
    pub fn close(mut self) -> IdleResult<()> {
        match self.fd.take() {
            Some(fd) => nix::unistd::close(fd).map_err(|source| IdleError::DeviceClose {
                device: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl SgTarget for SgDevice {
    fn path(&self) -> &str {
        SgDevice::path(self)
    }

    fn submit(
        &self,
        cdb: &[u8],
        data: DataTransfer<'_>,
        timeout_ms: u32,
    ) -> IdleResult<SgStatus> {
        SgDevice::submit(self, cdb, data, timeout_ms)
    }
}

impl Drop for SgDevice {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            let _ = nix::unistd::close(fd);
        }
    }
}

/// Open `path`, run `f`, and close the node on every path.
///
/// A close failure turns a successful command into an error.
pub fn with_device<T, F>(path: impl AsRef<Path>, mode: AccessMode, f: F) -> IdleResult<T>
where
    F: FnOnce(&SgDevice) -> IdleResult<T>,
{
    let device = SgDevice::open(path, mode)?;
    let result = f(&device);
    let closed = device.close();
    with_close_result(result, closed)
}

/// Combine a command outcome with the close that followed it.
///
/// A failed close fails an otherwise successful command; after a failed
/// command the close error is only logged.
pub fn with_close_result<T>(result: IdleResult<T>, closed: IdleResult<()>) -> IdleResult<T> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Err(close_err)) => {
            tracing::warn!("{}", close_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
    }
}
