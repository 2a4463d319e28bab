//! Scoped mapping of a BSC register block.

use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use log::{debug, trace};
use memmap2::{MmapOptions, MmapRaw};
use crate::address::PhysicalAddress;
use crate::registers::{Register, RegisterAccess, RegisterBlock};
use crate::{BscError, BscResult};

/// Something that can map a register block at a physical address.
pub trait RegisterMapper: Debug {
    type Window: RegisterAccess + Debug;

    /// Maps the [RegisterBlock] at `address`.
    ///
    /// # Errors
    /// - [BscError::DeviceOpen] if the memory device cannot be opened.
    /// - [BscError::Map] if the mapping cannot be established.
    fn map(&self, address: PhysicalAddress) -> BscResult<Self::Window>;
}

/// Maps registers through a physical memory device, `/dev/mem` by default.
///
/// Requires root privileges (or `CAP_SYS_RAWIO`) and a kernel that does not restrict
/// `/dev/mem` to the low 1 MiB (`iomem=relaxed` on recent Raspberry Pi OS kernels).
pub struct DevMem {
    path: PathBuf,
}

impl DevMem {
    pub const DEV_MEM_PATH: &'static str = "/dev/mem";

    pub fn new() -> Self {
        Self::with_path(Self::DEV_MEM_PATH)
    }

    /// Creates a [DevMem] mapping from any file, which is handy for testing.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        DevMem {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for DevMem {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for DevMem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DevMem({})", self.path.display())
    }
}

impl RegisterMapper for DevMem {
    type Window = RegisterWindow;

    fn map(&self, address: PhysicalAddress) -> BscResult<RegisterWindow> {
        RegisterWindow::open(&self.path, address)
    }
}

/// A live, read-write, shared mapping of exactly one [RegisterBlock].
///
/// The mapping is released when the window is dropped. Nothing stops the kernel's own I2C
/// driver from touching the same registers in the meantime.
pub struct RegisterWindow {
    mmap: MmapRaw,
    address: PhysicalAddress,
}

impl RegisterWindow {
    /// Opens `path` for synchronous read-write access and maps the register block at `address`.
    ///
    /// The file is closed again before returning, the mapping stays valid without it.
    pub fn open(path: &Path, address: PhysicalAddress) -> BscResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| BscError::DeviceOpen {
                path: path.display().to_string(),
                source,
            })?;

        let mmap = MmapOptions::new()
            .offset(address.value())
            .len(RegisterBlock::SIZE)
            .map_raw(&file)
            .map_err(BscError::Map)?;

        let window = RegisterWindow { mmap, address };
        debug!("{:?} mapped from {}", window, path.display());
        Ok(window)
    }

    pub fn address(&self) -> PhysicalAddress {
        self.address
    }

    /// Releases the mapping now instead of at the end of the scope.
    pub fn close(self) {
        drop(self);
    }

    fn register_ptr(&self, register: Register) -> *mut u32 {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // Register::index is below 8, so this stays inside the mapping
        unsafe { mmap.add(register.index()) }
    }
}

impl Debug for RegisterWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegisterWindow({}, {:?})", self.address, self.mmap.as_ptr())
    }
}

impl RegisterAccess for RegisterWindow {
    fn read(&self, register: Register) -> u32 {
        let value = unsafe { self.register_ptr(register).read_volatile() };
        trace!("Read {}: {:#010x}", register, value);
        value
    }

    fn write(&mut self, register: Register, value: u32) {
        unsafe { self.register_ptr(register).write_volatile(value) };
        trace!("Wrote {}: {:#010x}", register, value);
    }
}

/// Releasing the window unmaps it.
///
/// `memmap2` ignores a failing `munmap`, so a release failure is not reported. Nothing is
/// retried either way.
impl Drop for RegisterWindow {
    fn drop(&mut self) {
        debug!("Unmapping {:?}", self);
    }
}
