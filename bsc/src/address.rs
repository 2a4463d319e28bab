//! Physical address resolution for the BSC1 register block.
//!
//! The BCM2711 peripherals manual lists BSC1 at bus address `0x7E804000`. That is a VideoCore
//! *bus* address; the ARM side sees the same registers at a different *physical* address, which
//! is what `/dev/mem` expects. On the Raspberry Pi 4B the bus range starting at `0x7E000000` is
//! mapped to the ARM physical base `0xFE000000` ([bcm2711-rpi-4-b.dts]), on older boards to
//! `0x3F000000` or `0x20000000`. The firmware exposes the active mapping in the device tree, so
//! it is queried on every run instead of being hardcoded.
//!
//! [bcm2711-rpi-4-b.dts]: https://github.com/raspberrypi/linux/blob/17cba8a/arch/arm/boot/dts/bcm2711-rpi-4-b.dts#L46

use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use log::{debug, trace};
use crate::{BscError, BscResult};

/// Offset of the BSC1 controller from the start of the peripheral space.
pub const I2C1_OFFSET: u32 = 0x0080_4000;

/// An ARM physical address, as understood by `/dev/mem`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub u64);

impl PhysicalAddress {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for PhysicalAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Source of the SoC's peripheral physical address base.
pub trait PeripheralBase: Debug {
    /// Queries the platform for the peripheral address base.
    ///
    /// # Errors
    /// - [BscError::PlatformQuery] if the platform does not expose it.
    fn peripheral_base(&self) -> BscResult<u32>;
}

/// Reads the peripheral base from the `soc` node's `ranges` property in the device tree.
///
/// The property is a list of big-endian 32-bit cells: `<child-bus-address parent-address size>`.
/// On 32-bit layouts the parent address is the second cell. The BCM2711 uses two cells for the
/// parent address, so the second cell is `0` and the base is in the third one.
pub struct DeviceTreeRanges {
    path: PathBuf,
}

impl DeviceTreeRanges {
    pub const RANGES_PATH: &'static str = "/proc/device-tree/soc/ranges";

    pub fn new() -> Self {
        Self::with_path(Self::RANGES_PATH)
    }

    /// Creates a [DeviceTreeRanges] reading from a different `ranges` file.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        DeviceTreeRanges {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads the big-endian cell at `offset`, if the property is long enough.
    fn cell(ranges: &[u8], offset: usize) -> Option<u32> {
        let bytes = ranges.get(offset..offset + 4)?;
        Some(u32::from_be_bytes(bytes.try_into().ok()?))
    }

    /// Extracts the peripheral base from the raw contents of a `ranges` property.
    pub fn parse(ranges: &[u8]) -> BscResult<u32> {
        let base = match Self::cell(ranges, 4) {
            Some(0) => Self::cell(ranges, 8),
            cell => cell,
        };

        match base {
            Some(0) => Err(BscError::PlatformQuery("peripheral base in device tree is zero".to_string())),
            Some(base) => Ok(base),
            None => Err(BscError::PlatformQuery(format!(
                "device tree ranges too short ({} bytes)",
                ranges.len()
            ))),
        }
    }
}

impl Default for DeviceTreeRanges {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for DeviceTreeRanges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeviceTreeRanges({})", self.path.display())
    }
}

impl PeripheralBase for DeviceTreeRanges {
    fn peripheral_base(&self) -> BscResult<u32> {
        let ranges = std::fs::read(&self.path)
            .map_err(|err| BscError::PlatformQuery(format!("{}: {}", self.path.display(), err)))?;
        trace!("Read {} bytes from {}", ranges.len(), self.path.display());
        Self::parse(&ranges)
    }
}

/// Gets the physical address of the BSC1 register block for a known peripheral base.
pub fn register_block_address(peripheral_base: u32) -> PhysicalAddress {
    PhysicalAddress(peripheral_base as u64 + I2C1_OFFSET as u64)
}

/// Where the BSC1 register block lives on the running SoC.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResolvedAddress {
    /// The peripheral base reported by the platform.
    pub peripheral_base: u32,
    /// The physical address of the BSC1 register block.
    pub address: PhysicalAddress,
}

/// Queries the platform and resolves the physical address of the BSC1 register block.
pub fn resolve_register_block_address<P: PeripheralBase + ?Sized>(platform: &P) -> BscResult<ResolvedAddress> {
    let peripheral_base = platform.peripheral_base()?;
    let address = register_block_address(peripheral_base);
    debug!("{:?}: peripheral base {:#010x}, BSC1 at {}", platform, peripheral_base, address);
    Ok(ResolvedAddress { peripheral_base, address })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug)]
    struct FixedBase(u32);

    impl PeripheralBase for FixedBase {
        fn peripheral_base(&self) -> BscResult<u32> {
            Ok(self.0)
        }
    }

    #[test]
    fn bcm2711_ranges_use_the_third_cell() {
        // Raspberry Pi 4B: <0x7e000000 0x0 0xfe000000 0x01800000 ...>
        let ranges = [
            0x7e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfe, 0x00, 0x00, 0x00, 0x01, 0x80,
            0x00, 0x00,
        ];
        assert_eq!(DeviceTreeRanges::parse(&ranges).unwrap(), 0xFE00_0000);
    }

    #[test]
    fn bcm2837_ranges_use_the_second_cell() {
        let ranges = [0x7e, 0x00, 0x00, 0x00, 0x3f, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(DeviceTreeRanges::parse(&ranges).unwrap(), 0x3F00_0000);
    }

    #[test]
    fn short_or_zero_ranges_fail() {
        assert!(matches!(
            DeviceTreeRanges::parse(&[0x7e, 0x00, 0x00]),
            Err(BscError::PlatformQuery(_))
        ));
        assert!(matches!(
            DeviceTreeRanges::parse(&[0x7e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
            Err(BscError::PlatformQuery(_))
        ));
        assert!(matches!(
            DeviceTreeRanges::parse(&[0u8; 16]),
            Err(BscError::PlatformQuery(_))
        ));
    }

    #[test]
    fn reads_ranges_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x7e, 0x00, 0x00, 0x00, 0x3f, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00])
            .unwrap();

        let platform = DeviceTreeRanges::with_path(file.path());
        assert_eq!(platform.peripheral_base().unwrap(), 0x3F00_0000);
    }

    #[test]
    fn missing_ranges_file_is_a_platform_error() {
        let dir = tempfile::tempdir().unwrap();
        let platform = DeviceTreeRanges::with_path(dir.path().join("ranges"));
        assert!(matches!(
            platform.peripheral_base(),
            Err(BscError::PlatformQuery(_))
        ));
    }

    #[test]
    fn adds_bsc1_offset() {
        let resolved = resolve_register_block_address(&FixedBase(0xFE00_0000)).unwrap();
        assert_eq!(resolved.peripheral_base, 0xFE00_0000);
        assert_eq!(resolved.address, PhysicalAddress(0xFE80_4000));
        assert_eq!(resolved.address.to_string(), "0xfe804000");

        let resolved = resolve_register_block_address(&FixedBase(0x2000_0000)).unwrap();
        assert_eq!(resolved.address.value(), 0x2080_4000);
    }

    #[test]
    fn platform_errors_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let platform = DeviceTreeRanges::with_path(dir.path().join("ranges"));
        assert!(matches!(
            resolve_register_block_address(&platform),
            Err(BscError::PlatformQuery(_))
        ));
    }

    #[test]
    fn top_of_address_space_does_not_wrap() {
        assert_eq!(register_block_address(0xFFFF_F000).value(), 0x1_0080_3000);
    }
}
