//! VPU core clock rate, which the BSC clock divider divides.

use std::path::Path;
use eyre::WrapErr;

pub const CORE_CLOCK_PATH: &str = "/sys/kernel/debug/clk/vpu/clk_rate";

/// Reads the core clock rate in Hz from a debugfs `clk_rate` file.
///
/// Requires debugfs to be mounted and readable, which usually means root.
pub fn read_core_clock(path: &Path) -> eyre::Result<u32> {
    let contents = std::fs::read_to_string(path)
        .wrap_err("Could not open VPU core clock DebugFS path")?;
    let rate = contents
        .trim()
        .parse::<u32>()
        .wrap_err("Could not read VPU core clock")?;
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_decimal_rate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "500000000").unwrap();
        assert_eq!(read_core_clock(file.path()).unwrap(), 500_000_000);
    }

    #[test]
    fn missing_file_reports_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_core_clock(&dir.path().join("clk_rate")).unwrap_err();
        assert_eq!(err.to_string(), "Could not open VPU core clock DebugFS path");
    }

    #[test]
    fn garbage_reports_read_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "fast").unwrap();
        let err = read_core_clock(file.path()).unwrap_err();
        assert_eq!(err.to_string(), "Could not read VPU core clock");
    }
}
