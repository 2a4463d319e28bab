use std::io;
use std::io::Write;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use rpi_i2c_bsc::address::{resolve_register_block_address, DeviceTreeRanges, PeripheralBase};
use rpi_i2c_bsc::registers::{read_cdiv, read_delay, read_tout, write_timing, RegisterBlock};
use rpi_i2c_bsc::timing::validate_and_derive;
use rpi_i2c_bsc::window::{DevMem, RegisterMapper};
use rpi_i2c_bsc::BscError;
use thiserror::Error;
use crate::args::{Command, USAGE};
use crate::core_clock::{read_core_clock, CORE_CLOCK_PATH};
use crate::report::{CurrentTiming, Reporter};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("wrong number of arguments")]
    Usage,
    #[error("could not parse {name} value {value:?}: {source}")]
    Parse {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error(transparent)]
    Bsc(#[from] BscError),
    #[error("could not write output: {0}")]
    Output(#[from] io::Error),
}

impl AppError {
    /// Gets the process exit code that reports this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage => -1,
            AppError::Parse { .. } => libc::EINVAL,
            AppError::Bsc(err) => err.exit_code(),
            AppError::Output(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// The timing utility, wired to a platform and a register mapper.
pub struct App<P: PeripheralBase, M: RegisterMapper> {
    platform: P,
    mapper: M,
    core_clock_path: PathBuf,
    program: String,
}

impl App<DeviceTreeRanges, DevMem> {
    /// Creates an [App] using the device tree and `/dev/mem` of the running system.
    pub fn from_system(program: impl Into<String>) -> Self {
        App::new(DeviceTreeRanges::new(), DevMem::new(), CORE_CLOCK_PATH, program)
    }
}

impl<P: PeripheralBase, M: RegisterMapper> App<P, M> {
    pub fn new(
        platform: P,
        mapper: M,
        core_clock_path: impl AsRef<Path>,
        program: impl Into<String>,
    ) -> Self {
        App {
            platform,
            mapper,
            core_clock_path: core_clock_path.as_ref().to_path_buf(),
            program: program.into(),
        }
    }

    /// Runs the utility with the given arguments (without the program name).
    ///
    /// Every value is parsed and validated before the hardware is touched. The register window
    /// is dropped before this returns, whatever the outcome.
    pub fn run<S: AsRef<str>>(&self, args: &[S], out: &mut impl Write) -> Result<(), AppError> {
        let mut report = Reporter::new(out);

        let command = match Command::parse(args) {
            Err(AppError::Usage) => {
                report.usage(USAGE)?;
                return Err(AppError::Usage);
            }
            command => command,
        };

        report.banner(&self.program)?;
        let command = command?;
        debug!("{:?}", command);

        let timing = match command {
            Command::Read => None,
            Command::Write { cdiv, tout } => Some(validate_and_derive(cdiv, tout)?),
        };

        let resolved = resolve_register_block_address(&self.platform)?;
        report.peripheral_base(resolved.peripheral_base)?;

        let core_clock = read_core_clock(&self.core_clock_path);
        if let Err(err) = &core_clock {
            debug!("{:?}", err);
        }
        report.core_clock(&core_clock)?;

        let address = resolved.address;
        report.controller_address(address)?;

        let mut window = self.mapper.map(address)?;

        let current = CurrentTiming {
            cdiv: read_cdiv(&window),
            tout: read_tout(&window),
            delay: read_delay(&window),
        };
        report.current(&current)?;
        report.registers(&RegisterBlock::snapshot(&window))?;

        if let Some(timing) = timing {
            warn!("Writing BSC1 timing at {}, the bus should be idle", address);
            report.updating_delay(&timing.delay)?;
            write_timing(&mut window, &timing);
            info!("{:?} -> {:?}", current, timing);
            report.updated(&current, &timing)?;
        }

        Ok(())
    }
}
