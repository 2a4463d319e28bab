//! Human-readable output.

use std::io::{Result, Write};
use rpi_i2c_bsc::address::PhysicalAddress;
use rpi_i2c_bsc::registers::{DelayPair, RegisterBlock};
use rpi_i2c_bsc::timing::Timing;

/// Timing values as read back from the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CurrentTiming {
    pub cdiv: u16,
    pub tout: u16,
    pub delay: DelayPair,
}

pub struct Reporter<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> Reporter<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Reporter { out }
    }

    pub fn usage(&mut self, usage: &str) -> Result<()> {
        writeln!(self.out, "{}", usage)
    }

    pub fn banner(&mut self, program: &str) -> Result<()> {
        writeln!(self.out, "Raspberry Pi I2C timing utility\n")?;
        writeln!(self.out, "To read current timing values, run the program without arguments.")?;
        writeln!(self.out, "To set new timing values: {} <div.cdiv> <clkt.tout>\n", program)
    }

    pub fn peripheral_base(&mut self, base: u32) -> Result<()> {
        writeln!(self.out, "ARM peripheral address base: {:#010x}", base)
    }

    /// Prints the core clock rate, or why it could not be read.
    pub fn core_clock(&mut self, rate: &eyre::Result<u32>) -> Result<()> {
        match rate {
            Ok(rate) => writeln!(self.out, "Core clock (Hz): {}", rate),
            Err(err) => writeln!(self.out, "{}", err),
        }
    }

    pub fn controller_address(&mut self, address: PhysicalAddress) -> Result<()> {
        writeln!(self.out, "I2C1 controller address base: {}", address)
    }

    pub fn current(&mut self, timing: &CurrentTiming) -> Result<()> {
        writeln!(self.out, "DIV.CDIV: {}", timing.cdiv)?;
        writeln!(self.out, "CLKT.TOUT: {}", timing.tout)?;
        writeln!(self.out, "DEL.FEDL: {}, DEL.REDL: {}", timing.delay.fedl, timing.delay.redl)
    }

    /// Prints a register dump. Registers that were not read are shown as dashes.
    pub fn registers(&mut self, block: &RegisterBlock) -> Result<()> {
        writeln!(self.out, "Registers:")?;
        for (register, value) in block.iter() {
            if register.read_has_side_effects() {
                writeln!(self.out, "  {:>4} (+{:#04x}): ----------", register, register.offset())?;
            } else {
                writeln!(self.out, "  {:>4} (+{:#04x}): {:#010x}", register, register.offset(), value)?;
            }
        }
        Ok(())
    }

    pub fn updating_delay(&mut self, delay: &DelayPair) -> Result<()> {
        writeln!(self.out, "Updating delay values to: FEDL={}, REDL={}.", delay.fedl, delay.redl)
    }

    pub fn updated(&mut self, old: &CurrentTiming, new: &Timing) -> Result<()> {
        writeln!(self.out, "Timing values updated: CDIV={}, CLKT={}.", new.cdiv, new.tout)?;
        writeln!(
            self.out,
            "  CDIV {} -> {}, TOUT {} -> {}, FEDL {} -> {}, REDL {} -> {}",
            old.cdiv,
            new.cdiv,
            old.tout,
            new.tout,
            old.delay.fedl,
            new.delay.fedl,
            old.delay.redl,
            new.delay.redl,
        )
    }
}
