//! BSC register layout and the codec for the timing fields.
//!
//! Layout follows section 3.2 of the BCM2711 ARM Peripherals manual. Every BSC controller has
//! eight 32-bit registers, one after the other, starting at the controller base:
//!
//! | Offset | Name   | Used here                                   |
//! |--------|--------|---------------------------------------------|
//! | `0x00` | `C`    | no                                          |
//! | `0x04` | `S`    | no                                          |
//! | `0x08` | `DLEN` | no                                          |
//! | `0x0C` | `A`    | no                                          |
//! | `0x10` | `FIFO` | no                                          |
//! | `0x14` | `DIV`  | `CDIV` in bits 15:0                         |
//! | `0x18` | `DEL`  | `FEDL` in bits 31:16, `REDL` in bits 15:0   |
//! | `0x1C` | `CLKT` | `TOUT` in bits 15:0                         |

use std::fmt::{Display, Formatter};
use std::mem::size_of;
use log::trace;
use crate::timing::Timing;

/// One of the eight registers of a BSC controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Register {
    /// Control.
    C,
    /// Status.
    S,
    /// Data length.
    Dlen,
    /// Slave address.
    A,
    /// Data FIFO.
    Fifo,
    /// Clock divider.
    Div,
    /// Data delay.
    Del,
    /// Clock stretch timeout.
    Clkt,
}

impl Register {
    /// All registers, in hardware order.
    pub const ALL: [Register; 8] = [
        Register::C,
        Register::S,
        Register::Dlen,
        Register::A,
        Register::Fifo,
        Register::Div,
        Register::Del,
        Register::Clkt,
    ];

    /// Gets the index of the register, counted in 32-bit words from the controller base.
    pub fn index(&self) -> usize {
        match self {
            Register::C => 0,
            Register::S => 1,
            Register::Dlen => 2,
            Register::A => 3,
            Register::Fifo => 4,
            Register::Div => 5,
            Register::Del => 6,
            Register::Clkt => 7,
        }
    }

    /// Gets the byte offset of the register from the controller base.
    pub fn offset(&self) -> usize {
        self.index() * 4
    }

    /// Whether reading the register changes controller state.
    ///
    /// Reading `FIFO` pops a byte from the receive FIFO.
    pub fn read_has_side_effects(&self) -> bool {
        matches!(self, Register::Fifo)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Register::C => "C",
            Register::S => "S",
            Register::Dlen => "DLEN",
            Register::A => "A",
            Register::Fifo => "FIFO",
            Register::Div => "DIV",
            Register::Del => "DEL",
            Register::Clkt => "CLKT",
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// Word-level access to a BSC register block.
///
/// Implemented by the live [RegisterWindow](crate::window::RegisterWindow) and by a plain
/// [RegisterBlock] in memory.
pub trait RegisterAccess {
    /// Reads the whole 32-bit register.
    fn read(&self, register: Register) -> u32;
    /// Writes the whole 32-bit register.
    fn write(&mut self, register: Register, value: u32);
}

/// Plain copy of a BSC register block, matching the hardware layout bit for bit.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterBlock {
    pub c: u32,
    pub s: u32,
    pub dlen: u32,
    pub a: u32,
    pub fifo: u32,
    pub div: u32,
    pub del: u32,
    pub clkt: u32,
}

const _: () = assert!(size_of::<RegisterBlock>() == 32);

impl RegisterBlock {
    /// Size of the register block in bytes.
    pub const SIZE: usize = size_of::<RegisterBlock>();

    /// Copies the registers out of `registers` for display.
    ///
    /// Registers whose reads have side effects (see [Register::read_has_side_effects]) are left
    /// at zero.
    pub fn snapshot<R: RegisterAccess + ?Sized>(registers: &R) -> Self {
        let mut block = RegisterBlock::default();
        for register in Register::ALL {
            if !register.read_has_side_effects() {
                block.write(register, registers.read(register));
            }
        }
        block
    }

    /// Iterates over `(register, value)` pairs in hardware order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u32)> + '_ {
        Register::ALL.into_iter().map(|register| (register, self.read(register)))
    }
}

impl RegisterAccess for RegisterBlock {
    fn read(&self, register: Register) -> u32 {
        match register {
            Register::C => self.c,
            Register::S => self.s,
            Register::Dlen => self.dlen,
            Register::A => self.a,
            Register::Fifo => self.fifo,
            Register::Div => self.div,
            Register::Del => self.del,
            Register::Clkt => self.clkt,
        }
    }

    fn write(&mut self, register: Register, value: u32) {
        let field = match register {
            Register::C => &mut self.c,
            Register::S => &mut self.s,
            Register::Dlen => &mut self.dlen,
            Register::A => &mut self.a,
            Register::Fifo => &mut self.fifo,
            Register::Div => &mut self.div,
            Register::Del => &mut self.del,
            Register::Clkt => &mut self.clkt,
        };
        *field = value;
    }
}

/// Falling and rising edge delays, as stored in the `DEL` register.
///
/// Both are counted in core clock cycles.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DelayPair {
    /// Cycles to wait after a falling SCL edge before outputting the next data bit.
    pub fedl: u16,
    /// Cycles to wait after a rising SCL edge before sampling the next data bit.
    pub redl: u16,
}

impl DelayPair {
    const FEDL_SHIFT: u32 = 16;
    const REDL_SHIFT: u32 = 0;

    pub fn new(fedl: u16, redl: u16) -> Self {
        DelayPair { fedl, redl }
    }

    /// Packs the pair into a `DEL` register value.
    pub fn pack(&self) -> u32 {
        ((self.fedl as u32) << Self::FEDL_SHIFT) | ((self.redl as u32) << Self::REDL_SHIFT)
    }

    /// Unpacks a `DEL` register value.
    pub fn unpack(del: u32) -> Self {
        DelayPair {
            fedl: ((del >> Self::FEDL_SHIFT) & 0xFFFF) as u16,
            redl: ((del >> Self::REDL_SHIFT) & 0xFFFF) as u16,
        }
    }
}

/// Reads `DIV.CDIV`.
pub fn read_cdiv<R: RegisterAccess + ?Sized>(registers: &R) -> u16 {
    (registers.read(Register::Div) & 0xFFFF) as u16
}

/// Reads `CLKT.TOUT`.
pub fn read_tout<R: RegisterAccess + ?Sized>(registers: &R) -> u16 {
    (registers.read(Register::Clkt) & 0xFFFF) as u16
}

/// Reads `DEL.FEDL` and `DEL.REDL`.
pub fn read_delay<R: RegisterAccess + ?Sized>(registers: &R) -> DelayPair {
    DelayPair::unpack(registers.read(Register::Del))
}

/// Writes a validated [Timing] to `DIV`, `CLKT` and `DEL`, in that order.
///
/// The upper halves of `DIV` and `CLKT` are written as zero, they are reserved.
pub fn write_timing<R: RegisterAccess + ?Sized>(registers: &mut R, timing: &Timing) {
    let div = timing.cdiv as u32 & 0x0000_FFFF;
    let clkt = timing.tout as u32 & 0x0000_FFFF;
    let del = timing.delay.pack();

    trace!("Writing DIV={:#010x} CLKT={:#010x} DEL={:#010x}", div, clkt, del);
    registers.write(Register::Div, div);
    registers.write(Register::Clkt, clkt);
    registers.write(Register::Del, del);
}
