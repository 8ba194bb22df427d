//! SNES address-space mapping variants.

use std::fmt;

/// Cartridge mapping classification.
///
/// The mapping decides how a 24-bit SNES bus address translates to an offset
/// inside the ROM file. `ExLoRom`, `ExHiRom` and `Sdd1` are refinements of
/// the two base mappings, discovered from the header markup byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RomType {
    LoRom,
    HiRom,
    ExLoRom,
    ExHiRom,
    Sdd1,
}

impl RomType {
    /// Translate a SNES bus address into a file offset.
    ///
    /// Total over the whole 24-bit space; addresses that do not map to
    /// cartridge ROM still produce an offset (possibly past the end of the
    /// image, where reads behave as open bus).
    pub fn translate(self, address: u32) -> usize {
        let address = address & 0xFF_FFFF;

        let offset = match self {
            RomType::LoRom => Self::lorom(address),
            RomType::HiRom => address & 0x3F_FFFF,
            RomType::ExLoRom => {
                if address & 0x80_0000 != 0 {
                    Self::lorom(address)
                } else {
                    Self::lorom(address) + 0x40_0000
                }
            }
            RomType::ExHiRom => {
                if address & 0xC0_0000 != 0xC0_0000 {
                    (address & 0x3F_FFFF) | 0x40_0000
                } else {
                    address & 0x3F_FFFF
                }
            }
            RomType::Sdd1 => {
                if address >= 0xC0_0000 {
                    address & 0x3F_FFFF
                } else {
                    Self::lorom(address)
                }
            }
        };

        offset as usize
    }

    fn lorom(address: u32) -> u32 {
        ((address & 0x7F_0000) >> 1) | (address & 0x7FFF)
    }

    /// Bank offset added to header addresses before translation.
    ///
    /// ExLoROM and S-DD1 images keep their header in bank 0x80.
    pub fn header_base(self) -> u32 {
        match self {
            RomType::ExLoRom | RomType::Sdd1 => 0x80_0000,
            _ => 0,
        }
    }
}

impl fmt::Display for RomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomType::LoRom => write!(f, "LoROM"),
            RomType::HiRom => write!(f, "HiROM"),
            RomType::ExLoRom => write!(f, "ExLoROM"),
            RomType::ExHiRom => write!(f, "ExHiROM"),
            RomType::Sdd1 => write!(f, "SDD-1"),
        }
    }
}
