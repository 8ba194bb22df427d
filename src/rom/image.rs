//! ROM image loading and byte-level access.

use crate::rom::mapping::RomType;
use crate::rom::{Error, Result};
use log::info;
use std::fs;
use std::io;
use std::path::Path;

/// Cartridge header field offsets, as SNES bus addresses in bank 0.
mod header {
    pub const TITLE: u32 = 0xFFC0;
    pub const TITLE_LEN: usize = 21;
    pub const MARKUP: u32 = 0xFFD5;
    pub const SIZE: u32 = 0xFFD7;
    pub const NMI: u32 = 0xFFEA;
    pub const RESET: u32 = 0xFFFC;
}

/// A byte-addressable view of a cartridge image.
///
/// All read methods take SNES bus addresses; translation to file offsets
/// happens internally based on the discovered mapping. Reads beyond the end
/// of the image yield 0, mirroring open-bus behavior, so analysis never has
/// to handle a partial read.
pub struct Rom {
    data: Vec<u8>,
    rom_type: RomType,
}

impl Rom {
    /// Load a ROM image from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_reader(io::BufReader::new(file))
    }

    /// Load a ROM image from any byte source.
    pub fn from_reader<R: io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let base_type = discover_type(&data)?;
        let mut rom = Rom {
            data,
            rom_type: base_type,
        };
        rom.rom_type = rom.discover_subtype();

        info!(
            "loaded \"{}\": {} mapping, {} bytes",
            rom.title(),
            rom.rom_type,
            rom.real_size()
        );
        Ok(rom)
    }

    pub fn rom_type(&self) -> RomType {
        self.rom_type
    }

    /// Read a byte.
    pub fn read_byte(&self, address: u32) -> u8 {
        let offset = self.rom_type.translate(address);
        self.data.get(offset).copied().unwrap_or(0)
    }

    /// Read a little-endian word (16 bits).
    pub fn read_word(&self, address: u32) -> u16 {
        let lo = self.read_byte(address) as u16;
        let hi = self.read_byte(address + 1) as u16;
        (hi << 8) | lo
    }

    /// Read a little-endian address (24 bits).
    pub fn read_address(&self, address: u32) -> u32 {
        let lo = self.read_word(address) as u32;
        let hi = self.read_byte(address + 2) as u32;
        (hi << 16) | lo
    }

    /// Read a sequence of bytes.
    pub fn read(&self, address: u32, count: usize) -> Vec<u8> {
        (0..count)
            .map(|i| self.read_byte(address + i as u32))
            .collect()
    }

    /// Whether the address points into RAM rather than cartridge ROM.
    pub fn is_ram(address: u32) -> bool {
        address <= 0x001FFF || (0x7E_0000..=0x7F_FFFF).contains(&address)
    }

    /// Size of the ROM as declared by the header, in bytes.
    pub fn size(&self) -> usize {
        0x400 << self.read_byte(self.header_address(header::SIZE))
    }

    /// Size of the ROM as measured from the file.
    pub fn real_size(&self) -> usize {
        self.data.len()
    }

    /// The NUL-terminated title from the cartridge header.
    pub fn title(&self) -> String {
        let mut title = String::new();
        for i in 0..header::TITLE_LEN {
            let c = self.read_byte(self.header_address(header::TITLE + i as u32));
            if c == 0 {
                break;
            }
            title.push(c as char);
        }
        title
    }

    /// The reset vector (the ROM's entry point).
    pub fn reset_vector(&self) -> u32 {
        self.read_word(self.header_address(header::RESET)) as u32
    }

    /// The NMI vector (VBLANK handler).
    pub fn nmi_vector(&self) -> u32 {
        self.read_word(self.header_address(header::NMI)) as u32
    }

    fn header_address(&self, address: u32) -> u32 {
        address + self.rom_type.header_base()
    }

    /// Refine the base mapping using the header markup byte.
    fn discover_subtype(&self) -> RomType {
        let markup = self.read_byte(header::MARKUP);

        match self.rom_type {
            RomType::LoRom => {
                if markup == 0x32 {
                    RomType::Sdd1
                } else if markup & (1 << 1) != 0 {
                    RomType::ExLoRom
                } else {
                    RomType::LoRom
                }
            }
            RomType::HiRom => {
                if markup & (1 << 2) != 0 {
                    RomType::ExHiRom
                } else {
                    RomType::HiRom
                }
            }
            other => other,
        }
    }
}

/// Decide between the two base mappings by scoring the title window at each
/// candidate header location.
fn discover_type(data: &[u8]) -> Result<RomType> {
    if data.len() <= 0x8000 {
        return Ok(RomType::LoRom);
    }

    let lorom = type_score(data, RomType::LoRom);
    let hirom = type_score(data, RomType::HiRom);
    if lorom == 0 && hirom == 0 {
        return Err(Error::BadHeader);
    }

    if hirom > lorom {
        Ok(RomType::HiRom)
    } else {
        Ok(RomType::LoRom)
    }
}

/// Likelihood score for a mapping: 2 per printable title byte, 1 per NUL,
/// zero for the whole window on any other byte.
fn type_score(data: &[u8], rom_type: RomType) -> u32 {
    let title_offset = match rom_type {
        RomType::LoRom => (header::TITLE - 0x8000) as usize,
        _ => header::TITLE as usize,
    };

    let mut score = 0;
    for i in 0..header::TITLE_LEN {
        match data.get(title_offset + i).copied() {
            Some(0x00) => score += 1,
            Some(c) if c.is_ascii() && !c.is_ascii_control() => score += 2,
            _ => return 0,
        }
    }
    score
}
