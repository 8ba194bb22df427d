//! Names for the memory-mapped hardware registers of the SNES.
//!
//! Operands that resolve to one of these addresses are rendered with the
//! canonical register name instead of a bare hex literal.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref HARDWARE_REGISTERS: HashMap<u32, &'static str> = {
        let mut m = HashMap::new();

        // PPU.
        m.insert(0x2100, "INIDISP");
        m.insert(0x2101, "OBSEL");
        m.insert(0x2102, "OAMADDL");
        m.insert(0x2103, "OAMADDH");
        m.insert(0x2104, "OAMDATA");
        m.insert(0x2105, "BGMODE");
        m.insert(0x2106, "MOSAIC");
        m.insert(0x2107, "BG1SC");
        m.insert(0x2108, "BG2SC");
        m.insert(0x2109, "BG3SC");
        m.insert(0x210A, "BG4SC");
        m.insert(0x210B, "BG12NBA");
        m.insert(0x210C, "BG34NBA");
        m.insert(0x210D, "BG1HOFS");
        m.insert(0x210E, "BG1VOFS");
        m.insert(0x210F, "BG2HOFS");
        m.insert(0x2110, "BG2VOFS");
        m.insert(0x2111, "BG3HOFS");
        m.insert(0x2112, "BG3VOFS");
        m.insert(0x2113, "BG4HOFS");
        m.insert(0x2114, "BG4VOFS");
        m.insert(0x2115, "VMAIN");
        m.insert(0x2116, "VMADDL");
        m.insert(0x2117, "VMADDH");
        m.insert(0x2118, "VMDATAL");
        m.insert(0x2119, "VMDATAH");
        m.insert(0x211A, "M7SEL");
        m.insert(0x2121, "CGADD");
        m.insert(0x2122, "CGDATA");
        m.insert(0x2123, "W12SEL");
        m.insert(0x2124, "W34SEL");
        m.insert(0x2125, "WOBJSEL");
        m.insert(0x212C, "TM");
        m.insert(0x212D, "TS");
        m.insert(0x2130, "CGWSEL");
        m.insert(0x2131, "CGADSUB");
        m.insert(0x2132, "COLDATA");
        m.insert(0x2133, "SETINI");
        m.insert(0x2137, "SLHV");
        m.insert(0x2139, "RDVRAML");
        m.insert(0x213A, "RDVRAMH");
        m.insert(0x213C, "OPHCT");
        m.insert(0x213D, "OPVCT");

        // APU ports.
        m.insert(0x2140, "APUIO0");
        m.insert(0x2141, "APUIO1");
        m.insert(0x2142, "APUIO2");
        m.insert(0x2143, "APUIO3");

        // WRAM access port.
        m.insert(0x2180, "WMDATA");
        m.insert(0x2181, "WMADDL");
        m.insert(0x2182, "WMADDM");
        m.insert(0x2183, "WMADDH");

        // CPU I/O.
        m.insert(0x4200, "NMITIMEN");
        m.insert(0x4201, "WRIO");
        m.insert(0x4202, "WRMPYA");
        m.insert(0x4203, "WRMPYB");
        m.insert(0x4204, "WRDIVL");
        m.insert(0x4205, "WRDIVH");
        m.insert(0x4206, "WRDIVB");
        m.insert(0x4207, "HTIMEL");
        m.insert(0x4208, "HTIMEH");
        m.insert(0x4209, "VTIMEL");
        m.insert(0x420A, "VTIMEH");
        m.insert(0x420B, "MDMAEN");
        m.insert(0x420C, "HDMAEN");
        m.insert(0x420D, "MEMSEL");
        m.insert(0x4210, "RDNMI");
        m.insert(0x4211, "TIMEUP");
        m.insert(0x4212, "HVBJOY");
        m.insert(0x4214, "RDDIVL");
        m.insert(0x4215, "RDDIVH");
        m.insert(0x4216, "RDMPYL");
        m.insert(0x4217, "RDMPYH");
        m.insert(0x4218, "JOY1L");
        m.insert(0x4219, "JOY1H");
        m.insert(0x421A, "JOY2L");
        m.insert(0x421B, "JOY2H");

        m
    };
}

/// Look up the hardware-register name for an address, if it has one.
pub fn hardware_register(address: u32) -> Option<&'static str> {
    HARDWARE_REGISTERS.get(&address).copied()
}
