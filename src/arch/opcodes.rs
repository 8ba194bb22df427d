//! Decode tables for the 65816 instruction set.
//!
//! Every opcode byte maps to a fixed (operation, addressing mode) pair; the
//! only thing the processor state changes is the *length* of immediate
//! operands, which is resolved through `argument_size`.

use self::AddressMode::*;
use self::Op::*;

/// Memory addressing modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Implied,
    ImmediateM,
    ImmediateX,
    Immediate8,
    Relative,
    RelativeLong,
    DirectPage,
    DirectPageIndexedX,
    DirectPageIndexedY,
    DirectPageIndirect,
    DirectPageIndexedIndirect,
    DirectPageIndirectIndexed,
    DirectPageIndirectLong,
    DirectPageIndirectIndexedLong,
    Absolute,
    AbsoluteIndexedX,
    AbsoluteIndexedY,
    AbsoluteLong,
    AbsoluteIndexedLong,
    StackRelative,
    StackRelativeIndirectIndexed,
    AbsoluteIndirect,
    AbsoluteIndirectLong,
    AbsoluteIndexedIndirect,
    ImpliedAccumulator,
    Move,
    StackAbsolute,
    PeiDirectPageIndirect,
}

/// Argument size in bytes for a given addressing mode.
///
/// `None` means the size depends on the processor state register: the two
/// immediate modes read one byte in 8-bit mode and two in 16-bit mode. The
/// caller resolves those through `State::size_a`/`State::size_x`.
pub fn argument_size(mode: AddressMode) -> Option<usize> {
    match mode {
        Implied | ImpliedAccumulator => Some(0),

        ImmediateM | ImmediateX => None,

        Immediate8 | Relative | DirectPage | DirectPageIndexedX | DirectPageIndexedY
        | DirectPageIndirect | DirectPageIndexedIndirect | DirectPageIndirectIndexed
        | DirectPageIndirectLong | DirectPageIndirectIndexedLong | StackRelative
        | StackRelativeIndirectIndexed | PeiDirectPageIndirect => Some(1),

        RelativeLong | Absolute | AbsoluteIndexedX | AbsoluteIndexedY | AbsoluteIndirect
        | AbsoluteIndirectLong | AbsoluteIndexedIndirect | Move | StackAbsolute => Some(2),

        AbsoluteLong | AbsoluteIndexedLong => Some(3),
    }
}

/// 65816 operations.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRA, BRK, BRL, BVC,
    BVS, CLC, CLD, CLI, CLV, CMP, COP, CPX, CPY, DEC, DEX, DEY, EOR, INC,
    INX, INY, JML, JMP, JSL, JSR, LDA, LDX, LDY, LSR, MVN, MVP, NOP, ORA,
    PEA, PEI, PER, PHA, PHB, PHD, PHK, PHP, PHX, PHY, PLA, PLB, PLD, PLP,
    PLX, PLY, REP, ROL, ROR, RTI, RTL, RTS, SBC, SEC, SED, SEI, SEP, STA,
    STP, STX, STY, STZ, TAX, TAY, TCD, TCS, TDC, TRB, TSB, TSC, TSX, TXA,
    TXS, TXY, TYA, TYX, WAI, WDM, XBA, XCE,
}

impl Op {
    /// Canonical lowercase mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            ADC => "adc", AND => "and", ASL => "asl", BCC => "bcc",
            BCS => "bcs", BEQ => "beq", BIT => "bit", BMI => "bmi",
            BNE => "bne", BPL => "bpl", BRA => "bra", BRK => "brk",
            BRL => "brl", BVC => "bvc", BVS => "bvs", CLC => "clc",
            CLD => "cld", CLI => "cli", CLV => "clv", CMP => "cmp",
            COP => "cop", CPX => "cpx", CPY => "cpy", DEC => "dec",
            DEX => "dex", DEY => "dey", EOR => "eor", INC => "inc",
            INX => "inx", INY => "iny", JML => "jml", JMP => "jmp",
            JSL => "jsl", JSR => "jsr", LDA => "lda", LDX => "ldx",
            LDY => "ldy", LSR => "lsr", MVN => "mvn", MVP => "mvp",
            NOP => "nop", ORA => "ora", PEA => "pea", PEI => "pei",
            PER => "per", PHA => "pha", PHB => "phb", PHD => "phd",
            PHK => "phk", PHP => "php", PHX => "phx", PHY => "phy",
            PLA => "pla", PLB => "plb", PLD => "pld", PLP => "plp",
            PLX => "plx", PLY => "ply", REP => "rep", ROL => "rol",
            ROR => "ror", RTI => "rti", RTL => "rtl", RTS => "rts",
            SBC => "sbc", SEC => "sec", SED => "sed", SEI => "sei",
            SEP => "sep", STA => "sta", STP => "stp", STX => "stx",
            STY => "sty", STZ => "stz", TAX => "tax", TAY => "tay",
            TCD => "tcd", TCS => "tcs", TDC => "tdc", TRB => "trb",
            TSB => "tsb", TSC => "tsc", TSX => "tsx", TXA => "txa",
            TXS => "txs", TXY => "txy", TYA => "tya", TYX => "tyx",
            WAI => "wai", WDM => "wdm", XBA => "xba", XCE => "xce",
        }
    }
}

/// All 256 opcodes, indexed by opcode byte.
pub static OPCODE_TABLE: [(Op, AddressMode); 256] = [
    // 0x00
    (BRK, Immediate8),
    (ORA, DirectPageIndexedIndirect),
    (COP, Immediate8),
    (ORA, StackRelative),
    (TSB, DirectPage),
    (ORA, DirectPage),
    (ASL, DirectPage),
    (ORA, DirectPageIndirectLong),
    (PHP, Implied),
    (ORA, ImmediateM),
    (ASL, ImpliedAccumulator),
    (PHD, Implied),
    (TSB, Absolute),
    (ORA, Absolute),
    (ASL, Absolute),
    (ORA, AbsoluteLong),
    // 0x10
    (BPL, Relative),
    (ORA, DirectPageIndirectIndexed),
    (ORA, DirectPageIndirect),
    (ORA, StackRelativeIndirectIndexed),
    (TRB, DirectPage),
    (ORA, DirectPageIndexedX),
    (ASL, DirectPageIndexedX),
    (ORA, DirectPageIndirectIndexedLong),
    (CLC, Implied),
    (ORA, AbsoluteIndexedY),
    (INC, ImpliedAccumulator),
    (TCS, Implied),
    (TRB, Absolute),
    (ORA, AbsoluteIndexedX),
    (ASL, AbsoluteIndexedX),
    (ORA, AbsoluteIndexedLong),
    // 0x20
    (JSR, Absolute),
    (AND, DirectPageIndexedIndirect),
    (JSL, AbsoluteLong),
    (AND, StackRelative),
    (BIT, DirectPage),
    (AND, DirectPage),
    (ROL, DirectPage),
    (AND, DirectPageIndirectLong),
    (PLP, Implied),
    (AND, ImmediateM),
    (ROL, ImpliedAccumulator),
    (PLD, Implied),
    (BIT, Absolute),
    (AND, Absolute),
    (ROL, Absolute),
    (AND, AbsoluteLong),
    // 0x30
    (BMI, Relative),
    (AND, DirectPageIndirectIndexed),
    (AND, DirectPageIndirect),
    (AND, StackRelativeIndirectIndexed),
    (BIT, DirectPageIndexedX),
    (AND, DirectPageIndexedX),
    (ROL, DirectPageIndexedX),
    (AND, DirectPageIndirectIndexedLong),
    (SEC, Implied),
    (AND, AbsoluteIndexedY),
    (DEC, ImpliedAccumulator),
    (TSC, Implied),
    (BIT, AbsoluteIndexedX),
    (AND, AbsoluteIndexedX),
    (ROL, AbsoluteIndexedX),
    (AND, AbsoluteIndexedLong),
    // 0x40
    (RTI, Implied),
    (EOR, DirectPageIndexedIndirect),
    (WDM, Immediate8),
    (EOR, StackRelative),
    (MVP, Move),
    (EOR, DirectPage),
    (LSR, DirectPage),
    (EOR, DirectPageIndirectLong),
    (PHA, Implied),
    (EOR, ImmediateM),
    (LSR, ImpliedAccumulator),
    (PHK, Implied),
    (JMP, Absolute),
    (EOR, Absolute),
    (LSR, Absolute),
    (EOR, AbsoluteLong),
    // 0x50
    (BVC, Relative),
    (EOR, DirectPageIndirectIndexed),
    (EOR, DirectPageIndirect),
    (EOR, StackRelativeIndirectIndexed),
    (MVN, Move),
    (EOR, DirectPageIndexedX),
    (LSR, DirectPageIndexedX),
    (EOR, DirectPageIndirectIndexedLong),
    (CLI, Implied),
    (EOR, AbsoluteIndexedY),
    (PHY, Implied),
    (TCD, Implied),
    (JML, AbsoluteLong),
    (EOR, AbsoluteIndexedX),
    (LSR, AbsoluteIndexedX),
    (EOR, AbsoluteIndexedLong),
    // 0x60
    (RTS, Implied),
    (ADC, DirectPageIndexedIndirect),
    (PER, RelativeLong),
    (ADC, StackRelative),
    (STZ, DirectPage),
    (ADC, DirectPage),
    (ROR, DirectPage),
    (ADC, DirectPageIndirectLong),
    (PLA, Implied),
    (ADC, ImmediateM),
    (ROR, ImpliedAccumulator),
    (RTL, Implied),
    (JMP, AbsoluteIndirect),
    (ADC, Absolute),
    (ROR, Absolute),
    (ADC, AbsoluteLong),
    // 0x70
    (BVS, Relative),
    (ADC, DirectPageIndirectIndexed),
    (ADC, DirectPageIndirect),
    (ADC, StackRelativeIndirectIndexed),
    (STZ, DirectPageIndexedX),
    (ADC, DirectPageIndexedX),
    (ROR, DirectPageIndexedX),
    (ADC, DirectPageIndirectIndexedLong),
    (SEI, Implied),
    (ADC, AbsoluteIndexedY),
    (PLY, Implied),
    (TDC, Implied),
    (JMP, AbsoluteIndexedIndirect),
    (ADC, AbsoluteIndexedX),
    (ROR, AbsoluteIndexedX),
    (ADC, AbsoluteIndexedLong),
    // 0x80
    (BRA, Relative),
    (STA, DirectPageIndexedIndirect),
    (BRL, RelativeLong),
    (STA, StackRelative),
    (STY, DirectPage),
    (STA, DirectPage),
    (STX, DirectPage),
    (STA, DirectPageIndirectLong),
    (DEY, Implied),
    (BIT, ImmediateM),
    (TXA, Implied),
    (PHB, Implied),
    (STY, Absolute),
    (STA, Absolute),
    (STX, Absolute),
    (STA, AbsoluteLong),
    // 0x90
    (BCC, Relative),
    (STA, DirectPageIndirectIndexed),
    (STA, DirectPageIndirect),
    (STA, StackRelativeIndirectIndexed),
    (STY, DirectPageIndexedX),
    (STA, DirectPageIndexedX),
    (STX, DirectPageIndexedY),
    (STA, DirectPageIndirectIndexedLong),
    (TYA, Implied),
    (STA, AbsoluteIndexedY),
    (TXS, Implied),
    (TXY, Implied),
    (STZ, Absolute),
    (STA, AbsoluteIndexedX),
    (STZ, AbsoluteIndexedX),
    (STA, AbsoluteIndexedLong),
    // 0xA0
    (LDY, ImmediateX),
    (LDA, DirectPageIndexedIndirect),
    (LDX, ImmediateX),
    (LDA, StackRelative),
    (LDY, DirectPage),
    (LDA, DirectPage),
    (LDX, DirectPage),
    (LDA, DirectPageIndirectLong),
    (TAY, Implied),
    (LDA, ImmediateM),
    (TAX, Implied),
    (PLB, Implied),
    (LDY, Absolute),
    (LDA, Absolute),
    (LDX, Absolute),
    (LDA, AbsoluteLong),
    // 0xB0
    (BCS, Relative),
    (LDA, DirectPageIndirectIndexed),
    (LDA, DirectPageIndirect),
    (LDA, StackRelativeIndirectIndexed),
    (LDY, DirectPageIndexedX),
    (LDA, DirectPageIndexedX),
    (LDX, DirectPageIndexedY),
    (LDA, DirectPageIndirectIndexedLong),
    (CLV, Implied),
    (LDA, AbsoluteIndexedY),
    (TSX, Implied),
    (TYX, Implied),
    (LDY, AbsoluteIndexedX),
    (LDA, AbsoluteIndexedX),
    (LDX, AbsoluteIndexedY),
    (LDA, AbsoluteIndexedLong),
    // 0xC0
    (CPY, ImmediateX),
    (CMP, DirectPageIndexedIndirect),
    (REP, Immediate8),
    (CMP, StackRelative),
    (CPY, DirectPage),
    (CMP, DirectPage),
    (DEC, DirectPage),
    (CMP, DirectPageIndirectLong),
    (INY, Implied),
    (CMP, ImmediateM),
    (DEX, Implied),
    (WAI, Implied),
    (CPY, Absolute),
    (CMP, Absolute),
    (DEC, Absolute),
    (CMP, AbsoluteLong),
    // 0xD0
    (BNE, Relative),
    (CMP, DirectPageIndirectIndexed),
    (CMP, DirectPageIndirect),
    (CMP, StackRelativeIndirectIndexed),
    (PEI, PeiDirectPageIndirect),
    (CMP, DirectPageIndexedX),
    (DEC, DirectPageIndexedX),
    (CMP, DirectPageIndirectIndexedLong),
    (CLD, Implied),
    (CMP, AbsoluteIndexedY),
    (PHX, Implied),
    (STP, Implied),
    (JML, AbsoluteIndirectLong),
    (CMP, AbsoluteIndexedX),
    (DEC, AbsoluteIndexedX),
    (CMP, AbsoluteIndexedLong),
    // 0xE0
    (CPX, ImmediateX),
    (SBC, DirectPageIndexedIndirect),
    (SEP, Immediate8),
    (SBC, StackRelative),
    (CPX, DirectPage),
    (SBC, DirectPage),
    (INC, DirectPage),
    (SBC, DirectPageIndirectLong),
    (INX, Implied),
    (SBC, ImmediateM),
    (NOP, Implied),
    (XBA, Implied),
    (CPX, Absolute),
    (SBC, Absolute),
    (INC, Absolute),
    (SBC, AbsoluteLong),
    // 0xF0
    (BEQ, Relative),
    (SBC, DirectPageIndirectIndexed),
    (SBC, DirectPageIndirect),
    (SBC, StackRelativeIndirectIndexed),
    (PEA, StackAbsolute),
    (SBC, DirectPageIndexedX),
    (INC, DirectPageIndexedX),
    (SBC, DirectPageIndirectIndexedLong),
    (SED, Implied),
    (SBC, AbsoluteIndexedY),
    (PLX, Implied),
    (XCE, Implied),
    (JSR, AbsoluteIndexedIndirect),
    (SBC, AbsoluteIndexedX),
    (INC, AbsoluteIndexedX),
    (SBC, AbsoluteIndexedLong),
];
