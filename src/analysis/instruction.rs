//! Decoded instructions.

use crate::analysis::state::State;
use crate::arch::{argument_size, AddressMode, Op, OPCODE_TABLE};
use crate::{InstructionPc, PcPair, SubroutinePc};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Control-flow category of an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstructionType {
    Branch,
    Call,
    Interrupt,
    Jump,
    Pop,
    Push,
    Return,
    SepRep,
    Other,
}

/// An instruction decoded at a specific site.
///
/// Identity is `(pc, subroutine, entry state)`: the same byte address
/// reached from another subroutine, or under another width state, is a
/// different instruction. The optional label is display metadata and takes
/// no part in identity.
#[derive(Clone, Debug)]
pub struct Instruction {
    pc: InstructionPc,
    subroutine_pc: SubroutinePc,
    opcode: u8,
    argument: u32,
    state: State,
    label: Option<String>,
}

impl Instruction {
    pub fn new(
        pc: InstructionPc,
        subroutine_pc: SubroutinePc,
        opcode: u8,
        argument: u32,
        state: State,
    ) -> Self {
        Instruction {
            pc,
            subroutine_pc,
            opcode,
            argument,
            state,
            label: None,
        }
    }

    pub fn pc(&self) -> InstructionPc {
        self.pc
    }

    pub fn subroutine_pc(&self) -> SubroutinePc {
        self.subroutine_pc
    }

    pub fn pc_pair(&self) -> PcPair {
        (self.pc, self.subroutine_pc)
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn operation(&self) -> Op {
        OPCODE_TABLE[self.opcode as usize].0
    }

    pub fn address_mode(&self) -> AddressMode {
        OPCODE_TABLE[self.opcode as usize].1
    }

    /// Canonical mnemonic.
    pub fn name(&self) -> &'static str {
        self.operation().name()
    }

    pub fn instruction_type(&self) -> InstructionType {
        match self.operation() {
            Op::JSR | Op::JSL => InstructionType::Call,

            Op::JMP | Op::JML | Op::BRA | Op::BRL => InstructionType::Jump,

            Op::RTS | Op::RTL | Op::RTI => InstructionType::Return,

            Op::BRK => InstructionType::Interrupt,

            Op::SEP | Op::REP => InstructionType::SepRep,

            Op::PLA | Op::PLB | Op::PLD | Op::PLP | Op::PLX | Op::PLY => InstructionType::Pop,

            Op::PEA
            | Op::PEI
            | Op::PER
            | Op::PHA
            | Op::PHB
            | Op::PHD
            | Op::PHK
            | Op::PHP
            | Op::PHX
            | Op::PHY => InstructionType::Push,

            Op::BCC | Op::BCS | Op::BEQ | Op::BMI | Op::BNE | Op::BPL | Op::BVC | Op::BVS => {
                InstructionType::Branch
            }

            _ => InstructionType::Other,
        }
    }

    /// Whether this instruction transfers control.
    pub fn is_control(&self) -> bool {
        matches!(
            self.instruction_type(),
            InstructionType::Branch
                | InstructionType::Call
                | InstructionType::Jump
                | InstructionType::Return
                | InstructionType::Interrupt
        )
    }

    pub fn is_sep_rep(&self) -> bool {
        self.instruction_type() == InstructionType::SepRep
    }

    /// Whether the operation writes the accumulator.
    pub fn changes_a(&self) -> bool {
        matches!(
            self.operation(),
            Op::ADC
                | Op::AND
                | Op::ASL
                | Op::DEC
                | Op::EOR
                | Op::INC
                | Op::LDA
                | Op::LSR
                | Op::ORA
                | Op::PLA
                | Op::ROL
                | Op::ROR
                | Op::SBC
                | Op::TDC
                | Op::TSC
                | Op::TXA
                | Op::TYA
                | Op::XBA
        )
    }

    /// Argument size in bytes, resolved against the entry state for the
    /// width-dependent immediate modes.
    pub fn argument_size(&self) -> usize {
        match argument_size(self.address_mode()) {
            Some(size) => size,
            None => match self.address_mode() {
                AddressMode::ImmediateM => self.state.size_a(),
                _ => self.state.size_x(),
            },
        }
    }

    /// Total instruction size, opcode byte included.
    pub fn size(&self) -> usize {
        self.argument_size() + 1
    }

    /// The operand, truncated to its decoded width.
    pub fn argument(&self) -> Option<u32> {
        match self.argument_size() {
            1 => Some(self.argument & 0xFF),
            2 => Some(self.argument & 0xFFFF),
            3 => Some(self.argument & 0xFF_FFFF),
            _ => None,
        }
    }

    /// The operand resolved to an absolute address, where that is possible
    /// without outside knowledge.
    ///
    /// Indirect and indexed modes return `None`; the walker consults jump
    /// tables for those.
    pub fn absolute_argument(&self) -> Option<u32> {
        let argument = self.argument()?;

        match self.address_mode() {
            // Fully specified argument.
            AddressMode::ImmediateM
            | AddressMode::ImmediateX
            | AddressMode::Immediate8
            | AddressMode::AbsoluteLong => Some(argument),

            // The operand names an address in the bank of the caller, but
            // only control transfers are known to stay in that bank.
            AddressMode::Absolute => {
                if self.is_control() {
                    Some((self.pc & 0xFF_0000) | argument)
                } else {
                    None
                }
            }

            AddressMode::Relative => {
                let offset = argument as u8 as i8 as i32;
                Some(self.relative_target(offset))
            }
            AddressMode::RelativeLong => {
                let offset = argument as u16 as i16 as i32;
                Some(self.relative_target(offset))
            }

            _ => None,
        }
    }

    fn relative_target(&self, offset: i32) -> u32 {
        let base = (self.pc + self.size() as u32) as i32;
        (base + offset) as u32 & 0xFF_FFFF
    }

    /// The operand with mode-appropriate assembler syntax.
    pub fn argument_string(&self) -> String {
        let argument = match self.argument() {
            Some(argument) => argument,
            None => return String::new(),
        };
        let width = self.argument_size() * 2;

        match self.address_mode() {
            AddressMode::Implied | AddressMode::ImpliedAccumulator => String::new(),

            AddressMode::ImmediateM | AddressMode::ImmediateX | AddressMode::Immediate8 => {
                format!("#${:0w$X}", argument, w = width)
            }

            AddressMode::Relative
            | AddressMode::RelativeLong
            | AddressMode::DirectPage
            | AddressMode::Absolute
            | AddressMode::AbsoluteLong
            | AddressMode::StackAbsolute => format!("${:0w$X}", argument, w = width),

            AddressMode::DirectPageIndexedX
            | AddressMode::AbsoluteIndexedX
            | AddressMode::AbsoluteIndexedLong => format!("${:0w$X},x", argument, w = width),

            AddressMode::DirectPageIndexedY | AddressMode::AbsoluteIndexedY => {
                format!("${:0w$X},y", argument, w = width)
            }

            AddressMode::DirectPageIndirect
            | AddressMode::AbsoluteIndirect
            | AddressMode::PeiDirectPageIndirect => format!("(${:0w$X})", argument, w = width),

            AddressMode::DirectPageIndirectLong | AddressMode::AbsoluteIndirectLong => {
                format!("[${:0w$X}]", argument, w = width)
            }

            AddressMode::DirectPageIndexedIndirect | AddressMode::AbsoluteIndexedIndirect => {
                format!("(${:0w$X},x)", argument, w = width)
            }

            AddressMode::DirectPageIndirectIndexed => format!("(${:0w$X}),y", argument, w = width),

            AddressMode::DirectPageIndirectIndexedLong => {
                format!("[${:0w$X}],y", argument, w = width)
            }

            AddressMode::StackRelative => format!("${:02X},s", argument),

            AddressMode::StackRelativeIndirectIndexed => format!("(${:02X},s),y", argument),

            AddressMode::Move => format!("${:02X},${:02X}", argument >> 8, argument & 0xFF),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let argument = self.argument_string();
        if argument.is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{} {}", self.name(), argument)
        }
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.pc == other.pc
            && self.subroutine_pc == other.subroutine_pc
            && self.state == other.state
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.pc.hash(hasher);
        self.subroutine_pc.hash(hasher);
        self.state.hash(hasher);
    }
}
