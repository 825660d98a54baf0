use crate::reg::{Reg, Special};
use color_print::cformat;

// ----------------------------------------------------------------------------
// Operand mode bits

pub struct ModeBits;

impl ModeBits {
    pub const INDIRECT_REG: u8 = 0x08;
    pub const INDIRECT_REG_NEXT: u8 = 0x10;
    pub const PUSH_POP: u8 = 0x18;
    pub const PEEK: u8 = 0x19;
    pub const PICK: u8 = 0x1a;
    pub const SP: u8 = 0x1b;
    pub const PC: u8 = 0x1c;
    pub const EX: u8 = 0x1d;
    pub const NEXT_INDIRECT: u8 = 0x1e;
    pub const NEXT_LITERAL: u8 = 0x1f;
    pub const SHORT_LITERAL: u8 = 0x20;
}

/// Values that fit in the 6-bit source field without an extra word.
pub const SHORT_LITERAL_RANGE: std::ops::RangeInclusive<i32> = -1..=30;

/// Operand position in a two-operand instruction.
/// `B` is the destination (5-bit field), `A` the source (6-bit field).
/// One-operand instructions use `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Special {
    /// Mode code for a bare special value, where the slot allows it.
    pub fn code(self, slot: Slot) -> Option<u8> {
        match (self, slot) {
            (Special::PUSH, Slot::B) => Some(ModeBits::PUSH_POP),
            (Special::POP, Slot::A) => Some(ModeBits::PUSH_POP),
            (Special::PUSH, Slot::A) | (Special::POP, Slot::B) => None,
            (Special::PEEK, _) => Some(ModeBits::PEEK),
            (Special::SP, _) => Some(ModeBits::SP),
            (Special::PC, _) => Some(ModeBits::PC),
            (Special::EX, _) => Some(ModeBits::EX),
        }
    }
}

// ----------------------------------------------------------------------------
// Decoded operand

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Reg(Reg),
    IndReg(Reg),
    IndRegNext(Reg),
    Push,
    Pop,
    Peek,
    Pick,
    Sp,
    Pc,
    Ex,
    NextIndirect,
    NextLiteral,
    Short(i8),
}

impl Mode {
    pub fn from_bits(bits: u8, slot: Slot) -> Option<Mode> {
        let reg = |b: u8| Reg::try_from(b & 0x07).ok();
        let mode = match bits {
            0x00..=0x07 => Mode::Reg(reg(bits)?),
            0x08..=0x0f => Mode::IndReg(reg(bits)?),
            0x10..=0x17 => Mode::IndRegNext(reg(bits)?),
            ModeBits::PUSH_POP => match slot {
                Slot::A => Mode::Pop,
                Slot::B => Mode::Push,
            },
            ModeBits::PEEK => Mode::Peek,
            ModeBits::PICK => Mode::Pick,
            ModeBits::SP => Mode::Sp,
            ModeBits::PC => Mode::Pc,
            ModeBits::EX => Mode::Ex,
            ModeBits::NEXT_INDIRECT => Mode::NextIndirect,
            ModeBits::NEXT_LITERAL => Mode::NextLiteral,
            0x20..=0x3f if slot == Slot::A => {
                Mode::Short((bits - ModeBits::SHORT_LITERAL) as i8 - 1)
            }
            _ => return None,
        };
        Some(mode)
    }

    pub fn bits(&self) -> u8 {
        match *self {
            Mode::Reg(r) => r.code(),
            Mode::IndReg(r) => r.code() + ModeBits::INDIRECT_REG,
            Mode::IndRegNext(r) => r.code() + ModeBits::INDIRECT_REG_NEXT,
            Mode::Push | Mode::Pop => ModeBits::PUSH_POP,
            Mode::Peek => ModeBits::PEEK,
            Mode::Pick => ModeBits::PICK,
            Mode::Sp => ModeBits::SP,
            Mode::Pc => ModeBits::PC,
            Mode::Ex => ModeBits::EX,
            Mode::NextIndirect => ModeBits::NEXT_INDIRECT,
            Mode::NextLiteral => ModeBits::NEXT_LITERAL,
            Mode::Short(v) => (v as i32 + 1) as u8 + ModeBits::SHORT_LITERAL,
        }
    }

    pub fn needs_word(&self) -> bool {
        matches!(
            self,
            Mode::IndRegNext(_) | Mode::Pick | Mode::NextIndirect | Mode::NextLiteral
        )
    }

    /// Render the operand, taking the extra word when the mode has one.
    pub fn cformat(&self, word: Option<u16>) -> String {
        let reg = |r: &Reg| r.to_string().to_lowercase();
        let next = word.unwrap_or(0);
        match self {
            Mode::Reg(r) => cformat!("<b>{}</>", reg(r)),
            Mode::IndReg(r) => cformat!("[<b>{}</>]", reg(r)),
            Mode::IndRegNext(r) => cformat!("[<b>{}</> + <y>0x{:04X}</>]", reg(r), next),
            Mode::Push => cformat!("<m>push</>"),
            Mode::Pop => cformat!("<m>pop</>"),
            Mode::Peek => cformat!("<m>peek</>"),
            Mode::Pick => cformat!("[<m>sp</> + <y>0x{:04X}</>]", next),
            Mode::Sp => cformat!("<m>sp</>"),
            Mode::Pc => cformat!("<m>pc</>"),
            Mode::Ex => cformat!("<m>ex</>"),
            Mode::NextIndirect => cformat!("[<y>0x{:04X}</>]", next),
            Mode::NextLiteral => cformat!("<y>0x{:04X}</>", next),
            Mode::Short(v) => cformat!("<y>{}</>", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_a_mode_roundtrips() {
        for bits in 0..=0x3f {
            let mode = Mode::from_bits(bits, Slot::A).unwrap();
            assert_eq!(mode.bits(), bits, "{:?}", mode);
        }
    }

    #[test]
    fn b_slot_has_no_short_literals() {
        for bits in 0..=0x1f {
            assert!(Mode::from_bits(bits, Slot::B).is_some());
        }
        assert_eq!(Mode::from_bits(0x20, Slot::B), None);
        assert_eq!(Mode::from_bits(0x18, Slot::B), Some(Mode::Push));
        assert_eq!(Mode::from_bits(0x18, Slot::A), Some(Mode::Pop));
    }

    #[test]
    fn short_literal_range() {
        assert_eq!(Mode::from_bits(0x20, Slot::A), Some(Mode::Short(-1)));
        assert_eq!(Mode::from_bits(0x21, Slot::A), Some(Mode::Short(0)));
        assert_eq!(Mode::from_bits(0x3f, Slot::A), Some(Mode::Short(30)));
        assert_eq!(Mode::Short(-1).bits(), 0x20);
        assert_eq!(Mode::Short(30).bits(), 0x3f);
    }

    #[test]
    fn special_codes() {
        assert_eq!(Special::PUSH.code(Slot::B), Some(0x18));
        assert_eq!(Special::PUSH.code(Slot::A), None);
        assert_eq!(Special::POP.code(Slot::A), Some(0x18));
        assert_eq!(Special::POP.code(Slot::B), None);
        assert_eq!(Special::PC.code(Slot::B), Some(0x1c));
    }
}
