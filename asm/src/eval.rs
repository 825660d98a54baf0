use arch::mode::{Mode, Slot, SHORT_LITERAL_RANGE};
use arch::reg::Special;

use crate::error::Error;
use crate::param::{Param, TermKind};
use crate::symbol::{Program, SymbolId};

/// What a parameter can see while it is evaluated.
pub struct Scope<'a> {
    pub program: &'a Program,
    pub file: &'a str,
    pub global: Option<SymbolId>,
}

impl<'a> Scope<'a> {
    pub fn new(program: &'a Program, file: &'a str, global: Option<SymbolId>) -> Self {
        Scope {
            program,
            file,
            global,
        }
    }

    /// Address of a referenced symbol. Marks the symbol as referenced.
    pub fn lookup(&self, name: &str) -> Result<u16, Error> {
        let id = self
            .program
            .resolve(self.file, name, self.global)?
            .ok_or_else(|| Error::UndefinedSymbol(name.to_string()))?;
        let sym = self.program.symbols.get(id);
        sym.referenced.set(true);
        match (sym.address, &sym.definition) {
            (Some(address), _) => Ok(address),
            // placed, but past the last addressable word
            (None, Some(_)) => Err(Error::AddressOverflow(0x10000)),
            (None, None) => Err(Error::UndefinedSymbol(name.to_string())),
        }
    }
}

/// Store a value as a word. Negative values use two's complement.
pub fn to_word(value: i64) -> Result<u16, Error> {
    match value {
        -0x8000..=0xFFFF => Ok(value as u16),
        _ => Err(Error::WordOverflow(value)),
    }
}

/// Evaluate one parameter into its addressing mode and extra word.
pub fn evaluate(param: &Param, slot: Slot, scope: &Scope) -> Result<(Mode, Option<u16>), Error> {
    let last = param.terms.len().saturating_sub(1);
    if let Some(pos) = param.terms.iter().position(|t| t.is_base()) {
        if pos != 0 && pos != last {
            return Err(Error::BaseNotAtEdge);
        }
        if param.terms[pos].is_negative() {
            return Err(Error::NegatedBase);
        }
    }

    let mut value: i64 = 0;
    for term in &param.terms {
        let v = match &term.kind {
            TermKind::Literal(v) => *v as i64,
            TermKind::Reference(name) => scope.lookup(name)? as i64,
            _ => continue,
        };
        match term.is_negative() {
            true => value -= v,
            false => value += v,
        }
    }

    // Same test as `Param::needs_word`, so sizes fixed before linking hold.
    let offset = param.literal_sum() != 0 || param.has_reference();
    let indirect = param.indirect;

    let mode = match param.base() {
        Some(TermKind::Register(reg)) => match (indirect, offset) {
            (false, true) => return Err(Error::DirectOffset(reg.to_string().to_lowercase())),
            (false, false) => (Mode::Reg(*reg), None),
            (true, false) => (Mode::IndReg(*reg), None),
            (true, true) => (Mode::IndRegNext(*reg), Some(to_word(value)?)),
        },
        Some(TermKind::Special(Special::SP)) => match (indirect, offset) {
            (false, true) => return Err(Error::DirectOffset("sp".to_string())),
            (false, false) => (Mode::Sp, None),
            (true, false) => (Mode::Peek, None),
            (true, true) => (Mode::Pick, Some(to_word(value)?)),
        },
        Some(TermKind::Special(special)) => {
            let name = special.to_string().to_lowercase();
            if indirect || offset {
                return Err(Error::IllegalSpecial(name));
            }
            let bits = special.code(slot).ok_or(Error::WrongSlot(name))?;
            let mode = Mode::from_bits(bits, slot).ok_or(Error::WrongSlot(special.to_string()))?;
            (mode, None)
        }
        _ => {
            let literal_only = !param.has_reference();
            if literal_only && !indirect && slot == Slot::A && SHORT_LITERAL_RANGE.contains(&(value as i32)) {
                (Mode::Short(value as i8), None)
            } else if indirect {
                (Mode::NextIndirect, Some(to_word(value)?))
            } else {
                (Mode::NextLiteral, Some(to_word(value)?))
            }
        }
    };
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::reg::Reg;

    fn program() -> Program {
        let mut p = Program::new();
        let label = p.symbols.add("t.s", 0, "label", None);
        p.symbols.set_address(label, 0x1000);
        p.table.insert("label".to_string(), label);
        let far = p.symbols.add("t.s", 1, "far", None);
        p.symbols.set_address(far, 0xFFF0);
        p.table.insert("far".to_string(), far);
        p
    }

    fn eval(text: &str, slot: Slot) -> Result<(Mode, Option<u16>), Error> {
        let p = program();
        let scope = Scope::new(&p, "t.s", None);
        evaluate(&Param::parse(text).unwrap(), slot, &scope)
    }

    macro_rules! modes {
        ($($name:ident: $text:expr, $slot:expr => $expect:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let param = Param::parse($text).unwrap();
                    let result = eval($text, $slot).unwrap();
                    assert_eq!(result, $expect);
                    assert_eq!(result.1.is_some(), param.needs_word($slot), "{}", $text);
                }
            )*
        }
    }

    modes! {
        mode_reg: "a", Slot::B => (Mode::Reg(Reg::A), None),
        mode_ind_reg: "[j]", Slot::A => (Mode::IndReg(Reg::J), None),
        mode_ind_reg_next: "[0x20+a]", Slot::B => (Mode::IndRegNext(Reg::A), Some(0x20)),
        mode_ind_reg_right: "[a+0x20]", Slot::A => (Mode::IndRegNext(Reg::A), Some(0x20)),
        mode_ind_reg_ref: "[label+i]", Slot::A => (Mode::IndRegNext(Reg::I), Some(0x1000)),
        mode_ind_reg_neg: "[x-1]", Slot::A => (Mode::IndRegNext(Reg::X), Some(0xFFFF)),
        mode_push: "push", Slot::B => (Mode::Push, None),
        mode_pop: "pop", Slot::A => (Mode::Pop, None),
        mode_peek: "peek", Slot::A => (Mode::Peek, None),
        mode_ind_sp: "[sp]", Slot::A => (Mode::Peek, None),
        mode_pick: "[sp+3]", Slot::B => (Mode::Pick, Some(3)),
        mode_sp: "sp", Slot::B => (Mode::Sp, None),
        mode_pc: "pc", Slot::B => (Mode::Pc, None),
        mode_ex: "EX", Slot::A => (Mode::Ex, None),
        mode_short: "30", Slot::A => (Mode::Short(30), None),
        mode_short_neg: "-1", Slot::A => (Mode::Short(-1), None),
        mode_short_zero: "0", Slot::A => (Mode::Short(0), None),
        mode_long: "31", Slot::A => (Mode::NextLiteral, Some(31)),
        mode_long_neg: "-2", Slot::A => (Mode::NextLiteral, Some(0xFFFE)),
        mode_b_literal: "1", Slot::B => (Mode::NextLiteral, Some(1)),
        mode_ind_literal: "[0x8000]", Slot::A => (Mode::NextIndirect, Some(0x8000)),
        mode_ref: "label", Slot::A => (Mode::NextLiteral, Some(0x1000)),
        mode_ref_sum: "label+2-1", Slot::A => (Mode::NextLiteral, Some(0x1001)),
        mode_ref_ind: "[label]", Slot::B => (Mode::NextIndirect, Some(0x1000)),
        mode_ref_cancel: "label-label", Slot::A => (Mode::NextLiteral, Some(0)),
    }

    macro_rules! fails {
        ($($name:ident: $text:expr, $slot:expr => $err:pat,)*) => {
            $(
                #[test]
                fn $name() {
                    let result = eval($text, $slot);
                    assert!(matches!(result, Err($err)), "{:?}", result);
                }
            )*
        }
    }

    fails! {
        fail_push_a: "push", Slot::A => Error::WrongSlot(_),
        fail_pop_b: "pop", Slot::B => Error::WrongSlot(_),
        fail_ind_push: "[push]", Slot::B => Error::IllegalSpecial(_),
        fail_pc_offset: "pc+1", Slot::B => Error::IllegalSpecial(_),
        fail_ind_ex: "[ex]", Slot::A => Error::IllegalSpecial(_),
        fail_peek_offset: "[peek+1]", Slot::A => Error::IllegalSpecial(_),
        fail_direct_offset: "a+1", Slot::A => Error::DirectOffset(_),
        fail_sp_offset: "sp+1", Slot::A => Error::DirectOffset(_),
        fail_middle: "[1+a+2]", Slot::A => Error::BaseNotAtEdge,
        fail_negated: "[1-a]", Slot::A => Error::NegatedBase,
        fail_undefined: "nowhere", Slot::A => Error::UndefinedSymbol(_),
        fail_no_scope: ".inner", Slot::A => Error::NoScope(_),
        fail_overflow: "far+0x20", Slot::A => Error::WordOverflow(_),
        fail_underflow: "[a-0xffff]", Slot::A => Error::WordOverflow(_),
    }

    #[test]
    fn lookup_marks_referenced() {
        let p = program();
        let scope = Scope::new(&p, "t.s", None);
        let id = p.table["label"];
        assert!(!p.symbols.get(id).referenced.get());
        assert_eq!(scope.lookup("label"), Ok(0x1000));
        assert!(p.symbols.get(id).referenced.get());
    }

    #[test]
    fn word_range() {
        assert_eq!(to_word(-0x8000), Ok(0x8000));
        assert_eq!(to_word(-1), Ok(0xFFFF));
        assert_eq!(to_word(0xFFFF), Ok(0xFFFF));
        assert_eq!(to_word(0x10000), Err(Error::WordOverflow(0x10000)));
        assert_eq!(to_word(-0x8001), Err(Error::WordOverflow(-0x8001)));
    }
}
