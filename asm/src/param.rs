use arch::mode::{Slot, SHORT_LITERAL_RANGE};
use arch::reg::{Reg, Special};
use std::fmt;

use crate::error::Error;

// ----------------------------------------------------------------------------
// Term

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermKind {
    Literal(u16),
    Register(Reg),
    Special(Special),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub sign: Option<Sign>,
    pub kind: TermKind,
}

impl Term {
    pub fn is_negative(&self) -> bool {
        self.sign == Some(Sign::Minus)
    }

    pub fn is_base(&self) -> bool {
        matches!(self.kind, TermKind::Register(_) | TermKind::Special(_))
    }

    fn classify(tok: &str) -> Result<TermKind, Error> {
        if tok.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_literal(tok).map(TermKind::Literal);
        }
        if let Ok(reg) = Reg::parse(tok) {
            return Ok(TermKind::Register(reg));
        }
        if let Ok(special) = Special::parse(tok) {
            return Ok(TermKind::Special(special));
        }
        if is_symbol_name(tok) {
            return Ok(TermKind::Reference(tok.to_string()));
        }
        Err(Error::UnparseableToken(tok.to_string()))
    }
}

pub fn parse_literal(tok: &str) -> Result<u16, Error> {
    let bad = || Error::BadLiteral(tok.to_string());
    let value = match tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map_err(|_| bad())?,
        None => tok.parse::<u32>().map_err(|_| bad())?,
    };
    u16::try_from(value).map_err(|_| bad())
}

pub fn is_symbol_name(tok: &str) -> bool {
    let mut chars = tok.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$')
}

// ----------------------------------------------------------------------------
// Parameter

/// One operand as written: a chain of signed terms, optionally in brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub terms: Vec<Term>,
    pub indirect: bool,
}

impl Param {
    pub fn parse(text: &str) -> Result<Param, Error> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyParam);
        }

        let (body, indirect) = match (text.starts_with('['), text.ends_with(']')) {
            (true, true) => (&text[1..text.len() - 1], true),
            (false, false) => (text, false),
            _ => return Err(Error::UnbalancedBracket(text.to_string())),
        };
        if body.contains(['[', ']']) {
            return Err(Error::UnbalancedBracket(text.to_string()));
        }

        let body = body.trim();
        if body.starts_with('{') {
            return Err(Error::ReservedBrace(text.to_string()));
        }
        if body.is_empty() {
            return Err(Error::EmptyParam);
        }

        let mut terms: Vec<Term> = vec![];
        let mut sign = None;
        let mut tok = String::new();
        for ch in body.chars().chain(std::iter::once(' ')) {
            if !(ch.is_whitespace() || matches!(ch, '+' | '-' | ';')) {
                tok.push(ch);
                continue;
            }
            if !tok.is_empty() {
                if sign.is_none() && !terms.is_empty() {
                    return Err(Error::MissingOperator(tok));
                }
                let kind = Term::classify(&tok)?;
                terms.push(Term { sign, kind });
                sign = None;
                tok.clear();
            }
            match ch {
                '+' => sign = Some(Sign::Plus),
                '-' => sign = Some(Sign::Minus),
                _ => {}
            }
        }
        if sign.is_some() {
            return Err(Error::UnparseableToken(body.to_string()));
        }

        if terms.iter().filter(|t| t.is_base()).count() > 1 {
            return Err(Error::MultipleRegisters(text.to_string()));
        }

        Ok(Param { terms, indirect })
    }

    /// Sum of the literal terms only.
    pub fn literal_sum(&self) -> i32 {
        self.terms
            .iter()
            .map(|t| match t.kind {
                TermKind::Literal(v) if t.is_negative() => -(v as i32),
                TermKind::Literal(v) => v as i32,
                _ => 0,
            })
            .sum()
    }

    pub fn has_reference(&self) -> bool {
        self.references().next().is_some()
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|t| match &t.kind {
            TermKind::Reference(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn base(&self) -> Option<&TermKind> {
        self.terms.iter().find(|t| t.is_base()).map(|t| &t.kind)
    }

    /// Build a copy with every reference token replaced by `f(token)`.
    pub fn map_refs<F>(&self, mut f: F) -> Result<Param, Error>
    where
        F: FnMut(&str) -> Result<String, Error>,
    {
        let terms = self
            .terms
            .iter()
            .map(|t| {
                let kind = match &t.kind {
                    TermKind::Reference(name) => TermKind::Reference(f(name)?),
                    other => other.clone(),
                };
                Ok(Term { sign: t.sign, kind })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Param {
            terms,
            indirect: self.indirect,
        })
    }

    /// Does this parameter demand an additional word in the instruction?
    /// Must agree with the mode chosen by evaluation.
    pub fn needs_word(&self, slot: Slot) -> bool {
        let offset = self.literal_sum() != 0 || self.has_reference();
        match self.base() {
            Some(TermKind::Register(_)) | Some(TermKind::Special(Special::SP)) => {
                self.indirect && offset
            }
            Some(_) => false,
            None if self.has_reference() => true,
            None => {
                self.indirect
                    || slot == Slot::B
                    || !SHORT_LITERAL_RANGE.contains(&self.literal_sum())
            }
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indirect {
            write!(f, "[")?;
        }
        for (idx, term) in self.terms.iter().enumerate() {
            match (idx, term.sign) {
                (0, Some(Sign::Minus)) => write!(f, "-")?,
                (0, Some(Sign::Plus)) => write!(f, "+")?,
                (0, None) => {}
                (_, Some(Sign::Minus)) => write!(f, " - ")?,
                (_, _) => write!(f, " + ")?,
            }
            match &term.kind {
                TermKind::Literal(v) => write!(f, "0x{:x}", v)?,
                TermKind::Register(r) => write!(f, "{}", r.to_string().to_lowercase())?,
                TermKind::Special(s) => write!(f, "{}", s.to_string().to_lowercase())?,
                TermKind::Reference(name) => write!(f, "{}", name)?,
            }
        }
        if self.indirect {
            write!(f, "]")?;
        }
        Ok(())
    }
}
