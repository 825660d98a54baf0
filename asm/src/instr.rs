use arch::inst::Inst;
use arch::mode::Slot;
use arch::op::Op;
use std::fmt;

use crate::error::{Error, Located};
use crate::eval::{evaluate, to_word, Scope};
use crate::param::Param;
use crate::symbol::{SymbolId, Symbols};
use crate::token::Directive;

// ----------------------------------------------------------------------------
// Operation

/// A machine instruction. `params` are in source order: destination first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub op: Op,
    pub params: Vec<Param>,
}

impl Operation {
    pub fn new(op: Op, params: Vec<Param>) -> Self {
        Operation { op, params }
    }

    /// Parameters paired with the operand field they encode into.
    pub fn slots(&self) -> impl Iterator<Item = (Slot, &Param)> {
        let slots: &[Slot] = match self.op {
            Op::Basic(_) => &[Slot::B, Slot::A],
            Op::Ext(_) => &[Slot::A],
        };
        slots.iter().copied().zip(self.params.iter())
    }

    pub fn size(&self) -> usize {
        1 + self.slots().filter(|(slot, p)| p.needs_word(*slot)).count()
    }

    pub fn realize(&self, scope: &Scope) -> Result<Vec<u16>, Error> {
        let mut a = None;
        let mut b = None;
        for (slot, param) in self.slots() {
            let operand = evaluate(param, slot, scope)?;
            match slot {
                Slot::A => a = Some(operand),
                Slot::B => b = Some(operand),
            }
        }
        let a = a.ok_or_else(|| Error::OperandCount(self.op.mnemonic(), self.op.arity(), 0))?;
        Ok(Inst { op: self.op, b, a }.encode())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "{} {}", self.op, params.join(", "))
    }
}

// ----------------------------------------------------------------------------
// Data

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub words: Vec<u16>,
}

impl Data {
    pub fn parse(directive: Directive, rest: &str) -> Result<Data, Error> {
        let words = match directive {
            Directive::String => unquote(rest)?,
            Directive::Asciz => {
                let mut words = unquote(rest)?;
                words.push(0);
                words
            }
            Directive::Byte => values(rest)?
                .into_iter()
                .map(|v| match v {
                    -0x80..=0xFF => Ok(v as u8 as u16),
                    _ => Err(Error::ByteOverflow(v)),
                })
                .collect::<Result<_, _>>()?,
            Directive::Short | Directive::Word | Directive::Uint16T | Directive::Uint16 => {
                values(rest)?
                    .into_iter()
                    .map(to_word)
                    .collect::<Result<_, _>>()?
            }
            _ => return Err(Error::BadData(format!("{} {}", directive, rest))),
        };
        Ok(Data { words })
    }
}

fn values(rest: &str) -> Result<Vec<i64>, Error> {
    if rest.trim().is_empty() {
        return Ok(vec![]);
    }
    rest.split(',')
        .map(|tok| {
            let tok = tok.trim();
            let (negative, magnitude) = match tok.strip_prefix('-') {
                Some(m) => (true, m.trim_start()),
                None => (false, tok),
            };
            let v = match magnitude.strip_prefix("0x").or_else(|| magnitude.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16),
                None if magnitude.starts_with(|c: char| c.is_ascii_digit()) => magnitude.parse(),
                None => return Err(Error::BadData(tok.to_string())),
            }
            .map_err(|_| Error::BadData(tok.to_string()))?;
            Ok(if negative { -v } else { v })
        })
        .collect()
}

/// One word per byte of a quoted string.
fn unquote(rest: &str) -> Result<Vec<u16>, Error> {
    let bad = || Error::BadData(rest.to_string());
    let inner = rest
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(bad)?;

    let mut bytes = vec![];
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        let ch = match ch {
            '\\' => match chars.next().ok_or_else(bad)? {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                '\\' => '\\',
                '"' => '"',
                _ => return Err(bad()),
            },
            '"' => return Err(bad()),
            c => c,
        };
        let mut buf = [0; 4];
        bytes.extend(ch.encode_utf8(&mut buf).bytes().map(u16::from));
    }
    Ok(bytes)
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.words.iter().map(|w| format!("0x{:x}", w)).collect();
        write!(f, ".word {}", words.join(", "))
    }
}

// ----------------------------------------------------------------------------
// Record

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Op(Operation),
    Data(Data),
    /// Zero-size position marker.
    Mark,
}

impl Code {
    pub fn size(&self) -> usize {
        match self {
            Code::Op(op) => op.size(),
            Code::Data(data) => data.words.len(),
            Code::Mark => 0,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Op(op) => write!(f, "{}", op),
            Code::Data(data) => write!(f, "{}", data),
            Code::Mark => Ok(()),
        }
    }
}

/// One record of the output stream, with the source line it came from.
#[derive(Debug, Clone)]
pub struct Instr {
    pub file: String,
    pub line: usize,
    pub text: String,
    /// Nearest global (or hidden) label above this record.
    pub scope: Option<SymbolId>,
    pub defined: Vec<SymbolId>,
    pub code: Code,
    pub address: Option<u16>,
    pub words: Option<Vec<u16>>,
}

impl Instr {
    pub fn new(file: &str, line: usize, text: &str, scope: Option<SymbolId>, code: Code) -> Self {
        Instr {
            file: file.to_string(),
            line,
            text: text.to_string(),
            scope,
            defined: vec![],
            code,
            address: None,
            words: None,
        }
    }

    pub fn size(&self) -> usize {
        self.code.size()
    }

    /// Place the record at `address` and give its labels that address.
    pub fn fix(&mut self, address: u16, symbols: &mut Symbols) {
        self.address = Some(address);
        for &id in &self.defined {
            symbols.set_address(id, address);
        }
    }

    pub fn realize(&mut self, scope: &Scope) -> Result<(), Located> {
        let words = match &self.code {
            Code::Op(op) => op.realize(scope).map_err(|e| self.locate(e))?,
            Code::Data(data) => data.words.clone(),
            Code::Mark => vec![],
        };
        self.words = Some(words);
        Ok(())
    }

    /// Stand-in contents for a record that failed to realize.
    pub fn fill_zero(&mut self) {
        self.words = Some(vec![0; self.size()]);
    }

    pub fn words(&self) -> &[u16] {
        self.words.as_deref().unwrap_or(&[])
    }

    pub fn locate(&self, error: Error) -> Located {
        error.at(&self.file, self.line, &self.text)
    }
}
