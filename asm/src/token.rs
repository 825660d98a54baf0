use arch::op::Op;
use arch::reg::{Reg, Special};
use std::fmt;
use strum::{Display, EnumString};

use crate::error::Error;
use crate::msg::Msgs;
use crate::param::Param;

// ----------------------------------------------------------------------------
// Normalize

/// Strip the comment, collapse whitespace runs and trim.
/// Quoted strings are left as written.
pub fn normalize(raw: &str) -> String {
    let mut out = String::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut space = false;
    for ch in raw.chars() {
        if quoted {
            out.push(ch);
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quoted = false,
                _ => {}
            }
            continue;
        }
        match ch {
            ';' => break,
            c if c.is_whitespace() => space = true,
            c => {
                if space && !out.is_empty() {
                    out.push(' ');
                }
                space = false;
                quoted = c == '"';
                out.push(c);
            }
        }
    }
    out
}

// ----------------------------------------------------------------------------
// Directive

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Directive {
    #[strum(serialize = ".private")]
    Private,
    #[strum(serialize = ".hidden")]
    Hidden,
    #[strum(serialize = ".byte")]
    Byte,
    #[strum(serialize = ".short")]
    Short,
    #[strum(serialize = ".word")]
    Word,
    #[strum(serialize = ".uint16_t")]
    Uint16T,
    #[strum(serialize = ".uint16")]
    Uint16,
    #[strum(serialize = ".string")]
    String,
    #[strum(serialize = ".asciz")]
    Asciz,
    #[strum(serialize = ".data")]
    Data,
    #[strum(serialize = ".text")]
    Text,
    #[strum(serialize = ".func")]
    Func,
    #[strum(serialize = ".endfunc")]
    Endfunc,
}

impl Directive {
    pub fn is_visibility(&self) -> bool {
        matches!(self, Directive::Private | Directive::Hidden)
    }

    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Directive::Byte
                | Directive::Short
                | Directive::Word
                | Directive::Uint16T
                | Directive::Uint16
                | Directive::String
                | Directive::Asciz
        )
    }
}

/// Accepted for compatibility with other toolchains, then dropped.
pub const IGNORED: [&str; 6] = [".globl", ".global", ".extern", ".align", ".section", ".zero"];

// ----------------------------------------------------------------------------
// Line

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDef {
    pub name: String,
    pub local: bool,
}

impl LabelDef {
    fn parse(tok: &str) -> Option<LabelDef> {
        let name = tok
            .strip_prefix(':')
            .or_else(|| tok.strip_suffix(':'))?;
        let mut chars = name.chars();
        let head = chars.next()?;
        if !(head.is_ascii_alphabetic() || head == '_' || head == '.') {
            return None;
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return None;
        }
        Some(LabelDef {
            name: name.to_string(),
            local: name.starts_with('.'),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    None,
    Instr { op: Op, params: Vec<Param> },
    Directive { directive: Directive, rest: String },
    Unknown(String),
}

/// One tokenized source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub label: Option<LabelDef>,
    pub body: Body,
}

impl Line {
    /// Tokenize a normalized line. `idx` is the 0-based line number,
    /// used only for warnings.
    pub fn parse(file: &str, idx: usize, text: &str, msgs: &mut Msgs) -> Result<Line, Error> {
        let mut label = None;
        let mut rest = text.trim();

        while !rest.is_empty() {
            let (tok, tail) = match rest.split_once(' ') {
                Some((tok, tail)) => (tok, tail.trim()),
                None => (rest, ""),
            };

            if let Some(def) = LabelDef::parse(tok) {
                if label.is_some() {
                    return Err(Error::RedundantLabel(def.name));
                }
                if Reg::parse(&def.name).is_ok() || Special::parse(&def.name).is_ok() {
                    return Err(Error::ReservedLabel(def.name));
                }
                label = Some(def);
                rest = tail;
                continue;
            }

            let body = if let Ok(op) = Op::parse(tok) {
                let params = match tail {
                    "" => vec![],
                    _ => tail
                        .split(',')
                        .map(Param::parse)
                        .collect::<Result<Vec<_>, _>>()?,
                };
                if params.len() != op.arity() {
                    return Err(Error::OperandCount(op.mnemonic(), op.arity(), params.len()));
                }
                Body::Instr { op, params }
            } else if let Ok(directive) = tok.parse::<Directive>() {
                Body::Directive {
                    directive,
                    rest: tail.to_string(),
                }
            } else if IGNORED.contains(&tok.to_ascii_lowercase().as_str()) {
                Body::None
            } else if tok.starts_with('.') {
                msgs.warn(format!("Unknown directive: `{}`", tok), file, idx, text);
                Body::Unknown(tok.to_string())
            } else {
                return Err(Error::BadToken(tok.to_string()));
            };

            return Ok(Line { label, body });
        }

        Ok(Line {
            label,
            body: Body::None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.body == Body::None
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(label) = &self.label {
            write!(f, ":{}", label.name)?;
            sep = " ";
        }
        match &self.body {
            Body::None => Ok(()),
            Body::Instr { op, params } => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "{}{} {}", sep, op, params.join(", "))
            }
            Body::Directive { directive, rest } if rest.is_empty() => {
                write!(f, "{}{}", sep, directive)
            }
            Body::Directive { directive, rest } => write!(f, "{}{} {}", sep, directive, rest),
            Body::Unknown(tok) => write!(f, "{}{}", sep, tok),
        }
    }
}
