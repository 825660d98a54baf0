use color_print::cprintln;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Eval,
    Link,
    Encode,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Parse errors
    #[error("Bad token: `{0}`")]
    BadToken(String),

    #[error("Redundant label definition: `{0}`")]
    RedundantLabel(String),

    #[error("Label `{0}` is spelled like a register or special value")]
    ReservedLabel(String),

    #[error("`{0}` takes {1} operand(s), got {2}")]
    OperandCount(String, usize, usize),

    #[error("Empty parameter")]
    EmptyParam,

    #[error("Unbalanced brackets in `{0}`")]
    UnbalancedBracket(String),

    #[error("Braces are reserved for macros: `{0}`")]
    ReservedBrace(String),

    #[error("Unrecognized token in parameter: `{0}`")]
    UnparseableToken(String),

    #[error("Malformed numeric literal: `{0}`")]
    BadLiteral(String),

    #[error("Missing operator before `{0}`")]
    MissingOperator(String),

    #[error("More than one register or special value in `{0}`")]
    MultipleRegisters(String),

    #[error("Local label `{0}` has no enclosing global label")]
    OrphanLocal(String),

    #[error("Malformed data: `{0}`")]
    BadData(String),

    // Evaluation errors
    #[error("Register or special value must be the first or last term")]
    BaseNotAtEdge,

    #[error("Register or special value cannot be negated")]
    NegatedBase,

    #[error("`{0}` cannot take an offset without indirection")]
    DirectOffset(String),

    #[error("`{0}` cannot be used with indirection or an offset")]
    IllegalSpecial(String),

    #[error("`{0}` is not allowed in this operand position")]
    WrongSlot(String),

    // Link errors
    #[error("Undefined symbol: `{0}`")]
    UndefinedSymbol(String),

    #[error("Cannot locate local symbol `{0}` without a global scope")]
    NoScope(String),

    #[error("Symbol redefined: `{0}`")]
    Redefined(String),

    #[error("`{0}` is reserved by the linker")]
    ReservedSymbol(String),

    #[error("Nothing to assemble")]
    NothingToAssemble,

    // Encoding errors
    #[error("Value {0} does not fit in a 16-bit word")]
    WordOverflow(i64),

    #[error("Value {0} does not fit in a byte")]
    ByteOverflow(i64),

    #[error("Address 0x{0:X} is outside the 16-bit address space")]
    AddressOverflow(usize),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            BadToken(_) | RedundantLabel(_) | ReservedLabel(_) | OperandCount(..) | EmptyParam
            | UnbalancedBracket(_) | ReservedBrace(_) | UnparseableToken(_) | BadLiteral(_)
            | MissingOperator(_) | MultipleRegisters(_) | OrphanLocal(_)
            | BadData(_) => ErrorKind::Parse,
            BaseNotAtEdge | NegatedBase | DirectOffset(_) | IllegalSpecial(_) | WrongSlot(_) => {
                ErrorKind::Eval
            }
            UndefinedSymbol(_) | NoScope(_) | Redefined(_) | ReservedSymbol(_)
            | NothingToAssemble => ErrorKind::Link,
            WordOverflow(_) | ByteOverflow(_) | AddressOverflow(_) => ErrorKind::Encode,
        }
    }

    pub fn at(self, file: &str, line: usize, text: &str) -> Located {
        Located {
            file: file.to_string(),
            line,
            text: text.to_string(),
            error: self,
        }
    }
}

/// An error pinned to a source line. `line` is 0-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} ({file}:{})", .line + 1)]
pub struct Located {
    pub file: String,
    pub line: usize,
    pub text: String,
    #[source]
    pub error: Error,
}

impl Located {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Print error with diagnostic information showing file location and line content
    pub fn print_diag(&self) {
        cprintln!("<red,bold>error</>: {}", self.error);
        let line_num = self.line + 1;
        cprintln!("     <blue>--></> <underline>{}:{}</>", self.file, line_num);
        cprintln!("      <blue>|</>");
        cprintln!(" <blue>{:>4} |</> {}", line_num, self.text);
        cprintln!("      <blue>|</>");
    }
}
