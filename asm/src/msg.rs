use color_print::cprintln;

use crate::error::Located;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    Error,
    Warn,
    Note,
}

/// A diagnostic tied to a source line. `line` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub kind: MsgKind,
    pub msg: String,
    pub file: String,
    pub line: usize,
    pub text: String,
}

impl Msg {
    pub fn print(&self) {
        match self.kind {
            MsgKind::Error => cprintln!("<red,bold>error</>: {}", self.msg),
            MsgKind::Warn => cprintln!("<yellow,bold>warn</>: {}", self.msg),
            MsgKind::Note => cprintln!("<green,bold>note</>: {}", self.msg),
        }
        cprintln!("     <blue>--></> <underline>{}:{}</>", self.file, self.line + 1);
        cprintln!("      <blue>|</>");
        cprintln!(" <blue>{:>4} |</> {}", self.line + 1, self.text);
        cprintln!("      <blue>|</>");
    }
}

/// Diagnostics collected while assembling. Nothing is printed until the
/// caller decides to.
#[derive(Debug, Default)]
pub struct Msgs(Vec<Msg>);

impl Msgs {
    pub fn new() -> Self {
        Msgs(vec![])
    }

    fn push(&mut self, kind: MsgKind, msg: String, file: &str, line: usize, text: &str) {
        self.0.push(Msg {
            kind,
            msg,
            file: file.to_string(),
            line,
            text: text.to_string(),
        });
    }

    pub fn warn(&mut self, msg: String, file: &str, line: usize, text: &str) {
        self.push(MsgKind::Warn, msg, file, line, text);
    }

    pub fn note(&mut self, msg: String, file: &str, line: usize, text: &str) {
        self.push(MsgKind::Note, msg, file, line, text);
    }

    pub fn error(&mut self, err: &Located) {
        self.push(
            MsgKind::Error,
            err.error.to_string(),
            &err.file,
            err.line,
            &err.text,
        );
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(|msg| msg.kind == MsgKind::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Msg> {
        self.0.iter().filter(|msg| msg.kind == MsgKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Msg> {
        self.0.iter().filter(|msg| msg.kind == MsgKind::Warn)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Msg> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dump(&self) {
        for msg in &self.0 {
            msg.print();
        }
    }
}
