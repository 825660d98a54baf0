use arch::op::{Op, OpKind};

use crate::config::Config;
use crate::error::{Error, ErrorKind, Located};
use crate::eval::Scope;
use crate::instr::{Code, Instr, Operation};
use crate::module::Module;
use crate::msg::Msgs;
use crate::param::Param;
use crate::symbol::{Definition, Program, SymbolId};

/// Address just past the last word of the image.
pub const END_SYMBOL: &str = "_end";

const LINKER_FILE: &str = "<linker>";

/// Number of addressable words.
const ADDRESS_SPACE: usize = 0x10000;

pub struct Linker {
    pub program: Program,
    pub modules: Vec<Module>,
    leading: Vec<Instr>,
    sentinel: Instr,
    trailing: Vec<Instr>,
    end: SymbolId,
    base_address: u16,
    keep_going: bool,
}

impl Linker {
    pub fn new(mut program: Program, modules: Vec<Module>, config: &Config) -> Result<Linker, Located> {
        if let Some(&id) = program.table.get(END_SYMBOL) {
            let sym = program.symbols.get(id);
            let text = modules
                .iter()
                .find(|m| m.file == sym.file)
                .and_then(|m| m.lines.get(sym.line))
                .cloned()
                .unwrap_or_default();
            return Err(Error::ReservedSymbol(END_SYMBOL.to_string()).at(&sym.file, sym.line, &text));
        }

        let end = program.symbols.add(LINKER_FILE, 0, END_SYMBOL, None);
        program.table.insert(END_SYMBOL.to_string(), end);
        let mut sentinel = Instr::new(LINKER_FILE, 0, END_SYMBOL, None, Code::Mark);
        sentinel.defined.push(end);
        program.symbols.define(
            end,
            Definition {
                file: LINKER_FILE.to_string(),
                line: 0,
            },
        );

        let mut leading = vec![];
        if let Some(entry) = &config.entry {
            let text = format!("set pc, {}", entry);
            let target = Param::parse(entry).map_err(|e| e.at(LINKER_FILE, 0, &text))?;
            let pc = Param::parse("pc").map_err(|e| e.at(LINKER_FILE, 0, &text))?;
            let jump = Operation::new(Op::Basic(OpKind::SET), vec![pc, target]);
            leading.push(Instr::new(LINKER_FILE, 0, &text, None, Code::Op(jump)));
        }

        Ok(Linker {
            program,
            modules,
            leading,
            sentinel,
            trailing: vec![],
            end,
            base_address: config.base_address,
            keep_going: config.keep_going,
        })
    }

    /// Assign addresses, in program order, starting at the base address.
    /// Fails on the first record that does not fit below 0x10000.
    pub fn fix(&mut self) -> Result<(), Located> {
        let symbols = &mut self.program.symbols;
        let mut address = self.base_address as usize;
        let records = self
            .leading
            .iter_mut()
            .chain(self.modules.iter_mut().flat_map(|m| m.instrs.iter_mut()));
        for instr in records {
            let at = u16::try_from(address)
                .map_err(|_| instr.locate(Error::AddressOverflow(address)))?;
            let next = address + instr.size();
            if next > ADDRESS_SPACE {
                return Err(instr.locate(Error::AddressOverflow(next - 1)));
            }
            instr.fix(at, symbols);
            address = next;
        }
        // An image that reaches the top of memory leaves `_end` unplaced.
        if let Ok(at) = u16::try_from(address) {
            self.sentinel.fix(at, symbols);
        }
        Ok(())
    }

    /// Evaluate every record into words.
    ///
    /// With `keep_going`, a record that fails is reported in `msgs` and
    /// filled with zeros; encoding failures still stop the link.
    pub fn realize(&mut self, msgs: &mut Msgs) -> Result<(), Located> {
        let program = &self.program;
        let records = self
            .leading
            .iter_mut()
            .chain(self.modules.iter_mut().flat_map(|m| m.instrs.iter_mut()));
        for instr in records {
            let file = instr.file.clone();
            let result = instr.realize(&Scope::new(program, &file, instr.scope));
            match result {
                Ok(()) => {}
                Err(err) if self.keep_going && err.kind() != ErrorKind::Encode => {
                    msgs.error(&err);
                    instr.fill_zero();
                }
                Err(err) => return Err(err),
            }
        }

        self.sentinel.words = Some(vec![]);
        self.trailing.clear();
        if self.program.symbols.get(self.end).referenced.get() {
            self.trailing.push(self.sentinel.clone());
        }
        Ok(())
    }

    /// Records in program order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instr> {
        self.leading
            .iter()
            .chain(self.modules.iter().flat_map(|m| m.instrs.iter()))
            .chain(self.trailing.iter())
    }

    pub fn words(&self) -> Vec<u16> {
        self.instructions()
            .flat_map(|i| i.words().iter().copied())
            .collect()
    }

    /// The image as big-endian words.
    pub fn binary(&self) -> Result<Vec<u8>, Error> {
        let words = self.words();
        if words.is_empty() {
            return Err(Error::NothingToAssemble);
        }
        Ok(words.iter().flat_map(|w| w.to_be_bytes()).collect())
    }

    pub fn end_address(&self) -> Option<u16> {
        self.sentinel.address
    }

    /// Symbols nothing refers to, by mangled name.
    pub fn unreferenced(&self) -> Vec<String> {
        self.program
            .unreferenced()
            .into_iter()
            .filter(|name| name != END_SYMBOL)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(sources: &[(&str, &str)], config: &Config) -> (Result<Linker, Located>, Msgs) {
        let mut msgs = Msgs::new();
        let mut program = Program::new();
        let mut modules = vec![];
        for (file, source) in sources {
            match Module::parse(file, source, &mut program, config, &mut msgs) {
                Ok(m) => modules.push(m),
                Err(e) => return (Err(e), msgs),
            }
        }
        let result = Linker::new(program, modules, config).and_then(|mut linker| {
            linker.fix()?;
            linker.realize(&mut msgs)?;
            Ok(linker)
        });
        (result, msgs)
    }

    #[test]
    fn addresses_are_contiguous() {
        let config = Config {
            base_address: 0x100,
            ..Config::default()
        };
        let (linker, _) = link(
            &[("a.s", "set a, 0x30\n.word 1, 2\nset [0x1000], 0x20\n"), ("b.s", "set pc, pop\n")],
            &config,
        );
        let linker = linker.unwrap();
        let mut expect = 0x100;
        for instr in linker.instructions() {
            assert_eq!(instr.address, Some(expect));
            assert_eq!(instr.words().len(), instr.size());
            expect += instr.size() as u16;
        }
        assert_eq!(linker.end_address(), Some(expect));
        assert_eq!(expect, 0x100 + 2 + 2 + 3 + 1);
    }

    #[test]
    fn cross_module_reference() {
        let (linker, _) = link(
            &[("a.s", "jsr func\nset pc, _end\n"), ("b.s", "func: set pc, pop\n")],
            &Config::default(),
        );
        let linker = linker.unwrap();
        // jsr func / set pc, _end / set pc, pop
        assert_eq!(linker.words(), vec![0x7c20, 0x0004, 0x7f81, 0x0005, 0x6381]);
        assert_eq!(linker.instructions().count(), 4);
        assert_eq!(
            linker.binary().unwrap(),
            vec![0x7c, 0x20, 0x00, 0x04, 0x7f, 0x81, 0x00, 0x05, 0x63, 0x81]
        );
    }

    #[test]
    fn sentinel_only_when_referenced() {
        let (linker, _) = link(&[("a.s", "set a, 1\n")], &Config::default());
        let linker = linker.unwrap();
        assert_eq!(linker.instructions().count(), 1);
        assert!(linker.unreferenced().is_empty());
    }

    #[test]
    fn reserved_end() {
        let (linker, _) = link(&[("a.s", "set a, 1\n_end: .word 0\n")], &Config::default());
        let err = linker.err().unwrap();
        assert_eq!(err.error, Error::ReservedSymbol("_end".to_string()));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn undefined_symbol_stops() {
        let (linker, _) = link(&[("a.s", "set a, 1\nset b, nowhere\n")], &Config::default());
        let err = linker.err().unwrap();
        assert_eq!(err.error, Error::UndefinedSymbol("nowhere".to_string()));
        assert_eq!(err.line, 1);
        assert_eq!(err.text, "set b, nowhere");
    }

    #[test]
    fn keep_going_fills_zeros() {
        let config = Config {
            keep_going: true,
            ..Config::default()
        };
        let (linker, msgs) = link(&[("a.s", "set b, nowhere\nset pop, 1\nset a, 1\n")], &config);
        let linker = linker.unwrap();
        assert!(msgs.has_error());
        assert_eq!(msgs.len(), 2);
        assert_eq!(linker.words(), vec![0, 0, 0, 0x8801]);
    }

    #[test]
    fn keep_going_stops_on_encode() {
        let config = Config {
            keep_going: true,
            ..Config::default()
        };
        let (linker, _) = link(&[("a.s", "set a, 1\nfar: set a, far+0xffff\n")], &config);
        assert_eq!(linker.err().unwrap().error, Error::WordOverflow(0x10000));
    }

    #[test]
    fn image_past_top_of_memory() {
        let config = Config {
            base_address: 0xFFFF,
            keep_going: true,
            ..Config::default()
        };
        let (linker, _) = link(&[("a.s", "set a, 1\nhere: set pc, here\n")], &config);
        let err = linker.err().unwrap();
        assert_eq!(err.error, Error::AddressOverflow(0x10000));
        assert_eq!(err.line, 1);

        // the literal word of a two-word instruction lands past the top
        let (linker, _) = link(&[("a.s", "set a, 0x30\n")], &config);
        assert_eq!(linker.err().unwrap().error, Error::AddressOverflow(0x10000));

        let (linker, _) = link(&[("a.s", "set a, 1\ntop:\n")], &config);
        assert_eq!(linker.err().unwrap().error, Error::AddressOverflow(0x10000));
    }

    #[test]
    fn image_filling_memory() {
        let config = Config {
            base_address: 0xFFFE,
            ..Config::default()
        };
        let (linker, _) = link(&[("a.s", ".word 1, 2\n")], &config);
        let linker = linker.unwrap();
        assert_eq!(linker.words(), vec![1, 2]);
        assert_eq!(linker.end_address(), None);

        let (linker, _) = link(&[("a.s", "set a, _end\n")], &config);
        assert_eq!(linker.err().unwrap().error, Error::AddressOverflow(0x10000));
    }

    #[test]
    fn entry_jump() {
        let config = Config {
            entry: Some("main".to_string()),
            ..Config::default()
        };
        let (linker, _) = link(&[("a.s", ".word 7\nmain: set a, 1\n")], &config);
        let linker = linker.unwrap();
        assert_eq!(linker.words(), vec![0x7f81, 0x0003, 0x0007, 0x8801]);
    }

    #[test]
    fn nothing_to_assemble() {
        let (linker, _) = link(&[("a.s", "; empty\nlonely:\n")], &Config::default());
        let linker = linker.unwrap();
        assert_eq!(linker.binary(), Err(Error::NothingToAssemble));
        assert_eq!(linker.unreferenced(), vec!["lonely"]);
    }
}
