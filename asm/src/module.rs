use indexmap::IndexMap;

use crate::config::{Config, Redefinition};
use crate::error::{Error, Located};
use crate::instr::{Code, Data, Instr, Operation};
use crate::msg::Msgs;
use crate::param::Param;
use crate::symbol::{local_name, resolve, Definition, Program, SymbolId, Table};
use crate::token::{normalize, Body, Directive, Line};

/// A `.func` .. `.endfunc` span. Lines are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub begin: usize,
    pub end: Option<usize>,
}

/// One source file, assembled against the program it joins.
#[derive(Debug)]
pub struct Module {
    pub file: String,
    pub lines: Vec<String>,
    pub tokens: Vec<Line>,
    /// Symbols defined in this file, keyed by their name before merging.
    pub table: Table,
    /// Names made hidden with `.hidden` / `.private`, with their line.
    pub hidden: Vec<(String, usize)>,
    pub instrs: Vec<Instr>,
    pub functions: IndexMap<String, Function>,
}

impl Module {
    /// Tokenize, define, merge and build the records of one file.
    /// On failure `program` is left as it was before the call.
    pub fn parse(
        file: &str,
        source: &str,
        program: &mut Program,
        config: &Config,
        msgs: &mut Msgs,
    ) -> Result<Module, Located> {
        let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();

        let mut tokens = vec![];
        for (idx, raw) in lines.iter().enumerate() {
            let line = Line::parse(file, idx, &normalize(raw), msgs)
                .map_err(|e| e.at(file, idx, raw))?;
            tokens.push(line);
        }

        let mut module = Module {
            file: file.to_string(),
            lines,
            tokens,
            table: Table::new(),
            hidden: vec![],
            instrs: vec![],
            functions: IndexMap::new(),
        };
        let at = program.checkpoint();
        let result = module
            .definitions(program, config, msgs)
            .and_then(|_| module.merge(program, config, msgs))
            .and_then(|_| module.build(program, msgs));
        match result {
            Ok(()) => Ok(module),
            Err(err) => {
                program.rollback(at);
                Err(err)
            }
        }
    }

    fn locate(&self, error: Error, idx: usize) -> Located {
        error.at(&self.file, idx, &self.lines[idx])
    }

    fn redefined(
        &self,
        name: &str,
        idx: usize,
        first: (&str, usize),
        config: &Config,
        msgs: &mut Msgs,
    ) -> Result<(), Located> {
        if config.redefinition == Redefinition::Error {
            return Err(self.locate(Error::Redefined(name.to_string()), idx));
        }
        msgs.warn(
            format!("Symbol redefined: `{}`. Keeping the first definition.", name),
            &self.file,
            idx,
            &self.lines[idx],
        );
        let (file, line) = first;
        let text = match file == self.file {
            true => self.lines[line].clone(),
            false => String::new(),
        };
        msgs.note("First defined here.".to_string(), file, line, &text);
        Ok(())
    }

    /// Create a symbol for every label and collect visibility directives.
    fn definitions(
        &mut self,
        program: &mut Program,
        config: &Config,
        msgs: &mut Msgs,
    ) -> Result<(), Located> {
        let mut last_global: Option<SymbolId> = None;

        for idx in 0..self.tokens.len() {
            let line = &self.tokens[idx];
            if let Body::Directive { directive, rest } = &line.body {
                if directive.is_visibility() {
                    for name in rest.split([' ', ',']).filter(|n| !n.is_empty()) {
                        self.hidden.push((name.to_string(), idx));
                    }
                }
            }

            let Some(label) = line.label.clone() else {
                continue;
            };

            let parent = match label.local {
                true => match last_global {
                    Some(id) => Some(id),
                    None => return Err(self.locate(Error::OrphanLocal(label.name), idx)),
                },
                false => None,
            };
            let key = match parent {
                Some(parent) => local_name(&program.symbols.mangled(parent), &label.name),
                None => label.name.clone(),
            };

            if let Some(&first) = self.table.get(&key) {
                let sym = program.symbols.get(first);
                let at = (sym.file.clone(), sym.line);
                self.redefined(&key, idx, (&at.0, at.1), config, msgs)?;
                if parent.is_none() {
                    last_global = Some(first);
                }
                continue;
            }

            let id = program.symbols.add(&self.file, idx, &label.name, parent);
            self.table.insert(key, id);
            if parent.is_none() {
                last_global = Some(id);
            }
        }
        Ok(())
    }

    /// Apply hidden visibility, then publish this file's symbols.
    fn merge(&mut self, program: &mut Program, config: &Config, msgs: &mut Msgs) -> Result<(), Located> {
        for (name, idx) in std::mem::take(&mut self.hidden) {
            match self.table.get(&name) {
                Some(&id) => program.symbols.make_hidden(&mut self.table, id),
                None => msgs.warn(
                    format!("Setting visibility of undefined symbol `{}`. Skipping.", name),
                    &self.file,
                    idx,
                    &self.lines[idx],
                ),
            }
            self.hidden.push((name, idx));
        }

        for (name, &id) in &self.table {
            match program.table.get(name) {
                None => {
                    program.table.insert(name.clone(), id);
                }
                Some(&first) => {
                    let sym = program.symbols.get(first);
                    let at = (sym.file.clone(), sym.line);
                    let idx = program.symbols.get(id).line;
                    self.redefined(name, idx, (&at.0, at.1), config, msgs)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve a label on `idx` against this file's own table.
    fn own_label(&self, program: &Program, idx: usize, scope: Option<SymbolId>) -> Result<Option<SymbolId>, Located> {
        let Some(label) = &self.tokens[idx].label else {
            return Ok(None);
        };
        resolve(&program.symbols, &self.table, &self.file, &label.name, scope)
            .map_err(|e| self.locate(e, idx))?
            .map(Some)
            .ok_or_else(|| self.locate(Error::UndefinedSymbol(label.name.clone()), idx))
    }

    /// Point references at the symbols they name, where already known.
    fn bind(&self, program: &Program, params: &[Param], scope: Option<SymbolId>) -> Vec<Param> {
        params
            .iter()
            .map(|param| {
                let bound = param.map_refs(|name| {
                    Ok(match program.resolve(&self.file, name, scope) {
                        Ok(Some(id)) => {
                            let sym = program.symbols.get(id);
                            sym.referenced.set(true);
                            program.symbols.mangled(id)
                        }
                        _ => name.to_string(),
                    })
                });
                bound.unwrap_or_else(|_| param.clone())
            })
            .collect()
    }

    /// Build the records of this file.
    fn build(&mut self, program: &mut Program, msgs: &mut Msgs) -> Result<(), Located> {
        let mut pending: Vec<SymbolId> = vec![];
        let mut scope: Option<SymbolId> = None;
        let mut open_func: Option<String> = None;

        for idx in 0..self.tokens.len() {
            let label = self.own_label(program, idx, scope)?;
            if let (Some(id), Some(def)) = (label, &self.tokens[idx].label) {
                if !def.local {
                    scope = Some(id);
                }
                pending.push(id);
            }

            let code = match &self.tokens[idx].body {
                Body::Instr { op, params } => {
                    Code::Op(Operation::new(*op, self.bind(program, params, scope)))
                }
                Body::Directive { directive, rest } if directive.is_data() => {
                    Code::Data(Data::parse(*directive, rest).map_err(|e| self.locate(e, idx))?)
                }
                Body::Directive {
                    directive: Directive::Func,
                    rest,
                } => {
                    if let Some(name) = open_func.replace(rest.clone()) {
                        msgs.warn(
                            format!("`.func {}` is not closed before the next `.func`", name),
                            &self.file,
                            idx,
                            &self.lines[idx],
                        );
                    }
                    self.functions.insert(rest.clone(), Function { begin: idx, end: None });
                    continue;
                }
                Body::Directive {
                    directive: Directive::Endfunc,
                    ..
                } => {
                    match open_func.take().and_then(|name| self.functions.get_mut(&name)) {
                        Some(func) => func.end = Some(idx),
                        None => msgs.warn(
                            "`.endfunc` without `.func`".to_string(),
                            &self.file,
                            idx,
                            &self.lines[idx],
                        ),
                    }
                    continue;
                }
                _ => continue,
            };

            let instr = Instr::new(&self.file, idx, &self.lines[idx], scope, code);
            self.push(instr, &mut pending, program);
        }

        if let Some(name) = open_func {
            let idx = self.functions.get(&name).map(|f| f.begin).unwrap_or(0);
            msgs.warn(
                format!("`.func {}` is never closed", name),
                &self.file,
                idx,
                &self.lines[idx],
            );
        }

        // Labels after the last record mark the end of the file.
        if let Some(&first) = pending.first() {
            let idx = program.symbols.get(first).line;
            let instr = Instr::new(&self.file, idx, &self.lines[idx], scope, Code::Mark);
            self.push(instr, &mut pending, program);
        }
        Ok(())
    }

    fn push(&mut self, mut instr: Instr, pending: &mut Vec<SymbolId>, program: &mut Program) {
        for id in pending.drain(..) {
            let definition = Definition {
                file: instr.file.clone(),
                line: instr.line,
            };
            if program.symbols.define(id, definition) {
                instr.defined.push(id);
            }
        }
        self.instrs.push(instr);
    }

    pub fn size(&self) -> usize {
        self.instrs.iter().map(|i| i.size()).sum()
    }
}
