use indexmap::IndexMap;
use std::cell::Cell;

use crate::error::Error;

pub const SEPARATOR: &str = "$$";

/// Handle into [`Symbols`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// Mangled name -> symbol, in insertion order.
pub type Table = IndexMap<String, SymbolId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Global,
    Local,
    Hidden,
}

/// Where a symbol was bound to its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub file: String,
    pub line: usize,
}

#[derive(Debug)]
pub struct Symbol {
    /// Name as written, local labels keep their leading dot.
    pub name: String,
    pub file: String,
    /// Line of the label that introduced the symbol.
    pub line: usize,
    pub parent: Option<SymbolId>,
    pub visibility: Visibility,
    pub definition: Option<Definition>,
    pub referenced: Cell<bool>,
    pub locals: Vec<SymbolId>,
    pub address: Option<u16>,
}

// ----------------------------------------------------------------------------
// Mangling

pub fn module_name(file: &str) -> String {
    file.trim_start_matches('.').replace(['/', '\\'], "_")
}

pub fn local_name(parent: &str, name: &str) -> String {
    format!("{}{}{}", parent, SEPARATOR, name)
}

pub fn private_name(file: &str, name: &str) -> String {
    format!("{}{}{}", module_name(file), SEPARATOR, name)
}

// ----------------------------------------------------------------------------
// Arena

#[derive(Debug, Default)]
pub struct Symbols(Vec<Symbol>);

impl Symbols {
    pub fn new() -> Self {
        Symbols(vec![])
    }

    /// Create a symbol. A symbol with a parent is local and is attached to it.
    pub fn add(&mut self, file: &str, line: usize, name: &str, parent: Option<SymbolId>) -> SymbolId {
        let id = SymbolId(self.0.len());
        self.0.push(Symbol {
            name: name.to_string(),
            file: file.to_string(),
            line,
            parent,
            visibility: match parent {
                Some(_) => Visibility::Local,
                None => Visibility::Global,
            },
            definition: None,
            referenced: Cell::new(false),
            locals: vec![],
            address: None,
        });
        if let Some(parent) = parent {
            self.0[parent.0].locals.push(id);
        }
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.0[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Current mangled name. Locals follow their parent's current name.
    pub fn mangled(&self, id: SymbolId) -> String {
        let sym = self.get(id);
        match (sym.visibility, sym.parent) {
            (Visibility::Local, Some(parent)) => local_name(&self.mangled(parent), &sym.name),
            (Visibility::Hidden, _) => private_name(&sym.file, &sym.name),
            _ => sym.name.clone(),
        }
    }

    /// Bind the symbol to its record. Returns false if it was already bound.
    pub fn define(&mut self, id: SymbolId, definition: Definition) -> bool {
        let sym = &mut self.0[id.0];
        match sym.definition {
            Some(_) => false,
            None => {
                sym.definition = Some(definition);
                true
            }
        }
    }

    pub fn set_address(&mut self, id: SymbolId, address: u16) {
        self.0[id.0].address = Some(address);
    }

    fn family(&self, id: SymbolId, out: &mut Vec<SymbolId>) {
        out.push(id);
        for &local in &self.get(id).locals {
            self.family(local, out);
        }
    }

    /// Switch a symbol to hidden visibility, re-keying it and all of its
    /// locals in `table`.
    pub fn make_hidden(&mut self, table: &mut Table, id: SymbolId) {
        let mut family = vec![];
        self.family(id, &mut family);
        for &member in &family {
            table.shift_remove(&self.mangled(member));
        }
        self.0[id.0].visibility = Visibility::Hidden;
        for &member in &family {
            table.insert(self.mangled(member), member);
        }
    }
}

/// Look `name` up as seen from `file` inside global `scope`.
///
/// Already-mangled names are tried verbatim first. Local names need a
/// scope. Plain names prefer the file's hidden definition over a global one.
pub fn resolve(
    symbols: &Symbols,
    table: &Table,
    file: &str,
    name: &str,
    scope: Option<SymbolId>,
) -> Result<Option<SymbolId>, Error> {
    if name.contains(SEPARATOR) {
        if let Some(&id) = table.get(name) {
            return Ok(Some(id));
        }
    }

    if name.starts_with('.') {
        let scope = scope.ok_or_else(|| Error::NoScope(name.to_string()))?;
        let key = local_name(&symbols.mangled(scope), name);
        return Ok(table.get(&key).copied());
    }

    if let Some(&id) = table.get(&private_name(file, name)) {
        return Ok(Some(id));
    }
    Ok(table.get(name).copied())
}

// ----------------------------------------------------------------------------
// Program

/// Symbols of the whole program, and the merged table that names them.
#[derive(Debug, Default)]
pub struct Program {
    pub symbols: Symbols,
    pub table: Table,
}

/// Sizes of the arena and the table at some point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    symbols: usize,
    table: usize,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            symbols: self.symbols.len(),
            table: self.table.len(),
        }
    }

    /// Drop every symbol and name added since `at`.
    /// Symbols only ever append, so truncation restores the earlier state.
    pub fn rollback(&mut self, at: Checkpoint) {
        self.symbols.0.truncate(at.symbols);
        self.table.truncate(at.table);
    }

    pub fn resolve(
        &self,
        file: &str,
        name: &str,
        scope: Option<SymbolId>,
    ) -> Result<Option<SymbolId>, Error> {
        resolve(&self.symbols, &self.table, file, name, scope)
    }

    /// Mangled names of symbols nothing refers to.
    pub fn unreferenced(&self) -> Vec<String> {
        self.table
            .iter()
            .filter(|(_, id)| !self.symbols.get(**id).referenced.get())
            .map(|(name, _)| name.clone())
            .collect()
    }
}
