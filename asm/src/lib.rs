pub mod config;
pub mod error;
pub mod eval;
pub mod instr;
pub mod linker;
pub mod listing;
pub mod module;
pub mod msg;
pub mod param;
pub mod symbol;
pub mod token;

use config::Config;
use error::Located;
use linker::Linker;
use module::Module;
use msg::Msgs;
use symbol::Program;

/// Assemble `(file name, source)` pairs, in order, into a realized image.
/// Warnings, and errors skipped with `keep_going`, are collected in `msgs`.
pub fn assemble(
    sources: &[(String, String)],
    config: &Config,
    msgs: &mut Msgs,
) -> Result<Linker, Located> {
    let mut program = Program::new();
    let mut modules = vec![];
    for (file, source) in sources {
        modules.push(Module::parse(file, source, &mut program, config, msgs)?);
    }
    let mut linker = Linker::new(program, modules, config)?;
    linker.fix()?;
    linker.realize(msgs)?;
    Ok(linker)
}
