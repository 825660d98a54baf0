pub mod inst;
pub mod mode;
pub mod op;
pub mod reg;
