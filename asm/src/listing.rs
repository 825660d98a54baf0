use arch::inst::Inst;
use color_print::cformat;

use crate::instr::{Code, Instr};
use crate::linker::Linker;

const SEPARATOR: &str = "-------+----------------------+-----------------------------------------------";

fn hex(words: &[u16]) -> String {
    let words: Vec<String> = words.iter().map(|w| format!("{:04X}", w)).collect();
    words.join(" ")
}

/// Disassembly of the words produced for an instruction. Records
/// zero-filled after an error do not decode; show their source instead.
fn decoded(instr: &Instr) -> String {
    match Inst::decode(instr.words()) {
        Some((inst, _)) => inst.cformat(),
        None => cformat!("<r,s>??</> {}", instr.code),
    }
}

fn record(instr: &Instr, linker: &Linker) -> Vec<String> {
    let mut out = vec![];
    let symbols = &linker.program.symbols;
    for &id in &instr.defined {
        let label = cformat!("<g>{}:</>", symbols.mangled(id));
        out.push(format!("{:7}| {:21}| {}", "", "", label));
    }

    let address = instr
        .address
        .map(|a| format!("{:04X}", a))
        .unwrap_or_else(|| "????".to_string());
    let location = format!("{}:{}", instr.file, instr.line + 1);
    match &instr.code {
        Code::Op(_) => out.push(format!(
            "[{}] | {:21}| {:<24} {}",
            address,
            hex(instr.words()),
            decoded(instr),
            cformat!("<dim>; {}</>", location)
        )),
        Code::Data(_) => {
            for (idx, chunk) in instr.words().chunks(4).enumerate() {
                let at = instr.address.map(|a| a + (4 * idx) as u16);
                let at = at.map(|a| format!("{:04X}", a)).unwrap_or_else(|| "????".to_string());
                out.push(format!(
                    "[{}] | {:21}| {}",
                    at,
                    hex(chunk),
                    cformat!("<y>.word</> <dim>; {}</>", location)
                ));
            }
        }
        Code::Mark => {}
    }
    out
}

/// Address, words and disassembly of every record, in program order.
pub fn render(linker: &Linker) -> Vec<String> {
    linker
        .instructions()
        .flat_map(|instr| record(instr, linker))
        .collect()
}

pub fn print(linker: &Linker) {
    println!("{}", SEPARATOR);
    for line in render(linker) {
        println!("{}", line);
    }
    println!("{}", SEPARATOR);
}
