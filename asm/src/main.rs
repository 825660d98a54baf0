use clap::Parser;
use color_print::cprintln;
use std::process::exit;

use dcasm::config::{Config, Redefinition};
use dcasm::error::Located;
use dcasm::listing;
use dcasm::msg::Msgs;
use dcasm::param::parse_literal;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input files, linked in the given order
    #[clap(required = true)]
    input: Vec<String>,

    /// Output file
    #[clap(short, long, default_value = "a.bin")]
    output: String,

    /// YAML config file
    #[clap(short, long)]
    config: Option<String>,

    /// Address of the first word (decimal or 0x..)
    #[clap(short, long, value_parser = parse_address)]
    base: Option<u16>,

    /// Emit a leading jump to this symbol
    #[clap(short, long)]
    entry: Option<String>,

    /// Report link errors and keep going
    #[clap(short, long)]
    keep_going: bool,

    /// Treat symbol redefinition as an error
    #[clap(long)]
    strict: bool,

    /// Print phases and unreferenced symbols
    #[clap(short, long)]
    verbose: bool,

    /// Dump the listing
    #[clap(short, long)]
    dump: bool,
}

fn parse_address(s: &str) -> Result<u16, String> {
    parse_literal(s).map_err(|e| e.to_string())
}

fn config(args: &Args) -> Config {
    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                cprintln!("<r,s>{}</>", err);
                exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(base) = args.base {
        config.base_address = base;
    }
    if let Some(entry) = &args.entry {
        config.entry = Some(entry.clone());
    }
    config.keep_going |= args.keep_going;
    config.verbose |= args.verbose;
    if args.strict {
        config.redefinition = Redefinition::Error;
    }
    config
}

/// Print pending messages, then the error that stopped the run.
fn report(msgs: &Msgs, err: &Located, verbose: bool) -> ! {
    msgs.dump();
    err.print_diag();
    if verbose {
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            cprintln!("  <dim>caused by</>: {}", cause);
            source = std::error::Error::source(cause);
        }
    }
    exit(1);
}

fn main() {
    let args: Args = Args::parse();
    let config = config(&args);
    let verbose = config.verbose;
    let mut msgs = Msgs::new();

    if verbose {
        println!("DCPU-16 Assembler");
        println!("1. Read Files");
    }
    let mut sources = vec![];
    for path in &args.input {
        if verbose {
            println!("  < {}", path);
        }
        match std::fs::read_to_string(path) {
            Ok(source) => sources.push((path.clone(), source)),
            Err(err) => {
                cprintln!("<r,s>Failed to open File</>: {} ({})", path, err);
                exit(1);
            }
        }
    }

    if verbose {
        println!("2. Parse, Fix Addresses & Resolve Symbols");
    }
    let linker = match dcasm::assemble(&sources, &config, &mut msgs) {
        Ok(linker) => linker,
        Err(err) => report(&msgs, &err, verbose),
    };
    msgs.dump();
    if msgs.has_error() {
        cprintln!("<r,s>Link failed</>: {} error(s)", msgs.errors().count());
    }

    if verbose {
        for name in linker.unreferenced() {
            cprintln!("<green,bold>note</>: Unreferenced symbol: `{}`", name);
        }
        println!("3. Generate Binary");
        println!("  > {}", &args.output);
    }
    let bin = match linker.binary() {
        Ok(bin) => bin,
        Err(err) => {
            cprintln!("<red,bold>error</>: {}", err);
            exit(1);
        }
    };
    if let Err(err) = std::fs::write(&args.output, bin) {
        cprintln!("<r,s>Failed to write File</>: {} ({})", &args.output, err);
        exit(1);
    }

    if args.dump {
        listing::print(&linker);
    }

    if msgs.has_error() {
        exit(1);
    }
}
