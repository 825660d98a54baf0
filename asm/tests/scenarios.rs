use dcasm::config::Config;
use dcasm::error::{Error, Located};
use dcasm::linker::Linker;
use dcasm::msg::{MsgKind, Msgs};

fn assemble(sources: &[(&str, &str)], config: &Config) -> (Result<Linker, Located>, Msgs) {
    let sources: Vec<(String, String)> = sources
        .iter()
        .map(|(file, src)| (file.to_string(), src.to_string()))
        .collect();
    let mut msgs = Msgs::new();
    let result = dcasm::assemble(&sources, config, &mut msgs);
    (result, msgs)
}

fn words(source: &str) -> Vec<u16> {
    let (linker, msgs) = assemble(&[("main.s", source)], &Config::default());
    let linker = linker.unwrap();
    assert!(msgs.is_empty(), "{:?}", msgs);
    linker.words()
}

fn error(source: &str) -> Error {
    let (linker, _) = assemble(&[("main.s", source)], &Config::default());
    linker.err().unwrap().error
}

#[test]
fn push_only_in_destination() {
    assert_eq!(words("set push, a"), vec![0x0301]);
    assert!(matches!(error("set a, push"), Error::WrongSlot(_)));
}

#[test]
fn pop_only_in_source() {
    assert_eq!(words("set a, pop"), vec![0x6001]);
    assert!(matches!(error("set pop, a"), Error::WrongSlot(_)));
}

#[test]
fn register_plus_offset() {
    assert_eq!(words("set [0x20+a], 1"), vec![0x8a01, 0x0020]);
    assert_eq!(words("set [a+0x20], 1"), vec![0x8a01, 0x0020]);
}

#[test]
fn hidden_symbol_is_invisible_elsewhere() {
    let (linker, _) = assemble(
        &[
            ("lib.s", ".hidden foo\nfoo: set a, 1\nset pc, foo\n"),
            ("main.s", "set pc, foo\n"),
        ],
        &Config::default(),
    );
    let err = linker.err().unwrap();
    assert_eq!(err.error, Error::UndefinedSymbol("foo".to_string()));
    assert_eq!(err.file, "main.s");
    assert_eq!(err.line, 0);
}

#[test]
fn hidden_symbol_shadows_global() {
    let (linker, _) = assemble(
        &[
            ("lib.s", ".private foo\nfoo: set pc, foo\n"),
            ("main.s", "foo: set pc, foo\n"),
        ],
        &Config::default(),
    );
    let linker = linker.unwrap();
    assert_eq!(linker.words(), vec![0x7f81, 0x0000, 0x7f81, 0x0002]);
}

#[test]
fn duplicate_start_keeps_first() {
    let (linker, msgs) = assemble(
        &[
            ("a.s", "start: set a, 1\n"),
            ("b.s", "start: set b, 2\nset pc, start\n"),
        ],
        &Config::default(),
    );
    let linker = linker.unwrap();
    assert_eq!(linker.words(), vec![0x8801, 0x8c21, 0x7f81, 0x0000]);

    let kinds: Vec<MsgKind> = msgs.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![MsgKind::Warn, MsgKind::Note]);
    let note = msgs.iter().nth(1).unwrap();
    assert_eq!((note.file.as_str(), note.line), ("a.s", 0));
}

#[test]
fn asciz() {
    assert_eq!(words(".asciz \"hi\""), vec![0x68, 0x69, 0x00]);
}

#[test]
fn end_symbol_points_past_image() {
    assert_eq!(
        words("set a, _end\n.word 1, 2\n"),
        vec![0x7c01, 0x0004, 0x0001, 0x0002]
    );
}

#[test]
fn locals_are_per_global() {
    let src = "\
first: set i, 0
:.loop add i, 1
ifn i, 3
set pc, .loop
second: set pc, .loop
:.loop set pc, first
";
    assert_eq!(
        words(src),
        vec![0x84c1, 0x88c2, 0x90d3, 0x7f81, 0x0001, 0x7f81, 0x0007, 0x7f81, 0x0000]
    );
}

#[test]
fn base_address() {
    let config = Config {
        base_address: 0x1000,
        ..Config::default()
    };
    let (linker, _) = assemble(&[("main.s", "here: set pc, here\n")], &config);
    assert_eq!(linker.unwrap().words(), vec![0x7f81, 0x1000]);
}

#[test]
fn binary_is_big_endian() {
    let (linker, _) = assemble(&[("main.s", ".word 0x1234, 0xabcd\n")], &Config::default());
    assert_eq!(linker.unwrap().binary().unwrap(), vec![0x12, 0x34, 0xab, 0xcd]);
}

#[test]
fn parse_error_is_located() {
    let (linker, _) = assemble(&[("main.s", "set a, 1\n\n  set [a+b], 1 ; two registers\n")], &Config::default());
    let err = linker.err().unwrap();
    assert!(matches!(err.error, Error::MultipleRegisters(_)));
    assert_eq!(err.line, 2);
    assert_eq!(err.text, "  set [a+b], 1 ; two registers");
    assert_eq!(err.to_string(), "More than one register or special value in `[a+b]` (main.s:3)");
}

#[test]
fn image_must_fit_in_memory() {
    let config = Config {
        base_address: 0xFFFF,
        ..Config::default()
    };
    let (linker, _) = assemble(&[("main.s", "set a, 1\nhere: set pc, here\n")], &config);
    let err = linker.err().unwrap();
    assert_eq!(err.error, Error::AddressOverflow(0x10000));
    assert_eq!((err.file.as_str(), err.line), ("main.s", 1));
}

#[test]
fn register_names_are_not_labels() {
    assert_eq!(error("x: set pc, x\n"), Error::ReservedLabel("x".to_string()));
}
