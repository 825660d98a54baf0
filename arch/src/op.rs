use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumString};

/// Two-operand instructions. The discriminant is the 5-bit opcode field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, EnumString, Display,
)]
#[repr(u8)]
pub enum OpKind {
    SET = 0x01,
    ADD = 0x02,
    SUB = 0x03,
    MUL = 0x04,
    MLI = 0x05,
    DIV = 0x06,
    DVI = 0x07,
    MOD = 0x08,
    MDI = 0x09,
    AND = 0x0a,
    BOR = 0x0b,
    XOR = 0x0c,
    SHR = 0x0d,
    ASR = 0x0e,
    SHL = 0x0f,
    IFB = 0x10,
    IFC = 0x11,
    IFE = 0x12,
    IFN = 0x13,
    IFG = 0x14,
    IFA = 0x15,
    IFL = 0x16,
    IFU = 0x17,
    ADX = 0x1a,
    SBX = 0x1b,
    STI = 0x1e,
    STD = 0x1f,
}

/// One-operand instructions, selected by a zero opcode field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, EnumString, Display,
)]
#[repr(u8)]
pub enum ExtOp {
    JSR = 0x01,
    INT = 0x08,
    IAG = 0x09,
    IAS = 0x0a,
    RFI = 0x0b,
    IAQ = 0x0c,
    HWN = 0x10,
    HWQ = 0x11,
    HWI = 0x12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Basic(OpKind),
    Ext(ExtOp),
}

impl Op {
    pub fn parse(s: &str) -> Result<Self, String> {
        let upper = s.to_ascii_uppercase();
        if let Ok(kind) = upper.parse::<OpKind>() {
            return Ok(Op::Basic(kind));
        }
        match upper.parse::<ExtOp>() {
            Ok(ext) => Ok(Op::Ext(ext)),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }

    /// Number of operands written in source.
    pub fn arity(&self) -> usize {
        match self {
            Op::Basic(_) => 2,
            Op::Ext(_) => 1,
        }
    }

    pub fn mnemonic(&self) -> String {
        match self {
            Op::Basic(kind) => kind.to_string().to_lowercase(),
            Op::Ext(ext) => ext.to_string().to_lowercase(),
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

// ----------------------------------------------------------------------------
// Word format: aaaaaabbbbbooooo

pub fn enc_format(opcode: u8, b: u8, a: u8) -> u16 {
    ((opcode as u16) & 0x1F) | (((b as u16) & 0x1F) << 5) | (((a as u16) & 0x3F) << 10)
}

pub fn dec_format(word: u16) -> (u8, u8, u8) {
    let opcode = (word & 0x1F) as u8;
    let b = ((word >> 5) & 0x1F) as u8;
    let a = ((word >> 10) & 0x3F) as u8;
    (opcode, b, a)
}

impl Op {
    /// Encode the first word of the instruction from its operand mode bits.
    /// `b` is ignored for one-operand instructions.
    pub fn to_bin(&self, b: u8, a: u8) -> u16 {
        match *self {
            Op::Basic(kind) => enc_format(kind.into(), b, a),
            Op::Ext(ext) => enc_format(0, ext.into(), a),
        }
    }

    /// Decode the first word into the operation and its raw `b`, `a` fields.
    pub fn from_bin(word: u16) -> Option<(Op, u8, u8)> {
        let (opcode, b, a) = dec_format(word);
        match opcode {
            0 => ExtOp::try_from(b).ok().map(|ext| (Op::Ext(ext), 0, a)),
            _ => OpKind::try_from(opcode)
                .ok()
                .map(|kind| (Op::Basic(kind), b, a)),
        }
    }
}

#[test]
fn test_format_all() {
    for opcode in 0..=0x1F {
        for b in 0..=0x1F {
            for a in 0..=0x3F {
                let word = enc_format(opcode, b, a);
                assert_eq!(dec_format(word), (opcode, b, a));
            }
        }
    }
}

#[test]
fn test_parse() {
    assert_eq!(Op::parse("set"), Ok(Op::Basic(OpKind::SET)));
    assert_eq!(Op::parse("IFE"), Ok(Op::Basic(OpKind::IFE)));
    assert_eq!(Op::parse("jsr"), Ok(Op::Ext(ExtOp::JSR)));
    assert!(Op::parse("hoge").is_err());
    assert!(Op::parse(".word").is_err());
}

macro_rules! test_op {
    ($name:ident, $op:expr, $b:expr, $a:expr, $bin:expr) => {
        #[test]
        fn $name() {
            let op = $op;
            let bin = op.to_bin($b, $a);
            assert_eq!(bin, $bin, "op: {:?}, bin: {:016b}", op, bin);
            let (decoded, b, a) = Op::from_bin(bin).unwrap();
            assert_eq!(decoded, op);
            assert_eq!(a, $a);
            if let Op::Basic(_) = op {
                assert_eq!(b, $b);
            }
        }
    };
}

// set a, 0x30 -> 7c01 0030
test_op!(test_set_lit, Op::Basic(OpKind::SET), 0x00, 0x1f, 0x7c01);
// set [0x1000], 0x20
test_op!(test_set_ind, Op::Basic(OpKind::SET), 0x1e, 0x1f, 0x7fc1);
// sub a, [0x1000]
test_op!(test_sub, Op::Basic(OpKind::SUB), 0x00, 0x1e, 0x7803);
// ifn a, 0x10
test_op!(test_ifn, Op::Basic(OpKind::IFN), 0x00, 0x1f, 0x7c13);
// set pc, pop
test_op!(test_ret, Op::Basic(OpKind::SET), 0x1c, 0x18, 0x6381);
// set push, a
test_op!(test_push, Op::Basic(OpKind::SET), 0x18, 0x00, 0x0301);
// jsr 0x1000
test_op!(test_jsr, Op::Ext(ExtOp::JSR), 0x00, 0x1f, 0x7c20);
// hwi a
test_op!(test_hwi, Op::Ext(ExtOp::HWI), 0x00, 0x00, 0x0240);
