use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, EnumString, Display,
)]
#[repr(u8)]
pub enum Reg {
    A,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,
}

impl Reg {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(r) => Ok(r),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }

    pub fn code(self) -> u8 {
        self.into()
    }
}

// ----------------------------------------------------------------------------
// Special values

/// Operand keywords that are not general registers.
/// `PUSH` and `POP` share one mode code; which one is legal depends on the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum Special {
    POP,
    PUSH,
    PEEK,
    SP,
    PC,
    EX,
}

impl Special {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(v) => Ok(v),
            Err(_) => Err(format!("Unknown special value: {s}")),
        }
    }
}
