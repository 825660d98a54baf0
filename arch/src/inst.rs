use crate::mode::{Mode, Slot};
use crate::op::Op;

use color_print::cformat;

/// A decoded instruction with its operands' extra words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inst {
    pub op: Op,
    pub b: Option<(Mode, Option<u16>)>,
    pub a: (Mode, Option<u16>),
}

impl Inst {
    /// Decode the instruction starting at `words[0]`.
    /// Returns the instruction and the number of words it occupies.
    pub fn decode(words: &[u16]) -> Option<(Inst, usize)> {
        let (&first, rest) = words.split_first()?;
        let (op, b_bits, a_bits) = Op::from_bin(first)?;
        let mut rest = rest.iter();
        let mut size = 1;

        let a_mode = Mode::from_bits(a_bits, Slot::A)?;
        let a_word = match a_mode.needs_word() {
            true => {
                size += 1;
                Some(*rest.next()?)
            }
            false => None,
        };

        let b = match op {
            Op::Basic(_) => {
                let b_mode = Mode::from_bits(b_bits, Slot::B)?;
                let b_word = match b_mode.needs_word() {
                    true => {
                        size += 1;
                        Some(*rest.next()?)
                    }
                    false => None,
                };
                Some((b_mode, b_word))
            }
            Op::Ext(_) => None,
        };

        Some((
            Inst {
                op,
                b,
                a: (a_mode, a_word),
            },
            size,
        ))
    }

    pub fn encode(&self) -> Vec<u16> {
        let b_bits = self.b.map(|(m, _)| m.bits()).unwrap_or(0);
        let mut words = vec![self.op.to_bin(b_bits, self.a.0.bits())];
        words.extend(self.a.1);
        if let Some((_, w)) = self.b {
            words.extend(w);
        }
        words
    }

    pub fn cformat(&self) -> String {
        let a = self.a.0.cformat(self.a.1);
        match self.b {
            Some((mode, word)) => cformat!(
                "<r>{:<4}</>{}, {}",
                self.op.mnemonic(),
                mode.cformat(word),
                a
            ),
            None => cformat!("<r>{:<4}</>{}", self.op.mnemonic(), a),
        }
    }
}
