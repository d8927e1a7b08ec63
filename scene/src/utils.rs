use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Small bit-set keyed by `Into<u8>` flag enums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flags {
    bits: BitVec,
}

impl Flags {
    pub fn new() -> Flags {
        Flags {
            bits: bitvec![0; 32],
        }
    }

    pub fn set_flag<F: Into<u8>>(&mut self, flag: F) {
        let i = flag.into() as usize;
        if i >= self.bits.len() {
            self.bits.resize(i + 1, false);
        }
        self.bits.set(i, true);
    }

    pub fn unset_flag<F: Into<u8>>(&mut self, flag: F) {
        let i = flag.into() as usize;
        if i < self.bits.len() {
            self.bits.set(i, false);
        }
    }

    pub fn has_flag<F: Into<u8>>(&self, flag: F) -> bool {
        let i = flag.into() as usize;
        if i < self.bits.len() {
            self.bits[i]
        } else {
            false
        }
    }

    pub fn any(&self) -> bool {
        self.bits.iter().any(|b| *b)
    }

    pub fn clear(&mut self) {
        let len = self.bits.len();
        self.bits = bitvec![0; len];
    }
}

impl Default for Flags {
    fn default() -> Flags {
        Flags::new()
    }
}
