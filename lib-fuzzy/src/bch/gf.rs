//! GF(2^7) arithmetic over the primitive polynomial x^7 + x^3 + 1
//!
//! Exponent/log tables are built once and shared immutably across threads.
//! Field elements are bytes in 0..128; the multiplicative group has order
//! 127 with generator alpha = x.

use once_cell::sync::Lazy;

/// Field size
pub(crate) const FIELD: usize = 128;
/// Multiplicative group order
pub(crate) const GROUP_ORDER: usize = FIELD - 1;
/// x^7 + x^3 + 1, low 7 bits after the leading term is reduced away
const PRIMITIVE_POLY: u8 = 0b000_1001;

pub(crate) struct GfTables {
    /// alpha^i for i in 0..2*127, doubled so products need no modulo
    pub exp: [u8; 2 * GROUP_ORDER],
    /// discrete log of each nonzero element
    pub log: [u8; FIELD],
}

pub(crate) static TABLES: Lazy<GfTables> = Lazy::new(GfTables::build);

impl GfTables {
    fn build() -> Self {
        let mut exp = [0u8; 2 * GROUP_ORDER];
        let mut log = [0u8; FIELD];
        let mut x: u8 = 1;
        for i in 0..GROUP_ORDER {
            exp[i] = x;
            exp[i + GROUP_ORDER] = x;
            log[x as usize] = i as u8;
            let carry = x & 0x40 != 0;
            x <<= 1;
            x &= 0x7F;
            if carry {
                x ^= PRIMITIVE_POLY;
            }
        }
        GfTables { exp, log }
    }

    /// alpha^i for any non-negative exponent
    pub fn alpha_pow(&self, i: usize) -> u8 {
        self.exp[i % GROUP_ORDER]
    }

    /// Field product
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            0
        } else {
            self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
        }
    }

    /// Multiplicative inverse of a nonzero element
    pub fn inv(&self, a: u8) -> u8 {
        debug_assert!(a != 0);
        self.exp[GROUP_ORDER - self.log[a as usize] as usize]
    }
}
