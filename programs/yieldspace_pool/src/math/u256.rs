//! 256-bit unsigned integer used for every intermediate product of the
//! fixed-point kernel and the pool's share math.

use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer (four little-endian `u64` limbs).
    pub struct U256(4);
}

impl U256 {
    /// Narrow to `u128`, `None` when the value needs more than 128 bits.
    pub fn checked_as_u128(self) -> Option<u128> {
        if self.bits() > 128 {
            None
        } else {
            Some(self.low_u128())
        }
    }

    /// Limbs as stored in account data.
    pub fn to_limbs(self) -> [u64; 4] {
        self.0
    }

    pub fn from_limbs(limbs: [u64; 4]) -> Self {
        U256(limbs)
    }
}
