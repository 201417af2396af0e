//! # Base-2 Logarithm / Exponent Kernel
//!
//! Fractional powers `x^(y/z)` evaluated with nothing but integer shifts and
//! multiplications:
//!
//! ```text
//!   x^(y/z) = 2^( log2(x) · y / z )
//!
//!   log_2 :  u128 integer        ──▶  log2(x) · 2^121
//!   pow_2 :  exponent · 2^121    ──▶  2^exponent   (integer part)
//! ```
//!
//! ## Normalisation
//!
//! [`pow`] does not return `x^(y/z)` itself but
//!
//! ```text
//!   x^(y/z) · 2^(128 · (1 - y/z))
//! ```
//!
//! For `y/z < 1` this stretches the result so that it uses the full 128 bits
//! whatever the size of `x`, keeping ~128 bits of precision. The factor cancels
//! when a sum of such terms (all with the same `y/z = a`) is raised back with
//! `pow(sum, z, y)`:
//!
//! ```text
//!   (S · 2^(128(1-a)))^(1/a) · 2^(128(1 - 1/a))  =  S^(1/a)
//! ```
//!
//! which is exactly the shape of the YieldSpace invariant.

use super::U256;

/// Fraction bits of the logarithm returned by [`log_2`]; also the scale of
/// the exponent accepted by [`pow_2`]. `log2(u128::MAX) < 128` so the result
/// always fits in a `u128`.
pub const LOG2_FRACTION_BITS: u32 = 121;

const FRACTION_MASK: u128 = (1u128 << LOG2_FRACTION_BITS) - 1;

/// Number of fraction bits handled by the constant table in [`pow_2`].
const TABLE_BITS: u32 = 64;

/// Fraction bits below the table, applied with the first-order expansion.
const TAIL_MASK: u128 = (1u128 << (LOG2_FRACTION_BITS - TABLE_BITS)) - 1;

/// 1.0 with 127 fraction bits.
const MANTISSA_ONE: u128 = 1u128 << 127;

/// ln(2) with 127 fraction bits.
const LN_2: u128 = 0x58b90bfb_e8e7bcd5_e4f1d9cc_01f97b58;

/// `POW2_FACTORS[k - 1] = 2^(2^-k)` with 127 fraction bits, k = 1..=64.
const POW2_FACTORS: [u128; TABLE_BITS as usize] = [
    0xb504f333_f9de6484_597d89b3_754abe9f,
    0x9837f051_8db8a96f_46ad2318_2e42f6f6,
    0x8b95c1e3_ea8bd6e6_fbe46287_58a53c90,
    0x85aac367_cc487b14_c5c95b8c_2154c1b2,
    0x82cd8698_ac2ba1d7_3e2a475b_46520bff,
    0x8164d1f3_bc030773_7be56527_bd14def5,
    0x80b1ed4f_d999ab6c_25335719_b6e6fd20,
    0x8058d7d2_d5e5f6b0_94d589f6_08ee4aa2,
    0x802c6436_d0e04f50_ff8ce94a_6797b3ce,
    0x8016302f_17467628_3690dfe4_4d11d008,
    0x800b179c_82028fd0_945e54e2_ae18f2f0,
    0x80058baf_7fee3b5d_1c718b38_e549cb93,
    0x8002c5d0_0fdcfcb6_b6566a58_c048be1f,
    0x800162e6_1bed4a48_e84c2e1a_463473da,
    0x8000b172_92f702a3_aa22beac_ca949013,
    0x800058b9_2abbae02_030c5fa5_256f41fe,
    0x80002c5c_8dade4d7_1776c0f4_dbea67d6,
    0x8000162e_44eaf636_526be456_600bdbe5,
    0x80000b17_21fa7c18_8307016c_1cd4e8b7,
    0x8000058b_90de7e4c_ecfc4875_03488bb2,
    0x800002c5_c8678f36_cbfce50a_6de60b14,
    0x80000162_e431db9f_80b2347b_5d62e516,
    0x800000b1_721872d0_c7b08cf1_e0114153,
    0x80000058_b90c1aa8_a5c3736c_b77e8e00,
    0x8000002c_5c8605a4_635f2efc_2362d978,
    0x80000016_2e4300e6_35cf4a10_9e3939bd,
    0x8000000b_17217ff8_1bef9c55_1590cf83,
    0x80000005_8b90bfdd_4e39cd52_c0cfa27d,
    0x80000002_c5c85fe6_f72d669e_0e76e412,
    0x80000001_62e42ff1_8f9ad351_86d0df28,
    0x80000000_b17217f8_4cce71aa_0dcfffe8,
    0x80000000_58b90bfc_07a77ad5_6ed22aaa,
    0x80000000_2c5c85fd_fc23cdea_d40da8d7,
    0x80000000_162e42fe_fc25eb15_71853a66,
    0x80000000_0b17217f_7d97f692_baacded5,
    0x80000000_058b90bf_bead3b8b_5dd254d8,
    0x80000000_02c5c85f_df4eedd6_2f084e68,
    0x80000000_0162e42f_efa58aef_378bf587,
    0x80000000_00b17217_f7d24a78_a3c7ef03,
    0x80000000_0058b90b_fbe9067c_93e474a6,
    0x80000000_002c5c85_fdf47b8e_5a72599f,
    0x80000000_00162e42_fefa3bdb_315934a3,
    0x80000000_000b1721_7f7d1d72_99b49c46,
    0x80000000_00058b90_bfbe8e9a_8d1c4ea0,
    0x80000000_0002c5c8_5fdf4745_969ea76f,
    0x80000000_000162e4_2fefa3a0_df5373c0,
    0x80000000_0000b172_17f7d1cf_f4aac1e2,
    0x80000000_000058b9_0bfbe8e7_db95a2f1,
    0x80000000_00002c5c_85fdf473_e61ae1f9,
    0x80000000_0000162e_42fefa39_f121751c,
    0x80000000_00000b17_217f7d1c_f815bb96,
    0x80000000_0000058b_90bfbe8e_7bec1e0d,
    0x80000000_000002c5_c85fdf47_3dee5f17,
    0x80000000_00000162_e42fefa3_9ef54390,
    0x80000000_000000b1_7217f7d1_cf7a26c9,
    0x80000000_00000058_b90bfbe8_e7bcf4a5,
    0x80000000_0000002c_5c85fdf4_73de72a2,
    0x80000000_00000016_2e42fefa_39ef3765,
    0x80000000_0000000b_17217f7d_1cf79b38,
    0x80000000_00000005_8b90bfbe_8e7bcd7d,
    0x80000000_00000002_c5c85fdf_473de6b7,
    0x80000000_00000001_62e42fef_a39ef359,
    0x80000000_00000000_b17217f7_d1cf79ac,
    0x80000000_00000000_58b90bfb_e8e7bcd6,
];

#[inline]
fn two_pow_128() -> U256 {
    U256::one() << 128
}

/// Base-2 logarithm of an unsigned integer.
///
/// The integer part comes from the position of the most significant bit. The
/// mantissa is then normalised into `[1, 2)` and squared once per fraction
/// bit: whenever the square reaches 2 the bit is set and the mantissa halved.
///
/// # Returns
/// * `Some(log2(x) · 2^121)`, rounded down
/// * `None` for `x = 0`
pub fn log_2(x: u128) -> Option<u128> {
    if x == 0 {
        return None;
    }

    let msb = 127 - x.leading_zeros();
    let mut result = (msb as u128) << LOG2_FRACTION_BITS;

    // mantissa in [2^127, 2^128)
    let mut mantissa = U256::from(x << (127 - msb));
    let two = two_pow_128();

    for bit in (0..LOG2_FRACTION_BITS).rev() {
        mantissa = (mantissa * mantissa) >> 127;
        if mantissa >= two {
            mantissa = mantissa >> 1;
            result |= 1u128 << bit;
        }
    }

    Some(result)
}

/// Binary exponent: `2^(x / 2^121)`, rounded down.
///
/// Any `u128` input is in range (`x / 2^121 < 128`) so the result always fits
/// in a `u128`. The top 64 fraction bits each multiply the mantissa by a
/// precomputed `2^(2^-k)`; the remaining bits are worth less than `2^-64` and
/// are folded in with `2^f ≈ 1 + f·ln 2`, whose error is below `2^-128`.
pub fn pow_2(x: u128) -> u128 {
    let whole = (x >> LOG2_FRACTION_BITS) as u32;
    let fraction = x & FRACTION_MASK;

    let mut mantissa = U256::from(MANTISSA_ONE);
    for (i, factor) in POW2_FACTORS.iter().enumerate() {
        let bit = LOG2_FRACTION_BITS - 1 - i as u32;
        if fraction & (1u128 << bit) != 0 {
            mantissa = (mantissa * U256::from(*factor)) >> 127;
        }
    }

    let tail = fraction & TAIL_MASK;
    if tail != 0 {
        let scaled_ln2 = (mantissa * U256::from(LN_2)) >> 127;
        mantissa = mantissa + ((scaled_ln2 * U256::from(tail)) >> LOG2_FRACTION_BITS);
    }

    // mantissa < 2^128 here, so the shifted value fits in 128 bits
    (mantissa >> (127 - whole)).low_u128()
}

/// Raise `x` to the rational power `y/z` and apply the normalisation factor
/// `2^(128 · (1 - y/z))` (see the module docs).
///
/// # Returns
/// * `None` when `z = 0`, or when the normalised result would reach `2^128`
///   (only possible for a zero exponent with `x ≠ 0`)
/// * `Some(1)` for `0^0`, `Some(0)` for `0^(y/z)` with `y ≠ 0`
/// * `Some(u128::MAX)` for `x = u128::MAX`: its logarithm sits so close to 128
///   that the log stage can't tell the exact result from `2^128`
/// * `Some(0)` when the normalised result is below 1
///
/// # Example
/// ```ignore
/// // 10^24 raised to 3/4, normalised by 2^32: ≈ 10^18 · 2^32
/// let v = pow(1_000_000_000_000_000_000_000_000, 3, 4).unwrap();
/// ```
pub fn pow(x: u128, y: u128, z: u128) -> Option<u128> {
    if z == 0 {
        return None;
    }
    if x == 0 {
        return Some(if y == 0 { 1 } else { 0 });
    }
    if x == u128::MAX {
        return Some(u128::MAX);
    }

    let ceiling = two_pow_128();
    let log = U256::from(log_2(x)?);

    // (128 - log2 x) · y/z, in log units; the result is 2^(128 - l)
    let l = (ceiling - log) * U256::from(y) / U256::from(z);

    if l.is_zero() {
        return None;
    }
    if l > ceiling {
        return Some(0);
    }

    Some(pow_2((ceiling - l).low_u128()))
}

// ============================================================================
// TESTS
// ============================================================================
