//! Scalar quantizers used by the SPZ planar blocks.
//!
//! Error bounds, per component, for values inside the representable range:
//!
//! | attribute | storage | max error |
//! |-----------|---------|-----------|
//! | position  | 24-bit fixed point, 12 fractional bits | 2^-13 |
//! | scale (log) | `u8`, 1/16 steps from -10 | 1/32 |
//! | opacity   | `u8` of the sigmoid | 0.5/255 after sigmoid |
//! | color (DC) | `u8`, scaled by 0.15 | 0.5/(0.15 * 255) |
//! | rotation  | smallest-three, 9-bit magnitudes | ~0.0014 before renormalizing |
//! | SH        | `u8` snapped to 8 (degree 1) or 16 wide buckets | bucket/256 + 1/256 |

use std::f32::consts::FRAC_1_SQRT_2;

pub const FRACTIONAL_BITS: u8 = 12;

/// Scales DC colours before quantizing. Smaller than the 0.282 SH constant so
/// out of range base colours, which higher bands can bring back, survive.
pub const COLOR_SCALE: f32 = 0.15;

pub const SH1_BITS: u32 = 5;
pub const SH_REST_BITS: u32 = 4;

const I24_MIN: i32 = -(1 << 23);
const I24_MAX: i32 = (1 << 23) - 1;

fn to_u8(x: f32) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn inv_sigmoid(x: f32) -> f32 {
    (x / (1.0 - x)).ln()
}

/// Returns the 3 little endian bytes and whether the value had to be clamped.
pub fn quantize_position(x: f32, fractional_bits: u8) -> ([u8; 3], bool) {
    let scaled = (x * (1u32 << fractional_bits) as f32).round();
    let fixed = (scaled as i32).clamp(I24_MIN, I24_MAX);
    let clamped = scaled < I24_MIN as f32 || scaled > I24_MAX as f32;
    let bytes = fixed.to_le_bytes();
    ([bytes[0], bytes[1], bytes[2]], clamped)
}

pub fn unquantize_position(bytes: [u8; 3], fractional_bits: u8) -> f32 {
    // Place the 24 bits at the top of an i32 and shift back to sign extend.
    let fixed = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
    fixed as f32 / (1u32 << fractional_bits) as f32
}

pub fn quantize_scale(log_scale: f32) -> u8 {
    to_u8((log_scale + 10.0) * 16.0)
}

pub fn unquantize_scale(x: u8) -> f32 {
    x as f32 / 16.0 - 10.0
}

pub fn quantize_alpha(logit: f32) -> u8 {
    to_u8(sigmoid(logit) * 255.0)
}

/// The end bytes decode half a step inside `(0, 1)` so the logit stays finite.
pub fn unquantize_alpha(x: u8) -> f32 {
    inv_sigmoid((x as f32 / 255.0).clamp(0.5 / 255.0, 254.5 / 255.0))
}

pub fn quantize_color(dc: f32) -> u8 {
    to_u8(dc * (COLOR_SCALE * 255.0) + 0.5 * 255.0)
}

pub fn unquantize_color(x: u8) -> f32 {
    (x as f32 / 255.0 - 0.5) / COLOR_SCALE
}

/// Quantize an SH coefficient keeping only the top `bits` bits.
pub fn quantize_sh(x: f32, bits: u32) -> u8 {
    let bucket = 1i32 << (8 - bits);
    let q = (x * 128.0 + 128.0).round().clamp(0.0, 255.0) as i32;
    let q = (q + bucket / 2) / bucket * bucket;
    q.clamp(0, 255) as u8
}

pub fn unquantize_sh(x: u8) -> f32 {
    (x as f32 - 128.0) / 128.0
}

/// Bits kept for SH coefficient `index` (0 based, excluding DC).
pub fn sh_bits_for_coefficient(index: usize) -> u32 {
    if index < 3 {
        SH1_BITS
    } else {
        SH_REST_BITS
    }
}

fn quat_norm(q: [f32; 4]) -> f32 {
    q.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Zero length or non finite quaternions, which have no rotation to keep.
pub fn is_degenerate_quat(q: [f32; 4]) -> bool {
    let norm = quat_norm(q);
    !norm.is_finite() || norm < 1e-12
}

/// Unit quaternion `[x, y, z, w]`, falling back to identity for degenerate input.
pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    if is_degenerate_quat(q) {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let norm = quat_norm(q);
    q.map(|v| v / norm)
}

/// Version 1 and 2 rotation encoding: `xyz` of the w-positive quaternion.
pub fn pack_quat_first_three(q: [f32; 4]) -> [u8; 3] {
    let q = normalize_quat(q);
    let sign = if q[3] < 0.0 { -1.0 } else { 1.0 };
    [0, 1, 2].map(|i| to_u8((q[i] * sign) * 127.5 + 127.5))
}

pub fn unpack_quat_first_three(bytes: [u8; 3]) -> [f32; 4] {
    let [x, y, z] = bytes.map(|b| b as f32 / 127.5 - 1.0);
    let w = (1.0 - (x * x + y * y + z * z)).max(0.0).sqrt();
    normalize_quat([x, y, z, w])
}

const SMALLEST_THREE_MASK: u32 = (1 << 9) - 1;

/// Version 3 rotation encoding: index of the largest component in the top
/// two bits, then the other three as sign bit plus 9-bit magnitude.
pub fn pack_quat_smallest_three(q: [f32; 4]) -> [u8; 4] {
    let q = normalize_quat(q);
    let largest = (0..4)
        .max_by(|&a, &b| q[a].abs().total_cmp(&q[b].abs()))
        .unwrap_or(3);
    let negate = q[largest] < 0.0;

    let mut comp = largest as u32;
    for (i, &v) in q.iter().enumerate() {
        if i == largest {
            continue;
        }
        let negbit = ((v < 0.0) ^ negate) as u32;
        let mag = (SMALLEST_THREE_MASK as f32 * (v.abs() / FRAC_1_SQRT_2) + 0.5) as u32;
        comp = (comp << 10) | (negbit << 9) | mag.min(SMALLEST_THREE_MASK);
    }
    comp.to_le_bytes()
}

pub fn unpack_quat_smallest_three(bytes: [u8; 4]) -> [f32; 4] {
    let mut comp = u32::from_le_bytes(bytes);
    let largest = (comp >> 30) as usize;
    let mut q = [0.0f32; 4];
    let mut sum_squares = 0.0;

    for i in (0..4).rev() {
        if i == largest {
            continue;
        }
        let mag = comp & SMALLEST_THREE_MASK;
        let negbit = (comp >> 9) & 1;
        comp >>= 10;
        let v = FRAC_1_SQRT_2 * mag as f32 / SMALLEST_THREE_MASK as f32;
        q[i] = if negbit == 1 { -v } else { v };
        sum_squares += q[i] * q[i];
    }
    q[largest] = (1.0 - sum_squares).max(0.0).sqrt();
    normalize_quat(q)
}

/// IEEE 754 half to f32, for version 1 positions.
pub fn half_to_f32(h: u16) -> f32 {
    let sign = if (h >> 15) & 1 == 1 { -1.0 } else { 1.0 };
    let exponent = ((h >> 10) & 0x1f) as i32;
    let mantissa = (h & 0x3ff) as f32;

    match exponent {
        0 => sign * 2f32.powi(-14) * mantissa / 1024.0,
        31 if mantissa == 0.0 => sign * f32::INFINITY,
        31 => f32::NAN,
        _ => sign * 2f32.powi(exponent - 15) * (1.0 + mantissa / 1024.0),
    }
}

#[cfg(test)]
pub(crate) fn f32_to_half(x: f32) -> u16 {
    // Normal range only, which is all the tests need.
    let bits = x.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    if x == 0.0 {
        return sign;
    }
    let exponent = ((bits >> 23) & 0xff) as i32 - 127 + 15;
    let mantissa = ((bits & 0x7f_ffff) + 0x1000) >> 13;
    sign | ((exponent as u16) << 10) + mantissa as u16
}
