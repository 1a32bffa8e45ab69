// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Returns `base` raised to `exponent`, saturating at `usize::MAX`.
///
/// Exponentiation by squaring, so the cost is logarithmic in `exponent`.
#[inline]
pub(crate) const fn saturating_pow(base: usize, exponent: u32) -> usize {
    let mut result: usize = 1;
    let mut base = base;
    let mut exponent = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.saturating_mul(base);
        }
        exponent >>= 1;
        if exponent > 0 {
            base = base.saturating_mul(base);
        }
    }
    result
}
