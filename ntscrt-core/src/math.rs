//! Fixed-point trigonometry and exponentials.
//!
//! Everything downstream of these routines is integer arithmetic, so the
//! whole pipeline stays bit-exact across platforms. Angles live in a 14-bit
//! period (a full turn is [`T14_2PI`] units) and sine/cosine values are
//! signed 15-bit.

/// One full turn in 14-bit angle units.
pub const T14_2PI: i32 = 16384;
/// Half a turn.
pub const T14_PI: i32 = T14_2PI / 2;
const T14_MASK: i32 = T14_2PI - 1;

/// Fractional precision of [`expx`] and the IIR coefficients derived from it.
pub const EXP_P: i32 = 11;
/// 1.0 in [`EXP_P`] fixed point.
pub const EXP_ONE: i32 = 1 << EXP_P;
/// Pi in [`EXP_P`] fixed point.
pub const EXP_PI: i32 = 6434;
const EXP_MASK: i32 = EXP_ONE - 1;

/// Significant points on the first quarter of a sine wave, 15-bit magnitude.
/// The extra entry past 0x8000 keeps the interpolator in bounds at the
/// quarter-turn boundary.
const SIGPSIN15: [i32; 18] = [
    0x0000, 0x0c88, 0x18f8, 0x2528, 0x30f8, 0x3c50, 0x4718, 0x5130, 0x5a80, 0x62f0, 0x6a68, 0x70e0,
    0x7640, 0x7a78, 0x7d88, 0x7f60, 0x8000, 0x7f60,
];

/// Table interpolation using the low 8 bits of the angle as the fraction.
const fn sintabil8(n: i32) -> i32 {
    let f = n & 0xff;
    let i = (n >> 8 & 0xff) as usize;
    let a = SIGPSIN15[i];
    let b = SIGPSIN15[i + 1];
    a + ((b - a) * f >> 8)
}

/// 14-bit interpolated sine/cosine.
///
/// `n` is an angle where [`T14_2PI`] is one full turn; any `i32` is accepted
/// and wrapped into the period. Returns `(sin, cos)` as signed 15-bit values.
#[must_use]
pub const fn sincos14(n: i32) -> (i32, i32) {
    let n = n & T14_MASK;
    let h = n & (T14_PI - 1);

    let (s, c) = if h > (T14_2PI >> 2) - 1 {
        (sintabil8(T14_PI - h), -sintabil8(h - (T14_2PI >> 2)))
    } else {
        (sintabil8(h), sintabil8((T14_2PI >> 2) - h))
    };
    if n > T14_PI - 1 {
        (-s, -c)
    } else {
        (s, c)
    }
}

/// Fixed-point `e^(n / EXP_ONE)` in [`EXP_P`] precision.
///
/// Integer part via an `e^1..e^4` lookup, fractional part via a truncated
/// Taylor series that exits as soon as the next term underflows. Negative
/// inputs return the reciprocal. Only used to derive filter coefficients at
/// init time; precision is tuned for that, not for runtime math.
#[must_use]
pub const fn expx(n: i32) -> i32 {
    // e^1..e^4 in EXP_P fixed point
    const E11: [i32; 5] = [EXP_ONE, 5567, 15133, 41135, 111817];

    if n == 0 {
        return EXP_ONE;
    }
    let neg = n < 0;
    let mut n = if neg { -n } else { n };

    let mut idx = n >> EXP_P;
    let mut res = EXP_ONE;
    let mut i = 0;
    while i < idx / 4 {
        res = (res * E11[4]) >> EXP_P;
        i += 1;
    }
    idx &= 3;
    if idx > 0 {
        res = (res * E11[idx as usize]) >> EXP_P;
    }

    n &= EXP_MASK;
    let mut nxt = EXP_ONE;
    let mut acc = 0;
    let mut del = 1;
    let mut i = 1;
    while i < 17 {
        acc += nxt / del;
        del *= i;
        nxt = (nxt * n) >> EXP_P;
        if del > nxt || nxt <= 0 || del <= 0 {
            break;
        }
        i += 1;
    }
    res = (res * acc) >> EXP_P;

    if neg {
        res = (EXP_ONE * EXP_ONE) / res;
    }
    res
}
