//! Band-limiting filters.
//!
//! Modulation limits Y/I/Q with single-pole IIR low-passes; demodulation
//! pulls them back apart with a three-band equalizer. All coefficients are
//! derived in fixed point from [`expx`] and [`sincos14`] at construction.

use crate::{
    common::{Reset, ResetKind},
    math::{expx, sincos14, EXP_ONE, EXP_P, EXP_PI, T14_PI},
};
use serde::{Deserialize, Serialize};

/// Infinite impulse response low-pass, used to band-limit YIQ before the
/// chroma carrier is applied.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct IirLp {
    c: i32,
    h: i32, // history
}

impl IirLp {
    /// `freq` is the total bandwidth the samples span, `limit` the highest
    /// frequency that should survive.
    pub const fn new(freq: i32, limit: i32) -> Self {
        let rate = (freq << 9) / limit; // cycles/pixel rate
        Self {
            c: EXP_ONE - expx(-((EXP_PI << 9) / rate)),
            h: 0,
        }
    }

    pub fn filter(&mut self, s: i32) -> i32 {
        self.h += (s - self.h) * self.c >> EXP_P;
        self.h
    }
}

impl Reset for IirLp {
    fn reset(&mut self, _kind: ResetKind) {
        self.h = 0;
    }
}

/// Fractional precision of the equalizer coefficients and gains.
const EQ_P: i32 = 16;
/// Rounding constant.
const EQ_R: i32 = 1 << (EQ_P - 1);

const HISTLEN: usize = 3;
const HISTOLD: usize = HISTLEN - 1; // oldest entry
const HISTNEW: usize = 0; // newest entry

/// Three-band equalizer.
///
/// Four cascaded one-pole stages per split give a smoothed low band, the mid
/// band falls out as the difference of the two cascades, and the high band
/// is the aged raw input minus the high cascade. Each band carries its own
/// 16-bit fixed-point gain.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct EqFilter {
    lf: i32, // fractions
    hf: i32,
    g: [i32; 3], // gains
    fl: [i32; 4],
    fh: [i32; 4],
    h: [i32; HISTLEN], // history
}

impl EqFilter {
    /// `f_lo`/`f_hi` are the split frequencies and `rate` the sampling rate,
    /// all in the same unit; gains are `EQ_P` fixed point.
    pub const fn new(f_lo: i32, f_hi: i32, rate: i32, g_lo: i32, g_mid: i32, g_hi: i32) -> Self {
        let (lsn, _) = sincos14(T14_PI * f_lo / rate);
        let (hsn, _) = sincos14(T14_PI * f_hi / rate);
        Self {
            lf: 2 * (lsn << (EQ_P - 15)),
            hf: 2 * (hsn << (EQ_P - 15)),
            g: [g_lo, g_mid, g_hi],
            fl: [0; 4],
            fh: [0; 4],
            h: [0; HISTLEN],
        }
    }

    pub fn filter(&mut self, s: i32) -> i32 {
        self.fl[0] += (self.lf * (s - self.fl[0]) + EQ_R) >> EQ_P;
        self.fh[0] += (self.hf * (s - self.fh[0]) + EQ_R) >> EQ_P;

        for i in 1..4 {
            self.fl[i] += (self.lf * (self.fl[i - 1] - self.fl[i]) + EQ_R) >> EQ_P;
            self.fh[i] += (self.hf * (self.fh[i - 1] - self.fh[i]) + EQ_R) >> EQ_P;
        }

        let mut r = [
            self.fl[3],
            self.fh[3] - self.fl[3],
            self.h[HISTOLD] - self.fh[3],
        ];
        for (band, gain) in r.iter_mut().zip(self.g) {
            *band = (*band * gain) >> EQ_P;
        }

        for i in (1..HISTLEN).rev() {
            self.h[i] = self.h[i - 1];
        }
        self.h[HISTNEW] = s;

        r[0] + r[1] + r[2]
    }
}

impl Reset for EqFilter {
    fn reset(&mut self, _kind: ResetKind) {
        self.fl = [0; 4];
        self.fh = [0; 4];
        self.h = [0; HISTLEN];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal;

    #[test]
    fn iir_settles_on_dc() {
        let mut iir = IirLp::new(signal::L_FREQ, signal::Y_FREQ);
        let mut last = 0;
        for _ in 0..64 {
            last = iir.filter(100);
        }
        // fixed-point truncation may stop one step short of the input
        assert!((99..=100).contains(&last), "settled at {last}");
    }

    #[test]
    fn iir_coefficient_is_a_fraction() {
        for limit in [signal::Y_FREQ, signal::I_FREQ, signal::Q_FREQ] {
            let iir = IirLp::new(signal::L_FREQ, limit);
            assert!(iir.c > 0 && iir.c < EXP_ONE, "coefficient {}", iir.c);
        }
    }

    #[test]
    fn iir_narrower_band_tracks_slower() {
        let mut y = IirLp::new(signal::L_FREQ, signal::Y_FREQ);
        let mut q = IirLp::new(signal::L_FREQ, signal::Q_FREQ);
        assert!(y.filter(1000) > q.filter(1000));
    }

    #[test]
    fn iir_reset_clears_history_only() {
        let mut iir = IirLp::new(signal::L_FREQ, signal::Y_FREQ);
        let c = iir.c;
        iir.filter(500);
        iir.reset(ResetKind::Hard);
        assert_eq!(iir.h, 0);
        assert_eq!(iir.c, c);
    }

    #[test]
    fn eq_with_unit_gains_is_a_delay() {
        // with every band at unity the three bands telescope back into the
        // raw input, aged by the history length
        let mut eq = EqFilter::new(95, 190, signal::HRES as i32, 65536, 65536, 65536);
        let input = [12, -7, 100, 42, -128, 90, 3, 77, -1, 55];
        let mut out = Vec::new();
        for s in input {
            out.push(eq.filter(s));
        }
        // the history is read before it shifts, so the delay is HISTLEN
        assert_eq!(&out[..HISTLEN], &[0, 0, 0]);
        assert_eq!(&out[HISTLEN..], &input[..input.len() - HISTLEN]);
    }

    #[test]
    fn eq_with_zero_gains_is_silent() {
        let mut eq = EqFilter::new(95, 190, signal::HRES as i32, 0, 0, 0);
        for s in [-120, 0, 13, 127] {
            assert_eq!(eq.filter(s), 0);
        }
    }

    #[test]
    fn eq_reset_zeroes_all_state() {
        let mut eq = EqFilter::new(95, 190, signal::HRES as i32, 65536, 8192, 9175);
        for s in 0..32 {
            eq.filter(s * 7 - 100);
        }
        eq.reset(ResetKind::Hard);
        assert_eq!(eq.fl, [0; 4]);
        assert_eq!(eq.fh, [0; 4]);
        assert_eq!(eq.h, [0; HISTLEN]);
        // and behaves like a fresh filter afterwards
        let mut fresh = EqFilter::new(95, 190, signal::HRES as i32, 65536, 8192, 9175);
        for s in [9, -4, 33] {
            assert_eq!(eq.filter(s), fresh.filter(s));
        }
    }
}
