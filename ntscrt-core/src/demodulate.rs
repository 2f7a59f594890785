//! Composite signal demodulation.
//!
//! Reads the analog buffer the way a receiver reads the wire: mix in noise,
//! find vertical and horizontal sync by integrating the signal, lock the
//! color carrier filter to the burst, split YIQ with the equalizers, and
//! resample each scan into the output raster.

use crate::{
    common::{Reset, ResetKind},
    crt::{Crt, Toggles},
    error::{OutputBufferTooSmallSnafu, Result},
    math::sincos14,
    signal::{
        AV_BEG, AV_LEN, BLACK_LEVEL, BOT, CB_BEG, CB_CYCLES, CC_SAMPLES, CC_VPER, HRES,
        HSYNC_THRESH, HSYNC_WINDOW, INPUT_SIZE, LINES, SYNC_BEG, SYNC_LEVEL, TOP, VRES,
        VSYNC_THRESH, VSYNC_WINDOW,
    },
};
use snafu::ensure;
use tracing::trace;

// the quadrature demultiplexer pairs taps two samples (180 degrees) apart
const _: () = assert!(
    CC_SAMPLES == 4,
    "chroma demodulation requires four samples per chroma period"
);

/// Demodulated samples of one scan, before resampling.
#[derive(Default, Copy, Clone)]
struct Yiq {
    y: i32,
    i: i32,
    q: i32,
}

const SCAN_SAMPLES: usize = AV_LEN as usize + 1;

impl Crt {
    /// Demodulate the analog buffer into the owned output frame.
    ///
    /// `noise` is the additive noise level; anything below zero is treated
    /// as a clean signal.
    pub fn demodulate(&mut self, noise: i32) {
        self.rehydrate();
        let mut out = core::mem::take(&mut self.out);
        self.demodulate_signal(noise, &mut out);
        self.out = out;
    }

    /// Demodulate into a caller-owned buffer in the configured output
    /// format, leaving the owned frame untouched.
    pub fn demodulate_into(&mut self, noise: i32, out: &mut [u8]) -> Result<()> {
        let need = self.outw * self.outh * self.out_format.bpp();
        ensure!(
            out.len() >= need,
            OutputBufferTooSmallSnafu {
                need,
                got: out.len()
            }
        );
        self.rehydrate();
        self.demodulate_signal(noise, out);
        Ok(())
    }

    fn demodulate_signal(&mut self, noise: i32, out: &mut [u8]) {
        #[cfg(feature = "profiling")]
        puffin::profile_function!();

        let noise = noise.max(0);
        let bpp = self.out_format.bpp();
        let (ro, go, bo) = self.out_format.offsets();
        let pitch = self.outw * bpp;
        let outw = self.outw as i32;
        let outh = self.outh as i32;

        let (huesn, huecs) = sincos14(((self.hue % 360) + 33) * 8192 / 180);
        let huesn = huesn >> 11;
        let huecs = huecs >> 11;

        /* signal + noise */
        let mut rn = self.rn;
        for (inp, &sig) in self.inp.iter_mut().zip(self.analog.iter()) {
            rn = rn.wrapping_mul(214_019).wrapping_add(140_327_895);
            let n = ((rn >> 16) & 0xff) as i32 - 0x7f;
            *inp = (i32::from(sig) + ((n * noise) >> 8)).clamp(-127, 127) as i8;
        }
        self.rn = rn;

        /* Vertical sync.
         *
         * Integrate the signal until the running sum dives below the
         * threshold; integration keeps single noise samples from faking a
         * pulse. The vertical threshold is large because the vsync pulse
         * holds sync for most of a line.
         */
        let mut field = 0usize;
        let mut vhit = None;
        'search: for i in -VSYNC_WINDOW..VSYNC_WINDOW {
            let line = (self.vsync + i).rem_euclid(VRES as i32) as usize;
            let sig = &self.inp[line * HRES..(line + 1) * HRES];
            let mut s = 0;
            for (j, &v) in sig.iter().enumerate() {
                s += i32::from(v);
                if s <= VSYNC_THRESH * SYNC_LEVEL {
                    vhit = Some((line, j));
                    break 'search;
                }
            }
        }
        if !self.toggles.contains(Toggles::VSYNC_SEARCH) {
            self.vsync = -3;
        } else if let Some((line, _)) = vhit {
            self.vsync = line as i32;
        }
        if let Some((_, j)) = vhit {
            // a pulse in the second half of the line means the odd field
            field = usize::from(j > HRES / 2);
        }
        trace!(vsync = self.vsync, field, "vertical sync");

        /* bloom energy model */
        let max_e = (128 + (noise / 2)) * AV_LEN;
        let mut prev_e = 16384 / 8;

        /* ratio of output height to active lines in the signal */
        let ratio = ((outh << 16) / LINES as i32 + 32768) >> 16;
        let field_offset = field as i32 * (ratio / 2);

        let bright = self.brightness - (BLACK_LEVEL + self.black_point);
        let mut scan = [Yiq::default(); SCAN_SAMPLES];

        for line in TOP..BOT {
            let li = line as i32;
            let beg = (li - TOP as i32) * outh / LINES as i32 + field_offset;
            let end = (((li - TOP as i32 + 1) * outh / LINES as i32 + field_offset).min(outh))
                as usize;
            if beg >= outh {
                continue;
            }
            let beg = beg as usize;

            /* horizontal sync, same integration idea as above */
            let ln = (li + self.vsync).rem_euclid(VRES as i32) as usize * HRES;
            if self.toggles.contains(Toggles::HSYNC_SEARCH) {
                let base = ln as i32 + self.hsync + SYNC_BEG;
                let mut s = 0;
                for i in -HSYNC_WINDOW..HSYNC_WINDOW {
                    s += i32::from(self.inp[(base + i) as usize % INPUT_SIZE]);
                    if s <= HSYNC_THRESH * SYNC_LEVEL {
                        self.hsync = (i + self.hsync).rem_euclid(HRES as i32);
                        break;
                    }
                }
            } else {
                self.hsync = 0;
            }

            let xpos = (AV_BEG + self.hsync - 3).rem_euclid(HRES as i32) as usize;
            let ypos = (li + self.vsync + 3).rem_euclid(VRES as i32) as usize;
            let pos = xpos + ypos * HRES;

            /* keep converging the carrier filter on the burst */
            let bucket = ypos % CC_VPER;
            let burst_base = ln + (self.hsync - self.hsync % CC_SAMPLES as i32) as usize;
            for i in CB_BEG as usize..(CB_BEG + CB_CYCLES * CC_SAMPLES as i32) as usize {
                let p = self.ccf[bucket][i % CC_SAMPLES] * 127 / 128; // most of the previous
                let n = i32::from(self.inp[(burst_base + i) % INPUT_SIZE]); // plus the new sample
                self.ccf[bucket][i % CC_SAMPLES] = p + n;
            }

            /* burst phase to quadrature DC, rotated by the monitor hue */
            let phasealign = (self.hsync % CC_SAMPLES as i32) as usize;
            let ccr = &self.ccf[bucket];
            let dci = ccr[(phasealign + 1) % CC_SAMPLES] - ccr[(phasealign + 3) % CC_SAMPLES];
            let dcq = ccr[(phasealign + 2) % CC_SAMPLES] - ccr[phasealign % CC_SAMPLES];

            let mut wave = [0i32; CC_SAMPLES];
            wave[0] = ((dci * huecs - dcq * huesn) >> 4) * self.saturation;
            wave[1] = ((dcq * huecs + dci * huesn) >> 4) * self.saturation;
            wave[2] = -wave[0];
            wave[3] = -wave[1];

            let scan_r = (AV_LEN - 1) << 12;
            let (dx, scan_l, l, r) = if self.toggles.contains(Toggles::BLOOM) {
                let mut s = 0;
                for i in 0..AV_LEN as usize {
                    s += i32::from(self.inp[(pos + i) % INPUT_SIZE]);
                }
                // bright scans sag the beam energy and narrow the line
                prev_e = prev_e * 123 / 128 + (((max_e >> 1) - s) << 10) / max_e;
                let line_w = AV_LEN * 112 / 128 + (prev_e >> 9);
                let scan_l = ((AV_LEN / 2) - (line_w >> 1) + 8) << 12;
                (
                    (line_w << 12) / outw,
                    scan_l,
                    (scan_l >> 12) as usize,
                    (scan_r >> 12) as usize,
                )
            } else {
                (((AV_LEN - 1) << 12) / outw, 0, 0, AV_LEN as usize)
            };

            self.eq_y.reset(ResetKind::Soft);
            self.eq_i.reset(ResetKind::Soft);
            self.eq_q.reset(ResetKind::Soft);

            for (i, yiq) in scan.iter_mut().enumerate().take(r).skip(l) {
                let sig = i32::from(self.inp[(pos + i) % INPUT_SIZE]);
                yiq.y = self.eq_y.filter(sig + bright) << 4;
                yiq.i = self.eq_i.filter(sig * wave[i % CC_SAMPLES] >> 9) >> 3;
                yiq.q = self.eq_q.filter(sig * wave[(i + 3) % CC_SAMPLES] >> 9) >> 3;
            }

            let row = &mut out[beg * pitch..(beg + 1) * pitch];
            let blend = self.toggles.contains(Toggles::BLEND);
            let mut off = 0usize;
            let mut sx = scan_l;
            while sx < scan_r && off + bpp <= pitch {
                let frac_r = sx & 0xfff;
                let frac_l = 0xfff - frac_r;
                let a = scan[(sx >> 12) as usize];
                let b = scan[(sx >> 12) as usize + 1];

                /* interpolate between samples */
                let y = ((a.y * frac_l) >> 2) + ((b.y * frac_r) >> 2);
                let i = ((a.i * frac_l) >> 14) + ((b.i * frac_r) >> 14);
                let q = ((a.q * frac_l) >> 14) + ((b.q * frac_r) >> 14);

                /* YIQ to RGB */
                let r8 = ((((y + 3879 * i + 2556 * q) >> 12) * self.contrast) >> 8).clamp(0, 255);
                let g8 = ((((y - 1126 * i - 2605 * q) >> 12) * self.contrast) >> 8).clamp(0, 255);
                let b8 = ((((y - 4530 * i + 7021 * q) >> 12) * self.contrast) >> 8).clamp(0, 255);

                let px = &mut row[off..off + bpp];
                if blend {
                    let new = (r8 << 16) | (g8 << 8) | b8;
                    let old =
                        (i32::from(px[ro]) << 16) | (i32::from(px[go]) << 8) | i32::from(px[bo]);
                    // halve both without letting channel low bits bleed over
                    let mix = ((new & 0xfe_feff) >> 1) + ((old & 0xfe_feff) >> 1);
                    px[ro] = (mix >> 16 & 0xff) as u8;
                    px[go] = (mix >> 8 & 0xff) as u8;
                    px[bo] = (mix & 0xff) as u8;
                } else {
                    px[ro] = r8 as u8;
                    px[go] = g8 as u8;
                    px[bo] = b8 as u8;
                }

                off += bpp;
                sx += dx;
            }

            /* duplicate the scan across its output band */
            let gap = usize::from(self.toggles.contains(Toggles::SCANLINES));
            let row_start = beg * pitch;
            for dup in beg + 1..end.saturating_sub(gap) {
                out.copy_within(row_start..row_start + pitch, dup * pitch);
            }
        }
    }
}
