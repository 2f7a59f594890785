//! Composite signal generation.
//!
//! Lays one field of the source image out across the analog buffer with
//! broadcast-accurate blanking: equalizing pulses, vertical sync serrations,
//! front porch, sync tip, breezeway, color burst, back porch, then active
//! video with the chroma axes remodulated onto the subcarrier.

use crate::{
    common::{Reset, ResetKind},
    crt::Crt,
    filter::IirLp,
    format::PixelFormat,
    math::sincos14,
    signal::{
        AV_BEG, AV_LEN, BLACK_LEVEL, BLANK_LEVEL, BURST_LEVEL, BW_BEG, CB_BEG, CB_CYCLES,
        CC_SAMPLES, CC_VPER, CHROMA_PATTERN, HRES, I_FREQ, LINES, L_FREQ, Q_FREQ, SYNC_BEG,
        SYNC_LEVEL, TOP, VRES, WHITE_LEVEL, Y_FREQ,
    },
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Modulator settings and per-stream state.
///
/// The band-limiting filters live here so that independent streams do not
/// share state; they are derived on the first call. Start from
/// [`NtscSettings::default`] and keep the same instance across fields.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct NtscSettings {
    /// Source pixel layout.
    pub format: PixelFormat,
    /// Source width in pixels.
    pub w: usize,
    /// Source height in pixels.
    pub h: usize,
    /// Map source pixels 1:1 onto signal samples instead of scaling to the
    /// standard picture rectangle.
    pub raw: bool,
    /// Write the color burst and chroma; otherwise the signal is monochrome.
    pub as_color: bool,
    /// Field (half-frame) parity, 0 or 1.
    pub field: u32,
    /// Frame parity; advances once every two fields.
    pub frame: u32,
    /// Hue offset in degrees.
    pub hue: i32,
    /// Picture shift within the active area, in samples/lines.
    pub xoffset: i32,
    pub yoffset: i32,
    /// Set exactly once, on the first modulate with this instance.
    pub iirs_initialized: bool,
    pub iir_y: IirLp,
    pub iir_i: IirLp,
    pub iir_q: IirLp,
}

impl NtscSettings {
    /// Step to the next field, carrying the frame parity with it.
    pub fn advance_field(&mut self) {
        self.field = (self.field + 1) & 1;
        if self.field == 0 {
            self.frame = (self.frame + 1) & 1;
        }
    }
}

impl Crt {
    /// Modulate one field of `data` into the analog buffer.
    ///
    /// `data` must hold `w * h` tightly packed pixels in the settings'
    /// format; a short buffer leaves the signal untouched.
    pub fn modulate(&mut self, data: &[u8], s: &mut NtscSettings) {
        #[cfg(feature = "profiling")]
        puffin::profile_function!();

        self.rehydrate();

        let bpp = s.format.bpp();
        if s.w == 0 || s.h == 0 || data.len() < s.w * s.h * bpp {
            debug!(
                need = s.w * s.h * bpp,
                got = data.len(),
                "short source buffer, not modulating"
            );
            return;
        }

        if !s.iirs_initialized {
            s.iir_y = IirLp::new(L_FREQ, Y_FREQ);
            s.iir_i = IirLp::new(L_FREQ, I_FREQ);
            s.iir_q = IirLp::new(L_FREQ, Q_FREQ);
            s.iirs_initialized = true;
        }

        let (destw, desth) = if s.raw {
            ((s.w as i32).min(AV_LEN), (s.h as i32).min(LINES as i32))
        } else {
            ((AV_LEN * 55500) >> 16, ((LINES as i32) * 63500) >> 16)
        };

        let mut ccburst = [0i32; CC_SAMPLES];
        let mut ccmod_i = [0i32; CC_SAMPLES];
        let mut ccmod_q = [0i32; CC_SAMPLES];
        if s.as_color {
            for (x, ((burst, mi), mq)) in ccburst
                .iter_mut()
                .zip(&mut ccmod_i)
                .zip(&mut ccmod_q)
                .enumerate()
            {
                let n = s.hue + x as i32 * (360 / CC_SAMPLES as i32);
                let (sn, _) = sincos14((n + 33) * 8192 / 180);
                *burst = sn >> 10;
                let (sn, _) = sincos14(n * 8192 / 180);
                *mi = sn >> 10;
                let (sn, _) = sincos14((n - 90) * 8192 / 180);
                *mq = sn >> 10;
            }
        }

        s.field &= 1;
        s.frame &= 1;
        let inv_phase = s.field == s.frame;
        // the 227.5-cycle pattern flips burst phase on alternate fields
        let ph = if inv_phase && CHROMA_PATTERN == 1 {
            -1
        } else {
            1
        };

        let hres = HRES as i32;
        let mut xo = (AV_BEG + s.xoffset + (AV_LEN - destw) / 2).clamp(0, hres - destw);
        let yo = (TOP as i32 + s.yoffset + (LINES as i32 - desth) / 2)
            .clamp(0, VRES as i32 - desth);
        // keep chroma phase aligned with the sample grid
        xo -= xo % CC_SAMPLES as i32;

        let mut iccf = [0i32; CC_SAMPLES];
        for n in 0..VRES {
            let line = &mut self.analog[n * HRES..(n + 1) * HRES];
            let mut t = 0usize;

            if n <= 3 || (7..=9).contains(&n) {
                // equalizing pulses: short blips of sync, mostly blank
                while t < 4 * HRES / 100 {
                    line[t] = SYNC_LEVEL as i8;
                    t += 1;
                }
                while t < 50 * HRES / 100 {
                    line[t] = BLANK_LEVEL as i8;
                    t += 1;
                }
                while t < 54 * HRES / 100 {
                    line[t] = SYNC_LEVEL as i8;
                    t += 1;
                }
                while t < HRES {
                    line[t] = BLANK_LEVEL as i8;
                    t += 1;
                }
            } else if (4..=6).contains(&n) {
                // vertical sync: short blips of blank, mostly sync; the blip
                // positions encode the field parity
                let offs: [usize; 4] = if s.field == 1 {
                    [4, 50, 96, 100]
                } else {
                    [46, 50, 96, 100]
                };
                while t < offs[0] * HRES / 100 {
                    line[t] = SYNC_LEVEL as i8;
                    t += 1;
                }
                while t < offs[1] * HRES / 100 {
                    line[t] = BLANK_LEVEL as i8;
                    t += 1;
                }
                while t < offs[2] * HRES / 100 {
                    line[t] = SYNC_LEVEL as i8;
                    t += 1;
                }
                while t < offs[3] * HRES / 100 {
                    line[t] = BLANK_LEVEL as i8;
                    t += 1;
                }
            } else {
                // video line
                while t < SYNC_BEG as usize {
                    line[t] = BLANK_LEVEL as i8; // front porch
                    t += 1;
                }
                while t < BW_BEG as usize {
                    line[t] = SYNC_LEVEL as i8; // sync tip
                    t += 1;
                }
                while t < AV_BEG as usize {
                    line[t] = BLANK_LEVEL as i8; // breezeway, burst, back porch
                    t += 1;
                }
                if n < TOP {
                    while t < HRES {
                        line[t] = BLANK_LEVEL as i8;
                        t += 1;
                    }
                }
                if s.as_color {
                    // CB_CYCLES of color burst at the subcarrier frequency
                    let inv = if inv_phase { CC_SAMPLES / 2 } else { 0 };
                    for t in CB_BEG as usize..(CB_BEG + CB_CYCLES * CC_SAMPLES as i32) as usize {
                        let cb = ccburst[(t + inv) % CC_SAMPLES];
                        line[t] = ((BLANK_LEVEL + cb * BURST_LEVEL) >> 5) as i8;
                        iccf[t % CC_SAMPLES] = i32::from(line[t]);
                    }
                }
            }
        }

        let sw = s.w as i32;
        let sh = s.h as i32;
        let (ro, go, bo) = s.format.offsets();
        let gain = WHITE_LEVEL * self.white_point / 100;
        let base_ire = BLACK_LEVEL + self.black_point;

        for y in 0..desth {
            let field_offset = (s.field as i32 * sh + desth) / desth / 2;
            let sy = ((y * sh) / desth + field_offset).min(sh - 1);
            let row = sy * sw;

            s.iir_y.reset(ResetKind::Soft);
            s.iir_i.reset(ResetKind::Soft);
            s.iir_q.reset(ResetKind::Soft);

            for x in 0..destw {
                let pix = &data[(((x * sw) / destw + row) as usize * bpp)..][..bpp];
                let r_a = i32::from(pix[ro]);
                let g_a = i32::from(pix[go]);
                let b_a = i32::from(pix[bo]);

                /* RGB to YIQ */
                let fy = (19595 * r_a + 38470 * g_a + 7471 * b_a) >> 14;
                let fi = (39059 * r_a - 18022 * g_a - 21103 * b_a) >> 14;
                let fq = (13894 * r_a - 34275 * g_a + 20382 * b_a) >> 14;

                /* bandlimit Y, I, Q and ride I/Q on the subcarrier */
                let xoff = ((x + xo) % CC_SAMPLES as i32) as usize;
                let fy = s.iir_y.filter(fy);
                let fi = s.iir_i.filter(fi) * ph * ccmod_i[xoff] >> 4;
                let fq = s.iir_q.filter(fq) * ph * ccmod_q[xoff] >> 4;

                let ire = (base_ire + ((fy + fi + fq) * gain >> 10)).clamp(0, 110);
                self.analog[((x + xo) + (y + yo) * hres) as usize] = ire as i8;
            }
        }

        // seed the carrier filter near the phase the burst just established
        for (k, &v) in iccf.iter().enumerate() {
            for vper in 0..CC_VPER {
                self.ccf[vper][k] = v << 7;
            }
        }
    }
}
