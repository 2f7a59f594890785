//! CRT receiver state.
//!
//! A [`Crt`] owns everything that persists between fields: the analog
//! signal surface, the noisy input copy, recovered sync positions, the
//! color carrier filter, the noise generator, and the monitor controls.
//! Distinct instances are fully independent.

use crate::{
    common::{Reset, ResetKind},
    error::{InvalidOutputSizeSnafu, Result},
    filter::EqFilter,
    format::PixelFormat,
    signal::{self, CC_SAMPLES, CC_VPER, INPUT_SIZE},
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use tracing::debug;

/// One field worth of signed 8-bit IRE samples.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
#[must_use]
pub struct SignalBuffer(Vec<i8>);

impl core::fmt::Debug for SignalBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SignalBuffer({} samples)", self.0.len())
    }
}

impl Default for SignalBuffer {
    fn default() -> Self {
        Self(vec![0x00; INPUT_SIZE])
    }
}

impl core::ops::Deref for SignalBuffer {
    type Target = [i8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for SignalBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

bitflags! {
    /// Emulation toggles.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    #[must_use]
    pub struct Toggles: u8 {
        /// Leave a dark gap at the bottom of each output band.
        const SCANLINES = 1 << 0;
        /// Average each decoded frame with the previous one.
        const BLEND = 1 << 1;
        /// Model beam energy widening bright lines.
        const BLOOM = 1 << 2;
        /// Track horizontal sync instead of assuming a centered signal.
        const HSYNC_SEARCH = 1 << 3;
        /// Track vertical sync instead of assuming a centered signal.
        const VSYNC_SEARCH = 1 << 4;
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Self::HSYNC_SEARCH | Self::VSYNC_SEARCH
    }
}

impl Serialize for Toggles {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Toggles {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}

/// NTSC CRT receiver.
///
/// The signal buffers are transient and rebuilt on deserialize; sync
/// positions, carrier filter state, the noise generator, and the monitor
/// controls are meaningful history and round-trip through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Crt {
    /// Composite signal, written by the modulator.
    #[serde(skip)]
    pub(crate) analog: SignalBuffer,
    /// Signal plus noise, as seen by the demodulator.
    #[serde(skip)]
    pub(crate) inp: SignalBuffer,
    /// Color carrier filter state, one bucket per line of the chroma
    /// repeat period.
    pub(crate) ccf: [[i32; CC_SAMPLES]; CC_VPER],
    /// Recovered sync positions, smoothed across fields.
    pub(crate) hsync: i32,
    pub(crate) vsync: i32,
    /// Noise generator state.
    pub(crate) rn: u32,

    /* monitor controls */
    pub hue: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub black_point: i32,
    pub white_point: i32,
    pub toggles: Toggles,

    /* output raster */
    pub(crate) outw: usize,
    pub(crate) outh: usize,
    pub(crate) out_format: PixelFormat,
    #[serde(skip)]
    pub(crate) out: Vec<u8>,

    /* demodulation equalizers */
    pub(crate) eq_y: EqFilter,
    pub(crate) eq_i: EqFilter,
    pub(crate) eq_q: EqFilter,
}

impl Crt {
    const RN_SEED: u32 = 194;

    /// Create a receiver decoding into an owned `outw` x `outh` frame.
    pub fn try_new(outw: usize, outh: usize, out_format: PixelFormat) -> Result<Self> {
        ensure!(
            outw > 0 && outh > 0,
            InvalidOutputSizeSnafu {
                width: outw,
                height: outh
            }
        );
        let mut crt = Self {
            analog: SignalBuffer::default(),
            inp: SignalBuffer::default(),
            ccf: [[0; CC_SAMPLES]; CC_VPER],
            hsync: 0,
            vsync: 0,
            rn: Self::RN_SEED,
            hue: 0,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            black_point: 0,
            white_point: 0,
            toggles: Toggles::default(),
            outw,
            outh,
            out_format,
            out: vec![0x00; outw * outh * out_format.bpp()],
            eq_y: Self::luma_eq(),
            eq_i: Self::chroma_i_eq(),
            eq_q: Self::chroma_q_eq(),
        };
        crt.reset(ResetKind::Soft);
        debug!(outw, outh, format = out_format.as_ref(), "crt initialized");
        Ok(crt)
    }

    /// Luma equalizer; the mid/high gains pull the chroma subcarrier out of
    /// the luma band.
    const fn luma_eq() -> EqFilter {
        EqFilter::new(
            signal::khz_to_line(1500),
            signal::khz_to_line(3000),
            signal::HRES as i32,
            65536,
            8192,
            9175,
        )
    }

    const fn chroma_i_eq() -> EqFilter {
        EqFilter::new(
            signal::khz_to_line(80),
            signal::khz_to_line(1150),
            signal::HRES as i32,
            65536,
            65536,
            1311,
        )
    }

    const fn chroma_q_eq() -> EqFilter {
        EqFilter::new(
            signal::khz_to_line(80),
            signal::khz_to_line(1000),
            signal::HRES as i32,
            65536,
            65536,
            0,
        )
    }

    /// Change the output raster without losing signal history; decoding
    /// continues to converge across the resize.
    pub fn resize(&mut self, outw: usize, outh: usize, out_format: PixelFormat) -> Result<()> {
        ensure!(
            outw > 0 && outh > 0,
            InvalidOutputSizeSnafu {
                width: outw,
                height: outh
            }
        );
        self.outw = outw;
        self.outh = outh;
        self.out_format = out_format;
        self.out = vec![0x00; outw * outh * out_format.bpp()];
        debug!(outw, outh, format = out_format.as_ref(), "crt resized");
        Ok(())
    }

    /// The decoded frame, `outw * outh` pixels in the output format.
    #[must_use]
    pub fn frame(&self) -> &[u8] {
        &self.out
    }

    /// Mutable access to the decoded frame, e.g. to clear it or to hand the
    /// previous frame to the blend stage.
    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.out
    }

    /// The raw composite signal as last written by the modulator.
    #[must_use]
    pub fn analog(&self) -> &[i8] {
        &self.analog
    }

    #[must_use]
    pub const fn output_width(&self) -> usize {
        self.outw
    }

    #[must_use]
    pub const fn output_height(&self) -> usize {
        self.outh
    }

    pub const fn output_format(&self) -> PixelFormat {
        self.out_format
    }

    #[must_use]
    pub const fn hsync(&self) -> i32 {
        self.hsync
    }

    #[must_use]
    pub const fn vsync(&self) -> i32 {
        self.vsync
    }

    /// Color carrier filter state, for inspection.
    #[must_use]
    pub const fn carrier_filter(&self) -> &[[i32; CC_SAMPLES]; CC_VPER] {
        &self.ccf
    }

    /// Rebuild transient buffers after deserialize or resize; the hot paths
    /// call this before touching them.
    pub(crate) fn rehydrate(&mut self) {
        if self.analog.len() != INPUT_SIZE {
            self.analog = SignalBuffer::default();
        }
        if self.inp.len() != INPUT_SIZE {
            self.inp = SignalBuffer::default();
        }
        let need = self.outw * self.outh * self.out_format.bpp();
        if self.out.len() != need {
            self.out = vec![0x00; need];
        }
    }
}

impl Reset for Crt {
    fn reset(&mut self, kind: ResetKind) {
        self.hue = 0;
        self.saturation = 10;
        self.brightness = 0;
        self.contrast = 180;
        self.black_point = 0;
        self.white_point = 100;
        self.hsync = 0;
        self.vsync = 0;
        if kind == ResetKind::Hard {
            self.analog.fill(0);
            self.inp.fill(0);
            self.out.fill(0);
            self.ccf = [[0; CC_SAMPLES]; CC_VPER];
            self.rn = Self::RN_SEED;
            self.toggles = Toggles::default();
            self.eq_y = Self::luma_eq();
            self.eq_i = Self::chroma_i_eq();
            self.eq_q = Self::chroma_q_eq();
        }
    }
}
