//! NTSC signal layout.
//!
//! Everything here derives from the nanosecond timeline of one broadcast
//! line and the chroma carrier configuration; no sample position is
//! hard-coded. See: <https://www.ntsc-tv.com/ntsc-index-02.htm>

/// Chroma pattern: 1 = 227.5 cycles/line (checkered artifact pattern, burst
/// phase inverts on alternate fields), 0 = 228 cycles/line (vertical).
pub const CHROMA_PATTERN: u32 = 1;

/// Samples per chroma period (4 or 5). Four puts the subcarrier at exactly a
/// quarter of the sample rate, which the quadrature demultiplexer relies on.
pub const CC_SAMPLES: usize = 4;

/// Chroma clocks per line, times ten.
pub const CC_LINE: i32 = if CHROMA_PATTERN == 1 { 2275 } else { 2280 };

/// Vertical period, in lines, over which the chroma artifacts repeat.
pub const CC_VPER: usize = if CHROMA_PATTERN == 1 { 2 } else { 1 };

/// Horizontal resolution of the sampled line. The grid is chosen so every
/// multiple of the chroma period lands on an integer sample.
pub const HRES: usize = CC_LINE as usize * CC_SAMPLES / 10;
/// Vertical resolution in lines.
pub const VRES: usize = 262;
/// Total samples in one field of signal.
pub const INPUT_SIZE: usize = HRES * VRES;

/// First line carrying picture.
pub const TOP: usize = 21;
/// Final line carrying picture.
pub const BOT: usize = 261;
/// Number of active picture lines.
pub const LINES: usize = BOT - TOP;

/// Search window around the previous sync position, in samples/lines.
pub const HSYNC_WINDOW: i32 = 8;
pub const VSYNC_WINDOW: i32 = 8;
/// Integration thresholds, as multiples of [`SYNC_LEVEL`]. The vertical
/// threshold is much higher because the vsync pulse is much longer.
pub const HSYNC_THRESH: i32 = 4;
pub const VSYNC_THRESH: i32 = 94;

/* one scanline, in nanoseconds */
pub const FP_NS: i32 = 1500; /* front porch */
pub const SYNC_NS: i32 = 4700; /* sync tip */
pub const BW_NS: i32 = 600; /* breezeway */
pub const CB_NS: i32 = 2500; /* color burst */
pub const BP_NS: i32 = 1600; /* back porch */
pub const AV_NS: i32 = 52600; /* active video */
/// Horizontal blanking period.
pub const HB_NS: i32 = FP_NS + SYNC_NS + BW_NS + CB_NS + BP_NS;
/// Exact line duration.
pub const LINE_NS: i32 = HB_NS + AV_NS;

/// Map a nanosecond offset into the line to its sample position.
#[must_use]
pub const fn ns_to_pos(ns: i32) -> i32 {
    ns * HRES as i32 / LINE_NS
}

pub const FP_BEG: i32 = ns_to_pos(0);
pub const SYNC_BEG: i32 = ns_to_pos(FP_NS);
pub const BW_BEG: i32 = ns_to_pos(FP_NS + SYNC_NS);
pub const CB_BEG: i32 = ns_to_pos(FP_NS + SYNC_NS + BW_NS);
pub const BP_BEG: i32 = ns_to_pos(FP_NS + SYNC_NS + BW_NS + CB_NS);
pub const AV_BEG: i32 = ns_to_pos(HB_NS);
pub const AV_LEN: i32 = ns_to_pos(AV_NS);

/// Burst cycles written per line; receivers expect somewhere between 7 and 12.
pub const CB_CYCLES: i32 = 10;

/* IRE units */
pub const WHITE_LEVEL: i32 = 100;
pub const BURST_LEVEL: i32 = 20;
pub const BLACK_LEVEL: i32 = 7;
pub const BLANK_LEVEL: i32 = 0;
pub const SYNC_LEVEL: i32 = -40;

/* frequencies, in Hz / 10, of the NTSC bands within one line */
pub const L_FREQ: i32 = 1_431_818; /* full line */
pub const Y_FREQ: i32 = 420_000; /* luma, 4.2 MHz */
pub const I_FREQ: i32 = 150_000; /* chroma I, 1.5 MHz */
pub const Q_FREQ: i32 = 55_000; /* chroma Q, 0.55 MHz */

/// Kilohertz to an equivalent frequency in line samples.
#[must_use]
pub const fn khz_to_line(khz: i32) -> i32 {
    HRES as i32 * (khz * 100) / L_FREQ
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_timeline_is_exact() {
        assert_eq!(LINE_NS, 63_500);
        assert_eq!(
            LINE_NS,
            FP_NS + SYNC_NS + BW_NS + CB_NS + BP_NS + AV_NS,
            "pulse durations must cover the whole line"
        );
    }

    #[test]
    fn derived_positions() {
        // the canonical 4-samples-per-chroma NTSC grid
        assert_eq!(HRES, 910);
        assert_eq!(INPUT_SIZE, 910 * 262);
        assert_eq!(SYNC_BEG, 21);
        assert_eq!(BW_BEG, 88);
        assert_eq!(CB_BEG, 97);
        assert_eq!(BP_BEG, 133);
        assert_eq!(AV_BEG, 156);
        assert_eq!(AV_LEN, 753);
    }

    #[test]
    fn pulses_ordered_and_in_bounds() {
        assert!(FP_BEG < SYNC_BEG);
        assert!(SYNC_BEG < BW_BEG);
        assert!(BW_BEG < CB_BEG);
        assert!(CB_BEG < BP_BEG);
        assert!(BP_BEG < AV_BEG);
        assert!(AV_BEG + AV_LEN <= HRES as i32);
        // the burst write runs past the nominal burst window but must stay
        // inside horizontal blanking
        assert!(CB_BEG + CB_CYCLES * CC_SAMPLES as i32 <= AV_BEG);
    }

    #[test]
    fn chroma_grid_alignment() {
        // every chroma period must land on an integer sample
        assert_eq!(CC_LINE as usize * CC_SAMPLES % 10, 0);
        assert_eq!(khz_to_line(1500), 95);
        assert_eq!(khz_to_line(3000), 190);
    }
}
