//! Error handling.

use snafu::Snafu;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Snafu, Debug)]
#[must_use]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("invalid output dimensions {width}x{height}"))]
    InvalidOutputSize { width: usize, height: usize },
    #[snafu(display("output buffer too small (need {need} bytes, got {got})"))]
    OutputBufferTooSmall { need: usize, got: usize },
    #[snafu(display("unknown pixel format tag {tag}"))]
    UnknownFormatTag { tag: u32 },
}
