#![doc = include_str!("../README.md")]

pub mod common;
pub mod crt;
mod demodulate;
pub mod error;
pub mod filter;
pub mod format;
pub mod math;
pub mod modulate;
pub mod signal;

pub use crate::{
    crt::{Crt, Toggles},
    error::{Error, Result},
    format::PixelFormat,
    modulate::NtscSettings,
};

pub mod prelude {
    //! Re-exports of everything needed to drive the pipeline.

    pub use crate::{
        common::{Reset, ResetKind},
        crt::{Crt, SignalBuffer, Toggles},
        error::{Error, Result},
        filter::{EqFilter, IirLp},
        format::PixelFormat,
        math::sincos14,
        modulate::NtscSettings,
    };
}
