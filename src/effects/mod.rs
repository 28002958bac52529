//! Post-upscale effects.

pub mod sharpen;
