pub(crate) mod convert;
pub(crate) mod dither;
pub(crate) mod surface;
