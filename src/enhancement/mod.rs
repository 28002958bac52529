pub(crate) mod cmdbuffer;
pub(crate) mod coeffs;
pub(crate) mod generate;
pub(crate) mod transform;
pub(crate) mod transform_unit;
