//! Scalar helpers shared by the resampler and the coordinate mapping.

/// Multiplies a pixel coordinate by a scale factor and truncates toward zero.
///
/// This is the single rounding policy used when mapping pyramid-local
/// coordinates back to the base image.
pub(crate) fn scale_trunc(value: usize, scale: f64) -> usize {
    let scaled = value as f64 * scale;
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    scaled.trunc() as usize
}

/// Converts a float sample back to `u8` with round-to-nearest and clamping.
pub(crate) fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
