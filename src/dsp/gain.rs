/// Convert a decibel level to a linear amplitude factor.
///
/// 0 dB is unity, -6 dB roughly halves the amplitude, -60 dB is 0.001.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
