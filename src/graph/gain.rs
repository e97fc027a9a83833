use crate::dsp::gain::db_to_gain;

/// Per-voice volume stage, fixed at the decibel level the voice was built with.
pub struct GainNode {
    db: f32,
    gain: f32,
}

impl GainNode {
    pub fn from_db(db: f32) -> Self {
        Self {
            db,
            gain: db_to_gain(db),
        }
    }

    pub fn db(&self) -> f32 {
        self.db
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Scale `buffer` in place.
    pub fn process(&self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }
}
