use std::collections::VecDeque;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::analysis::spectrum::SpectrumAnalyzer;

/// Capacity of the audio→tap ring, in waveform windows.
const TAP_RING_WINDOWS: usize = 16;

/// In-band marker for "samples were dropped here". Real samples never carry
/// NaN because the writer replaces it with silence.
const GAP: f32 = f32::NAN;

/// Audio-thread end of the analyser: copies every mixed block into a ring.
///
/// Never blocks. A block that does not fit in the free space is dropped
/// whole, and the next block that does fit is preceded by a `GAP` marker so
/// the reader restarts its window instead of joining audio from both sides
/// of the hole.
pub struct TapWriter {
    tx: Producer<f32>,
    capacity: usize,
    gap: bool,
}

impl TapWriter {
    pub fn push_block(&mut self, block: &[f32]) {
        // Oversized blocks keep their newest samples.
        let room = self.capacity - usize::from(self.gap);
        let block = &block[block.len().saturating_sub(room)..];
        if self.tx.slots() < block.len() + usize::from(self.gap) {
            self.gap = true;
            return;
        }

        if self.gap {
            // Room was checked above.
            let _ = self.tx.push(GAP);
            self.gap = false;
        }
        for &sample in block {
            let sample = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
            let _ = self.tx.push(sample);
        }
    }
}

/// Read side of the two analyser points on the mix bus.
///
/// `refresh` pulls whatever the audio thread produced since the last call;
/// `waveform` and `spectrum` return the latest snapshots without touching
/// the audio graph.
pub struct AnalyserTap {
    rx: Consumer<f32>,
    window: VecDeque<f32>,
    waveform: Vec<f32>,
    waveform_len: usize,
    spectrum: SpectrumAnalyzer,
    spectrum_ready: bool,
}

/// Create a connected writer/tap pair.
pub fn analyser(waveform_len: usize, spectrum_bins: usize, smoothing: f32) -> (TapWriter, AnalyserTap) {
    let waveform_len = waveform_len.max(1);
    let capacity = waveform_len * TAP_RING_WINDOWS;
    let (tx, rx) = RingBuffer::<f32>::new(capacity);
    let tap = AnalyserTap {
        rx,
        window: VecDeque::with_capacity(waveform_len),
        waveform: Vec::with_capacity(waveform_len),
        waveform_len,
        spectrum: SpectrumAnalyzer::new(spectrum_bins, smoothing),
        spectrum_ready: false,
    };
    let writer = TapWriter {
        tx,
        capacity,
        gap: false,
    };
    (writer, tap)
}

impl AnalyserTap {
    /// Drain new samples and recompute the snapshots. Returns how many
    /// samples arrived.
    ///
    /// After the writer dropped audio, the window starts over from the
    /// first sample past the gap, so `waveform` is `None` until a whole
    /// contiguous window has arrived again.
    pub fn refresh(&mut self) -> usize {
        let mut received = 0;
        let mut restarted = false;
        while let Ok(sample) = self.rx.pop() {
            if sample.is_nan() {
                self.window.clear();
                restarted = true;
                continue;
            }
            if self.window.len() == self.waveform_len {
                self.window.pop_front();
            }
            self.window.push_back(sample);
            received += 1;
        }

        if received > 0 || restarted {
            self.waveform.clear();
            self.waveform.extend(self.window.iter().copied());
            if self.waveform.len() >= self.spectrum.fft_size() {
                self.spectrum.update(&self.waveform);
                self.spectrum_ready = true;
            }
        }
        received
    }

    /// Latest full window of mixed output, each sample in [-1, 1].
    ///
    /// `None` until a whole window has arrived.
    pub fn waveform(&self) -> Option<&[f32]> {
        (self.waveform.len() == self.waveform_len).then_some(self.waveform.as_slice())
    }

    /// Latest magnitude spectrum in decibels, `None` until first computed.
    pub fn spectrum(&self) -> Option<&[f32]> {
        self.spectrum_ready.then(|| self.spectrum.decibels())
    }

    pub fn waveform_len(&self) -> usize {
        self.waveform_len
    }

    pub fn spectrum_bins(&self) -> usize {
        self.spectrum.bins()
    }
}
