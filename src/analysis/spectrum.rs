use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/*
Spectrum Analysis
=================

Magnitude spectrum of the most recent `2 · bins` samples, one value per
linear frequency bin from DC up to (just under) Nyquist:

    bin k  ≈  k · sample_rate / (2 · bins)  Hz

Per refresh:

  1. Blackman window over the input (less leakage than Hann, so a pure tone
     shows as a narrow peak instead of a smeared hill).
  2. Forward FFT, keep the first `bins` outputs.
  3. Normalize: |X[k]| / fft_size.
  4. Smooth over time: s = τ · s_prev + (1 - τ) · |X[k]|, with τ ≈ 0.8.
     Smoothing the linear magnitude (not the decibels) keeps decays natural.
  5. Convert to decibels, 20 · log10(s), floored at MIN_DECIBELS.

A full-scale sine lands near -14 dB after windowing and normalization,
and digital silence sits at the floor, so values are typically in
[-200, 0] and mostly negative.
*/

pub const MIN_DECIBELS: f32 = -200.0;

pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    decibels: Vec<f32>,
    smoothing: f32,
}

impl SpectrumAnalyzer {
    /// `bins` output values, computed from `2 · bins` input samples.
    pub fn new(bins: usize, smoothing: f32) -> Self {
        let fft_size = bins.max(1) * 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                let x = std::f32::consts::TAU * i as f32 / fft_size as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; bins.max(1)],
            decibels: vec![MIN_DECIBELS; bins.max(1)],
            smoothing: smoothing.clamp(0.0, 0.999),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    pub fn bins(&self) -> usize {
        self.decibels.len()
    }

    /// Analyse the last `fft_size` samples of `samples`.
    ///
    /// Shorter inputs are ignored and leave the previous result in place.
    pub fn update(&mut self, samples: &[f32]) {
        let size = self.fft_size();
        if samples.len() < size {
            return;
        }
        let recent = &samples[samples.len() - size..];

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(recent).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.smoothing;
        let norm = 1.0 / size as f32;
        for ((smoothed, db), bin) in self
            .smoothed
            .iter_mut()
            .zip(self.decibels.iter_mut())
            .zip(&self.scratch)
        {
            let magnitude = bin.norm() * norm;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *db = if *smoothed > 0.0 {
                (20.0 * smoothed.log10()).max(MIN_DECIBELS)
            } else {
                MIN_DECIBELS
            };
        }
    }

    pub fn decibels(&self) -> &[f32] {
        &self.decibels
    }
}
