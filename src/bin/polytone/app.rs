//! Audio stream, input handling and the main loop

use std::{
    collections::HashMap,
    io::stdout,
    time::{Duration, Instant},
};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::supports_keyboard_enhancement,
};
use ratatui::DefaultTerminal;
use tracing::{debug, error, info, warn};

use polytone::{
    analysis::{analyser, AnalyserTap},
    config::Config,
    dsp::oscillator::Waveform,
    io::keymap::{KeyGate, NoteKeyMap},
    render::{FrameOutcome, RecordedSurface, RenderLoop},
    synth::{mix_bus, MixBus, ParamKind, VoiceEngine},
    MAX_BLOCK_SIZE,
};

use super::ui;

pub struct App {
    pub(crate) engine: VoiceEngine,
    pub(crate) tap: AnalyserTap,
    pub(crate) gate: KeyGate,
    pub(crate) render: RenderLoop,
    pub(crate) waveform: RecordedSurface,
    pub(crate) spectrum: RecordedSurface,
    pub(crate) selected: ParamKind,
    pub(crate) sample_rate: f32,
    /// Whether the terminal reports key releases.
    pub(crate) key_releases: bool,
    fallback_gate: Duration,
    /// Auto-release deadlines for keys when releases are not reported.
    gate_deadlines: HashMap<char, Instant>,
    should_quit: bool,
    stream: Option<cpal::Stream>,
}

impl App {
    pub fn new(config: Config) -> EyreResult<Self> {
        let analyser_cfg = &config.analyser;
        let (writer, tap) = analyser(
            analyser_cfg.waveform_len,
            analyser_cfg.spectrum_bins,
            analyser_cfg.smoothing,
        );

        // Set up audio
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let stream_config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;
        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = stream_config.channels() as usize;
        info!(sample_rate, channels, "audio device ready");

        let (bus, handle) = mix_bus(sample_rate, writer);
        let stream = build_stream(&device, &stream_config.into(), bus, channels)?;
        stream.play().wrap_err("failed to start output stream")?;

        let engine = VoiceEngine::new(handle, config.template)
            .with_disposal_guard(config.voice.disposal_guard());
        let keymap = NoteKeyMap::new(config.keyboard.layout, config.keyboard.base_octave);

        Ok(Self {
            engine,
            tap,
            gate: KeyGate::new(keymap),
            render: RenderLoop::new(config.render.frame_interval()),
            waveform: RecordedSurface::new(config.render.width, config.render.height),
            spectrum: RecordedSurface::new(config.render.width, config.render.height),
            selected: ParamKind::Volume,
            sample_rate,
            key_releases: false,
            fallback_gate: config.voice.fallback_gate(),
            gate_deadlines: HashMap::new(),
            should_quit: false,
            stream: Some(stream),
        })
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        self.key_releases = supports_keyboard_enhancement().unwrap_or(false);
        if self.key_releases {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            info!(gate_ms = self.fallback_gate.as_millis() as u64, "key releases unavailable, using timed gate");
        }

        self.render.start(Instant::now());
        let result = self.event_loop(terminal);

        if self.key_releases {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            let now = Instant::now();
            self.expire_gates(now);
            self.engine.poll(now);
            self.tap.refresh();

            let outcome = self.render.poll(
                now,
                Some(&self.tap),
                Some(&mut self.waveform),
                Some(&mut self.spectrum),
            );
            if let FrameOutcome::Frame { .. } = outcome {
                terminal.draw(|frame| ui::draw(frame, self))?;
            }

            if event::poll(self.poll_timeout(Instant::now()))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key, Instant::now());
                }
            }
        }
        Ok(())
    }

    /// Sleep until the next frame or timer, whichever comes first.
    fn poll_timeout(&self, now: Instant) -> Duration {
        [
            self.render.next_due(),
            self.engine.next_deadline(),
            self.gate_deadlines.values().min().copied(),
        ]
        .into_iter()
        .flatten()
        .min()
        .map_or(self.render.interval(), |due| due.saturating_duration_since(now))
        .min(self.render.interval())
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind == KeyEventKind::Release {
            if let KeyCode::Char(c) = key.code {
                self.key_up(c, now);
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Tab => self.selected = self.selected.next(),
            KeyCode::BackTab => self.selected = self.selected.prev(),
            KeyCode::Left => self.nudge(-1),
            KeyCode::Right => self.nudge(1),
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                let waveform = Waveform::ALL[index];
                self.engine.set_waveform(waveform);
                debug!(waveform = waveform.label(), "waveform selected");
            }
            KeyCode::Char(c) => self.key_down(c, now),
            _ => {}
        }
    }

    fn key_down(&mut self, key: char, now: Instant) {
        let key = key.to_ascii_lowercase();
        if let Some(note) = self.gate.press(key) {
            self.engine.note_on(note, now);
        }
        // Without release events, every press or repeat keeps the note alive.
        if !self.key_releases && self.gate.is_held(key) {
            self.gate_deadlines.insert(key, now + self.fallback_gate);
        }
    }

    fn key_up(&mut self, key: char, now: Instant) {
        let key = key.to_ascii_lowercase();
        self.gate_deadlines.remove(&key);
        if let Some(note) = self.gate.release(key) {
            self.engine.note_off(note, now);
        }
    }

    fn expire_gates(&mut self, now: Instant) {
        let expired: Vec<char> = self
            .gate_deadlines
            .iter()
            .filter(|&(_, &due)| due <= now)
            .map(|(&key, _)| key)
            .collect();
        for key in expired {
            self.key_up(key, now);
        }
    }

    fn nudge(&mut self, steps: i32) {
        let mut template = *self.engine.template();
        template.nudge(self.selected, steps);
        debug!(param = self.selected.label(), value = template.get(self.selected), "template changed");
        self.engine.set_template(template);
    }

    pub fn selected_value(&self) -> f32 {
        self.engine.template().get(self.selected)
    }

    /// Stop drawing, silence every voice, then close the audio stream.
    pub fn teardown(&mut self) {
        self.render.stop();
        let now = Instant::now();
        for note in self.gate.release_all() {
            self.engine.note_off(note, now);
        }
        self.gate_deadlines.clear();
        let disposed = self.engine.shutdown();
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                warn!(%err, "failed to pause output stream");
            }
            drop(stream);
        }
        info!(disposed, "shut down");
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut bus: MixBus,
    channels: usize,
) -> EyreResult<cpal::Stream> {
    let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let block = &mut mono[..frames_to_render];
                    bus.render_block(block);

                    // Copy to output (mono to all channels)
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        let s = s.clamp(-1.0, 1.0);
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }
                    frames_written += frames_to_render;
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    Ok(stream)
}
