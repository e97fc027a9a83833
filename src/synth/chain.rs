use crate::{
    graph::{
        envelope::EnvNode,
        gain::GainNode,
        lfo::LfoNode,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
    },
    io::note::NoteId,
    synth::{params::ParamTemplate, voice::VoiceId},
    MAX_BLOCK_SIZE,
};

/*
Signal Chain
============

One sounding note, wired as a fixed set of typed nodes:

    LfoNode ──(Hz per sample)──┐
                               ▼
                            OscNode ──→ EnvNode (×) ──→ GainNode ──→ mix bus

The modulation oscillator belongs to this chain alone and only ever drives
this chain's oscillator. All parameters are copied from a `ParamTemplate`
when the chain is built and stay fixed for its lifetime.

Scratch buffers are allocated up front so `render_block` never allocates.
Blocks longer than `MAX_BLOCK_SIZE` must be split by the caller.
*/

pub struct SignalChain {
    id: VoiceId,
    note: NoteId,
    ctx: RenderCtx,
    osc: OscNode,
    modulator: LfoNode,
    envelope: EnvNode,
    gain: GainNode,
    freq_buffer: Vec<f32>,
    env_buffer: Vec<f32>,
}

impl SignalChain {
    pub fn new(id: VoiceId, note: NoteId, params: &ParamTemplate, sample_rate: f32) -> Self {
        let fundamental = note.frequency();
        Self {
            id,
            note,
            ctx: RenderCtx::new(sample_rate, fundamental),
            osc: OscNode::new(params.waveform),
            modulator: LfoNode::centered(params.modulation, fundamental),
            envelope: EnvNode::new(params.envelope),
            gain: GainNode::from_db(params.volume_db),
            freq_buffer: vec![0.0; MAX_BLOCK_SIZE],
            env_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn note(&self) -> NoteId {
        self.note
    }

    /// Start both oscillators from phase zero and trigger the attack.
    pub fn start(&mut self) {
        self.osc.note_on(&self.ctx);
        self.modulator.note_on(&self.ctx);
        self.envelope.note_on(&self.ctx);
    }

    /// Begin the release tail. The oscillators keep running underneath it.
    pub fn release(&mut self) {
        self.envelope.note_off(&self.ctx);
    }

    pub fn envelope(&self) -> &EnvNode {
        &self.envelope
    }

    pub fn modulator(&self) -> &LfoNode {
        &self.modulator
    }

    pub fn gain(&self) -> &GainNode {
        &self.gain
    }
}

impl GraphNode for SignalChain {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let frames = out.len();
        debug_assert!(frames <= MAX_BLOCK_SIZE);
        let ctx = RenderCtx {
            sample_rate: ctx.sample_rate,
            ..self.ctx
        };

        let freqs = &mut self.freq_buffer[..frames];
        self.modulator.render_block(freqs, &ctx);
        self.osc.render_modulated(out, freqs, &ctx);

        let env = &mut self.env_buffer[..frames];
        self.envelope.render_block(env, &ctx);
        for (o, e) in out.iter_mut().zip(env.iter()) {
            *o *= *e;
        }

        self.gain.process(out);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.start();
    }

    fn note_off(&mut self, _ctx: &RenderCtx) {
        self.release();
    }

    fn is_active(&self) -> bool {
        self.envelope.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{envelope::EnvelopeStage, oscillator::Waveform};

    const SR: f32 = 48_000.0;

    fn chain(params: &ParamTemplate) -> SignalChain {
        SignalChain::new(VoiceId(7), NoteId::A4, params, SR)
    }

    #[test]
    fn copies_template_values() {
        let mut params = ParamTemplate::default();
        params.volume_db = -20.0;
        params.envelope.release = 0.5;
        params.modulation.depth_percent = 10.0;

        let c = chain(&params);
        assert_eq!(c.gain().db(), -20.0);
        assert_eq!(c.envelope().release_time(), 0.5);
        assert!((c.modulator().center() - 440.0).abs() < 1e-3);
        assert!((c.modulator().excursion() - 88.0).abs() < 1e-3);
    }

    #[test]
    fn silent_until_started() {
        let mut c = chain(&ParamTemplate::default());
        let mut out = vec![1.0f32; 256];
        let ctx = RenderCtx::new(SR, 0.0);
        c.render_block(&mut out, &ctx);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn output_is_bounded_by_gain() {
        let mut params = ParamTemplate::default();
        params.waveform = Waveform::Square;
        params.volume_db = -6.0;
        let mut c = chain(&params);
        c.start();

        let ctx = RenderCtx::new(SR, 0.0);
        let mut out = vec![0.0f32; 1024];
        c.render_block(&mut out, &ctx);

        let limit = c.gain().gain() + 1e-6;
        assert!(out.iter().any(|&s| s.abs() > 0.0));
        assert!(out.iter().all(|&s| s.abs() <= limit));
    }

    #[test]
    fn release_tail_reaches_silence() {
        let mut params = ParamTemplate::default();
        params.envelope.release = 0.01;
        let mut c = chain(&params);
        c.start();

        let ctx = RenderCtx::new(SR, 0.0);
        let mut out = vec![0.0f32; 512];
        c.render_block(&mut out, &ctx);
        c.release();
        assert_eq!(c.envelope().stage(), EnvelopeStage::Release);

        // 10 ms at 48 kHz is 480 samples.
        c.render_block(&mut out, &ctx);
        c.render_block(&mut out, &ctx);
        assert!(!c.is_active());
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
