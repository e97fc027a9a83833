use crate::{
    dsp::envelope::{Envelope, EnvelopeParams, EnvelopeStage},
    graph::node::{GraphNode, RenderCtx},
};

/// Amplitude envelope node: renders the ADSR level curve for one voice.
pub struct EnvNode {
    env: Envelope,
}

impl EnvNode {
    pub fn new(params: EnvelopeParams) -> Self {
        Self {
            env: Envelope::new(params),
        }
    }

    pub fn release_time(&self) -> f32 {
        self.env.release_time()
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.env.stage()
    }

    pub fn level(&self) -> f32 {
        self.env.level()
    }
}

impl GraphNode for EnvNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.env.render(out, ctx.sample_rate);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.env.note_on();
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.env.note_off(ctx.sample_rate);
    }

    fn is_active(&self) -> bool {
        self.env.is_active()
    }
}
