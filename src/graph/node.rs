/// Context passed to graph nodes during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - frequency: Fundamental of the note being rendered (Hz)
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frequency: f32,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self {
            sample_rate,
            frequency,
        }
    }
}

/// Core trait for audio processing graph nodes
///
/// Nodes render audio blocks and respond to note gate events.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// Triggered when the voice starts.
    ///
    /// Default implementation does nothing (passthrough nodes).
    fn note_on(&mut self, _ctx: &RenderCtx) {}

    /// Triggered when the voice is released.
    ///
    /// Default implementation does nothing (passthrough nodes).
    fn note_off(&mut self, _ctx: &RenderCtx) {}

    /// Check if this node is still producing sound
    fn is_active(&self) -> bool {
        true
    }
}
