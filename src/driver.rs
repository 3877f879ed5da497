//! Per-frame driver: advance the field, hand its snapshot to the renderer.
//!
//! The host decides when frames happen (`requestAnimationFrame` on the web);
//! the driver only does one frame's worth of work per call.

use crate::sim::{Field, Snapshot};

/// Something that consumes one snapshot per frame.
pub trait FrameTarget {
    /// Upload `snapshot` and draw. Each call is a complete, independent frame.
    fn render_frame(&mut self, snapshot: &Snapshot);
}

/// Owns the simulation and its render target.
pub struct FrameDriver<T> {
    field: Field,
    target: T,
    frames: u64,
}

impl<T: FrameTarget> FrameDriver<T> {
    pub fn new(field: Field, target: T) -> Self {
        Self {
            field,
            target,
            frames: 0,
        }
    }

    /// Run one frame: advance, then render the advanced state.
    pub fn step(&mut self) {
        self.field.advance();
        let snapshot = self.field.snapshot();
        self.target.render_frame(&snapshot);

        if self.frames == 0 {
            log::debug!("First frame submitted ({} metaballs)", snapshot.len());
        }
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}
