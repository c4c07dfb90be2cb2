//! Collaborative drawing synchronization engine.
//!
//! DESIGN
//! ======
//! Turns discrete pointer-down/move/up events into both an immediate local
//! paint and a propagated, replayable record. Like [`crate::playback`], the
//! engine is a pure reducer: operations mutate owned state and return
//! [`DrawEffect`] values for the host to apply.
//!
//! Two propagation paths carry the same points:
//! - per-point `draw` events give peers low-latency live ink feedback;
//! - `draw_batch` events, flushed on a fixed interval and on pointer-up, are
//!   the replayable record appended to the stroke log and persisted.
//!
//! Either path can be dropped without losing the final log. Paint effects
//! are granular ops; [`PaintOp::End`] restores source-over compositing and
//! the prior stroke width so an eraser stroke never leaks its mode into the
//! next paint call.

#[cfg(test)]
#[path = "drawing_test.rs"]
mod drawing_test;

use std::collections::HashMap;

use crate::message::{
    LivePoint, OriginId, PointKind, RoomEvent, StrokeBatch, StrokePoint, StrokeStyle, Tool,
};

/// Compositing mode for a paint operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    /// Normal painting; new pixels layer over existing ones.
    SourceOver,
    /// Destructive alpha erase; existing pixels under the path are removed.
    DestinationOut,
}

impl From<Tool> for Composite {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Pen => Self::SourceOver,
            Tool::Eraser => Self::DestinationOut,
        }
    }
}

/// One primitive operation against the drawing surface.
///
/// The rendering layer consumes these in order. `Begin`/`End` bracket every
/// path; `End` restores source-over compositing and the prior line width.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    /// Start a path with the given compositing mode, color, and width.
    Begin {
        /// Compositing mode for this path only.
        composite: Composite,
        /// CSS color string.
        color: String,
        /// Stroke width in surface pixels.
        size: f64,
    },
    /// Move the pen without drawing.
    MoveTo { x: f64, y: f64 },
    /// Draw a segment from the current position.
    LineTo { x: f64, y: f64 },
    /// Stroke the path and restore the default compositing mode and width.
    End,
    /// Erase the entire surface.
    Clear,
}

/// Effect returned by [`DrawingSync`] operations for the host to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEffect {
    /// Apply a paint operation to the local drawing surface.
    Paint(PaintOp),
    /// Broadcast this event to the room topic.
    Publish(RoomEvent),
    /// Fire-and-forget append of a completed batch to the external store.
    Persist(StrokeBatch),
    /// Fire-and-forget delete of the room's stroke history in the store.
    ClearStore,
    /// Start the fixed-interval batch-flush timer.
    StartFlushTimer,
    /// Stop the batch-flush timer.
    StopFlushTimer,
}

/// State machine owning the append-only stroke log and the in-progress
/// accumulation buffer.
#[derive(Debug, Clone)]
pub struct DrawingSync {
    origin: OriginId,
    /// Ordered, append-only record of every accepted batch, local and
    /// remote. Replayed to repaint after a resize or for a late joiner.
    log: Vec<StrokeBatch>,
    /// Pointer samples accumulated since the last flush.
    buffer: Vec<StrokePoint>,
    /// Style of the stroke currently being drawn, if any.
    active: Option<StrokeStyle>,
    /// Whether the flush timer is currently running.
    flushing: bool,
    /// Last live-ink position seen per remote origin, for segment painting.
    remote_cursors: HashMap<OriginId, (f64, f64)>,
    /// Outgoing propagation gate, enabled after late-joiner recovery.
    live: bool,
}

impl DrawingSync {
    /// Create the engine with an empty log.
    #[must_use]
    pub fn new(origin: OriginId) -> Self {
        Self {
            origin,
            log: Vec::new(),
            buffer: Vec::new(),
            active: None,
            flushing: false,
            remote_cursors: HashMap::new(),
            live: false,
        }
    }

    /// The accepted stroke log, in insertion order.
    #[must_use]
    pub fn log(&self) -> &[StrokeBatch] {
        &self.log
    }

    /// Whether outgoing propagation is enabled.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Enable or disable outgoing propagation.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    // --- Local pointer events ---

    /// Pointer pressed: begins a new path, paints locally immediately, and
    /// starts the flush timer if it is not already running.
    pub fn pointer_down(&mut self, x: f64, y: f64, style: StrokeStyle) -> Vec<DrawEffect> {
        let mut effects = vec![
            DrawEffect::Paint(PaintOp::Begin {
                composite: style.tool.into(),
                color: style.color.clone(),
                size: style.size,
            }),
            DrawEffect::Paint(PaintOp::MoveTo { x, y }),
        ];
        let point = StrokePoint::start(x, y);
        self.buffer = vec![point];
        if !self.flushing {
            self.flushing = true;
            effects.push(DrawEffect::StartFlushTimer);
        }
        if self.live {
            effects.push(DrawEffect::Publish(RoomEvent::Draw(LivePoint {
                point,
                style: style.clone(),
            })));
        }
        self.active = Some(style);
        effects
    }

    /// Pointer moved while pressed: paints the new segment locally and
    /// sends the single point out-of-band for live remote ink.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Vec<DrawEffect> {
        let Some(style) = self.active.clone() else {
            // Move without a preceding down; nothing to extend.
            return Vec::new();
        };
        let point = StrokePoint::move_to(x, y);
        self.buffer.push(point);
        let mut effects = vec![DrawEffect::Paint(PaintOp::LineTo { x, y })];
        if self.live {
            effects.push(DrawEffect::Publish(RoomEvent::Draw(LivePoint { point, style })));
        }
        effects
    }

    /// Pointer released: stops the flush timer, flushes remaining buffered
    /// points as a final batch, and restores the default compositing mode.
    pub fn pointer_up(&mut self) -> Vec<DrawEffect> {
        if self.active.is_none() {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if self.flushing {
            self.flushing = false;
            effects.push(DrawEffect::StopFlushTimer);
        }
        effects.extend(self.flush_buffer());
        effects.push(DrawEffect::Paint(PaintOp::End));
        self.active = None;
        effects
    }

    /// Fixed-interval flush: drains accumulated samples into a batch that
    /// is logged, broadcast, and persisted. No-op between strokes.
    pub fn flush_tick(&mut self) -> Vec<DrawEffect> {
        if self.active.is_none() {
            return Vec::new();
        }
        self.flush_buffer()
    }

    /// Clear the surface and the log, broadcast the clear, and request the
    /// paired store delete. Local initiator path.
    pub fn clear_all(&mut self) -> Vec<DrawEffect> {
        self.log.clear();
        self.buffer.clear();
        let mut effects = vec![DrawEffect::Paint(PaintOp::Clear)];
        if self.live {
            effects.push(DrawEffect::Publish(RoomEvent::Clear));
            effects.push(DrawEffect::ClearStore);
        }
        effects
    }

    // --- Remote events ---

    /// Paint a peer's live ink sample. Start points only anchor the remote
    /// cursor; move points paint one self-contained segment so the
    /// compositing mode is restored after every sample.
    pub fn apply_remote_point(&mut self, origin: OriginId, live: &LivePoint) -> Vec<DrawEffect> {
        if origin == self.origin {
            return Vec::new();
        }
        let (x, y) = (live.point.x, live.point.y);
        let previous = self.remote_cursors.insert(origin, (x, y));
        match live.point.kind {
            PointKind::Start => Vec::new(),
            PointKind::Move => {
                let Some((px, py)) = previous else {
                    // Missed the start sample; anchor here and wait.
                    return Vec::new();
                };
                vec![
                    DrawEffect::Paint(PaintOp::Begin {
                        composite: live.style.tool.into(),
                        color: live.style.color.clone(),
                        size: live.style.size,
                    }),
                    DrawEffect::Paint(PaintOp::MoveTo { x: px, y: py }),
                    DrawEffect::Paint(PaintOp::LineTo { x, y }),
                    DrawEffect::Paint(PaintOp::End),
                ]
            }
        }
    }

    /// Paint a peer's batch with its declared tool/color/size and append it
    /// to the log.
    pub fn apply_remote_batch(&mut self, origin: OriginId, batch: StrokeBatch) -> Vec<DrawEffect> {
        if origin == self.origin {
            return Vec::new();
        }
        let effects = batch_paint_ops(&batch)
            .into_iter()
            .map(DrawEffect::Paint)
            .collect();
        self.log.push(batch);
        effects
    }

    /// A peer cleared the drawing: empty the surface and the log.
    pub fn apply_remote_clear(&mut self, origin: OriginId) -> Vec<DrawEffect> {
        if origin == self.origin {
            return Vec::new();
        }
        self.log.clear();
        vec![DrawEffect::Paint(PaintOp::Clear)]
    }

    // --- Replay ---

    /// Replay every logged batch in insertion order onto a freshly sized
    /// surface. Deterministic: the same log always yields the same ops.
    #[must_use]
    pub fn repaint_all(&self) -> Vec<PaintOp> {
        let mut ops = vec![PaintOp::Clear];
        for batch in &self.log {
            ops.extend(batch_paint_ops(batch));
        }
        ops
    }

    /// Seed the log with authoritative store history and return the ops
    /// that repaint the surface. Batches accepted while the fetch was in
    /// flight postdate the history, so they are retained after it rather
    /// than overwritten.
    pub fn seed(&mut self, batches: Vec<StrokeBatch>) -> Vec<PaintOp> {
        let accepted = std::mem::replace(&mut self.log, batches);
        self.log.extend(accepted);
        self.repaint_all()
    }

    // --- Internals ---

    /// Drain the accumulation buffer into a logged + broadcast + persisted
    /// batch. A continuation batch simply starts with a `move` point.
    fn flush_buffer(&mut self) -> Vec<DrawEffect> {
        let Some(style) = self.active.clone() else {
            return Vec::new();
        };
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let batch = StrokeBatch {
            points: std::mem::take(&mut self.buffer),
            style,
            origin: self.origin,
        };
        self.log.push(batch.clone());
        if self.live {
            vec![
                DrawEffect::Publish(RoomEvent::DrawBatch(batch.clone())),
                DrawEffect::Persist(batch),
            ]
        } else {
            Vec::new()
        }
    }
}

/// The paint ops for one batch: a bracketed polyline in point order, where
/// every `start` point opens a new sub-path.
fn batch_paint_ops(batch: &StrokeBatch) -> Vec<PaintOp> {
    let mut ops = Vec::with_capacity(batch.points.len() + 2);
    ops.push(PaintOp::Begin {
        composite: batch.style.tool.into(),
        color: batch.style.color.clone(),
        size: batch.style.size,
    });
    for (i, point) in batch.points.iter().enumerate() {
        let op = match point.kind {
            PointKind::Start => PaintOp::MoveTo { x: point.x, y: point.y },
            PointKind::Move if i == 0 => PaintOp::MoveTo { x: point.x, y: point.y },
            PointKind::Move => PaintOp::LineTo { x: point.x, y: point.y },
        };
        ops.push(op);
    }
    ops.push(PaintOp::End);
    ops
}
