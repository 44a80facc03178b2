//! Temporal smoothing of detection boxes.
//!
//! Detectors report a slightly different box every frame even for a
//! perfectly still subject. [`BoxSmoother`] runs an exponential moving
//! average over every box field to keep the rendered overlays steady.

use std::collections::HashMap;

use crate::filter::{Ema, EmaState, Filter};
use crate::image::Rect;

/// Strategy for mapping a frame's detections to smoothing slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAssignment {
    /// A detection's index in the per-frame result list is its slot.
    ///
    /// This is the default. It relies on the detector keeping its result
    /// order stable across frames; when the order changes, a slot's smoothed
    /// state jumps to a different physical subject.
    Positional,
    /// A detection is matched to the slot whose previous box it overlaps the
    /// most (IoU of at least [`BoxSmoother::IOU_THRESH`]). Unmatched
    /// detections are given fresh slots.
    NearestBox,
}

#[derive(Default)]
struct Slot {
    x: EmaState,
    y: EmaState,
    w: EmaState,
    h: EmaState,
    /// Last smoothed box, untruncated. Used for overlap matching.
    last: Option<Rect>,
    seen: bool,
    idle: u32,
}

/// Smooths per-slot bounding boxes across frames.
///
/// Position (x, y) and size (width, height) are filtered independently, each
/// with their own [`Ema`] parameter. Slot state is created lazily when a slot
/// is first fed and is kept for the lifetime of the smoother unless an idle
/// limit is configured with [`BoxSmoother::set_max_idle`].
pub struct BoxSmoother {
    pos: Ema,
    size: Ema,
    assignment: SlotAssignment,
    max_idle: Option<u32>,
    slots: HashMap<usize, Slot>,
}

impl BoxSmoother {
    pub const DEFAULT_ALPHA_POS: f32 = 0.2;
    pub const DEFAULT_ALPHA_SIZE: f32 = 0.2;

    /// Minimum overlap for [`SlotAssignment::NearestBox`] to consider a
    /// detection the same subject as an existing slot.
    pub const IOU_THRESH: f32 = 0.3;

    /// Creates a smoother with the given position and size smoothing factors.
    pub fn new(alpha_pos: f32, alpha_size: f32) -> Self {
        Self {
            pos: Ema::new(alpha_pos),
            size: Ema::new(alpha_size),
            assignment: SlotAssignment::Positional,
            max_idle: None,
            slots: HashMap::new(),
        }
    }

    /// Sets the slot assignment strategy.
    pub fn set_assignment(&mut self, assignment: SlotAssignment) {
        self.assignment = assignment;
    }

    /// Drops a slot's state once it has gone unfed for `frames` consecutive
    /// frames.
    ///
    /// By default no state is ever dropped, matching the behavior of keeping
    /// a smoothing entry per slot index indefinitely.
    pub fn set_max_idle(&mut self, frames: u32) {
        self.max_idle = Some(frames);
    }

    /// Returns the number of slots currently holding state.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maps this frame's raw detection boxes to slot indices.
    ///
    /// The returned vector is parallel to `raw` and contains no duplicate
    /// slots.
    pub fn assign(&self, raw: &[Rect]) -> Vec<usize> {
        match self.assignment {
            SlotAssignment::Positional => (0..raw.len()).collect(),
            SlotAssignment::NearestBox => {
                let mut next_free = self.slots.keys().copied().max().map_or(0, |max| max + 1);
                let mut out = Vec::with_capacity(raw.len());
                for rect in raw {
                    let mut best: Option<(usize, f32)> = None;
                    for (&slot, state) in &self.slots {
                        if out.contains(&slot) {
                            continue;
                        }
                        let Some(last) = state.last else { continue };
                        let iou = last.iou(rect);
                        if iou >= Self::IOU_THRESH && best.map_or(true, |(_, b)| iou > b) {
                            best = Some((slot, iou));
                        }
                    }
                    match best {
                        Some((slot, _)) => out.push(slot),
                        None => {
                            out.push(next_free);
                            next_free += 1;
                        }
                    }
                }
                out
            }
        }
    }

    /// Feeds one raw box into `slot`, returning the smoothed box truncated to
    /// whole pixels.
    ///
    /// The first box fed into a slot initializes its state, so there is no
    /// warm-up lag. Internal state stays floating-point; only the returned
    /// box is truncated.
    pub fn smooth(&mut self, slot: usize, raw: Rect) -> Rect {
        let slot = self.slots.entry(slot).or_default();
        slot.seen = true;

        let x = self.pos.filter(&mut slot.x, raw.x());
        let y = self.pos.filter(&mut slot.y, raw.y());
        let w = self.size.filter(&mut slot.w, raw.width());
        let h = self.size.filter(&mut slot.h, raw.height());
        slot.last = Some(Rect::from_top_left(x, y, w, h));

        Rect::from_top_left(x.trunc(), y.trunc(), w.trunc(), h.trunc())
    }

    /// Finishes the current frame.
    ///
    /// Ages every slot that was not fed since the last call and, if an idle
    /// limit is configured, drops slots that exceeded it.
    pub fn advance(&mut self) {
        for slot in self.slots.values_mut() {
            if slot.seen {
                slot.seen = false;
                slot.idle = 0;
            } else {
                slot.idle += 1;
            }
        }
        if let Some(max_idle) = self.max_idle {
            self.slots.retain(|_, slot| slot.idle < max_idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn feed(smoother: &mut BoxSmoother, slot: usize, rect: Rect) -> Rect {
        let out = smoother.smooth(slot, rect);
        smoother.advance();
        out
    }

    #[test]
    fn first_observation_passes_through() {
        let mut smoother = BoxSmoother::new(0.2, 0.2);
        let out = feed(&mut smoother, 0, Rect::from_top_left(10.0, 20.0, 30.0, 40.0));
        assert_eq!(out, Rect::from_top_left(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn ema_chain() {
        // smoothed_n = alpha * raw_n + (1 - alpha) * smoothed_{n-1}
        let alpha = 0.2;
        let mut smoother = BoxSmoother::new(alpha, alpha);
        let raws = [
            Rect::from_top_left(10.0, 10.0, 50.0, 50.0),
            Rect::from_top_left(12.0, 11.0, 51.0, 49.0),
            Rect::from_top_left(11.0, 10.0, 50.0, 50.0),
        ];

        let mut expected = [10.0f32, 10.0, 50.0, 50.0];
        for (i, raw) in raws.iter().enumerate() {
            let out = feed(&mut smoother, 0, *raw);
            if i > 0 {
                for (e, r) in expected
                    .iter_mut()
                    .zip([raw.x(), raw.y(), raw.width(), raw.height()])
                {
                    *e = alpha * r + (1.0 - alpha) * *e;
                }
            }
            assert_relative_eq!(out.x(), expected[0].trunc());
            assert_relative_eq!(out.y(), expected[1].trunc());
            assert_relative_eq!(out.width(), expected[2].trunc());
            assert_relative_eq!(out.height(), expected[3].trunc());
        }

        // The analytically computed chain for the third frame.
        let out = smoother.slots[&0].last.unwrap();
        assert_relative_eq!(out.x(), 10.48, epsilon = 1e-4);
        assert_relative_eq!(out.y(), 10.16, epsilon = 1e-4);
        assert_relative_eq!(out.width(), 50.16, epsilon = 1e-4);
        assert_relative_eq!(out.height(), 49.84, epsilon = 1e-4);
    }

    #[test]
    fn slots_are_independent() {
        let mut smoother = BoxSmoother::new(0.5, 0.5);
        feed(&mut smoother, 0, Rect::from_top_left(0.0, 0.0, 10.0, 10.0));
        feed(&mut smoother, 1, Rect::from_top_left(100.0, 100.0, 10.0, 10.0));

        // Feeding slot 0 must not disturb slot 1.
        feed(&mut smoother, 0, Rect::from_top_left(50.0, 0.0, 10.0, 10.0));
        let slot1 = feed(&mut smoother, 1, Rect::from_top_left(100.0, 100.0, 10.0, 10.0));
        assert_eq!(slot1, Rect::from_top_left(100.0, 100.0, 10.0, 10.0));
    }

    #[test]
    fn never_evicts_by_default() {
        let mut smoother = BoxSmoother::new(0.2, 0.2);
        feed(&mut smoother, 0, Rect::from_top_left(0.0, 0.0, 10.0, 10.0));
        for _ in 0..1000 {
            smoother.advance();
        }
        assert_eq!(smoother.len(), 1);
    }

    #[test]
    fn eviction_after_idle_limit() {
        let mut smoother = BoxSmoother::new(0.2, 0.2);
        smoother.set_max_idle(3);
        feed(&mut smoother, 0, Rect::from_top_left(0.0, 0.0, 10.0, 10.0));
        assert_eq!(smoother.len(), 1);
        smoother.advance();
        smoother.advance();
        assert_eq!(smoother.len(), 1);
        smoother.advance();
        assert_eq!(smoother.len(), 0);

        // A re-appearing slot starts over from the raw box.
        let out = feed(&mut smoother, 0, Rect::from_top_left(90.0, 90.0, 10.0, 10.0));
        assert_eq!(out, Rect::from_top_left(90.0, 90.0, 10.0, 10.0));
    }

    #[test]
    fn positional_assignment() {
        let smoother = BoxSmoother::new(0.2, 0.2);
        let raw = [
            Rect::from_top_left(0.0, 0.0, 10.0, 10.0),
            Rect::from_top_left(50.0, 0.0, 10.0, 10.0),
        ];
        assert_eq!(smoother.assign(&raw), vec![0, 1]);
    }

    #[test]
    fn nearest_box_assignment_survives_reordering() {
        let mut smoother = BoxSmoother::new(1.0, 1.0);
        smoother.set_assignment(SlotAssignment::NearestBox);

        let a = Rect::from_top_left(0.0, 0.0, 20.0, 20.0);
        let b = Rect::from_top_left(100.0, 100.0, 20.0, 20.0);

        let slots = smoother.assign(&[a, b]);
        assert_eq!(slots, vec![0, 1]);
        smoother.smooth(slots[0], a);
        smoother.smooth(slots[1], b);
        smoother.advance();

        // The detector returns the same boxes in swapped order.
        let slots = smoother.assign(&[b, a]);
        assert_eq!(slots, vec![1, 0]);
    }

    #[test]
    fn nearest_box_assignment_allocates_fresh_slots() {
        let mut smoother = BoxSmoother::new(1.0, 1.0);
        smoother.set_assignment(SlotAssignment::NearestBox);

        let a = Rect::from_top_left(0.0, 0.0, 20.0, 20.0);
        smoother.smooth(0, a);
        smoother.advance();

        let far = Rect::from_top_left(300.0, 300.0, 20.0, 20.0);
        assert_eq!(smoother.assign(&[a, far]), vec![0, 1]);
    }
}
