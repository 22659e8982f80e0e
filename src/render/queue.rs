//! Render Queue Classification and Sorting
//!
//! Draws are bucketed by their material's render-queue ordinal against two
//! fixed midpoints instead of a per-draw switch, then sorted: opaque and
//! alpha-test front-to-back (minimizes overdraw), transparent back-to-front
//! (required for correct alpha blending).
//!
//! The element lists are pooled: cleared every frame, never reallocated in
//! steady state.

/// Ordinal used to bucket and blend-order draws.
///
/// Values between the named constants are legal and order draws within a
/// bucket (e.g. `RenderQueueType(OPAQUE.0 + 10)` draws after plain opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderQueueType(pub i32);

impl RenderQueueType {
    pub const OPAQUE: Self = Self(1000);
    pub const ALPHA_TEST: Self = Self(2000);
    pub const TRANSPARENT: Self = Self(3000);
}

impl Default for RenderQueueType {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// The three draw buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderQueueBucket {
    Opaque,
    AlphaTest,
    Transparent,
}

const OPAQUE_ALPHA_TEST_MID: i32 =
    (RenderQueueType::OPAQUE.0 + RenderQueueType::ALPHA_TEST.0) / 2;
const ALPHA_TEST_TRANSPARENT_MID: i32 =
    (RenderQueueType::ALPHA_TEST.0 + RenderQueueType::TRANSPARENT.0) / 2;

impl RenderQueueBucket {
    /// Classifies a queue ordinal. A value exactly at a midpoint goes to the
    /// lower bucket.
    #[inline]
    #[must_use]
    pub fn classify(queue_type: RenderQueueType) -> Self {
        if queue_type.0 <= OPAQUE_ALPHA_TEST_MID {
            RenderQueueBucket::Opaque
        } else if queue_type.0 <= ALPHA_TEST_TRANSPARENT_MID {
            RenderQueueBucket::AlphaTest
        } else {
            RenderQueueBucket::Transparent
        }
    }
}

/// One draw: a renderable, one of its sub-meshes, and the sort inputs.
///
/// Transient value, valid for the frame it was collected in.
#[derive(Debug, Clone, Copy)]
pub struct RenderElement {
    /// Index into the frame's renderable slice.
    pub renderable: usize,
    /// Sub-mesh index within the renderable's geometry.
    pub sub_mesh: usize,
    /// The material's queue ordinal at collect time.
    pub queue_type: RenderQueueType,
    /// Camera distance metric (squared for perspective, signed forward-axis
    /// projection for orthographic).
    pub distance: f32,
}

/// The three pooled element buckets of one frame.
#[derive(Default)]
pub struct RenderQueue {
    pub opaque: Vec<RenderElement>,
    pub alpha_test: Vec<RenderElement>,
    pub transparent: Vec<RenderElement>,
}

impl RenderQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the buckets for a new frame, keeping their allocations.
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.alpha_test.clear();
        self.transparent.clear();
    }

    /// Classifies and stores one element.
    pub fn push(&mut self, element: RenderElement) {
        match RenderQueueBucket::classify(element.queue_type) {
            RenderQueueBucket::Opaque => self.opaque.push(element),
            RenderQueueBucket::AlphaTest => self.alpha_test.push(element),
            RenderQueueBucket::Transparent => self.transparent.push(element),
        }
    }

    /// Sorts every bucket into draw order.
    pub fn sort(&mut self) {
        let front_to_back = |a: &RenderElement, b: &RenderElement| {
            a.queue_type
                .cmp(&b.queue_type)
                .then(a.distance.total_cmp(&b.distance))
        };
        self.opaque.sort_by(front_to_back);
        self.alpha_test.sort_by(front_to_back);
        self.transparent.sort_by(|a, b| {
            a.queue_type
                .cmp(&b.queue_type)
                .then(b.distance.total_cmp(&a.distance))
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.opaque.len() + self.alpha_test.len() + self.transparent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(queue_type: i32, distance: f32) -> RenderElement {
        RenderElement {
            renderable: 0,
            sub_mesh: 0,
            queue_type: RenderQueueType(queue_type),
            distance,
        }
    }

    #[test]
    fn classification_uses_midpoints() {
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType::OPAQUE),
            RenderQueueBucket::Opaque
        );
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType::ALPHA_TEST),
            RenderQueueBucket::AlphaTest
        );
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType::TRANSPARENT),
            RenderQueueBucket::Transparent
        );
    }

    #[test]
    fn midpoint_ties_go_to_the_lower_bucket() {
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType(1500)),
            RenderQueueBucket::Opaque
        );
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType(1501)),
            RenderQueueBucket::AlphaTest
        );
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType(2500)),
            RenderQueueBucket::AlphaTest
        );
        assert_eq!(
            RenderQueueBucket::classify(RenderQueueType(2501)),
            RenderQueueBucket::Transparent
        );
    }

    #[test]
    fn opaque_sorts_front_to_back() {
        let mut queue = RenderQueue::new();
        for distance in [5.0, 1.0, 3.0] {
            queue.push(element(1000, distance));
        }
        queue.sort();
        let order: Vec<f32> = queue.opaque.iter().map(|e| e.distance).collect();
        assert_eq!(order, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn transparent_sorts_back_to_front() {
        let mut queue = RenderQueue::new();
        for distance in [5.0, 1.0, 3.0] {
            queue.push(element(3000, distance));
        }
        queue.sort();
        let order: Vec<f32> = queue.transparent.iter().map(|e| e.distance).collect();
        assert_eq!(order, vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn queue_type_orders_before_distance() {
        let mut queue = RenderQueue::new();
        queue.push(element(1010, 1.0));
        queue.push(element(1000, 9.0));
        queue.sort();
        let order: Vec<i32> = queue.opaque.iter().map(|e| e.queue_type.0).collect();
        assert_eq!(order, vec![1000, 1010]);
    }

    #[test]
    fn clear_keeps_buckets_reusable() {
        let mut queue = RenderQueue::new();
        queue.push(element(1000, 1.0));
        queue.push(element(3000, 1.0));
        assert_eq!(queue.len(), 2);
        queue.clear();
        assert!(queue.is_empty());
    }
}
