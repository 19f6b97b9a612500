//! Presentation Requests
//!
//! Fire-and-forget requests for the rendering/UI layer. The core only
//! queues them; whatever drives the match drains the queue after each tick
//! and forwards it. Nothing the core decides ever depends on these.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::game::player::PlayerId;

/// Easing curve for size animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed
    Linear,
    /// Overshoot then settle (growing)
    OutBack,
    /// Slow start (shrinking)
    InQuad,
}

/// On-screen text slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSlot {
    /// "Round N"
    Round,
    /// Score line
    Score,
    /// Round or match result banner
    Banner,
}

/// One request to the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PresentationRequest {
    /// Shake the camera.
    CameraShake {
        /// Shake strength
        intensity: f32,
    },
    /// Shockwave effect at a world position.
    Shockwave {
        /// Effect origin
        position: Vec3,
    },
    /// Particle burst where a player respawned.
    RespawnEffect {
        /// Effect origin
        position: Vec3,
    },
    /// Show or hide a player's renderers.
    SetVisible {
        /// Player
        player: PlayerId,
        /// Visible after this request
        visible: bool,
    },
    /// Activate or deactivate a player's scene object.
    SetActive {
        /// Player
        player: PlayerId,
        /// Active after this request
        active: bool,
    },
    /// Tween a player's scale.
    AnimateSize {
        /// Player
        player: PlayerId,
        /// Target uniform scale
        target: f32,
        /// Tween duration (seconds)
        duration: f32,
        /// Tween curve
        easing: Easing,
    },
    /// Place an object (power-up) in the scene.
    SpawnPickup {
        /// Power-up id
        id: u32,
        /// Position
        position: Vec3,
    },
    /// Remove a power-up object from the scene.
    DespawnPickup {
        /// Power-up id
        id: u32,
    },
    /// Update a UI text slot.
    Text {
        /// Slot
        slot: TextSlot,
        /// New contents
        text: String,
    },
}

/// Requests queued during the current tick.
#[derive(Clone, Debug, Default)]
pub struct PresentationQueue {
    requests: Vec<PresentationRequest>,
}

impl PresentationQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request.
    #[inline]
    pub fn push(&mut self, request: PresentationRequest) {
        self.requests.push(request);
    }

    /// Queue a text update.
    pub fn text(&mut self, slot: TextSlot, text: impl Into<String>) {
        self.push(PresentationRequest::Text { slot, text: text.into() });
    }

    /// Requests queued so far.
    pub fn pending(&self) -> &[PresentationRequest] {
        &self.requests
    }

    /// Take the queued requests (consumes them).
    pub fn take(&mut self) -> Vec<PresentationRequest> {
        std::mem::take(&mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_take_drains() {
        let mut queue = PresentationQueue::new();
        queue.push(PresentationRequest::CameraShake { intensity: 0.3 });
        queue.text(TextSlot::Round, "Round 1");

        assert_eq!(queue.pending().len(), 2);
        let taken = queue.take();
        assert_eq!(taken.len(), 2);
        assert!(queue.pending().is_empty());
        assert_eq!(
            taken[1],
            PresentationRequest::Text { slot: TextSlot::Round, text: "Round 1".into() }
        );
    }
}
