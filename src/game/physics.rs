//! Physics Collaborator
//!
//! The match core drives a rigid-body solver through `PhysicsBackend` and
//! never integrates bodies itself. `ArenaPhysics` is the reference backend:
//! spheres sliding on a circular ice platform, gravity past the edge, a
//! death zone under the platform and spherical pickup triggers. Tests and
//! the headless binary run on it; a game engine would provide its own.

use std::collections::{BTreeMap, BTreeSet};

use glam::{Quat, Vec3};
use tracing::trace;

use crate::config::ArenaConfig;
use crate::game::player::PlayerId;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Kind of trigger region a body entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegionKind {
    /// Fall/hazard region; entering it eliminates the player
    DeathZone,
    /// Pickup trigger for the power-up with this id
    Powerup(u32),
}

/// Something the solver reports after a step.
#[derive(Clone, Debug, PartialEq)]
pub enum PhysicsNotification {
    /// Two bodies started touching.
    Contact {
        /// Lower player id of the pair
        a: PlayerId,
        /// Higher player id of the pair
        b: PlayerId,
        /// World-space contact point
        point: Vec3,
    },
    /// A body is inside a trigger region.
    RegionEntered {
        /// The body
        body: PlayerId,
        /// The region
        region: RegionKind,
    },
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Operations the match core needs from a rigid-body solver.
///
/// Bodies are keyed by `PlayerId`. Calls on unknown ids are ignored.
pub trait PhysicsBackend {
    /// Create (or replace) the body for a player.
    fn insert_body(&mut self, id: PlayerId, position: Vec3);

    /// Current position.
    fn position(&self, id: PlayerId) -> Option<Vec3>;

    /// Current orientation.
    fn orientation(&self, id: PlayerId) -> Option<Quat>;

    /// Current linear velocity.
    fn velocity(&self, id: PlayerId) -> Option<Vec3>;

    /// Current angular velocity.
    fn angular_velocity(&self, id: PlayerId) -> Option<Vec3>;

    /// Overwrite linear velocity.
    fn set_velocity(&mut self, id: PlayerId, velocity: Vec3);

    /// Zero linear and angular velocity.
    fn zero_velocity(&mut self, id: PlayerId);

    /// Instantaneous velocity change (mass independent).
    fn apply_impulse(&mut self, id: PlayerId, impulse: Vec3);

    /// Continuous force, integrated over the next step.
    fn add_force(&mut self, id: PlayerId, force: Vec3);

    /// Teleport and re-orient a body.
    fn set_transform(&mut self, id: PlayerId, position: Vec3, orientation: Quat);

    /// Re-orient a body in place.
    fn set_orientation(&mut self, id: PlayerId, orientation: Quat);

    /// Take a body in or out of the simulation.
    fn set_active(&mut self, id: PlayerId, active: bool);

    /// Scale the body's collision shape.
    fn set_scale(&mut self, id: PlayerId, scale: f32);

    /// Add a spherical trigger region.
    fn add_trigger(&mut self, kind: RegionKind, center: Vec3, radius: f32);

    /// Remove a trigger region.
    fn remove_trigger(&mut self, kind: RegionKind);

    /// Advance the simulation and report what happened.
    fn step(&mut self, dt: f32) -> Vec<PhysicsNotification>;
}

// =============================================================================
// ARENA PHYSICS
// =============================================================================

/// One sphere body.
#[derive(Clone, Debug)]
struct Body {
    position: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    orientation: Quat,
    scale: f32,
    active: bool,
    force: Vec3,
}

impl Body {
    fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: 1.0,
            active: true,
            force: Vec3::ZERO,
        }
    }
}

/// Spherical trigger.
#[derive(Clone, Debug)]
struct Trigger {
    center: Vec3,
    radius: f32,
    inside: BTreeSet<PlayerId>,
}

/// Reference solver: circular ice platform over a death zone.
///
/// Death-zone notifications repeat every step while a body stays below the
/// kill plane; pickup triggers report only on entry.
#[derive(Clone, Debug)]
pub struct ArenaPhysics {
    arena: ArenaConfig,
    bodies: BTreeMap<PlayerId, Body>,
    triggers: BTreeMap<RegionKind, Trigger>,
    touching: BTreeSet<(PlayerId, PlayerId)>,
}

impl ArenaPhysics {
    /// Create an empty arena.
    pub fn new(arena: ArenaConfig) -> Self {
        Self {
            arena,
            bodies: BTreeMap::new(),
            triggers: BTreeMap::new(),
            touching: BTreeSet::new(),
        }
    }

    /// Collision radius of a body.
    pub fn radius(&self, id: PlayerId) -> Option<f32> {
        self.bodies
            .get(&id)
            .map(|b| self.arena.player_radius * b.scale)
    }

    /// Whether a body is simulated.
    pub fn is_active(&self, id: PlayerId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.active)
    }

    /// Number of live trigger regions (excluding the death zone).
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.arena.gravity;
        let radius = self.arena.platform_radius;

        for body in self.bodies.values_mut() {
            if !body.active {
                body.force = Vec3::ZERO;
                continue;
            }

            body.velocity += body.force * dt;
            body.force = Vec3::ZERO;
            body.velocity.y -= gravity * dt;

            let was_above = body.position.y >= 0.0;
            body.position += body.velocity * dt;

            if was_above && body.position.y < 0.0 && over_platform(body.position, radius) {
                // Landed on the ice
                body.position.y = 0.0;
                body.velocity.y = 0.0;
            }

            if body.angular_velocity != Vec3::ZERO {
                let spin = Quat::from_scaled_axis(body.angular_velocity * dt);
                body.orientation = (spin * body.orientation).normalize();
            }
        }
    }

    fn resolve_contacts(&mut self, out: &mut Vec<PhysicsNotification>) {
        let ids: Vec<PlayerId> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.active)
            .map(|(id, _)| *id)
            .collect();

        let mut now_touching = BTreeSet::new();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (id_a, id_b) = (ids[i], ids[j]);
                let (Some(a), Some(b)) = (self.bodies.get(&id_a), self.bodies.get(&id_b)) else {
                    continue;
                };

                let ra = self.arena.player_radius * a.scale;
                let rb = self.arena.player_radius * b.scale;
                let delta = b.position - a.position;
                let dist = delta.length();
                if dist >= ra + rb {
                    continue;
                }

                let normal = if dist > f32::EPSILON { delta / dist } else { Vec3::X };
                let point = a.position + normal * (ra - (ra + rb - dist) * 0.5);
                let correction = normal * ((ra + rb - dist) * 0.5);
                let (pa, pb) = (a.position - correction, b.position + correction);

                if let Some(a) = self.bodies.get_mut(&id_a) {
                    a.position = pa;
                }
                if let Some(b) = self.bodies.get_mut(&id_b) {
                    b.position = pb;
                }

                now_touching.insert((id_a, id_b));
                if !self.touching.contains(&(id_a, id_b)) {
                    trace!(a = %id_a, b = %id_b, "contact begin");
                    out.push(PhysicsNotification::Contact { a: id_a, b: id_b, point });
                }
            }
        }

        self.touching = now_touching;
    }

    fn check_regions(&mut self, out: &mut Vec<PhysicsNotification>) {
        for (id, body) in &self.bodies {
            if body.active && body.position.y < self.arena.kill_plane_y {
                out.push(PhysicsNotification::RegionEntered {
                    body: *id,
                    region: RegionKind::DeathZone,
                });
            }
        }

        for (kind, trigger) in self.triggers.iter_mut() {
            let mut inside = BTreeSet::new();
            for (id, body) in &self.bodies {
                if !body.active {
                    continue;
                }
                let reach = trigger.radius + self.arena.player_radius * body.scale;
                if body.position.distance_squared(trigger.center) <= reach * reach {
                    inside.insert(*id);
                    if !trigger.inside.contains(id) {
                        out.push(PhysicsNotification::RegionEntered { body: *id, region: *kind });
                    }
                }
            }
            trigger.inside = inside;
        }
    }
}

impl PhysicsBackend for ArenaPhysics {
    fn insert_body(&mut self, id: PlayerId, position: Vec3) {
        self.bodies.insert(id, Body::new(position));
    }

    fn position(&self, id: PlayerId) -> Option<Vec3> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn orientation(&self, id: PlayerId) -> Option<Quat> {
        self.bodies.get(&id).map(|b| b.orientation)
    }

    fn velocity(&self, id: PlayerId) -> Option<Vec3> {
        self.bodies.get(&id).map(|b| b.velocity)
    }

    fn angular_velocity(&self, id: PlayerId) -> Option<Vec3> {
        self.bodies.get(&id).map(|b| b.angular_velocity)
    }

    fn set_velocity(&mut self, id: PlayerId, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity = velocity;
        }
    }

    fn zero_velocity(&mut self, id: PlayerId) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        }
    }

    fn apply_impulse(&mut self, id: PlayerId, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity += impulse;
        }
    }

    fn add_force(&mut self, id: PlayerId, force: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.force += force;
        }
    }

    fn set_transform(&mut self, id: PlayerId, position: Vec3, orientation: Quat) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = position;
            body.orientation = orientation;
            body.force = Vec3::ZERO;
        }
        self.touching.retain(|(a, b)| *a != id && *b != id);
    }

    fn set_orientation(&mut self, id: PlayerId, orientation: Quat) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.orientation = orientation;
        }
    }

    fn set_active(&mut self, id: PlayerId, active: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.active = active;
        }
        if !active {
            self.touching.retain(|(a, b)| *a != id && *b != id);
        }
    }

    fn set_scale(&mut self, id: PlayerId, scale: f32) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.scale = scale.max(f32::EPSILON);
        }
    }

    fn add_trigger(&mut self, kind: RegionKind, center: Vec3, radius: f32) {
        self.triggers.insert(
            kind,
            Trigger {
                center,
                radius,
                inside: BTreeSet::new(),
            },
        );
    }

    fn remove_trigger(&mut self, kind: RegionKind) {
        self.triggers.remove(&kind);
    }

    fn step(&mut self, dt: f32) -> Vec<PhysicsNotification> {
        let mut notifications = Vec::new();
        self.integrate(dt);
        self.resolve_contacts(&mut notifications);
        self.check_regions(&mut notifications);
        notifications
    }
}

/// Whether a point lies over the ice disc, edge included.
fn over_platform(position: Vec3, radius: f32) -> bool {
    position.x * position.x + position.z * position.z <= radius * radius
}

// =============================================================================
// TESTS
// =============================================================================
