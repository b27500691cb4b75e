//! Contact data and the per-contact derived quantities the solver needs.

use super::body::{BodyArena, MotionType};
use glam::{Mat3, Vec3};

/// Restitution is suppressed below this closing speed to keep resting
/// contacts from buzzing.
const VELOCITY_LIMIT: f32 = 0.25;

/// One contact between a body and either another body or the static
/// environment (`None` in the second slot).
#[derive(Debug, Clone)]
pub struct Contact {
    pub bodies: [Option<u32>; 2],
    pub friction: f32,
    pub restitution: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub penetration: f32,

    // derived each substep
    pub contact_to_world: Mat3,
    pub contact_velocity: Vec3,
    pub desired_delta_velocity: f32,
    pub relative_positions: [Vec3; 2],
}

impl Contact {
    pub fn new(
        bodies: [Option<u32>; 2],
        point: Vec3,
        normal: Vec3,
        penetration: f32,
        friction: f32,
        restitution: f32,
    ) -> Self {
        Self {
            bodies,
            friction,
            restitution,
            point,
            normal,
            penetration,
            contact_to_world: Mat3::IDENTITY,
            contact_velocity: Vec3::ZERO,
            desired_delta_velocity: 0.0,
            relative_positions: [Vec3::ZERO; 2],
        }
    }

    /// Computes the contact basis, relative positions, contact-space
    /// velocity, and desired delta velocity for this substep.
    pub(crate) fn calculate_internals(&mut self, bodies: &BodyArena, dt: f32) {
        // keep the occupied slot first
        if self.bodies[0].is_none() {
            self.bodies.swap(0, 1);
            self.normal = -self.normal;
        }
        debug_assert!(self.bodies[0].is_some());

        self.calculate_contact_basis();

        if let Some(index) = self.bodies[0] {
            if let Some(body) = bodies.at(index) {
                self.relative_positions[0] = self.point - body.position;
            }
        }
        if let Some(index) = self.bodies[1] {
            if let Some(body) = bodies.at(index) {
                self.relative_positions[1] = self.point - body.position;
            }
        }

        self.contact_velocity = self.calculate_local_velocity(bodies, 0, dt);
        if self.bodies[1].is_some() {
            self.contact_velocity -= self.calculate_local_velocity(bodies, 1, dt);
        }

        self.calculate_desired_delta_velocity(bodies, dt);
    }

    /// Velocity of the contact point on one body, in contact coordinates,
    /// with this frame's acceleration-induced velocity folded in on the
    /// planar axes only (the normal component is handled separately for
    /// stable resting contact).
    fn calculate_local_velocity(&self, bodies: &BodyArena, slot: usize, dt: f32) -> Vec3 {
        let Some(index) = self.bodies[slot] else {
            return Vec3::ZERO;
        };
        let Some(body) = bodies.at(index) else {
            return Vec3::ZERO;
        };
        if body.motion_type == MotionType::Static {
            return Vec3::ZERO;
        }

        let world_to_contact = self.contact_to_world.transpose();

        let velocity =
            body.angular_velocity.cross(self.relative_positions[slot]) + body.linear_velocity;
        let mut contact_velocity = world_to_contact * velocity;

        let mut acc_velocity = world_to_contact * (body.last_frame_acceleration * dt);
        acc_velocity.x = 0.0;
        contact_velocity += acc_velocity;

        contact_velocity
    }

    pub(crate) fn calculate_desired_delta_velocity(&mut self, bodies: &BodyArena, dt: f32) {
        let mut velocity_from_acc = 0.0;

        if let Some(body) = self.bodies[0].and_then(|index| bodies.at(index)) {
            if body.is_awake && body.motion_type != MotionType::Static {
                velocity_from_acc += body.last_frame_acceleration.dot(self.normal * dt);
            }
        }
        if let Some(body) = self.bodies[1].and_then(|index| bodies.at(index)) {
            if body.is_awake && body.motion_type != MotionType::Static {
                velocity_from_acc -= self.normal.dot(body.last_frame_acceleration * dt);
            }
        }

        let restitution = if self.contact_velocity.x.abs() < VELOCITY_LIMIT {
            0.0
        } else {
            self.restitution
        };

        self.desired_delta_velocity = -self.contact_velocity.x
            - restitution * (self.contact_velocity.x - velocity_from_acc);
    }

    /// Orthonormal basis with the contact normal as column 0. The tangent
    /// pair branches on whichever world axis the normal is further from,
    /// which avoids the degenerate cross product.
    fn calculate_contact_basis(&mut self) {
        let normal = self.normal;
        let mut tangents = [Vec3::ZERO; 2];

        if normal.x.abs() > normal.y.abs() {
            let scale = 1.0 / (normal.z * normal.z + normal.x * normal.x).sqrt();

            tangents[0].x = normal.z * scale;
            tangents[0].y = 0.0;
            tangents[0].z = -normal.x * scale;

            tangents[1].x = normal.y * tangents[0].z;
            tangents[1].y = normal.z * tangents[0].x - normal.x * tangents[0].z;
            tangents[1].z = -normal.y * tangents[0].x;
        } else {
            let scale = 1.0 / (normal.z * normal.z + normal.y * normal.y).sqrt();

            tangents[0].x = 0.0;
            tangents[0].y = -normal.z * scale;
            tangents[0].z = normal.y * scale;

            tangents[1].x = normal.y * tangents[0].z - normal.z * tangents[0].y;
            tangents[1].y = -normal.x * tangents[0].z;
            tangents[1].z = normal.x * tangents[0].y;
        }

        self.contact_to_world = Mat3::from_cols(normal, tangents[0], tangents[1]);
    }

    /// Wakes the sleeping partner of a contact being resolved. Contacts
    /// against the static environment never wake anything.
    pub(crate) fn match_awake_state(&self, bodies: &mut BodyArena, sleep_epsilon: f32) {
        let (Some(first), Some(second)) = (self.bodies[0], self.bodies[1]) else {
            return;
        };

        let first_awake = bodies.at(first).map(|b| b.is_awake).unwrap_or(false);
        let second_awake = bodies.at(second).map(|b| b.is_awake).unwrap_or(false);

        if first_awake ^ second_awake {
            let sleeping = if first_awake { second } else { first };
            if let Some(body) = bodies.at_mut(sleeping) {
                super::set_awake(body, true, sleep_epsilon);
            }
        }
    }
}
