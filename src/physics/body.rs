//! Rigid bodies and the generational arena that owns them.

use glam::{Mat3, Mat4, Quat, Vec3};

/// Collision shape attached to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    Sphere { radius: f32 },
    Box { extents: Vec3 },
}

/// How a body participates in simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    Static,
    Kinematic,
    Dynamic,
}

/// Parameters for registering a rigid body. A mass of zero makes the body
/// static; the kinematic flag only applies to massive bodies.
#[derive(Debug, Clone, Copy)]
pub struct RigidBodyDesc {
    pub shape: CollisionShape,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity: Vec3,
    pub local_offset: Vec3,
    pub kinematic: bool,
    pub start_sleeping: bool,
    pub can_sleep: bool,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            shape: CollisionShape::Sphere { radius: 0.5 },
            mass: 1.0,
            restitution: 0.0,
            friction: 0.5,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            local_offset: Vec3::ZERO,
            kinematic: false,
            start_sleeping: false,
            can_sleep: true,
        }
    }
}

/// Stable handle into the body arena. Survives removals of other bodies;
/// goes stale when its own body is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Simulation state of one rigid body.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub motion_type: MotionType,
    pub shape: CollisionShape,
    pub position: Vec3,
    pub orientation: Quat,
    pub previous_position: Vec3,
    pub previous_orientation: Quat,
    pub transform: Mat4,
    pub local_transform: Mat4,
    pub inv_local_transform: Mat4,
    pub inverse_inertia_tensor: Mat3,
    pub inverse_inertia_tensor_world: Mat3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub last_frame_acceleration: Vec3,
    pub acceleration: Vec3,
    /// Pre-complemented: `1 - configured damping`, raised to the substep
    /// during integration.
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub inverse_mass: f32,
    /// Rolling kinetic-energy proxy driving sleep arbitration.
    pub motion: f32,
    pub is_awake: bool,
    pub can_sleep: bool,
    pub friction: f32,
    pub restitution: f32,
    pub force_accum: Vec3,
    pub torque_accum: Vec3,
}

impl RigidBody {
    pub fn from_desc(desc: &RigidBodyDesc, position: Vec3, orientation: Quat) -> Self {
        let motion_type = if desc.mass > 0.0 {
            if desc.kinematic {
                MotionType::Kinematic
            } else {
                MotionType::Dynamic
            }
        } else {
            MotionType::Static
        };
        let inverse_mass = if desc.mass > 0.0 {
            1.0 / desc.mass
        } else {
            0.0
        };

        // simulate at the shape's offset position; the entity pose is
        // recovered through the inverse local transform
        let orientation = orientation.normalize();
        let position = position + orientation * desc.local_offset;
        let local_transform = Mat4::from_translation(desc.local_offset);
        let transform = Mat4::from_rotation_translation(orientation, position);

        let inverse_inertia_tensor = if motion_type == MotionType::Static {
            Mat3::ZERO
        } else {
            inverse_inertia_tensor_for(desc.shape, desc.mass)
        };

        let mut body = Self {
            motion_type,
            shape: desc.shape,
            position,
            orientation,
            previous_position: position,
            previous_orientation: orientation,
            transform,
            local_transform,
            inv_local_transform: local_transform.inverse(),
            inverse_inertia_tensor,
            inverse_inertia_tensor_world: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            last_frame_acceleration: Vec3::ZERO,
            acceleration: desc.gravity,
            linear_damping: 1.0 - desc.linear_damping,
            angular_damping: 1.0 - desc.angular_damping,
            inverse_mass,
            motion: 0.0,
            is_awake: true,
            can_sleep: desc.can_sleep,
            friction: desc.friction,
            restitution: desc.restitution,
            force_accum: Vec3::ZERO,
            torque_accum: Vec3::ZERO,
        };

        if motion_type != MotionType::Static {
            body.update_world_inertia_tensor();
        }
        body
    }

    /// Rebuilds the world transform from position and orientation.
    pub fn rebuild_transform(&mut self) {
        self.transform = Mat4::from_rotation_translation(self.orientation, self.position);
    }

    /// Rotates the body-space inverse inertia tensor into world space.
    pub fn update_world_inertia_tensor(&mut self) {
        let rotation = Mat3::from_quat(self.orientation);
        self.inverse_inertia_tensor_world =
            rotation * self.inverse_inertia_tensor * rotation.transpose();
    }
}

/// Inverse inertia tensor in body space for a shape of the given mass.
pub fn inverse_inertia_tensor_for(shape: CollisionShape, mass: f32) -> Mat3 {
    let tensor = match shape {
        CollisionShape::Box { extents } => {
            let squares = (extents * 0.5) * (extents * 0.5);
            Mat3::from_diagonal(Vec3::new(
                0.3 * mass * (squares.y + squares.z),
                0.3 * mass * (squares.x + squares.z),
                0.3 * mass * (squares.x + squares.y),
            ))
        }
        CollisionShape::Sphere { radius } => {
            let moment = (2.0 / 5.0) * mass * radius * radius;
            Mat3::from_diagonal(Vec3::splat(moment))
        }
    };
    tensor.inverse()
}

pub(crate) struct BodySlot {
    pub generation: u32,
    pub body: Option<RigidBody>,
}

/// Generational arena of rigid bodies. Contacts and primitives reference
/// bodies by dense index, never by pointer.
#[derive(Default)]
pub(crate) struct BodyArena {
    pub slots: Vec<BodySlot>,
    free: Vec<u32>,
}

impl BodyArena {
    pub fn insert(&mut self, body: RigidBody) -> BodyHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyHandle {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(BodySlot {
                generation: 0,
                body: Some(body),
            });
            BodyHandle {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation || slot.body.is_none() {
            return None;
        }
        slot.generation += 1;
        self.free.push(handle.index);
        slot.body.take()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_ref()
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_mut()
    }

    pub fn at(&self, index: u32) -> Option<&RigidBody> {
        self.slots.get(index as usize)?.body.as_ref()
    }

    pub fn at_mut(&mut self, index: u32) -> Option<&mut RigidBody> {
        self.slots.get_mut(index as usize)?.body.as_mut()
    }

    pub fn live_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.body.is_some())
            .map(|(index, _)| index as u32)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.body.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mass_is_static() {
        let desc = RigidBodyDesc {
            mass: 0.0,
            ..Default::default()
        };
        let body = RigidBody::from_desc(&desc, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(body.motion_type, MotionType::Static);
        assert_eq!(body.inverse_mass, 0.0);
    }

    #[test]
    fn test_kinematic_needs_mass() {
        let desc = RigidBodyDesc {
            mass: 2.0,
            kinematic: true,
            ..Default::default()
        };
        let body = RigidBody::from_desc(&desc, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(body.motion_type, MotionType::Kinematic);
        assert_eq!(body.inverse_mass, 0.5);
    }

    #[test]
    fn test_sphere_inertia_tensor() {
        let tensor = inverse_inertia_tensor_for(CollisionShape::Sphere { radius: 1.0 }, 1.0);
        let expected = 1.0 / (2.0 / 5.0);
        assert!((tensor.x_axis.x - expected).abs() < 1e-4);
        assert!((tensor.y_axis.y - expected).abs() < 1e-4);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut arena = BodyArena::default();
        let desc = RigidBodyDesc::default();
        let handle = arena.insert(RigidBody::from_desc(&desc, Vec3::ZERO, Quat::IDENTITY));

        assert!(arena.remove(handle).is_some());
        assert!(arena.get(handle).is_none());

        let replacement = arena.insert(RigidBody::from_desc(&desc, Vec3::ONE, Quat::IDENTITY));
        assert_eq!(replacement.index, handle.index);
        assert_ne!(replacement.generation, handle.generation);
        assert!(arena.get(handle).is_none());
        assert!(arena.get(replacement).is_some());
    }
}
