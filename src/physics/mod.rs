//! Rigid-body physics: integration, contact generation, an iterative
//! position/velocity solver, force fields, and sleep arbitration.
//!
//! The frame loop subdivides render time into fixed substeps and runs
//! force fields, collision detection, contact resolution, and integration
//! per substep, interpolating the leftover fraction for smooth motion.
//! Broad phase is all-pairs over awake bodies for now; a BVH is the
//! obvious next step once body counts grow.

pub mod body;
pub mod collision;
pub mod contact;
pub mod force_field;
mod resolver;

pub use body::{BodyHandle, CollisionShape, MotionType, RigidBody, RigidBodyDesc};
pub use collision::CollisionInfo;
pub use contact::Contact;
pub use force_field::{ForceField, ForceFieldKind};

use body::BodyArena;
use collision::{BoxShape, HalfSpaceShape, SphereShape};
use glam::{Quat, Vec3};

/// Engine tuning. Zeroed fields are backfilled with defaults when passed
/// to [`PhysicsWorld::set_settings`].
#[derive(Debug, Clone, Copy)]
pub struct PhysicsSettings {
    pub enabled: bool,
    pub sleep_epsilon: f32,
    pub position_epsilon: f32,
    pub velocity_epsilon: f32,
    pub max_position_iterations: u32,
    pub max_velocity_iterations: u32,
    pub simulation_multiplier: f32,
    pub simulation_frame_rate: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sleep_epsilon: 0.5,
            position_epsilon: 0.01,
            velocity_epsilon: 0.01,
            max_position_iterations: 256,
            max_velocity_iterations: 256,
            simulation_multiplier: 1.0,
            simulation_frame_rate: 60.0,
        }
    }
}

impl PhysicsSettings {
    fn sanitized(mut self) -> Self {
        let defaults = PhysicsSettings::default();
        if self.simulation_multiplier == 0.0 {
            self.simulation_multiplier = defaults.simulation_multiplier;
        }
        if self.sleep_epsilon == 0.0 {
            self.sleep_epsilon = defaults.sleep_epsilon;
        }
        if self.position_epsilon == 0.0 {
            self.position_epsilon = defaults.position_epsilon;
        }
        if self.velocity_epsilon == 0.0 {
            self.velocity_epsilon = defaults.velocity_epsilon;
        }
        if self.max_position_iterations == 0 {
            self.max_position_iterations = defaults.max_position_iterations;
        }
        if self.max_velocity_iterations == 0 {
            self.max_velocity_iterations = defaults.max_velocity_iterations;
        }
        if self.simulation_frame_rate == 0.0 {
            self.simulation_frame_rate = defaults.simulation_frame_rate;
        }
        self
    }
}

/// Static collision plane registered with the world.
#[derive(Debug, Clone, Copy)]
pub struct HalfSpace {
    pub direction: Vec3,
    pub offset: f32,
    pub friction: f32,
    pub restitution: f32,
}

/// Counters surfaced for tuning the solver.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicsStats {
    pub body_count: usize,
    pub contact_count: usize,
    pub position_iterations: u32,
    pub velocity_iterations: u32,
    pub max_residual_penetration: f32,
}

#[derive(Debug, Clone, Copy)]
enum PrimitiveShape {
    Sphere(SphereShape),
    Box(BoxShape),
}

#[derive(Debug, Clone, Copy)]
struct CollisionPrimitive {
    body_index: u32,
    shape: PrimitiveShape,
    friction: f32,
    restitution: f32,
}

/// Wakes or sleeps a body. Waking seeds the motion metric so the body is
/// not immediately re-slept; sleeping zeroes the velocities.
pub(crate) fn set_awake(body: &mut RigidBody, awake: bool, sleep_epsilon: f32) {
    if awake {
        body.is_awake = true;
        body.motion = sleep_epsilon * 2.0;
    } else {
        body.is_awake = false;
        body.linear_velocity = Vec3::ZERO;
        body.angular_velocity = Vec3::ZERO;
    }
}

/// The physics world: bodies, static planes, force fields, and the frame
/// loop. State is owned here and must not be mutated re-entrantly from
/// update callbacks.
pub struct PhysicsWorld {
    settings: PhysicsSettings,
    bodies: BodyArena,
    half_spaces: Vec<HalfSpace>,
    force_fields: Vec<ForceField>,
    contacts: Vec<Contact>,
    primitives: Vec<CollisionPrimitive>,
    stats: PhysicsStats,
}

impl PhysicsWorld {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            bodies: BodyArena::default(),
            half_spaces: Vec::new(),
            force_fields: Vec::new(),
            contacts: Vec::new(),
            primitives: Vec::new(),
            stats: PhysicsStats::default(),
        }
    }

    pub fn settings(&self) -> PhysicsSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: PhysicsSettings) {
        self.settings = settings.sanitized();
    }

    pub fn stats(&self) -> PhysicsStats {
        self.stats
    }

    // ------------------------------------------------------------------
    // world construction
    // ------------------------------------------------------------------

    pub fn add_body(
        &mut self,
        desc: &RigidBodyDesc,
        position: Vec3,
        orientation: Quat,
    ) -> BodyHandle {
        let mut body = RigidBody::from_desc(desc, position, orientation);
        set_awake(&mut body, !desc.start_sleeping, self.settings.sleep_epsilon);
        self.bodies.insert(body)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(handle);
    }

    pub fn add_half_space(&mut self, half_space: HalfSpace) {
        self.half_spaces.push(half_space);
    }

    pub fn add_force_field(&mut self, field: ForceField) -> usize {
        self.force_fields.push(field);
        self.force_fields.len() - 1
    }

    pub fn clear_force_fields(&mut self) {
        self.force_fields.clear();
    }

    /// Drops every body. Planes and fields stay registered.
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.primitives.clear();
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Pose with the body's local shape offset removed, for transform
    /// consumers downstream.
    pub fn body_entity_pose(&self, handle: BodyHandle) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(handle)?;
        let world = body.transform * body.inv_local_transform;
        let (_, rotation, translation) = world.to_scale_rotation_translation();
        Some((translation, rotation))
    }

    // ------------------------------------------------------------------
    // frame loop
    // ------------------------------------------------------------------

    /// Advances the simulation by render-time `render_dt`, running as
    /// many fixed substeps as fit and interpolating the remainder.
    pub fn update(&mut self, render_dt: f32) {
        if !self.settings.enabled || render_dt <= 0.0 {
            return;
        }

        let substep_time = 1.0 / self.settings.simulation_frame_rate;
        let ratio = render_dt / substep_time;
        let remainder = ratio.fract();
        let substeps = ratio.ceil() as u32;
        let dt = substep_time * self.settings.simulation_multiplier;

        for _ in 0..substeps {
            self.apply_force_fields();
            self.detect_collisions();
            let resolution = resolver::resolve_contacts(
                &mut self.contacts,
                &mut self.bodies,
                dt,
                &self.settings,
            );
            self.integrate(dt);

            self.stats.position_iterations = resolution.position_iterations;
            self.stats.velocity_iterations = resolution.velocity_iterations;
        }

        self.stats.body_count = self.bodies.len();
        self.stats.contact_count = self.contacts.len();
        self.stats.max_residual_penetration = self
            .contacts
            .iter()
            .map(|contact| contact.penetration)
            .fold(0.0, f32::max);

        if remainder > 0.0 {
            for index in self.bodies.live_indices().collect::<Vec<_>>() {
                let Some(body) = self.bodies.at_mut(index) else {
                    continue;
                };
                body.position = body
                    .previous_position
                    .lerp(body.position, remainder);
                body.orientation = body
                    .previous_orientation
                    .slerp(body.orientation, remainder);
                body.rebuild_transform();
            }
        }
    }

    fn apply_force_fields(&mut self) {
        if self.force_fields.is_empty() {
            return;
        }
        let sleep_epsilon = self.settings.sleep_epsilon;
        let fields = self.force_fields.clone();

        for index in self.bodies.live_indices().collect::<Vec<_>>() {
            let Some(body) = self.bodies.at_mut(index) else {
                continue;
            };
            if body.motion_type != MotionType::Dynamic {
                continue;
            }
            for field in &fields {
                if let Some(force) = field.force_on(body.position, body.inverse_mass) {
                    body.force_accum += force;
                    set_awake(body, true, sleep_epsilon);
                }
            }
        }
    }

    fn detect_collisions(&mut self) {
        self.contacts.clear();
        self.primitives.clear();

        for index in self.bodies.live_indices().collect::<Vec<_>>() {
            let Some(body) = self.bodies.at(index) else {
                continue;
            };
            let shape = match body.shape {
                CollisionShape::Sphere { radius } => PrimitiveShape::Sphere(SphereShape {
                    center: body.transform.col(3).truncate(),
                    radius,
                }),
                CollisionShape::Box { extents } => PrimitiveShape::Box(BoxShape {
                    half_size: extents * 0.5,
                    transform: body.transform,
                }),
            };
            self.primitives.push(CollisionPrimitive {
                body_index: index,
                shape,
                friction: body.friction,
                restitution: body.restitution,
            });
        }

        // all pairs over awake bodies; placeholder for a broad phase
        for a in 0..self.primitives.len() {
            for b in (a + 1)..self.primitives.len() {
                let one = self.primitives[a];
                let two = self.primitives[b];
                if !self.body_awake(one.body_index) && !self.body_awake(two.body_index) {
                    continue;
                }
                self.collide_pair(one, two);
            }
        }

        // static planes
        for i in 0..self.primitives.len() {
            let primitive = self.primitives[i];
            if !self.body_awake(primitive.body_index) {
                continue;
            }
            for plane_index in 0..self.half_spaces.len() {
                let plane = self.half_spaces[plane_index];
                self.collide_with_plane(primitive, plane);
            }
        }
    }

    fn collide_pair(&mut self, one: CollisionPrimitive, two: CollisionPrimitive) {
        let friction = (one.friction * two.friction).sqrt();
        let restitution = one.restitution.max(two.restitution);

        let info = match (one.shape, two.shape) {
            (PrimitiveShape::Box(box_one), PrimitiveShape::Box(box_two)) => {
                collision::pen_box_box(&box_one, &box_two)
            }
            (PrimitiveShape::Box(box_one), PrimitiveShape::Sphere(sphere)) => {
                collision::pen_box_sphere(&box_one, &sphere)
            }
            (PrimitiveShape::Sphere(_), PrimitiveShape::Box(_)) => {
                // the box is always the reference shape
                return self.collide_pair(two, one);
            }
            (PrimitiveShape::Sphere(sphere_one), PrimitiveShape::Sphere(sphere_two)) => {
                collision::pen_sphere_sphere(&sphere_one, &sphere_two)
            }
        };

        if let Some(info) = info {
            let bodies = if info.flip {
                [Some(two.body_index), Some(one.body_index)]
            } else {
                [Some(one.body_index), Some(two.body_index)]
            };
            self.contacts.push(Contact::new(
                bodies,
                info.point,
                info.normal,
                info.penetration,
                friction,
                restitution,
            ));
        }
    }

    fn collide_with_plane(&mut self, primitive: CollisionPrimitive, plane: HalfSpace) {
        let friction = (primitive.friction * plane.friction).sqrt();
        let restitution = primitive.restitution.max(plane.restitution);
        let shape = HalfSpaceShape {
            direction: plane.direction,
            offset: plane.offset,
        };

        match primitive.shape {
            PrimitiveShape::Sphere(sphere) => {
                if let Some(info) = collision::pen_sphere_half_space(&sphere, &shape) {
                    self.contacts.push(Contact::new(
                        [Some(primitive.body_index), None],
                        info.point,
                        info.normal,
                        info.penetration,
                        friction,
                        restitution,
                    ));
                }
            }
            PrimitiveShape::Box(box_shape) => {
                let mut infos = Vec::new();
                collision::pen_box_half_space(&box_shape, &shape, &mut infos);
                for info in infos {
                    self.contacts.push(Contact::new(
                        [Some(primitive.body_index), None],
                        info.point,
                        info.normal,
                        info.penetration,
                        friction,
                        restitution,
                    ));
                }
            }
        }
    }

    /// Semi-implicit integration with per-motion-type branches and the
    /// sleep state machine.
    fn integrate(&mut self, dt: f32) {
        let sleep_epsilon = self.settings.sleep_epsilon;

        for index in self.bodies.live_indices().collect::<Vec<_>>() {
            let Some(body) = self.bodies.at_mut(index) else {
                continue;
            };

            body.previous_orientation = body.orientation;
            body.previous_position = body.position;

            if !body.is_awake {
                continue;
            }

            match body.motion_type {
                MotionType::Static => {
                    body.motion = 0.0;
                }
                MotionType::Kinematic => {
                    body.position += body.linear_velocity * dt;
                    body.orientation =
                        integrate_orientation(body.orientation, body.angular_velocity, dt);
                    body.rebuild_transform();
                }
                MotionType::Dynamic => {
                    body.last_frame_acceleration =
                        body.acceleration + body.force_accum * body.inverse_mass;
                    let angular_acceleration =
                        body.inverse_inertia_tensor_world * body.torque_accum;

                    body.linear_velocity += body.last_frame_acceleration * dt;
                    body.angular_velocity += angular_acceleration * dt;

                    // drag
                    body.linear_velocity *= body.linear_damping.powf(dt);
                    body.angular_velocity *= body.angular_damping.powf(dt);

                    body.position += body.linear_velocity * dt;
                    body.orientation =
                        integrate_orientation(body.orientation, body.angular_velocity, dt);
                    body.rebuild_transform();
                    body.update_world_inertia_tensor();
                }
            }

            body.force_accum = Vec3::ZERO;
            body.torque_accum = Vec3::ZERO;

            if body.can_sleep {
                let current_motion = body.linear_velocity.length_squared()
                    + body.angular_velocity.length_squared();
                let bias = 0.5f32.powf(dt);
                body.motion = bias * body.motion + (1.0 - bias) * current_motion;

                if body.motion < sleep_epsilon {
                    set_awake(body, false, sleep_epsilon);
                } else if body.motion > 10.0 * sleep_epsilon {
                    body.motion = 10.0 * sleep_epsilon;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // forces, impulses, velocities
    // ------------------------------------------------------------------

    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.motion_type == MotionType::Dynamic {
                body.force_accum += force;
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    pub fn apply_force_at_point(&mut self, handle: BodyHandle, force: Vec3, point: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.motion_type == MotionType::Dynamic {
                body.force_accum += force;
                let arm = point - body.position;
                body.torque_accum += arm.cross(force);
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    /// As [`apply_force_at_point`](Self::apply_force_at_point), with the
    /// point given in body space.
    pub fn apply_force_at_body_point(&mut self, handle: BodyHandle, force: Vec3, point: Vec3) {
        if let Some(body) = self.bodies.get(handle) {
            let world_point = body.transform.transform_point3(point);
            self.apply_force_at_point(handle, force, world_point);
        }
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.motion_type == MotionType::Dynamic {
                body.linear_velocity += impulse * body.inverse_mass;
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    pub fn apply_impulse_at_point(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.motion_type == MotionType::Dynamic {
                body.linear_velocity += impulse * body.inverse_mass;
                let arm = point - body.position;
                body.angular_velocity +=
                    body.inverse_inertia_tensor_world * arm.cross(impulse);
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    pub fn apply_impulse_at_body_point(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) {
        if let Some(body) = self.bodies.get(handle) {
            let world_point = body.transform.transform_point3(point);
            self.apply_impulse_at_point(handle, impulse, world_point);
        }
    }

    pub fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.motion_type == MotionType::Dynamic {
                body.torque_accum += torque;
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    pub fn apply_impulse_torque(&mut self, handle: BodyHandle, torque: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.motion_type == MotionType::Dynamic {
                body.angular_velocity += body.inverse_inertia_tensor_world * torque;
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            body.linear_velocity = velocity;
            set_awake(body, true, sleep_epsilon);
        }
    }

    pub fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            body.angular_velocity = velocity;
            set_awake(body, true, sleep_epsilon);
        }
    }

    // ------------------------------------------------------------------
    // sleep control
    // ------------------------------------------------------------------

    pub fn wake_body(&mut self, handle: BodyHandle) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            set_awake(body, true, sleep_epsilon);
        }
    }

    pub fn sleep_body(&mut self, handle: BodyHandle) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        if let Some(body) = self.bodies.get_mut(handle) {
            set_awake(body, false, sleep_epsilon);
        }
    }

    pub fn wake_all(&mut self) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        for index in self.bodies.live_indices().collect::<Vec<_>>() {
            if let Some(body) = self.bodies.at_mut(index) {
                set_awake(body, true, sleep_epsilon);
            }
        }
    }

    pub fn sleep_all(&mut self) {
        let sleep_epsilon = self.settings.sleep_epsilon;
        for index in self.bodies.live_indices().collect::<Vec<_>>() {
            if let Some(body) = self.bodies.at_mut(index) {
                set_awake(body, false, sleep_epsilon);
            }
        }
    }

    fn body_awake(&self, index: u32) -> bool {
        self.bodies
            .at(index)
            .map(|body| body.is_awake)
            .unwrap_or(false)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

fn integrate_orientation(orientation: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
    let dq = Quat::from_xyzw(
        angular_velocity.x * dt,
        angular_velocity.y * dt,
        angular_velocity.z * dt,
        0.0,
    ) * orientation;
    Quat::from_xyzw(
        orientation.x + dq.x * 0.5,
        orientation.y + dq.y * 0.5,
        orientation.z + dq.z * 0.5,
        orientation.w + dq.w * 0.5,
    )
    .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 60.0;

    fn ground_plane() -> HalfSpace {
        HalfSpace {
            direction: Vec3::Y,
            offset: 0.0,
            friction: 0.0,
            restitution: 0.0,
        }
    }

    fn sphere_desc(restitution: f32) -> RigidBodyDesc {
        RigidBodyDesc {
            shape: CollisionShape::Sphere { radius: 0.5 },
            mass: 1.0,
            restitution,
            friction: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_free_fall_matches_gravity() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(
            &RigidBodyDesc {
                can_sleep: false,
                ..sphere_desc(0.0)
            },
            Vec3::new(0.0, 100.0, 0.0),
            Quat::IDENTITY,
        );

        for _ in 0..60 {
            world.update(STEP);
        }

        let body = world.body(handle).expect("live");
        // semi-implicit Euler after 1s: v = -g, y = 100 - g * (n+1)/2n
        assert!((body.linear_velocity.y + 9.81).abs() < 1e-2);
        assert!((body.position.y - (100.0 - 9.81 * 0.5 * (61.0 / 60.0))).abs() < 0.05);
    }

    #[test]
    fn test_sphere_plane_bounce_height_and_sleep() {
        let mut world = PhysicsWorld::default();
        world.add_half_space(ground_plane());
        let handle = world.add_body(
            &sphere_desc(0.5),
            Vec3::new(0.0, 5.0, 0.0),
            Quat::IDENTITY,
        );

        #[derive(PartialEq)]
        enum Phase {
            Falling,
            Rising,
            Done,
        }
        let mut phase = Phase::Falling;
        let mut peak = 0.0f32;

        for _ in 0..(8 * 60) {
            world.update(STEP);
            let body = world.body(handle).expect("live");
            let vy = body.linear_velocity.y;
            let y = body.position.y;

            match phase {
                Phase::Falling => {
                    if vy > 0.5 {
                        phase = Phase::Rising;
                    }
                }
                Phase::Rising => {
                    peak = peak.max(y);
                    if vy < -0.5 {
                        phase = Phase::Done;
                    }
                }
                Phase::Done => {}
            }
        }

        // the ascent after the first impact tops out around e^2 of the
        // drop height
        assert!(phase == Phase::Done, "sphere never bounced");
        assert!(
            (1.0..=1.6).contains(&peak),
            "bounce peak {} outside expected window",
            peak
        );

        // by now the motion metric has decayed below the sleep epsilon
        let body = world.body(handle).expect("live");
        assert!(!body.is_awake, "sphere should be asleep, motion {}", body.motion);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        let rest_y = body.position.y;
        assert!((rest_y - 0.5).abs() < 0.05);

        // a sleeping body stays sleeping absent external excitation
        for _ in 0..60 {
            world.update(STEP);
        }
        let body = world.body(handle).expect("live");
        assert!(!body.is_awake);
        assert_eq!(body.position.y, rest_y);
    }

    #[test]
    fn test_head_on_spheres_restitution_one_exchanges_velocities() {
        let mut world = PhysicsWorld::default();
        let desc = RigidBodyDesc {
            gravity: Vec3::ZERO,
            can_sleep: false,
            ..sphere_desc(1.0)
        };

        let left = world.add_body(&desc, Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY);
        let right = world.add_body(&desc, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        world.set_linear_velocity(left, Vec3::new(2.0, 0.0, 0.0));
        world.set_linear_velocity(right, Vec3::new(-2.0, 0.0, 0.0));

        for _ in 0..60 {
            world.update(STEP);
        }

        let left_v = world.body(left).expect("live").linear_velocity;
        let right_v = world.body(right).expect("live").linear_velocity;
        assert!((left_v.x + 2.0).abs() < 1e-2, "left velocity {}", left_v.x);
        assert!((right_v.x - 2.0).abs() < 1e-2, "right velocity {}", right_v.x);
    }

    #[test]
    fn test_head_on_spheres_restitution_zero_stop_together() {
        let mut world = PhysicsWorld::default();
        let desc = RigidBodyDesc {
            gravity: Vec3::ZERO,
            can_sleep: false,
            ..sphere_desc(0.0)
        };

        let left = world.add_body(&desc, Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY);
        let right = world.add_body(&desc, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        world.set_linear_velocity(left, Vec3::new(2.0, 0.0, 0.0));
        world.set_linear_velocity(right, Vec3::new(-2.0, 0.0, 0.0));

        for _ in 0..60 {
            world.update(STEP);
        }

        // mass-weighted average of +2 and -2 is zero
        let left_v = world.body(left).expect("live").linear_velocity;
        let right_v = world.body(right).expect("live").linear_velocity;
        assert!(left_v.x.abs() < 5e-2, "left velocity {}", left_v.x);
        assert!(right_v.x.abs() < 5e-2, "right velocity {}", right_v.x);
    }

    #[test]
    fn test_box_stack_residual_penetration() {
        let mut world = PhysicsWorld::default();
        world.add_half_space(HalfSpace {
            direction: Vec3::Y,
            offset: 0.0,
            friction: 0.9,
            restitution: 0.0,
        });

        let desc = RigidBodyDesc {
            shape: CollisionShape::Box {
                extents: Vec3::splat(1.0),
            },
            mass: 1.0,
            friction: 0.5,
            restitution: 0.0,
            ..Default::default()
        };

        for level in 0..10 {
            world.add_body(
                &desc,
                Vec3::new(0.0, 0.5 + level as f32, 0.0),
                Quat::IDENTITY,
            );
        }

        for _ in 0..5 {
            world.update(STEP);
            let stats = world.stats();
            assert!(
                stats.max_residual_penetration <= world.settings().position_epsilon + 1e-4,
                "residual penetration {} after solve",
                stats.max_residual_penetration
            );
        }
        assert!(world.stats().contact_count > 0);
    }

    #[test]
    fn test_kinematic_body_ignores_forces() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(
            &RigidBodyDesc {
                kinematic: true,
                can_sleep: false,
                ..RigidBodyDesc::default()
            },
            Vec3::ZERO,
            Quat::IDENTITY,
        );
        world.set_linear_velocity(handle, Vec3::new(1.0, 0.0, 0.0));
        world.apply_force(handle, Vec3::new(0.0, 100.0, 0.0));

        for _ in 0..60 {
            world.update(STEP);
        }

        let body = world.body(handle).expect("live");
        assert!((body.position.x - 1.0).abs() < 1e-3);
        assert_eq!(body.position.y, 0.0);
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = PhysicsWorld::default();
        let floor = world.add_body(
            &RigidBodyDesc {
                shape: CollisionShape::Box {
                    extents: Vec3::new(10.0, 1.0, 10.0),
                },
                mass: 0.0,
                ..Default::default()
            },
            Vec3::new(0.0, -0.5, 0.0),
            Quat::IDENTITY,
        );
        let ball = world.add_body(&sphere_desc(0.0), Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY);

        for _ in 0..120 {
            world.update(STEP);
        }

        let floor_body = world.body(floor).expect("live");
        assert_eq!(floor_body.position, Vec3::new(0.0, -0.5, 0.0));

        // the ball came to rest on the static box's top face at y = 0
        let ball_body = world.body(ball).expect("live");
        assert!((ball_body.position.y - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_point_force_field_attracts_and_wakes() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(
            &RigidBodyDesc {
                gravity: Vec3::ZERO,
                start_sleeping: true,
                ..sphere_desc(0.0)
            },
            Vec3::new(3.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        world.add_force_field(ForceField {
            kind: ForceFieldKind::Point,
            gravity: 10.0,
            range: 10.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        });

        assert!(!world.body(handle).expect("live").is_awake);
        world.update(STEP);

        let body = world.body(handle).expect("live");
        assert!(body.is_awake);
        assert!(body.linear_velocity.x < 0.0);
    }

    #[test]
    fn test_impulse_and_torque_application() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(
            &RigidBodyDesc {
                mass: 2.0,
                gravity: Vec3::ZERO,
                can_sleep: false,
                ..RigidBodyDesc::default()
            },
            Vec3::ZERO,
            Quat::IDENTITY,
        );

        world.apply_impulse(handle, Vec3::new(1.0, 0.0, 0.0));
        assert!(
            (world.body(handle).expect("live").linear_velocity.x - 0.5).abs() < 1e-5
        );

        world.apply_impulse_torque(handle, Vec3::new(0.0, 1.0, 0.0));
        assert!(world.body(handle).expect("live").angular_velocity.y > 0.0);
    }

    #[test]
    fn test_interpolation_remainder_between_substeps() {
        let build = || {
            let mut world = PhysicsWorld::default();
            let handle = world.add_body(
                &RigidBodyDesc {
                    can_sleep: false,
                    ..sphere_desc(0.0)
                },
                Vec3::new(0.0, 10.0, 0.0),
                Quat::IDENTITY,
            );
            (world, handle)
        };

        let (mut reference, ref_handle) = build();
        reference.update(STEP);
        let after_one = reference.body(ref_handle).expect("live").position.y;
        reference.update(STEP);
        let after_two = reference.body(ref_handle).expect("live").position.y;

        let (mut world, handle) = build();
        world.update(STEP * 1.5);
        let interpolated = world.body(handle).expect("live").position.y;

        assert!(interpolated < after_one);
        assert!(interpolated > after_two);
    }

    #[test]
    fn test_sleep_wake_roundtrip() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(&sphere_desc(0.0), Vec3::ZERO, Quat::IDENTITY);
        world.set_linear_velocity(handle, Vec3::new(1.0, 0.0, 0.0));

        world.sleep_body(handle);
        let body = world.body(handle).expect("live");
        assert!(!body.is_awake);
        assert_eq!(body.linear_velocity, Vec3::ZERO);

        world.wake_body(handle);
        assert!(world.body(handle).expect("live").is_awake);
    }

    #[test]
    fn test_settings_backfill_zeroed_fields() {
        let mut world = PhysicsWorld::default();
        world.set_settings(PhysicsSettings {
            enabled: true,
            sleep_epsilon: 0.0,
            position_epsilon: 0.0,
            velocity_epsilon: 0.0,
            max_position_iterations: 0,
            max_velocity_iterations: 0,
            simulation_multiplier: 0.0,
            simulation_frame_rate: 0.0,
        });

        let settings = world.settings();
        assert_eq!(settings.sleep_epsilon, 0.5);
        assert_eq!(settings.max_position_iterations, 256);
        assert_eq!(settings.simulation_frame_rate, 60.0);
    }

    #[test]
    fn test_stale_handle_is_ignored() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(&sphere_desc(0.0), Vec3::ZERO, Quat::IDENTITY);
        world.remove_body(handle);

        world.apply_force(handle, Vec3::ONE);
        world.set_linear_velocity(handle, Vec3::ONE);
        assert!(world.body(handle).is_none());
        world.update(STEP);
    }

    #[test]
    fn test_disabled_world_does_not_advance() {
        let mut world = PhysicsWorld::new(PhysicsSettings {
            enabled: false,
            ..Default::default()
        });
        let handle = world.add_body(&sphere_desc(0.0), Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);

        world.update(STEP);
        assert_eq!(world.body(handle).expect("live").position.y, 5.0);
    }
}
