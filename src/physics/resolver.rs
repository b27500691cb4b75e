//! Iterative contact resolution: nonlinear projection for penetration,
//! sequential impulses for velocity.
//!
//! Both passes repeatedly pick the worst remaining contact, resolve it,
//! and propagate the change to every other contact touching the same
//! bodies. Residual error below the epsilons is left to the next frame.

use super::body::{BodyArena, MotionType};
use super::contact::Contact;
use super::PhysicsSettings;
use glam::{Mat3, Quat, Vec3};

/// Limits how much of a position correction may be taken as rotation
/// when a body's inertia is small relative to its mass.
const ANGULAR_LIMIT: f32 = 0.2;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ResolutionStats {
    pub position_iterations: u32,
    pub velocity_iterations: u32,
}

/// Prepares all contacts and runs the position and velocity passes.
pub(crate) fn resolve_contacts(
    contacts: &mut [Contact],
    bodies: &mut BodyArena,
    dt: f32,
    settings: &PhysicsSettings,
) -> ResolutionStats {
    if contacts.is_empty() {
        return ResolutionStats::default();
    }

    for contact in contacts.iter_mut() {
        contact.calculate_internals(bodies, dt);
    }

    let position_iterations = adjust_positions(contacts, bodies, settings);
    let velocity_iterations = adjust_velocities(contacts, bodies, dt, settings);

    ResolutionStats {
        position_iterations,
        velocity_iterations,
    }
}

/// Nonlinear projection, worst penetration first.
fn adjust_positions(
    contacts: &mut [Contact],
    bodies: &mut BodyArena,
    settings: &PhysicsSettings,
) -> u32 {
    let mut iterations = 0;

    while iterations < settings.max_position_iterations {
        // find the deepest remaining penetration
        let mut max = settings.position_epsilon;
        let mut worst = contacts.len();
        for (index, contact) in contacts.iter().enumerate() {
            if contact.penetration > max {
                max = contact.penetration;
                worst = index;
            }
        }
        if worst == contacts.len() {
            break;
        }

        contacts[worst].match_awake_state(bodies, settings.sleep_epsilon);

        let (linear_change, angular_change) = apply_position_change(&contacts[worst], bodies);

        // the correction changed other penetrations involving these bodies
        let resolved_bodies = contacts[worst].bodies;
        for contact in contacts.iter_mut() {
            for b in 0..2 {
                let Some(body_index) = contact.bodies[b] else {
                    continue;
                };
                let dynamic = bodies
                    .at(body_index)
                    .map(|body| body.motion_type == MotionType::Dynamic)
                    .unwrap_or(false);
                if !dynamic {
                    continue;
                }

                for d in 0..2 {
                    if Some(body_index) == resolved_bodies[d] {
                        let delta_position = angular_change[d]
                            .cross(contact.relative_positions[b])
                            + linear_change[d];
                        let sign = if b == 1 { 1.0 } else { -1.0 };
                        contact.penetration += delta_position.dot(contact.normal) * sign;
                    }
                }
            }
        }

        iterations += 1;
    }
    iterations
}

/// Sequential impulses, largest desired velocity change first.
fn adjust_velocities(
    contacts: &mut [Contact],
    bodies: &mut BodyArena,
    dt: f32,
    settings: &PhysicsSettings,
) -> u32 {
    let mut iterations = 0;

    while iterations < settings.max_velocity_iterations {
        let mut max = settings.velocity_epsilon;
        let mut worst = contacts.len();
        for (index, contact) in contacts.iter().enumerate() {
            if contact.desired_delta_velocity > max {
                max = contact.desired_delta_velocity;
                worst = index;
            }
        }
        if worst == contacts.len() {
            break;
        }

        contacts[worst].match_awake_state(bodies, settings.sleep_epsilon);

        let (velocity_change, rotation_change) = apply_velocity_change(&contacts[worst], bodies);

        // relative closing velocities of sibling contacts need recomputing
        let resolved_bodies = contacts[worst].bodies;
        for contact in contacts.iter_mut() {
            for b in 0..2 {
                let Some(body_index) = contact.bodies[b] else {
                    continue;
                };
                let dynamic = bodies
                    .at(body_index)
                    .map(|body| body.motion_type == MotionType::Dynamic)
                    .unwrap_or(false);
                if !dynamic {
                    continue;
                }

                for d in 0..2 {
                    if Some(body_index) == resolved_bodies[d] {
                        let delta_velocity = rotation_change[d]
                            .cross(contact.relative_positions[b])
                            + velocity_change[d];
                        let sign = if b == 1 { -1.0 } else { 1.0 };
                        contact.contact_velocity +=
                            contact.contact_to_world.transpose() * delta_velocity * sign;
                        contact.calculate_desired_delta_velocity(bodies, dt);
                    }
                }
            }
        }

        iterations += 1;
    }
    iterations
}

/// Moves and rotates the contact's bodies to remove its penetration,
/// apportioned by per-body inertia along the contact normal.
fn apply_position_change(
    contact: &Contact,
    bodies: &mut BodyArena,
) -> ([Vec3; 2], [Vec3; 2]) {
    let mut linear_change = [Vec3::ZERO; 2];
    let mut angular_change = [Vec3::ZERO; 2];

    let mut linear_inertia = [0.0f32; 2];
    let mut angular_inertia = [0.0f32; 2];
    let mut total_inertia = 0.0f32;

    // inertia of each body along the contact normal
    for i in 0..2 {
        let Some(body) = contact.bodies[i].and_then(|index| bodies.at(index)) else {
            continue;
        };
        if body.motion_type != MotionType::Dynamic {
            continue;
        }

        let angular_inertia_world = contact.relative_positions[i]
            .cross(contact.normal);
        let angular_inertia_world = body.inverse_inertia_tensor_world * angular_inertia_world;
        let angular_inertia_world = angular_inertia_world.cross(contact.relative_positions[i]);
        angular_inertia[i] = angular_inertia_world.dot(contact.normal);

        linear_inertia[i] = body.inverse_mass;
        total_inertia += linear_inertia[i] + angular_inertia[i];
    }

    if total_inertia <= 0.0 {
        return (linear_change, angular_change);
    }

    for i in 0..2 {
        let Some(index) = contact.bodies[i] else {
            continue;
        };

        let is_dynamic = bodies
            .at(index)
            .map(|body| body.motion_type == MotionType::Dynamic)
            .unwrap_or(false);

        if is_dynamic {
            let sign = if i == 0 { 1.0 } else { -1.0 };
            let mut angular_move =
                sign * contact.penetration * (angular_inertia[i] / total_inertia);
            let mut linear_move = sign * contact.penetration * (linear_inertia[i] / total_inertia);

            // clamp the angular share via the small-angle approximation
            let projection = contact.relative_positions[i]
                + contact.normal
                    * -contact.relative_positions[i].dot(contact.normal);
            let max_magnitude = ANGULAR_LIMIT * projection.length();
            if angular_move < -max_magnitude {
                let total_move = angular_move + linear_move;
                angular_move = -max_magnitude;
                linear_move = total_move - angular_move;
            } else if angular_move > max_magnitude {
                let total_move = angular_move + linear_move;
                angular_move = max_magnitude;
                linear_move = total_move - angular_move;
            }

            let Some(body) = bodies.at_mut(index) else {
                continue;
            };

            angular_change[i] = if angular_move == 0.0 {
                Vec3::ZERO
            } else {
                let target_direction =
                    contact.relative_positions[i].cross(contact.normal);
                (body.inverse_inertia_tensor_world * target_direction)
                    * (angular_move / angular_inertia[i])
            };

            linear_change[i] = contact.normal * linear_move;

            body.position += contact.normal * linear_move;

            let q = body.orientation;
            let dq = Quat::from_xyzw(
                angular_change[i].x,
                angular_change[i].y,
                angular_change[i].z,
                0.0,
            ) * q;
            body.orientation = Quat::from_xyzw(
                q.x + dq.x * 0.5,
                q.y + dq.y * 0.5,
                q.z + dq.z * 0.5,
                q.w + dq.w * 0.5,
            )
            .normalize();
        }

        // sleeping bodies need their derived data refreshed or the next
        // detection round sees the same penetration
        if let Some(body) = bodies.at_mut(index) {
            if !body.is_awake {
                body.orientation = body.orientation.normalize();
                body.rebuild_transform();
                body.update_world_inertia_tensor();
            }
        }
    }

    (linear_change, angular_change)
}

/// Applies the contact's impulse to the linear and angular velocity of
/// both bodies.
fn apply_velocity_change(
    contact: &Contact,
    bodies: &mut BodyArena,
) -> ([Vec3; 2], [Vec3; 2]) {
    let mut velocity_change = [Vec3::ZERO; 2];
    let mut rotation_change = [Vec3::ZERO; 2];

    let mut inverse_inertia = [Mat3::ZERO; 2];
    for i in 0..2 {
        if let Some(body) = contact.bodies[i].and_then(|index| bodies.at(index)) {
            inverse_inertia[i] = body.inverse_inertia_tensor_world;
        }
    }

    let impulse_contact = if contact.friction == 0.0 {
        frictionless_impulse(contact, bodies, &inverse_inertia)
    } else {
        friction_impulse(contact, bodies, &inverse_inertia)
    };

    let impulse = contact.contact_to_world * impulse_contact;

    if let Some(index) = contact.bodies[0] {
        if let Some(body) = bodies.at_mut(index) {
            if body.motion_type == MotionType::Dynamic {
                let impulsive_torque = contact.relative_positions[0].cross(impulse);
                rotation_change[0] = inverse_inertia[0] * impulsive_torque;
                velocity_change[0] = impulse * body.inverse_mass;
                body.linear_velocity += velocity_change[0];
                body.angular_velocity += rotation_change[0];
            }
        }
    }

    if let Some(index) = contact.bodies[1] {
        if let Some(body) = bodies.at_mut(index) {
            if body.motion_type == MotionType::Dynamic {
                let impulsive_torque = impulse.cross(contact.relative_positions[1]);
                rotation_change[1] = inverse_inertia[1] * impulsive_torque;
                velocity_change[1] = impulse * -body.inverse_mass;
                body.linear_velocity += velocity_change[1];
                body.angular_velocity += rotation_change[1];
            }
        }
    }

    (velocity_change, rotation_change)
}

/// Impulse along the contact normal only.
fn frictionless_impulse(
    contact: &Contact,
    bodies: &BodyArena,
    inverse_inertia: &[Mat3; 2],
) -> Vec3 {
    // velocity change per unit impulse along the normal
    let mut delta_velocity = 0.0;

    if let Some(body) = contact.bodies[0].and_then(|index| bodies.at(index)) {
        let delta_vel_world = contact.relative_positions[0].cross(contact.normal);
        let delta_vel_world = inverse_inertia[0] * delta_vel_world;
        let delta_vel_world = delta_vel_world.cross(contact.relative_positions[0]);
        delta_velocity += delta_vel_world.dot(contact.normal);
        delta_velocity += body.inverse_mass;
    }

    if let Some(body) = contact.bodies[1].and_then(|index| bodies.at(index)) {
        let delta_vel_world = contact.relative_positions[1].cross(contact.normal);
        let delta_vel_world = inverse_inertia[1] * delta_vel_world;
        let delta_vel_world = delta_vel_world.cross(contact.relative_positions[1]);
        delta_velocity += delta_vel_world.dot(contact.normal);
        delta_velocity += body.inverse_mass;
    }

    Vec3::new(contact.desired_delta_velocity / delta_velocity, 0.0, 0.0)
}

/// Full 3x3 impulse solve with a dynamic friction-cone clamp.
fn friction_impulse(
    contact: &Contact,
    bodies: &BodyArena,
    inverse_inertia: &[Mat3; 2],
) -> Vec3 {
    let Some(body0) = contact.bodies[0].and_then(|index| bodies.at(index)) else {
        return Vec3::ZERO;
    };
    let mut inverse_mass = body0.inverse_mass;

    // a cross product as a matrix, for converting between linear and
    // angular quantities
    let mut impulse_to_torque = skew(contact.relative_positions[0]);

    let mut delta_vel_world = impulse_to_torque * inverse_inertia[0] * impulse_to_torque * -1.0;

    if let Some(body1) = contact.bodies[1].and_then(|index| bodies.at(index)) {
        impulse_to_torque = skew(contact.relative_positions[1]);
        let delta_vel_world_two =
            impulse_to_torque * inverse_inertia[1] * impulse_to_torque * -1.0;
        delta_vel_world += delta_vel_world_two;
        inverse_mass += body1.inverse_mass;
    }

    // change of basis into contact coordinates
    let mut delta_velocity =
        contact.contact_to_world.transpose() * delta_vel_world * contact.contact_to_world;

    delta_velocity.x_axis.x += inverse_mass;
    delta_velocity.y_axis.y += inverse_mass;
    delta_velocity.z_axis.z += inverse_mass;

    let impulse_matrix = delta_velocity.inverse();

    let vel_kill = Vec3::new(
        contact.desired_delta_velocity,
        -contact.contact_velocity.y,
        -contact.contact_velocity.z,
    );

    let mut impulse_contact = impulse_matrix * vel_kill;

    let planar_impulse =
        (impulse_contact.y * impulse_contact.y + impulse_contact.z * impulse_contact.z).sqrt();
    if planar_impulse > impulse_contact.x * contact.friction {
        // exceeds static friction: clamp onto the cone
        impulse_contact.y /= planar_impulse;
        impulse_contact.z /= planar_impulse;

        impulse_contact.x = delta_velocity.x_axis.x
            + delta_velocity.y_axis.x * contact.friction * impulse_contact.y
            + delta_velocity.z_axis.x * contact.friction * impulse_contact.z;
        impulse_contact.x = contact.desired_delta_velocity / impulse_contact.x;
        impulse_contact.y *= contact.friction * impulse_contact.x;
        impulse_contact.z *= contact.friction * impulse_contact.x;
    }

    impulse_contact
}

fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skew_matrix_matches_cross_product() {
        let a = Vec3::new(1.0, -2.0, 3.0);
        let b = Vec3::new(0.5, 4.0, -1.5);
        let via_matrix = skew(a) * b;
        assert!((via_matrix - a.cross(b)).length() < 1e-6);
    }
}
