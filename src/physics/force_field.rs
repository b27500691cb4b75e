//! Force fields applied to dynamic bodies ahead of collision detection.

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceFieldKind {
    /// Pulls bodies within range toward the field's position.
    Point,
    /// Accelerates bodies within range toward the field's plane; the
    /// plane normal is the field's local +Z in world space.
    Plane,
}

/// A force field placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct ForceField {
    pub kind: ForceFieldKind,
    /// Field strength as an acceleration magnitude.
    pub gravity: f32,
    pub range: f32,
    pub position: Vec3,
    pub rotation: Quat,
}

impl ForceField {
    /// Force to accumulate on a dynamic body at `body_position` with the
    /// given inverse mass, or `None` when out of range.
    pub(crate) fn force_on(&self, body_position: Vec3, inverse_mass: f32) -> Option<Vec3> {
        match self.kind {
            ForceFieldKind::Point => {
                let direction = body_position - self.position;
                let distance_sqr = direction.length_squared();
                if distance_sqr >= self.range * self.range || distance_sqr <= 0.0 {
                    return None;
                }
                Some(direction.normalize() * (-self.gravity / inverse_mass))
            }
            ForceFieldKind::Plane => {
                let normal = (self.rotation * Vec3::Z).normalize();
                let distance = normal.dot(body_position - self.position);
                if distance.abs() >= self.range {
                    return None;
                }
                let sign = if distance < 0.0 { 1.0 } else { -1.0 };
                Some(normal * (sign * self.gravity / inverse_mass))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_field_pulls_inward() {
        let field = ForceField {
            kind: ForceFieldKind::Point,
            gravity: 10.0,
            range: 5.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        };

        let force = field
            .force_on(Vec3::new(3.0, 0.0, 0.0), 1.0)
            .expect("in range");
        assert!((force - Vec3::new(-10.0, 0.0, 0.0)).length() < 1e-5);

        assert!(field.force_on(Vec3::new(6.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_point_field_scales_with_mass() {
        let field = ForceField {
            kind: ForceFieldKind::Point,
            gravity: 10.0,
            range: 5.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        };

        // half the inverse mass means twice the force for the same
        // acceleration
        let force = field
            .force_on(Vec3::new(3.0, 0.0, 0.0), 0.5)
            .expect("in range");
        assert!((force.length() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_plane_field_pulls_toward_plane_from_both_sides() {
        let field = ForceField {
            kind: ForceFieldKind::Plane,
            gravity: 4.0,
            range: 2.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY, // plane normal +Z
        };

        let above = field
            .force_on(Vec3::new(0.0, 0.0, 1.0), 1.0)
            .expect("in range");
        assert!(above.z < 0.0);

        let below = field
            .force_on(Vec3::new(0.0, 0.0, -1.0), 1.0)
            .expect("in range");
        assert!(below.z > 0.0);

        assert!(field.force_on(Vec3::new(0.0, 0.0, 3.0), 1.0).is_none());
    }
}
