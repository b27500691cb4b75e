//! Narrow-phase penetration tests.
//!
//! Each test reports the deepest contact as `{normal, point, penetration,
//! flip}`; `flip` signals that the pair's body order was swapped while
//! choosing the reference face. Box/half-space reports one contact per
//! penetrating vertex, which is what keeps resting boxes from balancing
//! on a single corner.

use glam::{Mat4, Vec3};

/// Result of a penetration test.
#[derive(Debug, Clone, Copy)]
pub struct CollisionInfo {
    pub normal: Vec3,
    pub point: Vec3,
    pub penetration: f32,
    pub flip: bool,
}

/// Sphere in world space.
#[derive(Debug, Clone, Copy)]
pub struct SphereShape {
    pub center: Vec3,
    pub radius: f32,
}

/// Oriented box in world space.
#[derive(Debug, Clone, Copy)]
pub struct BoxShape {
    pub half_size: Vec3,
    pub transform: Mat4,
}

impl BoxShape {
    fn axis(&self, index: usize) -> Vec3 {
        self.transform.col(index).truncate()
    }

    fn center(&self) -> Vec3 {
        self.transform.col(3).truncate()
    }

    fn half(&self, index: usize) -> f32 {
        match index {
            0 => self.half_size.x,
            1 => self.half_size.y,
            _ => self.half_size.z,
        }
    }
}

/// Infinite half-space: points `p` with `dot(p, direction) >= offset` are
/// outside.
#[derive(Debug, Clone, Copy)]
pub struct HalfSpaceShape {
    pub direction: Vec3,
    pub offset: f32,
}

/// Sphere vs sphere. The normal points from the second body toward the
/// first.
pub fn pen_sphere_sphere(one: &SphereShape, two: &SphereShape) -> Option<CollisionInfo> {
    let midline = one.center - two.center;
    let size = midline.length();
    if size <= 0.0 || size >= one.radius + two.radius {
        return None;
    }

    let normal = midline / size;
    let penetration = one.radius + two.radius - size;
    Some(CollisionInfo {
        normal,
        point: one.center - normal * (one.radius - penetration * 0.5),
        penetration,
        flip: false,
    })
}

pub fn pen_sphere_half_space(
    sphere: &SphereShape,
    plane: &HalfSpaceShape,
) -> Option<CollisionInfo> {
    let distance = plane.direction.dot(sphere.center) - sphere.radius - plane.offset;
    if distance >= 0.0 {
        return None;
    }

    Some(CollisionInfo {
        normal: plane.direction,
        point: sphere.center - plane.direction * (distance + sphere.radius),
        penetration: -distance,
        flip: false,
    })
}

/// Box vs sphere via the closest point on the box to the sphere center.
pub fn pen_box_sphere(one: &BoxShape, two: &SphereShape) -> Option<CollisionInfo> {
    let rel_center = one.transform.inverse().transform_point3(two.center);

    if rel_center.x.abs() - two.radius > one.half_size.x
        || rel_center.y.abs() - two.radius > one.half_size.y
        || rel_center.z.abs() - two.radius > one.half_size.z
    {
        return None;
    }

    let closest = rel_center.clamp(-one.half_size, one.half_size);
    let dist_sqr = (closest - rel_center).length_squared();
    if dist_sqr > two.radius * two.radius {
        return None;
    }

    let closest_world = one.transform.transform_point3(closest);
    let mut normal = closest_world - two.center;
    if normal.length_squared() < 1e-10 {
        // center inside the box: fall back to the least-penetrated face
        let overlap = one.half_size - rel_center.abs();
        normal = if overlap.x <= overlap.y && overlap.x <= overlap.z {
            one.axis(0) * rel_center.x.signum()
        } else if overlap.y <= overlap.z {
            one.axis(1) * rel_center.y.signum()
        } else {
            one.axis(2) * rel_center.z.signum()
        };
    }

    Some(CollisionInfo {
        normal: normal.normalize(),
        point: closest_world,
        penetration: two.radius - dist_sqr.sqrt(),
        flip: false,
    })
}

/// Box vs half-space: one contact per penetrating vertex, appended to
/// `out`. Returns the number of contacts added.
pub fn pen_box_half_space(
    one: &BoxShape,
    plane: &HalfSpaceShape,
    out: &mut Vec<CollisionInfo>,
) -> usize {
    const CORNERS: [Vec3; 8] = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, -1.0, -1.0),
    ];

    let mut added = 0;
    for corner in CORNERS {
        let vertex = one.transform.transform_point3(corner * one.half_size);
        let vertex_distance = plane.direction.dot(vertex);
        if vertex_distance <= plane.offset {
            out.push(CollisionInfo {
                normal: plane.direction,
                point: vertex + plane.direction * (plane.offset - vertex_distance),
                penetration: plane.offset - vertex_distance,
                flip: false,
            });
            added += 1;
        }
    }
    added
}

/// Box vs box, separating-axis test over the 15 candidate axes with the
/// face/edge contact generation split.
pub fn pen_box_box(one: &BoxShape, two: &BoxShape) -> Option<CollisionInfo> {
    let to_centre = two.center() - one.center();

    let mut best_overlap = f32::MAX;
    let mut best_case = usize::MAX;

    for i in 0..3 {
        if !try_axis(
            one,
            two,
            one.axis(i),
            to_centre,
            i,
            &mut best_overlap,
            &mut best_case,
        ) {
            return None;
        }
    }
    for i in 0..3 {
        if !try_axis(
            one,
            two,
            two.axis(i),
            to_centre,
            3 + i,
            &mut best_overlap,
            &mut best_case,
        ) {
            return None;
        }
    }
    let best_single_axis = best_case;

    for i in 0..3 {
        for j in 0..3 {
            if !try_axis(
                one,
                two,
                one.axis(i).cross(two.axis(j)),
                to_centre,
                6 + i * 3 + j,
                &mut best_overlap,
                &mut best_case,
            ) {
                return None;
            }
        }
    }

    debug_assert!(best_case != usize::MAX);

    if best_case < 3 {
        Some(point_face_contact(one, two, to_centre, best_case, best_overlap, false))
    } else if best_case < 6 {
        Some(point_face_contact(
            two,
            one,
            -to_centre,
            best_case - 3,
            best_overlap,
            true,
        ))
    } else {
        // edge-edge contact
        let case = best_case - 6;
        let one_axis_index = case / 3;
        let two_axis_index = case % 3;
        let one_axis = one.axis(one_axis_index);
        let two_axis = two.axis(two_axis_index);
        let mut axis = one_axis.cross(two_axis).normalize();
        if axis.dot(to_centre) > 0.0 {
            axis = -axis;
        }

        let mut pt_on_one = one.half_size;
        let mut pt_on_two = two.half_size;
        for i in 0..3 {
            if i == one_axis_index {
                set_component(&mut pt_on_one, i, 0.0);
            } else if one.axis(i).dot(axis) > 0.0 {
                let flipped = -component(pt_on_one, i);
                set_component(&mut pt_on_one, i, flipped);
            }

            if i == two_axis_index {
                set_component(&mut pt_on_two, i, 0.0);
            } else if two.axis(i).dot(axis) < 0.0 {
                let flipped = -component(pt_on_two, i);
                set_component(&mut pt_on_two, i, flipped);
            }
        }

        let pt_on_one = one.transform.transform_point3(pt_on_one);
        let pt_on_two = two.transform.transform_point3(pt_on_two);

        let point = edge_contact_point(
            pt_on_one,
            one_axis,
            one.half(one_axis_index),
            pt_on_two,
            two_axis,
            two.half(two_axis_index),
            best_single_axis > 2,
        );

        Some(CollisionInfo {
            normal: axis,
            point,
            penetration: best_overlap,
            flip: false,
        })
    }
}

/// Tests one candidate axis, keeping the smallest positive overlap seen
/// so far. Returns false when the axis separates the boxes.
#[allow(clippy::too_many_arguments)]
fn try_axis(
    one: &BoxShape,
    two: &BoxShape,
    axis: Vec3,
    to_centre: Vec3,
    index: usize,
    best_overlap: &mut f32,
    best_case: &mut usize,
) -> bool {
    if axis.length_squared() < 1e-4 {
        return true; // near-parallel edge cross, skip
    }
    let axis = axis.normalize();
    let overlap = penetration_on_axis(one, two, axis, to_centre);
    if overlap < 0.0 {
        return false;
    }
    if overlap < *best_overlap {
        *best_overlap = overlap;
        *best_case = index;
    }
    true
}

/// Overlap of the two boxes projected onto `axis`; negative means the
/// axis separates them.
fn penetration_on_axis(one: &BoxShape, two: &BoxShape, axis: Vec3, to_centre: Vec3) -> f32 {
    let one_project = project_to_axis(one, axis);
    let two_project = project_to_axis(two, axis);
    let distance = to_centre.dot(axis).abs();
    one_project + two_project - distance
}

fn project_to_axis(shape: &BoxShape, axis: Vec3) -> f32 {
    shape.half_size.x * axis.dot(shape.axis(0)).abs()
        + shape.half_size.y * axis.dot(shape.axis(1)).abs()
        + shape.half_size.z * axis.dot(shape.axis(2)).abs()
}

/// Face of `one` against a vertex of `two`.
fn point_face_contact(
    one: &BoxShape,
    two: &BoxShape,
    to_centre: Vec3,
    axis_index: usize,
    penetration: f32,
    flip: bool,
) -> CollisionInfo {
    let mut normal = one.axis(axis_index);
    if normal.dot(to_centre) > 0.0 {
        normal = -normal;
    }

    let mut vertex = two.half_size;
    for i in 0..3 {
        if two.axis(i).dot(normal) < 0.0 {
            let flipped = -component(vertex, i);
            set_component(&mut vertex, i, flipped);
        }
    }

    CollisionInfo {
        normal,
        point: two.transform.transform_point3(vertex),
        penetration,
        flip,
    }
}

#[allow(clippy::too_many_arguments)]
fn edge_contact_point(
    p_one: Vec3,
    d_one: Vec3,
    one_size: f32,
    p_two: Vec3,
    d_two: Vec3,
    two_size: f32,
    use_one: bool,
) -> Vec3 {
    let sm_one = d_one.length_squared();
    let sm_two = d_two.length_squared();
    let dp_one_two = d_two.dot(d_one);

    let to_st = p_one - p_two;
    let dp_sta_one = d_one.dot(to_st);
    let dp_sta_two = d_two.dot(to_st);

    let denom = sm_one * sm_two - dp_one_two * dp_one_two;
    if denom.abs() < 1e-4 {
        return if use_one { p_one } else { p_two };
    }

    let mua = (dp_one_two * dp_sta_two - sm_two * dp_sta_one) / denom;
    let mub = (sm_one * dp_sta_two - dp_one_two * dp_sta_one) / denom;

    if mua > one_size || mua < -one_size || mub > two_size || mub < -two_size {
        if use_one {
            p_one
        } else {
            p_two
        }
    } else {
        (p_one + d_one * mua) * 0.5 + (p_two + d_two * mub) * 0.5
    }
}

fn component(v: Vec3, index: usize) -> f32 {
    match index {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

fn set_component(v: &mut Vec3, index: usize, value: f32) {
    match index {
        0 => v.x = value,
        1 => v.y = value,
        _ => v.z = value,
    }
}
