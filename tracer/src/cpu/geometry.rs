use decorum::N32;

use crate::common::math::{Point3, Vec3};
use crate::common::scene::{Object, Shape};

/// Hits closer than this are ignored to avoid self-intersection.
pub const HIT_EPSILON: f32 = 0.0001;

#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub start: Point3,
    /// Always normalized.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Point3 {
        self.start + self.direction * t
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Hit {
    pub t: f32,
    pub point: Point3,
    /// Geometric normal, not necessarily facing the ray.
    pub normal: Vec3,
}

pub trait Intersect {
    fn intersect(&self, ray: &Ray) -> Option<Hit>;
}

impl Intersect for Shape {
    fn intersect(&self, ray: &Ray) -> Option<Hit> {
        match *self {
            Shape::Sphere { center, radius } => intersect_sphere(center, radius, ray),
            Shape::Plane { point, normal } => intersect_plane(point, normal, ray),
            Shape::Triangle { a, b, c } => intersect_triangle(a, b, c, ray),
        }
    }
}

impl Intersect for Object {
    fn intersect(&self, ray: &Ray) -> Option<Hit> {
        self.shape.intersect(ray)
    }
}

fn intersect_sphere(center: Point3, radius: f32, ray: &Ray) -> Option<Hit> {
    let rel = ray.start - center;

    // solve quadratic equation, direction is normalized so a == 1
    let b = 2.0 * rel.dot(ray.direction);
    let c = rel.norm_squared() - radius * radius;

    let d = b * b - 4.0 * c;
    if d < 0.0 {
        return None;
    }

    let t_near = (-b - d.sqrt()) / 2.0;
    let t_far = (-b + d.sqrt()) / 2.0;

    // closest solution in front of the ray
    let t = if t_near > HIT_EPSILON { t_near } else if t_far > HIT_EPSILON { t_far } else { return None };

    let point = ray.at(t);
    Some(Hit { t, point, normal: (point - center) / radius })
}

fn intersect_plane(point: Point3, normal: Vec3, ray: &Ray) -> Option<Hit> {
    let num = normal.dot(ray.start - point);
    let den = normal.dot(ray.direction);
    let t = -num / den;

    if !t.is_finite() || t < HIT_EPSILON {
        None
    } else {
        Some(Hit { t, point: ray.at(t), normal })
    }
}

/// Möller–Trumbore.
fn intersect_triangle(a: Point3, b: Point3, c: Point3, ray: &Ray) -> Option<Hit> {
    let edge_b = b - a;
    let edge_c = c - a;

    let p = ray.direction.cross(edge_c);
    let det = edge_b.dot(p);
    if det.abs() < f32::EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let rel = ray.start - a;
    let u = rel.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = rel.cross(edge_b);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge_c.dot(q) * inv_det;
    if t < HIT_EPSILON {
        return None;
    }

    Some(Hit { t, point: ray.at(t), normal: edge_b.cross(edge_c).normalized() })
}

/// Brute force search for the closest hit, returns the index of the object that was hit.
pub fn first_hit<'a>(objects: impl IntoIterator<Item=&'a Object>, ray: &Ray) -> Option<(usize, Hit)> {
    objects.into_iter().enumerate()
        .filter_map(|(index, object)| {
            object.intersect(ray).map(|hit| (index, hit))
        })
        .min_by_key(|(_, hit)| N32::from_inner(hit.t))
}
