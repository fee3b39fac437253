use wavefront_obj::obj;
use wavefront_obj::obj::Primitive;

use crate::common::math::{Point3, Vec3};
use crate::common::scene::{Material, Object, Shape};

fn vertex_to_point(vertex: &obj::Vertex) -> Point3 {
    Point3::new(vertex.x as f32, vertex.y as f32, vertex.z as f32)
}

/// Placement applied to every vertex of an imported mesh, scale first.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub offset: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Placement { scale: 1.0, offset: Vec3::default() }
    }
}

impl Placement {
    fn apply(self, point: Point3) -> Point3 {
        point * self.scale + self.offset
    }
}

/// Converts all triangles of `obj` into scene objects, points and lines are skipped.
pub fn obj_to_triangles(obj: &obj::Object, material: Material, placement: Placement) -> impl Iterator<Item=Object> + '_ {
    obj.geometry.iter().flat_map(move |geometry|
        geometry.shapes.iter().filter_map(move |shape| {
            match shape.primitive {
                Primitive::Point(_) => None,
                Primitive::Line(_, _) => None,
                Primitive::Triangle((avi, _, _), (bvi, ..), (cvi, ..)) => {
                    let a = placement.apply(vertex_to_point(&obj.vertices[avi]));
                    let b = placement.apply(vertex_to_point(&obj.vertices[bvi]));
                    let c = placement.apply(vertex_to_point(&obj.vertices[cvi]));

                    // degenerate triangles have no normal and are never hit
                    (b - a).cross(c - a).try_normalized()?;

                    Some(Object {
                        shape: Shape::Triangle { a, b, c },
                        material,
                    })
                }
            }
        })
    )
}

/// Axis-aligned bounds of a set of triangles, `None` if there are none.
pub fn triangle_bounds<'a>(objects: impl IntoIterator<Item=&'a Object>) -> Option<(Point3, Point3)> {
    objects.into_iter()
        .filter_map(|object| match object.shape {
            Shape::Triangle { a, b, c } => Some((a.min(b).min(c), a.max(b).max(c))),
            _ => None,
        })
        .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
}
