//! Scene file loading.
//!
//! Two formats are understood, chosen by file extension:
//! * `.json`: the compact scene description below, deserialized with serde.
//! * `.obj`: a Wavefront mesh, framed by an automatic camera and lit by the sky.

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use wavefront_obj::obj;

use crate::common::math::{Point3, Vec3};
use crate::common::scene::{Camera, Color, Integrator, Material, Object, Scene, Shape, BLACK, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::common::util::{obj_to_triangles, triangle_bounds, Placement};

const OBJ_SKY: Color = Color { red: 0.8, green: 0.8, blue: 0.8, standard: std::marker::PhantomData };
const OBJ_ALBEDO: Color = Color { red: 0.6, green: 0.6, blue: 0.6, standard: std::marker::PhantomData };

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read {path}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("invalid scene description {path}")]
    Description { path: PathBuf, #[source] source: serde_json::Error },
    #[error("invalid obj file {path}: {message}")]
    Obj { path: PathBuf, message: String },
    #[error("{path} does not contain any triangles")]
    EmptyMesh { path: PathBuf },
    #[error("invalid scene {path}: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("unsupported scene format {0}, expected .json or .obj")]
    UnsupportedFormat(PathBuf),
}

pub fn load_scene(path: &Path) -> Result<Scene, SceneError> {
    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let scene = match extension.as_deref() {
        Some("json") => load_description(path)?,
        Some("obj") => load_obj_scene(path)?,
        _ => return Err(SceneError::UnsupportedFormat(path.to_owned())),
    };

    debug!("loaded {} with {} objects", path.display(), scene.objects.len());
    Ok(scene)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneDescription {
    #[serde(default)]
    camera: CameraDescription,
    #[serde(default)]
    background: Option<[f32; 3]>,
    #[serde(default)]
    integrator: IntegratorDescription,
    #[serde(default)]
    objects: Vec<ObjectDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CameraDescription {
    width: u32,
    height: u32,
    /// degrees
    fov: f32,
    position: [f32; 3],
    target: [f32; 3],
    up: [f32; 3],
}

impl Default for CameraDescription {
    fn default() -> Self {
        CameraDescription {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fov: 45.0,
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct IntegratorDescription {
    samples: u32,
    max_bounces: u32,
}

impl Default for IntegratorDescription {
    fn default() -> Self {
        let integrator = Integrator::default();
        IntegratorDescription { samples: integrator.samples, max_bounces: integrator.max_bounces }
    }
}

#[derive(Debug, Default, Copy, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MaterialDescription {
    albedo: Option<[f32; 3]>,
    emission: Option<[f32; 3]>,
}

impl MaterialDescription {
    fn material(self) -> Material {
        Material {
            albedo: self.albedo.map_or(OBJ_ALBEDO, color),
            emission: self.emission.map_or(BLACK, color),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum ObjectDescription {
    Sphere {
        center: [f32; 3],
        radius: f32,
        #[serde(default)]
        material: MaterialDescription,
    },
    Plane {
        point: [f32; 3],
        normal: [f32; 3],
        #[serde(default)]
        material: MaterialDescription,
    },
    /// Wavefront mesh, `path` is relative to the scene file.
    Mesh {
        path: PathBuf,
        #[serde(default)]
        offset: [f32; 3],
        #[serde(default = "default_scale")]
        scale: f32,
        #[serde(default)]
        material: MaterialDescription,
    },
}

fn default_scale() -> f32 {
    1.0
}

fn color(c: [f32; 3]) -> Color {
    Color::new(c[0], c[1], c[2])
}

fn load_description(path: &Path) -> Result<Scene, SceneError> {
    let text = read_to_string(path)
        .map_err(|source| SceneError::Io { path: path.to_owned(), source })?;
    let description: SceneDescription = serde_json::from_str(&text)
        .map_err(|source| SceneError::Description { path: path.to_owned(), source })?;

    let invalid = |message: String| SceneError::Invalid { path: path.to_owned(), message };
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut objects = vec![];
    for object in description.objects {
        match object {
            ObjectDescription::Sphere { center, radius, material } => {
                if !(radius > 0.0) {
                    return Err(invalid(format!("sphere radius must be positive, got {}", radius)));
                }
                objects.push(Object {
                    shape: Shape::Sphere { center: Point3::from_array(center), radius },
                    material: material.material(),
                });
            }
            ObjectDescription::Plane { point, normal, material } => {
                let normal = Vec3::from_array(normal).try_normalized()
                    .ok_or_else(|| invalid("plane normal must be non-zero".to_owned()))?;
                objects.push(Object {
                    shape: Shape::Plane { point: Point3::from_array(point), normal },
                    material: material.material(),
                });
            }
            ObjectDescription::Mesh { path: mesh_path, offset, scale, material } => {
                let placement = Placement { scale, offset: Vec3::from_array(offset) };
                objects.extend(load_obj_triangles(&base.join(mesh_path), material.material(), placement)?);
            }
        }
    }

    let c = description.camera;
    if c.width == 0 || c.height == 0 {
        return Err(invalid(format!("camera size must be non-zero, got {}x{}", c.width, c.height)));
    }
    let mut camera = Camera {
        full_width: c.width,
        full_height: c.height,
        fov: c.fov.to_radians(),
        position: Point3::from_array(c.position),
        target: Point3::from_array(c.target),
        up: Vec3::from_array(c.up),
        ..Camera::default()
    };
    camera.compute_auto_viewplane();

    Ok(Scene {
        camera,
        background: description.background.map_or(BLACK, color),
        integrator: Integrator {
            samples: description.integrator.samples,
            max_bounces: description.integrator.max_bounces,
        },
        objects,
        passes: vec![],
    })
}

fn load_obj_triangles(path: &Path, material: Material, placement: Placement) -> Result<Vec<Object>, SceneError> {
    let obj_string = read_to_string(path)
        .map_err(|source| SceneError::Io { path: path.to_owned(), source })?;
    let object_set = obj::parse(obj_string)
        .map_err(|e| SceneError::Obj { path: path.to_owned(), message: format!("{:?}", e) })?;

    let triangles: Vec<Object> = object_set.objects.iter()
        .flat_map(|o| obj_to_triangles(o, material, placement))
        .collect();

    if triangles.is_empty() {
        return Err(SceneError::EmptyMesh { path: path.to_owned() });
    }
    Ok(triangles)
}

fn load_obj_scene(path: &Path) -> Result<Scene, SceneError> {
    let objects = load_obj_triangles(path, Material::diffuse(OBJ_ALBEDO), Placement::default())?;
    let (min, max) = triangle_bounds(&objects)
        .ok_or_else(|| SceneError::EmptyMesh { path: path.to_owned() })?;

    // frame the mesh from the front, slightly above its center
    let center = (min + max) / 2.0;
    let radius = ((max - min).norm() / 2.0).max(f32::EPSILON);
    let mut camera = Camera {
        position: center + Vec3::new(0.0, radius * 0.5, radius * 2.5),
        target: center,
        ..Camera::default()
    };
    camera.compute_auto_viewplane();

    Ok(Scene {
        camera,
        background: OBJ_SKY,
        objects,
        ..Scene::default()
    })
}
