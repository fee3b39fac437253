use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::common::math::{Point3, Vec3};

pub type Color = palette::LinSrgb;

pub const BLACK: Color = Color { red: 0.0, green: 0.0, blue: 0.0, standard: PhantomData };
pub const WHITE: Color = Color { red: 1.0, green: 1.0, blue: 1.0, standard: PhantomData };

pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 512;
pub const DEFAULT_SAMPLES: u32 = 16;
pub const DEFAULT_MAX_BOUNCES: u32 = 8;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub albedo: Color,
    pub emission: Color,
}

impl Material {
    pub fn diffuse(albedo: Color) -> Material {
        Material { albedo, emission: BLACK }
    }

    pub fn is_light(&self) -> bool {
        self.emission != BLACK
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape {
    Sphere { center: Point3, radius: f32 },
    /// Infinite plane through `point`, `normal` must be normalized.
    Plane { point: Point3, normal: Vec3 },
    Triangle { a: Point3, b: Point3, c: Point3 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Object {
    pub shape: Shape,
    pub material: Material,
}

/// Screen window in camera space, the longest image axis spans `[-aspect, aspect]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewplane {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Default for Viewplane {
    fn default() -> Self {
        Viewplane { left: -1.0, right: 1.0, bottom: -1.0, top: 1.0 }
    }
}

/// Perspective camera looking from `position` towards `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub full_width: u32,
    pub full_height: u32,
    /// Field of view along the shortest image axis, in radians.
    pub fov: f32,
    pub position: Point3,
    pub target: Point3,
    pub up: Vec3,
    pub viewplane: Viewplane,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            full_width: DEFAULT_WIDTH,
            full_height: DEFAULT_HEIGHT,
            fov: 45f32.to_radians(),
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vec3::y_axis(),
            viewplane: Viewplane::default(),
        }
    }
}

impl Camera {
    pub fn compute_auto_viewplane(&mut self) {
        if self.full_width == 0 || self.full_height == 0 {
            self.viewplane = Viewplane::default();
            return;
        }

        let aspect = self.full_width as f32 / self.full_height as f32;
        self.viewplane = if self.full_width >= self.full_height {
            Viewplane { left: -aspect, right: aspect, bottom: -1.0, top: 1.0 }
        } else {
            Viewplane { left: -1.0, right: 1.0, bottom: -1.0 / aspect, top: 1.0 / aspect }
        };
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Integrator {
    pub samples: u32,
    pub max_bounces: u32,
}

impl Default for Integrator {
    fn default() -> Self {
        Integrator { samples: DEFAULT_SAMPLES, max_bounces: DEFAULT_MAX_BOUNCES }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PassType {
    Combined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub name: String,
    pub pass_type: PassType,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ShadingSystem {
    #[default]
    Svm,
    Osl,
}

impl ShadingSystem {
    pub fn name(self) -> &'static str {
        match self {
            ShadingSystem::Svm => "svm",
            ShadingSystem::Osl => "osl",
        }
    }
}

impl fmt::Display for ShadingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown shading system: {0}")]
pub struct UnknownShadingSystem(pub String);

impl FromStr for ShadingSystem {
    type Err = UnknownShadingSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "svm" => Ok(ShadingSystem::Svm),
            "osl" => Ok(ShadingSystem::Osl),
            other => Err(UnknownShadingSystem(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub background: Color,
    pub integrator: Integrator,
    pub objects: Vec<Object>,
    pub passes: Vec<Pass>,
}

impl Default for Scene {
    fn default() -> Self {
        Scene {
            camera: Camera::default(),
            background: BLACK,
            integrator: Integrator::default(),
            objects: vec![],
            passes: vec![],
        }
    }
}

impl Scene {
    /// Adds an output pass, replacing any earlier pass with the same name.
    pub fn add_pass(&mut self, name: &str, pass_type: PassType) {
        self.passes.retain(|p| p.name != name);
        self.passes.push(Pass { name: name.to_owned(), pass_type });
    }
}
