use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::UnitDisc;

use crate::common::math::{Point3, Vec3};
use crate::common::progress::PixelResult;
use crate::common::scene::{Camera, Color, Scene, BLACK};
use crate::cpu::geometry::{first_hit, Hit, Ray};
use crate::cpu::stats::ColorVarianceEstimator;

#[derive(Debug, Copy, Clone)]
pub struct CpuRenderSettings {
    pub samples: u32,
    pub max_bounces: u32,
    pub anti_alias: bool,
}

pub struct RenderStructure<'a> {
    pub scene: &'a Scene,
    pub camera: RayCamera,
    pub settings: CpuRenderSettings,
}

impl RenderStructure<'_> {
    pub fn calculate_pixel(&self, rng: &mut impl Rng, x: u32, y: u32) -> PixelResult {
        let mut estimator = ColorVarianceEstimator::default();

        for _ in 0..self.settings.samples {
            let ray = self.camera.ray(rng, x, y);
            let color = trace_ray(self.scene, &ray, rng, self.settings.max_bounces);
            estimator.update(color);
        }

        estimator.result()
    }
}

/// Generates primary rays through the camera's viewplane.
#[derive(Debug, Clone)]
pub struct RayCamera {
    position: Point3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    tan_half_fov: f32,
    left: f32,
    top: f32,
    span_x: f32,
    span_y: f32,
    width: f32,
    height: f32,
    anti_alias: bool,
}

impl RayCamera {
    pub fn new(camera: &Camera, anti_alias: bool, width: u32, height: u32) -> RayCamera {
        let forward = (camera.target - camera.position).try_normalized().unwrap_or(-Vec3::z_axis());
        let right = forward.cross(camera.up).try_normalized().unwrap_or(Vec3::x_axis());
        let up = right.cross(forward);
        let viewplane = camera.viewplane;

        RayCamera {
            position: camera.position,
            forward,
            right,
            up,
            tan_half_fov: (camera.fov / 2.0).tan(),
            left: viewplane.left,
            top: viewplane.top,
            span_x: viewplane.right - viewplane.left,
            span_y: viewplane.top - viewplane.bottom,
            width: width as f32,
            height: height as f32,
            anti_alias,
        }
    }

    pub fn ray<R: Rng>(&self, rng: &mut R, x: u32, y: u32) -> Ray {
        let (dx, dy) = if self.anti_alias {
            rng.gen()
        } else {
            (0.5, 0.5)
        };

        let sx = self.left + (x as f32 + dx) / self.width * self.span_x;
        let sy = self.top - (y as f32 + dy) / self.height * self.span_y;

        let direction = self.forward
            + self.right * (sx * self.tan_half_fov)
            + self.up * (sy * self.tan_half_fov);

        Ray { start: self.position, direction: direction.normalized() }
    }
}

/// Naive diffuse path tracing: emission plus albedo times the light arriving from
/// a cosine-weighted direction.
fn trace_ray<R: Rng>(scene: &Scene, ray: &Ray, rng: &mut R, bounces_left: u32) -> Color {
    if bounces_left == 0 {
        return BLACK;
    }

    let Some((index, hit)) = first_hit(&scene.objects, ray) else {
        return scene.background;
    };
    let material = scene.objects[index].material;

    if material.albedo == BLACK {
        return material.emission;
    }

    let next = Ray { start: hit.point, direction: sample_cosine_direction(rng, facing_normal(&hit, ray)) };
    material.emission + material.albedo * trace_ray(scene, &next, rng, bounces_left - 1)
}

fn facing_normal(hit: &Hit, ray: &Ray) -> Vec3 {
    if hit.normal.dot(ray.direction) < 0.0 {
        hit.normal
    } else {
        -hit.normal
    }
}

fn sample_cosine_direction<R: Rng>(rng: &mut R, normal: Vec3) -> Vec3 {
    let [x, y]: [f32; 2] = UnitDisc.sample(rng);
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    let (tangent, bitangent) = normal.orthonormal_basis();
    (tangent * x + bitangent * y + normal * z).normalized()
}
