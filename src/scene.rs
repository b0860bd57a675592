//! Static scene content: cube placements, the material, and the point light.

use glam::{Mat4, Vec3};

use crate::shader::Uniforms;

/// Rotation axis shared by every instance.
const INSTANCE_AXIS: Vec3 = Vec3::new(1.0, 0.3, 0.5);

/// Degrees per second added to each instance's angle while spinning.
const SPIN_RATE: f32 = 50.0;

/// Where a light's ambient and diffuse terms come from its color.
const LIGHT_DIFFUSE_FACTOR: f32 = 0.5;
const LIGHT_AMBIENT_FACTOR: f32 = 0.2;

/// Placement of one cube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneInstance {
    pub offset: Vec3,
    /// Fixed rotation in degrees around the shared instance axis.
    pub angle: f32,
}

impl SceneInstance {
    pub fn new(offset: impl Into<Vec3>, angle: f32) -> Self {
        Self {
            offset: offset.into(),
            angle,
        }
    }

    /// Translate by the offset, then rotate by the static angle plus
    /// `spin_degrees`.
    pub fn model_matrix(&self, spin_degrees: f32) -> Mat4 {
        let angle = (self.angle + spin_degrees).to_radians();
        Mat4::from_translation(self.offset)
            * Mat4::from_axis_angle(INSTANCE_AXIS.normalize(), angle)
    }
}

/// The ten cubes of the default scene, each turned 20° further than the last.
pub fn default_instances() -> Vec<SceneInstance> {
    [
        [0.0, 0.0, 0.0],
        [2.0, 5.0, -15.0],
        [-1.5, -2.2, -2.5],
        [-3.8, -2.0, -12.3],
        [2.4, -0.4, -3.5],
        [-1.7, 3.0, -7.5],
        [1.3, -2.0, -2.5],
        [1.5, 2.0, -2.5],
        [1.5, 0.2, -1.5],
        [-1.3, 1.0, -1.5],
    ]
    .into_iter()
    .enumerate()
    .map(|(i, offset)| SceneInstance::new(offset, 20.0 * i as f32))
    .collect()
}

/// Extra rotation in degrees applied to every instance at `time` seconds.
pub fn spin_angle(spin: bool, time: f32) -> f32 {
    if spin { time * SPIN_RATE } else { 0.0 }
}

/// Blend factor between the two material textures, oscillating in [0, 1].
pub fn texture_mix(time: f32) -> f32 {
    time.sin() / 2.0 + 0.5
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::new(1.0, 0.5, 0.31),
            diffuse: Vec3::new(1.0, 0.5, 0.31),
            specular: Vec3::splat(0.5),
            shininess: 32.0,
        }
    }
}

/// Light terms for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

/// Lighting setup for the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub material: Material,
    pub light_position: Vec3,
    /// Modulate each color channel with its own sine of time.
    pub dynamic_color: bool,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            material: Material::default(),
            light_position: Vec3::new(1.2, 1.0, 2.0),
            dynamic_color: false,
        }
    }
}

impl Lighting {
    /// The light's color at `time`; constant white unless dynamic.
    pub fn light_color(&self, time: f32) -> Vec3 {
        if self.dynamic_color {
            Vec3::new((time * 2.0).sin(), (time * 0.7).sin(), (time * 1.3).sin())
        } else {
            Vec3::ONE
        }
    }

    pub fn light_at(&self, time: f32) -> PointLight {
        let color = self.light_color(time);
        let diffuse = color * LIGHT_DIFFUSE_FACTOR;
        PointLight {
            position: self.light_position,
            color,
            ambient: diffuse * LIGHT_AMBIENT_FACTOR,
            diffuse,
            specular: Vec3::ONE,
        }
    }

    /// Upload material, light and eye position.
    pub fn apply(&self, uniforms: &mut impl Uniforms, time: f32, view_position: Vec3) {
        let light = self.light_at(time);
        uniforms.set_vec3("view_pos", view_position);
        uniforms.set_vec3("material.ambient", self.material.ambient);
        uniforms.set_vec3("material.diffuse", self.material.diffuse);
        uniforms.set_vec3("material.specular", self.material.specular);
        uniforms.set_float("material.shininess", self.material.shininess);
        uniforms.set_vec3("light.position", light.position);
        uniforms.set_vec3("light.ambient", light.ambient);
        uniforms.set_vec3("light.diffuse", light.diffuse);
        uniforms.set_vec3("light.specular", light.specular);
    }

    /// Model matrix of the small cube drawn at the light.
    pub fn marker_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.light_position) * Mat4::from_scale(Vec3::splat(0.2))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Recorded(HashMap<String, Vec<f32>>);

    impl Uniforms for Recorded {
        fn set_bool(&mut self, name: &str, value: bool) {
            self.0.insert(name.into(), vec![value as u32 as f32]);
        }
        fn set_int(&mut self, name: &str, value: i32) {
            self.0.insert(name.into(), vec![value as f32]);
        }
        fn set_float(&mut self, name: &str, value: f32) {
            self.0.insert(name.into(), vec![value]);
        }
        fn set_vec3(&mut self, name: &str, value: Vec3) {
            self.0.insert(name.into(), value.to_array().to_vec());
        }
        fn set_vec4(&mut self, name: &str, value: glam::Vec4) {
            self.0.insert(name.into(), value.to_array().to_vec());
        }
        fn set_mat4(&mut self, name: &str, value: Mat4) {
            self.0.insert(name.into(), value.to_cols_array().to_vec());
        }
    }

    #[test]
    fn static_light_is_white() {
        let lighting = Lighting::default();
        for t in [0.0, 1.0, 17.5] {
            assert_eq!(lighting.light_color(t), Vec3::ONE);
        }
        let light = lighting.light_at(3.0);
        assert_eq!(light.diffuse, Vec3::splat(0.5));
        assert!((light.ambient - Vec3::splat(0.1)).length() < 1e-6);
    }

    #[test]
    fn dynamic_light_channels_are_out_of_phase() {
        let lighting = Lighting {
            dynamic_color: true,
            ..Lighting::default()
        };
        let color = lighting.light_color(1.0);
        assert!((color.x - 2f32.sin()).abs() < 1e-6);
        assert!((color.y - 0.7f32.sin()).abs() < 1e-6);
        assert!((color.z - 1.3f32.sin()).abs() < 1e-6);
        assert!(color.x != color.y && color.y != color.z);

        let light = lighting.light_at(1.0);
        assert!((light.ambient - color * 0.1).length() < 1e-6);
    }

    #[test]
    fn apply_sets_material_and_light() {
        let lighting = Lighting::default();
        let mut recorded = Recorded::default();
        lighting.apply(&mut recorded, 0.0, Vec3::new(0.0, 0.0, 3.0));

        assert_eq!(recorded.0["view_pos"], vec![0.0, 0.0, 3.0]);
        assert_eq!(recorded.0["material.shininess"], vec![32.0]);
        assert_eq!(recorded.0["light.position"], vec![1.2, 1.0, 2.0]);
        assert_eq!(recorded.0["light.specular"], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn instances_are_unique_and_rotated_progressively() {
        let instances = default_instances();
        assert_eq!(instances.len(), 10);
        for (i, instance) in instances.iter().enumerate() {
            assert_eq!(instance.angle, 20.0 * i as f32);
        }
    }

    #[test]
    fn model_matrix_translates_to_offset() {
        let instance = SceneInstance::new([2.0, 5.0, -15.0], 40.0);
        let origin = instance.model_matrix(123.0).transform_point3(Vec3::ZERO);
        assert!((origin - instance.offset).length() < 1e-5);
    }

    #[test]
    fn spin_adds_to_static_angle() {
        let instance = SceneInstance::new([0.0, 0.0, 0.0], 30.0);
        let spun = instance.model_matrix(spin_angle(true, 0.2));
        let fixed = SceneInstance::new([0.0, 0.0, 0.0], 40.0).model_matrix(0.0);
        assert!(spun.abs_diff_eq(fixed, 1e-5));
        assert_eq!(spin_angle(false, 10.0), 0.0);
    }

    #[test]
    fn texture_mix_stays_in_unit_range() {
        for step in 0..200 {
            let mix = texture_mix(step as f32 * 0.37);
            assert!((0.0..=1.0).contains(&mix));
        }
    }
}
