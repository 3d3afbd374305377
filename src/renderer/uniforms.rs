//! Named uniforms and the GPU-side blocks they land in.
//!
//! The frame code publishes values by name, the way a GL program would look
//! up uniform locations. Each shader program owns one `#[repr(C)]` block;
//! names the block does not know are skipped and reported back as `false`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::renderer::backend::ShaderProgram;
use crate::scene::MAX_POINT_LIGHTS;

/// Value published to a named uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Vec3Array([Vec3; MAX_POINT_LIGHTS]),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<[Vec3; MAX_POINT_LIGHTS]> for UniformValue {
    fn from(v: [Vec3; MAX_POINT_LIGHTS]) -> Self {
        UniformValue::Vec3Array(v)
    }
}

/// A uniform block that accepts values by name
pub trait UniformBlock: Pod {
    /// Store `value` under `name`. Returns false when the block has no such
    /// uniform or the value has the wrong type.
    fn set(&mut self, name: &str, value: UniformValue) -> bool;

    fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

fn put_mat4(slot: &mut [[f32; 4]; 4], value: UniformValue) -> bool {
    match value {
        UniformValue::Mat4(m) => {
            *slot = m.to_cols_array_2d();
            true
        }
        _ => false,
    }
}

fn put_vec3(slot: &mut [f32; 4], value: UniformValue) -> bool {
    match value {
        UniformValue::Vec3(v) => {
            *slot = [v.x, v.y, v.z, slot[3]];
            true
        }
        UniformValue::Vec4(v) => {
            *slot = v.to_array();
            true
        }
        _ => false,
    }
}

fn put_float(slot: &mut f32, value: UniformValue) -> bool {
    match value {
        UniformValue::Float(v) => {
            *slot = v;
            true
        }
        _ => false,
    }
}

fn put_flag(slot: &mut u32, value: UniformValue) -> bool {
    match value {
        UniformValue::Bool(v) => {
            *slot = v as u32;
            true
        }
        UniformValue::Int(v) => {
            *slot = (v != 0) as u32;
            true
        }
        _ => false,
    }
}

/// Uniforms of the lit scene program
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
    pub fog_color: [f32; 4],
    pub point_light_positions: [[f32; 4]; MAX_POINT_LIGHTS],
    pub point_light_color: [f32; 4],
    /// brightness, thunder brightness, time, fog density
    pub lighting: [f32; 4],
    /// ambient, diffuse, specular, constant attenuation
    pub point_light_terms: [f32; 4],
    /// linear attenuation, quadratic attenuation
    pub attenuation: [f32; 4],
    /// fog, wind, point lights, rain
    pub flags: [u32; 4],
    /// number of point lights
    pub counts: [u32; 4],
}

impl Default for SceneUniform {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: identity,
            projection: identity,
            light_space: identity,
            light_dir: [0.0, -1.0, 0.0, 0.0],
            light_color: [1.0, 1.0, 1.0, 1.0],
            fog_color: [0.5, 0.5, 0.5, 1.0],
            point_light_positions: [[0.0; 4]; MAX_POINT_LIGHTS],
            point_light_color: [1.0, 1.0, 1.0, 1.0],
            lighting: [1.0, 1.0, 0.0, 0.0],
            point_light_terms: [0.0, 0.0, 0.0, 1.0],
            attenuation: [0.0; 4],
            flags: [0; 4],
            counts: [0; 4],
        }
    }
}

impl UniformBlock for SceneUniform {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match name {
            "view" => put_mat4(&mut self.view, value),
            "projection" => put_mat4(&mut self.projection, value),
            "lightSpaceTrMatrix" => put_mat4(&mut self.light_space, value),
            "lightDir" => put_vec3(&mut self.light_dir, value),
            "lightColor" => put_vec3(&mut self.light_color, value),
            "fogColor" => put_vec3(&mut self.fog_color, value),
            "pointLightColor" => put_vec3(&mut self.point_light_color, value),
            "pointLightPositions" => match value {
                UniformValue::Vec3Array(positions) => {
                    for (slot, p) in self.point_light_positions.iter_mut().zip(positions) {
                        *slot = [p.x, p.y, p.z, 1.0];
                    }
                    true
                }
                _ => false,
            },
            "lightBrightness" => put_float(&mut self.lighting[0], value),
            "thunderBrightness" => put_float(&mut self.lighting[1], value),
            "time" => put_float(&mut self.lighting[2], value),
            "fogDensity" => put_float(&mut self.lighting[3], value),
            "pointLightAmbient" => put_float(&mut self.point_light_terms[0], value),
            "pointLightDiffuse" => put_float(&mut self.point_light_terms[1], value),
            "pointLightSpecular" => put_float(&mut self.point_light_terms[2], value),
            "constantAtt" => put_float(&mut self.point_light_terms[3], value),
            "linearAtt" => put_float(&mut self.attenuation[0], value),
            "quadraticAtt" => put_float(&mut self.attenuation[1], value),
            "enableFog" => put_flag(&mut self.flags[0], value),
            "enableWind" => put_flag(&mut self.flags[1], value),
            "enablePointLight" => put_flag(&mut self.flags[2], value),
            "rainEnabled" => put_flag(&mut self.flags[3], value),
            "numPointLights" => match value {
                UniformValue::Int(n) => {
                    self.counts[0] = n.clamp(0, MAX_POINT_LIGHTS as i32) as u32;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}

/// Uniforms of the depth-only shadow program
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowUniform {
    pub light_space: [[f32; 4]; 4],
    /// time, wind enabled
    pub params: [f32; 4],
}

impl Default for ShadowUniform {
    fn default() -> Self {
        Self {
            light_space: Mat4::IDENTITY.to_cols_array_2d(),
            params: [0.0; 4],
        }
    }
}

impl UniformBlock for ShadowUniform {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            ("lightSpaceTrMatrix", value) => put_mat4(&mut self.light_space, value),
            ("time", value) => put_float(&mut self.params[0], value),
            ("enableWind", UniformValue::Bool(enabled)) => {
                self.params[1] = if enabled { 1.0 } else { 0.0 };
                true
            }
            _ => false,
        }
    }
}

/// Shared layout of the unlit programs: camera matrices plus one colour
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ColorUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ColorUniform {
    fn with_color(color: Vec3) -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: identity,
            projection: identity,
            color: color.extend(1.0).to_array(),
        }
    }

    fn set_named(&mut self, color_name: &str, name: &str, value: UniformValue) -> bool {
        match name {
            "view" => put_mat4(&mut self.view, value),
            "projection" => put_mat4(&mut self.projection, value),
            n if n == color_name => put_vec3(&mut self.color, value),
            _ => false,
        }
    }
}

/// Sun marker program
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightUniform(pub ColorUniform);

impl Default for LightUniform {
    fn default() -> Self {
        Self(ColorUniform::with_color(Vec3::ONE))
    }
}

impl UniformBlock for LightUniform {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        self.0.set_named("lightColor", name, value)
    }
}

/// Rain line program
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RainUniform(pub ColorUniform);

impl Default for RainUniform {
    fn default() -> Self {
        Self(ColorUniform::with_color(Vec3::Z))
    }
}

impl UniformBlock for RainUniform {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        self.0.set_named("rainColor", name, value)
    }
}

/// Gradient skybox program
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SkyboxUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub zenith: [f32; 4],
    pub horizon: [f32; 4],
}

impl SkyboxUniform {
    pub const DAY_ZENITH: Vec3 = Vec3::new(0.25, 0.45, 0.8);
    pub const DAY_HORIZON: Vec3 = Vec3::new(0.75, 0.82, 0.9);
    pub const NIGHT_ZENITH: Vec3 = Vec3::new(0.01, 0.01, 0.05);
    pub const NIGHT_HORIZON: Vec3 = Vec3::new(0.08, 0.08, 0.18);

    pub fn set_night(&mut self, night: bool) {
        let (zenith, horizon) = if night {
            (Self::NIGHT_ZENITH, Self::NIGHT_HORIZON)
        } else {
            (Self::DAY_ZENITH, Self::DAY_HORIZON)
        };
        self.zenith = zenith.extend(1.0).to_array();
        self.horizon = horizon.extend(1.0).to_array();
    }
}

impl Default for SkyboxUniform {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        let mut uniform = Self {
            view: identity,
            projection: identity,
            zenith: [0.0; 4],
            horizon: [0.0; 4],
        };
        uniform.set_night(false);
        uniform
    }
}

impl UniformBlock for SkyboxUniform {
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match name {
            "view" => put_mat4(&mut self.view, value),
            "projection" => put_mat4(&mut self.projection, value),
            _ => false,
        }
    }
}

/// CPU copies of every program's uniform block
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramUniforms {
    pub scene: SceneUniform,
    pub shadow: ShadowUniform,
    pub light: LightUniform,
    pub rain: RainUniform,
    pub skybox: SkyboxUniform,
}

impl ProgramUniforms {
    /// Route a named value to the block of `program`. The full-screen depth
    /// quad has no uniforms.
    pub fn set(&mut self, program: ShaderProgram, name: &str, value: UniformValue) -> bool {
        let accepted = match program {
            ShaderProgram::Scene => self.scene.set(name, value),
            ShaderProgram::Shadow => self.shadow.set(name, value),
            ShaderProgram::Light => self.light.set(name, value),
            ShaderProgram::Rain => self.rain.set(name, value),
            ShaderProgram::Skybox => self.skybox.set(name, value),
            ShaderProgram::ScreenQuad => false,
        };
        if !accepted {
            log::trace!("[ProgramUniforms::set] {:?} has no uniform '{}'", program, name);
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ShadowUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ColorUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<SkyboxUniform>() % 16, 0);
    }

    #[test]
    fn test_scene_accepts_known_names() {
        let mut block = SceneUniform::default();
        assert!(block.set("lightBrightness", 0.5f32.into()));
        assert!(block.set("enableFog", true.into()));
        assert!(block.set("numPointLights", 4i32.into()));
        assert_eq!(block.lighting[0], 0.5);
        assert_eq!(block.flags[0], 1);
        assert_eq!(block.counts[0], 4);
    }

    #[test]
    fn test_unknown_name_is_skipped() {
        let mut block = SceneUniform::default();
        let before = *block.as_bytes().first().unwrap_or(&0);
        assert!(!block.set("doesNotExist", 1.0f32.into()));
        assert_eq!(*block.as_bytes().first().unwrap_or(&0), before);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut block = SceneUniform::default();
        assert!(!block.set("view", 1.0f32.into()));
        assert!(!block.set("fogDensity", Mat4::IDENTITY.into()));
    }

    #[test]
    fn test_programs_are_routed() {
        let mut uniforms = ProgramUniforms::default();
        assert!(uniforms.set(ShaderProgram::Rain, "rainColor", Vec3::new(0.0, 0.0, 1.0).into()));
        assert!(!uniforms.set(ShaderProgram::Scene, "rainColor", Vec3::ONE.into()));
        assert!(!uniforms.set(ShaderProgram::ScreenQuad, "view", Mat4::IDENTITY.into()));
        assert!(uniforms.set(ShaderProgram::Shadow, "enableWind", true.into()));
        assert_eq!(uniforms.shadow.params[1], 1.0);
    }

    #[test]
    fn test_skybox_night_colors() {
        let mut sky = SkyboxUniform::default();
        sky.set_night(true);
        assert_eq!(sky.zenith[..3], SkyboxUniform::NIGHT_ZENITH.to_array());
    }
}
