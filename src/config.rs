use crate::physics::BodyType;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub title: String,

    /// Id of the canvas element the web build renders into
    pub canvas_id: String,

    pub width: u32,
    pub height: u32,

    /// Directory holding the vertex and fragment shader sources.
    /// Read from disk natively and fetched relative to the page on the web.
    pub shader_directory: String,
    pub vertex_shader: String,
    pub fragment_shader: String,

    pub clear_color: nalgebra_glm::Vec4,
    pub view: ViewBounds,

    pub pixels_per_meter: f32,
    pub gravity: nalgebra_glm::Vec2,

    /// Upper bound for a single simulation step, in milliseconds
    pub max_time_step_ms: f64,
    pub velocity_iterations: usize,
    pub position_iterations: usize,

    pub ground: BodyConfig,
    pub falling_box: BodyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Tumble".to_string(),
            canvas_id: "renderCanvas".to_string(),
            width: 600,
            height: 600,
            shader_directory: default_shader_directory().to_string(),
            vertex_shader: "default.vert.wgsl".to_string(),
            fragment_shader: "default.frag.wgsl".to_string(),
            clear_color: nalgebra_glm::vec4(0.2, 0.2, 0.2, 1.0),
            view: ViewBounds::default(),
            pixels_per_meter: 30.0,
            gravity: nalgebra_glm::vec2(0.0, -3.0),
            max_time_step_ms: 1.0 / 60.0 * 1000.0,
            velocity_iterations: 3,
            position_iterations: 2,
            ground: BodyConfig {
                name: "Ground".to_string(),
                body_type: BodyType::Static,
                position: nalgebra_glm::vec2(100.0, 15.0),
                size: nalgebra_glm::vec2(190.0, 19.0),
                angle_degrees: 0.0,
                color: nalgebra_glm::vec3(0.77, 0.37, 0.06),
                density: 0.0,
                follows_rotation: false,
            },
            falling_box: BodyConfig {
                name: "Box".to_string(),
                body_type: BodyType::Dynamic,
                position: nalgebra_glm::vec2(100.0, 150.0),
                size: nalgebra_glm::vec2(20.0, 20.0),
                angle_degrees: 40.0,
                color: nalgebra_glm::vec3(0.1, 0.3, 0.9),
                density: 1.0,
                follows_rotation: true,
            },
        }
    }
}

impl Config {
    pub fn shader_path(&self, file_name: &str) -> String {
        let directory = self.shader_directory.trim_end_matches('/');
        if directory.is_empty() {
            return file_name.to_string();
        }
        format!("{directory}/{file_name}")
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_shader_directory() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/assets/shaders")
}

#[cfg(target_arch = "wasm32")]
fn default_shader_directory() -> &'static str {
    "assets/shaders"
}

/// A box-shaped body, described in pixel units
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BodyConfig {
    pub name: String,
    pub body_type: BodyType,
    pub position: nalgebra_glm::Vec2,
    pub size: nalgebra_glm::Vec2,
    pub angle_degrees: f32,
    pub color: nalgebra_glm::Vec3,
    pub density: f32,

    /// When false the body is always drawn unrotated
    pub follows_rotation: bool,
}

/// Orthographic view volume, in pixels
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ViewBounds {
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 200.0,
            bottom: 0.0,
            top: 200.0,
            near: 0.0,
            far: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_constants() {
        let config = Config::default();
        assert_eq!(config.canvas_id, "renderCanvas");
        assert_eq!(config.pixels_per_meter, 30.0);
        assert_eq!(config.velocity_iterations, 3);
        assert_eq!(config.position_iterations, 2);
        assert!((config.max_time_step_ms - 16.666_666).abs() < 1e-3);
        assert_eq!(config.ground.body_type, BodyType::Static);
        assert_eq!(config.falling_box.body_type, BodyType::Dynamic);
        assert_eq!(config.ground.density, 0.0);
        assert_eq!(config.falling_box.density, 1.0);
    }

    #[test]
    fn shader_path_joins_directory() {
        let mut config = Config {
            shader_directory: "assets/shaders/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.shader_path("default.vert.wgsl"),
            "assets/shaders/default.vert.wgsl"
        );

        config.shader_directory = String::new();
        assert_eq!(config.shader_path("default.frag.wgsl"), "default.frag.wgsl");
    }

    #[test]
    fn config_survives_serde_round_trip() {
        let mut config = Config::default();
        config.view.far = 4.0;
        config.gravity = nalgebra_glm::vec2(0.0, -9.8);
        config.falling_box.name = "Crate".to_string();
        config.falling_box.angle_degrees = 15.0;

        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.title, config.title);
        assert_eq!(restored.canvas_id, config.canvas_id);
        assert_eq!(restored.shader_directory, config.shader_directory);
        assert_eq!(restored.clear_color, config.clear_color);
        assert_eq!(restored.view, config.view);
        assert_eq!(restored.gravity, config.gravity);
        assert_eq!(restored.max_time_step_ms, config.max_time_step_ms);
        assert_eq!(restored.velocity_iterations, 3);
        assert_eq!(restored.position_iterations, 2);

        for (restored, original) in [
            (&restored.ground, &config.ground),
            (&restored.falling_box, &config.falling_box),
        ] {
            assert_eq!(restored.name, original.name);
            assert_eq!(restored.body_type, original.body_type);
            assert_eq!(restored.position, original.position);
            assert_eq!(restored.size, original.size);
            assert_eq!(restored.angle_degrees, original.angle_degrees);
            assert_eq!(restored.color, original.color);
            assert_eq!(restored.density, original.density);
            assert_eq!(restored.follows_rotation, original.follows_rotation);
        }
    }
}
