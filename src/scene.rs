use crate::{
    config::{BodyConfig, Config, ViewBounds},
    physics::{BodyDescriptor, FixtureShape, PhysicsWorld},
};
use nalgebra_glm as glm;

/// Fixed orthographic camera. Built once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    projection: glm::Mat4,
    view: glm::Mat4,
    projection_view: glm::Mat4,
}

impl Camera {
    pub fn orthographic(bounds: &ViewBounds) -> Self {
        let projection = glm::ortho_rh_zo(
            bounds.left,
            bounds.right,
            bounds.bottom,
            bounds.top,
            bounds.near,
            bounds.far,
        );
        let view = glm::look_at_rh(
            &glm::vec3(0.0, 0.0, 1.0),
            &glm::vec3(0.0, 0.0, 0.0),
            &glm::Vec3::y(),
        );
        Self {
            projection,
            view,
            projection_view: projection * view,
        }
    }

    pub fn projection(&self) -> &glm::Mat4 {
        &self.projection
    }

    pub fn view(&self) -> &glm::Mat4 {
        &self.view
    }

    pub fn projection_view(&self) -> &glm::Mat4 {
        &self.projection_view
    }
}

/// Render attributes paired with a simulated body
#[derive(Debug, Clone)]
pub struct VisualEntity {
    pub name: String,
    pub body: rapier2d::prelude::RigidBodyHandle,
    pub color: glm::Vec3,
    /// Display size in pixels
    pub size: glm::Vec3,
    pub follows_rotation: bool,
}

/// Everything needed to draw one unit quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadDraw {
    pub mvp: glm::Mat4,
    pub color: glm::Vec3,
}

/// Translate, then rotate about the viewing axis, then scale
pub fn model_matrix(position: &glm::Vec2, angle: f32, size: &glm::Vec3) -> glm::Mat4 {
    let model = glm::translation(&glm::vec3(position.x, position.y, 0.0));
    let model = glm::rotate_z(&model, angle);
    glm::scale(&model, size)
}

pub struct Scene {
    pub world: PhysicsWorld,
    pub entities: Vec<VisualEntity>,
    camera: Camera,
    pixels_per_meter: f32,
    max_time_step_ms: f64,
    velocity_iterations: usize,
    position_iterations: usize,
}

impl Scene {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        anyhow::ensure!(
            config.pixels_per_meter > 0.0,
            "pixels per meter must be positive, got {}",
            config.pixels_per_meter
        );
        anyhow::ensure!(
            config.max_time_step_ms > 0.0,
            "maximum time step must be positive, got {}",
            config.max_time_step_ms
        );

        let mut world = PhysicsWorld::default();
        world.set_gravity(config.gravity);

        let mut scene = Self {
            world,
            entities: Vec::new(),
            camera: Camera::orthographic(&config.view),
            pixels_per_meter: config.pixels_per_meter,
            max_time_step_ms: config.max_time_step_ms,
            velocity_iterations: config.velocity_iterations,
            position_iterations: config.position_iterations,
        };

        // Ground is added first so it is drawn beneath the box
        scene.add_box(&config.ground);
        scene.add_box(&config.falling_box);

        Ok(scene)
    }

    pub fn add_box(&mut self, body_config: &BodyConfig) -> usize {
        let body = self.world.create_body(&BodyDescriptor {
            body_type: body_config.body_type,
            position: body_config.position / self.pixels_per_meter,
            angle: body_config.angle_degrees.to_radians(),
        });
        self.world.create_fixture(
            body,
            FixtureShape::Box {
                half_extents: body_config.size / 2.0 / self.pixels_per_meter,
            },
            body_config.density,
        );

        log::debug!("Added {} ({:?})", body_config.name, body_config.body_type);

        let entity_index = self.entities.len();
        self.entities.push(VisualEntity {
            name: body_config.name.clone(),
            body,
            color: body_config.color,
            size: glm::vec3(body_config.size.x, body_config.size.y, 1.0),
            follows_rotation: body_config.follows_rotation,
        });
        entity_index
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    /// Steps the world by the clamped frame delta and returns the simulated seconds
    pub fn step(&mut self, delta_ms: f64) -> f32 {
        let step_ms = crate::frame::clamp_step_ms(delta_ms, self.max_time_step_ms);
        let delta_time = (step_ms / 1000.0) as f32;
        self.world.step(
            delta_time,
            self.velocity_iterations,
            self.position_iterations,
        );
        delta_time
    }

    /// Pixel position and rotation the entity is drawn with
    pub fn entity_pose(&self, entity: &VisualEntity) -> (glm::Vec2, f32) {
        let position = self
            .world
            .position(entity.body)
            .expect("Visual entity refers to a body that is not in the world!");
        let angle = if entity.follows_rotation {
            self.world
                .angle(entity.body)
                .expect("Visual entity refers to a body that is not in the world!")
        } else {
            0.0
        };
        (position * self.pixels_per_meter, angle)
    }

    pub fn quads(&self) -> Vec<QuadDraw> {
        self.entities
            .iter()
            .map(|entity| {
                let (position, angle) = self.entity_pose(entity);
                let model = model_matrix(&position, angle, &entity.size);
                QuadDraw {
                    mvp: self.camera.projection_view() * model,
                    color: entity.color,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(matrix: &glm::Mat4, x: f32, y: f32) -> glm::Vec4 {
        matrix * glm::vec4(x, y, 0.0, 1.0)
    }

    #[test]
    fn camera_maps_view_bounds_to_clip_space() {
        let camera = Camera::orthographic(&ViewBounds::default());

        let bottom_left = clip(camera.projection_view(), 0.0, 0.0);
        assert!((bottom_left.x - -1.0).abs() < 1e-6);
        assert!((bottom_left.y - -1.0).abs() < 1e-6);

        let top_right = clip(camera.projection_view(), 200.0, 200.0);
        assert!((top_right.x - 1.0).abs() < 1e-6);
        assert!((top_right.y - 1.0).abs() < 1e-6);

        assert!(top_right.z > 0.0 && top_right.z < 1.0);
        assert_eq!(
            *camera.projection_view(),
            camera.projection() * camera.view()
        );
    }

    #[test]
    fn body_at_origin_has_identity_pose() {
        let mut config = Config::default();
        config.falling_box.position = glm::vec2(0.0, 0.0);
        config.falling_box.angle_degrees = 0.0;
        let scene = Scene::new(&config).unwrap();

        let (position, angle) = scene.entity_pose(&scene.entities[1]);
        assert_eq!(position, glm::vec2(0.0, 0.0));
        assert_eq!(angle, 0.0);

        let model = model_matrix(&position, angle, &glm::vec3(1.0, 1.0, 1.0));
        assert!((model - glm::Mat4::identity()).norm() < 1e-6);
    }

    #[test]
    fn model_matrix_places_quad_corners() {
        let model = model_matrix(
            &glm::vec2(100.0, 150.0),
            std::f32::consts::FRAC_PI_2,
            &glm::vec3(20.0, 10.0, 1.0),
        );
        // Local +X corner rotates onto +Y
        let corner = model * glm::vec4(0.5, 0.0, 0.0, 1.0);
        assert!((corner.x - 100.0).abs() < 1e-4);
        assert!((corner.y - 160.0).abs() < 1e-4);
    }

    #[test]
    fn drawing_is_idempotent() {
        let scene = Scene::new(&Config::default()).unwrap();
        assert_eq!(scene.quads(), scene.quads());
    }

    #[test]
    fn ground_is_drawn_first_without_rotation() {
        let config = Config::default();
        let scene = Scene::new(&config).unwrap();
        let quads = scene.quads();

        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].color, config.ground.color);
        assert_eq!(quads[1].color, config.falling_box.color);

        let (position, angle) = scene.entity_pose(&scene.entities[0]);
        assert!((position - config.ground.position).norm() < 1e-4);
        assert_eq!(angle, 0.0);

        let (_, angle) = scene.entity_pose(&scene.entities[1]);
        assert!((angle - 40_f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn step_clamps_long_frames() {
        let mut scene = Scene::new(&Config::default()).unwrap();
        assert!((scene.step(500.0) - 1.0 / 60.0).abs() < 1e-7);
        assert!((scene.step(10.0) - 0.01).abs() < 1e-7);
    }

    #[test]
    fn box_falls_and_ground_stays() {
        let mut scene = Scene::new(&Config::default()).unwrap();
        let ground_before = scene.entity_pose(&scene.entities[0]);
        let (box_before, _) = scene.entity_pose(&scene.entities[1]);

        for _ in 0..30 {
            scene.step(1000.0 / 60.0);
        }

        assert_eq!(scene.entity_pose(&scene.entities[0]), ground_before);
        let (box_after, _) = scene.entity_pose(&scene.entities[1]);
        assert!(box_after.y < box_before.y);
    }

    #[test]
    fn world_is_built_from_config() {
        let config = Config::default();
        let scene = Scene::new(&config).unwrap();

        assert_eq!(scene.world.body_count(), 2);
        assert_eq!(scene.world.gravity(), config.gravity);
        assert_eq!(scene.entities[0].name, "Ground");
        assert!(!scene.entities[0].follows_rotation);
        assert!(scene.entities[1].follows_rotation);
    }

    #[test]
    fn rejects_invalid_scale() {
        let config = Config {
            pixels_per_meter: 0.0,
            ..Default::default()
        };
        assert!(Scene::new(&config).is_err());
    }
}
