use rapier2d::prelude::*;

pub const STATIC_BODY_COLOR: [f32; 3] = [0.5, 0.9, 0.5];
pub const DYNAMIC_BODY_COLOR: [f32; 3] = [0.9, 0.7, 0.7];
pub const SLEEPING_BODY_COLOR: [f32; 3] = [0.6, 0.6, 0.6];

/// Primitive callbacks issued by [`PhysicsWorld::debug_draw`].
/// All geometry is in world space, in physics units.
pub trait DebugDraw {
    fn draw_polygon(&mut self, vertices: &[nalgebra_glm::Vec2], color: nalgebra_glm::Vec3);
    fn draw_segment(
        &mut self,
        start: nalgebra_glm::Vec2,
        end: nalgebra_glm::Vec2,
        color: nalgebra_glm::Vec3,
    );
    fn draw_circle(&mut self, center: nalgebra_glm::Vec2, radius: f32, color: nalgebra_glm::Vec3);
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BodyType {
    Static,
    #[default]
    Dynamic,
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct BodyDescriptor {
    pub body_type: BodyType,
    pub position: nalgebra_glm::Vec2,
    /// Radians
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureShape {
    Box { half_extents: nalgebra_glm::Vec2 },
    Circle { radius: f32 },
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self {
            gravity: vector![0.0, -10.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }
}

impl PhysicsWorld {
    pub fn set_gravity(&mut self, gravity: nalgebra_glm::Vec2) {
        self.gravity = vector![gravity.x, gravity.y];
    }

    pub fn gravity(&self) -> nalgebra_glm::Vec2 {
        nalgebra_glm::vec2(self.gravity.x, self.gravity.y)
    }

    pub fn create_body(&mut self, descriptor: &BodyDescriptor) -> RigidBodyHandle {
        let builder = match descriptor.body_type {
            BodyType::Static => RigidBodyBuilder::fixed(),
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let body = builder
            .translation(vector![descriptor.position.x, descriptor.position.y])
            .rotation(descriptor.angle)
            .build();
        log::debug!("Creating rigid body: {descriptor:?}");
        self.bodies.insert(body)
    }

    /// Attaches a collision shape to a body. `density` is mass per unit area.
    pub fn create_fixture(
        &mut self,
        body: RigidBodyHandle,
        shape: FixtureShape,
        density: f32,
    ) -> ColliderHandle {
        let builder = match shape {
            FixtureShape::Box { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            }
            FixtureShape::Circle { radius } => ColliderBuilder::ball(radius),
        };
        let collider = builder.density(density).build();
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies)
    }

    /// Advances the simulation by `delta_time` seconds
    pub fn step(&mut self, delta_time: f32, velocity_iterations: usize, position_iterations: usize) {
        self.integration_parameters.dt = delta_time;
        self.integration_parameters.max_velocity_iterations = velocity_iterations.max(1);
        self.integration_parameters.max_stabilization_iterations = position_iterations.max(1);

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    pub fn position(&self, body: RigidBodyHandle) -> Option<nalgebra_glm::Vec2> {
        self.bodies
            .get(body)
            .map(|body| nalgebra_glm::vec2(body.translation().x, body.translation().y))
    }

    /// Radians
    pub fn angle(&self, body: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(body).map(|body| body.rotation().angle())
    }

    pub fn linear_velocity(&self, body: RigidBodyHandle) -> Option<nalgebra_glm::Vec2> {
        self.bodies
            .get(body)
            .map(|body| nalgebra_glm::vec2(body.linvel().x, body.linvel().y))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Reports every collider's world-space geometry to `drawer`
    pub fn debug_draw(&self, drawer: &mut dyn DebugDraw) {
        for (_, collider) in self.colliders.iter() {
            let color = collider
                .parent()
                .and_then(|handle| self.bodies.get(handle))
                .map(body_color)
                .unwrap_or(STATIC_BODY_COLOR);
            let color = nalgebra_glm::vec3(color[0], color[1], color[2]);

            let isometry = collider.position();
            let shape = collider.shape();

            if let Some(cuboid) = shape.as_cuboid() {
                let half = cuboid.half_extents;
                let vertices = [
                    point![-half.x, -half.y],
                    point![half.x, -half.y],
                    point![half.x, half.y],
                    point![-half.x, half.y],
                ]
                .iter()
                .map(|corner| to_glm(&(isometry * corner)))
                .collect::<Vec<_>>();
                drawer.draw_polygon(&vertices, color);
            } else if let Some(polygon) = shape.as_convex_polygon() {
                let vertices = polygon
                    .points()
                    .iter()
                    .map(|point| to_glm(&(isometry * point)))
                    .collect::<Vec<_>>();
                drawer.draw_polygon(&vertices, color);
            } else if let Some(ball) = shape.as_ball() {
                let center = isometry.translation.vector;
                drawer.draw_circle(nalgebra_glm::vec2(center.x, center.y), ball.radius, color);
            } else if let Some(segment) = shape.as_segment() {
                drawer.draw_segment(
                    to_glm(&(isometry * segment.a)),
                    to_glm(&(isometry * segment.b)),
                    color,
                );
            } else {
                log::trace!("No debug geometry for shape {:?}", shape.shape_type());
            }
        }
    }
}

fn body_color(body: &RigidBody) -> [f32; 3] {
    if !body.is_dynamic() {
        STATIC_BODY_COLOR
    } else if body.is_sleeping() {
        SLEEPING_BODY_COLOR
    } else {
        DYNAMIC_BODY_COLOR
    }
}

fn to_glm(point: &Point<Real>) -> nalgebra_glm::Vec2 {
    nalgebra_glm::vec2(point.x, point.y)
}
