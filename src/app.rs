use crate::config::Config;

#[cfg(not(target_arch = "wasm32"))]
pub fn run(config: Config) {
    env_logger::init();
    pollster::block_on(run_async(config));
}

#[cfg(target_arch = "wasm32")]
pub fn run(config: Config) {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    if let Err(error) = console_log::init() {
        web_sys::console::error_1(&format!("Could not initialize logger: {error}").into());
    }
    wasm_bindgen_futures::spawn_local(run_async(config));
}

/// Simulation and rendering state driven by display refresh callbacks
pub struct FrameLoop {
    pub scene: crate::scene::Scene,
    pub renderer: crate::render::Renderer<'static>,
    clock: crate::frame::FrameClock,
}

impl FrameLoop {
    pub fn new(scene: crate::scene::Scene, renderer: crate::render::Renderer<'static>) -> Self {
        Self {
            scene,
            renderer,
            clock: crate::frame::FrameClock::new(),
        }
    }

    /// Step, then draw
    pub fn frame(&mut self) {
        let delta_ms = self.clock.tick();
        self.scene.step(delta_ms);
        self.renderer.render_frame(&self.scene);
    }
}

/// Builds the window, renderer and scene. The frame loop only starts if this succeeds.
async fn initialize(
    event_loop: &winit::event_loop::EventLoop<()>,
    config: &Config,
) -> anyhow::Result<(std::sync::Arc<winit::window::Window>, FrameLoop)> {
    #[allow(unused_mut)]
    let mut builder = winit::window::WindowBuilder::new();

    #[cfg(not(target_arch = "wasm32"))]
    {
        builder = builder
            .with_title(config.title.as_str())
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));
    }

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::WindowBuilderExtWebSys;
        builder = builder.with_canvas(Some(find_canvas(&config.canvas_id)?));
    }

    let window = std::sync::Arc::new(builder.build(event_loop)?);

    let window_size = window.inner_size();
    let (width, height) = (window_size.width.max(1), window_size.height.max(1));

    let scene = crate::scene::Scene::new(config)?;
    let renderer = crate::render::Renderer::new(
        window.clone(),
        width,
        height,
        config,
        scene.entities.len(),
    )
    .await?;

    Ok((window, FrameLoop::new(scene, renderer)))
}

#[cfg(target_arch = "wasm32")]
fn find_canvas(canvas_id: &str) -> anyhow::Result<web_sys::HtmlCanvasElement> {
    use anyhow::Context as _;
    use web_sys::wasm_bindgen::JsCast;

    web_sys::window()
        .and_then(|window| window.document())
        .context("No document is available")?
        .get_element_by_id(canvas_id)
        .with_context(|| format!("No element with id '{canvas_id}'"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| anyhow::anyhow!("Element '{canvas_id}' is not a canvas"))
}

pub async fn run_async(config: Config) {
    let event_loop = match winit::event_loop::EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(error) => {
            log::error!("Failed to create event loop: {error}");
            return;
        }
    };

    let (window, mut frame_loop) = match initialize(&event_loop, &config).await {
        Ok(initialized) => initialized,
        Err(error) => {
            log::error!("Initialization failed: {error:#}");
            return;
        }
    };

    event_loop.set_control_flow(winit::event_loop::ControlFlow::Wait);
    window.request_redraw();

    let result = event_loop.run(move |event, elwt| {
        let winit::event::Event::WindowEvent { event, .. } = event else {
            return;
        };

        match event {
            // Exit by pressing the escape key
            #[cfg(not(target_arch = "wasm32"))]
            winit::event::WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key:
                            winit::keyboard::PhysicalKey::Code(winit::keyboard::KeyCode::Escape),
                        state: winit::event::ElementState::Pressed,
                        ..
                    },
                ..
            } => elwt.exit(),

            // Close button handler
            winit::event::WindowEvent::CloseRequested => elwt.exit(),

            winit::event::WindowEvent::Resized(winit::dpi::PhysicalSize { width, height }) => {
                if width > 0 && height > 0 {
                    frame_loop.renderer.resize(width, height);
                }
            }

            winit::event::WindowEvent::RedrawRequested => {
                frame_loop.frame();
                window.request_redraw();
            }

            _ => {}
        }
    });

    if let Err(error) = result {
        log::error!("Event loop terminated: {error}");
    }
}
