pub mod app;
pub mod config;
pub mod debug;
pub mod frame;
pub mod gpu;
pub mod physics;
pub mod render;
pub mod scene;
pub mod shader;

pub use log;
pub use nalgebra_glm;
pub use rapier2d;
pub use winit;

pub use self::app::run;

#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen;

#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen_futures;
