use anyhow::Context as _;

pub const VERTEX_ENTRY_POINT: &str = "vertex_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fragment_main";

/// WGSL sources for a vertex and fragment stage
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub async fn load(config: &crate::config::Config) -> anyhow::Result<Self> {
        let vertex_path = config.shader_path(&config.vertex_shader);
        let fragment_path = config.shader_path(&config.fragment_shader);
        log::info!("Loading shaders: {vertex_path}, {fragment_path}");
        Ok(Self {
            vertex: read_source(&vertex_path).await?,
            fragment: read_source(&fragment_path).await?,
        })
    }
}

/// A compiled vertex and fragment module pair
pub struct ShaderProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

impl ShaderProgram {
    pub fn new(device: &wgpu::Device, sources: &ShaderSources) -> Self {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(&sources.vertex)),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(&sources.fragment)),
        });
        Self { vertex, fragment }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_source(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read shader '{path}'"))
}

#[cfg(target_arch = "wasm32")]
async fn read_source(path: &str) -> anyhow::Result<String> {
    use web_sys::wasm_bindgen::JsCast;

    let window = web_sys::window().context("No global window is available")?;
    let response = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|error| anyhow::anyhow!("Failed to fetch shader '{path}': {error:?}"))?
        .dyn_into::<web_sys::Response>()
        .map_err(|error| anyhow::anyhow!("Unexpected fetch result for '{path}': {error:?}"))?;
    anyhow::ensure!(
        response.ok(),
        "Failed to fetch shader '{path}': HTTP {}",
        response.status()
    );

    let text = response
        .text()
        .map_err(|error| anyhow::anyhow!("Failed to read shader '{path}': {error:?}"))?;
    wasm_bindgen_futures::JsFuture::from(text)
        .await
        .map_err(|error| anyhow::anyhow!("Failed to read shader '{path}': {error:?}"))?
        .as_string()
        .with_context(|| format!("Shader '{path}' is not text"))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn loads_bundled_shaders() {
        let config = crate::config::Config::default();
        let sources = pollster::block_on(ShaderSources::load(&config)).unwrap();
        assert!(sources.vertex.contains(VERTEX_ENTRY_POINT));
        assert!(sources.fragment.contains(FRAGMENT_ENTRY_POINT));
    }

    #[test]
    fn missing_shader_is_an_error() {
        let config = crate::config::Config {
            shader_directory: "does/not/exist".to_string(),
            ..Default::default()
        };
        let error = pollster::block_on(ShaderSources::load(&config)).unwrap_err();
        assert!(error.to_string().contains("default.vert.wgsl"));
    }
}
