use std::path::Path;

use serde::Deserialize;

use crate::RenderError;

/// Renderer settings loadable from a TOML file, mirroring the runtime
/// switches on [`crate::RenderState`].
#[derive(Clone, Deserialize)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// log2 of the sample count, 0..=4.
    #[serde(default, rename = "msaa-level")]
    pub msaa_level: u32,
    #[serde(default = "RendererConfig::default_on", rename = "hierarchical")]
    pub hierarchical_rasterize: bool,
    #[serde(default = "RendererConfig::default_on", rename = "cull-back-faces")]
    pub back_face_culling: bool,
    #[serde(default = "RendererConfig::default_on", rename = "front-ccw")]
    pub front_counter_clockwise: bool,
    #[serde(default = "RendererConfig::default_on", rename = "depth-test")]
    pub depth_test: bool,
    #[serde(
        default = "RendererConfig::default_clear_color",
        rename = "clear-color",
        deserialize_with = "RendererConfig::deserialize_clear_color"
    )]
    pub clear_color: [u8; 4],
}

impl RendererConfig {
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: RendererConfig =
            toml::from_str(&contents).map_err(|err| RenderError::Config(err.to_string()))?;
        Ok(config)
    }

    fn default_on() -> bool {
        true
    }

    fn default_clear_color() -> [u8; 4] {
        [0, 0, 0, 255]
    }

    fn deserialize_clear_color<'de, D: serde::Deserializer<'de>>(
        deser: D,
    ) -> Result<[u8; 4], D::Error> {
        use serde::de::Error;

        let hex: String = Deserialize::deserialize(deser)?;
        let rgb = u32::from_str_radix(hex.strip_prefix('#').unwrap_or(&hex), 16)
            .map_err(Error::custom)?;
        let [_, r, g, b] = rgb.to_be_bytes();
        Ok([r, g, b, 255])
    }
}
