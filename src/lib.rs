use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod geometry;
pub mod motion;
pub mod particles;
mod renderer;
pub mod scene;
pub mod stage;
mod utils;

pub use config::SceneConfig;
pub use error::SceneError;
pub use renderer::clamp_polar;


#[wasm_bindgen(start)]
pub fn dummy_main() {}


/// Starts the diorama. `config_url` optionally points at a JSON [`SceneConfig`].
#[wasm_bindgen]
pub async fn run(config_url: Option<String>) -> Result<(), JsValue> {
    utils::set_panic_hook();
    let config = load_config(config_url).await;
    renderer::main(config)?;
    Ok(())
}


async fn load_config(config_url: Option<String>) -> SceneConfig {
    let url = match config_url {
        Some(url) => url,
        None => return SceneConfig::default(),
    };

    match utils::fetch_text(&url)
        .await
        .and_then(|json| SceneConfig::from_json(&json))
    {
        Ok(config) => {
            log!("load_config(): loaded {}", url);
            config
        }
        Err(e) => {
            log!("load_config(): WARNING: {}; falling back to defaults.", e);
            SceneConfig::default()
        }
    }
}
