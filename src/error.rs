use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to parse scene config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid scene config: {0}")]
    InvalidConfig(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("window creation failed: {0}")]
    Window(String),
}

impl From<SceneError> for JsValue {
    fn from(err: SceneError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}
