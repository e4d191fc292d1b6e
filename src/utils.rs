use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::error::SceneError;


/// Prints to the browser console, or to stderr when not running as wasm.
#[macro_export]
macro_rules! log {
    ( $( $t:tt )* ) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::log_1(&format!( $( $t )* ).into());
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!( $( $t )* );
    }}
}


pub fn set_panic_hook() {
    // Without the hook a panic only shows up as "unreachable executed".
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}


/// Fetches `url` and returns the response body as text.
pub async fn fetch_text(url: &str) -> Result<String, SceneError> {
    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);

    let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;
    request
        .headers()
        .set("Accept", "application/json")
        .map_err(js_error)?;

    let window = web_sys::window()
        .ok_or_else(|| SceneError::Fetch(String::from("no global window")))?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?;
    let response: Response = response.dyn_into().map_err(js_error)?;
    if !response.ok() {
        return Err(SceneError::Fetch(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let text = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    text.as_string()
        .ok_or_else(|| SceneError::Fetch(format!("{} returned a non-text body", url)))
}


fn js_error(value: JsValue) -> SceneError {
    match value.dyn_ref::<js_sys::Error>() {
        Some(error) => SceneError::Fetch(String::from(error.message())),
        None => SceneError::Fetch(format!("{:?}", value)),
    }
}
