pub mod config;
pub mod emit;
pub mod graph;
pub mod ir;
pub mod measure;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod schema;
pub mod validate;

#[cfg(test)]
mod fixtures;

use wasm_bindgen::prelude::*;

use config::Config;
use emit::{SqlAlchemyRenderer, WhitespaceFormatter};
use pipeline::{Pipeline, RunMode};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Run the full pipeline on a schema document and return the run as JSON.
#[wasm_bindgen(js_name = "generateModels")]
pub fn generate_models(source: &str, config: Option<String>) -> Result<String, JsValue> {
    run_to_json(source, config.as_deref(), RunMode::Generate)
}

/// Validate a schema document without planning or emitting.
#[wasm_bindgen(js_name = "checkSchema")]
pub fn check_schema(source: &str, config: Option<String>) -> Result<String, JsValue> {
    run_to_json(source, config.as_deref(), RunMode::Check)
}

fn run_to_json(source: &str, config: Option<&str>, mode: RunMode) -> Result<String, JsValue> {
    let config = match config {
        Some(text) => Config::from_json(text).map_err(|e| js_sys::Error::new(&e.to_string()))?,
        None => Config::default(),
    };
    let run = Pipeline::new(&config, &SqlAlchemyRenderer)
        .with_formatter(&WhitespaceFormatter)
        .with_mode(mode)
        .run_str(source);
    serde_json::to_string(&run).map_err(|e| js_sys::Error::new(&e.to_string()).into())
}
