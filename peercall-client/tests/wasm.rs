#![cfg(target_arch = "wasm32")]

use peercall_client::{CallPhase, ClientConfig};
use wasm_bindgen_test::*;

// Configure wasm_bindgen_test to use the browser (headless) test runner
wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn default_config_is_valid_in_the_browser() {
    let config = ClientConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(CallPhase::Idle.to_string(), "idle");
}

#[wasm_bindgen_test]
fn clock_is_available() {
    assert!(peercall_client::now_ms() > 0.0);
}
