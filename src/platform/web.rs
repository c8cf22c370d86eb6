//! Browser glue (wasm32 only)

use wasm_bindgen::prelude::*;

use crate::error::{GameError, Result};

/// Install the panic hook and route `log` to the browser console
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
    log::info!("Coffee Rush (web) starting...");
}

/// Page LocalStorage; a missing handle is a configuration error
pub fn local_storage() -> Result<web_sys::Storage> {
    web_sys::window()
        .ok_or(GameError::MissingHandle("window"))?
        .local_storage()
        .ok()
        .flatten()
        .ok_or(GameError::MissingHandle("localStorage"))
}
