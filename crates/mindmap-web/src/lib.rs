//! Mind map web frontend
//!
//! Leptos-based WASM dashboard: sign in, generate maps from a topic, text
//! or PDF, browse and export them, and manage the subscription.

mod api;
mod app;
mod components;
mod pages;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}
