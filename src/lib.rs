// ==================== Imports ====================
use log::{error, Level};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

pub mod browser;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod mission;
pub mod recording;

use engine::GameLoop;
use game::SpaceJourney;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and console logging
/// - hands the canvas over to the game loop
#[wasm_bindgen(start)]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    // refined once mission.json is read
    console_log::init_with_level(Level::Info)
        .map_err(|err| JsValue::from_str(&format!("Could not install logger : {}", err)))?;

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(SpaceJourney::new()).await {
            error!("Could not start game loop: {:#?}", err);
        }
    });

    Ok(())
}
