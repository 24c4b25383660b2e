//! Camera acquisition collaborator.
//!
//! Failure here is never fatal: the mission runs without a live feed and
//! without a recording.

use crate::browser;
use crate::config::CameraConfig;
use anyhow::{anyhow, Result};
use js_sys::{Object, Reflect};
use log::debug;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaStream, MediaStreamConstraints};

/// Ask for a camera stream with the configured facing mode.
pub async fn acquire(config: &CameraConfig) -> Result<MediaStream> {
    let devices = browser::window()?
        .navigator()
        .media_devices()
        .map_err(|err| anyhow!("No media devices available : {:#?}", err))?;

    // { video: { facingMode }, audio }
    let video = Object::new();
    Reflect::set(
        &video,
        &JsValue::from_str("facingMode"),
        &JsValue::from_str(&config.facing_mode),
    )
    .map_err(|err| anyhow!("Could not build video constraints : {:#?}", err))?;
    let constraints = MediaStreamConstraints::new();
    constraints.set_video(&video);
    constraints.set_audio(&JsValue::from_bool(config.audio));

    let request = devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|err| anyhow!("getUserMedia rejected the request : {:#?}", err))?;
    // permission prompts resolve here, possibly much later
    let stream = JsFuture::from(request)
        .await
        .map_err(|err| anyhow!("Camera access failed : {:#?}", err))?;
    stream
        .dyn_into::<MediaStream>()
        .map_err(|element| anyhow!("Error converting {:#?} to MediaStream", element))
}

/// Show `stream` in the background `<video>` element.
pub fn attach_preview(stream: &MediaStream) -> Result<()> {
    let video = browser::video()?;
    video.set_muted(true);
    video.set_autoplay(true);
    video
        .set_attribute("playsinline", "")
        .map_err(|err| anyhow!("Could not set playsinline : {:#?}", err))?;
    video.set_src_object(Some(stream));
    // autoplay may be refused; the element still shows frames once allowed
    match video.play() {
        Ok(playing) => browser::spawn_local(async move {
            if let Err(err) = JsFuture::from(playing).await {
                debug!("preview autoplay refused : {:#?}", err);
            }
        }),
        Err(err) => debug!("preview play() threw : {:#?}", err),
    }
    Ok(())
}

pub fn detach_preview() {
    if let Ok(video) = browser::video() {
        video.set_src_object(None);
    }
}
