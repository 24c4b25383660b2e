//! Browser implementations of the recording collaborators:
//! `MediaStream` + `MediaRecorder` for capture, Web Share with an anchor
//! download fallback for saving.

use super::{
    finalize, CaptureProfile, Fragment, LiveStream, Recorder, RecordingSession, SaveTarget,
    ShareOutcome,
};
use crate::browser;
use crate::config::CaptureConfig;
use crate::error::RecordingError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobEvent, BlobPropertyBag, Event, File, FilePropertyBag, HtmlAnchorElement,
    MediaRecorder, MediaRecorderOptions, MediaStream, MediaStreamTrack, RecordingState, Url,
};

pub type WebSession = RecordingSession<WebStream>;

impl Fragment for Blob {
    fn byte_len(&self) -> u64 {
        self.size() as u64
    }
}

/// Ask the browser which configured format it can encode.
pub fn select_profile(config: &CaptureConfig) -> CaptureProfile {
    CaptureProfile::select(&config.formats, MediaRecorder::is_type_supported)
}

/// Camera stream as handed over by [`crate::camera::acquire`].
pub struct WebStream {
    stream: MediaStream,
}

impl WebStream {
    pub fn new(stream: MediaStream) -> Self {
        WebStream { stream }
    }

    pub fn media_stream(&self) -> &MediaStream {
        &self.stream
    }
}

impl LiveStream for WebStream {
    type Recorder = WebRecorder;

    fn open_recorder(&self, profile: &CaptureProfile) -> Result<WebRecorder, RecordingError> {
        let options = MediaRecorderOptions::new();
        if let Some(mime_type) = &profile.mime_type {
            options.set_mime_type(mime_type);
        }
        let recorder =
            MediaRecorder::new_with_media_stream_and_media_recorder_options(&self.stream, &options)
                .map_err(|err| RecordingError::Recorder(format!("{:#?}", err)))?;
        Ok(WebRecorder {
            recorder,
            content_type: profile.content_type().to_string(),
            handlers: None,
        })
    }

    fn stop_tracks(&self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}

struct RecorderHandlers {
    _on_data: Closure<dyn FnMut(BlobEvent)>,
    _on_stop: Closure<dyn FnMut(Event)>,
}

pub struct WebRecorder {
    recorder: MediaRecorder,
    content_type: String,
    handlers: Option<RecorderHandlers>,
}

impl WebRecorder {
    /// Route `dataavailable` and `stop` events. The closures live as long as
    /// the recorder and are unregistered with it.
    pub fn set_handlers(
        &mut self,
        mut on_data: impl FnMut(Blob) + 'static,
        mut on_stop: impl FnMut() + 'static,
    ) {
        let data_closure = browser::closure_wrap(Box::new(move |event: BlobEvent| {
            if let Some(blob) = event.data() {
                on_data(blob);
            }
        }) as Box<dyn FnMut(BlobEvent)>);
        let stop_closure =
            browser::closure_wrap(Box::new(move |_: Event| on_stop()) as Box<dyn FnMut(Event)>);

        self.recorder
            .set_ondataavailable(Some(data_closure.as_ref().unchecked_ref()));
        self.recorder
            .set_onstop(Some(stop_closure.as_ref().unchecked_ref()));
        self.handlers = Some(RecorderHandlers {
            _on_data: data_closure,
            _on_stop: stop_closure,
        });
    }
}

impl Recorder for WebRecorder {
    type Fragment = Blob;
    type Artifact = Blob;

    fn start(&mut self) -> Result<(), RecordingError> {
        self.recorder
            .start()
            .map_err(|err| RecordingError::Recorder(format!("{:#?}", err)))
    }

    fn request_stop(&mut self) {
        // stop() on an inactive recorder throws InvalidStateError
        if self.recorder.state() == RecordingState::Inactive {
            return;
        }
        if let Err(err) = self.recorder.stop() {
            warn!("MediaRecorder.stop failed : {:#?}", err);
        }
    }

    fn assemble(&self, fragments: Vec<Blob>) -> Result<Blob, RecordingError> {
        let parts: Array = fragments.into_iter().collect();
        let options = BlobPropertyBag::new();
        options.set_type(&self.content_type);
        Blob::new_with_blob_sequence_and_options(&parts, &options)
            .map_err(|err| RecordingError::Assemble(format!("{:#?}", err)))
    }
}

impl Drop for WebRecorder {
    fn drop(&mut self) {
        if self.handlers.take().is_some() {
            self.recorder.set_ondataavailable(None);
            self.recorder.set_onstop(None);
        }
    }
}

/// Web Share first, `<a download>` second.
pub struct WebShare {
    file_prefix: String,
    title: String,
    text: String,
}

impl WebShare {
    pub fn new(config: &CaptureConfig) -> Self {
        WebShare {
            file_prefix: config.file_prefix.clone(),
            title: config.share_title.clone(),
            text: config.share_text.clone(),
        }
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    async fn share(&self, artifact: &Blob, file_name: &str) -> Result<ShareOutcome> {
        let navigator = browser::window()?.navigator();
        let share = Reflect::get(&navigator, &JsValue::from_str("share"))
            .map_err(|err| anyhow!("Could not read navigator.share : {:#?}", err))?;
        let Some(share) = share.dyn_ref::<Function>() else {
            return Ok(ShareOutcome::Unsupported);
        };

        let file = to_file(artifact, file_name)?;
        let data = Object::new();
        for (key, value) in [
            ("files", JsValue::from(Array::of1(&file))),
            ("title", JsValue::from_str(&self.title)),
            ("text", JsValue::from_str(&self.text)),
        ] {
            Reflect::set(&data, &JsValue::from_str(key), &value)
                .map_err(|err| anyhow!("Could not build share data : {:#?}", err))?;
        }

        // desktop browsers often share text but not files
        let can_share = Reflect::get(&navigator, &JsValue::from_str("canShare"))
            .map_err(|err| anyhow!("Could not read navigator.canShare : {:#?}", err))?;
        if let Some(can_share) = can_share.dyn_ref::<Function>() {
            let allowed = can_share
                .call1(&navigator, &data)
                .map(|value| value.is_truthy())
                .unwrap_or(false);
            if !allowed {
                return Ok(ShareOutcome::Unsupported);
            }
        }

        let promise = share
            .call1(&navigator, &data)
            .map_err(|err| anyhow!("navigator.share threw : {:#?}", err))?;
        JsFuture::from(Promise::from(promise))
            .await
            .map_err(|err| anyhow!("share was rejected : {:#?}", err))?;
        Ok(ShareOutcome::Shared)
    }
}

fn to_file(artifact: &Blob, file_name: &str) -> Result<File> {
    let options = FilePropertyBag::new();
    options.set_type(&artifact.type_());
    File::new_with_blob_sequence_and_options(&Array::of1(artifact), file_name, &options)
        .map_err(|err| anyhow!("Could not wrap recording in a File : {:#?}", err))
}

fn download(artifact: &Blob, file_name: &str) -> Result<()> {
    let url = Url::create_object_url_with_blob(artifact)
        .map_err(|err| anyhow!("Could not create object URL : {:#?}", err))?;
    let anchor = browser::document()?
        .create_element("a")
        .map_err(|err| anyhow!("Could not create anchor : {:#?}", err))?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlAnchorElement", element))?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();
    if let Err(err) = Url::revoke_object_url(&url) {
        debug!("object URL not revoked : {:#?}", err);
    }
    Ok(())
}

#[async_trait(?Send)]
impl SaveTarget for WebShare {
    type Artifact = Blob;

    async fn try_share_preferred(&self, artifact: &Blob, file_name: &str) -> ShareOutcome {
        self.share(artifact, file_name)
            .await
            .unwrap_or_else(|err| ShareOutcome::Failed(err.to_string()))
    }

    async fn fallback_save(&self, artifact: &Blob, file_name: &str) -> Result<(), RecordingError> {
        download(artifact, file_name).map_err(|err| RecordingError::SaveFailed(err.to_string()))
    }
}

/// Feed the recorder's events back into `session`, and hand the finished
/// artifact to `share` when the stop came from mission completion.
pub fn wire_session(session: &Rc<RefCell<WebSession>>, share: Rc<WebShare>) {
    let data_session = Rc::downgrade(session);
    let stop_session = Rc::downgrade(session);
    let mut session = session.borrow_mut();
    let Some(recorder) = session.recorder_mut() else {
        debug!("no recorder to wire, session is idle");
        return;
    };
    recorder.set_handlers(
        move |blob| {
            if let Some(session) = data_session.upgrade() {
                session.borrow_mut().push_fragment(blob);
            }
        },
        move || on_recorder_stopped(&stop_session, &share),
    );
}

fn on_recorder_stopped(session: &Weak<RefCell<WebSession>>, share: &Rc<WebShare>) {
    let Some(session) = session.upgrade() else {
        return;
    };
    let stopped = session.borrow_mut().on_recorder_stopped();
    match stopped {
        Ok(Some(artifact)) => {
            let file_name = session
                .borrow()
                .profile()
                .file_name(share.file_prefix(), &browser::iso_timestamp());
            let share = share.clone();
            browser::spawn_local(async move {
                match finalize(share.as_ref(), &artifact, &file_name).await {
                    Ok(outcome) => info!("recording handed off: {:?}", outcome),
                    Err(err) => error!("{}", err),
                }
            });
        }
        Ok(None) => debug!("recorder stopped without a pending artifact"),
        Err(err) => error!("{}", err),
    }
}
