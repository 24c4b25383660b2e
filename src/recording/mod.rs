//! Recording Session Controller.
//!
//! ELI5:
//! ┌──────────────── Session State Transition Flow ──────────────────┐
//! │  From State  →  Event                 →  To State               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Idle        →  begin(stream)         →  Recording              │
//! │  Recording   →  on_mission_complete   →  Finalizing             │
//! │  Finalizing  →  on_recorder_stopped   →  Done (artifact out)    │
//! │  -------        ------                                          │
//! │  Idle/Recording → teardown            →  Cancelled (no artifact)│
//! │  Finalizing  →  teardown              →  Finalizing (camera off)│
//! └─────────────────────────────────────────────────────────────────┘
//!
//! The platform pieces (stream, encoder, share sheet) sit behind the traits
//! below so the controller runs the same against fakes and the browser.

pub mod profile;
pub mod web;

use crate::error::RecordingError;
use async_trait::async_trait;
use log::{debug, info, warn};

pub use profile::CaptureProfile;

/// Opaque chunk of encoded media.
pub trait Fragment {
    fn byte_len(&self) -> u64;
}

impl Fragment for Vec<u8> {
    fn byte_len(&self) -> u64 {
        self.len() as u64
    }
}

/// Capture/encode collaborator bound to one stream.
///
/// Fragments are delivered to [`RecordingSession::push_fragment`] by whoever
/// drives the encoder, and its stop signal to
/// [`RecordingSession::on_recorder_stopped`].
pub trait Recorder {
    type Fragment: Fragment;
    type Artifact;

    fn start(&mut self) -> Result<(), RecordingError>;
    /// Ask the encoder to flush and stop. Completion is signalled later.
    fn request_stop(&mut self);
    fn assemble(&self, fragments: Vec<Self::Fragment>) -> Result<Self::Artifact, RecordingError>;
}

/// A live media source acquired by the camera collaborator.
pub trait LiveStream {
    type Recorder: Recorder;

    fn open_recorder(&self, profile: &CaptureProfile) -> Result<Self::Recorder, RecordingError>;
    /// Release the camera. Called exactly once, by teardown.
    fn stop_tracks(&self);
}

type FragmentOf<S> = <<S as LiveStream>::Recorder as Recorder>::Fragment;
pub type ArtifactOf<S> = <<S as LiveStream>::Recorder as Recorder>::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Finalizing,
    Done,
    /// Torn down before an artifact was produced. Terminal.
    Cancelled,
}

/// One recording attempt. Never reused: a new mission run gets a new session.
pub struct RecordingSession<S: LiveStream> {
    profile: CaptureProfile,
    stream: Option<S>,
    recorder: Option<S::Recorder>,
    buffer: Vec<FragmentOf<S>>,
    state: SessionState,
}

impl<S: LiveStream> RecordingSession<S> {
    pub fn new(profile: CaptureProfile) -> Self {
        RecordingSession {
            profile,
            stream: None,
            recorder: None,
            buffer: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Start capturing `stream`. Without a stream the session stays idle.
    ///
    /// If the recorder cannot be opened or started, the stream's tracks are
    /// stopped before the error is returned and the session stays idle.
    pub fn begin(&mut self, stream: Option<S>) -> Result<(), RecordingError> {
        if self.state != SessionState::Idle {
            return Err(RecordingError::AlreadyStarted);
        }
        let stream = stream.ok_or(RecordingError::NoStream)?;
        let opened = stream.open_recorder(&self.profile).and_then(|mut recorder| {
            recorder.start()?;
            Ok(recorder)
        });
        let recorder = match opened {
            Ok(recorder) => recorder,
            Err(err) => {
                // the session never owned this stream, so release it here
                stream.stop_tracks();
                warn!("recorder unavailable, camera released: {}", err);
                return Err(err);
            }
        };

        self.buffer.clear();
        self.stream = Some(stream);
        self.recorder = Some(recorder);
        self.state = SessionState::Recording;
        info!(
            "recording started ({})",
            self.profile.mime_type.as_deref().unwrap_or("browser default")
        );
        Ok(())
    }

    /// Buffer a fragment from the encoder. Returns whether it was kept.
    ///
    /// Fragments still arrive while finalizing (the encoder flushes on
    /// stop); empty ones and ones arriving in any other state are dropped.
    pub fn push_fragment(&mut self, fragment: FragmentOf<S>) -> bool {
        match self.state {
            SessionState::Recording | SessionState::Finalizing => {}
            state => {
                debug!("fragment dropped, session is {:?}", state);
                return false;
            }
        }
        if fragment.byte_len() == 0 {
            return false;
        }
        self.buffer.push(fragment);
        true
    }

    /// The mission's completion signal. Only the first call while recording
    /// does anything.
    pub fn on_mission_complete(&mut self) {
        if self.state != SessionState::Recording {
            debug!("mission complete ignored, session is {:?}", self.state);
            return;
        }
        self.state = SessionState::Finalizing;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.request_stop();
        }
        info!("recording stopping, {} fragments buffered", self.buffer.len());
    }

    /// The encoder finished stopping. Yields the artifact once, when the
    /// stop came from mission completion.
    pub fn on_recorder_stopped(&mut self) -> Result<Option<ArtifactOf<S>>, RecordingError> {
        if self.state != SessionState::Finalizing {
            debug!("recorder stop ignored, session is {:?}", self.state);
            return Ok(None);
        }
        self.state = SessionState::Done;
        let fragments = std::mem::take(&mut self.buffer);
        let recorder = self
            .recorder
            .as_ref()
            .ok_or_else(|| RecordingError::Assemble("no recorder attached".to_string()))?;
        let artifact = recorder.assemble(fragments)?;
        info!("recording finalized");
        Ok(Some(artifact))
    }

    /// Unmount / navigation cleanup: stop capture, discard what was
    /// buffered, release the camera. Safe to call repeatedly.
    ///
    /// A finished mission keeps its recording: while finalizing, only the
    /// camera is released and the pending artifact is still produced by
    /// [`RecordingSession::on_recorder_stopped`].
    pub fn teardown(&mut self) {
        match self.state {
            SessionState::Finalizing => {
                debug!("teardown while finalizing, recording kept");
            }
            SessionState::Recording => {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.request_stop();
                }
                warn!(
                    "recording torn down before completion, {} fragments discarded",
                    self.buffer.len()
                );
                self.buffer.clear();
                self.state = SessionState::Cancelled;
            }
            SessionState::Idle => self.state = SessionState::Cancelled,
            SessionState::Done | SessionState::Cancelled => {}
        }
        if let Some(stream) = self.stream.take() {
            stream.stop_tracks();
            info!("camera released");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn profile(&self) -> &CaptureProfile {
        &self.profile
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn recorder_mut(&mut self) -> Option<&mut S::Recorder> {
        self.recorder.as_mut()
    }
}

impl<S: LiveStream> Drop for RecordingSession<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Unsupported,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Shared,
    Saved,
}

/// Save/share collaborator: native share first, plain file save second.
#[async_trait(?Send)]
pub trait SaveTarget {
    type Artifact;

    async fn try_share_preferred(&self, artifact: &Self::Artifact, file_name: &str)
        -> ShareOutcome;

    async fn fallback_save(
        &self,
        artifact: &Self::Artifact,
        file_name: &str,
    ) -> Result<(), RecordingError>;
}

/// Hand a finished artifact to `target`.
///
/// Exactly one path is taken per call: the fallback runs only after the
/// share attempt reports failure or no support.
pub async fn finalize<T>(
    target: &T,
    artifact: &T::Artifact,
    file_name: &str,
) -> Result<SaveOutcome, RecordingError>
where
    T: SaveTarget + ?Sized,
{
    match target.try_share_preferred(artifact, file_name).await {
        ShareOutcome::Shared => {
            info!("{} shared", file_name);
            return Ok(SaveOutcome::Shared);
        }
        ShareOutcome::Unsupported => debug!("native share unavailable, saving file"),
        ShareOutcome::Failed(reason) => warn!("share failed ({}), saving file", reason),
    }
    target.fallback_save(artifact, file_name).await?;
    info!("{} saved", file_name);
    Ok(SaveOutcome::Saved)
}
