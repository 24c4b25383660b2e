use async_trait::async_trait;
use futures::executor::block_on;
use space_journey::error::RecordingError;
use space_journey::recording::{
    finalize, CaptureProfile, LiveStream, Recorder, RecordingSession, SaveOutcome, SaveTarget,
    SessionState, ShareOutcome,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Counts what the session asked its collaborators to do.
#[derive(Default)]
struct Calls {
    started: Cell<u32>,
    stop_requests: Cell<u32>,
    tracks_stopped: Cell<u32>,
    fail_open: Cell<bool>,
    fail_start: Cell<bool>,
}

fn bump(counter: &Cell<u32>) {
    counter.set(counter.get() + 1);
}

struct FakeStream {
    calls: Rc<Calls>,
}

struct FakeRecorder {
    calls: Rc<Calls>,
}

impl Recorder for FakeRecorder {
    type Fragment = Vec<u8>;
    type Artifact = Vec<u8>;

    fn start(&mut self) -> Result<(), RecordingError> {
        if self.calls.fail_start.get() {
            return Err(RecordingError::Recorder("NotSupportedError".to_string()));
        }
        bump(&self.calls.started);
        Ok(())
    }

    fn request_stop(&mut self) {
        bump(&self.calls.stop_requests);
    }

    fn assemble(&self, fragments: Vec<Vec<u8>>) -> Result<Vec<u8>, RecordingError> {
        Ok(fragments.concat())
    }
}

impl LiveStream for FakeStream {
    type Recorder = FakeRecorder;

    fn open_recorder(&self, _: &CaptureProfile) -> Result<FakeRecorder, RecordingError> {
        if self.calls.fail_open.get() {
            return Err(RecordingError::Recorder("encoder busy".to_string()));
        }
        Ok(FakeRecorder {
            calls: self.calls.clone(),
        })
    }

    fn stop_tracks(&self) {
        bump(&self.calls.tracks_stopped);
    }
}

type Session = RecordingSession<FakeStream>;

fn session() -> (Session, Rc<Calls>) {
    (
        Session::new(CaptureProfile::browser_default()),
        Rc::new(Calls::default()),
    )
}

fn stream(calls: &Rc<Calls>) -> Option<FakeStream> {
    Some(FakeStream {
        calls: calls.clone(),
    })
}

#[test]
fn begin_without_stream_stays_idle() {
    let (mut session, _) = session();
    assert_eq!(session.begin(None), Err(RecordingError::NoStream));
    assert_eq!(session.state(), SessionState::Idle);

    session.on_mission_complete();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.on_recorder_stopped(), Ok(None));
}

#[test]
fn mission_complete_produces_one_artifact() {
    let (mut session, calls) = session();
    session.begin(stream(&calls)).unwrap();
    assert_eq!(session.state(), SessionState::Recording);
    assert_eq!(calls.started.get(), 1);

    assert!(session.push_fragment(vec![1, 2]));
    assert!(!session.push_fragment(Vec::new()));
    assert!(session.push_fragment(vec![3]));
    assert_eq!(session.buffered(), 2);

    session.on_mission_complete();
    session.on_mission_complete();
    assert_eq!(session.state(), SessionState::Finalizing);
    assert_eq!(calls.stop_requests.get(), 1);

    // the encoder flushes its last chunk on stop
    assert!(session.push_fragment(vec![4]));

    assert_eq!(session.on_recorder_stopped(), Ok(Some(vec![1, 2, 3, 4])));
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(session.on_recorder_stopped(), Ok(None));
    assert!(!session.push_fragment(vec![5]));

    session.teardown();
    session.teardown();
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(calls.tracks_stopped.get(), 1);
}

#[test]
fn teardown_while_recording_discards_everything() {
    let (mut session, calls) = session();
    session.begin(stream(&calls)).unwrap();
    session.push_fragment(vec![9; 16]);

    session.teardown();
    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(session.buffered(), 0);
    assert_eq!(calls.stop_requests.get(), 1);
    assert_eq!(calls.tracks_stopped.get(), 1);
    assert!(session.stream().is_none());

    // a completion racing the teardown finds nothing to save
    session.on_mission_complete();
    assert_eq!(session.on_recorder_stopped(), Ok(None));
    assert!(!session.push_fragment(vec![1]));

    session.teardown();
    assert_eq!(calls.tracks_stopped.get(), 1);
}

#[test]
fn teardown_while_finalizing_keeps_the_artifact() {
    let (mut session, calls) = session();
    session.begin(stream(&calls)).unwrap();
    session.push_fragment(vec![1, 2, 3]);
    session.on_mission_complete();

    // e.g. the page is hidden before the encoder reports its stop
    session.teardown();
    assert_eq!(session.state(), SessionState::Finalizing);
    assert_eq!(calls.tracks_stopped.get(), 1);
    assert_eq!(calls.stop_requests.get(), 1);

    assert_eq!(session.on_recorder_stopped(), Ok(Some(vec![1, 2, 3])));
    assert_eq!(session.state(), SessionState::Done);

    session.teardown();
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(calls.tracks_stopped.get(), 1);
}

#[test]
fn dropping_a_session_releases_the_camera() {
    let (mut session, calls) = session();
    session.begin(stream(&calls)).unwrap();
    drop(session);
    assert_eq!(calls.stop_requests.get(), 1);
    assert_eq!(calls.tracks_stopped.get(), 1);
}

#[test]
fn sessions_are_single_use() {
    let (mut session, calls) = session();
    session.begin(stream(&calls)).unwrap();
    assert_eq!(
        session.begin(stream(&calls)),
        Err(RecordingError::AlreadyStarted)
    );
    assert_eq!(calls.started.get(), 1);

    let (mut idle, _) = self::session();
    idle.teardown();
    assert_eq!(idle.state(), SessionState::Cancelled);
    assert_eq!(idle.begin(stream(&calls)), Err(RecordingError::AlreadyStarted));
}

#[test]
fn recorder_failure_releases_the_stream() {
    let (mut session, calls) = session();
    calls.fail_open.set(true);
    assert!(matches!(
        session.begin(stream(&calls)),
        Err(RecordingError::Recorder(_))
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.stream().is_none());
    assert_eq!(calls.tracks_stopped.get(), 1);

    session.teardown();
    assert_eq!(calls.tracks_stopped.get(), 1);
    assert_eq!(calls.stop_requests.get(), 0);
}

#[test]
fn retry_after_recorder_failure_releases_both_streams() {
    let (mut session, first) = session();
    first.fail_open.set(true);
    assert!(session.begin(stream(&first)).is_err());

    let second = Rc::new(Calls::default());
    session.begin(stream(&second)).unwrap();
    assert_eq!(session.state(), SessionState::Recording);

    session.teardown();
    assert_eq!(first.tracks_stopped.get(), 1);
    assert_eq!(second.tracks_stopped.get(), 1);
}

#[test]
fn recorder_start_failure_releases_the_stream() {
    let (mut session, calls) = session();
    calls.fail_start.set(true);
    assert!(matches!(
        session.begin(stream(&calls)),
        Err(RecordingError::Recorder(_))
    ));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(calls.tracks_stopped.get(), 1);
}

/// Save target with a scripted share result.
struct FakeSaver {
    share: ShareOutcome,
    save_fails: bool,
    share_attempts: Cell<u32>,
    saved: RefCell<Vec<String>>,
}

impl FakeSaver {
    fn new(share: ShareOutcome, save_fails: bool) -> Self {
        FakeSaver {
            share,
            save_fails,
            share_attempts: Cell::new(0),
            saved: RefCell::new(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl SaveTarget for FakeSaver {
    type Artifact = Vec<u8>;

    async fn try_share_preferred(&self, _: &Vec<u8>, _: &str) -> ShareOutcome {
        bump(&self.share_attempts);
        self.share.clone()
    }

    async fn fallback_save(&self, _: &Vec<u8>, file_name: &str) -> Result<(), RecordingError> {
        if self.save_fails {
            return Err(RecordingError::SaveFailed("disk full".to_string()));
        }
        self.saved.borrow_mut().push(file_name.to_string());
        Ok(())
    }
}

const FILE: &str = "video-2024-05-01T12-30-05.123Z.webm";

#[test]
fn share_success_skips_the_fallback() {
    let saver = FakeSaver::new(ShareOutcome::Shared, false);
    assert_eq!(block_on(finalize(&saver, &vec![1], FILE)), Ok(SaveOutcome::Shared));
    assert_eq!(saver.share_attempts.get(), 1);
    assert!(saver.saved.borrow().is_empty());
}

#[test]
fn unsupported_share_falls_back_to_save() {
    let saver = FakeSaver::new(ShareOutcome::Unsupported, false);
    assert_eq!(block_on(finalize(&saver, &vec![1], FILE)), Ok(SaveOutcome::Saved));
    assert_eq!(*saver.saved.borrow(), vec![FILE.to_string()]);
}

#[test]
fn failed_share_falls_back_to_save() {
    let saver = FakeSaver::new(ShareOutcome::Failed("AbortError".to_string()), false);
    assert_eq!(block_on(finalize(&saver, &vec![1], FILE)), Ok(SaveOutcome::Saved));
    assert_eq!(saver.share_attempts.get(), 1);
    assert_eq!(saver.saved.borrow().len(), 1);
}

#[test]
fn both_paths_failing_is_reported() {
    let saver = FakeSaver::new(ShareOutcome::Failed("AbortError".to_string()), true);
    assert_eq!(
        block_on(finalize(&saver, &vec![1], FILE)),
        Err(RecordingError::SaveFailed("disk full".to_string()))
    );
}

#[test]
fn double_completion_saves_once() {
    let (mut session, calls) = session();
    let saver = FakeSaver::new(ShareOutcome::Unsupported, false);
    session.begin(stream(&calls)).unwrap();
    session.push_fragment(vec![7, 7]);

    let mut artifacts = Vec::new();
    for _ in 0..2 {
        session.on_mission_complete();
        if let Ok(Some(artifact)) = session.on_recorder_stopped() {
            artifacts.push(artifact);
        }
    }
    for artifact in &artifacts {
        block_on(finalize(&saver, artifact, FILE)).unwrap();
    }

    assert_eq!(artifacts, vec![vec![7, 7]]);
    assert_eq!(saver.saved.borrow().len(), 1);
    assert_eq!(calls.stop_requests.get(), 1);
}
