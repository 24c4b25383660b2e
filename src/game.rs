use crate::browser::{self, EventListener};
use crate::camera;
use crate::config::{AppConfig, CameraConfig, MissionConfig};
use crate::engine::input::PointerState;
use crate::engine::{self, Game, Point, Rect, Renderer, Size};
use crate::mission::{MissionDisplay, MissionEngine, MissionFrame};
use crate::recording::web::{self, WebSession, WebShare, WebStream};
use crate::recording::SessionState;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::try_join_all;
use futures::join;
use log::{error, info, warn, LevelFilter};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use web_sys::{HtmlImageElement, MediaStream};

/// TABLE
/// ┌───────────────────── Space Journey Overview ────────────────────────────┐
/// │                                                                         │
/// │    ┌─────────┐  click   ┌───────────┐  camera   ┌──────────────────┐    │
/// │    │  Start  ├─────────►│ Launching ├──────────►│      Flight      │    │
/// │    └─────────┘          └───────────┘  (or not) │ MissionEngine    │    │
/// │         ▲                     ▲                 │ RecordingSession │    │
/// │         │ launch failed       │ "New mission"   └────────┬─────────┘    │
/// │         └─────────────────────┴──────────────────────────┘              │
/// │                                                                         │
/// ├──────────────────────── Completion Signal ──────────────────────────────┤
/// │                                                                         │
/// │  MissionEngine ──on complete──► RecordingSession::on_mission_complete   │
/// │  MediaRecorder ──onstop───────► on_recorder_stopped ──► share / save    │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum SpaceJourney {
    /// Config and images are being fetched
    Loading,

    Loaded(Journey),
}

impl SpaceJourney {
    const CONFIG_PATH: &'static str = "mission.json";

    pub fn new() -> Self {
        SpaceJourney::Loading
    }

    /// `mission.json` is optional; anything wrong with it falls back to the
    /// built-in defaults.
    async fn load_config() -> AppConfig {
        match browser::fetch_json::<AppConfig>(Self::CONFIG_PATH).await {
            Ok(config) => match config.validate() {
                Ok(()) => config,
                Err(err) => {
                    warn!("{} rejected ({}), using defaults", Self::CONFIG_PATH, err);
                    AppConfig::default()
                }
            },
            Err(err) => {
                info!("{} not loaded ({:#}), using defaults", Self::CONFIG_PATH, err);
                AppConfig::default()
            }
        }
    }

    async fn load_target_images(config: &MissionConfig) -> Result<HashMap<String, HtmlImageElement>> {
        let images = try_join_all(
            config
                .target_assets
                .iter()
                .map(|asset| engine::load_image(asset)),
        )
        .await?;
        Ok(config.target_assets.iter().cloned().zip(images).collect())
    }
}

impl Default for SpaceJourney {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Game for SpaceJourney {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            SpaceJourney::Loading => {
                let config = Self::load_config().await;
                browser::set_log_level(config.level_filter().unwrap_or(LevelFilter::Info));

                let (targets, rocket) = join!(
                    Self::load_target_images(&config.mission),
                    engine::load_image(&config.mission.rocket_asset),
                );
                let share = Rc::new(WebShare::new(&config.capture));
                Ok(Box::new(SpaceJourney::Loaded(Journey {
                    images: targets?,
                    rocket: rocket?,
                    share,
                    config,
                    screen: Screen::Start,
                    viewport: Size::default(),
                })))
            }
            SpaceJourney::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, dt: Duration, pointer: &PointerState) {
        if let SpaceJourney::Loaded(journey) = self {
            journey.update(dt, pointer);
        }
    }

    fn draw(&mut self, renderer: &Renderer) {
        if let SpaceJourney::Loaded(journey) = self {
            journey.draw(renderer);
        }
    }
}

pub struct Journey {
    config: AppConfig,
    images: HashMap<String, HtmlImageElement>,
    rocket: HtmlImageElement,
    share: Rc<WebShare>,
    screen: Screen,
    // last drawn canvas size, for hit testing
    viewport: Size,
}

enum Screen {
    Start,
    /// Waiting on the camera permission prompt
    Launching(oneshot::Receiver<Option<MediaStream>>),
    Flight(Flight),
}

impl Journey {
    fn update(&mut self, dt: Duration, pointer: &PointerState) {
        let button = button_rect(self.viewport);
        let pressed = pointer
            .pressed_at()
            .map_or(false, |point| button.contains(point));

        let next = match &mut self.screen {
            Screen::Start => pressed.then(|| request_camera(&self.config.camera)),
            Screen::Launching(camera) => match camera.try_recv() {
                Ok(None) => None,
                Ok(Some(stream)) => Some(launch(&self.config, &self.share, stream)),
                // sender dropped without an answer: fly without a camera
                Err(oneshot::Canceled) => Some(launch(&self.config, &self.share, None)),
            },
            Screen::Flight(flight) => {
                // sampled before advancing, so the frame that completes the
                // mission never also restarts it
                let settled = flight.is_settled();
                flight.engine.advance(dt);
                (settled && pressed).then(|| request_camera(&self.config.camera))
            }
        };
        if let Some(next) = next {
            // replacing a Flight drops it, which tears its recording down
            self.screen = next;
        }
    }

    fn draw(&mut self, renderer: &Renderer) {
        let size = renderer.size();
        self.viewport = size;
        renderer.clear(&Rect::new(Point::default(), size));

        match &self.screen {
            Screen::Start => draw_start(renderer, size),
            Screen::Launching(_) => {
                renderer.fill_rect(&Rect::new(Point::default(), size), BACKDROP);
                renderer.draw_text(
                    "Starting camera...",
                    Point {
                        x: size.width / 2.0,
                        y: size.height / 2.0,
                    },
                    BODY_FONT,
                    TEXT_COLOR,
                );
            }
            Screen::Flight(flight) => {
                let mut display = CanvasDisplay {
                    renderer,
                    images: &self.images,
                    rocket: &self.rocket,
                    size,
                    saving: flight.is_saving(),
                };
                flight.engine.present(&mut display);
            }
        }
    }
}

/// Camera permission is async; the answer arrives on the returned channel.
fn request_camera(config: &CameraConfig) -> Screen {
    let (tx, rx) = oneshot::channel();
    let config = config.clone();
    browser::spawn_local(async move {
        let stream = match camera::acquire(&config).await {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!("camera unavailable, flying without a live feed: {:#}", err);
                None
            }
        };
        let _ = tx.send(stream);
    });
    Screen::Launching(rx)
}

fn launch(config: &AppConfig, share: &Rc<WebShare>, stream: Option<MediaStream>) -> Screen {
    match Flight::launch(config, share.clone(), stream) {
        Ok(flight) => Screen::Flight(flight),
        Err(err) => {
            error!("could not launch mission: {:#}", err);
            Screen::Start
        }
    }
}

/// One mission run and the recording that goes with it.
struct Flight {
    engine: MissionEngine,
    session: Rc<RefCell<WebSession>>,
    _page_hide: Option<EventListener>,
}

impl Flight {
    fn launch(config: &AppConfig, share: Rc<WebShare>, stream: Option<MediaStream>) -> Result<Self> {
        let session = Rc::new(RefCell::new(WebSession::new(web::select_profile(
            &config.capture,
        ))));

        if let Some(stream) = &stream {
            if let Err(err) = camera::attach_preview(stream) {
                warn!("no camera preview: {:#}", err);
            }
        }
        if let Err(err) = session.borrow_mut().begin(stream.map(WebStream::new)) {
            warn!("mission continues without recording: {}", err);
        }
        web::wire_session(&session, share);

        let completed = Rc::downgrade(&session);
        let mut engine = MissionEngine::new(config.mission.clone())?.with_completion(move || {
            if let Some(session) = completed.upgrade() {
                session.borrow_mut().on_mission_complete();
            }
        });
        engine.start();

        // navigating away mid-mission still has to release the camera
        let hidden = Rc::downgrade(&session);
        let window = browser::window()?;
        let page_hide = EventListener::new(&window, "pagehide", move |_| {
            if let Some(session) = hidden.upgrade() {
                session.borrow_mut().teardown();
            }
        });
        let page_hide = match page_hide {
            Ok(listener) => Some(listener),
            Err(err) => {
                warn!("no pagehide teardown: {:#}", err);
                None
            }
        };

        Ok(Flight {
            engine,
            session,
            _page_hide: page_hide,
        })
    }

    /// The recorder is still flushing the finished mission's video.
    fn is_saving(&self) -> bool {
        self.session.borrow().state() == SessionState::Finalizing
    }

    /// Safe to drop: the mission is over and its recording, if any, has been
    /// handed off.
    fn is_settled(&self) -> bool {
        self.engine.state().is_complete() && !self.is_saving()
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        self.session.borrow_mut().teardown();
        camera::detach_preview();
    }
}

// ==================== Drawing ====================
const SPRITE: Size = Size {
    width: 80.0,
    height: 80.0,
};
const BACKDROP: &str = "rgba(0, 0, 0, 0.9)";
const TEXT_COLOR: &str = "#d8b4fe";
const SUBTEXT_COLOR: &str = "#e9d5ff";
const BUTTON_COLOR: &str = "#c084fc";
const BUTTON_TEXT_COLOR: &str = "#581c87";
const TITLE_FONT: &str = "bold 40px sans-serif";
const BODY_FONT: &str = "22px sans-serif";
const LABEL_FONT: &str = "bold 24px sans-serif";

struct CanvasDisplay<'a> {
    renderer: &'a Renderer,
    images: &'a HashMap<String, HtmlImageElement>,
    rocket: &'a HtmlImageElement,
    size: Size,
    saving: bool,
}

impl MissionDisplay for CanvasDisplay<'_> {
    fn present(&mut self, frame: &MissionFrame<'_>) {
        let rocket = rocket_center(self.size);
        for target in frame.targets.iter().filter(|t| t.spawned) {
            let Some(image) = self.images.get(&target.display_asset) else {
                continue;
            };
            let opacity = target_opacity(
                target.index,
                frame.current_target,
                target.position,
                self.size.height,
            );
            self.renderer.draw_image(
                image,
                &Rect::centered(target_center(self.size, target.position), SPRITE),
                opacity,
            );
        }

        self.renderer
            .draw_image(self.rocket, &Rect::centered(rocket, SPRITE), 1.0);
        if let Some(progress) = frame.dwell_progress {
            self.renderer
                .draw_progress_arc(rocket, SPRITE.width * 0.75, progress, BUTTON_COLOR);
        }

        self.renderer.draw_text_left(
            &progress_label(frame.current_target, frame.targets.len()),
            Point { x: 16.0, y: 40.0 },
            LABEL_FONT,
            TEXT_COLOR,
        );

        if frame.complete {
            draw_panel(
                self.renderer,
                self.size,
                "Mission complete!",
                &[
                    "You reached the Moon!",
                    "Congratulations on completing your space journey!",
                ],
                if self.saving {
                    "Saving video..."
                } else {
                    "New mission"
                },
            );
        }
    }
}

fn draw_start(renderer: &Renderer, size: Size) {
    draw_panel(
        renderer,
        size,
        "Welcome!",
        &[
            "You are on a space mission.",
            "Press start and travel until you find the Moon!",
        ],
        "Start mission",
    );
}

fn draw_panel(renderer: &Renderer, size: Size, title: &str, lines: &[&str], button: &str) {
    let center_x = size.width / 2.0;
    renderer.fill_rect(&Rect::new(Point::default(), size), BACKDROP);
    renderer.draw_text(
        title,
        Point {
            x: center_x,
            y: size.height * 0.3,
        },
        TITLE_FONT,
        TEXT_COLOR,
    );
    for (row, line) in lines.iter().enumerate() {
        renderer.draw_text(
            line,
            Point {
                x: center_x,
                y: size.height * 0.42 + row as f64 * 32.0,
            },
            BODY_FONT,
            SUBTEXT_COLOR,
        );
    }
    let rect = button_rect(size);
    renderer.fill_rect(&rect, BUTTON_COLOR);
    renderer.draw_text(
        button,
        Point {
            x: center_x,
            y: rect.position.y + rect.size.height / 2.0 + 8.0,
        },
        LABEL_FONT,
        BUTTON_TEXT_COLOR,
    );
}

fn button_rect(size: Size) -> Rect {
    Rect::centered(
        Point {
            x: size.width / 2.0,
            y: size.height * 0.65,
        },
        Size {
            width: 260.0,
            height: 64.0,
        },
    )
}

fn rocket_center(size: Size) -> Point {
    Point {
        x: size.width / 2.0,
        y: size.height * 0.8 - 50.0,
    }
}

/// Targets are placed on the rocket's axis, `position` pixels from it.
fn target_center(size: Size, position: f64) -> Point {
    let rocket = rocket_center(size);
    Point {
        x: rocket.x,
        y: rocket.y + position,
    }
}

/// Upcoming targets are dimmed, captured ones solid, and the current one
/// fades in as it approaches.
fn target_opacity(index: usize, current: usize, position: f64, viewport_height: f64) -> f64 {
    if index > current {
        return 0.5;
    }
    if index < current {
        return 1.0;
    }
    let max_distance = viewport_height / 2.0;
    if max_distance <= 0.0 {
        return 1.0;
    }
    (1.0 - position.abs() / max_distance).max(0.5)
}

fn progress_label(current: usize, count: usize) -> String {
    format!("{}/{}", current + 1, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_by_progress() {
        assert_eq!(target_opacity(3, 1, -150.0, 800.0), 0.5);
        assert_eq!(target_opacity(0, 1, 300.0, 800.0), 1.0);
        assert_eq!(target_opacity(1, 1, 0.0, 800.0), 1.0);
        assert!((target_opacity(1, 1, -100.0, 800.0) - 0.75).abs() < 1e-9);
        // far away never drops below half
        assert_eq!(target_opacity(1, 1, -700.0, 800.0), 0.5);
    }

    #[test]
    fn label_is_one_based() {
        assert_eq!(progress_label(0, 5), "1/5");
        assert_eq!(progress_label(4, 5), "5/5");
    }

    #[test]
    fn target_at_zero_sits_on_the_rocket() {
        let size = Size {
            width: 400.0,
            height: 800.0,
        };
        assert_eq!(target_center(size, 0.0), rocket_center(size));
        assert_eq!(target_center(size, -150.0).y, 590.0 - 150.0);
    }

    #[test]
    fn button_is_centered_horizontally() {
        let rect = button_rect(Size {
            width: 400.0,
            height: 800.0,
        });
        assert!(rect.contains(Point { x: 200.0, y: 520.0 }));
        assert!(!rect.contains(Point { x: 20.0, y: 520.0 }));
    }
}
