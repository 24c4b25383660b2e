use crate::browser;
use anyhow::{anyhow, Error, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - because we control the closure creation and specify the expected type,
    // in principle this should be generally safe (unsafe) code
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use self::input::PointerState;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    /// `dt` is wall time since the previous frame.
    fn update(&mut self, dt: Duration, pointer: &PointerState);
    fn draw(&mut self, renderer: &Renderer);
}

// a backgrounded tab stops animation frames; on return we resume instead of
// replaying the whole absence at once
const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

pub struct GameLoop {
    last_frame: f64,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let (mut pointer_events, pointer_listener) = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let mut pointer = PointerState::default();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            // the loop lives as long as the page, and so does the listener
            let _ = &pointer_listener;
            input::process_input(&mut pointer, &mut pointer_events);
            let dt = game_loop.frame_delta(perf);
            game.update(dt, &pointer);
            game.draw(&renderer);
            if let Some(next) = f.borrow().as_ref() {
                let _ = browser::request_animation_frame(next);
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }

    fn frame_delta(&mut self, perf: f64) -> Duration {
        let millis = (perf - self.last_frame).max(0.0);
        self.last_frame = perf;
        Duration::from_secs_f64(millis / 1000.0).min(MAX_FRAME_DELTA)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    /// Rect of `size` centered on `center`.
    pub fn centered(center: Point, size: Size) -> Self {
        Rect {
            position: Point {
                x: center.x - size.width / 2.0,
                y: center.y - size.height / 2.0,
            },
            size,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.position.x
            && point.x <= self.position.x + self.size.width
            && point.y >= self.position.y
            && point.y <= self.position.y + self.size.height
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn size(&self) -> Size {
        self.context
            .canvas()
            .map(|canvas| Size {
                width: canvas.width().into(),
                height: canvas.height().into(),
            })
            .unwrap_or_default()
    }

    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.position.x,
            rect.position.y,
            rect.size.width,
            rect.size.height,
        );
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.position.x,
            rect.position.y,
            rect.size.width,
            rect.size.height,
        );
    }

    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect, opacity: f64) {
        self.context.set_global_alpha(opacity);
        // a not-yet-decoded image throws; skip the frame rather than abort
        let _ = self.context.draw_image_with_html_image_element_and_dw_and_dh(
            image,
            destination.position.x,
            destination.position.y,
            destination.size.width,
            destination.size.height,
        );
        self.context.set_global_alpha(1.0);
    }

    /// Centered text.
    pub fn draw_text(&self, text: &str, position: Point, font: &str, color: &str) {
        self.context.set_font(font);
        self.context.set_fill_style_str(color);
        self.context.set_text_align("center");
        let _ = self.context.fill_text(text, position.x, position.y);
    }

    pub fn draw_text_left(&self, text: &str, position: Point, font: &str, color: &str) {
        self.context.set_font(font);
        self.context.set_fill_style_str(color);
        self.context.set_text_align("left");
        let _ = self.context.fill_text(text, position.x, position.y);
    }

    /// Arc starting at 12 o'clock, covering `fraction` of a full turn.
    pub fn draw_progress_arc(&self, center: Point, radius: f64, fraction: f64, color: &str) {
        let start = -std::f64::consts::FRAC_PI_2;
        let end = start + fraction.clamp(0.0, 1.0) * std::f64::consts::TAU;
        self.context.begin_path();
        self.context.set_stroke_style_str(color);
        self.context.set_line_width(6.0);
        let _ = self.context.arc(center.x, center.y, radius, start, end);
        self.context.stroke();
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image: {:#?}",
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - double unwrap because Result<Result<(), Error>, oneshot::Canceled>
    // - first unwrap yields channel result : Result<(), Error>
    // - second unwrap yields image load result : () or propagating Error
    rx.await??;

    Ok(image)
}

pub mod input {
    use super::Point;
    use crate::browser::{self, EventListener};
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use wasm_bindgen::JsCast;
    use web_sys::MouseEvent;

    /// Pointer input sampled once per frame.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PointerState {
        pressed_at: Option<Point>,
    }

    impl PointerState {
        pub fn pressed_at(&self) -> Option<Point> {
            self.pressed_at
        }
    }

    /// Listen for presses on the canvas. Positions are in canvas pixels,
    /// corrected for CSS scaling.
    pub fn prepare_input() -> Result<(UnboundedReceiver<Point>, EventListener)> {
        let (sender, receiver) = unbounded();
        let canvas = browser::canvas()?;
        let target = canvas.clone();
        let listener = EventListener::new(&target, "pointerdown", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let scale_x = f64::from(canvas.width()) / f64::from(canvas.client_width().max(1));
            let scale_y = f64::from(canvas.height()) / f64::from(canvas.client_height().max(1));
            let _ = sender.unbounded_send(Point {
                x: f64::from(event.offset_x()) * scale_x,
                y: f64::from(event.offset_y()) * scale_y,
            });
        })?;
        Ok((receiver, listener))
    }

    /// Drain queued presses; the last one of the frame wins.
    pub fn process_input(state: &mut PointerState, receiver: &mut UnboundedReceiver<Point>) {
        state.pressed_at = None;
        while let Ok(point) = receiver.try_recv() {
            state.pressed_at = Some(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_contains_its_center() {
        let rect = Rect::centered(
            Point { x: 100.0, y: 50.0 },
            Size {
                width: 80.0,
                height: 40.0,
            },
        );
        assert_eq!(rect.position, Point { x: 60.0, y: 30.0 });
        assert!(rect.contains(Point { x: 100.0, y: 50.0 }));
        assert!(!rect.contains(Point { x: 141.0, y: 50.0 }));
    }

    #[test]
    fn last_press_of_the_frame_wins() {
        let (sender, mut receiver) = futures::channel::mpsc::unbounded();
        let mut pointer = input::PointerState::default();
        sender.unbounded_send(Point { x: 1.0, y: 2.0 }).unwrap();
        sender.unbounded_send(Point { x: 3.0, y: 4.0 }).unwrap();

        input::process_input(&mut pointer, &mut receiver);
        assert_eq!(pointer.pressed_at(), Some(Point { x: 3.0, y: 4.0 }));

        // nothing queued: the press does not linger into the next frame
        input::process_input(&mut pointer, &mut receiver);
        assert_eq!(pointer.pressed_at(), None);
    }

    #[test]
    fn frame_delta_is_clamped() {
        let mut game_loop = GameLoop { last_frame: 1000.0 };
        let dt = game_loop.frame_delta(1016.0);
        assert!((dt.as_secs_f64() - 0.016).abs() < 1e-9);
        assert_eq!(game_loop.frame_delta(9000.0), MAX_FRAME_DELTA);
        // clock going backwards never yields negative time
        assert_eq!(game_loop.frame_delta(500.0), Duration::ZERO);
    }
}
