// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

pub mod animation;
pub mod canvas;
pub mod config;
pub mod error;
pub mod gesture;
pub mod handle;
pub mod model;
pub mod readout;
pub mod scale;

// External crate imports
use log::{debug, info};
use pixels::{Pixels, SurfaceTexture};
use rusttype::Font;

// Standard library imports
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

// Window management imports
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

pub use config::{Color, ColorRole, MeterConfig, Palette, Theme};
pub use error::MeterError;
pub use gesture::{DragEvent, GestureController, GestureState, PointerId, MOUSE_POINTER};
pub use handle::{HandleFrame, HandlePlacement, HandlePosition, HandleRenderer};
pub use model::{ModelSnapshot, ValueModel};
pub use readout::{ChannelReadout, Fanout, Monitor, MonitorCard, Readout, ReadoutUpdate};
pub use scale::{LineSet, ScaleFrame, ScaleInputs, ScaleRenderer, Tick};

use canvas::{Canvas, DrawCommand, Scene, TextAlign};
use scale::ScaleGeometry;

// ============================================================================
// PUBLIC API - MAIN INTERFACE
// ============================================================================

/// Command enum for driving a shown meter from another thread
#[derive(Debug, Clone)]
pub enum MeterCommand {
    SetValue(f64),
    SetTheme(Theme),
    Press,
    Release,
}

/// Everything derived for one display frame.
#[derive(Debug)]
pub struct MeterFrame<'a> {
    pub snapshot: ModelSnapshot,
    pub viewport_height: f64,
    pub scale: &'a ScaleFrame,
    pub handle: HandleFrame,
}

/// Drag-to-set tape meter: value model, gesture handling and derived visuals.
pub struct Meter {
    config: MeterConfig,
    palette: Palette,
    font: Option<Font<'static>>,
    model: ValueModel,
    gesture: GestureController,
    scale: ScaleRenderer,
    handle: HandleRenderer,
    monitor: Rc<RefCell<Monitor>>,
}

impl Meter {
    pub fn new(config: MeterConfig) -> Result<Self, MeterError> {
        Self::with_monitor(config, Monitor::default())
    }

    /// Uses `monitor` as the readout panel; the meter's own card is added or
    /// updated with the current value immediately.
    pub fn with_monitor(config: MeterConfig, monitor: Monitor) -> Result<Self, MeterError> {
        Self::build(config, monitor, None)
    }

    /// Like [`Meter::with_monitor`], also notifying `readout`.
    pub fn with_readout(
        config: MeterConfig,
        monitor: Monitor,
        readout: Box<dyn Readout>,
    ) -> Result<Self, MeterError> {
        Self::build(config, monitor, Some(readout))
    }

    fn build(
        config: MeterConfig,
        monitor: Monitor,
        readout: Option<Box<dyn Readout>>,
    ) -> Result<Self, MeterError> {
        let mut model = ValueModel::from_config(&config)?;
        let font = match config.font_data.clone() {
            Some(data) => Some(Font::try_from_vec(data).ok_or(MeterError::Font)?),
            None => {
                log::warn!("no font configured, readout text will not be drawn");
                None
            }
        };

        let monitor = Rc::new(RefCell::new(monitor));
        let mut sinks = Fanout::new().with(Box::new(Rc::clone(&monitor)));
        if let Some(readout) = readout {
            sinks = sinks.with(readout);
        }
        model.set_readout(Box::new(sinks));

        debug!(
            "meter '{}' created with {} ticks per line set",
            config.title, config.total_lines
        );
        Ok(Self {
            palette: config.theme.resolve(),
            font,
            gesture: GestureController::new(),
            scale: ScaleRenderer::new(ScaleGeometry::from_config(&config)),
            handle: HandleRenderer::from_config(&config),
            monitor,
            model,
            config,
        })
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    pub fn model(&self) -> &ValueModel {
        &self.model
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture.state()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn monitor(&self) -> Monitor {
        self.monitor.borrow().clone()
    }

    pub fn handle_drag(&mut self, event: DragEvent, now: Duration) -> bool {
        let changed = self.gesture.handle(event, &mut self.model, now);
        self.handle.sync(self.model.is_pressed(), now);
        changed
    }

    pub fn set_value(&mut self, value: f64) -> bool {
        self.model.set_value(value)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.palette = theme.resolve();
        self.config.theme = theme;
    }

    pub fn apply(&mut self, command: MeterCommand, now: Duration) {
        match command {
            MeterCommand::SetValue(value) => {
                self.model.set_value(value);
            }
            MeterCommand::SetTheme(theme) => self.set_theme(theme),
            MeterCommand::Press => {
                self.model.begin_press(now);
            }
            MeterCommand::Release => {
                self.gesture.release(&mut self.model, now);
            }
        }
        self.handle.sync(self.model.is_pressed(), now);
    }

    /// Derives the scale and handle for `now`. Only ticks near the boundary
    /// are re-derived between consecutive frames.
    pub fn frame(&mut self, now: Duration, viewport_height: f64) -> MeterFrame<'_> {
        derive_frame(
            &self.model,
            &mut self.scale,
            &self.handle,
            &self.palette,
            now,
            viewport_height,
        )
    }

    /// Derives a frame and lays it out for a `width` x `height` surface.
    pub fn scene(&mut self, now: Duration, width: usize, height: usize) -> Scene {
        let viewport_height = self.config.viewport_height(height as f64);
        let frame = derive_frame(
            &self.model,
            &mut self.scale,
            &self.handle,
            &self.palette,
            now,
            viewport_height,
        );
        let monitor = self.monitor.borrow();
        compose_scene(&frame, &self.palette, monitor.cards(), &self.config, width, height)
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        self.model.depth(now) != self.model.depth_target() || self.handle.is_animating(now)
    }

    pub fn show(self) -> Result<(), MeterError> {
        self.run_window(None)
    }

    pub fn show_with_commands(self, receiver: Receiver<MeterCommand>) -> Result<(), MeterError> {
        self.run_window(Some(receiver))
    }

    fn update_with_commands(&mut self, receiver: &Receiver<MeterCommand>, now: Duration) {
        while let Ok(command) = receiver.try_recv() {
            self.apply(command, now);
        }
    }

    fn run_window(mut self, receiver: Option<Receiver<MeterCommand>>) -> Result<(), MeterError> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(
                self.config.window_width as f64,
                self.config.window_height as f64,
            ))
            .build(&event_loop)?;

        let window = std::sync::Arc::new(window);
        let window_clone = window.clone();
        let size = window.inner_size();
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;
        info!("meter window opened at {}x{}", fb_width, fb_height);

        let frame_duration = Duration::from_secs_f64(1.0 / self.config.max_framerate.max(1.0));
        let clock = Instant::now();
        let mut last_frame = Instant::now();
        let mut cursor_y = 0.0;

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            let now = clock.elapsed();
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        fb_width = new_size.width as usize;
                        fb_height = new_size.height as usize;
                        debug!("resized to {}x{}", fb_width, fb_height);
                        let _ = pixels.resize_buffer(new_size.width, new_size.height);
                        let _ = pixels.resize_surface(new_size.width, new_size.height);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        cursor_y = position.y;
                        self.handle_drag(
                            DragEvent::Move {
                                pointer: MOUSE_POINTER,
                                y: cursor_y,
                            },
                            now,
                        );
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        let event = match state {
                            ElementState::Pressed => DragEvent::Begin {
                                pointer: MOUSE_POINTER,
                                y: cursor_y,
                            },
                            ElementState::Released => DragEvent::End {
                                pointer: MOUSE_POINTER,
                            },
                        };
                        self.handle_drag(event, now);
                    }
                    WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                        self.handle_drag(
                            DragEvent::Cancel {
                                pointer: MOUSE_POINTER,
                            },
                            now,
                        );
                    }
                    WindowEvent::Touch(touch) => {
                        let pointer = touch.id;
                        let y = touch.location.y;
                        let event = match touch.phase {
                            TouchPhase::Started => DragEvent::Begin { pointer, y },
                            TouchPhase::Moved => DragEvent::Move { pointer, y },
                            TouchPhase::Ended => DragEvent::End { pointer },
                            TouchPhase::Cancelled => DragEvent::Cancel { pointer },
                        };
                        self.handle_drag(event, now);
                    }
                    WindowEvent::RedrawRequested => {
                        if let Some(ref receiver) = receiver {
                            self.update_with_commands(receiver, now);
                        }

                        let scene = self.scene(now, fb_width, fb_height);
                        let mut canvas = Canvas::new(pixels.frame_mut(), fb_width, fb_height);
                        scene.render(&mut canvas, self.font.as_ref());
                        let _ = pixels.render();
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }
}

fn derive_frame<'a>(
    model: &ValueModel,
    scale: &'a mut ScaleRenderer,
    handle: &HandleRenderer,
    palette: &Palette,
    now: Duration,
    viewport_height: f64,
) -> MeterFrame<'a> {
    let snapshot = model.snapshot(now);
    let inputs = ScaleInputs {
        percentage: snapshot.percentage,
        depth: snapshot.depth,
        height: viewport_height,
    };
    MeterFrame {
        snapshot,
        viewport_height,
        scale: scale.update(inputs, palette),
        handle: handle.derive(snapshot.percentage, viewport_height, now),
    }
}

// ============================================================================
// SCENE COMPOSITION
// ============================================================================

const TAPE_LEFT: f32 = 24.0;
const TAPE_GAP: f32 = 6.0;
const HANDLE_GAP: f32 = 14.0;
const ARROW_SIZE: f32 = 5.0;
const CARD_SPACING: i32 = 76;

/// Lays a derived frame out as draw commands for a `width` x `height` surface.
pub fn compose_scene(
    frame: &MeterFrame<'_>,
    palette: &Palette,
    cards: &[MonitorCard],
    config: &MeterConfig,
    width: usize,
    height: usize,
) -> Scene {
    let mut scene = Scene::new();
    scene.add_command(DrawCommand::Clear(palette.background));

    let top = (config.viewport_margin / 2.0) as f32;
    let outer_right = TAPE_LEFT + config.tape_width as f32;
    let inner_left = outer_right + TAPE_GAP;

    for tick in &frame.scale.outer {
        let y = top + tick.y as f32;
        let x = outer_right + tick.offset as f32;
        scene.add_command(DrawCommand::Line {
            x0: x,
            y0: y,
            x1: x - tick.length as f32,
            y1: y,
            thickness: tick.stroke,
            color: frame.scale.color_of(tick),
            alpha: tick.opacity as f32,
        });
    }
    for tick in &frame.scale.inner {
        let y = top + tick.y as f32;
        let x = inner_left + tick.offset as f32;
        scene.add_command(DrawCommand::Line {
            x0: x,
            y0: y,
            x1: x + tick.length as f32,
            y1: y,
            thickness: tick.stroke,
            color: frame.scale.color_of(tick),
            alpha: tick.opacity as f32,
        });
    }

    let handle_x = inner_left + config.inner_tape_width as f32 + HANDLE_GAP;
    let handle_y = top + frame.handle.position.y() as f32;
    scene.add_command(DrawCommand::Circle {
        cx: handle_x,
        cy: handle_y,
        radius: frame.handle.circle_radius as f32,
        color: frame.scale.fill_color,
        alpha: frame.handle.circle_opacity as f32,
    });
    for direction in [-1.0f32, 1.0] {
        let tip = handle_y + direction * (ARROW_SIZE * 2.0);
        let base = handle_y + direction * ARROW_SIZE * 0.6;
        scene.add_command(DrawCommand::Triangle {
            points: [
                (handle_x, tip),
                (handle_x - ARROW_SIZE, base),
                (handle_x + ARROW_SIZE, base),
            ],
            color: palette.text,
            alpha: frame.handle.arrows_opacity as f32,
        });
    }

    let right = width as i32 - 16;
    let mut baseline = height as i32 - 42;
    for card in cards.iter().rev() {
        let alpha = if card.faded { 0.6 } else { 1.0 };
        scene.add_command(DrawCommand::Text {
            x: right,
            y: baseline,
            text: card.display(),
            font_size: config.readout_font_size,
            align: TextAlign::Right,
            color: palette.text,
            alpha,
        });
        scene.add_command(DrawCommand::Text {
            x: right,
            y: baseline - (config.readout_font_size as i32 / 2) - 10,
            text: card.label.clone(),
            font_size: config.readout_label_font_size,
            align: TextAlign::Right,
            color: palette.text,
            alpha: 0.6,
        });
        baseline -= CARD_SPACING;
    }

    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter() -> Meter {
        let config = MeterConfig::builder()
            .max_value(200.0)
            .initial_value(120.0)
            .build();
        Meter::new(config).unwrap()
    }

    #[test]
    fn construction_pushes_initial_value_to_monitor() {
        let meter = meter();
        let monitor = meter.monitor();
        assert_eq!(monitor.card("Temperature").map(|c| c.display()), Some("120°C".to_string()));
    }

    #[test]
    fn bad_font_is_rejected() {
        let config = MeterConfig::builder()
            .max_value(10.0)
            .font_data(vec![0, 1, 2, 3])
            .build();
        assert!(matches!(Meter::new(config), Err(MeterError::Font)));
    }

    #[test]
    fn commands_press_and_release() {
        let mut meter = meter();
        meter.apply(MeterCommand::Press, Duration::ZERO);
        assert!(meter.model().is_pressed());
        meter.apply(MeterCommand::SetValue(30.0), Duration::ZERO);
        assert_eq!(meter.model().value(), 30.0);
        meter.apply(MeterCommand::Release, Duration::from_millis(10));
        assert!(!meter.model().is_pressed());
        assert_eq!(meter.gesture_state(), GestureState::Idle);
    }

    #[test]
    fn release_command_ends_active_gesture() {
        let mut meter = meter();
        meter.handle_drag(DragEvent::Begin { pointer: 3, y: 200.0 }, Duration::ZERO);
        meter.apply(MeterCommand::Release, Duration::ZERO);
        assert!(!meter.handle_drag(DragEvent::Move { pointer: 3, y: 0.0 }, Duration::ZERO));
        assert_eq!(meter.model().value(), 120.0);
    }

    #[test]
    fn theme_change_recolors_frame() {
        let mut meter = meter();
        meter.set_theme(Theme::dark());
        let frame = meter.frame(Duration::ZERO, 500.0);
        assert_eq!(frame.scale.text_color, Color::from_hex(0xECEDEE));
    }

    #[test]
    fn scene_contains_every_tick_and_both_glyphs() {
        let mut meter = meter();
        let config = meter.config().clone();
        let palette = *meter.palette();
        let cards = meter.monitor().cards().to_vec();
        let frame = meter.frame(Duration::ZERO, 500.0);
        let scene = compose_scene(&frame, &palette, &cards, &config, 240, 570);
        let lines = scene
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count();
        let triangles = scene
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Triangle { .. }))
            .count();
        assert_eq!(lines, 240);
        assert_eq!(triangles, 2);
        assert!(matches!(scene.commands()[0], DrawCommand::Clear(_)));
    }

    #[test]
    fn animation_settles_after_release() {
        let mut meter = meter();
        meter.handle_drag(DragEvent::Begin { pointer: 1, y: 0.0 }, Duration::ZERO);
        assert!(meter.is_animating(Duration::from_millis(20)));
        meter.handle_drag(DragEvent::End { pointer: 1 }, Duration::from_millis(20));
        assert!(!meter.is_animating(Duration::from_secs(5)));
    }
}
