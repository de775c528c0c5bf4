use std::time::Duration;

use log::{debug, warn};

use crate::model::ValueModel;

/// Identifies the touch or mouse stream an event belongs to.
pub type PointerId = u64;

/// Pointer id used for mouse drags.
pub const MOUSE_POINTER: PointerId = u64::MAX;

/// Raw drag input. `y` is the pointer's vertical position in any fixed
/// coordinate space; only travel since `Begin` is used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEvent {
    Begin { pointer: PointerId, y: f64 },
    Move { pointer: PointerId, y: f64 },
    End { pointer: PointerId },
    Cancel { pointer: PointerId },
}

impl DragEvent {
    pub fn pointer(&self) -> PointerId {
        match *self {
            DragEvent::Begin { pointer, .. }
            | DragEvent::Move { pointer, .. }
            | DragEvent::End { pointer }
            | DragEvent::Cancel { pointer } => pointer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Pressing { pointer: PointerId, origin_y: f64 },
}

/// Turns one drag stream at a time into [`ValueModel`] transitions.
#[derive(Debug, Clone)]
pub struct GestureController {
    state: GestureState,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_pressing(&self) -> bool {
        matches!(self.state, GestureState::Pressing { .. })
    }

    /// Applies one event. Returns true if the model changed.
    pub fn handle(&mut self, event: DragEvent, model: &mut ValueModel, now: Duration) -> bool {
        match (self.state, event) {
            (GestureState::Idle, DragEvent::Begin { pointer, y }) => {
                if !y.is_finite() {
                    warn!("ignoring drag begin with non-finite position");
                    return false;
                }
                self.state = GestureState::Pressing {
                    pointer,
                    origin_y: y,
                };
                debug!("gesture began for pointer {}", pointer);
                let began = model.begin_press(now);
                // The model may already be pressed by a command.
                model.anchor();
                began
            }
            (GestureState::Pressing { pointer: active, .. }, DragEvent::Begin { pointer, .. }) => {
                if pointer != active {
                    debug!("ignoring second pointer {} while {} is active", pointer, active);
                }
                false
            }
            (GestureState::Pressing { pointer: active, origin_y }, DragEvent::Move { pointer, y })
                if pointer == active =>
            {
                model.update_from_delta(y - origin_y)
            }
            (GestureState::Pressing { pointer: active, .. }, DragEvent::End { pointer })
            | (GestureState::Pressing { pointer: active, .. }, DragEvent::Cancel { pointer })
                if pointer == active =>
            {
                self.release(model, now)
            }
            _ => false,
        }
    }

    /// Forces the controller back to idle, releasing the model if needed.
    pub fn release(&mut self, model: &mut ValueModel, now: Duration) -> bool {
        if let GestureState::Pressing { pointer, .. } = self.state {
            debug!("gesture ended for pointer {}", pointer);
        }
        self.state = GestureState::Idle;
        model.end_press(now)
    }
}
