use std::time::Duration;

use crate::animation::{AnimatedValue, SpringSpec, TimingSpec, Transition};
use crate::config::MeterConfig;

/// How the backend applies the handle position. The math is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlePlacement {
    /// Glyphs drawn at the origin inside a translated container.
    Transform,
    /// Glyphs drawn directly at the handle position.
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandlePosition {
    Transform { translate_y: f64 },
    Inline { y: f64 },
}

impl HandlePosition {
    pub fn y(self) -> f64 {
        match self {
            HandlePosition::Transform { translate_y } => translate_y,
            HandlePosition::Inline { y } => y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleFrame {
    pub position: HandlePosition,
    pub circle_radius: f64,
    pub circle_opacity: f64,
    /// Opacity of the resting triangle pair; the inverse of the circle.
    pub arrows_opacity: f64,
}

/// Vertical position for a percentage, tracking the tape boundary.
pub fn handle_y(height: f64, percentage: f64, offset: f64) -> f64 {
    height - (height * percentage).floor() - offset
}

#[derive(Debug, Clone)]
pub struct HandleRenderer {
    offset: f64,
    radius_rest: f64,
    radius_pressed: f64,
    spring: SpringSpec,
    fade: TimingSpec,
    placement: HandlePlacement,
    pressed: bool,
    radius: AnimatedValue,
    circle_opacity: AnimatedValue,
}

impl HandleRenderer {
    pub fn from_config(config: &MeterConfig) -> Self {
        Self {
            offset: config.handle_offset,
            radius_rest: config.handle_radius_rest,
            radius_pressed: config.handle_radius_pressed,
            spring: config.press_spring,
            fade: config.handle_fade,
            placement: config.handle_placement,
            pressed: false,
            radius: AnimatedValue::new(config.handle_radius_rest),
            circle_opacity: AnimatedValue::new(0.0),
        }
    }

    /// Starts the press or release transitions when `pressed` flips.
    pub fn sync(&mut self, pressed: bool, now: Duration) {
        if pressed == self.pressed {
            return;
        }
        self.pressed = pressed;
        let (radius, opacity) = if pressed {
            (self.radius_pressed, 1.0)
        } else {
            (self.radius_rest, 0.0)
        };
        self.radius
            .animate_to(radius, Transition::Spring(self.spring), now);
        self.circle_opacity
            .animate_to(opacity, Transition::Timed(self.fade), now);
    }

    pub fn derive(&self, percentage: f64, height: f64, now: Duration) -> HandleFrame {
        let y = handle_y(height, percentage, self.offset);
        let circle_opacity = self.circle_opacity.sample(now).clamp(0.0, 1.0);
        HandleFrame {
            position: match self.placement {
                HandlePlacement::Transform => HandlePosition::Transform { translate_y: y },
                HandlePlacement::Inline => HandlePosition::Inline { y },
            },
            circle_radius: self.radius.sample(now).max(0.0),
            circle_opacity,
            arrows_opacity: 1.0 - circle_opacity,
        }
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        self.radius.is_animating(now) || self.circle_opacity.is_animating(now)
    }
}
