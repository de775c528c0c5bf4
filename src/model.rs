use std::time::Duration;

use log::{debug, trace};

use crate::animation::{AnimatedValue, SpringSpec, Transition};
use crate::config::MeterConfig;
use crate::error::MeterError;
use crate::readout::{Readout, ReadoutUpdate};

/// Bounded scalar plus the press signals derived renderers read.
pub struct ValueModel {
    raw_value: f64,
    max_value: f64,
    percentage: f64,
    percentage_ceiling: f64,
    sensitivity: f64,
    base_offset: f64,

    pressed: bool,
    press_anchor: f64,
    last_delta: Option<f64>,
    pressed_depth: f64,
    press_spring: SpringSpec,
    depth: AnimatedValue,

    label: String,
    unit: String,
    readout: Option<Box<dyn Readout>>,
}

/// Everything a renderer needs from the model for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSnapshot {
    pub value: f64,
    pub percentage: f64,
    pub pressed: bool,
    pub depth: f64,
}

impl ValueModel {
    pub fn new(initial_value: f64, max_value: f64) -> Result<Self, MeterError> {
        let config = MeterConfig::builder()
            .max_value(max_value)
            .initial_value(initial_value)
            .build();
        Self::from_config(&config)
    }

    pub fn from_config(config: &MeterConfig) -> Result<Self, MeterError> {
        config.validate()?;
        let mut model = Self {
            raw_value: 0.0,
            max_value: config.max_value,
            percentage: 0.0,
            percentage_ceiling: config.percentage_ceiling,
            sensitivity: config.sensitivity,
            base_offset: config.base_offset,
            pressed: false,
            press_anchor: 0.0,
            last_delta: None,
            pressed_depth: config.pressed_depth,
            press_spring: config.press_spring,
            depth: AnimatedValue::new(0.0),
            label: config.label.clone(),
            unit: config.unit.clone(),
            readout: None,
        };
        if config.initial_value.is_nan() {
            model.store(0.0);
        } else {
            model.store(config.initial_value);
        }
        debug!(
            "value model created: value={} max={}",
            model.raw_value, model.max_value
        );
        Ok(model)
    }

    /// Attaches the readout and pushes the current value to it.
    pub fn set_readout(&mut self, readout: Box<dyn Readout>) {
        self.readout = Some(readout);
        self.notify_value();
    }

    pub fn value(&self) -> f64 {
        self.raw_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn depth(&self, now: Duration) -> f64 {
        self.depth.sample(now)
    }

    pub fn depth_target(&self) -> f64 {
        self.depth.target()
    }

    pub fn snapshot(&self, now: Duration) -> ModelSnapshot {
        ModelSnapshot {
            value: self.raw_value,
            percentage: self.percentage,
            pressed: self.pressed,
            depth: self.depth(now),
        }
    }

    /// Clamps into `[0, max]` and notifies the readout if the value moved.
    /// Returns whether the stored value changed.
    ///
    /// During a press the drag is re-based on the new value, so the next
    /// move only adds the finger travel made after this call.
    pub fn set_value(&mut self, value: f64) -> bool {
        if !self.apply(value) {
            return false;
        }
        if self.pressed {
            self.press_anchor = match self.last_delta {
                Some(delta_y) => self.raw_value - self.base_offset + delta_y / self.sensitivity,
                None => self.raw_value,
            };
        }
        true
    }

    /// Records the live value as the start of a new drag.
    pub fn anchor(&mut self) {
        self.press_anchor = self.raw_value;
        self.last_delta = None;
    }

    /// Returns false if already pressed.
    pub fn begin_press(&mut self, now: Duration) -> bool {
        if self.pressed {
            return false;
        }
        self.pressed = true;
        self.anchor();
        self.depth.animate_to(
            self.pressed_depth,
            Transition::Spring(self.press_spring),
            now,
        );
        debug!("press began at value {}", self.raw_value);
        if let Some(readout) = self.readout.as_mut() {
            readout.press_changed(true);
        }
        true
    }

    /// `delta_y` is measured from where the gesture started; upward travel is
    /// negative and raises the value.
    pub fn update_from_delta(&mut self, delta_y: f64) -> bool {
        if !delta_y.is_finite() {
            trace!("ignoring non-finite drag delta");
            return false;
        }
        let anchor = if self.pressed {
            self.last_delta = Some(delta_y);
            self.press_anchor
        } else {
            self.raw_value
        };
        let next = (anchor + self.base_offset - delta_y / self.sensitivity).round();
        self.apply(next)
    }

    /// Idempotent: returns false and does nothing when not pressed.
    pub fn end_press(&mut self, now: Duration) -> bool {
        if !self.pressed {
            return false;
        }
        self.pressed = false;
        self.depth
            .animate_to(0.0, Transition::Spring(self.press_spring), now);
        debug!("press ended at value {}", self.raw_value);
        if let Some(readout) = self.readout.as_mut() {
            readout.press_changed(false);
        }
        true
    }

    fn apply(&mut self, value: f64) -> bool {
        if value.is_nan() {
            trace!("ignoring NaN value");
            return false;
        }
        let previous = self.raw_value;
        self.store(value);
        if self.raw_value == previous {
            return false;
        }
        trace!("value {} -> {}", previous, self.raw_value);
        self.notify_value();
        true
    }

    fn store(&mut self, value: f64) {
        self.raw_value = value.clamp(0.0, self.max_value);
        self.percentage = (self.raw_value / self.max_value).clamp(0.0, self.percentage_ceiling);
    }

    fn notify_value(&mut self) {
        if let Some(readout) = self.readout.as_mut() {
            readout.value_changed(&ReadoutUpdate::new(&self.label, self.raw_value, &self.unit));
        }
    }
}

impl std::fmt::Debug for ValueModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueModel")
            .field("raw_value", &self.raw_value)
            .field("max_value", &self.max_value)
            .field("percentage", &self.percentage)
            .field("pressed", &self.pressed)
            .field("depth_target", &self.depth.target())
            .finish()
    }
}
