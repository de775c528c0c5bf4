use bon::Builder;
use log::warn;

use crate::animation::{SpringSpec, TimingSpec};
use crate::error::MeterError;
use crate::handle::HandlePlacement;

// ============================================================================
// COLORS
// ============================================================================

/// Color representation for tape elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Used whenever a theme cannot supply a role.
    pub const NEUTRAL: Color = Color::new(0x80, 0x80, 0x80);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    pub const fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Linear RGB interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

// ============================================================================
// THEME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorRole {
    Text,
    Low,
    High,
    Background,
}

impl ColorRole {
    pub fn name(self) -> &'static str {
        match self {
            ColorRole::Text => "text",
            ColorRole::Low => "low",
            ColorRole::High => "high",
            ColorRole::Background => "background",
        }
    }
}

/// Named theme colors. Any role may be absent; see [`Theme::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    text: Option<Color>,
    low: Option<Color>,
    high: Option<Color>,
    background: Option<Color>,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            text: Some(Color::from_hex(0x393B3C)),
            low: Some(Color::from_hex(0xFF4F4F)),
            high: Some(Color::from_hex(0x4CAF50)),
            background: Some(Color::from_hex(0xFFFFFF)),
        }
    }

    pub fn dark() -> Self {
        Self {
            text: Some(Color::from_hex(0xECEDEE)),
            low: Some(Color::from_hex(0xFF5252)),
            high: Some(Color::from_hex(0x69F0AE)),
            background: Some(Color::from_hex(0x0E060A)),
        }
    }

    pub fn with(mut self, role: ColorRole, color: Color) -> Self {
        *self.slot(role) = Some(color);
        self
    }

    pub fn lookup(&self, role: ColorRole) -> Option<Color> {
        match role {
            ColorRole::Text => self.text,
            ColorRole::Low => self.low,
            ColorRole::High => self.high,
            ColorRole::Background => self.background,
        }
    }

    fn slot(&mut self, role: ColorRole) -> &mut Option<Color> {
        match role {
            ColorRole::Text => &mut self.text,
            ColorRole::Low => &mut self.low,
            ColorRole::High => &mut self.high,
            ColorRole::Background => &mut self.background,
        }
    }

    /// Resolves every role, substituting [`Color::NEUTRAL`] for missing ones.
    pub fn resolve(&self) -> Palette {
        let pick = |role: ColorRole| {
            self.lookup(role).unwrap_or_else(|| {
                warn!("theme has no '{}' color, using neutral", role.name());
                Color::NEUTRAL
            })
        };
        Palette {
            text: pick(ColorRole::Text),
            low: pick(ColorRole::Low),
            high: pick(ColorRole::High),
            background: pick(ColorRole::Background),
        }
    }
}

/// A theme with every role filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub low: Color,
    pub high: Color,
    pub background: Color,
}

// ============================================================================
// METER CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Builder)]
pub struct MeterConfig {
    pub max_value: f64,
    #[builder(default = 0.0)]
    pub initial_value: f64,
    #[builder(into, default = "Temperature".to_string())]
    pub label: String,
    #[builder(into, default = "°C".to_string())]
    pub unit: String,

    // Gesture mapping
    #[builder(default = 10.0)]
    pub sensitivity: f64,
    #[builder(default = 5.0)]
    pub base_offset: f64,
    #[builder(default = 0.96)]
    pub percentage_ceiling: f64,

    // Press depth
    #[builder(default = 8.0)]
    pub pressed_depth: f64,
    #[builder(default = SpringSpec::press())]
    pub press_spring: SpringSpec,

    // Scale
    #[builder(default = 120)]
    pub total_lines: usize,
    #[builder(default = 15.0)]
    pub range: f64,
    #[builder(default = 5.0)]
    pub fill_offset: f64,
    #[builder(default = 5)]
    pub major_every: usize,
    #[builder(default = 12.0)]
    pub tape_width: f64,
    #[builder(default = 8.0)]
    pub inner_tape_width: f64,
    #[builder(default = 10.0)]
    pub tape_padding: f64,
    #[builder(default = 1.5)]
    pub outer_stroke: f32,
    #[builder(default = 2.0)]
    pub inner_stroke: f32,
    #[builder(default = 0.3)]
    pub unfilled_opacity: f64,

    // Handle
    #[builder(default = 12.0)]
    pub handle_offset: f64,
    #[builder(default = 5.0)]
    pub handle_radius_rest: f64,
    #[builder(default = 11.0)]
    pub handle_radius_pressed: f64,
    #[builder(default = TimingSpec::linear(150))]
    pub handle_fade: TimingSpec,
    #[builder(default = HandlePlacement::Transform)]
    pub handle_placement: HandlePlacement,

    // Window
    #[builder(into, default = "Tape Meter".to_string())]
    pub title: String,
    #[builder(default = 240)]
    pub window_width: usize,
    #[builder(default = 480)]
    pub window_height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,
    #[builder(default = 70.0)]
    pub viewport_margin: f64,

    #[builder(default = Theme::light())]
    pub theme: Theme,
    pub font_data: Option<Vec<u8>>,
    #[builder(default = 40.0)]
    pub readout_font_size: f32,
    #[builder(default = 13.0)]
    pub readout_label_font_size: f32,
}

impl MeterConfig {
    /// Rejects configurations the derivations cannot work with.
    pub fn validate(&self) -> Result<(), MeterError> {
        if !(self.max_value.is_finite() && self.max_value > 0.0) {
            return Err(MeterError::InvalidMaxValue(self.max_value));
        }
        if self.total_lines == 0 {
            return Err(MeterError::InvalidConfig("total_lines must be positive".into()));
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(MeterError::InvalidConfig(format!(
                "range must be positive, got {}",
                self.range
            )));
        }
        if !(self.sensitivity.is_finite() && self.sensitivity != 0.0) {
            return Err(MeterError::InvalidConfig(format!(
                "sensitivity must be non-zero, got {}",
                self.sensitivity
            )));
        }
        if !(0.0..=1.0).contains(&self.percentage_ceiling) {
            return Err(MeterError::InvalidConfig(format!(
                "percentage_ceiling must lie in [0, 1], got {}",
                self.percentage_ceiling
            )));
        }
        if self.major_every == 0 {
            return Err(MeterError::InvalidConfig("major_every must be positive".into()));
        }
        Ok(())
    }

    /// Scale length for a given drawable height.
    pub fn viewport_height(&self, surface_height: f64) -> f64 {
        (surface_height - self.viewport_margin).max(0.0)
    }
}
