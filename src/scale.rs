//! Tape tick derivation.
//!
//! Every tick is a pure function of its index, the current percentage, the
//! press depth and the viewport height. [`ScaleRenderer`] caches the last
//! frame and only re-derives the ticks whose inputs can have changed: the
//! union of the old and new boundary windows.

use std::f64::consts::PI;

use crate::config::{Color, MeterConfig, Palette};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSet {
    /// Reference graduations, always full strength.
    Outer,
    /// Fill indicator, dimmed above the boundary.
    Inner,
}

/// Fixed tape layout, taken from the meter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleGeometry {
    pub total_lines: usize,
    pub range: f64,
    pub fill_offset: f64,
    pub major_every: usize,
    pub tape_width: f64,
    pub inner_tape_width: f64,
    pub tape_padding: f64,
    pub outer_stroke: f32,
    pub inner_stroke: f32,
    pub unfilled_opacity: f64,
}

impl ScaleGeometry {
    pub fn from_config(config: &MeterConfig) -> Self {
        Self {
            total_lines: config.total_lines,
            range: config.range,
            fill_offset: config.fill_offset,
            major_every: config.major_every,
            tape_width: config.tape_width,
            inner_tape_width: config.inner_tape_width,
            tape_padding: config.tape_padding,
            outer_stroke: config.outer_stroke,
            inner_stroke: config.inner_stroke,
            unfilled_opacity: config.unfilled_opacity,
        }
    }

    pub fn gap(&self, height: f64) -> f64 {
        height / self.total_lines.max(1) as f64
    }
}

/// Inputs that drive a frame of ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleInputs {
    pub percentage: f64,
    pub depth: f64,
    pub height: f64,
}

/// Index range around the fill boundary, counted from the top of the tape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryWindow {
    pub current_tick: f64,
    pub start: f64,
    pub end: f64,
    /// Expanded bounds where curvature may be non-zero.
    pub lo: f64,
    pub hi: f64,
    /// Inner ticks with an index above this are filled.
    pub fill_threshold: f64,
}

impl BoundaryWindow {
    pub fn new(geometry: &ScaleGeometry, percentage: f64) -> Self {
        let total = geometry.total_lines as f64;
        let range = geometry.range;
        let current_tick = total - (total * percentage).floor();
        let start = current_tick - range;
        let end = start + range;
        let margin = range / 4.0;
        Self {
            current_tick,
            start,
            end,
            lo: start - margin,
            hi: end + margin,
            fill_threshold: end - range + geometry.fill_offset,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        let i = index as f64;
        i >= self.lo && i <= self.hi
    }

    /// Bell-shaped lateral displacement, zero outside `[lo, hi]`.
    pub fn curve_factor(&self, index: usize, depth: f64) -> f64 {
        if !self.contains(index) {
            return 0.0;
        }
        let margin = self.start - self.lo;
        let normalized = (index as f64 - self.lo) / (self.end - self.start - margin);
        (1.0 - (normalized * PI).cos()) * depth
    }

    pub fn is_filled(&self, index: usize, percentage: f64) -> bool {
        percentage > 0.0 && index as f64 > self.fill_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub index: usize,
    pub set: LineSet,
    pub y: f64,
    /// Lateral displacement from the resting position.
    pub offset: f64,
    pub length: f64,
    pub stroke: f32,
    pub opacity: f64,
    pub filled: bool,
    pub major: bool,
}

/// Derives one tick from scratch.
pub fn derive_tick(
    index: usize,
    set: LineSet,
    geometry: &ScaleGeometry,
    window: &BoundaryWindow,
    inputs: &ScaleInputs,
) -> Tick {
    let y = geometry.tape_padding + index as f64 * geometry.gap(inputs.height);
    let offset = window.curve_factor(index, inputs.depth);
    let major = index % geometry.major_every == 0;
    match set {
        LineSet::Outer => Tick {
            index,
            set,
            y,
            offset,
            length: if major {
                geometry.tape_width
            } else {
                geometry.tape_width / 2.5
            },
            stroke: geometry.outer_stroke,
            opacity: 1.0,
            filled: false,
            major,
        },
        LineSet::Inner => {
            let filled = window.is_filled(index, inputs.percentage);
            Tick {
                index,
                set,
                y,
                offset,
                length: geometry.inner_tape_width,
                stroke: geometry.inner_stroke,
                opacity: if filled { 1.0 } else { geometry.unfilled_opacity },
                filled,
                major,
            }
        }
    }
}

/// Shared fill color for the given percentage: high at 0, low at 1.
pub fn fill_color(palette: &Palette, percentage: f64) -> Color {
    palette.high.lerp(palette.low, percentage)
}

#[derive(Debug, Clone)]
pub struct ScaleFrame {
    pub inputs: ScaleInputs,
    pub window: BoundaryWindow,
    pub outer: Vec<Tick>,
    pub inner: Vec<Tick>,
    pub fill_color: Color,
    pub text_color: Color,
}

impl ScaleFrame {
    pub fn color_of(&self, tick: &Tick) -> Color {
        if tick.filled {
            self.fill_color
        } else {
            self.text_color
        }
    }

    pub fn ticks(&self) -> impl Iterator<Item = &Tick> {
        self.outer.iter().chain(self.inner.iter())
    }
}

#[derive(Debug, Clone)]
pub struct ScaleRenderer {
    geometry: ScaleGeometry,
    frame: Option<ScaleFrame>,
    last_recomputed: usize,
}

impl ScaleRenderer {
    pub fn new(geometry: ScaleGeometry) -> Self {
        Self {
            geometry,
            frame: None,
            last_recomputed: 0,
        }
    }

    pub fn geometry(&self) -> &ScaleGeometry {
        &self.geometry
    }

    pub fn frame(&self) -> Option<&ScaleFrame> {
        self.frame.as_ref()
    }

    /// Number of tick indices re-derived by the last [`update`](Self::update).
    pub fn last_recomputed(&self) -> usize {
        self.last_recomputed
    }

    /// Full derivation, ignoring the cache.
    pub fn derive(&self, inputs: ScaleInputs, palette: &Palette) -> ScaleFrame {
        let window = BoundaryWindow::new(&self.geometry, inputs.percentage);
        let build = |set: LineSet| -> Vec<Tick> {
            (0..self.geometry.total_lines)
                .map(|i| derive_tick(i, set, &self.geometry, &window, &inputs))
                .collect()
        };
        ScaleFrame {
            inputs,
            window,
            outer: build(LineSet::Outer),
            inner: build(LineSet::Inner),
            fill_color: fill_color(palette, inputs.percentage),
            text_color: palette.text,
        }
    }

    pub fn update(&mut self, inputs: ScaleInputs, palette: &Palette) -> &ScaleFrame {
        let total = self.geometry.total_lines;
        let frame = match self.frame.take() {
            Some(frame)
                if frame.inputs.height == inputs.height
                    && (frame.inputs.percentage > 0.0) == (inputs.percentage > 0.0) =>
            {
                let mut frame = frame;
                let window = BoundaryWindow::new(&self.geometry, inputs.percentage);
                self.last_recomputed = 0;
                if frame.inputs != inputs {
                    let old = frame.window;
                    let lo = old.lo.min(window.lo).min(old.fill_threshold).min(window.fill_threshold);
                    let hi = old.hi.max(window.hi).max(old.fill_threshold).max(window.fill_threshold);
                    let first = lo.floor().max(0.0) as usize;
                    let last = (hi.ceil().max(0.0) as usize).min(total.saturating_sub(1));
                    if lo <= (total as f64) && hi >= 0.0 {
                        for i in first..=last {
                            frame.outer[i] =
                                derive_tick(i, LineSet::Outer, &self.geometry, &window, &inputs);
                            frame.inner[i] =
                                derive_tick(i, LineSet::Inner, &self.geometry, &window, &inputs);
                        }
                        self.last_recomputed = last + 1 - first;
                    }
                }
                frame.inputs = inputs;
                frame.window = window;
                frame.fill_color = fill_color(palette, inputs.percentage);
                frame.text_color = palette.text;
                frame
            }
            _ => {
                self.last_recomputed = total;
                self.derive(inputs, palette)
            }
        };
        self.frame.insert(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn geometry() -> ScaleGeometry {
        ScaleGeometry::from_config(&MeterConfig::builder().max_value(200.0).build())
    }

    fn inputs(percentage: f64, depth: f64) -> ScaleInputs {
        ScaleInputs {
            percentage,
            depth,
            height: 600.0,
        }
    }

    #[test]
    fn window_tracks_percentage() {
        let window = BoundaryWindow::new(&geometry(), 0.6);
        assert_eq!(window.current_tick, 48.0);
        assert_eq!(window.start, 33.0);
        assert_eq!(window.end, 48.0);
        assert_eq!(window.lo, 29.25);
        assert_eq!(window.hi, 51.75);
    }

    #[test]
    fn curvature_peaks_mid_window() {
        let window = BoundaryWindow::new(&geometry(), 0.6);
        // normalized == 1 at lo + 0.75 * range
        let peak = (window.lo + 0.75 * 15.0).round() as usize;
        assert!(window.curve_factor(peak, 8.0) > 15.0);
        assert_eq!(window.curve_factor(29, 8.0), 0.0);
        assert_eq!(window.curve_factor(52, 8.0), 0.0);
        assert_eq!(window.curve_factor(peak, 0.0), 0.0);
    }

    #[test]
    fn curvature_zero_outside_window_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(42);
        let geometry = geometry();
        for _ in 0..200 {
            let percentage = rng.random_range(0.0..=0.96);
            let depth = rng.random_range(0.0..12.0);
            let window = BoundaryWindow::new(&geometry, percentage);
            for i in 0..geometry.total_lines {
                if !window.contains(i) {
                    assert_eq!(window.curve_factor(i, depth), 0.0);
                }
            }
        }
    }

    #[test]
    fn nothing_filled_at_zero() {
        let renderer = ScaleRenderer::new(geometry());
        let frame = renderer.derive(inputs(0.0, 8.0), &Theme::light().resolve());
        assert!(frame.inner.iter().all(|t| !t.filled));
        assert!(frame.inner.iter().all(|t| t.opacity == 0.3));
    }

    #[test]
    fn ticks_below_boundary_are_filled() {
        let renderer = ScaleRenderer::new(geometry());
        let frame = renderer.derive(inputs(0.6, 0.0), &Theme::light().resolve());
        // threshold = 33 + 5
        assert!(!frame.inner[38].filled);
        assert!(frame.inner[39].filled);
        assert!(frame.inner[119].filled);
        assert_eq!(frame.inner[39].opacity, 1.0);
        assert!(frame.outer.iter().all(|t| t.opacity == 1.0));
    }

    #[test]
    fn every_fifth_outer_tick_is_long() {
        let renderer = ScaleRenderer::new(geometry());
        let frame = renderer.derive(inputs(0.3, 0.0), &Theme::light().resolve());
        assert_eq!(frame.outer[0].length, 12.0);
        assert_eq!(frame.outer[5].length, 12.0);
        assert_approx_eq!(frame.outer[6].length, 4.8);
    }

    #[test]
    fn fill_color_sweeps_high_to_low() {
        let palette = Theme::light().resolve();
        assert_eq!(fill_color(&palette, 0.0), palette.high);
        assert_eq!(fill_color(&palette, 1.0), palette.low);
        let renderer = ScaleRenderer::new(geometry());
        let frame = renderer.derive(inputs(0.5, 0.0), &palette);
        let colors: Vec<Color> = frame
            .inner
            .iter()
            .filter(|t| t.filled)
            .map(|t| frame.color_of(t))
            .collect();
        assert!(colors.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(frame.color_of(&frame.inner[0]), palette.text);
    }

    #[test]
    fn derivation_is_pure() {
        let renderer = ScaleRenderer::new(geometry());
        let palette = Theme::dark().resolve();
        let a = renderer.derive(inputs(0.42, 5.5), &palette);
        let b = renderer.derive(inputs(0.42, 5.5), &palette);
        assert_eq!(a.outer, b.outer);
        assert_eq!(a.inner, b.inner);
    }

    #[test]
    fn incremental_update_matches_full_derivation() {
        let mut rng = StdRng::seed_from_u64(7);
        let palette = Theme::light().resolve();
        let mut renderer = ScaleRenderer::new(geometry());
        let mut percentage: f64 = 0.5;
        for _ in 0..300 {
            percentage = (percentage + rng.random_range(-0.05..0.05)).clamp(0.0, 0.96);
            let depth = rng.random_range(0.0..8.0);
            let step = inputs(percentage, depth);
            let full = renderer.derive(step, &palette);
            let cached = renderer.update(step, &palette);
            assert_eq!(cached.outer, full.outer);
            assert_eq!(cached.inner, full.inner);
            assert_eq!(cached.fill_color, full.fill_color);
        }
    }

    #[test]
    fn small_moves_touch_only_the_window() {
        let palette = Theme::light().resolve();
        let mut renderer = ScaleRenderer::new(geometry());
        renderer.update(inputs(0.5, 8.0), &palette);
        assert_eq!(renderer.last_recomputed(), 120);
        renderer.update(inputs(0.5, 7.0), &palette);
        assert!(renderer.last_recomputed() < 30);
        renderer.update(inputs(0.5, 7.0), &palette);
        assert_eq!(renderer.last_recomputed(), 0);
    }
}
