// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

use rusttype::{point, Font, PositionedGlyph, Scale};

use crate::config::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Line {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        thickness: f32,
        color: Color,
        alpha: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        alpha: f32,
    },
    Triangle {
        points: [(f32, f32); 3],
        color: Color,
        alpha: f32,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        font_size: f32,
        align: TextAlign,
        color: Color,
        alpha: f32,
    },
}

#[derive(Debug, Default)]
pub struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn render(&self, canvas: &mut Canvas, font: Option<&Font<'static>>) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    thickness,
                    color,
                    alpha,
                } => draw_line_aa(canvas, *x0, *y0, *x1, *y1, *thickness, *color, *alpha),
                DrawCommand::Circle {
                    cx,
                    cy,
                    radius,
                    color,
                    alpha,
                } => draw_circle(canvas, *cx, *cy, *radius, *color, *alpha),
                DrawCommand::Triangle {
                    points,
                    color,
                    alpha,
                } => fill_triangle(canvas, *points, *color, *alpha),
                DrawCommand::Text {
                    x,
                    y,
                    text,
                    font_size,
                    align,
                    color,
                    alpha,
                } => {
                    // Text is skipped entirely without a font.
                    if let Some(font) = font {
                        draw_text(
                            canvas,
                            *x,
                            *y,
                            text,
                            font,
                            Scale::uniform(*font_size),
                            *align,
                            *color,
                            *alpha,
                        );
                    }
                }
            }
        }
    }
}

// ============================================================================
// CANVAS
// ============================================================================

/// RGBA8 framebuffer view.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        self.frame
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Source-over blend of `color` at `alpha` coverage.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let Some(dst) = self.frame.get_mut(idx..idx + 4) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = 0xff;
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

pub fn draw_line_aa(
    canvas: &mut Canvas,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    thickness: f32,
    color: Color,
    alpha: f32,
) {
    let pad = thickness.ceil() + 1.0;
    let min_x = (x0.min(x1) - pad).floor() as i32;
    let max_x = (x0.max(x1) + pad).ceil() as i32;
    let min_y = (y0.min(y1) - pad).floor() as i32;
    let max_y = (y0.max(y1) + pad).ceil() as i32;
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len_sq = dx * dx + dy * dy;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 - x0;
            let py = y as f32 - y0;
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let lx = x0 + t * dx;
            let ly = y0 + t * dy;
            let dist = ((lx - x as f32).powi(2) + (ly - y as f32).powi(2)).sqrt();
            let aa = (1.0 - (dist - thickness / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
            if aa > 0.01 {
                canvas.blend_pixel(x, y, color, aa * alpha);
            }
        }
    }
}

pub fn draw_circle(canvas: &mut Canvas, cx: f32, cy: f32, radius: f32, color: Color, alpha: f32) {
    if radius <= 0.0 || alpha <= 0.0 {
        return;
    }
    let reach = radius.ceil() as i32 + 1;
    let (center_x, center_y) = (cx.round() as i32, cy.round() as i32);
    for y in -reach..=reach {
        for x in -reach..=reach {
            let px = center_x + x;
            let py = center_y + y;
            let dist = ((px as f32 - cx).powi(2) + (py as f32 - cy).powi(2)).sqrt();
            let aa = (radius + 0.5 - dist).clamp(0.0, 1.0);
            if aa > 0.0 {
                canvas.blend_pixel(px, py, color, aa * alpha);
            }
        }
    }
}

pub fn fill_triangle(canvas: &mut Canvas, points: [(f32, f32); 3], color: Color, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let [(ax, ay), (bx, by), (cx, cy)] = points;
    let area = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
    if area == 0.0 {
        return;
    }
    let edge = |x0: f32, y0: f32, x1: f32, y1: f32, px: f32, py: f32| {
        ((x1 - x0) * (py - y0) - (y1 - y0) * (px - x0)) / area
    };
    let min_x = ax.min(bx).min(cx).floor() as i32;
    let max_x = ax.max(bx).max(cx).ceil() as i32;
    let min_y = ay.min(by).min(cy).floor() as i32;
    let max_y = ay.max(by).max(cy).ceil() as i32;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (px, py) = (x as f32, y as f32);
            let w0 = edge(bx, by, cx, cy, px, py);
            let w1 = edge(cx, cy, ax, ay, px, py);
            let w2 = edge(ax, ay, bx, by, px, py);
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                canvas.blend_pixel(x, y, color, alpha);
            }
        }
    }
}

/// Draws `text` vertically centered on `y`, horizontally placed by `align`.
pub fn draw_text(
    canvas: &mut Canvas,
    x: i32,
    y: i32,
    text: &str,
    font: &Font,
    scale: Scale,
    align: TextAlign,
    color: Color,
    alpha: f32,
) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();
    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    let width_px = if min_x < max_x { max_x - min_x } else { 0 };
    let height_px = if min_y < max_y { max_y - min_y } else { 0 };
    let offset_x = match align {
        TextAlign::Center => x - width_px / 2,
        TextAlign::Right => x - width_px,
    };
    let offset_y = y - height_px / 2;
    for glyph in glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                let px = offset_x + gx as i32 + bb.min.x - min_x;
                let py = offset_y + gy as i32 + bb.min.y - min_y;
                canvas.blend_pixel(px, py, color, v * alpha);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    const BLACK: Color = Color::new(0, 0, 0);

    fn buffer(width: usize, height: usize) -> Vec<u8> {
        vec![0; width * height * 4]
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut frame = buffer(4, 3);
        let mut canvas = Canvas::new(&mut frame, 4, 3);
        canvas.clear(Color::new(1, 2, 3));
        assert_eq!(canvas.pixel(3, 2), Some([1, 2, 3, 0xff]));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn blend_respects_alpha_and_bounds() {
        let mut frame = buffer(2, 2);
        let mut canvas = Canvas::new(&mut frame, 2, 2);
        canvas.clear(WHITE);
        canvas.blend_pixel(0, 0, BLACK, 0.5);
        canvas.blend_pixel(-1, 0, BLACK, 1.0);
        canvas.blend_pixel(5, 5, BLACK, 1.0);
        assert_eq!(canvas.pixel(0, 0), Some([128, 128, 128, 0xff]));
        assert_eq!(canvas.pixel(1, 1), Some([0xff, 0xff, 0xff, 0xff]));
    }

    #[test]
    fn horizontal_line_covers_its_span() {
        let mut frame = buffer(20, 10);
        let mut canvas = Canvas::new(&mut frame, 20, 10);
        canvas.clear(WHITE);
        draw_line_aa(&mut canvas, 2.0, 5.0, 17.0, 5.0, 2.0, BLACK, 1.0);
        assert_eq!(canvas.pixel(10, 5), Some([0, 0, 0, 0xff]));
        assert_eq!(canvas.pixel(10, 0), Some([0xff, 0xff, 0xff, 0xff]));
    }

    #[test]
    fn transparent_circle_draws_nothing() {
        let mut frame = buffer(10, 10);
        let mut canvas = Canvas::new(&mut frame, 10, 10);
        canvas.clear(WHITE);
        draw_circle(&mut canvas, 5.0, 5.0, 3.0, BLACK, 0.0);
        assert_eq!(canvas.pixel(5, 5), Some([0xff, 0xff, 0xff, 0xff]));
        draw_circle(&mut canvas, 5.0, 5.0, 3.0, BLACK, 1.0);
        assert_eq!(canvas.pixel(5, 5), Some([0, 0, 0, 0xff]));
    }

    #[test]
    fn triangle_fills_interior_either_winding() {
        for points in [
            [(1.0, 1.0), (9.0, 1.0), (5.0, 9.0)],
            [(1.0, 1.0), (5.0, 9.0), (9.0, 1.0)],
        ] {
            let mut frame = buffer(10, 10);
            let mut canvas = Canvas::new(&mut frame, 10, 10);
            canvas.clear(WHITE);
            fill_triangle(&mut canvas, points, BLACK, 1.0);
            assert_eq!(canvas.pixel(5, 3), Some([0, 0, 0, 0xff]));
            assert_eq!(canvas.pixel(0, 9), Some([0xff, 0xff, 0xff, 0xff]));
        }
    }

    #[test]
    fn scene_text_without_font_is_skipped() {
        let mut scene = Scene::new();
        scene.add_command(DrawCommand::Clear(WHITE));
        scene.add_command(DrawCommand::Text {
            x: 5,
            y: 5,
            text: "42".to_string(),
            font_size: 12.0,
            align: TextAlign::Center,
            color: BLACK,
            alpha: 1.0,
        });
        let mut frame = buffer(10, 10);
        let mut canvas = Canvas::new(&mut frame, 10, 10);
        scene.render(&mut canvas, None);
        assert_eq!(canvas.pixel(5, 5), Some([0xff, 0xff, 0xff, 0xff]));
        assert_eq!(scene.commands().len(), 2);
    }
}
