use folio_core::{Color, Rect, Size, Vec2};

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Rect { rect: Rect, color: Color },
    Circle { center: Vec2, radius: f32, color: Color },
}

/// Static dot grid shown whenever the live effect is not running.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotPattern {
    pub spacing: f32,
    pub radius: f32,
    pub dot: Color,
    pub background: Option<Color>,
}

impl Default for DotPattern {
    fn default() -> Self {
        Self {
            spacing: 24.0,
            radius: 1.0,
            dot: Color::from_hex("#3B82F6").with_alpha(40),
            background: None,
        }
    }
}

impl DotPattern {
    /// Dots sit at the centers of `spacing`-sized cells, clipped to `size`.
    pub fn paint(&self, size: Size) -> Vec<DrawCommand> {
        let mut out = Vec::new();
        if size.is_empty() || self.spacing <= 0.0 {
            return out;
        }
        if let Some(color) = self.background {
            out.push(DrawCommand::Rect {
                rect: Rect {
                    x: 0.0,
                    y: 0.0,
                    w: size.width,
                    h: size.height,
                },
                color,
            });
        }
        let half = self.spacing / 2.0;
        let cols = (size.width / self.spacing).ceil() as u32;
        let rows = (size.height / self.spacing).ceil() as u32;
        for row in 0..rows {
            let y = half + row as f32 * self.spacing;
            if y > size.height {
                break;
            }
            for col in 0..cols {
                let x = half + col as f32 * self.spacing;
                if x > size.width {
                    break;
                }
                out.push(DrawCommand::Circle {
                    center: Vec2 { x, y },
                    radius: self.radius,
                    color: self.dot,
                });
            }
        }
        out
    }
}
