use crate::canvas::{Bounds, Canvas, Color, EllipseStyle};

/// The two fill colors the overlay alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub active: Color,
    pub inactive: Color,
}

impl Palette {
    pub fn color_for(&self, active: bool) -> Color {
        if active {
            self.active
        } else {
            self.inactive
        }
    }
}

/// Turns the current mode into a bordered ellipse. Holds configuration only;
/// the mode is read through the accessor handed to [`ShapeRenderer::render`].
#[derive(Debug, Clone)]
pub struct ShapeRenderer {
    palette: Palette,
    border_width: i32,
    border_color: Color,
}

impl ShapeRenderer {
    pub fn new(palette: Palette, border_width: i32, border_color: Color) -> Self {
        Self {
            palette,
            border_width,
            border_color,
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn style_for(&self, active: bool) -> EllipseStyle {
        EllipseStyle {
            fill: self.palette.color_for(active),
            border_width: self.border_width,
            border_color: self.border_color,
        }
    }

    pub fn render(
        &self,
        canvas: &mut dyn Canvas,
        width: i32,
        height: i32,
        is_active: impl Fn() -> bool,
    ) {
        let bounds = Bounds::from_size(width, height);
        if bounds.is_empty() {
            return;
        }
        canvas.draw_ellipse(bounds, &self.style_for(is_active()));
    }
}
