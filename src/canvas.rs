use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// GDI `COLORREF` layout: `0x00BBGGRR`.
    pub fn to_colorref(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16)
    }
}

/// Bounding box in client coordinates, right/bottom exclusive as GDI expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn from_size(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EllipseStyle {
    pub fill: Color,
    pub border_width: i32,
    pub border_color: Color,
}

/// Drawing surface handed to the renderer for the duration of one paint.
pub trait Canvas {
    /// Fill an ellipse inscribed in `bounds` and outline it. Implementations
    /// restore the surface's previous selection and release every object they
    /// created before returning.
    fn draw_ellipse(&mut self, bounds: Bounds, style: &EllipseStyle);
}

#[cfg(windows)]
pub use platform::GdiCanvas;

#[cfg(windows)]
mod platform {
    use super::{Bounds, Canvas, Color, EllipseStyle};
    use windows::Win32::Foundation::COLORREF;
    use windows::Win32::Graphics::Gdi::{
        CreatePen, CreateSolidBrush, DeleteObject, Ellipse, SelectObject, HDC, HGDIOBJ, PS_SOLID,
    };

    fn colorref(color: Color) -> COLORREF {
        COLORREF(color.to_colorref())
    }

    /// Created pen or brush; deleted on drop.
    struct OwnedObject(HGDIOBJ);

    impl OwnedObject {
        fn new(handle: HGDIOBJ) -> Option<Self> {
            (!handle.0.is_null()).then_some(Self(handle))
        }
    }

    impl Drop for OwnedObject {
        fn drop(&mut self) {
            unsafe {
                let _ = DeleteObject(self.0);
            }
        }
    }

    /// Object selected into a DC; the previous selection is put back on drop.
    struct Selection {
        hdc: HDC,
        previous: HGDIOBJ,
    }

    impl Selection {
        fn select(hdc: HDC, object: &OwnedObject) -> Self {
            let previous = unsafe { SelectObject(hdc, object.0) };
            Self { hdc, previous }
        }
    }

    impl Drop for Selection {
        fn drop(&mut self) {
            if !self.previous.0.is_null() {
                unsafe {
                    let _ = SelectObject(self.hdc, self.previous);
                }
            }
        }
    }

    /// GDI canvas over a device context borrowed from an open paint scope.
    pub struct GdiCanvas {
        hdc: HDC,
    }

    impl GdiCanvas {
        pub fn new(hdc: HDC) -> Self {
            Self { hdc }
        }
    }

    impl Canvas for GdiCanvas {
        fn draw_ellipse(&mut self, bounds: Bounds, style: &EllipseStyle) {
            let brush = OwnedObject::new(HGDIOBJ(unsafe { CreateSolidBrush(colorref(style.fill)) }.0));
            let pen = OwnedObject::new(HGDIOBJ(
                unsafe { CreatePen(PS_SOLID, style.border_width, colorref(style.border_color)) }.0,
            ));
            let (Some(brush), Some(pen)) = (brush, pen) else {
                tracing::warn!("GDI object creation failed; skipping ellipse");
                return;
            };

            // Declared after the objects so they are deselected before deletion.
            let _pen_selection = Selection::select(self.hdc, &pen);
            let _brush_selection = Selection::select(self.hdc, &brush);
            unsafe {
                let _ = Ellipse(self.hdc, bounds.left, bounds.top, bounds.right, bounds.bottom);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorref_packs_blue_green_red() {
        assert_eq!(Color::RED.to_colorref(), 0x0000_00FF);
        assert_eq!(Color::GREEN.to_colorref(), 0x0000_FF00);
        assert_eq!(Color::rgb(0x12, 0x34, 0x56).to_colorref(), 0x0056_3412);
    }

    #[test]
    fn bounds_cover_the_full_client_area() {
        let bounds = Bounds::from_size(200, 150);
        assert_eq!(
            bounds,
            Bounds {
                left: 0,
                top: 0,
                right: 200,
                bottom: 150
            }
        );
        assert!(!bounds.is_empty());
        assert!(Bounds::from_size(0, 10).is_empty());
    }

    #[test]
    fn color_serializes_as_channels() {
        let json = serde_json::to_value(Color::rgb(1, 2, 3)).expect("serialize");
        assert_eq!(json, serde_json::json!({ "r": 1, "g": 2, "b": 3 }));
    }
}
