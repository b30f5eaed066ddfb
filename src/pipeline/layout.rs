//! Page geometry: where content goes on a new page.
//!
//! All dimensions are PDF points (1/72 inch). The engine resolves the page
//! size from a preset or explicit size, applies the orientation rule, and
//! places the content inside the margins, shrinking it when asked to fit.

use crate::error::PdfOpsError;
use serde::{Deserialize, Serialize};

/// A rectangle in page space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Named page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSizePreset {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    /// Page size follows the content plus margins.
    Fit,
}

impl PageSizePreset {
    /// Portrait dimensions in points. `None` for [`PageSizePreset::Fit`].
    pub fn dimensions(self) -> Option<(f32, f32)> {
        match self {
            PageSizePreset::A4 => Some((595.28, 841.89)),
            PageSizePreset::A3 => Some((841.89, 1190.55)),
            PageSizePreset::A5 => Some((419.53, 595.28)),
            PageSizePreset::Letter => Some((612.0, 792.0)),
            PageSizePreset::Legal => Some((612.0, 1008.0)),
            PageSizePreset::Fit => None,
        }
    }
}

/// Base page size: a preset or explicit dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    Preset(PageSizePreset),
    Custom { width: f32, height: f32 },
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Preset(PageSizePreset::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
    /// Match the page's aspect to the content's aspect.
    Auto,
}

/// Target-page configuration for placing content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Margin on every side, in points.
    pub margin: f32,
    pub center: bool,
    /// Shrink (never enlarge) content to fit inside the margins.
    pub scale_to_fit: bool,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            orientation: Orientation::Auto,
            margin: 0.0,
            center: true,
            scale_to_fit: true,
        }
    }
}

impl LayoutSpec {
    /// Full-bleed placement on a page of exactly `width × height`.
    pub fn full_page(width: f32, height: f32) -> Self {
        Self {
            page_size: PageSize::Custom { width, height },
            orientation: Orientation::Auto,
            margin: 0.0,
            center: true,
            scale_to_fit: true,
        }
    }

    /// Reject sizes and margins that leave no room for content.
    ///
    /// Custom sizes must be finite and positive. The margin must be finite,
    /// non-negative and less than half of the shorter page side.
    pub fn validate(&self) -> Result<(), PdfOpsError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PdfOpsError::InvalidOptions(format!(
                "Margin must be a non-negative number of points, got {}",
                self.margin
            )));
        }
        let dimensions = match self.page_size {
            PageSize::Preset(preset) => preset.dimensions(),
            PageSize::Custom { width, height } => {
                let valid = |v: f32| v.is_finite() && v > 0.0;
                if !valid(width) || !valid(height) {
                    return Err(PdfOpsError::InvalidOptions(format!(
                        "Page size must be positive, got {} x {}",
                        width, height
                    )));
                }
                Some((width, height))
            }
        };
        if let Some((width, height)) = dimensions {
            let shorter = width.min(height);
            if 2.0 * self.margin >= shorter {
                return Err(PdfOpsError::InvalidOptions(format!(
                    "Margin {} leaves no room on a {} x {} page",
                    self.margin, width, height
                )));
            }
        }
        Ok(())
    }
}

/// Result of [`compute_geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub placement: Rect,
    /// Factor applied to the content (1.0 when not shrunk).
    pub scale: f32,
}

/// Compute the page size and content placement for content of
/// `content_width × content_height` points.
pub fn compute_geometry(content_width: f32, content_height: f32, spec: &LayoutSpec) -> PageGeometry {
    let margin = spec.margin.max(0.0);

    let base = match spec.page_size {
        PageSize::Preset(preset) => preset.dimensions(),
        PageSize::Custom { width, height } => Some((width, height)),
    };

    let Some((mut page_width, mut page_height)) = base else {
        // Fit: the page wraps the content; orientation and scaling do not apply.
        return PageGeometry {
            page_width: content_width + 2.0 * margin,
            page_height: content_height + 2.0 * margin,
            placement: Rect::new(margin, margin, content_width, content_height),
            scale: 1.0,
        };
    };

    let swap = match spec.orientation {
        Orientation::Portrait => page_width > page_height,
        Orientation::Landscape => page_height > page_width,
        Orientation::Auto => {
            let content_landscape = content_width > content_height;
            let page_landscape = page_width > page_height;
            content_landscape != page_landscape && page_width != page_height
        }
    };
    if swap {
        std::mem::swap(&mut page_width, &mut page_height);
    }

    let available_width = (page_width - 2.0 * margin).max(0.0);
    let available_height = (page_height - 2.0 * margin).max(0.0);

    let scale = if spec.scale_to_fit && content_width > 0.0 && content_height > 0.0 {
        let sx = available_width / content_width;
        let sy = available_height / content_height;
        sx.min(sy).min(1.0)
    } else {
        1.0
    };

    let width = content_width * scale;
    let height = content_height * scale;

    let (x, y) = if spec.center {
        ((page_width - width) / 2.0, (page_height - height) / 2.0)
    } else {
        (margin, margin)
    };

    PageGeometry {
        page_width,
        page_height,
        placement: Rect::new(x, y, width, height),
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn spec(page_size: PageSize, orientation: Orientation) -> LayoutSpec {
        LayoutSpec {
            page_size,
            orientation,
            margin: 0.0,
            center: true,
            scale_to_fit: true,
        }
    }

    #[test]
    fn fit_preset_wraps_content_plus_margin() {
        let s = LayoutSpec {
            page_size: PageSize::Preset(PageSizePreset::Fit),
            orientation: Orientation::Landscape,
            margin: 10.0,
            center: true,
            scale_to_fit: true,
        };
        let g = compute_geometry(300.0, 500.0, &s);
        assert_eq!((g.page_width, g.page_height), (320.0, 520.0));
        assert_eq!(g.placement, Rect::new(10.0, 10.0, 300.0, 500.0));
    }

    #[test]
    fn portrait_and_landscape_swap() {
        let letter_landscape = PageSize::Custom {
            width: 792.0,
            height: 612.0,
        };
        let g = compute_geometry(10.0, 10.0, &spec(letter_landscape, Orientation::Portrait));
        assert_eq!((g.page_width, g.page_height), (612.0, 792.0));

        let a4 = PageSize::Preset(PageSizePreset::A4);
        let g = compute_geometry(10.0, 10.0, &spec(a4, Orientation::Landscape));
        assert_eq!((g.page_width, g.page_height), (841.89, 595.28));
    }

    #[test]
    fn auto_matches_content_aspect() {
        let a4 = PageSize::Preset(PageSizePreset::A4);
        let wide = compute_geometry(800.0, 400.0, &spec(a4, Orientation::Auto));
        assert!(wide.page_width > wide.page_height);
        let tall = compute_geometry(400.0, 800.0, &spec(a4, Orientation::Auto));
        assert!(tall.page_height > tall.page_width);
    }

    #[test]
    fn never_upscales() {
        let a4 = PageSize::Preset(PageSizePreset::A4);
        let g = compute_geometry(100.0, 50.0, &spec(a4, Orientation::Portrait));
        assert_eq!(g.scale, 1.0);
        assert_eq!((g.placement.width, g.placement.height), (100.0, 50.0));
    }

    #[test]
    fn shrinks_to_the_tighter_axis() {
        let s = LayoutSpec {
            page_size: PageSize::Custom {
                width: 220.0,
                height: 420.0,
            },
            orientation: Orientation::Portrait,
            margin: 10.0,
            center: false,
            scale_to_fit: true,
        };
        let g = compute_geometry(400.0, 400.0, &s);
        assert!((g.scale - 0.5).abs() < EPS);
        assert_eq!(g.placement, Rect::new(10.0, 10.0, 200.0, 200.0));
        assert!(g.placement.x + g.placement.width <= g.page_width);
        assert!(g.placement.y + g.placement.height <= g.page_height);
    }

    #[test]
    fn centered_placement() {
        let s = LayoutSpec {
            page_size: PageSize::Custom {
                width: 200.0,
                height: 300.0,
            },
            orientation: Orientation::Portrait,
            margin: 0.0,
            center: true,
            scale_to_fit: true,
        };
        let g = compute_geometry(100.0, 100.0, &s);
        assert_eq!(g.placement, Rect::new(50.0, 100.0, 100.0, 100.0));
    }

    #[test]
    fn exact_fit_centering_agrees_with_margin_anchor() {
        let base = LayoutSpec {
            page_size: PageSize::Custom {
                width: 240.0,
                height: 340.0,
            },
            orientation: Orientation::Portrait,
            margin: 20.0,
            center: true,
            scale_to_fit: true,
        };
        let centered = compute_geometry(200.0, 300.0, &base);
        let anchored = compute_geometry(200.0, 300.0, &LayoutSpec { center: false, ..base });
        assert_eq!(centered.scale, 1.0);
        assert_eq!(centered.placement, anchored.placement);
        assert_eq!(centered.placement, Rect::new(20.0, 20.0, 200.0, 300.0));
    }

    #[test]
    fn scale_to_fit_disabled_keeps_content_size() {
        let s = LayoutSpec {
            page_size: PageSize::Custom {
                width: 100.0,
                height: 100.0,
            },
            orientation: Orientation::Portrait,
            margin: 5.0,
            center: false,
            scale_to_fit: false,
        };
        let g = compute_geometry(300.0, 50.0, &s);
        assert_eq!(g.placement, Rect::new(5.0, 5.0, 300.0, 50.0));
    }

    #[test]
    fn placement_stays_inside_page_when_fitting() {
        let a5 = PageSize::Preset(PageSizePreset::A5);
        for &(w, h) in &[(10.0, 10.0), (5000.0, 20.0), (20.0, 5000.0), (419.53, 595.28)] {
            for orientation in [Orientation::Portrait, Orientation::Landscape, Orientation::Auto] {
                let s = LayoutSpec {
                    page_size: a5,
                    orientation,
                    margin: 12.0,
                    center: true,
                    scale_to_fit: true,
                };
                let g = compute_geometry(w, h, &s);
                let p = g.placement;
                assert!(p.x >= -EPS && p.y >= -EPS, "{g:?}");
                assert!(p.x + p.width <= g.page_width + EPS, "{g:?}");
                assert!(p.y + p.height <= g.page_height + EPS, "{g:?}");
                assert!(p.width <= w + EPS && p.height <= h + EPS);
            }
        }
    }

    #[test]
    fn validate_rejects_unusable_layouts() {
        assert!(LayoutSpec::default().validate().is_ok());

        let huge_margin = LayoutSpec {
            page_size: PageSize::Preset(PageSizePreset::A5),
            margin: 500.0,
            center: false,
            ..LayoutSpec::default()
        };
        assert!(matches!(
            huge_margin.validate(),
            Err(PdfOpsError::InvalidOptions(_))
        ));

        let half_page = LayoutSpec {
            page_size: PageSize::Custom {
                width: 100.0,
                height: 300.0,
            },
            margin: 50.0,
            ..LayoutSpec::default()
        };
        assert!(half_page.validate().is_err());
        assert!(LayoutSpec { margin: 49.0, ..half_page }.validate().is_ok());

        for (width, height) in [(0.0, 100.0), (100.0, -1.0), (f32::NAN, 100.0)] {
            let s = LayoutSpec {
                page_size: PageSize::Custom { width, height },
                ..LayoutSpec::default()
            };
            assert!(s.validate().is_err(), "{width} x {height}");
        }

        let negative = LayoutSpec {
            margin: -1.0,
            ..LayoutSpec::default()
        };
        assert!(negative.validate().is_err());

        // Fit pages grow with the margin, so any finite margin is usable.
        let fit = LayoutSpec {
            page_size: PageSize::Preset(PageSizePreset::Fit),
            margin: 5000.0,
            ..LayoutSpec::default()
        };
        assert!(fit.validate().is_ok());
    }

    #[test]
    fn full_page_spec_covers_page() {
        let g = compute_geometry(612.0, 792.0, &LayoutSpec::full_page(612.0, 792.0));
        assert_eq!(g.placement, Rect::new(0.0, 0.0, 612.0, 792.0));
    }
}
