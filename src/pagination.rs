//! Pagination – distributes a captured raster over fixed-size pages.
//!
//! The image is scaled to the page width. Page `i` shows the image shifted up
//! by `i` page heights, so consecutive pages show consecutive bands of the
//! image with no gap and no overlap.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::page_layout::{PagePlacement, PaginatedDocument, Slicing};

/// Float noise below this many mm does not start a new page. Never more
/// than half a pixel, so no pixel row is left without a page.
pub const PAGE_TOLERANCE_MM: f64 = 1e-3;

/// Upper bound on the pages of one document.
pub const MAX_PAGES: usize = 10_000;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Page size in millimetres, as given (before orientation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

impl PageGeometry {
    pub const A4: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    /// The geometry with width and height arranged for `orientation`.
    pub fn oriented(self, orientation: Orientation) -> Self {
        let (short, long) = if self.width_mm <= self.height_mm {
            (self.width_mm, self.height_mm)
        } else {
            (self.height_mm, self.width_mm)
        };
        match orientation {
            Orientation::Portrait => Self {
                width_mm: short,
                height_mm: long,
            },
            Orientation::Landscape => Self {
                width_mm: long,
                height_mm: short,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.width_mm) && ok(self.height_mm) {
            Ok(())
        } else {
            Err(Error::InvalidPage {
                width_mm: self.width_mm,
                height_mm: self.height_mm,
            })
        }
    }
}

/// Number of pages needed for an image `image_height_mm` tall whose pixels
/// are `mm_per_px` high.
pub fn page_count(image_height_mm: f64, page_height_mm: f64, mm_per_px: f64) -> Result<usize> {
    let tolerance = PAGE_TOLERANCE_MM.min(0.5 * mm_per_px);
    let pages = ((image_height_mm - tolerance) / page_height_mm).ceil().max(1.0);
    if pages > MAX_PAGES as f64 {
        return Err(Error::TooManyPages {
            pages: pages as u64,
            max: MAX_PAGES,
        });
    }
    Ok(pages as usize)
}

/// Plan the pages for a `width_px` x `height_px` capture.
pub fn plan_pages(
    width_px: u32,
    height_px: u32,
    geometry: PageGeometry,
    slicing: Slicing,
    title: &str,
) -> Result<PaginatedDocument> {
    if width_px == 0 || height_px == 0 {
        return Err(Error::EmptyCapture {
            width: width_px,
            height: height_px,
        });
    }
    geometry.validate()?;

    let page_w = geometry.width_mm as f64;
    let page_h = geometry.height_mm as f64;
    let image_h_mm = height_px as f64 * page_w / width_px as f64;
    let px_per_mm = width_px as f64 / page_w;
    let count = page_count(image_h_mm, page_h, page_w / width_px as f64)?;

    let mut pages = Vec::with_capacity(count);
    let mut src_y = 0u32;
    for i in 0..count {
        let top_mm = i as f64 * page_h;
        let end = if i + 1 == count {
            height_px
        } else {
            (((top_mm + page_h) * px_per_mm).round() as u32).clamp(src_y, height_px)
        };
        pages.push(PagePlacement {
            page_index: i,
            y_offset_mm: -(top_mm as f32),
            src_y_px: src_y,
            src_height_px: end - src_y,
            height_mm: (image_h_mm - top_mm).clamp(0.0, page_h) as f32,
        });
        src_y = end;
    }

    log::debug!(
        "Planned {count} page(s) for a {width_px}x{height_px} px capture ({image_h_mm:.2} mm tall)"
    );

    Ok(PaginatedDocument {
        title: title.to_string(),
        page_width_mm: geometry.width_mm,
        page_height_mm: geometry.height_mm,
        image_width_px: width_px,
        image_height_px: height_px,
        image_width_mm: geometry.width_mm,
        image_height_mm: image_h_mm as f32,
        slicing,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(w: u32, h: u32) -> PaginatedDocument {
        plan_pages(w, h, PageGeometry::A4, Slicing::Slide, "t").unwrap()
    }

    #[test]
    fn short_capture_is_one_page() {
        let doc = plan(1560, 1000);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[0].y_offset_mm, 0.0);
        assert_eq!(doc.pages[0].src_height_px, 1000);
    }

    #[test]
    fn exact_page_multiple_has_no_trailing_page() {
        // 210 px wide, 594 px tall -> exactly 594 mm = 2 pages.
        let doc = plan(210, 594);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].y_offset_mm, -297.0);
        assert_eq!(doc.pages[1].src_y_px, 297);
        assert_eq!(doc.pages[1].src_height_px, 297);
    }

    #[test]
    fn one_pixel_over_adds_a_page() {
        let doc = plan(210, 595);
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.pages[2].y_offset_mm, -594.0);
        assert_eq!(doc.pages[2].src_height_px, 1);
        assert!((doc.pages[2].height_mm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn slices_are_contiguous_and_cover_the_image() {
        for (w, h) in [(1560, 5000), (1587, 7777), (333, 10_001), (1, 3)] {
            let doc = plan(w, h);
            let mut next = 0;
            for p in &doc.pages {
                assert_eq!(p.src_y_px, next);
                next += p.src_height_px;
            }
            assert_eq!(next, h);
        }
    }

    #[test]
    fn rejects_empty_capture_and_bad_geometry() {
        assert!(matches!(
            plan_pages(0, 10, PageGeometry::A4, Slicing::Slide, "t"),
            Err(Error::EmptyCapture { width: 0, height: 10 })
        ));
        let bad = PageGeometry {
            width_mm: 210.0,
            height_mm: 0.0,
        };
        assert!(matches!(
            plan_pages(10, 10, bad, Slicing::Slide, "t"),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn sub_tolerance_pixels_still_get_a_page() {
        // One pixel is 0.001 mm; the last one spills onto a second page.
        let doc = plan(210_000, 297_001);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].src_y_px, 297_000);
        assert_eq!(doc.pages[1].src_height_px, 1);
        assert_eq!(plan(210_000, 297_000).page_count(), 1);
    }

    #[test]
    fn extreme_aspect_ratio_is_rejected() {
        assert!(matches!(
            plan_pages(1, u32::MAX, PageGeometry::A4, Slicing::Slide, "t"),
            Err(Error::TooManyPages { max: MAX_PAGES, .. })
        ));
        // 10 000 pages exactly is still fine.
        assert_eq!(page_count(2_970_000.0, 297.0, 1.0).unwrap(), MAX_PAGES);
    }

    #[test]
    fn orientation_swaps_sides() {
        let landscape = PageGeometry::A4.oriented(Orientation::Landscape);
        assert_eq!((landscape.width_mm, landscape.height_mm), (297.0, 210.0));
        assert_eq!(landscape.oriented(Orientation::Portrait), PageGeometry::A4);
    }
}
