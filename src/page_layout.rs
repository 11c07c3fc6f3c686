//! Page plan – the intermediate representation between the captured raster
//! and PDF composition. It records exactly which part of the image lands on
//! which page, so a plan can be inspected (or dumped as JSON) without
//! rendering anything.

use serde::{Deserialize, Serialize};

/// How the captured image is distributed over pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Slicing {
    /// Embed the whole image once and redraw it on every page, shifted up by
    /// one page height per page. The page MediaBox clips the rest.
    #[default]
    Slide,
    /// Embed one cropped sub-image per page.
    Crop,
}

/// A complete page plan ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedDocument {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "PaginatedDocument::default_title")]
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Captured image size in device pixels.
    pub image_width_px: u32,
    pub image_height_px: u32,
    /// Image size once scaled to the page width.
    pub image_width_mm: f32,
    pub image_height_mm: f32,
    pub slicing: Slicing,
    /// Ordered list of pages; never empty.
    pub pages: Vec<PagePlacement>,
}

/// Where the image sits on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    pub page_index: usize,
    /// Vertical position of the image's top edge relative to the page top,
    /// in mm. Zero or negative: `-(page_index * page_height_mm)`.
    pub y_offset_mm: f32,
    /// First pixel row shown on this page.
    pub src_y_px: u32,
    /// Number of pixel rows shown on this page.
    pub src_height_px: u32,
    /// Height of the visible part on this page, in mm.
    pub height_mm: f32,
}

impl PaginatedDocument {
    pub fn default_title() -> String {
        "Resume".to_string()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Millimetres per image pixel.
    pub fn mm_per_px(&self) -> f32 {
        if self.image_width_px == 0 {
            0.0
        } else {
            self.image_width_mm / self.image_width_px as f32
        }
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_slicing_lowercase() {
        let plan = PaginatedDocument {
            title: "Resume".into(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            image_width_px: 100,
            image_height_px: 100,
            image_width_mm: 210.0,
            image_height_mm: 210.0,
            slicing: Slicing::Crop,
            pages: vec![PagePlacement {
                page_index: 0,
                y_offset_mm: 0.0,
                src_y_px: 0,
                src_height_px: 100,
                height_mm: 210.0,
            }],
        };
        let json = plan.to_json().unwrap();
        assert!(json.contains(r#""slicing": "crop""#));
        assert_eq!(PaginatedDocument::from_json(&json).unwrap(), plan);
        assert!((plan.mm_per_px() - 2.1).abs() < 1e-6);
    }

    #[test]
    fn missing_title_uses_default() {
        let json = r#"{"page_width_mm":210,"page_height_mm":297,"image_width_px":1,"image_height_px":1,
            "image_width_mm":210,"image_height_mm":210,"slicing":"slide","pages":[]}"#;
        assert_eq!(PaginatedDocument::from_json(json).unwrap().title, "Resume");
    }
}
