//! PDF renderer – takes a [`PaginatedDocument`] plus the captured raster and
//! produces PDF bytes using `printpdf` (v0.8 ops-based API).

use image::imageops;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, XObjectId, XObjectTransform,
};

use crate::capture::{encode_png, CapturedImage};
use crate::error::{Error, Result};
use crate::page_layout::{PagePlacement, PaginatedDocument, Slicing};

/// Points per millimetre.
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

fn register_png(doc: &mut PdfDocument, png: &[u8], px_width: u32, px_height: u32) -> Result<ImageResource> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = RawImage::decode_from_bytes(png, &mut warnings).map_err(|e| Error::Pdf(format!("image decode: {e}")))?;
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warning(s) decoding the capture", warnings.len());
    }
    Ok(ImageResource {
        xobj_id: doc.add_image(&raw),
        px_width,
        px_height,
    })
}

/// Draw `res` with its top-left corner `top_mm` below the page top, scaled
/// to `width_mm` x `height_mm`.
fn place_image(res: &ImageResource, page_height_mm: f32, top_mm: f32, width_mm: f32, height_mm: f32) -> Op {
    // PDF origin is bottom-left; translate_y is the image's bottom edge.
    let bottom_mm = page_height_mm - (top_mm + height_mm);

    // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
    let scale_x = width_mm * MM_TO_PT / res.px_width.max(1) as f32;
    let scale_y = height_mm * MM_TO_PT / res.px_height.max(1) as f32;

    Op::UseXobject {
        id: res.xobj_id.clone(),
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(bottom_mm * MM_TO_PT)),
            dpi: Some(72.0),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotate: None,
        },
    }
}

/// Render the plan into PDF bytes. Slide mode embeds the PNG encoding of the
/// whole capture once; crop mode encodes one slice per page.
pub fn render_pdf(plan: &PaginatedDocument, capture: &CapturedImage) -> Result<Vec<u8>> {
    let page_w = Mm(plan.page_width_mm);
    let page_h = Mm(plan.page_height_mm);

    let mut doc = PdfDocument::new(&plan.title);
    let mut pages = Vec::with_capacity(plan.pages.len());

    match plan.slicing {
        Slicing::Slide => {
            let png = capture.encode_png()?;
            let res = register_png(&mut doc, &png, plan.image_width_px, plan.image_height_px)?;
            for placement in &plan.pages {
                let op = place_image(
                    &res,
                    plan.page_height_mm,
                    placement.y_offset_mm,
                    plan.image_width_mm,
                    plan.image_height_mm,
                );
                pages.push(PdfPage::new(page_w, page_h, vec![op]));
            }
        }
        Slicing::Crop => {
            for placement in &plan.pages {
                let ops = match crop_slice(&mut doc, plan, capture, placement)? {
                    Some(op) => vec![op],
                    None => Vec::new(),
                };
                pages.push(PdfPage::new(page_w, page_h, ops));
            }
        }
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    Ok(bytes)
}

fn crop_slice(
    doc: &mut PdfDocument,
    plan: &PaginatedDocument,
    capture: &CapturedImage,
    placement: &PagePlacement,
) -> Result<Option<Op>> {
    if placement.src_height_px == 0 {
        return Ok(None);
    }
    let slice = imageops::crop_imm(
        &capture.image,
        0,
        placement.src_y_px,
        capture.width(),
        placement.src_height_px,
    )
    .to_image();
    let png = encode_png(&slice)?;
    let res = register_png(doc, &png, slice.width(), slice.height())?;
    let height_mm = placement.src_height_px as f32 * plan.mm_per_px();
    Ok(Some(place_image(
        &res,
        plan.page_height_mm,
        0.0,
        plan.image_width_mm,
        height_mm,
    )))
}
