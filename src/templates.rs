//! Preview markup for the three resume layouts.
//!
//! The markup sticks to the element and utility-class subset understood by
//! [`crate::style`]. All user text goes through [`escape_text`].

use std::fmt::Write as _;

use crate::color::HexColor;
use crate::dom::{escape_attr, escape_text};
use crate::model::{Education, Experience, FontChoice, Profile, Template};

/// `id` of the element the export pipeline captures.
pub const PREVIEW_ROOT_ID: &str = "resume-preview";

/// Width of the preview page in CSS pixels.
pub const PREVIEW_WIDTH_PX: f32 = 780.0;

/// Everything a layout needs to render.
#[derive(Debug, Clone, Copy)]
pub struct PreviewData<'a> {
    pub profile: &'a Profile,
    pub skills: &'a [String],
    pub experience: &'a [Experience],
    pub education: &'a [Education],
    pub template: Template,
    pub accent: &'a HexColor,
    pub font: FontChoice,
}

/// Render the preview HTML for the selected layout.
pub fn render_preview(data: &PreviewData<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div id="{PREVIEW_ROOT_ID}" class="bg-white p-8" style="color: #111827; width: {PREVIEW_WIDTH_PX}px; font-family: {}">"#,
        escape_attr(data.font.css_family())
    );
    html.push_str(&header(data));
    html.push_str(r#"<div class="grid grid-cols-3 gap-6"><div class="col-span-2">"#);
    html.push_str(&summary_section(data));
    html.push_str(&experience_section(data));
    html.push_str(&education_section(data));
    html.push_str(r#"</div><aside class="col-span-1">"#);
    html.push_str(&skills_section(data));
    html.push_str(&contacts_section(data));
    html.push_str("</aside></div>");
    html.push_str(r#"<div class="mt-6 text-xs text-gray-400 text-center">Made with resume-forge</div>"#);
    html.push_str("</div>");
    html
}

fn header(data: &PreviewData<'_>) -> String {
    let accent = data.accent.as_str();
    let (class, background, name_color, title_color) = match data.template {
        Template::Classic => (
            "p-4 mb-4 bg-white border-b-2 border-gray-100",
            "#ffffff".to_string(),
            "#0f172a",
            accent.to_string(),
        ),
        Template::Modern => (
            "p-4 mb-4",
            format!("linear-gradient(90deg, {accent}, #06b6d4)"),
            "#ffffff",
            "rgba(255, 255, 255, 0.9)".to_string(),
        ),
        Template::Clean => ("p-4 mb-4", "transparent".to_string(), "#0f172a", accent.to_string()),
    };

    let p = data.profile;
    format!(
        r#"<header class="{class}" style="background: {background}"><div class="flex items-start justify-between gap-6"><div><div class="text-3xl font-bold" style="color: {name_color}">{}</div><div class="text-sm font-medium mt-1" style="color: {title_color}">{}</div></div><div class="text-sm text-gray-600 text-right"><div>{}</div><div>{}</div><div>{}</div></div></div></header>"#,
        escape_text(&p.name),
        escape_text(&p.title),
        escape_text(&p.email),
        escape_text(&p.phone),
        escape_text(&p.location),
    )
}

fn section_heading(title: &str, accent: &HexColor) -> String {
    format!(
        r#"<h4 class="text-sm uppercase tracking-wide font-semibold mb-2" style="color: {accent}">{title}</h4>"#
    )
}

fn summary_section(data: &PreviewData<'_>) -> String {
    format!(
        r#"<section class="mb-4">{}<p class="text-sm leading-relaxed text-gray-700">{}</p></section>"#,
        section_heading("Summary", data.accent),
        escape_text(&data.profile.summary)
    )
}

fn experience_section(data: &PreviewData<'_>) -> String {
    let mut out = format!(
        r#"<section class="mb-4">{}<div class="flex flex-col gap-3">"#,
        section_heading("Experience", data.accent)
    );
    for exp in data.experience {
        let _ = write!(
            out,
            r#"<div><div class="font-medium">{} · <span class="text-sm text-gray-600">{}</span></div><div class="text-xs text-gray-500">{}</div><div class="text-sm text-gray-700 mt-1">{}</div></div>"#,
            escape_text(&exp.role),
            escape_text(&exp.company),
            escape_text(&exp.period),
            escape_text(&exp.details),
        );
    }
    out.push_str("</div></section>");
    out
}

fn education_section(data: &PreviewData<'_>) -> String {
    let mut out = format!(
        r#"<section>{}<div class="flex flex-col gap-2">"#,
        section_heading("Education", data.accent)
    );
    for ed in data.education {
        let _ = write!(
            out,
            r#"<div><div class="font-medium">{}</div><div class="text-xs text-gray-500">{} · {}</div></div>"#,
            escape_text(&ed.degree),
            escape_text(&ed.school),
            escape_text(&ed.period),
        );
    }
    out.push_str("</div></section>");
    out
}

fn skills_section(data: &PreviewData<'_>) -> String {
    let mut out = format!(
        r#"<section class="mb-4">{}<div class="flex flex-col gap-2">"#,
        section_heading("Skills", data.accent)
    );
    for skill in data.skills {
        let _ = write!(
            out,
            r#"<div class="text-sm bg-gray-100 px-2 py-1">{}</div>"#,
            escape_text(skill)
        );
    }
    out.push_str("</div></section>");
    out
}

fn contacts_section(data: &PreviewData<'_>) -> String {
    let p = data.profile;
    format!(
        r#"<section>{}<div class="text-sm text-gray-700"><div><strong>Email:</strong> {}</div><div><strong>Phone:</strong> {}</div><div><strong>City:</strong> {}</div></div></section>"#,
        section_heading("Contacts", data.accent),
        escape_text(&p.email),
        escape_text(&p.phone),
        escape_text(&p.location),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::style::{build_styled_tree, Background};

    fn sample(template: Template) -> String {
        let profile = Profile {
            name: "Ada <Lovelace>".into(),
            title: "Analyst".into(),
            ..Default::default()
        };
        let accent = HexColor::default_accent();
        render_preview(&PreviewData {
            profile: &profile,
            skills: &["Rust".to_string()],
            experience: &[],
            education: &[],
            template,
            accent: &accent,
            font: FontChoice::Georgia,
        })
    }

    #[test]
    fn user_text_is_escaped() {
        let html = sample(Template::Classic);
        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(!html.contains("<Lovelace>"));
    }

    #[test]
    fn preview_root_round_trips_through_parser() {
        let doc = Document::parse(&sample(Template::Clean));
        let root = doc.element_by_id(PREVIEW_ROOT_ID).unwrap();
        assert!(root.text_content().contains("Ada <Lovelace>"));
        assert_eq!(root.style_property("font-family").as_deref(), Some("Georgia, serif"));
    }

    #[test]
    fn modern_header_uses_accent_gradient() {
        let html = sample(Template::Modern);
        assert!(html.contains("linear-gradient(90deg, #0ea5a4, #06b6d4)"));

        let doc = Document::parse(&html);
        let styled = build_styled_tree(&doc.nodes, None);
        let crate::style::StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected root element");
        };
        assert!(matches!(children[0].style().background, Background::LinearGradient(_)));
    }

    #[test]
    fn classic_header_has_bottom_border() {
        let html = sample(Template::Classic);
        assert!(html.contains("border-b-2"));
        assert!(!html.contains("linear-gradient"));
    }
}
