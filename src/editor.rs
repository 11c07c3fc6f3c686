//! Editing session: mutable resume state plus the derived accent color.

use log::debug;

use crate::capture::Capturer;
use crate::color::{resolve_color, ColorProbe, CssColorProbe, HexColor};
use crate::dom::Document;
use crate::error::Result;
use crate::model::{
    Design, Education, EducationField, EntryId, Experience, ExperienceField, FontChoice, Profile, ProfileField,
    ResumeInput, Template,
};
use crate::pipeline::{ExportedPdf, Exporter};
use crate::templates::{render_preview, PreviewData};

/// One editing session. Single-threaded; every edit takes effect immediately
/// and the last write wins.
#[derive(Debug, Clone)]
pub struct ResumeEditor {
    profile: Profile,
    skills: Vec<String>,
    experience: Vec<Experience>,
    education: Vec<Education>,
    design: Design,
    /// Derived from `design.primary_color`; never edited directly.
    accent: HexColor,
    next_id: u64,
}

impl Default for ResumeEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResumeEditor {
    /// A session pre-filled with sample content.
    pub fn new() -> Self {
        let mut editor = Self::empty();
        editor.profile = Profile {
            name: "Ivan Ivanov".into(),
            title: "Frontend Developer".into(),
            email: "ivan@example.com".into(),
            phone: "+7 912 345-67-89".into(),
            location: "Moscow, Russia".into(),
            summary: "Experienced developer building fast, accessible and good-looking interfaces. \
                      Fond of clean code and good design."
                .into(),
        };
        editor.skills = ["React", "TypeScript", "HTML", "CSS"].map(String::from).to_vec();

        let id = editor.add_experience();
        editor.update_experience(id, ExperienceField::Role, "Frontend Developer");
        editor.update_experience(id, ExperienceField::Company, "Acme");
        editor.update_experience(id, ExperienceField::Period, "2021 - present");
        editor.update_experience(
            id,
            ExperienceField::Details,
            "SPA development, performance tuning, component architecture.",
        );

        let id = editor.add_education();
        editor.update_education(id, EducationField::Degree, "BSc in Computer Science");
        editor.update_education(id, EducationField::School, "State University");
        editor.update_education(id, EducationField::Period, "2016 - 2020");
        editor
    }

    /// A session with no content and default design.
    pub fn empty() -> Self {
        Self {
            profile: Profile::default(),
            skills: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            design: Design::default(),
            accent: HexColor::default_accent(),
            next_id: 1,
        }
    }

    /// Build a session from a parsed resume file. Entry ids come from the
    /// session counter; the primary color is resolved with a CSS probe.
    pub fn from_input(input: ResumeInput) -> Self {
        let mut editor = Self::empty();
        editor.profile = input.profile;
        for skill in &input.skills {
            editor.add_skill(skill);
        }
        for mut exp in input.experience {
            exp.id = editor.next_entry_id();
            editor.experience.push(exp);
        }
        for mut ed in input.education {
            ed.id = editor.next_entry_id();
            editor.education.push(ed);
        }
        editor.design.template = input.design.template;
        editor.design.font = input.design.font;
        editor.set_primary_color(&input.design.primary_color, Some(&mut CssColorProbe));
        editor
    }

    /// Parse a resume JSON document into a session.
    pub fn from_json(json: &str) -> Result<Self> {
        let input: ResumeInput = serde_json::from_str(json)?;
        Ok(Self::from_input(input))
    }

    fn next_entry_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    // -- accessors ----------------------------------------------------------

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn experience(&self) -> &[Experience] {
        &self.experience
    }

    pub fn education(&self) -> &[Education] {
        &self.education
    }

    pub fn design(&self) -> &Design {
        &self.design
    }

    /// The resolved, always-valid accent color.
    pub fn accent(&self) -> &HexColor {
        &self.accent
    }

    // -- profile & skills ---------------------------------------------------

    pub fn update_profile(&mut self, field: ProfileField, value: impl Into<String>) {
        self.profile.set(field, value);
    }

    /// Append a trimmed skill. Blank input is ignored and returns `None`.
    pub fn add_skill(&mut self, value: &str) -> Option<usize> {
        let skill = value.trim();
        if skill.is_empty() {
            return None;
        }
        self.skills.push(skill.to_string());
        Some(self.skills.len() - 1)
    }

    /// Remove the skill at `index`, preserving the order of the rest.
    pub fn remove_skill(&mut self, index: usize) -> Option<String> {
        (index < self.skills.len()).then(|| self.skills.remove(index))
    }

    // -- experience ---------------------------------------------------------

    pub fn add_experience(&mut self) -> EntryId {
        let id = self.next_entry_id();
        self.experience.push(Experience {
            id,
            role: "New position".into(),
            ..Default::default()
        });
        id
    }

    /// Returns `false` when no entry has `id`.
    pub fn update_experience(&mut self, id: EntryId, field: ExperienceField, value: impl Into<String>) -> bool {
        match self.experience.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.set(field, value);
                true
            }
            None => false,
        }
    }

    pub fn remove_experience(&mut self, id: EntryId) -> bool {
        let before = self.experience.len();
        self.experience.retain(|e| e.id != id);
        self.experience.len() != before
    }

    // -- education ----------------------------------------------------------

    pub fn add_education(&mut self) -> EntryId {
        let id = self.next_entry_id();
        self.education.push(Education {
            id,
            degree: "New degree".into(),
            ..Default::default()
        });
        id
    }

    pub fn update_education(&mut self, id: EntryId, field: EducationField, value: impl Into<String>) -> bool {
        match self.education.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.set(field, value);
                true
            }
            None => false,
        }
    }

    pub fn remove_education(&mut self, id: EntryId) -> bool {
        let before = self.education.len();
        self.education.retain(|e| e.id != id);
        self.education.len() != before
    }

    // -- design -------------------------------------------------------------

    pub fn set_template(&mut self, template: Template) {
        self.design.template = template;
    }

    pub fn set_font(&mut self, font: FontChoice) {
        self.design.font = font;
    }

    /// Store the raw primary color and recompute the accent from it, falling
    /// back to the default accent.
    pub fn set_primary_color(&mut self, value: &str, probe: Option<&mut dyn ColorProbe>) {
        self.design.primary_color = value.to_string();
        self.accent = resolve_color(value, &HexColor::default_accent(), probe);
        debug!("Primary color {value:?} resolved to {}", self.accent);
    }

    // -- preview & export ---------------------------------------------------

    pub fn preview_html(&self) -> String {
        render_preview(&PreviewData {
            profile: &self.profile,
            skills: &self.skills,
            experience: &self.experience,
            education: &self.education,
            template: self.design.template,
            accent: &self.accent,
            font: self.design.font,
        })
    }

    pub fn preview_document(&self) -> Document {
        Document::parse(&self.preview_html())
    }

    /// Export the current preview. The file is named after the profile name.
    pub fn export<C: Capturer>(&self, exporter: &Exporter<C>) -> Result<Option<ExportedPdf>> {
        let mut document = self.preview_document();
        exporter.export(&mut document, &self.profile.name)
    }
}
