//! Resume records and design choices.
//!
//! Everything here is plain data. Identifiers are session-scoped and never
//! serialised: a resume loaded from JSON gets fresh ids from the editor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Session-scoped identifier of an experience or education entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Title,
    Email,
    Phone,
    Location,
    Summary,
}

impl Profile {
    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        let slot = match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Title => &mut self.title,
            ProfileField::Email => &mut self.email,
            ProfileField::Phone => &mut self.phone,
            ProfileField::Location => &mut self.location,
            ProfileField::Summary => &mut self.summary,
        };
        *slot = value.into();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    #[serde(skip)]
    pub id: EntryId,
    pub role: String,
    pub company: String,
    pub period: String,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceField {
    Role,
    Company,
    Period,
    Details,
}

impl Experience {
    pub fn set(&mut self, field: ExperienceField, value: impl Into<String>) {
        let slot = match field {
            ExperienceField::Role => &mut self.role,
            ExperienceField::Company => &mut self.company,
            ExperienceField::Period => &mut self.period,
            ExperienceField::Details => &mut self.details,
        };
        *slot = value.into();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    #[serde(skip)]
    pub id: EntryId,
    pub degree: String,
    pub school: String,
    pub period: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationField {
    Degree,
    School,
    Period,
}

impl Education {
    pub fn set(&mut self, field: EducationField, value: impl Into<String>) {
        let slot = match field {
            EducationField::Degree => &mut self.degree,
            EducationField::School => &mut self.school,
            EducationField::Period => &mut self.period,
        };
        *slot = value.into();
    }
}

/// One of the three fixed preview layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Classic,
    Modern,
    Clean,
}

/// Font picker entry; each maps to a CSS family list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FontChoice {
    #[default]
    Inter,
    Georgia,
    Monospace,
}

impl FontChoice {
    pub fn css_family(self) -> &'static str {
        match self {
            FontChoice::Inter => "Inter, ui-sans-serif, system-ui",
            FontChoice::Georgia => "Georgia, serif",
            FontChoice::Monospace => "'Courier New', monospace",
        }
    }
}

/// Design settings as the user entered them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Design {
    pub template: Template,
    /// Raw user value; may be any CSS color syntax or garbage.
    pub primary_color: String,
    pub font: FontChoice,
}

impl Default for Design {
    fn default() -> Self {
        Self {
            template: Template::Classic,
            primary_color: crate::color::DEFAULT_ACCENT.to_string(),
            font: FontChoice::Inter,
        }
    }
}

/// Resume as read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeInput {
    pub profile: Profile,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub design: Design,
}
