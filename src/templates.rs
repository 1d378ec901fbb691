//! Typed template catalog.
//!
//! Templates are a closed, enumerated set; the registry re-validates its
//! entries at construction so a bad catalog fails the process at startup
//! instead of at first use.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Classic,
    Modern,
    Playful,
    Elegant,
    Proposal,
    Envelope,
    Scratch,
    Countdown,
}

impl TemplateId {
    pub fn all() -> &'static [TemplateId] {
        &[
            TemplateId::Classic,
            TemplateId::Modern,
            TemplateId::Playful,
            TemplateId::Elegant,
            TemplateId::Proposal,
            TemplateId::Envelope,
            TemplateId::Scratch,
            TemplateId::Countdown,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Classic => "classic",
            TemplateId::Modern => "modern",
            TemplateId::Playful => "playful",
            TemplateId::Elegant => "elegant",
            TemplateId::Proposal => "proposal",
            TemplateId::Envelope => "envelope",
            TemplateId::Scratch => "scratch",
            TemplateId::Countdown => "countdown",
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: &'static str,
    pub description: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub font: &'static str,
    pub interactive: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {0} is missing from the catalog")]
    Missing(TemplateId),
    #[error("template {0} appears more than once")]
    Duplicate(TemplateId),
    #[error("template {id} has invalid field {field}: {value}")]
    InvalidField {
        id: TemplateId,
        field: &'static str,
        value: String,
    },
}

pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    /// The built-in catalog, validated.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_entries(builtin_entries())
    }

    fn from_entries(templates: Vec<Template>) -> Result<Self, TemplateError> {
        for id in TemplateId::all() {
            let hits = templates.iter().filter(|t| t.id == *id).count();
            if hits == 0 {
                return Err(TemplateError::Missing(*id));
            }
            if hits > 1 {
                return Err(TemplateError::Duplicate(*id));
            }
        }
        for t in &templates {
            if t.name.is_empty() {
                return Err(TemplateError::InvalidField {
                    id: t.id,
                    field: "name",
                    value: String::new(),
                });
            }
            for (field, value) in [
                ("primary_color", t.primary_color),
                ("secondary_color", t.secondary_color),
            ] {
                if !is_hex_color(value) {
                    return Err(TemplateError::InvalidField {
                        id: t.id,
                        field,
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(Self { templates })
    }

    pub fn get(&self, id: TemplateId) -> &Template {
        // from_entries guarantees every id is present exactly once
        self.templates
            .iter()
            .find(|t| t.id == id)
            .unwrap_or(&self.templates[0])
    }

    pub fn all(&self) -> &[Template] {
        &self.templates
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn builtin_entries() -> Vec<Template> {
    vec![
        Template {
            id: TemplateId::Classic,
            name: "Classic Love",
            description: "Timeless romantic design with elegant typography",
            primary_color: "#e91e63",
            secondary_color: "#fce4ec",
            font: "Pacifico",
            interactive: false,
        },
        Template {
            id: TemplateId::Modern,
            name: "Modern Romance",
            description: "Clean and contemporary with subtle gradients",
            primary_color: "#9c27b0",
            secondary_color: "#f3e5f5",
            font: "Nunito",
            interactive: false,
        },
        Template {
            id: TemplateId::Playful,
            name: "Playful Hearts",
            description: "Fun and vibrant with animated elements",
            primary_color: "#f44336",
            secondary_color: "#ffebee",
            font: "Caveat",
            interactive: false,
        },
        Template {
            id: TemplateId::Elegant,
            name: "Elegant Script",
            description: "Sophisticated design with script typography",
            primary_color: "#880e4f",
            secondary_color: "#fce4ec",
            font: "Pacifico",
            interactive: false,
        },
        Template {
            id: TemplateId::Proposal,
            name: "Will You Be Mine?",
            description: "Interactive proposal with playful Yes/No buttons",
            primary_color: "#ec4899",
            secondary_color: "#fdf2f8",
            font: "Pacifico",
            interactive: true,
        },
        Template {
            id: TemplateId::Envelope,
            name: "Love Letter",
            description: "3D envelope that opens to reveal the message",
            primary_color: "#be185d",
            secondary_color: "#fff1f2",
            font: "Caveat",
            interactive: true,
        },
        Template {
            id: TemplateId::Scratch,
            name: "Scratch Card",
            description: "Scratch away hearts to reveal a hidden message",
            primary_color: "#db2777",
            secondary_color: "#fce7f3",
            font: "Nunito",
            interactive: true,
        },
        Template {
            id: TemplateId::Countdown,
            name: "Countdown Reveal",
            description: "Countdown timer that reveals the message",
            primary_color: "#e11d48",
            secondary_color: "#ffe4e6",
            font: "Pacifico",
            interactive: true,
        },
    ]
}
