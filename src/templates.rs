//! Static catalog of content templates and form option lists.
//!
//! Templates are compiled into the binary; nothing here is loaded at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// The five kinds of content the studio can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Story,
    Poem,
    Character,
    Worldbuilding,
    Dialogue,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Story,
        ContentType::Poem,
        ContentType::Character,
        ContentType::Worldbuilding,
        ContentType::Dialogue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Poem => "poem",
            Self::Character => "character",
            Self::Worldbuilding => "worldbuilding",
            Self::Dialogue => "dialogue",
        }
    }

    /// The template that collects inputs for this content type.
    pub fn template(&self) -> &'static Template {
        match self {
            Self::Story => &STORY,
            Self::Poem => &POEM,
            Self::Character => &CHARACTER,
            Self::Worldbuilding => &WORLDBUILDING,
            Self::Dialogue => &DIALOGUE,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StudioError::validation("type", format!("unknown content type '{s}'")))
    }
}

/// How a template field is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Select,
    Textarea,
}

impl FieldKind {
    /// Free-text kinds go through the gibberish and character checks.
    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Text | Self::Textarea)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
}

impl TemplateField {
    const fn text(key: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Text,
            options: &[],
            placeholder: Some(placeholder),
        }
    }

    const fn select(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Select,
            options,
            placeholder: None,
        }
    }
}

/// A content template: which fields must be filled before generating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub id: ContentType,
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [TemplateField],
}

impl Template {
    pub fn field(&self, key: &str) -> Option<&TemplateField> {
        self.fields.iter().find(|f| f.key == key)
    }
}

static STORY: Template = Template {
    id: ContentType::Story,
    name: "Short Story",
    description: "Generate a compelling narrative with a beginning, middle, and end.",
    fields: &[
        TemplateField::text("protagonist", "Protagonist", "e.g., A retired detective"),
        TemplateField::text("setting", "Setting", "e.g., A rain-slicked futuristic Tokyo"),
        TemplateField::text("twist", "Plot Twist", "e.g., The detective is a ghost"),
    ],
};

static POEM: Template = Template {
    id: ContentType::Poem,
    name: "Poetry",
    description: "Compose evocative verse in various styles.",
    fields: &[
        TemplateField::select(
            "style",
            "Poetic Style",
            &[
                "Free Verse",
                "Sonnet",
                "Haiku",
                "Limerick",
                "Epic",
                "Praise Poem (Izibongo)",
            ],
        ),
        TemplateField::text("theme", "Theme", "e.g., The passage of time"),
    ],
};

static CHARACTER: Template = Template {
    id: ContentType::Character,
    name: "Character Profile",
    description: "Create a deep, multifaceted character description.",
    fields: &[
        TemplateField::text("name", "Name", "Character Name"),
        TemplateField::text("archetype", "Archetype", "e.g., The Reluctant Hero"),
        TemplateField::text("secret", "Secret", "What are they hiding?"),
    ],
};

static WORLDBUILDING: Template = Template {
    id: ContentType::Worldbuilding,
    name: "World Building",
    description: "Flesh out a unique setting, culture, or magic system.",
    fields: &[
        TemplateField::text("worldName", "World Name", "e.g., Arrakis"),
        TemplateField::text("element", "Key Element", "e.g., Magic is fueled by memories"),
        TemplateField::text("society", "Society Type", "e.g., Theocratic dystopia"),
    ],
};

static DIALOGUE: Template = Template {
    id: ContentType::Dialogue,
    name: "Dialogue Scene",
    description: "Write a conversation between two characters revealing conflict.",
    fields: &[
        TemplateField::text("characters", "Characters", "Name A and Name B"),
        TemplateField::text(
            "conflict",
            "Conflict",
            "They are fighting over the last slice of pizza",
        ),
    ],
};

/// All templates in display order.
pub fn templates() -> [&'static Template; 5] {
    ContentType::ALL.map(|t| t.template())
}

pub const GENRES: &[&str] = &[
    "Fantasy",
    "Sci-Fi",
    "Mystery",
    "Romance",
    "Horror",
    "Historical Fiction",
    "Literary Fiction",
    "Cyberpunk",
    "Folklore",
];

pub const TONES: &[&str] = &[
    "Dark",
    "Humorous",
    "Melancholic",
    "Optimistic",
    "Suspenseful",
    "Whimsical",
    "Gritty",
    "Romantic",
    "Educational",
];

pub const LANGUAGES: &[&str] = &[
    "English",
    "isiZulu",
    "isiXhosa",
    "Afrikaans",
    "Sepedi",
    "Setswana",
    "Sesotho",
    "Xitsonga",
    "siSwati",
    "Tshivenda",
    "isiNdebele",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_maps_to_its_own_template() {
        for content_type in ContentType::ALL {
            assert_eq!(content_type.template().id, content_type);
            assert!(!content_type.template().fields.is_empty());
        }
    }

    #[test]
    fn test_content_type_parsing() {
        assert_eq!("Poem".parse::<ContentType>().unwrap(), ContentType::Poem);
        assert_eq!(
            " worldbuilding ".parse::<ContentType>().unwrap(),
            ContentType::Worldbuilding
        );
        assert!("essay".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_poem_style_is_a_select_field() {
        let style = ContentType::Poem.template().field("style").unwrap();
        assert_eq!(style.kind, FieldKind::Select);
        assert!(style.options.contains(&"Haiku"));
        assert!(!style.kind.is_free_text());
    }

    #[test]
    fn test_content_type_serializes_lowercase() {
        let json = serde_json::to_string(&ContentType::Worldbuilding).unwrap();
        assert_eq!(json, "\"worldbuilding\"");
    }
}
