//! Notion property wire models and their projection to scalars.
//!
//! A page's `properties` object is a loosely typed bag: every entry carries a `type` tag and a
//! payload under a key of the same name. This module models the bag as a tagged union over the
//! property kinds we extract, with a catch-all for everything else, so projection is a total
//! function from property to cell.
//!
//! | kind        | cell                                   | when absent   |
//! |-------------|----------------------------------------|---------------|
//! | `title`     | concatenated segment `plain_text`      | `""`          |
//! | `status`    | `status.name`                          | `""`          |
//! | `number`    | `number`                               | empty         |
//! | `date`      | `date.start`                           | empty         |
//! | `url`       | `url`                                  | empty         |
//! | `checkbox`  | `checkbox`                             | `false`       |
//! | `rich_text` | concatenated segment `plain_text`      | `""`          |
//! | `email`     | `email`                                | `""`          |
//! | `select`    | `select.name`                          | `""`          |

use serde::Deserialize;
use sync_core::Scalar;

// ============================================================================
// Property kinds
// ============================================================================

/// The property types projected into tracked tables. Anything else is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    Status,
    Number,
    Date,
    Url,
    Checkbox,
    RichText,
    Email,
    Select,
}

impl PropertyKind {
    /// Parse from the Notion `type` tag. Returns `None` for kinds outside the allow-list.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "title" => Some(PropertyKind::Title),
            "status" => Some(PropertyKind::Status),
            "number" => Some(PropertyKind::Number),
            "date" => Some(PropertyKind::Date),
            "url" => Some(PropertyKind::Url),
            "checkbox" => Some(PropertyKind::Checkbox),
            "rich_text" => Some(PropertyKind::RichText),
            "email" => Some(PropertyKind::Email),
            "select" => Some(PropertyKind::Select),
            _ => None,
        }
    }

    /// Convert to the Notion `type` tag.
    pub fn to_wire(self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::Status => "status",
            PropertyKind::Number => "number",
            PropertyKind::Date => "date",
            PropertyKind::Url => "url",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Email => "email",
            PropertyKind::Select => "select",
        }
    }

    /// Cell used when a property of this kind has no value.
    pub fn default_scalar(self) -> Scalar {
        match self {
            PropertyKind::Title
            | PropertyKind::Status
            | PropertyKind::RichText
            | PropertyKind::Email
            | PropertyKind::Select => Scalar::text(""),
            PropertyKind::Checkbox => Scalar::Bool(false),
            PropertyKind::Number | PropertyKind::Date | PropertyKind::Url => Scalar::Empty,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// One segment of a rich text array.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RichTextWire {
    #[serde(default)]
    pub plain_text: String,
}

/// A select or status option.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OptionWire {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DateWire {
    #[serde(default)]
    pub start: Option<String>,
}

/// A page property value, tagged by its `type` field.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichTextWire>,
    },
    Status {
        #[serde(default)]
        status: Option<OptionWire>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    Date {
        #[serde(default)]
        date: Option<DateWire>,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichTextWire>,
    },
    Email {
        #[serde(default)]
        email: Option<String>,
    },
    Select {
        #[serde(default)]
        select: Option<OptionWire>,
    },
    /// Formulas, relations, people, files, rollups and anything Notion adds later.
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    pub fn kind(&self) -> Option<PropertyKind> {
        Some(match self {
            PropertyValue::Title { .. } => PropertyKind::Title,
            PropertyValue::Status { .. } => PropertyKind::Status,
            PropertyValue::Number { .. } => PropertyKind::Number,
            PropertyValue::Date { .. } => PropertyKind::Date,
            PropertyValue::Url { .. } => PropertyKind::Url,
            PropertyValue::Checkbox { .. } => PropertyKind::Checkbox,
            PropertyValue::RichText { .. } => PropertyKind::RichText,
            PropertyValue::Email { .. } => PropertyKind::Email,
            PropertyValue::Select { .. } => PropertyKind::Select,
            PropertyValue::Unsupported => return None,
        })
    }

    /// Projects the property to a single cell, or `None` for unsupported kinds.
    pub fn to_scalar(&self) -> Option<Scalar> {
        let kind = self.kind()?;
        let value = match self {
            PropertyValue::Title { title: segments }
            | PropertyValue::RichText {
                rich_text: segments,
            } => Some(Scalar::Text(plain_text(segments))),
            PropertyValue::Status { status: option } | PropertyValue::Select { select: option } => {
                option.as_ref().map(|o| Scalar::text(o.name.as_str()))
            }
            PropertyValue::Number { number } => number.map(Scalar::Number),
            PropertyValue::Date { date } => date
                .as_ref()
                .and_then(|d| d.start.as_deref())
                .map(Scalar::text),
            PropertyValue::Url { url } => url.as_deref().map(Scalar::text),
            PropertyValue::Checkbox { checkbox } => Some(Scalar::Bool(*checkbox)),
            PropertyValue::Email { email } => email.as_deref().map(Scalar::text),
            PropertyValue::Unsupported => None,
        };
        Some(value.unwrap_or_else(|| kind.default_scalar()))
    }
}

fn plain_text(segments: &[RichTextWire]) -> String {
    segments.iter().map(|s| s.plain_text.as_str()).collect()
}
