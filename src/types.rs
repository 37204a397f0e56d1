//! Core data types for the Shelf knowledge store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Relationship type used when the caller does not name one.
pub const DEFAULT_RELATIONSHIP: &str = "relates_to";

/// Confidence assigned to non-decision entries when the caller gives none.
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Confidence assigned to decisions when the caller gives none.
pub const DECISION_CONFIDENCE: f64 = 1.0;

/// A uniquely identified unit of stored knowledge or decision content.
///
/// Field names double as the export record keys and the table column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Caller-supplied primary key, immutable once written
    pub entry_id: String,

    /// Kind of entry (knowledge, decision, ...)
    pub entry_type: EntryType,

    /// Short human-readable title
    pub title: String,

    /// Free-text body
    pub content: String,

    /// Structured side-channel, always a JSON object when present
    pub metadata: Option<Value>,

    /// Caller-asserted certainty in [0.0, 1.0]
    pub confidence: f64,

    /// When inserted
    pub created_at: DateTime<Utc>,

    /// Last modification
    pub updated_at: DateTime<Utc>,
}

/// Entry kinds. The vocabulary is open: anything that is not one of the
/// well-known kinds is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EntryType {
    Knowledge,
    Decision,
    Pattern,
    Achievement,
    Other(String),
}

impl EntryType {
    /// Storage and export spelling.
    pub fn as_str(&self) -> &str {
        match self {
            EntryType::Knowledge => "knowledge",
            EntryType::Decision => "decision",
            EntryType::Pattern => "pattern",
            EntryType::Achievement => "achievement",
            EntryType::Other(s) => s,
        }
    }

    /// Confidence used when an insert does not specify one.
    ///
    /// Decisions are assertions the caller has already committed to.
    pub fn default_confidence(&self) -> f64 {
        match self {
            EntryType::Decision => DECISION_CONFIDENCE,
            _ => DEFAULT_CONFIDENCE,
        }
    }

    /// Prefix used by generated ids ("K", "D", ...).
    pub fn id_prefix(&self) -> String {
        match self {
            EntryType::Knowledge => "K".to_string(),
            EntryType::Decision => "D".to_string(),
            EntryType::Pattern => "P".to_string(),
            EntryType::Achievement => "A".to_string(),
            EntryType::Other(s) => s
                .chars()
                .find(|c| c.is_ascii_alphabetic())
                .map(|c| c.to_ascii_uppercase().to_string())
                .unwrap_or_else(|| "X".to_string()),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knowledge" => Ok(EntryType::Knowledge),
            "decision" => Ok(EntryType::Decision),
            "pattern" => Ok(EntryType::Pattern),
            "achievement" => Ok(EntryType::Achievement),
            other if is_label(other) => Ok(EntryType::Other(other.to_string())),
            other => Err(ValidationError::InvalidEntryType(other.to_string())),
        }
    }
}

impl From<EntryType> for String {
    fn from(kind: EntryType) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for EntryType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A directed, typed edge from one entry to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    /// Source entry
    pub from_entry_id: String,

    /// Target entry
    pub to_entry_id: String,

    /// Edge label, `relates_to` unless the caller says otherwise
    pub relationship_type: String,

    /// When the edge was created
    pub created_at: DateTime<Utc>,
}

/// Field-level rejections, raised before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyId,
    InvalidId(String),
    InvalidCharacters,
    InvalidEntryType(String),
    InvalidTag(String),
    InvalidRelationshipType(String),
    ConfidenceOutOfRange(f64),
    MetadataNotObject,
    SelfReferentialLink(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyId => write!(f, "entry id cannot be empty"),
            ValidationError::InvalidId(id) => {
                write!(f, "invalid entry id {:?}: must not contain control characters", id)
            }
            ValidationError::InvalidCharacters => write!(f, "title contains control characters"),
            ValidationError::InvalidEntryType(kind) => {
                write!(f, "invalid entry type {:?}: must be non-empty without control characters", kind)
            }
            ValidationError::InvalidTag(tag) => {
                write!(f, "invalid tag {:?}: must be non-empty without control characters", tag)
            }
            ValidationError::InvalidRelationshipType(kind) => {
                write!(f, "invalid relationship type '{}': must be lowercase snake_case", kind)
            }
            ValidationError::ConfidenceOutOfRange(value) => {
                write!(f, "confidence {} is outside [0.0, 1.0]", value)
            }
            ValidationError::MetadataNotObject => write!(f, "metadata must be a JSON object"),
            ValidationError::SelfReferentialLink(id) => write!(f, "cannot link entry {} to itself", id),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Entry {
    /// Validate the entry's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_entry_id(&self.entry_id)?;

        if self.title.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidCharacters);
        }

        if let EntryType::Other(kind) = &self.entry_type
            && !is_label(kind)
        {
            return Err(ValidationError::InvalidEntryType(kind.clone()));
        }

        validate_confidence(self.confidence)?;

        if let Some(metadata) = &self.metadata
            && !metadata.is_object()
        {
            return Err(ValidationError::MetadataNotObject);
        }

        Ok(())
    }
}

/// Ids are opaque, but must be non-empty and free of control characters.
pub fn validate_entry_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if id.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Confidence must lie in the closed interval [0.0, 1.0]. NaN is rejected.
pub fn validate_confidence(confidence: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(ValidationError::ConfidenceOutOfRange(confidence))
    }
}

/// Tags are free-form labels; only blank or control-character tags are rejected.
pub fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    if !is_label(tag) {
        return Err(ValidationError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Relationship types: lowercase snake_case, e.g. `relates_to`, `implements`.
pub fn validate_relationship_type(kind: &str) -> Result<(), ValidationError> {
    if !is_snake_case(kind) {
        return Err(ValidationError::InvalidRelationshipType(kind.to_string()));
    }
    Ok(())
}

fn is_label(s: &str) -> bool {
    !s.trim().is_empty() && !s.chars().any(|c| c.is_control())
}

fn is_snake_case(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
