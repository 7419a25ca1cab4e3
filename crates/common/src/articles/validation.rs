//! Article input validation
//!
//! Pure functions turning client input into normalized records. Every
//! violation of an input is collected so the admin UI can mark each field.

use super::catalog::CategoryCatalog;
use crate::db::models::{truncate, Article};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Maximum id length, matches the `articles.id` column
pub const MAX_ID_LEN: usize = 255;

/// Rust field name and wire name of every length-limited field
const FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("summary", "summary"),
    ("content", "content"),
    ("category", "category"),
    ("theme_id", "themeId"),
    ("read_time", "readTime"),
];

/// A single field-level problem with an input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind")]
pub enum Violation {
    #[error("{field} must not be empty")]
    EmptyField { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: u64 },

    #[error("category '{category}' with themeId '{theme_id}' is not in the catalog")]
    #[serde(rename_all = "camelCase")]
    UnknownCategory { category: String, theme_id: String },

    #[error("'{id}' is not a valid article id")]
    InvalidId { id: String },
}

impl Violation {
    /// Wire name of the field the violation is attached to
    pub fn field(&self) -> &str {
        match self {
            Violation::EmptyField { field } | Violation::TooLong { field, .. } => field,
            Violation::UnknownCategory { .. } => "themeId",
            Violation::InvalidId { .. } => "id",
        }
    }

    fn empty(field: &str) -> Self {
        Violation::EmptyField {
            field: field.to_string(),
        }
    }
}

/// Check an article id taken from a path or a client
pub fn validate_id(id: &str) -> Result<(), Violation> {
    let valid = !id.is_empty()
        && id.chars().count() <= MAX_ID_LEN
        && !id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/');

    if valid {
        Ok(())
    } else {
        Err(Violation::InvalidId { id: id.to_string() })
    }
}

/// Body of a create request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct NewArticle {
    #[validate(length(max = 255))]
    pub title: String,

    pub summary: String,

    pub content: String,

    #[validate(length(max = 100))]
    pub category: String,

    #[validate(length(max = 100))]
    pub theme_id: String,

    #[validate(length(max = 50))]
    pub read_time: String,

    /// Publication date, defaults to the creation time
    pub date: Option<DateTime<FixedOffset>>,
}

/// A validated, normalized create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: String,
    pub theme_id: String,
    pub read_time: String,
    pub date: Option<DateTime<FixedOffset>>,
}

impl NewArticle {
    /// Trim, check and normalize the input against the catalog
    pub fn into_draft(self, catalog: &CategoryCatalog) -> Result<ArticleDraft, Vec<Violation>> {
        let normalized = NewArticle {
            title: self.title.trim().to_string(),
            summary: self.summary.trim().to_string(),
            content: self.content.trim().to_string(),
            category: self.category.trim().to_string(),
            theme_id: self.theme_id.trim().to_string(),
            read_time: self.read_time.trim().to_string(),
            date: self.date.map(truncate),
        };

        let mut violations: Vec<Violation> = [
            ("title", &normalized.title),
            ("summary", &normalized.summary),
            ("content", &normalized.content),
            ("category", &normalized.category),
            ("themeId", &normalized.theme_id),
            ("readTime", &normalized.read_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| Violation::empty(field))
        .collect();

        if let Err(errors) = normalized.validate() {
            violations.extend(length_violations(&errors));
        }

        if !normalized.category.is_empty()
            && !normalized.theme_id.is_empty()
            && !catalog.contains_pair(&normalized.category, &normalized.theme_id)
        {
            violations.push(Violation::UnknownCategory {
                category: normalized.category.clone(),
                theme_id: normalized.theme_id.clone(),
            });
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(ArticleDraft {
            title: normalized.title,
            summary: normalized.summary,
            content: normalized.content,
            category: normalized.category,
            theme_id: normalized.theme_id,
            read_time: normalized.read_time,
            date: normalized.date,
        })
    }
}

impl ArticleDraft {
    /// Materialize the record the store will insert
    pub fn into_article(self, id: String, now: DateTime<FixedOffset>) -> Article {
        Article {
            id,
            title: self.title,
            summary: self.summary,
            content: self.content,
            category: self.category,
            theme_id: self.theme_id,
            read_time: self.read_time,
            date: self.date.unwrap_or(now),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

/// Body of an update request; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArticlePatch {
    #[validate(length(max = 255))]
    pub title: Option<String>,

    pub summary: Option<String>,

    pub content: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 100))]
    pub theme_id: Option<String>,

    #[validate(length(max = 50))]
    pub read_time: Option<String>,

    pub date: Option<DateTime<FixedOffset>>,

    /// Version the client last read; a mismatch fails with a conflict
    pub version: Option<i32>,
}

impl ArticlePatch {
    /// True when the patch changes no field
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.summary.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.theme_id.is_none()
            && self.read_time.is_none()
            && self.date.is_none()
    }

    /// Validate the provided fields only and complete the category pair
    ///
    /// When just one of `category`/`themeId` is given, the other is taken
    /// from the catalog so the stored pair always matches an entry.
    pub fn normalize(self, catalog: &CategoryCatalog) -> Result<ArticlePatch, Vec<Violation>> {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());

        let mut patch = ArticlePatch {
            title: trim(self.title),
            summary: trim(self.summary),
            content: trim(self.content),
            category: trim(self.category),
            theme_id: trim(self.theme_id),
            read_time: trim(self.read_time),
            date: self.date.map(truncate),
            version: self.version,
        };

        let mut violations: Vec<Violation> = [
            ("title", &patch.title),
            ("summary", &patch.summary),
            ("content", &patch.content),
            ("category", &patch.category),
            ("themeId", &patch.theme_id),
            ("readTime", &patch.read_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref() == Some(""))
        .map(|(field, _)| Violation::empty(field))
        .collect();

        if let Err(errors) = patch.validate() {
            violations.extend(length_violations(&errors));
        }

        match (patch.category.as_deref(), patch.theme_id.as_deref()) {
            (Some(category), Some(theme_id)) if !category.is_empty() && !theme_id.is_empty() => {
                if !catalog.contains_pair(category, theme_id) {
                    violations.push(Violation::UnknownCategory {
                        category: category.to_string(),
                        theme_id: theme_id.to_string(),
                    });
                }
            }
            (None, Some(theme_id)) if !theme_id.is_empty() => match catalog.by_theme(theme_id) {
                Some(entry) => patch.category = Some(entry.name.clone()),
                None => violations.push(Violation::UnknownCategory {
                    category: String::new(),
                    theme_id: theme_id.to_string(),
                }),
            },
            (Some(category), None) if !category.is_empty() => match catalog.by_name(category) {
                Some(entry) => patch.theme_id = Some(entry.id.clone()),
                None => violations.push(Violation::UnknownCategory {
                    category: category.to_string(),
                    theme_id: String::new(),
                }),
            },
            _ => {}
        }

        if violations.is_empty() {
            Ok(patch)
        } else {
            Err(violations)
        }
    }

    /// Apply the provided fields to a record
    pub fn apply_to(&self, article: &mut Article) {
        if let Some(ref title) = self.title {
            article.title = title.clone();
        }
        if let Some(ref summary) = self.summary {
            article.summary = summary.clone();
        }
        if let Some(ref content) = self.content {
            article.content = content.clone();
        }
        if let Some(ref category) = self.category {
            article.category = category.clone();
        }
        if let Some(ref theme_id) = self.theme_id {
            article.theme_id = theme_id.clone();
        }
        if let Some(ref read_time) = self.read_time {
            article.read_time = read_time.clone();
        }
        if let Some(date) = self.date {
            article.date = date;
        }
    }
}

/// Map `validator` length errors to violations, in field declaration order
fn length_violations(errors: &ValidationErrors) -> Vec<Violation> {
    let by_field = errors.field_errors();

    FIELDS
        .iter()
        .filter_map(|(rust_name, wire_name)| {
            by_field.get(*rust_name).map(|errs| (wire_name, errs))
        })
        .flat_map(|(wire_name, errs)| {
            errs.iter().map(move |err| Violation::TooLong {
                field: wire_name.to_string(),
                max: err
                    .params
                    .get("max")
                    .and_then(|v| v.as_u64())
                    .unwrap_or_default(),
            })
        })
        .collect()
}
