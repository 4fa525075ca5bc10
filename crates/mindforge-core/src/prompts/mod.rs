//! Prompt library: prompt records with duplication, favourites and share
//! links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, EntityKind, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptFormat {
    Text,
    /// Content must be a JSON document.
    Json,
    Embed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub content: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Never earlier than `created_at`.
    pub modified_at: DateTime<Utc>,
    pub use_count: u32,
    pub is_favorite: bool,
    pub format: PromptFormat,
    pub is_shared: bool,
    pub share_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub format: PromptFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub format: Option<PromptFormat>,
}

fn validate_fields(title: &str, content: &str, format: PromptFormat) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    if content.trim().is_empty() {
        return Err(ValidationError::MissingField("content"));
    }
    if format == PromptFormat::Json {
        serde_json::from_str::<serde_json::Value>(content).map_err(|e| {
            ValidationError::InvalidValue {
                field: "content",
                message: format!("not valid JSON: {e}"),
            }
        })?;
    }
    Ok(())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Deterministic share URL for a prompt id under `base`.
pub fn share_link(base: &str, prompt_id: &str) -> Result<String, ValidationError> {
    let invalid = |message: String| ValidationError::InvalidValue {
        field: "share_base_url",
        message,
    };
    let mut base = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(prompt_id)
        .map(String::from)
        .map_err(|e| invalid(e.to_string()))
}

/// Prompt records in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptLibrary {
    pub prompts: Vec<Prompt>,
}

impl PromptLibrary {
    pub fn get(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Prompt, CoreError> {
        self.prompts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Prompt, id))
    }

    pub fn create(&mut self, new: NewPrompt) -> Result<String, ValidationError> {
        validate_fields(&new.title, &new.content, new.format)?;
        let now = Utc::now();
        let prompt = Prompt {
            id: format!("prompt-{}", uuid::Uuid::new_v4()),
            title: new.title,
            content: new.content,
            description: new.description,
            category: new.category,
            tags: normalize_tags(new.tags),
            created_at: now,
            modified_at: now,
            use_count: 0,
            is_favorite: false,
            format: new.format,
            is_shared: false,
            share_link: None,
        };
        let id = prompt.id.clone();
        self.prompts.push(prompt);
        Ok(id)
    }

    pub fn update(&mut self, id: &str, patch: PromptPatch) -> Result<(), CoreError> {
        let prompt = self.get_mut(id)?;
        validate_fields(
            patch.title.as_deref().unwrap_or(&prompt.title),
            patch.content.as_deref().unwrap_or(&prompt.content),
            patch.format.unwrap_or(prompt.format),
        )?;

        if let Some(title) = patch.title {
            prompt.title = title;
        }
        if let Some(content) = patch.content {
            prompt.content = content;
        }
        if let Some(description) = patch.description {
            prompt.description = description;
        }
        if let Some(category) = patch.category {
            prompt.category = category;
        }
        if let Some(tags) = patch.tags {
            prompt.tags = normalize_tags(tags);
        }
        if let Some(format) = patch.format {
            prompt.format = format;
        }
        prompt.modified_at = Utc::now().max(prompt.created_at);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Prompt, CoreError> {
        let index = self
            .prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Prompt, id))?;
        Ok(self.prompts.remove(index))
    }

    /// Clone under a new id with usage, favourite and share state reset.
    pub fn duplicate(&mut self, id: &str) -> Result<String, CoreError> {
        let source = self
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Prompt, id))?;
        let now = Utc::now();
        let copy = Prompt {
            id: format!("prompt-{}", uuid::Uuid::new_v4()),
            title: format!("{} (copy)", source.title),
            created_at: now,
            modified_at: now,
            use_count: 0,
            is_favorite: false,
            is_shared: false,
            share_link: None,
            ..source.clone()
        };
        let new_id = copy.id.clone();
        self.prompts.push(copy);
        Ok(new_id)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool, CoreError> {
        let prompt = self.get_mut(id)?;
        prompt.is_favorite = !prompt.is_favorite;
        Ok(prompt.is_favorite)
    }

    /// Mark shared and return the prompt's share URL.
    pub fn share(&mut self, id: &str, base: &str) -> Result<String, CoreError> {
        let prompt = self.get_mut(id)?;
        let link = share_link(base, &prompt.id)?;
        prompt.is_shared = true;
        prompt.share_link = Some(link.clone());
        Ok(link)
    }

    pub fn record_use(&mut self, id: &str) -> Result<u32, CoreError> {
        let prompt = self.get_mut(id)?;
        prompt.use_count = prompt.use_count.saturating_add(1);
        Ok(prompt.use_count)
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Prompt> + 'a {
        self.prompts.iter().filter(move |p| p.category == category)
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Prompt> + 'a {
        self.prompts
            .iter()
            .filter(move |p| p.tags.iter().any(|t| t == tag))
    }
}
