use super::DomainStore;
use crate::error::Result;
use crate::events::Event;
use crate::prompts::{NewPrompt, PromptPatch};

impl DomainStore {
    pub fn create_prompt(&mut self, new: NewPrompt) -> Result<String> {
        let mut next = self.draft();
        let id = next.prompts.create(new)?;
        self.publish(next, Event::PromptCreated { prompt_id: id.clone() });
        Ok(id)
    }

    pub fn update_prompt(&mut self, prompt_id: &str, patch: PromptPatch) -> Result<()> {
        let mut next = self.draft();
        next.prompts.update(prompt_id, patch)?;
        self.publish(
            next,
            Event::PromptUpdated {
                prompt_id: prompt_id.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove_prompt(&mut self, prompt_id: &str) -> Result<()> {
        let mut next = self.draft();
        next.prompts.remove(prompt_id)?;
        self.publish(
            next,
            Event::PromptRemoved {
                prompt_id: prompt_id.to_string(),
            },
        );
        Ok(())
    }

    /// Returns the id of the copy.
    pub fn duplicate_prompt(&mut self, prompt_id: &str) -> Result<String> {
        let mut next = self.draft();
        let copy = next.prompts.duplicate(prompt_id)?;
        self.publish(
            next,
            Event::PromptDuplicated {
                source_id: prompt_id.to_string(),
                prompt_id: copy.clone(),
            },
        );
        Ok(copy)
    }

    pub fn toggle_prompt_favorite(&mut self, prompt_id: &str) -> Result<bool> {
        let mut next = self.draft();
        let is_favorite = next.prompts.toggle_favorite(prompt_id)?;
        self.publish(
            next,
            Event::PromptFavoriteToggled {
                prompt_id: prompt_id.to_string(),
                is_favorite,
            },
        );
        Ok(is_favorite)
    }

    /// Share under the configured base URL. Returns the link.
    pub fn share_prompt(&mut self, prompt_id: &str) -> Result<String> {
        let mut next = self.draft();
        let share_link = next
            .prompts
            .share(prompt_id, &self.config.prompts.share_base_url)?;
        self.publish(
            next,
            Event::PromptShared {
                prompt_id: prompt_id.to_string(),
                share_link: share_link.clone(),
            },
        );
        Ok(share_link)
    }

    pub fn record_prompt_use(&mut self, prompt_id: &str) -> Result<u32> {
        let mut next = self.draft();
        let use_count = next.prompts.record_use(prompt_id)?;
        self.publish(
            next,
            Event::PromptUsed {
                prompt_id: prompt_id.to_string(),
                use_count,
            },
        );
        Ok(use_count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Collaborators, DomainStore};
    use crate::error::{CoreError, ValidationError};
    use crate::prompts::{NewPrompt, PromptFormat, PromptPatch};
    use crate::storage::Config;

    fn store() -> DomainStore {
        DomainStore::new(Config::default(), Collaborators::in_memory())
    }

    fn summarize() -> NewPrompt {
        NewPrompt {
            title: "Summarize".into(),
            content: "Summarize the following text in three bullet points.".into(),
            description: "Short summaries".into(),
            category: "writing".into(),
            tags: vec!["summary".into(), "writing".into()],
            format: PromptFormat::Text,
        }
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut store = store();
        let mut blank = summarize();
        blank.title = "  ".into();
        assert!(matches!(
            store.create_prompt(blank),
            Err(CoreError::Validation(ValidationError::MissingField("title")))
        ));
        let mut empty = summarize();
        empty.content = String::new();
        assert!(store.create_prompt(empty).is_err());
        assert!(store.state().prompts.prompts.is_empty());
    }

    #[test]
    fn duplicate_resets_usage() {
        let mut store = store();
        let id = store.create_prompt(summarize()).unwrap();
        store.record_prompt_use(&id).unwrap();
        store.toggle_prompt_favorite(&id).unwrap();
        store.share_prompt(&id).unwrap();

        let copy = store.duplicate_prompt(&id).unwrap();
        let prompts = &store.state().prompts;
        let copy = prompts.get(&copy).unwrap();
        assert_eq!(copy.title, "Summarize (copy)");
        assert_eq!(copy.use_count, 0);
        assert!(!copy.is_favorite);
        assert!(!copy.is_shared);
        assert_eq!(copy.tags, prompts.get(&id).unwrap().tags);
        assert_eq!(prompts.prompts.len(), 2);
    }

    #[test]
    fn share_uses_configured_base() {
        let mut store = store();
        let id = store.create_prompt(summarize()).unwrap();
        let link = store.share_prompt(&id).unwrap();
        assert_eq!(link, format!("https://mindforge.app/share/{id}"));
        let prompt = store.state().prompts.get(&id).unwrap();
        assert!(prompt.is_shared);
        assert_eq!(prompt.share_link.as_deref(), Some(link.as_str()));
    }

    #[test]
    fn use_count_increments() {
        let mut store = store();
        let id = store.create_prompt(summarize()).unwrap();
        assert_eq!(store.record_prompt_use(&id).unwrap(), 1);
        assert_eq!(store.record_prompt_use(&id).unwrap(), 2);
    }

    #[test]
    fn update_keeps_modified_after_created() {
        let mut store = store();
        let id = store.create_prompt(summarize()).unwrap();
        store
            .update_prompt(
                &id,
                PromptPatch {
                    category: Some("study".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let prompt = store.state().prompts.get(&id).unwrap();
        assert_eq!(prompt.category, "study");
        assert!(prompt.modified_at >= prompt.created_at);
        assert_eq!(store.state().prompts.by_category("study").count(), 1);
    }

    #[test]
    fn json_prompts_must_parse() {
        let mut store = store();
        let mut json = summarize();
        json.format = PromptFormat::Json;
        assert!(store.create_prompt(json.clone()).is_err());
        json.content = r#"{"role": "system", "text": "be brief"}"#.into();
        assert!(store.create_prompt(json).is_ok());
    }

    #[test]
    fn missing_prompt_is_reported() {
        let mut store = store();
        assert!(store.remove_prompt("prompt-missing").is_err());
        assert!(store.duplicate_prompt("prompt-missing").is_err());
        assert!(store.share_prompt("prompt-missing").is_err());
        assert!(store.record_prompt_use("prompt-missing").is_err());
    }
}
