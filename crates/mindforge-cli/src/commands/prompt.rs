use clap::Subcommand;
use mindforge_core::prompts::PromptFormat;
use mindforge_core::{NewPrompt, Prompt};
use serde_json::json;

use super::{open_store, parse_name, print_json, CliResult};

#[derive(Subcommand)]
pub enum PromptAction {
    /// Add a prompt
    Add {
        title: String,
        content: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "text", value_parser = parse_name::<PromptFormat>)]
        format: PromptFormat,
    },
    /// List prompts, optionally filtered
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Copy a prompt under a new id
    Duplicate {
        id: String,
    },
    /// Produce a share link
    Share {
        id: String,
    },
    /// Toggle the favorite flag
    Favorite {
        id: String,
    },
    /// Count one use of a prompt
    Use {
        id: String,
    },
    /// Remove a prompt
    Remove {
        id: String,
    },
}

pub fn run(action: PromptAction) -> CliResult {
    let (db, mut store) = open_store()?;

    match action {
        PromptAction::Add {
            title,
            content,
            description,
            category,
            tags,
            format,
        } => {
            let id = store.create_prompt(NewPrompt {
                title,
                content,
                description,
                category,
                tags,
                format,
            })?;
            print_json(&store.state().prompts.get(&id))?;
        }
        PromptAction::List { category, tag } => {
            let library = &store.state().prompts;
            let mut prompts: Vec<&Prompt> = match &category {
                Some(category) => library.by_category(category).collect(),
                None => library.prompts.iter().collect(),
            };
            if let Some(tag) = &tag {
                let tagged: Vec<&str> = library.by_tag(tag).map(|p| p.id.as_str()).collect();
                prompts.retain(|p| tagged.contains(&p.id.as_str()));
            }
            print_json(&prompts)?;
        }
        PromptAction::Duplicate { id } => {
            let copy = store.duplicate_prompt(&id)?;
            print_json(&store.state().prompts.get(&copy))?;
        }
        PromptAction::Share { id } => {
            let link = store.share_prompt(&id)?;
            println!("{link}");
        }
        PromptAction::Favorite { id } => {
            let is_favorite = store.toggle_prompt_favorite(&id)?;
            print_json(&json!({ "prompt_id": id, "is_favorite": is_favorite }))?;
        }
        PromptAction::Use { id } => {
            let use_count = store.record_prompt_use(&id)?;
            print_json(&json!({ "prompt_id": id, "use_count": use_count }))?;
        }
        PromptAction::Remove { id } => {
            store.remove_prompt(&id)?;
            print_json(&json!({ "type": "prompt_removed", "prompt_id": id }))?;
        }
    }

    store.flush(&db)?;
    Ok(())
}
