use super::open_store;
use crate::cli::ProjectsCommand;
use crate::error::StorageError;
use crate::storage::{ProjectStore, find_project};
use colored::Colorize;
use std::path::Path;

pub fn handle_projects(command: &ProjectsCommand, store_dir: Option<&Path>) -> crate::Result<()> {
    let mut store = open_store(store_dir);

    match command {
        ProjectsCommand::List => {
            let projects = store.list()?;
            if projects.is_empty() {
                println!("No saved projects in {}", store.root().display());
                return Ok(());
            }
            println!(
                "{:<10} {:<24} {:<24} {}",
                "ID".bold(),
                "NAME".bold(),
                "FILE".bold(),
                "UPDATED".bold()
            );
            for project in &projects {
                let id = project.id.to_string();
                println!(
                    "{:<10} {:<24} {:<24} {}",
                    &id[..8],
                    project.name,
                    project.compose.filename,
                    project.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
            let usage = store.usage()?;
            println!(
                "\n{} projects, {:.1}% of {} KiB used",
                projects.len(),
                usage.usage_percentage,
                usage.limit / 1024
            );
        }
        ProjectsCommand::Show { id } => {
            let project = find_project(&store, id)?.ok_or_else(|| StorageError::NotFound(id.clone()))?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectsCommand::Delete { id } => {
            let project = find_project(&store, id)?.ok_or_else(|| StorageError::NotFound(id.clone()))?;
            store.delete(&project.id)?;
            println!("🗑️  Deleted project {} ({})", project.name, project.id);
        }
    }
    Ok(())
}
