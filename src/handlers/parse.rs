use crate::compose::{ParsedCompose, parse_compose_file};
use colored::Colorize;
use serde_json::json;
use std::path::Path;

pub fn handle_parse(file: &Path, json: bool) -> crate::Result<()> {
    let parsed = parse_compose_file(file)?;

    if json {
        let output = json!({
            "document": parsed.document,
            "metadata": parsed.metadata,
            "warnings": parsed.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_summary(file, &parsed);
    Ok(())
}

fn print_summary(file: &Path, parsed: &ParsedCompose) {
    println!(
        "{} {} ({} services)",
        "📄".bright_blue(),
        file.display().to_string().bold(),
        parsed.service_count()
    );
    if let Some(version) = &parsed.document.version {
        println!("   Compose version: {}", version);
    }

    for service in &parsed.metadata.services {
        println!("\n{} {}", "▸".cyan(), service.name.bold());
        println!(
            "   image:       {}",
            service.image.as_deref().unwrap_or("(build only)")
        );
        if !service.ports.is_empty() {
            let ports: Vec<String> = service
                .ports
                .iter()
                .map(|p| format!("{}:{}/{}", p.host_port, p.container_port, p.protocol))
                .collect();
            println!("   ports:       {}", ports.join(", "));
        }
        if !service.volumes.is_empty() {
            let volumes: Vec<String> = service
                .volumes
                .iter()
                .map(|v| format!("{} → {}", v.source, v.target))
                .collect();
            println!("   volumes:     {}", volumes.join(", "));
        }
        if !service.environment_variables.is_empty() {
            let keys: Vec<&str> = service.environment_variables.keys().map(String::as_str).collect();
            println!("   environment: {}", keys.join(", "));
        }
        if !service.depends_on.is_empty() {
            println!("   depends on:  {}", service.depends_on.join(", "));
        }
        if let Some(replicas) = service.replicas {
            println!("   replicas:    {}", replicas);
        }
        println!(
            "   healthcheck: {}",
            if service.has_health_check { "yes".green() } else { "no".dimmed() }
        );
    }

    if !parsed.metadata.volume_names.is_empty() {
        println!("\nVolumes:  {}", parsed.metadata.volume_names.join(", "));
    }
    if !parsed.metadata.network_names.is_empty() {
        println!("Networks: {}", parsed.metadata.network_names.join(", "));
    }
    print_warnings(&parsed.warnings);
}

pub(crate) fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{} {} warning(s):", "⚠️".yellow(), warnings.len());
    for warning in warnings {
        println!("   {} {}", "-".yellow(), warning);
    }
}
