//! # Compose Bridge
//!
//! A Rust-based command-line application that converts Docker Compose files
//! into Kubernetes manifests, Docker Swarm stacks and Helm charts, applying
//! production defaults, and validates the results without a cluster.
//!
//! ## Features
//!
//! - **Compose Parsing**: Structural schema checks with located error messages
//! - **Three Projections**: Kubernetes, Swarm and Helm from one options contract
//! - **Production Hardening**: Probes, resource profiles and security contexts
//! - **Client-side Validation**: Naming, label, field and best-practice rules with a quality score
//! - **Traefik Proxy**: Labels, static/dynamic config and IngressRoutes
//!
//! ## Example
//!
//! ```rust
//! use compose_bridge::compose::parse_compose;
//! use compose_bridge::converter::{ConversionOptions, convert_all};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parsed = parse_compose("services:\n  web:\n    image: nginx:1.25\n    ports: [\"80:80\"]\n")?;
//! let bundle = convert_all("shop", &parsed.document, &ConversionOptions::default(), false);
//! assert!(bundle.is_success());
//! assert!(bundle.files().keys().any(|p| p.ends_with("deployment-web.yaml")));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod compose;
pub mod config;
pub mod converter;
pub mod error;
pub mod handlers;
pub mod k8s;
pub mod storage;
pub mod validator;

// Re-export commonly used types and functions
pub use compose::{ParsedCompose, parse_compose};
pub use converter::{ConversionBundle, ConversionOptions, convert_all};
pub use error::{BridgeError, Result};
pub use validator::{ValidationResult, validate_docker_stack, validate_kubernetes_manifests};

use cli::{Cli, Commands};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs a parsed command line. `Ok(false)` means the command ran but its
/// checks did not pass.
pub fn run_command(cli: Cli) -> Result<bool> {
    let project_dir = std::env::current_dir().ok();
    let config = config::load_config(cli.config.as_deref(), project_dir.as_deref())?;
    let store = cli.store.as_deref();

    match cli.command {
        Commands::Parse { file, json } => handlers::handle_parse(&file, json).map(|_| true),
        Commands::Convert(args) => handlers::handle_convert(args, &config, store),
        Commands::Validate {
            paths,
            kind,
            format,
            min_score,
        } => handlers::handle_validate(&paths, kind, format, min_score, &config),
        Commands::Harden(args) => handlers::handle_harden(&args).map(|_| true),
        Commands::Projects { command } => handlers::handle_projects(&command, store).map(|_| true),
    }
}
