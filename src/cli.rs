use crate::converter::{ProxyType, ResourceProfile, TargetPlatform};
use crate::validator::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compose-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert Docker Compose files into Kubernetes, Swarm and Helm deployments")]
#[command(long_about = "Parses a Docker Compose file and projects it into Kubernetes manifests, a Docker Swarm stack and a Helm chart with production defaults (health checks, resource limits, security contexts), then validates the generated manifests without a cluster.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory of the project store
    #[arg(long, global = true, env = "COMPOSE_BRIDGE_STORE", value_name = "DIR")]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a compose file and show what was detected
    Parse {
        /// Path to the compose file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the parsed document and metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a compose file into deployment artifacts
    Convert(ConvertArgs),

    /// Validate Kubernetes manifests, stack files or Helm charts
    Validate {
        /// Files or directories to validate
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// What the inputs contain
        #[arg(long, value_enum, default_value = "auto")]
        kind: KindArg,

        /// Report format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Fail when any score is below this value
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(0..=100))]
        min_score: Option<u8>,
    },

    /// Apply production hardening to an existing Deployment manifest
    Harden(HardenArgs),

    /// Manage saved conversion projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Path to the compose file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output directory for generated files
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Target platform
    #[arg(long, value_enum)]
    pub platform: Option<TargetPlatform>,

    /// Reverse proxy to configure
    #[arg(long, value_enum)]
    pub proxy: Option<ProxyType>,

    /// Resource profile for limits and requests
    #[arg(long, value_enum)]
    pub profile: Option<ResourceProfile>,

    /// Do not add liveness/readiness probes
    #[arg(long)]
    pub no_health_checks: bool,

    /// Do not add resource limits
    #[arg(long)]
    pub no_resource_limits: bool,

    /// Do not add security contexts
    #[arg(long)]
    pub no_security: bool,

    /// Kubernetes namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Let's Encrypt email; enables TLS on proxy routes
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Public host for a service, as SERVICE=HOST
    #[arg(long = "domain", value_name = "SERVICE=HOST", value_parser = parse_domain)]
    pub domains: Vec<(String, String)>,

    /// Project and Helm chart name (defaults to the compose file's directory)
    #[arg(long)]
    pub name: Option<String>,

    /// Apply production optimizations to the Swarm stack
    #[arg(long)]
    pub optimize: bool,

    /// List the files that would be written without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Validate the generated manifests
    #[arg(long)]
    pub validate: bool,

    /// Save the compose file and options to the project store
    #[arg(long)]
    pub save: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct HardenArgs {
    /// Deployment manifest to harden
    #[arg(value_name = "DEPLOYMENT")]
    pub file: PathBuf,

    /// Resource profile for limits and requests
    #[arg(long, value_enum, default_value = "medium")]
    pub profile: ResourceProfile,

    /// HTTP path for the liveness probe
    #[arg(long, default_value = "/health")]
    pub liveness_path: String,

    /// HTTP path for the readiness probe
    #[arg(long, default_value = "/ready")]
    pub readiness_path: String,

    /// Port to probe (defaults to the first container port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Use TCP socket probes instead of HTTP
    #[arg(long)]
    pub tcp: bool,

    /// User id containers run as
    #[arg(long, default_value_t = 1000)]
    pub run_as_user: i64,

    /// Pod fsGroup
    #[arg(long, default_value_t = 1000)]
    pub fs_group: i64,

    /// Mount the root filesystem read-only
    #[arg(long)]
    pub read_only_root_fs: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectsCommand {
    /// List saved projects
    List,
    /// Show a saved project
    Show {
        /// Project id or unique id prefix
        id: String,
    },
    /// Delete a saved project
    Delete {
        /// Project id or unique id prefix
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Detect from file contents; directories with a Chart.yaml are Helm charts
    Auto,
    Kubernetes,
    Stack,
    Helm,
}

fn parse_domain(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((service, host)) if !service.trim().is_empty() && !host.trim().is_empty() => {
            Ok((service.trim().to_string(), host.trim().to_string()))
        }
        _ => Err(format!("expected SERVICE=HOST, got '{}'", value)),
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        let level = if self.quiet {
            log::LevelFilter::Error
        } else {
            match self.verbose {
                0 => log::LevelFilter::Warn,
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        };

        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_domain() {
        assert_eq!(
            parse_domain("web=shop.example.com"),
            Ok(("web".to_string(), "shop.example.com".to_string()))
        );
        assert!(parse_domain("web").is_err());
        assert!(parse_domain("=host").is_err());
    }

    #[test]
    fn test_convert_flags() {
        let cli = Cli::parse_from([
            "compose-bridge",
            "convert",
            "docker-compose.yml",
            "--platform",
            "kubernetes",
            "--domain",
            "web=shop.local",
            "--no-security",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.platform, Some(TargetPlatform::Kubernetes));
                assert_eq!(args.domains, vec![("web".to_string(), "shop.local".to_string())]);
                assert!(args.no_security);
            }
            _ => panic!("expected convert"),
        }
    }
}
