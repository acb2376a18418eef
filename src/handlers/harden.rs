use crate::cli::HardenArgs;
use crate::converter::hardening::{
    HardeningPlan, HealthCheckOptions, ResourceLimitOptions, SecurityOptions, Stage,
    apply_all_optimizations, generate_recommendations, validate_resource_limits,
};
use crate::error::BridgeError;
use crate::k8s::Deployment;
use colored::Colorize;
use std::fs;

/// Builds the hardening plan described by the command-line flags.
pub fn plan_from_args(args: &HardenArgs) -> HardeningPlan {
    HardeningPlan {
        health_checks: Stage::Custom(HealthCheckOptions {
            liveness_path: args.liveness_path.clone(),
            readiness_path: args.readiness_path.clone(),
            port: args.port,
            use_tcp: args.tcp,
            ..Default::default()
        }),
        resource_limits: Stage::Custom(ResourceLimitOptions::profile(args.profile)),
        security: Stage::Custom(SecurityOptions {
            run_as_user: args.run_as_user,
            fs_group: args.fs_group,
            read_only_root_filesystem: args.read_only_root_fs,
            ..Default::default()
        }),
    }
}

/// Prints the hardened Deployment to stdout; findings go to stderr.
pub fn handle_harden(args: &HardenArgs) -> crate::Result<()> {
    let text = fs::read_to_string(&args.file)?;
    let deployment: Deployment = serde_yaml::from_str(&text)?;
    if deployment.kind != "Deployment" {
        return Err(BridgeError::Usage(format!(
            "Expected a Deployment manifest, got kind '{}'",
            deployment.kind
        )));
    }

    let recommendations = generate_recommendations(&deployment);
    if !recommendations.is_empty() {
        eprintln!("{} Recommendations for the original manifest:", "💡".bright_blue());
        for recommendation in &recommendations {
            eprintln!("   - {}", recommendation);
        }
    }

    let hardened = apply_all_optimizations(&deployment, &plan_from_args(args));
    for container in hardened.containers() {
        let check = validate_resource_limits(container.resources.as_ref());
        for warning in &check.warnings {
            eprintln!("{} {}: {}", "⚠️".yellow(), container.name, warning);
        }
    }

    print!("{}", serde_yaml::to_string(&hardened)?);
    Ok(())
}
