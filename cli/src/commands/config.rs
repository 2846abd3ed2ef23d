// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use colony_core::domain::node_config::ColonyConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./colony-config.yaml)
        #[arg(short, long, default_value = "./colony-config.yaml")]
        output: PathBuf,

        /// Include a sample team and seed plan
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ColonyConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. COLONY_CONFIG_PATH: {}",
            std::env::var("COLONY_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./colony-config.yaml");
        println!("  4. ~/.colony/config.yaml");
        println!("  5. /etc/colony/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let environment = &config.spec.environment;
    println!("{}", "Environment:".bold());
    println!("  Public chat: {}", environment.public_chat);
    println!(
        "  Coordinator: {} ({})",
        environment.coordinator, environment.coordinator_profile
    );
    println!("  Decorate content: {}", environment.decorate_content);
    println!("  Event capacity: {}", environment.event_capacity);
    println!();

    println!("{}", "Scheduler:".bold());
    println!("  Max rounds: {}", config.spec.scheduler.max_rounds);
    println!("  Cycle policy: {:?}", config.spec.plan.cycle_policy);
    println!();

    println!("{}", "Team:".bold());
    if config.spec.team.agents.is_empty() {
        println!("  {}", "(no agents)".dimmed());
    }
    for agent in &config.spec.team.agents {
        println!(
            "  {} ({}) - {} scripted replies",
            agent.name.bold(),
            agent.profile.as_deref().unwrap_or(&agent.name),
            agent.replies.len()
        );
    }
    if let Some(plan) = &config.spec.team.plan {
        println!("  Plan: {} ({} tasks)", plan.goal, plan.tasks.len());
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ColonyConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    std::fs::write(output, sample_config(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../../templates/colony-config-with-examples.yaml")
    } else {
        include_str!("../../../templates/colony-config-minimal.yaml")
    }
}
