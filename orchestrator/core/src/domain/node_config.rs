// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Colony Configuration Types
//
// Defines the configuration schema for a colony run, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Message bus settings (public chat, coordinator identity, decoration)
// - Round scheduler budget
// - Plan cycle policy
// - Optional team roster and seed plan used by `colony run`

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::plan::CyclePolicy;
use crate::domain::task::Task;

pub const API_VERSION: &str = "colony.dev/v1";
pub const KIND: &str = "ColonyConfig";

/// Top-level Kubernetes-style colony configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonyConfigManifest {
    /// API version (must be "colony.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ColonyConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ColonyConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under spec:
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColonyConfigSpec {
    #[serde(default)]
    pub environment: EnvironmentSettings,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub plan: PlanSettings,

    #[serde(default)]
    pub team: TeamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// Add `<all>` to coordinator and default-routed messages
    #[serde(default = "default_true")]
    pub public_chat: bool,

    /// Name of the coordinating agent (fallback hub)
    #[serde(default = "default_coordinator")]
    pub coordinator: String,

    /// Profile that marks a publisher as speaking for the coordinator
    #[serde(default = "default_coordinator_profile")]
    pub coordinator_profile: String,

    /// Prefix delivered copies with "[Message] from X to Y:"
    #[serde(default = "default_true")]
    pub decorate_content: bool,

    /// Event bus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSettings {
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub agents: Vec<TeamAgentConfig>,

    /// Seed plan handed to the coordinator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TeamPlanConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAgentConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Subscription override; defaults to the agent name plus `<all>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,

    /// Canned replies, one per turn that received mail
    #[serde(default)]
    pub replies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamPlanConfig {
    pub goal: String,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

fn default_true() -> bool {
    true
}

fn default_coordinator() -> String {
    "Mike".to_string()
}

fn default_coordinator_profile() -> String {
    "TeamLeader".to_string()
}

fn default_event_capacity() -> usize {
    1000
}

fn default_max_rounds() -> u32 {
    10
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            public_chat: true,
            coordinator: default_coordinator(),
            coordinator_profile: default_coordinator_profile(),
            decorate_content: true,
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

impl Default for ColonyConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "colony".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ColonyConfigSpec::default(),
        }
    }
}

impl ColonyConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. COLONY_CONFIG_PATH environment variable
    /// 2. ./colony-config.yaml (working directory)
    /// 3. ~/.colony/config.yaml (user home)
    /// 4. /etc/colony/config.yaml (system, Unix) or C:\ProgramData\Colony\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("COLONY_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./colony-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".colony").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/colony/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Colony\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COLONY_MAX_ROUNDS") {
            match val.parse::<u32>() {
                Ok(rounds) => {
                    tracing::info!("Environment override: COLONY_MAX_ROUNDS={}", rounds);
                    self.spec.scheduler.max_rounds = rounds;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for COLONY_MAX_ROUNDS: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("COLONY_PUBLIC_CHAT") {
            match parse_flag(&val) {
                Some(flag) => {
                    tracing::info!("Environment override: COLONY_PUBLIC_CHAT={}", flag);
                    self.spec.environment.public_chat = flag;
                }
                None => {
                    tracing::warn!(
                        "Invalid value for COLONY_PUBLIC_CHAT: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let environment = &self.spec.environment;
        if environment.coordinator.is_empty() {
            anyhow::bail!("spec.environment.coordinator cannot be empty");
        }
        if environment.event_capacity == 0 {
            anyhow::bail!("spec.environment.event_capacity must be greater than zero");
        }

        if self.spec.scheduler.max_rounds == 0 {
            anyhow::bail!("spec.scheduler.max_rounds must be greater than zero");
        }

        let team = &self.spec.team;
        let mut names = HashSet::new();
        for agent in &team.agents {
            if agent.name.is_empty() {
                anyhow::bail!("Team agent name cannot be empty");
            }
            if !names.insert(agent.name.as_str()) {
                anyhow::bail!("Duplicate team agent name: {}", agent.name);
            }
            if let Some(addresses) = &agent.addresses {
                if addresses.iter().any(|address| address.is_empty()) {
                    anyhow::bail!("Empty address in subscriptions of agent: {}", agent.name);
                }
            }
        }

        if !team.agents.is_empty() && !names.contains(environment.coordinator.as_str()) {
            anyhow::bail!(
                "Coordinator '{}' not found in spec.team.agents",
                environment.coordinator
            );
        }

        if let Some(plan) = &team.plan {
            if plan.goal.is_empty() {
                anyhow::bail!("spec.team.plan.goal cannot be empty");
            }
            for task in &plan.tasks {
                if !task.assignee.is_empty() && !names.contains(task.assignee.as_str()) {
                    anyhow::bail!(
                        "Task '{}' is assigned to unknown agent '{}'",
                        task.id,
                        task.assignee
                    );
                }
            }
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
