//! Declarative router configuration
//!
//! Configuration file: ~/.config/glass/glass.yaml
//!
//! ```yaml
//! settings:
//!   debug: false
//! routers:
//!   - name: localhost
//!     backend: { type: local }
//!     commands:
//!       - type: text
//!         template: "ping -c %s %s"
//!         parameters:
//!           - { type: select, name: count, options: [["1"], ["3"], ["5"]], default: "3" }
//!           - { type: text, name: host, pattern: '[\w.:][\w.:-]*$' }
//!       - type: any
//! ```

use crate::backend::{LocalBackend, RemoteBackend, RemoteHost};
use crate::command::{AnyCommand, Command, Decoration, OptionProbe, TextCommand};
use crate::log::CommandLog;
use crate::parameter::{Parameter, DEFAULT_PARAMETER_NAME};
use crate::router::{Router, RouterSettings};
use anyhow::{Context, Result};
use glass_core::Settings;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Whole configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlassConfig {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub routers: Vec<RouterConfig>,
}

/// One router declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub name: String,

    /// Execution backend; a router without one can only be listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,

    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Local {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shell: Option<String>,
    },
    Remote(RemoteHost),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommandConfig {
    Text {
        template: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        parameters: Vec<ParameterConfig>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        probes: Vec<ProbeConfig>,
        #[serde(default)]
        decoration: DecorationConfig,
    },
    Any {
        #[serde(default)]
        prefix: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterConfig {
    Text {
        #[serde(default = "default_parameter_name")]
        name: String,
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Select {
        #[serde(default = "default_parameter_name")]
        name: String,
        /// `[value, display]` tuples, display optional
        options: Vec<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Catchall {
        #[serde(default = "default_parameter_name")]
        name: String,
    },
}

fn default_parameter_name() -> String {
    DEFAULT_PARAMETER_NAME.to_string()
}

/// Live options for a selection slot, see [`OptionProbe`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub slot: usize,
    pub command: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum DecorationConfig {
    #[default]
    Pre,
    Columns {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        highlight: Option<String>,
    },
}

impl GlassConfig {
    /// Load configuration from a specific path; a missing file is empty
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Self = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Build every declared router. Any broken declaration aborts the build.
    pub fn build_routers(&self) -> Result<Vec<Router>> {
        self.routers
            .iter()
            .map(|r| r.build(&self.settings))
            .collect()
    }

    /// Starter configuration written by `glass init`
    pub fn sample() -> Self {
        let host_pattern = r"[\w.:][\w.:-]*$".to_string();

        let local = RouterConfig {
            name: "localhost".to_string(),
            backend: Some(BackendConfig::Local { shell: None }),
            commands: vec![
                CommandConfig::Text {
                    template: "ping -c %s %s".to_string(),
                    name: None,
                    parameters: vec![
                        ParameterConfig::Select {
                            name: "count".to_string(),
                            options: vec![vec!["1".to_string()], vec!["3".to_string()], vec!["5".to_string()]],
                            default: Some("3".to_string()),
                        },
                        ParameterConfig::Text {
                            name: "host".to_string(),
                            pattern: host_pattern.clone(),
                            default: None,
                        },
                    ],
                    probes: Vec::new(),
                    decoration: DecorationConfig::Pre,
                },
                CommandConfig::Text {
                    template: "traceroute -%s %s".to_string(),
                    name: None,
                    parameters: vec![
                        ParameterConfig::Select {
                            name: "ipver".to_string(),
                            options: vec![
                                vec!["4".to_string(), "IPv4".to_string()],
                                vec!["6".to_string(), "IPv6".to_string()],
                            ],
                            default: Some("4".to_string()),
                        },
                        ParameterConfig::Text {
                            name: "host".to_string(),
                            pattern: host_pattern,
                            default: None,
                        },
                    ],
                    probes: Vec::new(),
                    decoration: DecorationConfig::Pre,
                },
                CommandConfig::Text {
                    template: "uptime".to_string(),
                    name: None,
                    parameters: Vec::new(),
                    probes: Vec::new(),
                    decoration: DecorationConfig::Pre,
                },
            ],
        };

        let bird = RouterConfig {
            name: "bird".to_string(),
            backend: Some(BackendConfig::Remote(RemoteHost::new("192.0.2.1", "lg"))),
            commands: vec![
                CommandConfig::Text {
                    template: "birdc show protocols".to_string(),
                    name: Some("Protocol summary".to_string()),
                    parameters: Vec::new(),
                    probes: Vec::new(),
                    decoration: DecorationConfig::Columns {
                        highlight: Some(r"\b(down|start)\b".to_string()),
                    },
                },
                CommandConfig::Text {
                    template: "birdc show protocols all %s".to_string(),
                    name: None,
                    parameters: vec![ParameterConfig::Select {
                        name: "peer".to_string(),
                        options: vec![vec!["bgp1".to_string()]],
                        default: None,
                    }],
                    probes: vec![ProbeConfig {
                        slot: 0,
                        command: "birdc show protocols".to_string(),
                        pattern: r"^(\S+)\s+BGP\s".to_string(),
                    }],
                    decoration: DecorationConfig::Pre,
                },
                CommandConfig::Any {
                    prefix: "birdc".to_string(),
                    name: None,
                },
            ],
        };

        Self {
            settings: Settings::default(),
            routers: vec![local, bird],
        }
    }
}

impl RouterConfig {
    pub fn build(&self, settings: &Settings) -> Result<Router> {
        let mut router = Router::new(&self.name)
            .with_settings(RouterSettings::from(settings))
            .with_log(CommandLog::new(&settings.log_file));

        router = match &self.backend {
            Some(BackendConfig::Local { shell: Some(shell) }) => {
                router.with_backend(LocalBackend::new().with_shell(shell))
            }
            Some(BackendConfig::Local { shell: None }) => router.with_backend(LocalBackend::new()),
            Some(BackendConfig::Remote(host)) => router.with_backend(RemoteBackend::new(host.clone())),
            None => router,
        };

        for (idx, command) in self.commands.iter().enumerate() {
            let command = command
                .build()
                .with_context(|| format!("Invalid command {} of router {}", idx, self.name))?;
            router.add_command(command);
        }

        Ok(router)
    }
}

impl CommandConfig {
    pub fn build(&self) -> Result<Arc<dyn Command>> {
        match self {
            Self::Text {
                template,
                name,
                parameters,
                probes,
                decoration,
            } => {
                let params = parameters
                    .iter()
                    .map(ParameterConfig::build)
                    .collect::<Result<Vec<_>>>()?;

                let mut command = TextCommand::new(template, params)?
                    .with_decoration(decoration.build()?);
                if let Some(name) = name {
                    command = command.with_name(name);
                }
                for probe in probes {
                    command = command.with_probe(OptionProbe::new(probe.slot, &probe.command, &probe.pattern)?)?;
                }

                Ok(Arc::new(command))
            }
            Self::Any { prefix, name } => {
                let mut command = AnyCommand::new().with_prefix(prefix);
                if let Some(name) = name {
                    command = command.with_name(name);
                }
                Ok(Arc::new(command))
            }
        }
    }
}

impl ParameterConfig {
    pub fn build(&self) -> Result<Parameter> {
        let (parameter, default) = match self {
            Self::Text {
                name,
                pattern,
                default,
            } => (Parameter::text(pattern, name)?, default),
            Self::Select {
                name,
                options,
                default,
            } => (Parameter::selection(options.as_slice(), name)?, default),
            Self::Catchall { name } => (Parameter::catchall(name), &None),
        };

        Ok(match default {
            Some(default) => parameter.with_default(default),
            None => parameter,
        })
    }
}

impl DecorationConfig {
    pub fn build(&self) -> Result<Decoration> {
        match self {
            Self::Pre => Ok(Decoration::Preformatted),
            Self::Columns { highlight } => {
                let highlight = highlight
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .context("Invalid highlight pattern")?;
                Ok(Decoration::Columns { highlight })
            }
        }
    }
}
