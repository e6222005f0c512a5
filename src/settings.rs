//! # Startup configuration: environment settings and the rig file.
//!
//! Two inputs are read before any worker starts:
//!
//! - [`Settings`]: connection details for the relay target, read from the
//!   environment. `API_URL` and `API_KEY` are required; the rest is optional.
//!   Every present value is exported into each worker's environment, so worker
//!   scripts read the same variables the supervisor validated.
//! - [`RigFile`]: a JSON document listing the workers and teardown commands.
//!
//! ```json
//! {
//!   "grace_ms": 5000,
//!   "workers": [
//!     { "name": "sensor", "program": "node", "args": ["scripts/sensor.js"], "delay_ms": 1000, "start_delay_ms": 300, "exit_notice": true },
//!     { "name": "gps", "program": "node", "args": ["scripts/gps.js"], "start_delay_ms": 600,
//!       "on_exit": { "program": "mmcli", "args": ["-m", "any", "--command=AT+QGPSEND"] } },
//!     { "name": "webrtc", "program": "node", "args": ["scripts/webrtc.js", "restart"], "restart": "never", "start_delay_ms": 900 }
//!   ],
//!   "teardown": [ { "program": "node", "args": ["scripts/webrtc.js", "stop"] } ]
//! }
//! ```
//!
//! Any error here is fatal: the binary exits with status 1.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{
    core::SupervisorConfig,
    error::ConfigError,
    policies::RestartPolicy,
    workers::{CommandHook, HookRef, WorkerCommand, WorkerSpec},
};

/// Connection settings read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// `API_URL`: relay endpoint (required).
    pub api_url: String,
    /// `API_KEY`: relay auth key (required).
    pub api_key: String,
    /// `API_SECRET`: relay auth secret.
    pub api_secret: Option<String>,
    /// `API_ROOM`: room the rig publishes into.
    pub api_room: Option<String>,
    /// `LIVEKIT_TLS`: whether the streaming endpoint uses TLS.
    pub livekit_tls: bool,
    /// `LIVEKIT_DOMAIN`: streaming endpoint domain.
    pub livekit_domain: Option<String>,
    /// `LOG_LEVEL`: default log filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let livekit_tls = match get("LIVEKIT_TLS") {
            None => false,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                key: "LIVEKIT_TLS",
                value: v,
            })?,
        };

        Ok(Self {
            api_url: require("API_URL")?,
            api_key: require("API_KEY")?,
            api_secret: get("API_SECRET"),
            api_room: get("API_ROOM"),
            livekit_tls,
            livekit_domain: get("LIVEKIT_DOMAIN"),
            log_level: get("LOG_LEVEL"),
        })
    }

    /// Variables exported into every worker's environment.
    pub fn worker_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("API_URL".to_string(), self.api_url.clone()),
            ("API_KEY".to_string(), self.api_key.clone()),
            ("LIVEKIT_TLS".to_string(), self.livekit_tls.to_string()),
        ];
        let optional = [
            ("API_SECRET", &self.api_secret),
            ("API_ROOM", &self.api_room),
            ("LIVEKIT_DOMAIN", &self.livekit_domain),
            ("LOG_LEVEL", &self.log_level),
        ];
        env.extend(
            optional
                .into_iter()
                .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone()))),
        );
        env
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// An external command in the rig file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandEntry {
    /// Program to execute.
    pub program: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandEntry {
    fn to_command(&self, env: &[(String, String)], cwd: Option<&Path>) -> WorkerCommand {
        let cmd = WorkerCommand::new(self.program.as_str())
            .args(self.args.iter().cloned())
            .envs(env.iter().cloned());
        match cwd {
            Some(dir) => cmd.current_dir(dir),
            None => cmd,
        }
    }
}

/// One worker in the rig file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WorkerEntry {
    /// Unique worker name.
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Restart policy (`never`, `on_failure`, `always`); defaults to the supervisor's.
    #[serde(default)]
    pub restart: Option<RestartPolicy>,
    /// Fixed relaunch delay; defaults to the supervisor's backoff.
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// Delay before the first launch.
    #[serde(default)]
    pub start_delay_ms: Option<u64>,
    /// Deliver a `null` message after each exit.
    #[serde(default)]
    pub exit_notice: bool,
    /// Command run after each exit.
    #[serde(default)]
    pub on_exit: Option<CommandEntry>,
}

/// The rig description.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RigFile {
    /// Overrides `SupervisorConfig::grace`.
    #[serde(default)]
    pub grace_ms: Option<u64>,
    /// Overrides `SupervisorConfig::spawn_failure_limit`.
    #[serde(default)]
    pub spawn_failure_limit: Option<u32>,
    /// Workers, started in file order.
    pub workers: Vec<WorkerEntry>,
    /// Commands run in order after every worker stopped.
    #[serde(default)]
    pub teardown: Vec<CommandEntry>,
}

impl RigFile {
    /// Reads and validates a rig file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses and validates a rig description.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let rig: RigFile = serde_json::from_str(raw)?;
        let mut seen = HashSet::new();
        for w in &rig.workers {
            if !seen.insert(w.name.as_str()) {
                return Err(ConfigError::DuplicateWorker(w.name.clone()));
            }
        }
        Ok(rig)
    }

    /// Applies the file's supervisor overrides to `cfg`.
    pub fn apply(&self, cfg: &mut SupervisorConfig) {
        if let Some(ms) = self.grace_ms {
            cfg.grace = Duration::from_millis(ms);
        }
        if let Some(limit) = self.spawn_failure_limit {
            cfg.spawn_failure_limit = limit;
        }
    }

    /// Builds worker specs; `env` is added to every worker and exit hook.
    pub fn worker_specs(&self, cfg: &SupervisorConfig, env: &[(String, String)]) -> Vec<WorkerSpec> {
        self.workers
            .iter()
            .map(|w| {
                let cwd = w.cwd.as_deref();
                let command = CommandEntry {
                    program: w.program.clone(),
                    args: w.args.clone(),
                }
                .to_command(env, cwd);

                let mut spec = WorkerSpec::with_defaults(w.name.as_str(), command, cfg)
                    .with_exit_notice(w.exit_notice);
                if let Some(restart) = w.restart {
                    spec = spec.with_restart(restart);
                }
                if let Some(ms) = w.delay_ms {
                    spec = spec.with_delay(Duration::from_millis(ms));
                }
                if let Some(ms) = w.start_delay_ms {
                    spec = spec.with_start_delay(Duration::from_millis(ms));
                }
                if let Some(hook) = &w.on_exit {
                    let name = format!("{}-on-exit", w.name);
                    spec = spec.with_exit_hook(CommandHook::arc(name, hook.to_command(env, cwd)));
                }
                spec
            })
            .collect()
    }

    /// Builds teardown hooks in file order.
    pub fn teardown_hooks(&self, env: &[(String, String)]) -> Vec<HookRef> {
        self.teardown
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let hook: HookRef = CommandHook::arc(format!("teardown-{i}"), entry.to_command(env, None));
                hook
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn required_values_must_be_present() {
        let err = Settings::from_lookup(lookup(&[("API_KEY", "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_URL")));

        let err = Settings::from_lookup(lookup(&[("API_URL", "wss://relay"), ("API_KEY", " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));
    }

    #[test]
    fn optional_values_and_env_export() {
        let s = Settings::from_lookup(lookup(&[
            ("API_URL", "wss://relay"),
            ("API_KEY", "k"),
            ("API_ROOM", "car-7"),
            ("LIVEKIT_TLS", "TRUE"),
        ]))
        .unwrap();
        assert!(s.livekit_tls);
        assert_eq!(s.api_secret, None);

        let env = s.worker_env();
        assert_eq!(
            env,
            vec![
                ("API_URL".to_string(), "wss://relay".to_string()),
                ("API_KEY".to_string(), "k".to_string()),
                ("LIVEKIT_TLS".to_string(), "true".to_string()),
                ("API_ROOM".to_string(), "car-7".to_string()),
            ]
        );
    }

    #[test]
    fn bad_tls_flag_is_invalid() {
        let err = Settings::from_lookup(lookup(&[
            ("API_URL", "wss://relay"),
            ("API_KEY", "k"),
            ("LIVEKIT_TLS", "maybe"),
        ]))
        .unwrap_err();
        assert_eq!(err.as_label(), "config_invalid");
    }

    const RIG: &str = r#"{
        "grace_ms": 3000,
        "workers": [
            { "name": "sensor", "program": "node", "args": ["scripts/sensor.js"], "delay_ms": 1000, "exit_notice": true },
            { "name": "gps", "program": "node", "args": ["scripts/gps.js"], "start_delay_ms": 600,
              "on_exit": { "program": "mmcli", "args": ["--command=AT+QGPSEND"] } },
            { "name": "webrtc", "program": "node", "args": ["scripts/webrtc.js", "restart"], "restart": "never" }
        ],
        "teardown": [ { "program": "node", "args": ["scripts/webrtc.js", "stop"] } ]
    }"#;

    #[test]
    fn rig_file_builds_specs() {
        let rig = RigFile::parse(RIG).unwrap();
        let mut cfg = SupervisorConfig::default();
        rig.apply(&mut cfg);
        assert_eq!(cfg.grace, Duration::from_secs(3));

        let specs = rig.worker_specs(&cfg, &[("API_URL".into(), "x".into())]);
        let names: Vec<&str> = specs.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["sensor", "gps", "webrtc"]);

        assert_eq!(specs[0].backoff().next(0), Duration::from_millis(1000));
        assert!(specs[0].exit_notice());
        assert_eq!(specs[1].start_delay(), Some(Duration::from_millis(600)));
        assert_eq!(specs[1].exit_hook().map(|h| h.name().to_string()), Some("gps-on-exit".to_string()));
        assert_eq!(specs[2].restart(), RestartPolicy::Never);
        assert_eq!(specs[2].command().display(), "node scripts/webrtc.js restart");

        let hooks = rig.teardown_hooks(&[]);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].name(), "teardown-0");
    }

    #[test]
    fn duplicate_worker_names_are_rejected() {
        let raw = r#"{ "workers": [ { "name": "gps", "program": "a" }, { "name": "gps", "program": "b" } ] }"#;
        assert!(matches!(RigFile::parse(raw), Err(ConfigError::DuplicateWorker(n)) if n == "gps"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{ "workers": [ { "name": "gps", "program": "a", "restart_ms": 5 } ] }"#;
        assert!(matches!(RigFile::parse(raw), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn demo_rig_parses() {
        let rig = RigFile::parse(include_str!("../demos/rig.json")).unwrap();
        let mut cfg = SupervisorConfig::default();
        rig.apply(&mut cfg);
        assert_eq!(cfg.spawn_failure_limit, 5);

        let specs = rig.worker_specs(&cfg, &[]);
        assert_eq!(specs.len(), 4);
        assert!(specs[1].exit_hook().is_some());
        assert_eq!(specs[3].restart(), RestartPolicy::Never);
    }
}
