//! Layered configuration resolver.
//!
//! Locates built-in defaults, the global user file, the nearest project
//! file, and an explicit `--config` path, then deep-merges them in
//! precedence order with per-agent overrides folded in after each layer's
//! base sections.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;

use crate::error::ConfigError;

/// Where one configuration layer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Defaults,
    Global(PathBuf),
    Project(PathBuf),
    Explicit(PathBuf),
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "built-in defaults"),
            Self::Global(p) => write!(f, "{}", p.display()),
            Self::Project(p) => write!(f, "{}", p.display()),
            Self::Explicit(p) => write!(f, "{}", p.display()),
        }
    }
}

/// One source of configuration values, already parsed.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub origin: ConfigOrigin,
    pub content: Value,
}

impl ConfigLayer {
    /// The layer's `agents.<display-name>` override subtree, if any.
    fn agent_section(&self, agent_name: &str) -> Option<Value> {
        self.content
            .get("agents")?
            .get(agent_name)
            .cloned()
    }

    /// The layer's content with the `agents` key removed (its base sections).
    fn base_section(&self) -> Value {
        match &self.content {
            Value::Mapping(m) => {
                let mut m = m.clone();
                m.remove(Value::String("agents".to_string()));
                Value::Mapping(m)
            }
            other => other.clone(),
        }
    }
}

/// Deep-merge `overlay` into `base`. Mappings merge per-key recursively;
/// scalars and sequences are replaced wholesale by the overlay's value.
fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged = match result.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Mapping(result)
        }
        (_, overlay) => overlay.clone(),
    }
}

fn builtin_defaults() -> Value {
    serde_yaml::from_str(
        r#"
colors:
  user: "bright white"
  agent: "bright blue"
  system: "yellow"
  error: "bright red"
  success: "bright green"
  dim: "dim"
  reset: "reset"
features:
  auto_save: false
  rich_enabled: true
  show_tokens: false
  show_metadata: true
  readline_enabled: true
paths:
  save_location: "~/agent-conversations"
  log_location: ".logs"
behavior:
  max_retries: 3
  retry_delay: 2.0
  timeout: 120.0
  spinner_style: "dots"
ui:
  show_banner: true
  show_thinking_indicator: true
  show_duration: true
  show_status_bar: false
"#,
    )
    .expect("built-in defaults must parse")
}

/// Read and parse a single YAML file, returning `None` if it doesn't exist.
fn load_layer(path: &Path) -> std::io::Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    match serde_yaml::from_str(&text) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping invalid config layer");
            Ok(None)
        }
    }
}

/// Walk up to three parent directories from `start` looking for `.chatrc`.
fn find_project_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    for _ in 0..4 {
        let candidate = dir.join(".chatrc");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Discover all configuration layers in precedence order (lowest first).
///
/// `explicit_path` is the `--config` flag; if given and unreadable, this is
/// a fatal startup error. Every other layer is optional.
pub fn discover_layers(explicit_path: Option<&Path>) -> Result<Vec<ConfigLayer>, ConfigError> {
    let mut layers = vec![ConfigLayer {
        origin: ConfigOrigin::Defaults,
        content: builtin_defaults(),
    }];

    if let Some(home) = dirs::home_dir() {
        let global_path = home.join(".chatrc");
        if let Ok(Some(content)) = load_layer(&global_path) {
            layers.push(ConfigLayer {
                origin: ConfigOrigin::Global(global_path),
                content,
            });
        }
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Some(project_path) = find_project_file(&cwd) {
        if let Ok(Some(content)) = load_layer(&project_path) {
            layers.push(ConfigLayer {
                origin: ConfigOrigin::Project(project_path),
                content,
            });
        }
    }

    if let Some(explicit) = explicit_path {
        let text = std::fs::read_to_string(explicit).map_err(|source| {
            ConfigError::ExplicitUnreadable {
                path: explicit.display().to_string(),
                source,
            }
        })?;
        let content: Value = serde_yaml::from_str(&text).map_err(|e| ConfigError::InvalidYaml {
            origin: explicit.display().to_string(),
            message: e.to_string(),
        })?;
        layers.push(ConfigLayer {
            origin: ConfigOrigin::Explicit(explicit.to_path_buf()),
            content,
        });
    }

    Ok(layers)
}

/// Expand `~` and `$VAR` references in a path-like string value.
pub fn expand_path(raw: &str) -> PathBuf {
    let tilde_expanded = shellexpand::tilde(raw);
    let full_expanded = shellexpand::full(&tilde_expanded).unwrap_or(tilde_expanded);
    PathBuf::from(full_expanded.into_owned())
}

/// The deep-merged, per-agent-aware configuration view.
pub struct EffectiveConfig {
    layers: Vec<ConfigLayer>,
    /// In-memory overrides from `set()`, keyed `"agent\x1fkey"` or just `"key"`.
    overlay: HashMap<String, Value>,
}

impl EffectiveConfig {
    pub fn new(layers: Vec<ConfigLayer>) -> Self {
        Self {
            layers,
            overlay: HashMap::new(),
        }
    }

    /// Fold layer base sections and (if `agent_name` is given) their
    /// `agents.<name>` overrides, in precedence order, lowest to highest.
    fn merged_for(&self, agent_name: Option<&str>) -> Value {
        let mut merged = Value::Null;
        for layer in &self.layers {
            merged = deep_merge(&merged, &layer.base_section());
            if let Some(name) = agent_name {
                if let Some(agent_override) = layer.agent_section(name) {
                    merged = deep_merge(&merged, &agent_override);
                }
            }
        }
        merged
    }

    fn overlay_key(key: &str, agent_name: Option<&str>) -> String {
        match agent_name {
            Some(name) => format!("{name}\u{1f}{key}"),
            None => key.to_string(),
        }
    }

    /// Look up a dotted key (e.g. `"behavior.timeout"`), honoring per-agent
    /// overrides. Returns `default` only when no layer defines the key.
    pub fn get_raw(&self, dotted_key: &str, agent_name: Option<&str>) -> Option<Value> {
        let overlay_key = Self::overlay_key(dotted_key, agent_name);
        if let Some(v) = self.overlay.get(&overlay_key) {
            return Some(v.clone());
        }
        if agent_name.is_some() {
            if let Some(v) = self.overlay.get(dotted_key) {
                return Some(v.clone());
            }
        }

        let merged = self.merged_for(agent_name);
        let mut cursor = &merged;
        for part in dotted_key.split('.') {
            cursor = cursor.get(part)?;
        }
        Some(cursor.clone())
    }

    /// Update the in-memory overlay. Never persisted to disk.
    pub fn set_raw(&mut self, dotted_key: &str, value: Value, agent_name: Option<&str>) {
        let overlay_key = Self::overlay_key(dotted_key, agent_name);
        self.overlay.insert(overlay_key, value);
    }

    pub fn get_string(&self, key: &str, default: &str, agent_name: Option<&str>) -> String {
        match self.get_raw(key, agent_name) {
            Some(Value::String(s)) => s,
            Some(other) => {
                warn!(key, value = ?other, "expected string, using default");
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool, agent_name: Option<&str>) -> bool {
        match self.get_raw(key, agent_name) {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                warn!(key, value = ?other, "expected bool, using default");
                default
            }
            None => default,
        }
    }

    pub fn get_f64(&self, key: &str, default: f64, agent_name: Option<&str>) -> f64 {
        match self.get_raw(key, agent_name) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(other) => {
                warn!(key, value = ?other, "expected number, using default");
                default
            }
            None => default,
        }
    }

    pub fn get_u32(&self, key: &str, default: u32, agent_name: Option<&str>) -> u32 {
        match self.get_raw(key, agent_name) {
            Some(Value::Number(n)) => n.as_u64().map(|v| v as u32).unwrap_or(default),
            Some(other) => {
                warn!(key, value = ?other, "expected integer, using default");
                default
            }
            None => default,
        }
    }

    /// A path-valued key with `~`/`$VAR` expansion applied.
    pub fn get_path(&self, key: &str, default: &str, agent_name: Option<&str>) -> PathBuf {
        expand_path(&self.get_string(key, default, agent_name))
    }

    pub fn sections(&self, agent_name: Option<&str>) -> Sections {
        Sections {
            colors: ColorsConfig {
                user: self.get_string("colors.user", "bright white", agent_name),
                agent: self.get_string("colors.agent", "bright blue", agent_name),
                system: self.get_string("colors.system", "yellow", agent_name),
                error: self.get_string("colors.error", "bright red", agent_name),
                success: self.get_string("colors.success", "bright green", agent_name),
                dim: self.get_string("colors.dim", "dim", agent_name),
                reset: self.get_string("colors.reset", "reset", agent_name),
            },
            features: FeaturesConfig {
                auto_save: self.get_bool("features.auto_save", false, agent_name),
                rich_enabled: self.get_bool("features.rich_enabled", true, agent_name),
                show_tokens: self.get_bool("features.show_tokens", false, agent_name),
                show_metadata: self.get_bool("features.show_metadata", true, agent_name),
                readline_enabled: self.get_bool("features.readline_enabled", true, agent_name),
            },
            paths: PathsConfig {
                save_location: self.get_path(
                    "paths.save_location",
                    "~/agent-conversations",
                    agent_name,
                ),
                log_location: self.get_path("paths.log_location", ".logs", agent_name),
            },
            behavior: BehaviorConfig {
                max_retries: self.get_u32("behavior.max_retries", 3, agent_name),
                retry_delay: self.get_f64("behavior.retry_delay", 2.0, agent_name),
                timeout: self.get_f64("behavior.timeout", 120.0, agent_name),
                spinner_style: self.get_string("behavior.spinner_style", "dots", agent_name),
            },
            ui: UiConfig {
                show_banner: self.get_bool("ui.show_banner", true, agent_name),
                show_thinking_indicator: self.get_bool(
                    "ui.show_thinking_indicator",
                    true,
                    agent_name,
                ),
                show_duration: self.get_bool("ui.show_duration", true, agent_name),
                show_status_bar: self.get_bool("ui.show_status_bar", false, agent_name),
            },
        }
    }
}

/// Typed view over the recognized configuration sections (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sections {
    pub colors: ColorsConfig,
    pub features: FeaturesConfig,
    pub paths: PathsConfig,
    pub behavior: BehaviorConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorsConfig {
    pub user: String,
    pub agent: String,
    pub system: String,
    pub error: String,
    pub success: String,
    pub dim: String,
    pub reset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub auto_save: bool,
    pub rich_enabled: bool,
    pub show_tokens: bool,
    pub show_metadata: bool,
    pub readline_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub save_location: PathBuf,
    pub log_location: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub max_retries: u32,
    pub retry_delay: f64,
    pub timeout: f64,
    pub spinner_style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub show_banner: bool,
    pub show_thinking_indicator: bool,
    pub show_duration: bool,
    pub show_status_bar: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(origin: ConfigOrigin, yaml: &str) -> ConfigLayer {
        ConfigLayer {
            origin,
            content: serde_yaml::from_str(yaml).unwrap(),
        }
    }

    #[test]
    fn base_defaults_are_recognized() {
        let config = EffectiveConfig::new(vec![layer(ConfigOrigin::Defaults, "{}")]);
        assert_eq!(
            config.get_f64("behavior.timeout", 1.0, None),
            1.0,
            "empty layer falls back to the supplied default"
        );
    }

    #[test]
    fn higher_precedence_layer_wins() {
        let config = EffectiveConfig::new(vec![
            layer(ConfigOrigin::Defaults, "behavior:\n  timeout: 120"),
            layer(
                ConfigOrigin::Global(PathBuf::from("g")),
                "behavior:\n  timeout: 60",
            ),
            layer(
                ConfigOrigin::Project(PathBuf::from("p")),
                "behavior:\n  timeout: 30",
            ),
        ]);
        assert_eq!(config.get_f64("behavior.timeout", 0.0, None), 30.0);
    }

    #[test]
    fn deep_merge_preserves_sibling_keys() {
        let config = EffectiveConfig::new(vec![
            layer(
                ConfigOrigin::Defaults,
                "behavior:\n  timeout: 120\n  max_retries: 3",
            ),
            layer(
                ConfigOrigin::Project(PathBuf::from("p")),
                "behavior:\n  timeout: 5",
            ),
        ]);
        assert_eq!(config.get_f64("behavior.timeout", 0.0, None), 5.0);
        assert_eq!(config.get_u32("behavior.max_retries", 0, None), 3);
    }

    #[test]
    fn per_agent_override_applies_only_to_named_agent() {
        let config = EffectiveConfig::new(vec![
            layer(ConfigOrigin::Defaults, "behavior:\n  timeout: 120"),
            layer(
                ConfigOrigin::Project(PathBuf::from("p")),
                "agents:\n  Product Pete:\n    behavior:\n      timeout: 5",
            ),
        ]);
        assert_eq!(
            config.get_f64("behavior.timeout", 0.0, Some("Product Pete")),
            5.0
        );
        assert_eq!(
            config.get_f64("behavior.timeout", 0.0, Some("Someone Else")),
            120.0
        );
        assert_eq!(config.get_f64("behavior.timeout", 0.0, None), 120.0);
    }

    #[test]
    fn set_overlay_is_never_persisted_but_wins_lookups() {
        let mut config = EffectiveConfig::new(vec![layer(
            ConfigOrigin::Defaults,
            "behavior:\n  timeout: 120",
        )]);
        config.set_raw("behavior.timeout", Value::from(7.0), None);
        assert_eq!(config.get_f64("behavior.timeout", 0.0, None), 7.0);
    }

    #[test]
    fn type_conflict_falls_back_to_default() {
        let config = EffectiveConfig::new(vec![layer(
            ConfigOrigin::Defaults,
            "features:\n  auto_save: \"yes please\"",
        )]);
        assert!(!config.get_bool("features.auto_save", false, None));
    }

    #[test]
    fn path_expansion_handles_tilde() {
        let config = EffectiveConfig::new(vec![layer(
            ConfigOrigin::Defaults,
            "paths:\n  save_location: \"~/agent-conversations\"",
        )]);
        let path = config.get_path("paths.save_location", "~/x", None);
        assert!(!path.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn sections_round_trip_builtin_defaults() {
        let config = EffectiveConfig::new(vec![ConfigLayer {
            origin: ConfigOrigin::Defaults,
            content: builtin_defaults(),
        }]);
        let sections = config.sections(None);
        assert_eq!(sections.behavior.max_retries, 3);
        assert_eq!(sections.behavior.spinner_style, "dots");
        assert!(!sections.ui.show_status_bar);
    }
}
