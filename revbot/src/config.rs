//! Configuration for revbot.
//!
//! Loaded from `$XDG_CONFIG_HOME/revbot/config.toml` (falling back to
//! `~/.config/revbot/config.toml`). Config errors are soft failures: a
//! missing or unparseable file yields the defaults, with a warning on the
//! parse path. Every reviewable constant — byte budget, inline cap, marker
//! string, priority table — can be overridden here; budget and cap can be
//! overridden again per run from the CLI.

use serde::Deserialize;

use revbot_core::locate::DEFAULT_INLINE_CAP;
use revbot_core::select::PriorityRule;

/// Top-level config file shape.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub review: ReviewConfig,
    /// Ordered priority table; first matching rule wins, so entry order in
    /// the file is significant.
    pub priority: Option<Vec<PriorityRuleConfig>>,
}

/// Review-pipeline constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewConfig {
    /// Byte budget for the aggregate change-set diff sent to the model.
    pub budget_bytes: usize,
    /// Capacity limit of the inline annotation interface.
    pub max_inline: usize,
    /// Marker embedded in every annotation body this system posts; the
    /// reconciler only ever touches bodies containing it.
    pub marker: String,
    /// Model identifier passed to the inference backend.
    pub model: String,
    /// Base URL of the inference backend's messages API.
    pub api_base: String,
    /// Max tokens requested from the model.
    pub max_tokens: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 100_000,
            max_inline: DEFAULT_INLINE_CAP,
            marker: "<!-- revbot:finding -->".to_owned(),
            model: "claude-sonnet-4-5".to_owned(),
            api_base: "https://api.anthropic.com".to_owned(),
            max_tokens: 4096,
        }
    }
}

/// One priority rule as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PriorityRuleConfig {
    pub pattern: String,
    pub weight: u32,
}

/// Default priority table used when the config file defines none.
///
/// Source and library code first, then generic code files, then anything
/// with an extension. Unmatched names fall to the selector's default weight.
const DEFAULT_PRIORITY: &[(&str, u32)] = &[
    (r"^src/", 1),
    (r"^crates/", 2),
    (r"^lib/", 3),
    (r"^app/", 4),
    (r"\.(rs|ts|tsx|js|jsx|py|go)$", 6),
    (r"\.", 9),
];

/// Returns the path to the revbot config file.
///
/// Prefers `$XDG_CONFIG_HOME/revbot/config.toml`; falls back to
/// `~/.config/revbot/config.toml` when the env var is absent.
pub fn config_path() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| std::path::PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| std::path::PathBuf::from(".config"));
    base.join("revbot").join("config.toml")
}

impl Config {
    /// Loads the config from `path`, or from [`config_path`] when `None`.
    ///
    /// Never panics and never fails the run: a missing file yields the
    /// defaults silently; a present-but-invalid file yields the defaults
    /// with a warning.
    pub fn load(path: Option<&std::path::Path>) -> Config {
        let path = path.map(std::path::Path::to_path_buf).unwrap_or_else(config_path);
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(_) => return Config::default(),
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config parse error, using defaults");
                Config::default()
            }
        }
    }

    /// Compiles the priority table into regex rules, preserving order.
    ///
    /// Rules with invalid patterns are skipped with a warning rather than
    /// failing the run — the remaining table still orders the change set.
    pub fn priority_rules(&self) -> Vec<PriorityRule> {
        match &self.priority {
            Some(entries) => entries
                .iter()
                .filter_map(|entry| match regex::Regex::new(&entry.pattern) {
                    Ok(pattern) => Some(PriorityRule {
                        pattern,
                        weight: entry.weight,
                    }),
                    Err(e) => {
                        tracing::warn!(pattern = %entry.pattern, error = %e, "skipping invalid priority pattern");
                        None
                    }
                })
                .collect(),
            None => DEFAULT_PRIORITY
                .iter()
                .filter_map(|(pattern, weight)| {
                    regex::Regex::new(pattern).ok().map(|pattern| PriorityRule {
                        pattern,
                        weight: *weight,
                    })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_toml_is_invalid() {
        let config: Result<Config, _> = toml::from_str("review = 3");
        assert!(config.is_err());
        let fallback = Config::default();
        assert_eq!(fallback.review.budget_bytes, 100_000);
        assert_eq!(fallback.review.max_inline, DEFAULT_INLINE_CAP);
    }

    #[test]
    fn config_file_overrides_constants() {
        let config: Config = toml::from_str(
            r#"
            [review]
            budget_bytes = 5000
            marker = "<!-- custom -->"

            [[priority]]
            pattern = "^api/"
            weight = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.review.budget_bytes, 5000);
        assert_eq!(config.review.marker, "<!-- custom -->");
        // Unset fields keep their defaults.
        assert_eq!(config.review.max_inline, DEFAULT_INLINE_CAP);

        let rules = config.priority_rules();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].pattern.is_match("api/users.rs"));
    }

    #[test]
    fn default_priority_table_compiles_in_order() {
        let rules = Config::default().priority_rules();
        assert_eq!(rules.len(), DEFAULT_PRIORITY.len());
        assert!(rules[0].pattern.is_match("src/main.rs"));
        assert!(rules.windows(2).all(|w| w[0].weight <= w[1].weight));
    }
}
