//! Configuration schema for analyst.toml.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// Loaded once at process start and passed by value to the components
/// that need it; nothing reads it from ambient state afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    /// Model identifier passed to the runtime.
    pub model: String,

    /// Base URL of the local chat-completion runtime.
    pub runtime_url: String,

    /// Path to the SQLite database under analysis.
    pub db_path: String,

    /// Per-query execution budget in milliseconds.
    pub query_timeout_ms: u64,

    /// End-to-end budget for one model round-trip in milliseconds.
    pub model_timeout_ms: u64,

    /// Maximum rows returned to the model per query.
    pub row_cap: usize,

    /// Maximum model round-trips per question.
    pub iteration_limit: u32,

    /// Maximum tokens per model turn.
    pub max_tokens_per_turn: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            model: "mistral:7b".into(),
            runtime_url: default_runtime_url(),
            db_path: "~/.pocket-analyst/payments.db".into(),
            query_timeout_ms: 10_000,
            model_timeout_ms: 120_000,
            row_cap: 100,
            iteration_limit: 8,
            max_tokens_per_turn: 1024,
            temperature: 0.2,
            log_level: "info".into(),
        }
    }
}

/// Ollama convention: OLLAMA_HOST overrides the localhost default.
fn default_runtime_url() -> String {
    std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".into())
}

impl AnalystConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved database path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AnalystConfig::default();
        assert_eq!(cfg.model, "mistral:7b");
        assert_eq!(cfg.row_cap, 100);
        assert_eq!(cfg.iteration_limit, 8);
        assert!(cfg.query_timeout_ms < cfg.model_timeout_ms);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let cfg: AnalystConfig = toml::from_str("model = \"qwen2.5-coder\"\nrow_cap = 25\n").unwrap();
        assert_eq!(cfg.model, "qwen2.5-coder");
        assert_eq!(cfg.row_cap, 25);
        assert_eq!(cfg.iteration_limit, AnalystConfig::default().iteration_limit);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn tilde_paths_resolve_to_absolute() {
        let cfg = AnalystConfig::default();
        let resolved = cfg.resolved_db_path();
        assert!(!resolved.starts_with('~'));
        assert!(resolved.ends_with("payments.db"));
    }
}
