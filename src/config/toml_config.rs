use crate::adapters::chat_generator::ChatCompletionGenerator;
use crate::core::parser::{AgreementParser, DEFAULT_UNITS};
use crate::core::planner::PlanningEngine;
use crate::core::selector::SelectionPolicy;
use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::{self, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub planner: PlanningSection,
    pub generator: Option<GeneratorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningSection {
    #[serde(default = "default_target_units")]
    pub target_units: Decimal,
    pub term_label: Option<String>,
    #[serde(default = "default_max_courses_hint")]
    pub max_courses_hint: usize,
    #[serde(default = "default_repeat_unlock_after")]
    pub repeat_unlock_after: usize,
    #[serde(default = "default_fallback_gap")]
    pub fallback_gap: Decimal,
    #[serde(default = "default_units")]
    pub default_units: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub enabled: bool,
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_target_units() -> Decimal {
    Decimal::from(15)
}

fn default_max_courses_hint() -> usize {
    5
}

fn default_repeat_unlock_after() -> usize {
    4
}

fn default_fallback_gap() -> Decimal {
    Decimal::from(2)
}

fn default_units() -> Decimal {
    DEFAULT_UNITS
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for PlanningSection {
    fn default() -> Self {
        Self {
            target_units: default_target_units(),
            term_label: None,
            max_courses_hint: default_max_courses_hint(),
            repeat_unlock_after: default_repeat_unlock_after(),
            fallback_gap: default_fallback_gap(),
            default_units: default_units(),
        }
    }
}

impl PlannerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        let mut config: PlannerConfig =
            toml::from_str(&processed).map_err(|e| PlannerError::ConfigError {
                message: format!("TOML parsing error: {}", e),
            })?;

        // 未設定的環境變數會原樣保留，視同沒有金鑰
        if let Some(generator) = config.generator.as_mut() {
            if generator
                .api_key
                .as_deref()
                .is_some_and(|k| ENV_VAR.is_match(k))
            {
                tracing::warn!("⚠️ generator.api_key refers to an unset environment variable");
                generator.api_key = None;
            }
        }

        Ok(config)
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            max_courses_hint: self.planner.max_courses_hint,
            repeat_unlock_after: self.planner.repeat_unlock_after,
            fallback_gap: self.planner.fallback_gap,
        }
    }

    pub fn generator_enabled(&self) -> bool {
        self.generator.as_ref().is_some_and(|g| g.enabled)
    }

    pub fn disable_generator(&mut self) {
        if let Some(generator) = self.generator.as_mut() {
            generator.enabled = false;
        }
    }

    /// Builds the engine, attaching the chat generator when it is enabled.
    pub fn build_engine(&self) -> Result<PlanningEngine> {
        let engine = PlanningEngine::new(
            AgreementParser::new(self.planner.default_units),
            self.selection_policy(),
        );

        match self.generator.as_ref().filter(|g| g.enabled) {
            Some(generator) => {
                tracing::info!(
                    "🤖 Schedule generator enabled: {} ({})",
                    generator.model,
                    generator.endpoint
                );
                let chat = ChatCompletionGenerator::new(generator)?;
                Ok(engine.with_generator(
                    Arc::new(chat),
                    Duration::from_secs(generator.timeout_seconds),
                ))
            }
            None => Ok(engine),
        }
    }
}

impl Validate for PlanningSection {
    fn validate(&self) -> Result<()> {
        validation::validate_range(
            "planner.target_units",
            self.target_units,
            Decimal::ONE,
            Decimal::from(40),
        )?;
        validation::validate_positive_number("planner.max_courses_hint", self.max_courses_hint, 1)?;
        validation::validate_range(
            "planner.fallback_gap",
            self.fallback_gap,
            Decimal::ZERO,
            self.target_units,
        )?;
        validation::validate_range(
            "planner.default_units",
            self.default_units,
            Decimal::new(5, 1),
            Decimal::from(10),
        )?;
        if let Some(label) = &self.term_label {
            validation::validate_non_empty_string("planner.term_label", label)?;
        }
        Ok(())
    }
}

impl Validate for GeneratorConfig {
    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        validation::validate_url("generator.endpoint", &self.endpoint)?;
        validation::validate_non_empty_string("generator.model", &self.model)?;
        validation::validate_positive_number(
            "generator.timeout_seconds",
            self.timeout_seconds as usize,
            1,
        )?;
        validation::validate_range("generator.temperature", self.temperature, 0.0, 2.0)?;
        validation::validate_positive_number("generator.max_tokens", self.max_tokens as usize, 1)?;
        Ok(())
    }
}

impl Validate for PlannerConfig {
    fn validate(&self) -> Result<()> {
        self.planner.validate()?;
        if let Some(generator) = &self.generator {
            generator.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_when_sections_are_missing() {
        let config = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(config.planner, PlanningSection::default());
        assert_eq!(config.selection_policy(), SelectionPolicy::default());
        assert!(!config.generator_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_planner_and_generator_sections() {
        let toml_content = r#"
[planner]
target_units = 12.5
term_label = "Spring 2026"
repeat_unlock_after = 3

[generator]
enabled = true
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o"
timeout_seconds = 10
"#;
        let config = PlannerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.planner.target_units, "12.5".parse::<Decimal>().unwrap());
        assert_eq!(config.planner.term_label.as_deref(), Some("Spring 2026"));
        assert_eq!(config.selection_policy().repeat_unlock_after, 3);

        let generator = config.generator.as_ref().unwrap();
        assert_eq!(generator.model, "gpt-4o");
        assert_eq!(generator.max_tokens, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TRANSFER_PLANNER_TEST_KEY", "sk-test");
        let toml_content = r#"
[generator]
endpoint = "https://example.com/v1/chat/completions"
api_key = "${TRANSFER_PLANNER_TEST_KEY}"
"#;
        let config = PlannerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.generator.unwrap().api_key.as_deref(),
            Some("sk-test")
        );
        std::env::remove_var("TRANSFER_PLANNER_TEST_KEY");
    }

    #[test]
    fn test_unset_env_var_clears_api_key() {
        let toml_content = r#"
[generator]
endpoint = "https://example.com/v1/chat/completions"
api_key = "${TRANSFER_PLANNER_SURELY_UNSET_VAR}"
"#;
        let config = PlannerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.generator.unwrap().api_key, None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = PlannerConfig::from_toml_str("[planner]\ntarget_units = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = PlannerConfig::from_toml_str(
            "[generator]\nenabled = true\nendpoint = \"not-a-url\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(PlannerError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_disabled_generator_is_not_validated() {
        let mut config = PlannerConfig::from_toml_str(
            "[generator]\nenabled = true\nendpoint = \"not-a-url\"\n",
        )
        .unwrap();
        config.disable_generator();
        assert!(config.validate().is_ok());
        assert!(!config.build_engine().unwrap().has_generator());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[planner]\nmax_courses_hint = 6\n")
            .unwrap();
        let config = PlannerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.planner.max_courses_hint, 6);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = PlannerConfig::from_toml_str("[planner\n").unwrap_err();
        assert!(matches!(err, PlannerError::ConfigError { .. }));
    }
}
