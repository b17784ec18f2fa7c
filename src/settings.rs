//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        // The embedded default is checked by build.rs and custom TOML is
        // parsed once in init_custom, so this cannot fail.
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub open: OpenSettings,
    pub completion: CompletionSettings,
    pub build: BuildSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSettings {
    pub verify_checksum: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSettings {
    pub max_results: usize,
    pub fuzzy_max_edits: u32,
    pub fuzzy_exact_prefix: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    pub dedup_values: bool,
}

/// Upper bound on the fuzzy edit budget. The anchor search fans out
/// exponentially in the number of edits.
pub const MAX_FUZZY_EDITS: u32 = 4;

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_positive_usize!(completion.max_results);

    if s.completion.fuzzy_max_edits > MAX_FUZZY_EDITS {
        return Err(SettingsError::InvalidValue {
            field: "completion.fuzzy_max_edits".to_string(),
            reason: format!("must be at most {MAX_FUZZY_EDITS}"),
        });
    }

    Ok(())
}
