//! Configuration for the Telegram API, report defaults and chat aliases
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::threads::DEFAULT_TIMEZONE;

/// Default constants (fallback if config.yml not found)
pub const SESSION_NAME: &str = "telegram_session";
pub const LOCK_FILE: &str = "telegram_session.lock";
pub const DEFAULT_DAYS: i64 = 7;
pub const DEFAULT_OUTPUT: &str = "result.json";

/// Chat entity types that can be aliased in config.yml
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEntity {
    /// Supergroup/channel by ID
    Channel(i64),
    /// Basic group by ID
    Chat(i64),
    /// Public group by username (without @)
    Username(String),
}

impl ChatEntity {
    pub fn channel(id: i64) -> Self {
        ChatEntity::Channel(id)
    }

    pub fn chat(id: i64) -> Self {
        ChatEntity::Chat(id)
    }

    pub fn username(name: &str) -> Self {
        let name = name.strip_prefix('@').unwrap_or(name);
        ChatEntity::Username(name.to_string())
    }
}

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    report: Option<ReportConfig>,
    chats: Option<HashMap<String, ChatConfig>>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    api_id: Option<String>,
    api_hash: Option<String>,
    session_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportConfig {
    default_group: Option<String>,
    timezone: Option<String>,
    days: Option<i64>,
    output: Option<String>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ChatConfig {
    #[serde(rename = "type")]
    chat_type: String,
    id: Option<i64>,
    username: Option<String>,
}

impl ChatConfig {
    fn into_entity(self) -> Option<ChatEntity> {
        match self.chat_type.as_str() {
            "channel" | "supergroup" => self.id.map(ChatEntity::Channel),
            "group" => self.id.map(ChatEntity::Chat),
            "username" => self.username.as_deref().map(ChatEntity::username),
            _ => None,
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub session_name: String,
    pub lock_file: String,
    /// Group used when none is given on the command line
    pub default_group: Option<String>,
    /// Display label written into the report
    pub timezone: String,
    /// Look-back window in days
    pub days: i64,
    pub output: String,
    pub chats: HashMap<String, ChatEntity>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml string values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Expand a `${VAR}` placeholder from the environment
    fn placeholder_value(value: &str) -> Option<String> {
        let var_name = value.strip_prefix("${")?.strip_suffix('}')?;
        std::env::var(var_name).ok()
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        if let Some(env_val) = value.as_deref().and_then(Self::placeholder_value) {
            return env_val;
        }
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Resolve an integer value from string config or env var
    fn resolve_env_i32(value: Option<String>, env_key: &str) -> i32 {
        if let Some(ref v) = value {
            if let Some(parsed) = Self::placeholder_value(v).and_then(|s| s.parse().ok()) {
                return parsed;
            }
            if let Ok(parsed) = v.parse::<i32>() {
                return parsed;
            }
        }
        std::env::var(env_key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        let telegram = yaml.telegram.unwrap_or_default();
        let report = yaml.report.unwrap_or_default();

        let chats = yaml
            .chats
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, chat)| chat.into_entity().map(|entity| (name, entity)))
            .collect();

        Ok(Self {
            api_id: Self::resolve_env_i32(telegram.api_id, "TELEGRAM_API_ID"),
            api_hash: Self::resolve_env_string(telegram.api_hash, "TELEGRAM_API_HASH"),
            session_name: telegram
                .session_name
                .unwrap_or_else(|| SESSION_NAME.to_string()),
            lock_file: LOCK_FILE.to_string(),
            default_group: report.default_group.filter(|g| !g.trim().is_empty()),
            timezone: report
                .timezone
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            days: report.days.filter(|d| *d > 0).unwrap_or(DEFAULT_DAYS),
            output: report.output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            chats,
        })
    }

    /// Create config with empty defaults (fallback)
    /// User MUST provide config.yml or env vars with actual credentials
    pub fn defaults() -> Self {
        Self {
            api_id: Self::resolve_env_i32(None, "TELEGRAM_API_ID"),
            api_hash: Self::resolve_env_string(None, "TELEGRAM_API_HASH"),
            session_name: SESSION_NAME.to_string(),
            lock_file: LOCK_FILE.to_string(),
            default_group: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            days: DEFAULT_DAYS,
            output: DEFAULT_OUTPUT.to_string(),
            chats: HashMap::new(),
        }
    }

    /// Session file path for the configured session name
    pub fn session_file(&self) -> String {
        format!("{}.session", self.session_name)
    }

    /// Get chat entity by alias
    pub fn get_chat(&self, name: &str) -> Option<&ChatEntity> {
        self.chats.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    fn write_yaml(name: &str, yaml: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), yaml).unwrap();
        dir
    }

    #[test]
    fn test_chat_entity_username_strips_at() {
        let username = ChatEntity::username("@rust_ru");
        assert_eq!(username, ChatEntity::Username("rust_ru".to_string()));
    }

    #[test]
    fn defaults_match_constants() {
        let config = Config::defaults();

        assert_eq!(config.session_name, SESSION_NAME);
        assert_eq!(config.lock_file, LOCK_FILE);
        assert_eq!(config.days, DEFAULT_DAYS);
        assert_eq!(config.output, DEFAULT_OUTPUT);
        assert_eq!(config.timezone, DEFAULT_TIMEZONE);
        assert!(config.default_group.is_none());
        assert!(config.chats.is_empty());
    }

    #[test]
    fn session_file_uses_session_name() {
        let mut config = Config::defaults();
        config.session_name = "digest".to_string();
        assert_eq!(config.session_file(), "digest.session");
    }

    #[test]
    fn loads_report_section() {
        let yaml = r#"
telegram:
  api_id: 12345
  api_hash: "test_hash"
report:
  default_group: "@python_uz"
  timezone: "Europe/Berlin"
  days: 3
  output: weekly.json
"#;
        let dir = write_yaml("config.yml", yaml);
        let config = Config::load_from_file(dir.path().join("config.yml")).unwrap();

        assert_eq!(config.default_group.as_deref(), Some("@python_uz"));
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.days, 3);
        assert_eq!(config.output, "weekly.json");
    }

    #[test]
    fn non_positive_days_fall_back_to_default() {
        let dir = write_yaml("config.yml", "report:\n  days: 0\n  default_group: \"  \"\n");
        let config = Config::load_from_file(dir.path().join("config.yml")).unwrap();

        assert_eq!(config.days, DEFAULT_DAYS);
        assert!(config.default_group.is_none());
    }

    #[test]
    fn parses_chat_aliases_and_skips_invalid() {
        let yaml = r#"
chats:
  team:
    type: group
    id: -4001234
  forum:
    type: supergroup
    id: 1001234567
  public:
    type: username
    username: "@rust_beginners"
  missing_id:
    type: channel
  unknown_type:
    type: random
    id: 999
"#;
        let dir = write_yaml("config.yml", yaml);
        let config = Config::load_from_file(dir.path().join("config.yml")).unwrap();

        assert_eq!(config.chats.len(), 3);
        assert_eq!(config.get_chat("team"), Some(&ChatEntity::Chat(-4001234)));
        assert_eq!(config.get_chat("forum"), Some(&ChatEntity::Channel(1001234567)));
        assert_eq!(
            config.get_chat("public"),
            Some(&ChatEntity::Username("rust_beginners".to_string()))
        );
        assert!(config.get_chat("missing_id").is_none());
    }

    #[test]
    fn env_placeholders_are_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
telegram:
  api_id: "${TELEGRAM_API_ID}"
  api_hash: "${TELEGRAM_API_HASH}"
"#;
        let dir = write_yaml("config.yml", yaml);
        let _id = EnvGuard::set("TELEGRAM_API_ID", "4242");
        let _hash = EnvGuard::set("TELEGRAM_API_HASH", "hash_from_env");

        let config = Config::load_from_file(dir.path().join("config.yml")).unwrap();

        assert_eq!(config.api_id, 4242);
        assert_eq!(config.api_hash, "hash_from_env");
    }

    #[test]
    fn numeric_yaml_api_id_wins_over_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = write_yaml("config.yml", "telegram:\n  api_id: 321\n");
        let _id = EnvGuard::set("TELEGRAM_API_ID", "9999");

        let config = Config::load_from_file(dir.path().join("config.yml")).unwrap();
        assert_eq!(config.api_id, 321);
    }

    #[test]
    fn load_from_file_fails_on_missing_file() {
        let result = Config::load_from_file("/nonexistent/path/config.yml");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn load_from_file_fails_on_invalid_yaml() {
        let dir = write_yaml("config.yml", "{ invalid yaml [");
        let result = Config::load_from_file(dir.path().join("config.yml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
