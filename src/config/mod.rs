use crate::errors::{AppError, AppResult};
use crate::utils::date::parse_weekday;
use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

pub mod migrate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,
    /// Identity recorded as `performed_by` when `--as` is not given.
    #[serde(default = "default_operator")]
    pub operator: String,
    /// Identities allowed to finalize months and run corrections.
    #[serde(default = "default_admins")]
    pub admins: Vec<String>,
    /// Weekdays on which meals are off unless set by hand (e.g. `[fri]`).
    #[serde(default)]
    pub default_off_weekdays: Vec<String>,
    #[serde(default = "default_max_meal_count")]
    pub max_meal_count: u32,
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u32,
    #[serde(default = "default_defaulter_threshold")]
    pub defaulter_threshold: Decimal,
}

fn default_database() -> String {
    Config::database_file().to_string_lossy().to_string()
}
fn default_operator() -> String {
    "admin".to_string()
}
fn default_admins() -> Vec<String> {
    vec!["admin".to_string()]
}
fn default_max_meal_count() -> u32 {
    10
}
fn default_currency_decimals() -> u32 {
    2
}
fn default_defaulter_threshold() -> Decimal {
    Decimal::new(500, 0)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            operator: default_operator(),
            admins: default_admins(),
            default_off_weekdays: Vec::new(),
            max_meal_count: default_max_meal_count(),
            currency_decimals: default_currency_decimals(),
            defaulter_threshold: default_defaulter_threshold(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("mealbook")
        } else {
            let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".mealbook")
        }
    }

    pub fn config_file() -> PathBuf {
        Self::config_dir().join("mealbook.conf")
    }

    pub fn database_file() -> PathBuf {
        Self::config_dir().join("mealbook.sqlite")
    }

    /// Load configuration from file, or return defaults if not found.
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        let cfg: Config = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.off_weekdays()?;
        if self.currency_decimals > 6 {
            return Err(AppError::Config(format!(
                "currency_decimals must be at most 6, found {}",
                self.currency_decimals
            )));
        }
        if self.defaulter_threshold.is_sign_negative() {
            return Err(AppError::Config("defaulter_threshold must not be negative".into()));
        }
        Ok(())
    }

    pub fn off_weekdays(&self) -> AppResult<Vec<Weekday>> {
        self.default_off_weekdays
            .iter()
            .map(|w| parse_weekday(w).map_err(|_| AppError::Config(format!("unknown weekday '{w}'"))))
            .collect()
    }

    /// Initialize configuration and database files.
    pub fn init_all(custom_name: Option<String>, is_test: bool) -> AppResult<PathBuf> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        let db_path = match custom_name {
            Some(name) => {
                let p = std::path::Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(e.to_string()))?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        Ok(db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let cfg: Config = serde_yaml::from_str("database: /tmp/x.sqlite\n").unwrap();
        assert_eq!(cfg.max_meal_count, 10);
        assert_eq!(cfg.currency_decimals, 2);
        assert_eq!(cfg.admins, vec!["admin".to_string()]);
    }

    #[test]
    fn bad_weekday_is_a_config_error() {
        let cfg = Config {
            default_off_weekdays: vec!["caturday".into()],
            ..Config::default()
        };
        assert_eq!(cfg.validate().unwrap_err().code(), "config");
    }
}
