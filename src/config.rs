use std::collections::HashMap;
use std::env;
use std::fs;

use chrono_tz::Tz;

use crate::error::AppError;

/// KEY=value config file with `export` prefixes and quoting tolerated, so a
/// deployment's env file can be pointed at directly.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Typed settings resolved from the config file with env-var fallback.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_url: String,
    pub api_key: String,
    pub organization_id: String,
    pub branch_ids: Vec<String>,
    pub timezone: Tz,
    pub bind_addr: String,
}

impl Settings {
    pub fn load(config: &AppConfig) -> Result<Self, AppError> {
        let get_prop = |key: &str| -> Option<String> {
            config.get(key).or_else(|| env::var(key).ok())
        };
        let required = |key: &str| -> Result<String, AppError> {
            get_prop(key).ok_or_else(|| AppError::validation(format!("{} must be set", key)))
        };

        let branch_ids: Vec<String> = required("BRANCH_IDS")?
            .split(',')
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if branch_ids.is_empty() {
            return Err(AppError::validation("BRANCH_IDS must name at least one branch"));
        }

        let timezone: Tz = get_prop("ORG_TIMEZONE")
            .unwrap_or_else(|| "Europe/London".to_string())
            .parse()
            .map_err(|e| AppError::validation(format!("ORG_TIMEZONE: {}", e)))?;

        Ok(Self {
            backend_url: required("BACKEND_URL")?,
            api_key: required("BACKEND_API_KEY")?,
            organization_id: required("ORGANIZATION_ID")?,
            branch_ids,
            timezone,
            bind_addr: get_prop("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_exports_quotes_and_comments() {
        let dir = env::temp_dir();
        let path = dir.join(format!("careflow_cfg_{}.env", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "# deployment").unwrap();
        writeln!(file, "export BACKEND_URL=\"https://store.example.com\"").unwrap();
        writeln!(file, "BRANCH_IDS='b1, b2'").unwrap();
        drop(file);

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(
            config.get("BACKEND_URL").as_deref(),
            Some("https://store.example.com")
        );
        assert_eq!(config.get("BRANCH_IDS").as_deref(), Some("b1, b2"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn invalid_line_reports_its_number() {
        let dir = env::temp_dir();
        let path = dir.join(format!("careflow_cfg_{}.env", uuid::Uuid::new_v4()));
        fs::write(&path, "BACKEND_URL=x\nnot a pair\n").unwrap();
        let err = AppConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(err.contains("line 2"));
        fs::remove_file(path).ok();
    }
}
