use anyhow::Result;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub log_filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Argon2 cost parameters. The defaults land around 100ms per hash on
/// commodity hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Config {
    /// Defaults, then `forum.{toml,yaml,json}` from the working directory,
    /// then `FORUM__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(File::with_name("forum").required(false))
            .add_source(
                Environment::with_prefix("FORUM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let security = SecurityConfig::default();
        let builder = config::Config::builder()
            .set_default("database.url", "sqlite:forum.db?mode=rwc")?
            .set_default("database.max_connections", 10_i64)?
            .set_default("security.memory_kib", i64::from(security.memory_kib))?
            .set_default("security.iterations", i64::from(security.iterations))?
            .set_default("security.parallelism", i64::from(security.parallelism))?
            .set_default("log_filter", "forum_core=info")?;
        Ok(builder)
    }

    /// Throwaway in-memory store with cheap hashing, for tests and tooling.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig::in_memory(),
            security: SecurityConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            log_filter: "forum_core=debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_deserialize() {
        let config: Config = Config::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.database.url, "sqlite:forum.db?mode=rwc");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.security.iterations, 2);
        assert_eq!(config.log_filter, "forum_core=info");
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = r#"
            [database]
            url = "sqlite::memory:"

            [security]
            memory_kib = 4096
        "#;
        let config: Config = Config::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(config.database.is_in_memory());
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.security.memory_kib, 4096);
        assert_eq!(config.security.parallelism, 1);
    }
}
