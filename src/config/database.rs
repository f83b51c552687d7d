use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::expand_env_vars;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub ty: DatabaseType,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Sqlite,
    Mysql,
    Postgresql,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::sqlite("foodgram.db")
    }
}

impl DatabaseConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            ty: DatabaseType::Sqlite,
            path: Some(path.into()),
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
        }
    }

    pub(super) fn expand_credentials(&mut self) -> Result<()> {
        if let Some(username) = &self.username {
            self.username = Some(expand_env_vars(username)?);
        }
        if let Some(password) = &self.password {
            self.password = Some(expand_env_vars(password)?);
        }
        Ok(())
    }

    pub fn url(&self) -> Result<String> {
        match self.ty {
            DatabaseType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("SQLite database path is required"))?;
                Ok(format!("sqlite://{path}?mode=rwc"))
            }
            DatabaseType::Mysql => self.server_url("mysql", "MySQL", 3306),
            DatabaseType::Postgresql => self.server_url("postgresql", "PostgreSQL", 5432),
        }
    }

    fn server_url(&self, scheme: &str, label: &str, default_port: u16) -> Result<String> {
        let host = self
            .host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{label} database host is required"))?;
        let port = self.port.unwrap_or(default_port);
        let database = self
            .database
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{label} database name is required"))?;
        let username = self
            .username
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{label} database username is required"))?;
        let password = self
            .password
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{label} database password is required"))?;
        Ok(format!("{scheme}://{username}:{password}@{host}:{port}/{database}"))
    }
}
