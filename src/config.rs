use std::{net::SocketAddr, path::Path};

use serde::Deserialize;

use crate::form::{SuffixConvention, ValueTransformer};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Read(std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default = "default_seed_admin")]
    pub seed_admin: Option<SeedAdmin>,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default = "default_allowed_roles")]
    pub allowed_roles: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    #[serde(default = "default_cost")]
    pub cost: u32,
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

/// Foreign-key naming convention: `<stem><suffix>` refers to `<stem><plural>`.
#[derive(Debug, Deserialize, Clone)]
pub struct NamingConfig {
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default = "default_plural")]
    pub plural: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_cost() -> u32 {
    10
}

fn default_sensitive_fields() -> Vec<String> {
    vec!["password".to_owned(), "contraseña".to_owned()]
}

fn default_seed_admin() -> Option<SeedAdmin> {
    Some(SeedAdmin {
        email: "admin@admin.com".to_owned(),
        password: "admin123".to_owned(),
    })
}

fn default_suffix() -> String {
    "id".to_owned()
}

fn default_plural() -> String {
    "s".to_owned()
}

fn default_allowed_roles() -> Vec<String> {
    vec!["admin".to_owned()]
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://course-office.db".to_owned(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            cost: default_cost(),
            sensitive_fields: default_sensitive_fields(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            plural: default_plural(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            database: DatabaseConfig::default(),
            password: PasswordConfig::default(),
            seed_admin: default_seed_admin(),
            naming: NamingConfig::default(),
            allowed_roles: default_allowed_roles(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = tokio::fs::read_to_string(path).await.map_err(Error::Read)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(text).map_err(Error::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(4..=31).contains(&self.password.cost) {
            return Err(Error::Invalid(format!(
                "password.cost must be between 4 and 31, got {}",
                self.password.cost
            )));
        }
        if self.naming.suffix.is_empty() {
            return Err(Error::Invalid("naming.suffix must not be empty".to_owned()));
        }
        if self.allowed_roles.is_empty() {
            return Err(Error::Invalid(
                "allowed_roles must name at least one role".to_owned(),
            ));
        }
        if let Some(admin) = &self.seed_admin {
            if admin.email.is_empty() || admin.password.is_empty() {
                return Err(Error::Invalid(
                    "seed_admin needs both email and password".to_owned(),
                ));
            }
        }
        Ok(())
    }

    pub fn transformer(&self) -> ValueTransformer {
        ValueTransformer::new(&self.password.sensitive_fields, self.password.cost)
    }

    pub fn naming_convention(&self) -> SuffixConvention {
        SuffixConvention::new(&self.naming.suffix, &self.naming.plural)
    }
}
