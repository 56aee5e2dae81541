//! One-way hashing of sensitive values before they reach the database

use tracing::trace;

use super::{Error, RowValue};

#[derive(Debug, Clone)]
pub struct ValueTransformer {
    sensitive: Vec<String>,
    cost: u32,
}

impl Default for ValueTransformer {
    fn default() -> Self {
        Self::new(["password", "contraseña"], bcrypt::DEFAULT_COST)
    }
}

impl ValueTransformer {
    pub fn new<I, S>(sensitive: I, cost: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sensitive: sensitive
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
            cost,
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn is_sensitive(&self, field: &str) -> bool {
        let field = field.to_lowercase();
        self.sensitive.iter().any(|name| *name == field)
    }

    pub fn hash(&self, plain: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(plain, self.cost)
    }

    /// Replaces every sensitive value by its salted hash. `null` stays `null`
    /// and non-string values are hashed from their JSON text.
    pub fn apply(&self, values: Vec<RowValue>) -> Result<Vec<RowValue>, Error> {
        values
            .into_iter()
            .map(|mut value| {
                if !self.is_sensitive(&value.field) || value.value.is_null() {
                    return Ok(value);
                }
                let plain = match &value.value {
                    serde_json::Value::String(plain) => plain.clone(),
                    other => other.to_string(),
                };
                trace!(table = %value.table, field = %value.field, "hashing sensitive value");
                let hashed = self.hash(&plain).map_err(|source| Error::Hash {
                    field: value.field.clone(),
                    source,
                })?;
                value.value = serde_json::Value::String(hashed);
                Ok(value)
            })
            .collect()
    }
}

/// Checks `plain` against a stored hash. Malformed hashes never match.
pub fn verify(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}
