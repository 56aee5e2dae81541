//! Foreign-key detection by naming convention

use super::{Error, FieldDefinition, PRIMARY_KEY};

/// Maps a field name to the table it refers to, if the name says it is a
/// reference at all.
pub trait NamingConvention: Send + Sync {
    fn field_name_to_table(&self, field: &str) -> Option<String>;
}

/// `<stem><suffix>` refers to `<stem><plural>`: with the defaults `cursoId`
/// and `curso_id` both refer to `cursos`.
#[derive(Debug, Clone)]
pub struct SuffixConvention {
    suffix: String,
    plural: String,
}

impl SuffixConvention {
    pub fn new(suffix: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into().to_lowercase(),
            plural: plural.into(),
        }
    }
}

impl Default for SuffixConvention {
    fn default() -> Self {
        Self::new(PRIMARY_KEY, "s")
    }
}

impl NamingConvention for SuffixConvention {
    fn field_name_to_table(&self, field: &str) -> Option<String> {
        let lower = field.to_lowercase();
        if lower == self.suffix {
            return None;
        }
        let stem = lower.strip_suffix(&self.suffix)?.trim_end_matches('_');
        if stem.is_empty() {
            return None;
        }
        Some(format!("{stem}{}", self.plural))
    }
}

/// Annotates every field the convention recognises as a foreign key.
///
/// An explicitly supplied referenced table always wins over the convention.
/// A field flagged as a foreign key that neither carries a referenced table
/// nor matches the convention is rejected.
pub fn detect_foreign_keys(
    convention: &dyn NamingConvention,
    fields: &[FieldDefinition],
) -> Result<Vec<FieldDefinition>, Error> {
    fields
        .iter()
        .map(|field| {
            let mut field = field.clone();
            if field.referenced_table.is_some() {
                field.is_foreign_key = true;
                return Ok(field);
            }
            match convention.field_name_to_table(&field.name) {
                Some(table) => {
                    field.is_foreign_key = true;
                    field.referenced_table = Some(table);
                }
                None if field.is_foreign_key => {
                    return Err(Error::MissingReference {
                        table: field.table,
                        field: field.name,
                    });
                }
                None => {}
            }
            Ok(field)
        })
        .collect()
}
