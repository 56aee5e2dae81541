//! Insert ordering across foreign-key dependencies

use indexmap::{IndexMap, IndexSet};

use super::{Error, FieldDefinition};

/// Orders `tables` so every table comes after the batch tables it references.
///
/// Depth-first over the listing order, so unrelated tables keep their
/// relative position. References to tables outside the batch and
/// self-references do not constrain the order.
pub fn order_tables(tables: &[String], fields: &[FieldDefinition]) -> Result<Vec<String>, Error> {
    let mut dependencies = IndexMap::<&str, IndexSet<&str>>::new();
    for table in tables {
        dependencies.entry(table.as_str()).or_default();
    }
    for field in fields {
        let Some(referenced) = field.foreign_table() else {
            continue;
        };
        if referenced == field.table || !dependencies.contains_key(referenced) {
            continue;
        }
        if let Some(deps) = dependencies.get_mut(field.table.as_str()) {
            deps.insert(referenced);
        }
    }

    let mut sorter = Sorter {
        dependencies: &dependencies,
        visited: IndexSet::new(),
        visiting: IndexSet::new(),
    };
    for table in dependencies.keys().copied() {
        sorter.visit(table)?;
    }
    Ok(sorter.visited.into_iter().map(str::to_owned).collect())
}

struct Sorter<'a> {
    dependencies: &'a IndexMap<&'a str, IndexSet<&'a str>>,
    visited: IndexSet<&'a str>,
    visiting: IndexSet<&'a str>,
}

impl<'a> Sorter<'a> {
    fn visit(&mut self, table: &'a str) -> Result<(), Error> {
        if self.visited.contains(table) {
            return Ok(());
        }
        if !self.visiting.insert(table) {
            return Err(Error::CircularDependency(table.to_owned()));
        }
        let dependencies = self.dependencies;
        if let Some(deps) = dependencies.get(table) {
            for dep in deps.iter().copied() {
                self.visit(dep)?;
            }
        }
        self.visiting.shift_remove(table);
        self.visited.insert(table);
        Ok(())
    }
}
