//! Column metadata gathered from a system catalog or a prepared statement.

use std::collections::HashMap;

use serde::Serialize;

/// One column: 1-based position, name and declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub sequence: usize,
    pub name: String,
    pub type_name: String,
}

/// Ordered column list plus a name -> declared type lookup.
///
/// The list keeps every column, duplicates included; in the lookup a later
/// column with a repeated name replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub columns: Vec<ColumnDef>,
    pub types: HashMap<String, String>,
}

impl ColumnInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a column at an explicit catalog position.
    pub fn push(&mut self, sequence: usize, name: impl Into<String>, type_name: impl Into<String>) {
        let def = ColumnDef {
            sequence,
            name: name.into(),
            type_name: type_name.into(),
        };
        self.types.insert(def.name.clone(), def.type_name.clone());
        self.columns.push(def);
    }

    /// Build from `(name, type)` pairs in result order, numbering from 1.
    pub fn from_ordered<I, N, T>(columns: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let mut info = Self::new();
        for (index, (name, type_name)) in columns.into_iter().enumerate() {
            info.push(index + 1, name, type_name);
        }
        info
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
