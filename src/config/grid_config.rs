use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A single column shown by the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Key into each row record
    pub name: String,
    /// Header text
    pub title: String,
    #[serde(default)]
    pub sortable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, title: impl Into<String>, sortable: bool) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            sortable,
        }
    }
}

/// Static description of a grid instance, supplied by the host at mount time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub name: String,
    /// Column identifying a row; always requested first
    pub key_column: String,
    pub title: String,
    /// Sizing hint used until the host reports the real viewport height
    #[serde(default = "default_max_visible_rows")]
    pub max_visible_rows: usize,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub findable: bool,
    pub columns: Vec<ColumnDescriptor>,
}

fn default_max_visible_rows() -> usize {
    20
}

impl GridConfig {
    /// Columns requested from the data source: the key column followed by
    /// every configured column in order. A key column that is also configured
    /// is sent twice; data sources rely on the positional layout.
    pub fn column_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.columns.len() + 1);
        keys.push(self.key_column.clone());
        keys.extend(self.columns.iter().map(|c| c.name.clone()));
        keys
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_sortable(&self, name: &str) -> bool {
        self.column(name).map(|c| c.sortable).unwrap_or(false)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            bail!("grid '{}' has no columns", self.name);
        }
        if self.key_column.trim().is_empty() {
            bail!("grid '{}' has an empty key column", self.name);
        }
        if self.max_visible_rows == 0 {
            bail!("grid '{}' must show at least one row", self.name);
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                bail!(
                    "grid '{}' configures column '{}' more than once",
                    self.name,
                    column.name
                );
            }
        }
        Ok(())
    }

    /// Load a grid definition from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: GridConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Derive a grid over whatever columns a data set has, all sortable
    pub fn for_columns(name: &str, key_column: &str, columns: &[String]) -> Self {
        Self {
            name: name.to_string(),
            key_column: key_column.to_string(),
            title: name.to_string(),
            max_visible_rows: default_max_visible_rows(),
            filterable: true,
            findable: true,
            columns: columns
                .iter()
                .map(|c| ColumnDescriptor::new(c.clone(), title_case(c), true))
                .collect(),
        }
    }
}

fn title_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
