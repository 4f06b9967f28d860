use std::collections::HashSet;

/// Languages shipped in the localization catalogs; `zh` is the source language
pub const LANGUAGES: &[&str] = &["en", "de", "fr", "ja", "kr", "por", "ru", "spa", "zh", "zhcn"];

/// Column data type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    /// Localized text expands to multiple columns (text_en, text_de, etc.)
    Localized,
    /// JSON list stored as text
    Json,
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            unique: false,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
            unique: false,
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }
}

/// Foreign key reference
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
    /// Child rows are owned by the parent and deleted with it
    pub cascade: bool,
}

impl ForeignKey {
    pub const fn new(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: "id",
            cascade: false,
        }
    }

    /// Reference a column other than `id`
    pub const fn to(
        column: &'static str,
        references_table: &'static str,
        references_column: &'static str,
    ) -> Self {
        Self {
            column,
            references_table,
            references_column,
            cascade: false,
        }
    }

    pub const fn cascade(self) -> Self {
        Self {
            cascade: true,
            ..self
        }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Upsert conflict target
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    /// Get all tables this table depends on (FK parents)
    pub fn dependencies(&self) -> HashSet<&'static str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table)
            .filter(|table| *table != self.name)
            .collect()
    }

    /// Column names with localized columns expanded per language
    pub fn column_names(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for col in self.columns {
            match col.col_type {
                ColumnType::Localized => {
                    for lang in LANGUAGES {
                        columns.push(format!("{}_{}", col.name, lang));
                    }
                }
                _ => columns.push(col.name.to_string()),
            }
        }
        columns
    }
}
