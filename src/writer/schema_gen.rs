use crate::schema::{ColumnType, TableSchema, LANGUAGES};

/// Generate CREATE TABLE SQL for a table schema
pub fn generate_create_table(schema: &TableSchema) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);
    let mut columns = Vec::new();
    let single_pk = match schema.primary_key {
        [pk] => Some(*pk),
        _ => None,
    };

    for col in schema.columns {
        match col.col_type {
            ColumnType::Localized => {
                // Expand localized columns to per-language columns
                for lang in LANGUAGES {
                    let col_name = format!("{}_{}", col.name, lang);
                    columns.push(format!("    {} TEXT", col_name));
                }
            }
            _ => {
                let sql_type = match col.col_type {
                    ColumnType::Integer => "INTEGER",
                    ColumnType::Real => "REAL",
                    ColumnType::Text => "TEXT",
                    ColumnType::Boolean => "INTEGER",
                    ColumnType::Json => "TEXT",
                    ColumnType::Localized => unreachable!(),
                };

                let pk = if single_pk == Some(col.name) {
                    " PRIMARY KEY"
                } else {
                    ""
                };
                let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
                let unique = if col.unique { " UNIQUE" } else { "" };

                columns.push(format!(
                    "    {} {}{}{}{}",
                    col.name, sql_type, pk, null_constraint, unique
                ));
            }
        }
    }

    if single_pk.is_none() {
        columns.push(format!("    PRIMARY KEY ({})", schema.primary_key.join(", ")));
    }

    // Add foreign key constraints
    for fk in schema.foreign_keys {
        let on_delete = if fk.cascade { " ON DELETE CASCADE" } else { "" };
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({}){}",
            fk.column, fk.references_table, fk.references_column, on_delete
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for foreign key columns
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    schema
        .foreign_keys
        .iter()
        // The leading primary key column is already indexed
        .filter(|fk| schema.primary_key.first() != Some(&fk.column))
        .map(|fk| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                schema.name, fk.column, schema.name, fk.column
            )
        })
        .collect()
}

/// Generate an insert-or-update statement keyed by the primary key
pub fn generate_upsert(schema: &TableSchema) -> String {
    let columns = schema.column_names();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !schema.primary_key.iter().any(|k| *k == c.as_str()))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();

    let action = if updates.is_empty() {
        "NOTHING".to_string()
    } else {
        format!("UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO {}",
        schema.name,
        columns.join(", "),
        placeholders.join(", "),
        schema.primary_key.join(", "),
        action
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{ITEM_ATTRIBUTES, LOCALISED_STRINGS, SYSTEM_CONNECTIONS, TYPES};

    #[test]
    fn test_generate_create_table() {
        let sql = generate_create_table(&TYPES);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS types"));
        assert!(sql.contains("id INTEGER PRIMARY KEY NOT NULL"));
        assert!(sql.contains("FOREIGN KEY (group_id) REFERENCES groups(id)"));
    }

    #[test]
    fn test_localized_and_composite_key() {
        let sql = generate_create_table(&LOCALISED_STRINGS);
        assert!(sql.contains("text_en TEXT"));
        assert!(sql.contains("text_de TEXT"));

        let sql = generate_create_table(&ITEM_ATTRIBUTES);
        assert!(sql.contains("PRIMARY KEY (item_id, attribute_id)"));
        assert!(sql.contains("REFERENCES items(id) ON DELETE CASCADE"));
    }

    #[test]
    fn test_generate_indexes() {
        let indexes = generate_indexes(&TYPES);
        assert!(indexes.iter().any(|i| i.contains("idx_types_group_id")));

        let indexes = generate_indexes(&ITEM_ATTRIBUTES);
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].contains("idx_item_attributes_attribute_id"));
    }

    #[test]
    fn test_generate_upsert() {
        let sql = generate_upsert(&TYPES);
        let insert = "INSERT INTO types (id, short_id, name, group_id) VALUES (?, ?, ?, ?)";
        assert!(sql.starts_with(insert));
        assert!(sql.contains("ON CONFLICT(id) DO UPDATE SET short_id = excluded.short_id"));

        let sql = generate_upsert(&SYSTEM_CONNECTIONS);
        assert!(sql.ends_with("ON CONFLICT(system_a, system_b) DO NOTHING"));
    }
}
