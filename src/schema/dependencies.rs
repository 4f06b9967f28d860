use super::tables::{get_table, ALL_TABLES};
use super::types::TableSchema;
use std::collections::{HashMap, HashSet};

/// Orders tables by their foreign keys for creation and dropping
pub struct DependencyResolver {
    /// Map of table name -> tables it depends on
    deps: HashMap<&'static str, HashSet<&'static str>>,
    /// Map of table name -> tables that depend on it
    reverse_deps: HashMap<&'static str, HashSet<&'static str>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        let mut deps: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        let mut reverse_deps: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();

        for table in ALL_TABLES {
            let table_deps = table.dependencies();
            deps.insert(table.name, table_deps.clone());

            for dep in table_deps {
                reverse_deps.entry(dep).or_default().insert(table.name);
            }
        }

        Self { deps, reverse_deps }
    }

    /// All tables, parents before children
    pub fn creation_order(&self) -> Result<Vec<&'static TableSchema>, String> {
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut temp_visited: HashSet<&str> = HashSet::new();

        for table in ALL_TABLES {
            if !visited.contains(table.name) {
                self.visit(table.name, &mut visited, &mut temp_visited, &mut result)?;
            }
        }

        Ok(result)
    }

    /// All tables, children before parents
    pub fn drop_order(&self) -> Result<Vec<&'static TableSchema>, String> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }

    /// Tables that reference `name`, directly or through other tables
    pub fn dependents(&self, name: &str) -> HashSet<&'static str> {
        let mut found = HashSet::new();
        let mut stack = vec![name];

        while let Some(current) = stack.pop() {
            if let Some(children) = self.reverse_deps.get(current) {
                for child in children {
                    if found.insert(*child) {
                        stack.push(child);
                    }
                }
            }
        }

        found
    }

    fn visit<'a>(
        &self,
        name: &'a str,
        visited: &mut HashSet<&'a str>,
        temp_visited: &mut HashSet<&'a str>,
        result: &mut Vec<&'static TableSchema>,
    ) -> Result<(), String> {
        if temp_visited.contains(name) {
            return Err(format!("Circular dependency detected at: {}", name));
        }
        if visited.contains(name) {
            return Ok(());
        }

        temp_visited.insert(name);

        if let Some(deps) = self.deps.get(name) {
            // Sorted so the order is stable between runs
            let mut deps: Vec<&'static str> = deps.iter().copied().collect();
            deps.sort();
            for dep in deps {
                if dep != name {
                    self.visit(dep, visited, temp_visited, result)?;
                }
            }
        }

        temp_visited.remove(name);
        visited.insert(name);

        if let Some(table) = get_table(name) {
            result.push(table);
        }

        Ok(())
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(names: &[&str], name: &str) -> usize {
        names.iter().position(|&n| n == name).unwrap()
    }

    #[test]
    fn test_parents_created_before_children() {
        let resolver = DependencyResolver::new();
        let tables = resolver.creation_order().unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name).collect();

        assert_eq!(names.len(), ALL_TABLES.len());
        for table in ALL_TABLES {
            for fk in table.foreign_keys {
                assert!(
                    position(&names, fk.references_table) < position(&names, table.name),
                    "{} must come before {}",
                    fk.references_table, table.name
                );
            }
        }
    }

    #[test]
    fn test_drop_order_starts_with_children() {
        let resolver = DependencyResolver::new();
        let order = resolver.drop_order().unwrap();
        let names: Vec<_> = order.iter().map(|t| t.name).collect();

        assert!(position(&names, "celestials") < position(&names, "solar_systems"));
        assert!(position(&names, "solar_systems") < position(&names, "constellations"));
        assert!(position(&names, "constellations") < position(&names, "regions"));
    }

    #[test]
    fn test_dependents_are_transitive() {
        let resolver = DependencyResolver::new();
        let dependents = resolver.dependents("regions");

        assert!(dependents.contains("constellations"));
        assert!(dependents.contains("celestials"));
        assert!(dependents.contains("planet_exploits"));
        assert!(!dependents.contains("items"));
    }
}
