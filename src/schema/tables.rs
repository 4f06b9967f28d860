//! Table schema definitions for the Echoes static data store

use super::types::*;

const ID: &[&str] = &["id"];

// =============================================================================
// Localization and base catalogs
// =============================================================================

pub static LOCALISED_STRINGS: TableSchema = TableSchema {
    name: "localised_strings",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("source", ColumnType::Text),
        Column::new("text", ColumnType::Localized),
    ],
    primary_key: ID,
    foreign_keys: &[],
};

pub static UNITS: TableSchema = TableSchema {
    name: "units",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("description", ColumnType::Text),
        Column::new("display_name", ColumnType::Text),
        Column::new("unit_name", ColumnType::Text),
    ],
    primary_key: ID,
    foreign_keys: &[],
};

pub static CATEGORIES: TableSchema = TableSchema {
    name: "categories",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("name_key", ColumnType::Integer),
        Column::new("source_name", ColumnType::Text),
    ],
    primary_key: ID,
    foreign_keys: &[ForeignKey::new("name_key", "localised_strings")],
};

pub static GROUPS: TableSchema = TableSchema {
    name: "groups",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("category_id", ColumnType::Integer),
        Column::new("name_key", ColumnType::Integer),
        Column::new("source_name", ColumnType::Text),
        Column::new("anchorable", ColumnType::Boolean),
        Column::new("anchored", ColumnType::Boolean),
        Column::new("fittable_non_singleton", ColumnType::Boolean),
        Column::new("icon_path", ColumnType::Text),
        Column::new("use_base_price", ColumnType::Boolean),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("category_id", "categories"),
        ForeignKey::new("name_key", "localised_strings"),
    ],
};

pub static TYPES: TableSchema = TableSchema {
    name: "types",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("short_id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("group_id", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[ForeignKey::new("group_id", "groups")],
};

// =============================================================================
// Dogma
// =============================================================================

pub static ATTRIBUTES: TableSchema = TableSchema {
    name: "attributes",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("category", ColumnType::Integer),
        Column::new("available", ColumnType::Boolean),
        Column::new("charge_recharge_time_id", ColumnType::Integer),
        Column::new("default_value", ColumnType::Real),
        Column::new("high_is_good", ColumnType::Boolean),
        Column::new("max_attribute_id", ColumnType::Integer),
        Column::new("operator", ColumnType::Json),
        Column::new("stackable", ColumnType::Boolean),
        Column::new("to_attr_id", ColumnType::Json),
        Column::new("unit_id", ColumnType::Integer),
        Column::new("formula", ColumnType::Text),
    ],
    primary_key: ID,
    foreign_keys: &[ForeignKey::new("unit_id", "units")],
};

pub static EFFECTS: TableSchema = TableSchema {
    name: "effects",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("category", ColumnType::Integer),
        Column::new("disallow_auto_repeat", ColumnType::Boolean),
        Column::new("guid", ColumnType::Text),
        Column::new("is_assistance", ColumnType::Boolean),
        Column::new("is_offensive", ColumnType::Boolean),
        Column::new("is_warp_safe", ColumnType::Boolean),
        Column::new("electronic_chance", ColumnType::Real),
        Column::new("falloff_attribute_id", ColumnType::Integer),
        Column::new("fitting_usage_chance_attribute_id", ColumnType::Integer),
        Column::new("discharge_attribute_id", ColumnType::Integer),
        Column::new("duration_attribute_id", ColumnType::Integer),
        Column::new("range_attribute_id", ColumnType::Integer),
        Column::new("range_chance", ColumnType::Real),
        Column::new("tracking_speed_attribute_id", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("falloff_attribute_id", "attributes"),
        ForeignKey::new("fitting_usage_chance_attribute_id", "attributes"),
        ForeignKey::new("discharge_attribute_id", "attributes"),
        ForeignKey::new("duration_attribute_id", "attributes"),
        ForeignKey::new("range_attribute_id", "attributes"),
        ForeignKey::new("tracking_speed_attribute_id", "attributes"),
    ],
};

// =============================================================================
// Items and the rows they own
// =============================================================================

pub static ITEMS: TableSchema = TableSchema {
    name: "items",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("type_id", ColumnType::Integer),
        Column::required("group_id", ColumnType::Integer),
        Column::required("category_id", ColumnType::Integer),
        Column::new("short_type_id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("name_key", ColumnType::Integer),
        Column::new("desc_key", ColumnType::Integer),
        Column::new("source_name", ColumnType::Text),
        Column::new("source_desc", ColumnType::Text),
        Column::new("market_group_id", ColumnType::Integer),
        Column::new("can_be_jettisoned", ColumnType::Boolean),
        Column::new("published", ColumnType::Boolean),
        Column::new("main_cal_code", ColumnType::Text),
        Column::new("online_cal_code", ColumnType::Text),
        Column::new("active_cal_code", ColumnType::Text),
        Column::new("volume", ColumnType::Real),
        Column::new("mass", ColumnType::Real),
        Column::new("capacity", ColumnType::Real),
        Column::required("exp", ColumnType::Real),
        Column::new("lock_skin", ColumnType::Text),
        Column::new("product", ColumnType::Integer),
        Column::required("desc_special", ColumnType::Json),
        Column::required("npc_cal_codes", ColumnType::Json),
        Column::required("corp_camera", ColumnType::Json),
        Column::required("ability_list", ColumnType::Json),
        Column::required("normal_debris", ColumnType::Json),
        Column::required("ship_bonus_code_list", ColumnType::Json),
        Column::required("ship_bonus_skill_list", ColumnType::Json),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("type_id", "types"),
        ForeignKey::new("group_id", "groups"),
        ForeignKey::new("category_id", "categories"),
        ForeignKey::new("name_key", "localised_strings"),
        ForeignKey::new("desc_key", "localised_strings"),
    ],
};

pub static ITEM_NANOCORES: TableSchema = TableSchema {
    name: "item_nanocores",
    columns: &[
        Column::required("item_id", ColumnType::Integer),
        Column::new("film_group", ColumnType::Text),
        Column::new("film_quality", ColumnType::Integer),
        Column::new("available_ships", ColumnType::Json),
        Column::new("selectable_modifier_items", ColumnType::Json),
        Column::new("trainable_modifier_items", ColumnType::Json),
    ],
    primary_key: &["item_id"],
    foreign_keys: &[ForeignKey::new("item_id", "items").cascade()],
};

pub static ITEM_ATTRIBUTES: TableSchema = TableSchema {
    name: "item_attributes",
    columns: &[
        Column::required("item_id", ColumnType::Integer),
        Column::required("attribute_id", ColumnType::Integer),
        Column::new("value", ColumnType::Real),
    ],
    primary_key: &["item_id", "attribute_id"],
    foreign_keys: &[
        ForeignKey::new("item_id", "items").cascade(),
        ForeignKey::new("attribute_id", "attributes"),
    ],
};

pub static ITEM_EFFECTS: TableSchema = TableSchema {
    name: "item_effects",
    columns: &[
        Column::required("item_id", ColumnType::Integer),
        Column::required("effect_id", ColumnType::Integer),
        Column::new("is_default", ColumnType::Boolean),
    ],
    primary_key: &["item_id", "effect_id"],
    foreign_keys: &[
        ForeignKey::new("item_id", "items").cascade(),
        ForeignKey::new("effect_id", "effects"),
    ],
};

pub static REPACKAGE_VOLUME: TableSchema = TableSchema {
    name: "repackage_volume",
    columns: &[
        Column::required("item_id", ColumnType::Integer),
        Column::required("volume", ColumnType::Real),
        Column::required("source", ColumnType::Text),
    ],
    primary_key: &["item_id"],
    foreign_keys: &[ForeignKey::new("item_id", "items").cascade()],
};

pub static REPROCESS: TableSchema = TableSchema {
    name: "reprocess",
    columns: &[
        Column::required("item_id", ColumnType::Integer),
        Column::required("result_id", ColumnType::Integer),
        Column::required("quantity", ColumnType::Integer),
    ],
    primary_key: &["item_id", "result_id"],
    foreign_keys: &[
        ForeignKey::new("item_id", "items").cascade(),
        ForeignKey::new("result_id", "items"),
    ],
};

// =============================================================================
// Modifiers
// =============================================================================

pub static MODIFIER_DEFINITIONS: TableSchema = TableSchema {
    name: "modifier_definitions",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("code", ColumnType::Text).unique(),
        Column::new("change_types", ColumnType::Json),
        Column::new("attribute_only", ColumnType::Boolean),
        Column::new("change_ranges", ColumnType::Json),
        Column::new("change_range_module_names", ColumnType::Json),
        Column::new("attribute_ids", ColumnType::Json),
    ],
    primary_key: ID,
    foreign_keys: &[],
};

pub static MODIFIER_VALUES: TableSchema = TableSchema {
    name: "modifier_values",
    columns: &[
        Column::required("code", ColumnType::Text),
        Column::required("definition_id", ColumnType::Integer),
        Column::new("type_name", ColumnType::Text),
        Column::new("attributes", ColumnType::Json),
    ],
    primary_key: &["code"],
    foreign_keys: &[ForeignKey::new("definition_id", "modifier_definitions").cascade()],
};

pub static ITEM_MODIFIERS: TableSchema = TableSchema {
    name: "item_modifiers",
    columns: &[
        Column::required("code", ColumnType::Text),
        Column::required("slot", ColumnType::Integer),
        Column::required("definition_id", ColumnType::Integer),
        Column::new("type_code", ColumnType::Text),
        Column::new("change_type", ColumnType::Text),
        Column::new("attribute_only", ColumnType::Boolean),
        Column::new("change_range", ColumnType::Text),
        Column::required("attribute_id", ColumnType::Integer),
        Column::new("attribute_value", ColumnType::Real),
    ],
    primary_key: &["code", "slot"],
    foreign_keys: &[
        ForeignKey::to("code", "modifier_values", "code").cascade(),
        ForeignKey::new("definition_id", "modifier_definitions").cascade(),
        ForeignKey::new("attribute_id", "attributes"),
    ],
};

// =============================================================================
// Manufacturing
// =============================================================================

pub static BLUEPRINTS: TableSchema = TableSchema {
    name: "blueprints",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("product_id", ColumnType::Integer),
        Column::new("output_num", ColumnType::Integer),
        Column::new("skill_level", ColumnType::Integer),
        Column::new("material_amend_attr", ColumnType::Integer),
        Column::new("decryptor_mul", ColumnType::Real),
        Column::new("money", ColumnType::Integer),
        Column::new("time", ColumnType::Integer),
        Column::new("time_amend_attr", ColumnType::Integer),
        Column::new("kind", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("id", "items"),
        ForeignKey::new("product_id", "items"),
        ForeignKey::new("material_amend_attr", "attributes"),
        ForeignKey::new("time_amend_attr", "attributes"),
    ],
};

pub static BLUEPRINT_COSTS: TableSchema = TableSchema {
    name: "blueprint_costs",
    columns: &[
        Column::required("blueprint_id", ColumnType::Integer),
        Column::required("resource_id", ColumnType::Integer),
        Column::required("amount", ColumnType::Integer),
        Column::new("cost_type", ColumnType::Text),
    ],
    primary_key: &["blueprint_id", "resource_id"],
    foreign_keys: &[
        ForeignKey::new("blueprint_id", "blueprints").cascade(),
        ForeignKey::new("resource_id", "items"),
    ],
};

// =============================================================================
// Universe
// =============================================================================

pub static REGIONS: TableSchema = TableSchema {
    name: "regions",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("x", ColumnType::Real),
        Column::new("y", ColumnType::Real),
        Column::new("z", ColumnType::Real),
        Column::new("faction_id", ColumnType::Integer),
        Column::new("radius", ColumnType::Real),
        Column::new("wormhole_class_id", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[],
};

pub static CONSTELLATIONS: TableSchema = TableSchema {
    name: "constellations",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("region_id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("x", ColumnType::Real),
        Column::new("y", ColumnType::Real),
        Column::new("z", ColumnType::Real),
        Column::new("faction_id", ColumnType::Integer),
        Column::new("radius", ColumnType::Real),
        Column::new("wormhole_class_id", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[ForeignKey::new("region_id", "regions").cascade()],
};

pub static SOLAR_SYSTEMS: TableSchema = TableSchema {
    name: "solar_systems",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("constellation_id", ColumnType::Integer),
        Column::required("region_id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
        Column::new("x", ColumnType::Real),
        Column::new("y", ColumnType::Real),
        Column::new("z", ColumnType::Real),
        Column::new("security", ColumnType::Real),
        Column::new("faction_id", ColumnType::Integer),
        Column::new("radius", ColumnType::Real),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("constellation_id", "constellations").cascade(),
        ForeignKey::new("region_id", "regions"),
    ],
};

pub static CELESTIALS: TableSchema = TableSchema {
    name: "celestials",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("system_id", ColumnType::Integer),
        Column::required("kind", ColumnType::Text),
        Column::new("name", ColumnType::Text),
        Column::required("type_id", ColumnType::Integer),
        Column::new("group_id", ColumnType::Integer),
        Column::new("orbit_id", ColumnType::Integer),
        Column::new("x", ColumnType::Real),
        Column::new("y", ColumnType::Real),
        Column::new("z", ColumnType::Real),
        Column::new("radius", ColumnType::Real),
        Column::new("celestial_index", ColumnType::Integer),
        Column::new("orbit_index", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("system_id", "solar_systems").cascade(),
        ForeignKey::new("type_id", "types"),
        ForeignKey::new("group_id", "groups"),
    ],
};

pub static STARGATES: TableSchema = TableSchema {
    name: "stargates",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("system_id", ColumnType::Integer),
        Column::new("destination_id", ColumnType::Integer),
        Column::required("destination_system_id", ColumnType::Integer),
    ],
    primary_key: ID,
    foreign_keys: &[
        ForeignKey::new("id", "celestials").cascade(),
        ForeignKey::new("system_id", "solar_systems").cascade(),
        ForeignKey::new("destination_system_id", "solar_systems").cascade(),
    ],
};

pub static SYSTEM_CONNECTIONS: TableSchema = TableSchema {
    name: "system_connections",
    columns: &[
        Column::required("system_a", ColumnType::Integer),
        Column::required("system_b", ColumnType::Integer),
    ],
    primary_key: &["system_a", "system_b"],
    foreign_keys: &[
        ForeignKey::new("system_a", "solar_systems").cascade(),
        ForeignKey::new("system_b", "solar_systems").cascade(),
    ],
};

pub static PLANET_EXPLOITS: TableSchema = TableSchema {
    name: "planet_exploits",
    columns: &[
        Column::required("planet_id", ColumnType::Integer),
        Column::required("resource_id", ColumnType::Integer),
        Column::required("richness", ColumnType::Text),
        Column::new("richness_value", ColumnType::Real),
        Column::new("output", ColumnType::Real),
        Column::new("location_index", ColumnType::Integer),
    ],
    primary_key: &["planet_id", "resource_id"],
    foreign_keys: &[
        ForeignKey::new("planet_id", "celestials").cascade(),
        ForeignKey::new("resource_id", "items"),
    ],
};

// =============================================================================
// All tables in dependency order
// =============================================================================

/// All tables, parents before children
pub static ALL_TABLES: &[&TableSchema] = &[
    &LOCALISED_STRINGS,
    &UNITS,
    &CATEGORIES,
    &GROUPS,
    &TYPES,
    &ATTRIBUTES,
    &EFFECTS,
    &ITEMS,
    &ITEM_NANOCORES,
    &ITEM_ATTRIBUTES,
    &ITEM_EFFECTS,
    &REPACKAGE_VOLUME,
    &REPROCESS,
    &MODIFIER_DEFINITIONS,
    &MODIFIER_VALUES,
    &ITEM_MODIFIERS,
    &BLUEPRINTS,
    &BLUEPRINT_COSTS,
    &REGIONS,
    &CONSTELLATIONS,
    &SOLAR_SYSTEMS,
    &CELESTIALS,
    &STARGATES,
    &SYSTEM_CONNECTIONS,
    &PLANET_EXPLOITS,
];

/// Get a table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}

/// Get all table names
pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}
