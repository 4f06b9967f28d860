//! Localized strings and the lookups every other builder resolves names through.

use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{persist_all, Batch};
use crate::config::{SourceLayout, SOURCE_LANGUAGE};
use crate::error::Result;
use crate::parser::{numbered_files, read_records, SourceFormat};
use crate::resolver::{EntityKind, Resolver};
use crate::schema::{TableSchema, LANGUAGES, LOCALISED_STRINGS};
use crate::writer::{Entity, ModeWriter, SqlValue};

/// One message id with its text in every loaded language
#[derive(Debug, Clone, PartialEq)]
pub struct LocalisedString {
    pub id: i64,
    /// Text of the source language catalog, the lookup key of the string
    pub source: Option<String>,
    /// Indexed like `LANGUAGES`
    pub texts: Vec<Option<String>>,
}

impl LocalisedString {
    fn new(id: i64) -> Self {
        Self {
            id,
            source: None,
            texts: vec![None; LANGUAGES.len()],
        }
    }

    pub fn text(&self, lang: &str) -> Option<&str> {
        let idx = LANGUAGES.iter().position(|l| *l == lang)?;
        self.texts[idx].as_deref()
    }
}

impl Entity for LocalisedString {
    fn table() -> &'static TableSchema {
        &LOCALISED_STRINGS
    }

    fn values(&self) -> Vec<SqlValue> {
        let mut values = crate::sql_values![self.id, self.source.clone()];
        values.extend(self.texts.iter().cloned().map(SqlValue::from));
        values
    }
}

#[derive(Debug, Default)]
pub struct LangBatch {
    pub strings: Vec<LocalisedString>,
}

impl Batch for LangBatch {
    fn persist(&self, writer: &ModeWriter) -> Result<u64> {
        persist_all(writer, &[&self.strings])
    }

    fn len(&self) -> usize {
        self.strings.len()
    }
}

/// Load the source catalog and the translations in `languages`.
///
/// The source catalog is required; a missing translation directory is
/// skipped with a warning. Identical source texts map to the lowest id.
pub fn build(
    layout: &SourceLayout,
    languages: &[String],
    resolver: &mut Resolver,
) -> Result<LangBatch> {
    let mut strings: BTreeMap<i64, LocalisedString> = BTreeMap::new();

    read_catalog(layout, SOURCE_LANGUAGE, &mut strings)?;
    for row in strings.values_mut() {
        row.source = row.text(SOURCE_LANGUAGE).map(str::to_string);
    }

    for lang in languages.iter().filter(|l| l.as_str() != SOURCE_LANGUAGE) {
        if !LANGUAGES.contains(&lang.as_str()) {
            warn!("Unsupported language '{}', skipped", lang);
            continue;
        }
        let dir = layout.gettext_dir(lang);
        if !dir.is_dir() {
            warn!("No catalog for '{}' at {}, skipped", lang, dir.display());
            continue;
        }
        read_catalog(layout, lang, &mut strings)?;
    }

    for row in strings.values() {
        if let Some(source) = &row.source {
            resolver.register_first(EntityKind::LocalizedString, source.as_str(), row.id);
        }
        if let Some(en) = row.text("en") {
            resolver.set_english(row.id, en);
        }
    }

    info!(
        "Loaded {} localized strings ({} distinct source texts)",
        strings.len(),
        resolver.count(EntityKind::LocalizedString)
    );

    Ok(LangBatch {
        strings: strings.into_values().collect(),
    })
}

fn read_catalog(
    layout: &SourceLayout,
    lang: &str,
    strings: &mut BTreeMap<i64, LocalisedString>,
) -> Result<()> {
    let Some(idx) = LANGUAGES.iter().position(|l| *l == lang) else {
        return Ok(());
    };
    let format = SourceFormat::Gettext {
        lang: lang.to_string(),
    };

    for path in numbered_files(&layout.gettext_dir(lang), "")? {
        for record in read_records(&path, &format)? {
            let record = record?;
            let id = record.id()?;
            let text = record.str("text")?.to_string();
            let row = strings
                .entry(id)
                .or_insert_with(|| LocalisedString::new(id));
            row.texts[idx] = Some(text);
        }
    }

    Ok(())
}

/// A source-language text resolved to its stored form
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedText {
    /// Id of the localized string; `None` for composite texts
    pub key: Option<i64>,
    /// The source text, with composite placeholders rewritten to `{<id>}`
    pub source: String,
    pub english: Option<String>,
}

/// Resolve a source text to its localized string.
///
/// Composite texts such as `{module_affix:联邦海军} {module:大型装甲连接模块}`
/// have no key of their own; every placeholder must resolve.
pub fn localize(resolver: &Resolver, text: &str) -> Result<LocalizedText> {
    let segments = split_composite(text);
    if !segments.iter().any(|s| matches!(s, Segment::Placeholder(_))) {
        let key = resolver.resolve(EntityKind::LocalizedString, text)?;
        return Ok(LocalizedText {
            key: Some(key),
            source: text.to_string(),
            english: resolver.english(key).map(str::to_string),
        });
    }

    let mut source = String::with_capacity(text.len());
    let mut english = String::with_capacity(text.len());
    let mut complete = true;

    for segment in segments {
        match segment {
            Segment::Literal(s) => {
                source.push_str(s);
                english.push_str(s);
            }
            Segment::Placeholder(inner) => {
                let id = resolver.resolve(EntityKind::LocalizedString, inner)?;
                source.push_str(&format!("{{{}}}", id));
                match resolver.english(id) {
                    Some(en) => english.push_str(en),
                    None => complete = false,
                }
            }
        }
    }

    Ok(LocalizedText {
        key: None,
        source,
        english: complete.then_some(english),
    })
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    /// Text of a `{prefix:text}` placeholder
    Placeholder(&'a str),
}

fn split_composite(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        let inner = &rest[open + 1..open + len];
        match placeholder_text(inner) {
            Some(value) => {
                if open > 0 {
                    segments.push(Segment::Literal(&rest[..open]));
                }
                segments.push(Segment::Placeholder(value));
            }
            None => segments.push(Segment::Literal(&rest[..open + len + 1])),
        }
        rest = &rest[open + len + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    segments
}

fn placeholder_text(inner: &str) -> Option<&str> {
    let (prefix, value) = inner.split_once(':')?;
    let valid_prefix = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-');
    (valid_prefix && !value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> Resolver {
        let mut resolver = Resolver::new();
        resolver.register(EntityKind::LocalizedString, "联邦海军", 10);
        resolver.register(EntityKind::LocalizedString, "大型装甲连接模块", 11);
        resolver.set_english(10, "Federation Navy");
        resolver.set_english(11, "Large Armor Repairer");
        resolver
    }

    #[test]
    fn test_localize_plain_text() {
        let text = localize(&resolver(), "联邦海军").unwrap();
        assert_eq!(text.key, Some(10));
        assert_eq!(text.english.as_deref(), Some("Federation Navy"));
    }

    #[test]
    fn test_localize_composite_text() {
        let source = "{module_affix:联邦海军} {module:大型装甲连接模块}";
        let text = localize(&resolver(), source).unwrap();
        assert_eq!(text.key, None);
        assert_eq!(text.source, "{10} {11}");
        assert_eq!(
            text.english.as_deref(),
            Some("Federation Navy Large Armor Repairer")
        );
    }

    #[test]
    fn test_localize_unresolved_placeholder_fails() {
        let err = localize(&resolver(), "{module_affix:联邦海军} {module:未知}").unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_braces_without_prefix_are_literal() {
        assert_eq!(
            split_composite("a {b} c"),
            vec![Segment::Literal("a {b}"), Segment::Literal(" c")]
        );
        assert!(localize(&resolver(), "a {b} c").is_err());
    }

    #[test]
    fn test_build_reads_catalogs() {
        let dir = TempDir::new().unwrap();
        let layout = SourceLayout::new(dir.path());
        fs::create_dir_all(layout.gettext_dir("zh")).unwrap();
        fs::create_dir_all(layout.gettext_dir("en")).unwrap();
        let zh = json!({"5": "护卫舰", "9": "护卫舰", "7": "巡洋舰"});
        let en = json!({"5": "Frigate", "7": "Cruiser"});
        fs::write(layout.gettext_dir("zh").join("1.json"), zh.to_string()).unwrap();
        fs::write(layout.gettext_dir("en").join("1.json"), en.to_string()).unwrap();

        let mut resolver = Resolver::new();
        let languages = vec!["en".to_string(), "de".to_string()];
        let batch = build(&layout, &languages, &mut resolver).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.strings[0].id, 5);
        assert_eq!(batch.strings[0].text("en"), Some("Frigate"));
        assert_eq!(batch.strings[0].text("zh"), Some("护卫舰"));
        let id = resolver.resolve(EntityKind::LocalizedString, "护卫舰");
        assert_eq!(id.unwrap(), 5);
        assert_eq!(resolver.translate("巡洋舰"), "Cruiser");
    }

    #[test]
    fn test_values_cover_every_language() {
        let row = LocalisedString::new(1);
        assert_eq!(row.values().len(), LOCALISED_STRINGS.column_names().len());
    }
}
