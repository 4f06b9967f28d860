use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use super::RawEntry;
use crate::error::{PipelineError, Result};

/// Line reader for decompiled script constant tables such as
///
/// ```text
/// class GroupIds:
///     Frigate = 25
///     Moon = 8  # orbiting body
/// ```
pub(super) struct ScriptLiteralReader<R> {
    lines: Lines<R>,
    path: PathBuf,
    line_no: usize,
    class: Option<String>,
    body_indent: Option<usize>,
}

pub(super) fn read_entries(path: &Path) -> Result<ScriptLiteralReader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(ScriptLiteralReader::new(BufReader::new(file), path))
}

impl<R: BufRead> ScriptLiteralReader<R> {
    pub(super) fn new(reader: R, path: &Path) -> Self {
        Self {
            lines: reader.lines(),
            path: path.to_path_buf(),
            line_no: 0,
            class: None,
            body_indent: None,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> PipelineError {
        let reason = format!("line {}: {}", self.line_no, reason.into());
        PipelineError::malformed(&self.path, reason)
    }

    /// Interpret one line; returns an entry for constant assignments inside a class
    fn parse_line(&mut self, line: &str) -> Result<Option<RawEntry>> {
        let code = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        if code.trim().is_empty() {
            return Ok(None);
        }

        let indent = code.len() - code.trim_start().len();
        let code = code.trim();

        if indent == 0 {
            self.body_indent = None;
            self.class = code
                .strip_prefix("class ")
                .and_then(|rest| rest.strip_suffix(':'))
                .map(|decl| decl.split('(').next().unwrap_or(decl).trim().to_string());
            return Ok(None);
        }

        let Some(class) = self.class.clone() else {
            return Ok(None);
        };
        // Only the class body itself, not method bodies
        if *self.body_indent.get_or_insert(indent) != indent {
            return Ok(None);
        }
        let Some((name, value)) = code.split_once('=') else {
            return Ok(None);
        };
        let name = name.trim();
        if !is_identifier(name) {
            return Ok(None);
        }

        let value = value.trim();
        let value = value
            .parse::<i64>()
            .map_err(|_| self.malformed(format!("{class}.{name} is not an integer: {value}")))?;

        Ok(Some(RawEntry::Script {
            class,
            name: name.to_string(),
            value,
        }))
    }
}

impl<R: BufRead> Iterator for ScriptLiteralReader<R> {
    type Item = Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(PipelineError::io(&self.path, e))),
            };
            self.line_no += 1;

            match self.parse_line(&line) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Vec<Result<RawEntry>> {
        ScriptLiteralReader::new(Cursor::new(text.to_string()), Path::new("item_type.py")).collect()
    }

    #[test]
    fn test_reads_class_constants() {
        let text = "# generated
class CategoryIds(object):
    Ship = 6
    Module = 7  # fitted

class GroupIds:
    Frigate = 25
";
        let entries = parse(text);
        let entries: Vec<_> = entries.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 3);
        match &entries[2] {
            RawEntry::Script { class, name, value } => {
                assert_eq!(class, "GroupIds");
                assert_eq!(name, "Frigate");
                assert_eq!(*value, 25);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_ignores_module_level_and_methods() {
        let text = "VERSION = 3\nclass A:\n    X = 4\n    def f(self):\n        y = self.x\n";
        let entries = parse(text);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_non_integer_constant_is_malformed() {
        let entries = parse("class GroupIds:\n    Frigate = 'abc'\n");
        assert!(matches!(entries[0], Err(PipelineError::MalformedSource { .. })));
    }

    #[test]
    fn test_top_level_line_closes_class() {
        let entries = parse("class A:\n    X = 1\nfoo()\n    Y = 2\n");
        assert_eq!(entries.len(), 1);
    }
}
