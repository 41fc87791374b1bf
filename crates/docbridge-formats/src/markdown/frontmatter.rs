//! Front-matter extraction

use docbridge_core::{ConvertError, ConvertResult, Metadata};
use serde_json::Value;

/// Front-matter syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrontmatterFormat {
    Yaml,
    Toml,
}

impl FrontmatterFormat {
    fn fence(&self) -> &'static str {
        match self {
            FrontmatterFormat::Yaml => "---",
            FrontmatterFormat::Toml => "+++",
        }
    }
}

/// Raw front-matter split off the top of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frontmatter<'a> {
    pub format: FrontmatterFormat,
    pub raw: &'a str,
    /// Byte offset where the body starts
    pub body_offset: usize,
}

/// Split front-matter off the start of `content`
///
/// The opening fence must be the first line and the closing fence a line of its own.
/// Without a closing fence the whole input is body.
pub(crate) fn split(content: &str) -> Option<Frontmatter<'_>> {
    let format = [FrontmatterFormat::Yaml, FrontmatterFormat::Toml]
        .into_iter()
        .find(|format| first_line(content) == Some(format.fence()))?;
    let fence = format.fence();

    let raw_start = content.find('\n')? + 1;
    let mut line_start = raw_start;
    while line_start <= content.len() {
        let line_end = content[line_start..]
            .find('\n')
            .map_or(content.len(), |idx| line_start + idx);
        let line = content[line_start..line_end].trim_end_matches('\r');
        if line == fence {
            let body_offset = (line_end + 1).min(content.len());
            return Some(Frontmatter {
                format,
                raw: &content[raw_start..line_start],
                body_offset,
            });
        }
        if line_end == content.len() {
            break;
        }
        line_start = line_end + 1;
    }

    None
}

fn first_line(content: &str) -> Option<&str> {
    let end = content.find('\n')?;
    Some(content[..end].trim_end_matches('\r'))
}

impl Frontmatter<'_> {
    /// Parse into key/value pairs and apply them to `metadata`
    pub fn apply_to(&self, metadata: &mut Metadata) -> ConvertResult<()> {
        let value = match self.format {
            FrontmatterFormat::Yaml => {
                if self.raw.trim().is_empty() {
                    return Ok(());
                }
                serde_yaml::from_str::<Value>(self.raw)
                    .map_err(|e| ConvertError::frontmatter(format!("invalid YAML: {e}")))?
            }
            FrontmatterFormat::Toml => {
                let table = toml::from_str::<toml::Table>(self.raw)
                    .map_err(|e| ConvertError::frontmatter(format!("invalid TOML: {e}")))?;
                toml_to_json(toml::Value::Table(table))
            }
        };

        match value {
            Value::Object(fields) => {
                for (key, value) in fields {
                    metadata.apply_field(&key, value);
                }
                Ok(())
            }
            Value::Null => Ok(()),
            _ => Err(ConvertError::frontmatter("front-matter is not a mapping")),
        }
    }
}

/// Convert TOML to JSON, rendering datetimes as their TOML text
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
