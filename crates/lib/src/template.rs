//! Named-placeholder text templates.
//!
//! Placeholders are written `{{NAME}}`. Rendering fails unless the supplied
//! values and the template's placeholders match exactly, so a template and
//! its renderer cannot silently drift apart.
//!
//! ```
//! use std::collections::BTreeMap;
//! use scinstall_lib::template::render;
//!
//! let values = BTreeMap::from([("WHO", "world".to_string())]);
//! assert_eq!(render("hello {{WHO}}", &values).unwrap(), "hello world");
//! ```

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("empty placeholder at position {0}")]
  Empty(usize),

  #[error("no value supplied for placeholder {0}")]
  Missing(String),

  #[error("value supplied for unknown placeholder {0}")]
  Unknown(String),
}

enum Segment<'t> {
  Literal(&'t str),
  Placeholder(&'t str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
  let mut segments = Vec::new();
  let mut rest = template;
  let mut offset = 0;

  while let Some(start) = rest.find(OPEN) {
    if start > 0 {
      segments.push(Segment::Literal(&rest[..start]));
    }

    let after_open = &rest[start + OPEN.len()..];
    let end = after_open
      .find(CLOSE)
      .ok_or(TemplateError::Unclosed(offset + start))?;
    let name = after_open[..end].trim();
    if name.is_empty() {
      return Err(TemplateError::Empty(offset + start));
    }
    segments.push(Segment::Placeholder(name));

    let consumed = start + OPEN.len() + end + CLOSE.len();
    offset += consumed;
    rest = &rest[consumed..];
  }

  if !rest.is_empty() {
    segments.push(Segment::Literal(rest));
  }

  Ok(segments)
}

/// Names of every placeholder `template` declares.
pub fn placeholders(template: &str) -> Result<BTreeSet<&str>, TemplateError> {
  Ok(
    parse(template)?
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Placeholder(name) => Some(name),
        Segment::Literal(_) => None,
      })
      .collect(),
  )
}

/// Substitute `values` into `template`.
///
/// # Errors
///
/// Fails on malformed placeholders, on a placeholder with no value, and on a
/// value whose name the template never mentions.
pub fn render(template: &str, values: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
  let segments = parse(template)?;
  let declared = placeholders(template)?;

  if let Some(unknown) = values.keys().find(|name| !declared.contains(*name)) {
    return Err(TemplateError::Unknown(unknown.to_string()));
  }

  let mut rendered = String::with_capacity(template.len());
  for segment in segments {
    match segment {
      Segment::Literal(text) => rendered.push_str(text),
      Segment::Placeholder(name) => {
        let value = values.get(name).ok_or_else(|| TemplateError::Missing(name.to_string()))?;
        rendered.push_str(value);
      }
    }
  }

  debug!(placeholders = declared.len(), "rendered template");
  Ok(rendered)
}
