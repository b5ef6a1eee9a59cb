//! Text templating for literature notes and citation links.
//!
//! Templates use [upon]'s Mustache-like syntax (`{{ variable }}`,
//! `{{ value|formatter }}`), extended with a few add-ons:
//!
//! - **`slug`**: converts strings to URL-safe slugs, stripping quotation marks
//!   first to avoid artifacts like leading/trailing hyphens.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{{ value|truncate: n }}`.
//!
//! Bibliographic fields are loosely typed, so values that upon would refuse
//! to print are rendered leniently instead: `null` renders as nothing, lists
//! are joined with `", "`, CSL names render as `Given Family` (or their
//! `literal`) and CSL dates render as `YYYY-MM-DD`.
//!
//! A placeholder whose variable is missing from the context is not an error:
//! the tag is emitted verbatim, so `Hello {{ nobody }}` renders as
//! `Hello {{ nobody }}`.
//!
//! # Template Variables
//!
//! | Variable     | Available in   | Description                                 |
//! |--------------|----------------|---------------------------------------------|
//! | `citekey`    | all templates  | Citekey of the entry                        |
//! | `index`      | link templates | 0-based position of the note in the document |
//! | `number`     | link templates | `index + 1`, the human citation number      |
//! | `citeFileID` | link templates | Identifier of the literature note            |
//! | *any field*  | all templates  | Every field of the entry (`title`, `author`, ...) |
//!
//! Entry fields are merged last and win over the synthetic variables above.
//!
//! # Example
//!
//! ```
//! use bibnote_citation::template::{Fields, Template, Value};
//!
//! let template: Template = "[{{ number }}] {{ author }} {{ missing }}".parse().unwrap();
//! let mut fields = Fields::new();
//! fields.insert("number".into(), Value::Integer(2));
//! fields.insert("author".into(), Value::String("Doe".into()));
//! assert_eq!(template.render(&fields).unwrap(), "[2] Doe {{ missing }}");
//! ```

use crate::consts::{EXPRESSION_TAG_REGEX, FOR_BINDING_REGEX, PLACEHOLDER_PATH_REGEX, WITH_BINDING_REGEX};
use crate::error::{Error, ErrorKind, Result};
use bibnote_source::LiteratureEntry;
use exn::ResultExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use upon::Engine;

pub use upon::Value;

/// Render context: variable name to value.
pub type Fields = BTreeMap<String, Value>;

/// Prefix of the variables that carry the literal text of unresolved tags.
const UNRESOLVED_PREFIX: &str = "_bibnote_unresolved_";

/// A `{{ path }}` tag in the template source.
#[derive(Debug, Clone)]
struct Placeholder {
    /// Byte range of the whole tag in the source.
    span: Range<usize>,
    /// Dotted variable path, e.g. `series.name`.
    path: String,
    /// Whitespace control markers (`{{-` / `-}}`) to keep when rewriting.
    trim: (bool, bool),
}

/// A compiled template.
///
/// Constructed via [`FromStr`], which compiles the template eagerly so that
/// syntax errors surface at creation time rather than at render time. The
/// compiled template is reusable across many [`render`](Self::render) calls.
pub struct Template {
    engine: Engine<'static>,
    source: String,
    compiled: upon::Template<'static>,
    placeholders: Vec<Placeholder>,
}
impl FromStr for Template {
    type Err = Error;

    /// Compiles the given template string.
    ///
    /// Returns [`ErrorKind::Template`] if the template syntax is invalid.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        // Compile the template early so we can fail-fast in construction.
        let compiled = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self {
            engine,
            source: s.to_string(),
            compiled,
            placeholders: placeholders(s),
        })
    }
}
impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template").field("source", &self.source).finish_non_exhaustive()
    }
}
impl Template {
    /// The template source as configured.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the template against `fields`.
    ///
    /// Placeholders that cannot be resolved against `fields` are emitted
    /// verbatim. Only genuine render failures (e.g. calling `truncate` on a
    /// number) return [`ErrorKind::Template`].
    pub fn render(&self, fields: &Fields) -> Result<String> {
        let unresolved: Vec<&Placeholder> = self.placeholders.iter().filter(|p| !resolves(fields, &p.path)).collect();
        if unresolved.is_empty() {
            return self.compiled.render(&self.engine, fields).to_string().or_raise(|| ErrorKind::Template);
        }

        // Swap every unresolved tag for a variable holding the tag's own text,
        // then compile the patched source for this render only.
        let mut fields = fields.clone();
        let mut patched = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (n, placeholder) in unresolved.into_iter().enumerate() {
            let name = format!("{UNRESOLVED_PREFIX}{n}");
            let literal = &self.source[placeholder.span.clone()];
            patched.push_str(&self.source[cursor..placeholder.span.start]);
            patched.push_str(if placeholder.trim.0 { "{{- " } else { "{{ " });
            patched.push_str(&name);
            patched.push_str(if placeholder.trim.1 { " -}}" } else { " }}" });
            cursor = placeholder.span.end;
            fields.insert(name, Value::String(literal.to_string()));
        }
        patched.push_str(&self.source[cursor..]);
        tracing::trace!(template = %self.source, patched = %patched, "Rendering with unresolved placeholders");

        let compiled = self.engine.compile(patched).or_raise(|| ErrorKind::Template)?;
        compiled.render(&self.engine, &fields).to_string().or_raise(|| ErrorKind::Template)
    }
}

/// Builds the render context for `entry`: its `citekey` plus every field.
pub(crate) fn entry_fields(entry: &LiteratureEntry) -> Fields {
    let mut fields = Fields::new();
    fields.insert("citekey".to_string(), Value::String(entry.citekey.clone()));
    fields.extend(entry.fields.iter().map(|(name, value)| (name.clone(), to_value(value))));
    fields
}

/// Converts a loosely-typed JSON value into a template value.
///
/// Integers that do not fit an `i64` are carried as floats.
pub fn to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(map.iter().map(|(k, v)| (k.clone(), to_value(v))).collect()),
    }
}

/// Finds every plain variable tag in `source`, skipping tags whose root is
/// bound by a `for` or `with` block inside the template.
fn placeholders(source: &str) -> Vec<Placeholder> {
    let mut bound = BTreeSet::new();
    for captures in FOR_BINDING_REGEX.captures_iter(source) {
        bound.extend(captures.iter().skip(1).flatten().map(|m| m.as_str()));
    }
    for captures in WITH_BINDING_REGEX.captures_iter(source) {
        bound.extend(captures.get(1).map(|m| m.as_str()));
    }

    EXPRESSION_TAG_REGEX
        .captures_iter(source)
        .filter_map(|captures| {
            let tag = captures.get(0)?;
            let path = PLACEHOLDER_PATH_REGEX.captures(captures.get(2)?.as_str())?.get(1)?.as_str();
            let root = path.split('.').next()?;
            if bound.contains(root) || matches!(root, "true" | "false" | "none") {
                return None;
            }
            Some(Placeholder {
                span: tag.range(),
                path: path.to_string(),
                trim: (captures.get(1)?.as_str() == "-", captures.get(3)?.as_str() == "-"),
            })
        })
        .collect()
}

/// Whether the dotted `path` can be looked up in `fields`.
fn resolves(fields: &Fields, path: &str) -> bool {
    let mut segments = path.split('.');
    let Some(mut current) = segments.next().and_then(|root| fields.get(root)) else {
        return false;
    };
    for segment in segments {
        let next = match current {
            Value::Map(map) => map.get(segment),
            Value::List(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return false,
        }
    }
    true
}

/// Custom [`upon`] extensions.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Custom formatter that converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                // Various quotation marks: '"''""„"`«»
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => lenient_formatter(f, v)?,
        };
        Ok(())
    }

    /// Default formatter that never refuses a value.
    fn lenient_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        if let Some(text) = plain_text(value) {
            write!(f, "{text}")?;
        }
        Ok(())
    }

    /// Flattens a value to display text, or `None` if there is nothing to show.
    pub(super) fn plain_text(value: &Value) -> Option<String> {
        match value {
            Value::None => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().filter_map(plain_text).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            },
            Value::Map(map) => csl_name(map).or_else(|| csl_date(map)),
        }
    }

    /// `{"given": "Jane", "family": "Doe"}` or `{"literal": "ACME Corp"}`.
    fn csl_name(map: &std::collections::BTreeMap<String, Value>) -> Option<String> {
        if let Some(Value::String(literal)) = map.get("literal") {
            return Some(literal.clone());
        }
        let parts: Vec<&str> = ["given", "non-dropping-particle", "family", "suffix"]
            .iter()
            .filter_map(|key| match map.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    /// `{"date-parts": [[2020, 5, 1]]}`, falling back to the `raw` date string.
    fn csl_date(map: &std::collections::BTreeMap<String, Value>) -> Option<String> {
        if let Some(Value::List(ranges)) = map.get("date-parts")
            && let Some(Value::List(parts)) = ranges.first()
        {
            let parts: Vec<String> = parts
                .iter()
                .enumerate()
                .filter_map(|(i, part)| {
                    let n = match part {
                        Value::Integer(n) => *n,
                        Value::String(s) => s.trim().parse().ok()?,
                        _ => return None,
                    };
                    Some(if i == 0 { n.to_string() } else { format!("{n:02}") })
                })
                .collect();
            if !parts.is_empty() {
                return Some(parts.join("-"));
            }
        }
        match map.get("raw").or_else(|| map.get("literal")) {
            Some(Value::String(raw)) => Some(raw.clone()),
            _ => None,
        }
    }

    /// Truncates a string to a maximum byte length at a character boundary.
    ///
    /// This prevents cutting UTF-8 characters in the middle, which would produce
    /// invalid strings.
    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    /// Registers the add-ons and the lenient default formatter on the given engine.
    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.set_default_formatter(&lenient_formatter);
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn fields(json: serde_json::Value) -> Fields {
        match to_value(&json) {
            Value::Map(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    fn render(template: &str, json: serde_json::Value) -> String {
        let template: Template = template.parse().unwrap();
        template.render(&fields(json)).unwrap()
    }

    #[test]
    fn test_renders_index_and_author() {
        assert_eq!(render("[{{index}}] {{author}}", json!({"index": 2, "author": "Doe"})), "[2] Doe");
    }

    #[rstest]
    #[case("Hello {{ nobody }}!", "Hello {{ nobody }}!")]
    #[case("{{title}} {{ series.name }}", "T {{ series.name }}")]
    #[case("{{ title }} {{ title.sub }}", "T {{ title.sub }}")]
    #[case("{{- nobody -}}", "{{- nobody -}}")]
    #[case("{{ nobody|slug }}", "{{ nobody|slug }}")]
    fn test_unresolved_placeholders_stay_verbatim(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(render(template, json!({"title": "T"})), expected);
    }

    #[test]
    fn test_loop_variables_are_not_unresolved() {
        let template = "{% for a in author %}{{ a.family }};{% endfor %}";
        let json = json!({"author": [{"family": "Doe"}, {"family": "Roe"}]});
        assert_eq!(render(template, json), "Doe;Roe;");
    }

    #[rstest]
    #[case(json!(null), "")]
    #[case(json!(["a", "b"]), "a, b")]
    #[case(json!([{"given": "Jane", "family": "Doe"}, {"literal": "ACME"}]), "Jane Doe, ACME")]
    #[case(json!({"date-parts": [[2020, 5, 1]]}), "2020-05-01")]
    #[case(json!({"date-parts": [[2019]]}), "2019")]
    #[case(json!({"raw": "Spring 2018"}), "Spring 2018")]
    #[case(json!({"unknown": true}), "")]
    #[case(json!(1.5), "1.5")]
    fn test_lenient_values(#[case] value: serde_json::Value, #[case] expected: &str) {
        assert_eq!(render("{{ value }}", json!({ "value": value })), expected);
    }

    #[test]
    fn test_slug_strips_quotes() {
        assert_eq!(render("{{ title|slug }}", json!({"title": "\"Hello\" World's 'Test'"})), "hello-worlds-test");
    }

    #[test]
    fn test_truncate_filter_function() {
        assert_eq!(render("{{ title|truncate: 10 }}", json!({"title": "A Very Long Title Indeed"})), "A Very Lon");
    }

    #[test]
    fn test_invalid_syntax_fails_fast() {
        let err = "{{ unterminated".parse::<Template>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template));
    }

    #[test]
    fn test_large_integers_become_floats() {
        assert!(matches!(to_value(&json!(u64::MAX)), Value::Float(_)));
        assert!(matches!(to_value(&json!(-3)), Value::Integer(-3)));
    }
}
