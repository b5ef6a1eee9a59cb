//! Citation link generation.

use crate::Context;
use crate::consts::{CITE_FILE_ID_REGEX, SUB_TEMPLATE_REGEX};
use crate::error::{ErrorKind, Result};
use crate::marker::format_marker;
use crate::template::{self, Fields, Template, Value};
use exn::ResultExt;
use tracing::instrument;

/// Which part of the link template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// The whole link template; the result is the marker's anchor text.
    Full,
    /// Only the inner template of the last `((<key>"<inner>"))` whose key
    /// refers to `{{ citeFileID }}`. Used when the link template writes its
    /// own markers around custom text.
    LinkOnly,
}
impl LinkMode {
    pub fn for_config(custom_cite_text: bool) -> Self {
        if custom_cite_text { Self::LinkOnly } else { Self::Full }
    }
}

/// Compile the inner template of the link-only sub-template in
/// `link_template`, if there is one.
pub(crate) fn link_only_template(link_template: &str) -> Result<Option<Template>> {
    SUB_TEMPLATE_REGEX
        .captures_iter(link_template)
        .filter(|captures| captures.get(1).is_some_and(|key| CITE_FILE_ID_REGEX.is_match(key.as_str())))
        .filter_map(|captures| captures.get(2))
        .last()
        .map(|inner| inner.as_str().parse())
        .transpose()
}

/// Render the link text citing `citekey` at citation `index`.
///
/// Returns `Ok(None)` (after a single error notice) when the data source has
/// no entry for `citekey`. An empty string means the configured template has
/// nothing to render for `mode`.
#[instrument(skip_all, fields(citekey = %citekey, index = index))]
pub async fn generate_link(ctx: &Context, citekey: &str, index: usize, mode: LinkMode) -> Result<Option<String>> {
    let Some(entry) = ctx.source.entry(citekey).await.or_raise(|| ErrorKind::Source)? else {
        ctx.notifier.error(&format!("No literature entry found for citekey \"{citekey}\""));
        return Ok(None);
    };
    let template = match mode {
        LinkMode::Full => &ctx.templates.link,
        LinkMode::LinkOnly => match &ctx.templates.link_only {
            Some(template) => template,
            None => {
                tracing::debug!("Link template has no link-only sub-template");
                return Ok(Some(String::new()));
            },
        },
    };
    let note_id = ctx.index.lookup(citekey).unwrap_or_default();
    let mut fields = Fields::from([
        ("index".to_string(), Value::Integer(as_integer(index))),
        ("number".to_string(), Value::Integer(as_integer(index).saturating_add(1))),
        ("citeFileID".to_string(), Value::String(note_id)),
    ]);
    // Entry fields win over the synthetic ones.
    fields.extend(template::entry_fields(&entry));
    template.render(&fields).map(Some)
}

/// Turn a rendered link into the text inserted into a document.
///
/// With custom cite text the link template already carries its markers, so
/// the link is returned unchanged.
pub fn generate_cite_ref(ctx: &Context, note_id: &str, link: &str) -> String {
    if ctx.config.custom_cite_text { link.to_string() } else { format_marker(note_id, link) }
}

fn as_integer(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};
    use bibnote_source::backend::MockSource;
    use rstest::rstest;

    fn fixture(link_template: &str, custom_cite_text: bool) -> Fixture {
        let config = bibnote_config::ReferenceConfig {
            link_template: link_template.to_string(),
            custom_cite_text,
            ..testing::reference_config()
        };
        let source = MockSource::with_entries([testing::entry("doe2020", "On Things", "Doe")]);
        let fixture = Fixture::with_config(config, source, testing::store());
        fixture.ctx.index().register("doe2020", "n1");
        fixture
    }

    #[tokio::test]
    async fn test_full_link_and_cite_ref() {
        let fixture = fixture("[{{ number }}] {{ author }}", false);
        let link = generate_link(&fixture.ctx, "doe2020", 1, LinkMode::Full).await.unwrap().unwrap();
        assert_eq!(link, "[2] Doe");
        assert_eq!(generate_cite_ref(&fixture.ctx, "n1", &link), r#"((n1 "[2] Doe"))"#);
    }

    #[tokio::test]
    async fn test_custom_cite_text() {
        let template = r#"see (({{ citeFileID }} "{{ citekey }}, {{ number }}"))"#;
        let fixture = fixture(template, true);
        let full = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::Full).await.unwrap().unwrap();
        assert_eq!(full, r#"see ((n1 "doe2020, 1"))"#);
        assert_eq!(generate_cite_ref(&fixture.ctx, "n1", &full), full);
        let inner = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::LinkOnly).await.unwrap().unwrap();
        assert_eq!(inner, "doe2020, 1");
    }

    #[tokio::test]
    async fn test_link_only_without_sub_template() {
        let fixture = fixture("[{{ number }}]", true);
        let link = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::LinkOnly).await.unwrap();
        assert_eq!(link.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_missing_entry_notifies_once() {
        let fixture = fixture("[{{ number }}]", false);
        let link = generate_link(&fixture.ctx, "unknown", 0, LinkMode::Full).await.unwrap();
        assert_eq!(link, None);
        assert_eq!(fixture.notices.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let config = testing::reference_config();
        let source = MockSource::with_entries([testing::entry("doe2020", "T", "Doe")]).with_failing("doe2020");
        let fixture = Fixture::with_config(config, source, testing::store());
        let err = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::Full).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Source));
        assert!(fixture.notices.errors().is_empty());
    }

    #[tokio::test]
    async fn test_entry_is_fetched_per_render() {
        let fixture = fixture("[{{ number }}] {{ title }}", false);
        let before = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::Full).await.unwrap();
        fixture.source.upsert(testing::entry("doe2020", "Revised", "Doe")).await;
        let after = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::Full).await.unwrap();
        assert_eq!(before.as_deref(), Some("[1] On Things"));
        assert_eq!(after.as_deref(), Some("[1] Revised"));
        assert_eq!(fixture.source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_entry_fields_override_synthetic_fields() {
        let config = testing::reference_config();
        let source = MockSource::with_entries([testing::entry("doe2020", "T", "Doe").with_field("number", "IV")]);
        let fixture = Fixture::with_config(config, source, testing::store());
        let link = generate_link(&fixture.ctx, "doe2020", 0, LinkMode::Full).await.unwrap().unwrap();
        assert_eq!(link, "[IV] Doe");
    }

    #[rstest]
    #[case(r#"(({{citeFileID}} "{{ title }}"))"#, Some("{{ title }}"))]
    #[case(r#"((a "x")) (({{ citeFileID }} "first")) (({{citeFileID}} "last"))"#, Some("last"))]
    #[case(r#"((other "{{ title }}"))"#, None)]
    #[case("[{{ number }}]", None)]
    fn test_link_only_template(#[case] link_template: &str, #[case] expected: Option<&str>) {
        let template = link_only_template(link_template).unwrap();
        assert_eq!(template.as_ref().map(Template::source), expected);
    }

    #[rstest]
    #[case(false, LinkMode::Full)]
    #[case(true, LinkMode::LinkOnly)]
    fn test_mode_for_config(#[case] custom_cite_text: bool, #[case] expected: LinkMode) {
        assert_eq!(LinkMode::for_config(custom_cite_text), expected);
    }
}
