use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Every `{{ ... }}` expression tag, keeping the whitespace control markers.
regex!(EXPRESSION_TAG_REGEX, r"\{\{(-?)\s*(.*?)\s*(-?)\}\}");
// A plain variable path at the start of an expression, optionally followed by formatters.
regex!(PLACEHOLDER_PATH_REGEX, r"^([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*(?:$|\|)");
// Names bound inside the template itself rather than by the render context.
regex!(FOR_BINDING_REGEX, r"\{%-?\s*for\s+([A-Za-z_]\w*)(?:\s*,\s*([A-Za-z_]\w*))?\s+in\s");
regex!(WITH_BINDING_REGEX, r"\{%-?\s*with\s.*?\sas\s+([A-Za-z_]\w*)\s*-?%\}");
// Link-only sub-template embedded in a link template: `((<key>"<inner>"))`.
regex!(SUB_TEMPLATE_REGEX, r#"\(\((.*?)"(.*?)"\)\)"#);
regex!(CITE_FILE_ID_REGEX, r"\{\{-?\s*citeFileID\s*-?\}\}");
