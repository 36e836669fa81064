use crate::document::{Element, Fragment};
use crate::error::{CodecError, CodecResult};

const SUBTREE: &str = "subtree";

/// Filter attached to `<get>` and `<get-config>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Filter {
    /// Subtree filter, see [RFC6241 6](https://www.rfc-editor.org/rfc/rfc6241.html#section-6).
    /// The content may hold several sibling match expressions.
    Subtree(Fragment),
}

impl Filter {
    /// Parses `content` as subtree filter text.
    ///
    /// Fails with [`CodecError::MalformedFilter`] when the text is not a
    /// well-formed fragment.
    pub fn subtree(content: &str) -> CodecResult<Filter> {
        let content = Fragment::parse(content.trim()).map_err(|err| match err {
            CodecError::MalformedDocument(msg) => CodecError::MalformedFilter(msg),
            other => other,
        })?;
        Ok(Filter::Subtree(content))
    }

    pub fn filter_type(&self) -> &'static str {
        match self {
            Filter::Subtree(_) => SUBTREE,
        }
    }

    pub fn content(&self) -> &Fragment {
        match self {
            Filter::Subtree(content) => content,
        }
    }

    /// Wraps the filter content in a single `<filter type="...">` element.
    pub fn build(&self) -> Element {
        Element::new("filter")
            .with_attribute("type", self.filter_type())
            .with_content(self.content().clone())
    }

    /// Reads a `<filter>` element; a missing `type` attribute means subtree.
    pub fn from_element(element: &Element) -> CodecResult<Filter> {
        match element.attribute("type").unwrap_or(SUBTREE) {
            SUBTREE => Ok(Filter::Subtree(element.content())),
            other => Err(CodecError::MalformedFilter(format!(
                "unsupported filter type '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_wraps_sibling_roots() {
        let filter = Filter::subtree("<users/>\n<groups/>").unwrap();
        let element = filter.build();
        assert_eq!(element.name(), "filter");
        assert_eq!(element.attribute("type"), Some("subtree"));
        let names: Vec<&str> = element.elements().map(Element::name).collect();
        assert_eq!(names, vec!["users", "groups"]);
    }

    #[test]
    fn test_malformed_filter() {
        match Filter::subtree("<top><users></top>") {
            Err(CodecError::MalformedFilter(_)) => {}
            other => panic!("expected MalformedFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_from_element_roundtrip() {
        let filter = Filter::subtree(
            r#"<top xmlns="https://example.com/schema/1.2/config"><users><user><name>fred</name></user></users></top>"#,
        )
        .unwrap();
        assert_eq!(Filter::from_element(&filter.build()).unwrap(), filter);
    }

    #[test]
    fn test_unsupported_filter_type() {
        let element = Element::new("filter")
            .with_attribute("type", "xpath")
            .with_attribute("select", "/top");
        assert!(matches!(
            Filter::from_element(&element),
            Err(CodecError::MalformedFilter(_))
        ));
    }
}
