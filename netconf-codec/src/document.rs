//! Minimal element tree over quick-xml events.
//!
//! quick-xml only offers a pull parser and an event writer, so messages with
//! opaque payloads (`<config>`, `<data>`, `<filter>`) are kept as a small owned
//! tree. An [`Element`] always has exactly one root; a [`Fragment`] is an
//! ordered list of sibling nodes without a common root.
use crate::error::{CodecError, CodecResult};
use core::fmt;
use core::fmt::Display;
use log::trace;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const INDENT_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Element {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parses `text` as a complete document with a single root element.
    pub fn parse(text: &str) -> CodecResult<Element> {
        let mut nodes = read_nodes(text)?.into_iter();
        let root = match nodes.next() {
            Some(Node::Element(root)) => root,
            Some(Node::Text(_)) => {
                return Err(CodecError::malformed("text content outside of root element"))
            }
            None => return Err(CodecError::malformed("document has no root element")),
        };
        if nodes.next().is_some() {
            return Err(CodecError::malformed("document has more than one root"));
        }
        Ok(root)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Element {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Element {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends `child` only when it is present.
    pub fn with_optional_child(self, child: Option<Element>) -> Element {
        match child {
            Some(child) => self.with_child(child),
            None => self,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Element {
        let text = text.into();
        if !text.is_empty() {
            self.children.push(Node::Text(text));
        }
        self
    }

    pub fn with_content(mut self, content: Fragment) -> Element {
        self.children.extend(content.0);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order, text nodes skipped.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn first_element(&self) -> Option<&Element> {
        self.elements().next()
    }

    /// First child element with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.elements()
            .find(|element| element.local_name() == local_name)
    }

    pub fn children_named<'a, 'n>(
        &'a self,
        local_name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + 'n
    where
        'a: 'n,
    {
        self.elements()
            .filter(move |element| element.local_name() == local_name)
    }

    /// Concatenated text of the direct text children, kept verbatim.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(value) = node {
                text.push_str(value);
            }
        }
        text
    }

    /// Text content read as a protocol token (datastore, enum or id value),
    /// surrounding whitespace removed.
    pub fn token(&self) -> String {
        self.text().trim().to_string()
    }

    /// Children of this element as a detached fragment.
    pub fn content(&self) -> Fragment {
        Fragment(self.children.clone())
    }

    pub fn into_content(self) -> Fragment {
        Fragment(self.children)
    }

    /// Pretty-formatted document text with an XML declaration.
    pub fn to_document(&self) -> CodecResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

/// Ordered sibling nodes with no common root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment(Vec<Node>);

impl Fragment {
    pub fn new() -> Fragment {
        Fragment(Vec::new())
    }

    /// Parses text that may hold several top-level elements.
    pub fn parse(text: &str) -> CodecResult<Fragment> {
        Ok(Fragment(read_nodes(text)?))
    }

    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Fragment {
        Fragment(elements.into_iter().map(Node::Element).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.0
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.0.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn push(&mut self, element: Element) {
        self.0.push(Node::Element(element));
    }

    pub fn to_text(&self) -> CodecResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
        for node in &self.0 {
            write_node(&mut writer, node)?;
        }
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_text().map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}

impl From<Element> for Fragment {
    fn from(element: Element) -> Self {
        Fragment(vec![Node::Element(element)])
    }
}

fn read_nodes(text: &str) -> CodecResult<Vec<Node>> {
    trace!("Parsing document:\n{}", text);
    let mut reader = Reader::from_str(text);

    let mut open: Vec<Element> = Vec::new();
    let mut top: Vec<Node> = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| CodecError::malformed(err.to_string()))?;
        match event {
            Event::Start(start) => open.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut open, &mut top, Node::Element(element));
            }
            Event::End(end) => {
                let element = open.pop().ok_or_else(|| {
                    CodecError::malformed(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                attach(&mut open, &mut top, Node::Element(element));
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| CodecError::malformed(err.to_string()))?;
                // whitespace-only runs are indentation, any other text is content
                if !text.trim().is_empty() {
                    attach(&mut open, &mut top, Node::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|err| CodecError::malformed(err.to_string()))?;
                attach(&mut open, &mut top, Node::Text(text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(CodecError::malformed(format!(
            "element <{}> is not closed",
            element.name
        )));
    }
    Ok(top)
}

fn attach(open: &mut [Element], top: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn element_from_start(start: &BytesStart) -> CodecResult<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| CodecError::malformed(err.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| CodecError::malformed(err.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|err| CodecError::malformed(err.to_string()))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|err| CodecError::malformed(err.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> CodecResult<()> {
    match node {
        Node::Element(element) => write_element(writer, element),
        Node::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text.as_str())))?;
            Ok(())
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> CodecResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for node in &element.children {
        write_node(writer, node)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
