//! Minimal element tree for descriptor files.
//!
//! Descriptors only use elements and text: attributes, comments and
//! processing instructions are ignored. Text and CDATA sections of an element
//! are concatenated in document order.
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use vulsim_utils::{Error, VulResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub tag: String,
    /// Text content, `None` when the element has no text at all.
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn new(tag: String) -> Self {
        Self {
            tag,
            text: None,
            children: Vec::new(),
        }
    }

    /// Parse a document and return its root element.
    pub fn parse_str(src: &str) -> VulResult<Self> {
        let mut reader = Reader::from_str(src);
        reader.trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;
        loop {
            let event = reader.read_event().map_err(|e| {
                Error::malformed_descriptor(format!(
                    "XML error at byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;
            match event {
                Event::Start(start) => {
                    let tag = String::from_utf8_lossy(start.name().as_ref())
                        .into_owned();
                    stack.push(XmlNode::new(tag));
                }
                Event::Empty(empty) => {
                    let tag = String::from_utf8_lossy(empty.name().as_ref())
                        .into_owned();
                    Self::attach(&mut stack, &mut root, XmlNode::new(tag))?;
                }
                Event::End(_) => {
                    let node = stack.pop().ok_or_else(|| {
                        Error::malformed_descriptor("unbalanced closing tag")
                    })?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| {
                        Error::malformed_descriptor(format!(
                            "XML escape error: {e}"
                        ))
                    })?;
                    Self::push_text(&mut stack, &text);
                }
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    Self::push_text(&mut stack, &String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::malformed_descriptor(
                "unexpected end of document",
            ));
        }
        root.ok_or_else(|| Error::malformed_descriptor("empty document"))
    }

    fn attach(
        stack: &mut [XmlNode],
        root: &mut Option<XmlNode>,
        node: XmlNode,
    ) -> VulResult<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_none() => *root = Some(node),
            None => {
                return Err(Error::malformed_descriptor(
                    "document has more than one root element",
                ));
            }
        }
        Ok(())
    }

    fn push_text(stack: &mut [XmlNode], text: &str) {
        // Text outside of the root element is ignored.
        if let Some(node) = stack.last_mut() {
            node.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in document order.
    pub fn children_named<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Trimmed text content; empty when the element has none.
    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }
}
