use ego_tree::{NodeId, NodeRef, Tree};
use kmz_core::directory_of;
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Document,
    /// Element by local name (namespace prefix dropped).
    Element(String),
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
    #[error("entity error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("element <{0}> is never closed")]
    Unclosed(String),
    #[error("document has no root element")]
    NoRootElement,
}

/// One XML document from the archive, immutable after parsing.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    path: String,
    tree: Tree<XmlNode>,
}

impl ParsedDocument {
    pub fn parse(path: impl Into<String>, xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        let mut tree = Tree::new(XmlNode::Document);
        let root = tree.root().id();
        let mut open: Vec<NodeId> = vec![root];

        loop {
            let parent = open.last().copied().unwrap_or(root);
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if let Some(id) = append(&mut tree, parent, XmlNode::Element(name)) {
                        open.push(id);
                    }
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    append(&mut tree, parent, XmlNode::Element(name));
                }
                Event::End(_) => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
                Event::Text(t) => push_text(&mut tree, parent, &t.decode()?),
                Event::CData(c) => push_text(&mut tree, parent, &c.decode()?),
                Event::GeneralRef(r) => {
                    let entity = format!("&{};", r.decode()?);
                    push_text(&mut tree, parent, &quick_xml::escape::unescape(&entity)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(&unclosed) = open.get(1) {
            let name = match tree.get(unclosed).map(|node| node.value()) {
                Some(XmlNode::Element(name)) => name.clone(),
                _ => String::new(),
            };
            return Err(DocumentError::Unclosed(name));
        }
        if !tree
            .root()
            .children()
            .any(|child| matches!(child.value(), XmlNode::Element(_)))
        {
            return Err(DocumentError::NoRootElement);
        }

        Ok(Self {
            path: path.into(),
            tree,
        })
    }

    /// Archive path this document was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directory of [`Self::path`], including the trailing `/`.
    pub fn directory(&self) -> &str {
        directory_of(&self.path)
    }

    /// All elements with local name `tag`, at any depth, in document order.
    pub fn elements_by_tag<'a, 't>(&'a self, tag: &'t str) -> impl Iterator<Item = Element<'a>> + 't
    where
        'a: 't,
    {
        self.tree
            .root()
            .descendants()
            .filter_map(move |node| Element::named(node, tag))
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<Element<'_>> {
        self.elements_by_tag(tag).next()
    }
}

/// Borrowed view of one element of a [`ParsedDocument`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    node: NodeRef<'a, XmlNode>,
}

impl<'a> Element<'a> {
    fn named(node: NodeRef<'a, XmlNode>, tag: &str) -> Option<Self> {
        match node.value() {
            XmlNode::Element(name) if name == tag => Some(Self { node }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'a str {
        match self.node.value() {
            XmlNode::Element(name) => name,
            _ => "",
        }
    }

    /// Matching elements below this one (not including itself), in document order.
    pub fn descendants_by_tag<'t>(&self, tag: &'t str) -> impl Iterator<Item = Element<'a>> + 't
    where
        'a: 't,
    {
        self.node
            .descendants()
            .skip(1)
            .filter_map(move |node| Element::named(node, tag))
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<Element<'a>> {
        self.descendants_by_tag(tag).next()
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        self.node
            .descendants()
            .filter_map(|node| match node.value() {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Trimmed text of the first descendant named `tag`; `None` when absent or blank.
    pub fn first_text(&self, tag: &str) -> Option<String> {
        self.first_by_tag(tag)
            .map(|element| element.text().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

fn append(tree: &mut Tree<XmlNode>, parent: NodeId, value: XmlNode) -> Option<NodeId> {
    tree.get_mut(parent).map(|mut node| node.append(value).id())
}

/// Text outside the root element is dropped; adjacent runs are merged so
/// entity references do not split a value.
fn push_text(tree: &mut Tree<XmlNode>, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    let Some(mut node) = tree.get_mut(parent) else {
        return;
    };
    if matches!(node.value(), XmlNode::Document) {
        return;
    }
    if let Some(mut last) = node.last_child() {
        if let XmlNode::Text(existing) = last.value() {
            existing.push_str(text);
            return;
        }
    }
    node.append(XmlNode::Text(text.to_string()));
}

#[cfg(test)]
mod tests {
    use super::{DocumentError, ParsedDocument};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Top &amp; level</name>
    <Folder>
      <NetworkLink><name>One</name><Link><href>one.kml</href></Link></NetworkLink>
    </Folder>
    <NetworkLink><name><![CDATA[Two]]></name><Link><href>two.kml</href></Link></NetworkLink>
  </Document>
</kml>"#;

    #[test]
    fn elements_are_found_at_any_depth_in_order() {
        let doc = ParsedDocument::parse("doc.kml", SAMPLE).unwrap();
        let names: Vec<_> = doc
            .elements_by_tag("NetworkLink")
            .map(|link| link.first_text("name").unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["One", "Two"]);
    }

    #[test]
    fn entities_and_cdata_become_text() {
        let doc = ParsedDocument::parse("doc.kml", SAMPLE).unwrap();
        let document = doc.first_by_tag("Document").unwrap();
        assert_eq!(document.first_text("name").as_deref(), Some("Top & level"));
    }

    #[test]
    fn prefixed_names_match_on_local_name() {
        let xml = r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2"><kml:LatLonBox/></kml:kml>"#;
        let doc = ParsedDocument::parse("doc.kml", xml).unwrap();
        assert_eq!(doc.elements_by_tag("LatLonBox").count(), 1);
        assert_eq!(doc.first_by_tag("kml").unwrap().name(), "kml");
    }

    #[test]
    fn element_queries_exclude_the_element_itself() {
        let xml = "<a><a><a/></a></a>";
        let doc = ParsedDocument::parse("x.kml", xml).unwrap();
        let outer = doc.first_by_tag("a").unwrap();
        assert_eq!(doc.elements_by_tag("a").count(), 3);
        assert_eq!(outer.descendants_by_tag("a").count(), 2);
    }

    #[test]
    fn directory_comes_from_path() {
        let doc = ParsedDocument::parse("files/sub/a.kml", "<kml/>").unwrap();
        assert_eq!(doc.path(), "files/sub/a.kml");
        assert_eq!(doc.directory(), "files/sub/");
        let top = ParsedDocument::parse("a.kml", "<kml/>").unwrap();
        assert_eq!(top.directory(), "");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(ParsedDocument::parse("x.kml", "<kml><a></b></kml>").is_err());
        assert!(ParsedDocument::parse("x.kml", "<kml><Document>").is_err());
        assert!(matches!(
            ParsedDocument::parse("x.kml", "   "),
            Err(DocumentError::NoRootElement)
        ));
    }
}
