use super::{Document, NodeData, NodeId};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta", "source", "wbr"];

/// Elements whose text children are emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Document {
    /// Markup for `node` including its own tag.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, false, &mut out);
        out
    }

    /// Markup for the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let raw = self
            .tag(node)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, raw_text: bool, out: &mut String) {
        match self.data(node) {
            None => {}
            Some(NodeData::Document) => {
                for &child in self.children(node) {
                    self.write_node(child, false, out);
                }
            }
            Some(NodeData::Text(text)) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(text));
                }
            }
            Some(NodeData::Element(element)) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(node));
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}
