//! Preview document tree.
//!
//! The preview is HTML in a controlled subset: block containers (`div`,
//! `section`, `aside`, `header`, `p`, `h1`–`h4`) and inline runs (`span`,
//! `strong`, `em`), styled through `class` and `style` attributes. The tree is
//! live: elements can be looked up by `id`, their inline style edited, and
//! probe elements appended and removed, which is all the export pipeline and
//! the color probe need from a "rendering environment".

use std::collections::BTreeMap;
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    Section,
    Aside,
    Header,
    P,
    H1,
    H2,
    H3,
    H4,
    Span,
    Strong,
    Em,
    Br,
    Body,
    Html,
    Head,
    /// Unknown tags are kept in the tree but never rendered.
    Unknown(String),
}

impl Tag {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "section" => Tag::Section,
            "aside" => Tag::Aside,
            "header" => Tag::Header,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "span" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "br" => Tag::Br,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            other => Tag::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::Section => "section",
            Tag::Aside => "aside",
            Tag::Header => "header",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::Br => "br",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Unknown(name) => name,
        }
    }

    /// Elements whose inline children are merged into one wrapped text run.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            Tag::P | Tag::H1 | Tag::H2 | Tag::H3 | Tag::H4 | Tag::Div
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Tag::Span | Tag::Strong | Tag::Em | Tag::Br)
    }

    fn is_void(&self) -> bool {
        matches!(self, Tag::Br) || matches!(self, Tag::Unknown(n) if is_void_name(n))
    }
}

fn is_void_name(name: &str) -> bool {
    matches!(name, "img" | "meta" | "link" | "hr" | "input")
}

/// A node in the preview tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    /// Value of one declaration in the inline `style` attribute.
    pub fn style_property(&self, name: &str) -> Option<String> {
        let style = self.inline_style()?;
        style_declarations(style)
            .into_iter()
            .rev()
            .find(|(prop, _)| prop.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Set (or, with `None`, remove) one inline style declaration, keeping the
    /// other declarations in order.
    pub fn set_style_property(&mut self, name: &str, value: Option<&str>) {
        let mut decls = self
            .inline_style()
            .map(style_declarations)
            .unwrap_or_default();
        decls.retain(|(prop, _)| !prop.eq_ignore_ascii_case(name));
        if let Some(value) = value {
            decls.push((name.to_string(), value.to_string()));
        }

        if decls.is_empty() {
            self.attributes.remove("style");
        } else {
            let joined = decls
                .iter()
                .map(|(p, v)| format!("{p}: {v}"))
                .collect::<Vec<_>>()
                .join("; ");
            self.attributes.insert("style".to_string(), joined);
        }
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Split an inline style string into `(property, value)` pairs.
pub fn style_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            let value = value.trim();
            if prop.is_empty() {
                None
            } else {
                Some((prop.to_ascii_lowercase(), value.to_string()))
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A parsed preview document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Top-level nodes (the `<body>` children when a body is present).
    pub nodes: Vec<DomNode>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            nodes: body_children(&parse_html(html)),
        }
    }

    pub fn element_by_id(&self, id: &str) -> Option<&ElementNode> {
        find_by_id(&self.nodes, id)
    }

    pub fn element_by_id_mut(&mut self, id: &str) -> Option<&mut ElementNode> {
        find_by_id_mut(&mut self.nodes, id)
    }

    /// Append an element at the end of the document body.
    pub fn append(&mut self, element: ElementNode) {
        self.nodes.push(DomNode::Element(element));
    }

    /// Detach the first element with the given id, wherever it is.
    pub fn remove_by_id(&mut self, id: &str) -> Option<ElementNode> {
        remove_by_id(&mut self.nodes, id)
    }

    /// Serialise back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        out
    }
}

fn find_by_id<'a>(nodes: &'a [DomNode], id: &str) -> Option<&'a ElementNode> {
    nodes.iter().find_map(|node| match node {
        DomNode::Element(e) if e.id() == Some(id) => Some(e),
        DomNode::Element(e) => find_by_id(&e.children, id),
        DomNode::Text(_) => None,
    })
}

fn find_by_id_mut<'a>(nodes: &'a mut [DomNode], id: &str) -> Option<&'a mut ElementNode> {
    for node in nodes.iter_mut() {
        if let DomNode::Element(e) = node {
            if e.id() == Some(id) {
                return Some(e);
            }
            if let Some(found) = find_by_id_mut(&mut e.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_by_id(nodes: &mut Vec<DomNode>, id: &str) -> Option<ElementNode> {
    let pos = nodes
        .iter()
        .position(|n| matches!(n, DomNode::Element(e) if e.id() == Some(id)));
    if let Some(pos) = pos {
        if let DomNode::Element(e) = nodes.remove(pos) {
            return Some(e);
        }
    }
    nodes.iter_mut().find_map(|node| match node {
        DomNode::Element(e) => remove_by_id(&mut e.children, id),
        DomNode::Text(_) => None,
    })
}

fn write_node(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Text(t) => out.push_str(&escape_text(t)),
        DomNode::Element(e) => {
            let name = e.tag.name();
            out.push('<');
            out.push_str(name);
            for (key, value) in &e.attributes {
                let _ = write!(out, " {key}=\"{}\"", escape_attr(value));
            }
            out.push('>');
            if e.tag.is_void() {
                return;
            }
            for child in &e.children {
                write_node(child, out);
            }
            let _ = write!(out, "</{name}>");
        }
    }
}

/// Escape text for an HTML text node.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for a double-quoted HTML attribute value.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over the controlled subset
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_until(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(offset) => self.pos += offset + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            // Whitespace-only runs between tags carry no content.
            let saved = self.pos;
            self.skip_whitespace();
            if !self.eof() && !self.starts_with("<") {
                self.pos = saved;
            }

            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_until("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_until(">");
            return None;
        }
        if self.starts_with("<") {
            Some(DomNode::Element(self.parse_element()))
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let end = self.rest().find('<').unwrap_or(self.rest().len());
        let text = &self.rest()[..end];
        self.pos += end;
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> ElementNode {
        self.bump(); // '<'
        let name = self.parse_name();
        let mut elem = ElementNode::new(Tag::parse(&name));

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if !key.is_empty() {
                elem.attributes.insert(key.to_ascii_lowercase(), value);
            }
            if self.pos == before {
                // Stray character inside the tag; skip it.
                self.bump();
            }
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return elem;
        }
        if self.starts_with(">") {
            self.bump();
        }
        if elem.tag.is_void() {
            return elem;
        }

        elem.children = self.parse_nodes();

        if self.starts_with("</") {
            self.pos += 2;
            self.parse_name();
            self.skip_until(">");
        }
        elem
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':')
        {
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.bump();
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        match self.peek() {
            Some(quote) if quote == '"' || quote == '\'' => {
                self.bump();
                let end = self.rest().find(quote).unwrap_or(self.rest().len());
                let raw = &self.rest()[..end];
                self.pos += end;
                self.bump(); // closing quote
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != '>' && c != '/')
                {
                    self.bump();
                }
                decode_entities(&self.input[start..self.pos])
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            decode_entity(entity).map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}
