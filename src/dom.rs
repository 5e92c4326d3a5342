//! Markup parser – converts an HTML string into a simple DOM tree.
//!
//! We support the controlled subset the content template emits:
//! - Structural: section, footer, div, p, h1-h3, ul, li, table, tr, td, th, img
//! - Inline: span
//! - Document shell: html, head, body, style, title, meta (head content is
//!   parsed for well-formedness but never laid out)
//! - Styling via `class` and `style` attributes
//!
//! Unlike a browser, the parser is strict about nesting: a closing tag that
//! does not match the open element, or an element left open at end of input,
//! is a [`MarkupError`]. The engine surfaces that as a load failure.

use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Section,
    Footer,
    Div,
    P,
    H1,
    H2,
    H3,
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Td,
    Th,
    Span,
    Img,
    Br,
    Body,
    Html,
    Head,
    Style,
    Title,
    Meta,
    /// Catch-all for unknown tags – they are kept but never rendered.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "section" => Tag::Section,
            "footer" => Tag::Footer,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "img" => Tag::Img,
            "br" => Tag::Br,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            "style" => Tag::Style,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Img | Tag::Br | Tag::Meta)
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Tag::H1 | Tag::H2 | Tag::H3)
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Tag::Span)
    }

    pub fn is_table_part(&self) -> bool {
        matches!(self, Tag::Table | Tag::Tr | Tag::Td | Tag::Th)
    }

    fn name(&self) -> &str {
        match self {
            Tag::Section => "section",
            Tag::Footer => "footer",
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::Img => "img",
            Tag::Br => "br",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Style => "style",
            Tag::Title => "title",
            Tag::Meta => "meta",
            Tag::Unknown(name) => name,
        }
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }
}

/// A well-formedness error found while parsing markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// `</found>` closed an element opened as `<expected>`.
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },
    /// An element was still open at end of input.
    Unclosed { tag: String, offset: usize },
    /// A closing tag with nothing open.
    StrayClose { found: String, offset: usize },
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupError::MismatchedClose {
                expected,
                found,
                offset,
            } => write!(f, "byte {offset}: </{found}> closes <{expected}>"),
            MarkupError::Unclosed { tag, offset } => {
                write!(f, "byte {offset}: <{tag}> is never closed")
            }
            MarkupError::StrayClose { found, offset } => {
                write!(f, "byte {offset}: </{found}> has no open element")
            }
        }
    }
}

impl std::error::Error for MarkupError {}

// ---------------------------------------------------------------------------
// Parser – recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// A hand-written parser over the controlled subset; template inputs never
/// need the error recovery of a full HTML5 parser, and we would rather reject
/// broken markup than guess at it.
pub fn parse_html(html: &str) -> Result<Vec<DomNode>, MarkupError> {
    let mut parser = Parser::new(html);
    let nodes = parser.parse_nodes()?;
    if parser.starts_with("</") {
        let offset = parser.pos;
        parser.advance(2);
        let found = parser.parse_tag_name();
        return Err(MarkupError::StrayClose { found, offset });
    }
    Ok(nodes)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Result<Vec<DomNode>, MarkupError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_preserve();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node()? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Option<DomNode>, MarkupError> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return Ok(None);
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            while !self.eof() && !self.starts_with(">") {
                self.advance(1);
            }
            if !self.eof() {
                self.advance(1);
            }
            return Ok(None);
        }
        if self.starts_with("<") {
            self.parse_element().map(Some)
        } else {
            Ok(Some(self.parse_text()))
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> Result<DomNode, MarkupError> {
        let open_offset = self.pos;
        self.advance(1);
        let tag_name = self.parse_tag_name();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Unparseable attribute byte; skip it rather than spin.
                self.advance(1);
                continue;
            }
            elem.attributes.insert(key, value);
        }

        if self.starts_with("/>") {
            self.advance(2);
            return Ok(DomNode::Element(elem));
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return Ok(DomNode::Element(elem));
        }

        elem.children = self.parse_nodes()?;

        if !self.starts_with("</") {
            return Err(MarkupError::Unclosed {
                tag: tag.name().to_string(),
                offset: open_offset,
            });
        }
        let close_offset = self.pos;
        self.advance(2);
        let closing = self.parse_tag_name();
        if !closing.eq_ignore_ascii_case(tag.name()) {
            return Err(MarkupError::MismatchedClose {
                expected: tag.name().to_string(),
                found: closing,
                offset: close_offset,
            });
        }
        self.skip_whitespace();
        if self.starts_with(">") {
            self.advance(1);
        }

        Ok(DomNode::Element(elem))
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' || c == '/' {
                break;
            }
            self.advance(1);
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_whitespace_preserve(&mut self) {
        // Skip runs of pure whitespace between elements.
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        // If we reached a tag or EOF, keep the skip. Otherwise revert.
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4);
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

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
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head))
        .cloned()
        .collect()
}
