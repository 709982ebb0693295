//! Minimal XML reading and writing for XMP packets.
//!
//! XMP is a constrained XML dialect, so this is deliberately not a general
//! XML library: prefixes are matched literally, there is no DTD or namespace
//! resolution, and documents are parsed into a small owned tree. Comments,
//! processing instructions, and doctype declarations are skipped; CDATA
//! sections become text.

use crate::error::{XmpError, XmpResult};

// --- writing ---

/// Indented XML writer with open/close element tracking.
pub struct XmlWriter {
    out: String,
    stack: Vec<String>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
        }
    }

    /// Writes a processing instruction, e.g. the xpacket wrapper.
    pub fn pi(&mut self, target: &str, data: &str) {
        self.put_indent();
        self.out.push_str("<?");
        self.out.push_str(target);
        if !data.is_empty() {
            self.out.push(' ');
            self.out.push_str(data);
        }
        self.out.push_str("?>\n");
    }

    pub fn open(&mut self, name: &str) {
        self.open_with(name, &[]);
    }

    pub fn open_with(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.put_indent();
        self.out.push('<');
        self.out.push_str(name);
        self.put_attrs(attrs);
        self.out.push_str(">\n");
        self.stack.push(name.to_string());
    }

    /// Writes a self-closing element carrying only attributes.
    pub fn empty_with(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.put_indent();
        self.out.push('<');
        self.out.push_str(name);
        self.put_attrs(attrs);
        self.out.push_str("/>\n");
    }

    /// Writes `<name>text</name>` on one line.
    pub fn leaf(&mut self, name: &str, text: &str) {
        self.put_indent();
        self.out.push('<');
        self.out.push_str(name);
        self.out.push('>');
        self.out.push_str(&escape_text(text));
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    pub fn close(&mut self) {
        debug_assert!(!self.stack.is_empty(), "close without matching open");
        let Some(name) = self.stack.pop() else {
            return;
        };
        self.put_indent();
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push_str(">\n");
    }

    pub fn finish(mut self) -> String {
        debug_assert!(self.stack.is_empty(), "unclosed elements at finish");
        while !self.stack.is_empty() {
            self.close();
        }
        self.out
    }

    fn put_indent(&mut self) {
        for _ in 0..self.stack.len() {
            self.out.push_str("  ");
        }
    }

    fn put_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

// --- reading ---

#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// A parsed element: qualified name, attributes in document order, children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping interleaved text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    /// Concatenated text content, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out.trim().to_string()
    }

    /// The name after the namespace prefix, e.g. `markers` for `xmpDM:markers`.
    pub fn local_name(&self) -> &str {
        match self.name.rfind(':') {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }
}

/// Parses a document and returns its root element. Leading processing
/// instructions, comments, and doctype declarations are skipped; anything
/// after the root element (such as a trailing xpacket instruction) is
/// ignored.
pub fn parse_document(input: &str) -> XmpResult<XmlElement> {
    let mut parser = Parser {
        input: input.as_bytes(),
        pos: 0,
    };
    parser.skip_misc()?;
    if !parser.at(b'<') {
        return Err(parser.fail("expected root element"));
    }
    parser.parse_element()
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn fail(&self, msg: &str) -> XmpError {
        XmpError::Malformed(format!("{msg} at byte {}", self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn at(&self, byte: u8) -> bool {
        self.peek() == Some(byte)
    }

    fn starts_with(&self, token: &str) -> bool {
        self.input[self.pos..].starts_with(token.as_bytes())
    }

    fn expect(&mut self, token: &str) -> XmpResult<()> {
        if self.starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.fail(&format!("expected {token:?}")))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Advances just past the next occurrence of `token`.
    fn skip_past(&mut self, token: &str) -> XmpResult<()> {
        let bytes = token.as_bytes();
        while self.pos < self.input.len() {
            if self.input[self.pos..].starts_with(bytes) {
                self.pos += bytes.len();
                return Ok(());
            }
            self.pos += 1;
        }
        Err(self.fail(&format!("unterminated section, expected {token:?}")))
    }

    /// Skips whitespace, processing instructions, comments, and doctype
    /// declarations.
    fn skip_misc(&mut self) -> XmpResult<()> {
        loop {
            self.skip_ws();
            if self.starts_with("<?") {
                self.skip_past("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.starts_with("<!") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_name(&mut self) -> XmpResult<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b':' | b'_' | b'-' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.fail("expected a name"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn read_quoted(&mut self) -> XmpResult<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.fail("expected a quoted value")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let raw = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1;
                return decode_entities(&raw).map_err(|msg| self.fail(&msg));
            }
            self.pos += 1;
        }
        Err(self.fail("unterminated attribute value"))
    }

    fn parse_element(&mut self) -> XmpResult<XmlElement> {
        self.expect("<")?;
        let name = self.read_name()?;
        let mut element = XmlElement {
            name,
            ..Default::default()
        };

        // Attributes until `>` or `/>`.
        loop {
            self.skip_ws();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.at(b'>') {
                self.pos += 1;
                break;
            }
            let attr_name = self.read_name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let value = self.read_quoted()?;
            element.attrs.push((attr_name, value));
        }

        // Children until the matching close tag.
        loop {
            if self.starts_with("</") {
                self.pos += 2;
                let close = self.read_name()?;
                if close != element.name {
                    return Err(self.fail(&format!(
                        "mismatched close tag: expected </{}>, found </{close}>",
                        element.name
                    )));
                }
                self.skip_ws();
                self.expect(">")?;
                return Ok(element);
            }
            if self.starts_with("<!--") {
                self.skip_past("-->")?;
                continue;
            }
            if self.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let start = self.pos;
                loop {
                    if self.pos >= self.input.len() {
                        return Err(self.fail("unterminated CDATA section"));
                    }
                    if self.starts_with("]]>") {
                        let text =
                            String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                        self.pos += 3;
                        if !text.is_empty() {
                            element.children.push(XmlNode::Text(text));
                        }
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            if self.starts_with("<?") {
                self.skip_past("?>")?;
                continue;
            }
            if self.at(b'<') {
                let child = self.parse_element()?;
                element.children.push(XmlNode::Element(child));
                continue;
            }
            if self.pos >= self.input.len() {
                return Err(self.fail(&format!("unterminated element <{}>", element.name)));
            }
            let start = self.pos;
            while self.pos < self.input.len() && !self.at(b'<') {
                self.pos += 1;
            }
            let raw = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
            let decoded = decode_entities(&raw).map_err(|msg| self.fail(&msg))?;
            if !decoded.trim().is_empty() {
                element.children.push(XmlNode::Text(decoded));
            }
        }
    }
}

fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| "unterminated entity reference".to_string())?;
        let entity = &after[..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| {
                    entity.strip_prefix("#X")
                }) {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                match code.and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => return Err(format!("unknown entity reference &{entity};")),
                }
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_produces_indented_nesting() {
        let mut w = XmlWriter::new();
        w.open_with("root", &[("id", "1")]);
        w.open("inner");
        w.leaf("value", "text");
        w.empty_with("flag", &[("on", "true")]);
        w.close();
        w.close();
        assert_eq!(
            w.finish(),
            "<root id=\"1\">\n  <inner>\n    <value>text</value>\n    <flag on=\"true\"/>\n  </inner>\n</root>\n"
        );
    }

    #[test]
    fn writer_escapes_text_and_attrs() {
        let mut w = XmlWriter::new();
        w.open_with("a", &[("q", "say \"hi\" & <go>")]);
        w.leaf("b", "1 < 2 & 3 > 2");
        w.close();
        let xml = w.finish();
        assert!(xml.contains("q=\"say &quot;hi&quot; &amp; &lt;go&gt;\""));
        assert!(xml.contains("<b>1 &lt; 2 &amp; 3 &gt; 2</b>"));
    }

    #[test]
    fn parse_attrs_and_nesting() {
        let doc = parse_document(
            "<root a=\"1\" b='two'><child><leaf>hello</leaf></child><child/></root>",
        )
        .unwrap();
        assert_eq!(doc.name, "root");
        assert_eq!(doc.attr("a"), Some("1"));
        assert_eq!(doc.attr("b"), Some("two"));
        assert_eq!(doc.children_named("child").count(), 2);
        let leaf = doc.child("child").unwrap().child("leaf").unwrap();
        assert_eq!(leaf.text(), "hello");
    }

    #[test]
    fn parse_skips_prolog_comments_and_trailing_content() {
        let doc = parse_document(
            "<?xml version=\"1.0\"?>\n<!-- header -->\n<!DOCTYPE whatever>\n\
             <root><!-- inside --><a>1</a></root>\n<?xpacket end=\"w\"?>",
        )
        .unwrap();
        assert_eq!(doc.elements().count(), 1);
        assert_eq!(doc.child("a").unwrap().text(), "1");
    }

    #[test]
    fn parse_decodes_entities() {
        let doc =
            parse_document("<r a=\"&lt;&amp;&gt;\">&quot;x&apos; &#65;&#x42;</r>").unwrap();
        assert_eq!(doc.attr("a"), Some("<&>"));
        assert_eq!(doc.text(), "\"x' AB");
    }

    #[test]
    fn parse_keeps_cdata_verbatim() {
        let doc = parse_document("<r><![CDATA[1 < 2 & so on]]></r>").unwrap();
        assert_eq!(doc.text(), "1 < 2 & so on");
    }

    #[test]
    fn escape_then_parse_round_trips() {
        let original = "a & b < c > d \" e ' f";
        let mut w = XmlWriter::new();
        w.leaf("t", original);
        let wrapped = format!("<r>{}</r>", w.finish());
        let doc = parse_document(&wrapped).unwrap();
        assert_eq!(doc.child("t").unwrap().text(), original);
    }

    #[test]
    fn mismatched_close_tag_is_malformed() {
        let err = parse_document("<a><b></a></b>").unwrap_err();
        assert!(matches!(err, XmpError::Malformed(_)));
        assert!(err.to_string().contains("mismatched close tag"));
    }

    #[test]
    fn truncated_document_is_malformed() {
        assert!(matches!(
            parse_document("<a><b>text"),
            Err(XmpError::Malformed(_))
        ));
        assert!(matches!(parse_document(""), Err(XmpError::Malformed(_))));
        assert!(matches!(
            parse_document("just text"),
            Err(XmpError::Malformed(_))
        ));
    }

    #[test]
    fn local_name_strips_prefix() {
        let doc = parse_document("<xmpDM:Tracks/>").unwrap();
        assert_eq!(doc.local_name(), "Tracks");
        let doc = parse_document("<plain/>").unwrap();
        assert_eq!(doc.local_name(), "plain");
    }
}
