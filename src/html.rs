use super::*;

/// Builds a document from markup. Script and style bodies are kept as
/// inert text; nothing is executed.
pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut open = vec![dom.root];
    let mut cursor = Cursor::new(html);

    while !cursor.at_end() {
        let parent = open.last().copied().unwrap_or(dom.root);

        if cursor.eat("<!--") {
            cursor
                .skip_past("-->")
                .ok_or_else(|| Error::HtmlParse("unclosed HTML comment".into()))?;
        } else if cursor.eat("<!") {
            cursor
                .skip_past(">")
                .ok_or_else(|| Error::HtmlParse("unclosed markup declaration".into()))?;
        } else if cursor.eat("</") {
            let tag = cursor.end_tag()?;
            close_element(&dom, &mut open, &tag);
        } else if cursor.eat("<") {
            let start = cursor.start_tag()?;
            let raw_text = is_raw_text_tag(&start.name);
            let leaf = start.self_closing || is_void_tag(&start.name);
            let node = dom.create_element(parent, start.name.clone(), start.attrs);
            if raw_text {
                let body = cursor.raw_text(&start.name)?;
                if !body.is_empty() {
                    dom.create_text(node, body.to_string());
                }
            } else if !leaf {
                open.push(node);
            }
        } else {
            let text = cursor.take_while(|c| c != '<');
            dom.create_text(parent, decode_character_references(text));
        }
    }

    dom.initialize_form_control_values();
    Ok(dom)
}

/// Pops open elements up to the nearest one named `tag`. Stray end tags
/// are ignored.
fn close_element(dom: &Dom, open: &mut Vec<NodeId>, tag: &str) {
    let matching = open.iter().rposition(|node| {
        dom.tag_name(*node)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    });
    if let Some(pos) = matching {
        open.truncate(pos);
    }
}

struct StartTag {
    name: String,
    attrs: HashMap<String, String>,
    self_closing: bool,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !keep(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| c.is_ascii_whitespace());
    }

    fn skip_past(&mut self, marker: &str) -> Option<()> {
        let offset = self.rest().find(marker)?;
        self.pos += offset + marker.len();
        Some(())
    }

    /// Reads the remainder of a start tag after its `<`.
    fn start_tag(&mut self) -> Result<StartTag> {
        self.skip_whitespace();
        let name = self.take_while(is_name_char).to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::HtmlParse("empty tag name".into()));
        }

        let mut attrs = HashMap::new();
        loop {
            self.skip_whitespace();
            if self.eat(">") {
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: false,
                });
            }
            if self.eat("/>") {
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            if self.at_end() {
                return Err(Error::HtmlParse(format!("unclosed start tag <{name}")));
            }

            let attr = self
                .take_while(|c| is_name_char(c) || c == ':')
                .to_ascii_lowercase();
            if attr.is_empty() {
                return Err(Error::HtmlParse(format!("invalid attribute in <{name}>")));
            }
            self.skip_whitespace();
            let value = if self.eat("=") {
                self.skip_whitespace();
                decode_character_references(self.attribute_value()?)
            } else {
                String::new()
            };
            // Repeated attributes keep their first value.
            attrs.entry(attr).or_insert(value);
        }
    }

    fn attribute_value(&mut self) -> Result<&'a str> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let value = self.take_while(|c| c != quote);
                if self.at_end() {
                    return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(_) => {
                let mut value = self.take_while(|c| !c.is_ascii_whitespace() && c != '>');
                if value.ends_with('/') && self.peek() == Some('>') {
                    value = &value[..value.len() - 1];
                    self.pos -= 1;
                }
                Ok(value)
            }
            None => Err(Error::HtmlParse("missing attribute value".into())),
        }
    }

    /// Reads the remainder of an end tag after its `</`.
    fn end_tag(&mut self) -> Result<String> {
        self.skip_whitespace();
        let name = self.take_while(is_name_char).to_ascii_lowercase();
        self.skip_past(">")
            .ok_or_else(|| Error::HtmlParse(format!("unclosed end tag </{name}")))?;
        Ok(name)
    }

    /// Body of a raw-text element up to its end tag, which is consumed.
    fn raw_text(&mut self, tag: &str) -> Result<&'a str> {
        let rest = self.rest();
        let close = format!("</{tag}");
        let end = rest
            .to_ascii_lowercase()
            .find(&close)
            .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
        self.pos += end + 2;
        self.end_tag()?;
        Ok(&rest[..end])
    }
}

fn decode_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let decoded = tail
            .find(';')
            .and_then(|semi| decode_entity(&tail[..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let hex = numeric
            .strip_prefix('x')
            .or_else(|| numeric.strip_prefix('X'));
        let codepoint = match hex {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(codepoint);
    }
    let ch = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '©',
        "hellip" => '…',
        "rarr" => '→',
        "uarr" => '↑',
        _ => return None,
    };
    Some(ch)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}
