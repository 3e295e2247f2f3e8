//! Minimal reader for XML property lists as written by sprite packers.
//!
//! The document is decoded into an ordered [`Value`] tree; dictionary entries
//! keep document order and are looked up by key, so nothing depends on the
//! positional pairing of sibling elements.
//!
//! Supported: `<?xml ...?>` prolog, `<!DOCTYPE ...>`, comments, CDATA, the
//! five predefined entities plus numeric character references, and the value
//! elements `dict`, `array`, `string`, `integer`, `real`, `true`, `false`,
//! `date` and `data`. The root may be `<plist>` wrapping a single value or a
//! bare value element.

use crate::error::{Result, TexUnpackerError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Dict(Dict),
    Array(Vec<Value>),
    String(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Date(String),
    /// Base64 payload, kept as text.
    Data(String),
}

impl Value {
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Date(s) | Value::Data(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Dict(_) => "dict",
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Data(_) => "data",
        }
    }
}

/// Dictionary with entries in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
    pub fn get_dict(&self, key: &str) -> Option<&Dict> {
        self.get(key).and_then(Value::as_dict)
    }
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.push((key.into(), value));
    }
}

/// Parses a whole property-list document into its root value.
pub fn parse(src: &str) -> Result<Value> {
    let mut p = Parser { src, pos: 0 };
    p.skip_misc()?;
    let root = match p.peek_tag_name() {
        Some("plist") => {
            let tag = p.open_tag()?;
            if tag.self_closing {
                return Err(p.error("empty <plist> element"));
            }
            p.skip_misc()?;
            let v = p.value()?;
            p.skip_misc()?;
            p.close_tag("plist")?;
            v
        }
        Some(_) => p.value()?,
        None => return Err(p.error("expected a root element")),
    };
    p.skip_misc()?;
    if p.pos < src.len() {
        return Err(p.error("trailing content after root element"));
    }
    Ok(root)
}

/// Parses a document whose root value must be a dictionary.
pub fn parse_dict(src: &str) -> Result<Dict> {
    match parse(src)? {
        Value::Dict(d) => Ok(d),
        other => Err(TexUnpackerError::parse(
            format!("root value is {}, expected dict", other.kind()),
            src,
        )),
    }
}

struct Tag<'a> {
    name: &'a str,
    self_closing: bool,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> TexUnpackerError {
        TexUnpackerError::parse(message, self.rest())
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Skips whitespace, comments, processing instructions and doctype.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_ws();
            let rest = self.rest();
            let end_marker = if rest.starts_with("<!--") {
                "-->"
            } else if rest.starts_with("<?") {
                "?>"
            } else if rest.starts_with("<!DOCTYPE") || rest.starts_with("<!doctype") {
                ">"
            } else {
                return Ok(());
            };
            match rest.find(end_marker) {
                Some(idx) => self.pos += idx + end_marker.len(),
                None => return Err(self.error("unterminated markup declaration")),
            }
        }
    }

    fn peek_tag_name(&self) -> Option<&'a str> {
        let rest = self.rest().strip_prefix('<')?;
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() { None } else { Some(name) }
    }

    fn open_tag(&mut self) -> Result<Tag<'a>> {
        let name = match self.peek_tag_name() {
            Some(n) if !n.starts_with(['/', '!', '?']) => n,
            _ => return Err(self.error("expected an opening tag")),
        };
        // skip "<name", then attributes up to '>' honouring quotes
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut i = self.pos + 1 + name.len();
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => {
                    let self_closing = bytes[i - 1] == b'/';
                    self.pos = i + 1;
                    return Ok(Tag { name, self_closing });
                }
                None => {}
            }
            i += 1;
        }
        self.pos = start;
        Err(self.error(format!("unterminated <{name}> tag")))
    }

    fn close_tag(&mut self, name: &str) -> Result<()> {
        let rest = self.rest();
        let Some(after) = rest.strip_prefix("</").and_then(|r| r.strip_prefix(name)) else {
            return Err(self.error(format!("expected </{name}>")));
        };
        let trimmed = after.trim_start();
        if !trimmed.starts_with('>') {
            return Err(self.error(format!("malformed </{name}>")));
        }
        self.pos += rest.len() - trimmed.len() + 1;
        Ok(())
    }

    fn at_close(&self, name: &str) -> bool {
        self.rest()
            .strip_prefix("</")
            .and_then(|r| r.strip_prefix(name))
            .is_some_and(|r| r.trim_start().starts_with('>'))
    }

    fn value(&mut self) -> Result<Value> {
        let tag = self.open_tag()?;
        let name = tag.name;
        if tag.self_closing {
            return match name {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "dict" => Ok(Value::Dict(Dict::default())),
                "array" => Ok(Value::Array(Vec::new())),
                "string" => Ok(Value::String(String::new())),
                "date" => Ok(Value::Date(String::new())),
                "data" => Ok(Value::Data(String::new())),
                _ => Err(self.error(format!("unexpected empty <{name}/> element"))),
            };
        }
        match name {
            "dict" => self.dict_body().map(Value::Dict),
            "array" => self.array_body().map(Value::Array),
            "true" | "false" => {
                self.skip_ws();
                self.close_tag(name)?;
                Ok(Value::Bool(name == "true"))
            }
            "string" => self.text(name).map(Value::String),
            "date" => self.text(name).map(Value::Date),
            "data" => self.text(name).map(Value::Data),
            "integer" => {
                let start = self.pos;
                let t = self.text(name)?;
                t.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
                    TexUnpackerError::parse(format!("invalid integer `{t}`"), &self.src[start..])
                })
            }
            "real" => {
                let start = self.pos;
                let t = self.text(name)?;
                t.trim().parse::<f64>().map(Value::Real).map_err(|_| {
                    TexUnpackerError::parse(format!("invalid real `{t}`"), &self.src[start..])
                })
            }
            "key" => Err(self.error("<key> outside of a dict")),
            other => Err(self.error(format!("unknown element <{other}>"))),
        }
    }

    fn dict_body(&mut self) -> Result<Dict> {
        let mut dict = Dict::default();
        loop {
            self.skip_misc()?;
            if self.at_close("dict") {
                self.close_tag("dict")?;
                return Ok(dict);
            }
            if self.peek_tag_name() != Some("key") {
                return Err(self.error("expected <key> in dict"));
            }
            let tag = self.open_tag()?;
            let key = if tag.self_closing {
                String::new()
            } else {
                self.text("key")?
            };
            self.skip_misc()?;
            if self.at_close("dict") || self.rest().is_empty() {
                return Err(self.error(format!("key `{key}` has no value")));
            }
            let value = self.value()?;
            dict.insert(key, value);
        }
    }

    fn array_body(&mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_misc()?;
            if self.at_close("array") {
                self.close_tag("array")?;
                return Ok(items);
            }
            if self.rest().is_empty() {
                return Err(self.error("unterminated <array>"));
            }
            items.push(self.value()?);
        }
    }

    /// Reads character data up to `</name>` and consumes the closing tag.
    fn text(&mut self, name: &str) -> Result<String> {
        let mut out = String::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(format!("unterminated <{name}>")));
            }
            if self.at_close(name) {
                self.close_tag(name)?;
                return Ok(out);
            }
            if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let Some(end) = cdata.find("]]>") else {
                    return Err(self.error("unterminated CDATA section"));
                };
                out.push_str(&cdata[..end]);
                self.pos += "<![CDATA[".len() + end + "]]>".len();
                continue;
            }
            if rest.starts_with("<!--") {
                self.skip_misc()?;
                continue;
            }
            if rest.starts_with('<') {
                return Err(self.error(format!("unexpected markup inside <{name}>")));
            }
            let end = rest.find('<').unwrap_or(rest.len());
            decode_entities(&rest[..end], &mut out).map_err(|e| self.error(e))?;
            self.pos += end;
        }
    }
}

fn decode_entities(raw: &str, out: &mut String) -> std::result::Result<(), String> {
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            return Err("unterminated entity reference".into());
        };
        let entity = &after[..semi];
        let ch = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity `&{entity};`"))?
            }
        };
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(())
}
