//! Strict markup parser.
//!
//! A small hand-written parser for the tag dialect emitted by the model. It
//! accepts quoted or bare attribute values, decodes the standard entities and
//! skips comments; everything else that is not well-formed is an error. The
//! parser never panics and always returns the synthetic root on success.

use crate::domain::tree::{Attribute, Element, Node};
use crate::domain::vocabulary::{self, ROOT};
use crate::error::ParseError;

/// How strictly element names are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Well-formed and every element name is in the vocabulary.
    Vocabulary,
    /// Well-formed only; unknown element names are kept.
    WellFormed,
}

/// Parses `input` as a sequence of nodes under a synthetic root element.
///
/// # Errors
///
/// Returns a `ParseError` describing the first problem found.
pub fn parse_fragment(input: &str, strictness: Strictness) -> Result<Element, ParseError> {
    Parser {
        src: input,
        pos: 0,
        strictness,
    }
    .run()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    strictness: Strictness,
}

impl Parser<'_> {
    fn run(mut self) -> Result<Element, ParseError> {
        let mut stack: Vec<(Element, usize)> = vec![(Element::new(ROOT), 0)];

        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                self.skip_comment()?;
            } else if rest.starts_with("</") {
                self.close_tag(&mut stack)?;
            } else if rest.starts_with('<') {
                self.open_tag(&mut stack)?;
            } else {
                let text = self.text();
                if let Some((top, _)) = stack.last_mut() {
                    push_text(top, text);
                }
            }
        }

        let innermost = stack.pop();
        match innermost {
            Some((el, offset)) if !stack.is_empty() => Err(ParseError::Unclosed {
                name: el.name,
                offset,
            }),
            Some((root, _)) => Ok(root),
            None => Ok(Element::new(ROOT)),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn eof(&self) -> ParseError {
        ParseError::UnexpectedEof {
            offset: self.src.len(),
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn expect(&mut self, ch: char, expected: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(found) if found == ch => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(ParseError::Expected {
                expected,
                offset: self.pos,
            }),
            None => Err(self.eof()),
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let body = self.pos + 4;
        match self.src[body..].find("-->") {
            Some(end) => {
                self.pos = body + end + 3;
                Ok(())
            }
            None => Err(self.eof()),
        }
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() => self.bump(),
            Some(_) => {
                return Err(ParseError::Expected {
                    expected: "element name",
                    offset: self.pos,
                });
            }
            None => return Err(self.eof()),
        }
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':' | '.'))
        {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn open_tag(&mut self, stack: &mut Vec<(Element, usize)>) -> Result<(), ParseError> {
        let offset = self.pos;
        self.bump();
        let name = self.name()?;
        if self.strictness == Strictness::Vocabulary && !vocabulary::is_known(&name) {
            return Err(ParseError::UnknownElement { name, offset });
        }
        let mut element = Element::new(name);

        loop {
            let had_space = self.skip_ws();
            match self.peek() {
                Some('/') => {
                    self.bump();
                    self.expect('>', "`>` after `/`")?;
                    if let Some((top, _)) = stack.last_mut() {
                        top.children.push(Node::Element(element));
                    }
                    return Ok(());
                }
                Some('>') => {
                    self.bump();
                    stack.push((element, offset));
                    return Ok(());
                }
                Some(_) if had_space => {
                    let attribute = self.attribute()?;
                    element.attributes.push(attribute);
                }
                Some(_) => {
                    return Err(ParseError::Expected {
                        expected: "attribute or `>`",
                        offset: self.pos,
                    });
                }
                None => return Err(self.eof()),
            }
        }
    }

    fn attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.name()?;
        self.skip_ws();
        self.expect('=', "`=` after attribute name")?;
        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                let Some(len) = self.src[start..].find(quote) else {
                    return Err(self.eof());
                };
                self.pos = start + len + 1;
                decode_entities(&self.src[start..start + len])
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|ch| !ch.is_whitespace() && ch != '>' && ch != '/')
                {
                    self.bump();
                }
                if self.pos == start {
                    return Err(ParseError::Expected {
                        expected: "attribute value",
                        offset: self.pos,
                    });
                }
                decode_entities(&self.src[start..self.pos])
            }
            None => return Err(self.eof()),
        };
        Ok(Attribute { name, value })
    }

    fn close_tag(&mut self, stack: &mut Vec<(Element, usize)>) -> Result<(), ParseError> {
        let offset = self.pos;
        self.pos += 2;
        let name = self.name()?;
        self.skip_ws();
        self.expect('>', "`>` to end closing tag")?;

        if stack.len() < 2 {
            return Err(ParseError::UnexpectedClose { name, offset });
        }
        let Some((element, _)) = stack.pop() else {
            return Err(ParseError::UnexpectedClose { name, offset });
        };
        if element.name != name {
            return Err(ParseError::MismatchedClose {
                open: element.name,
                found: name,
                offset,
            });
        }
        if let Some((parent, _)) = stack.last_mut() {
            parent.children.push(Node::Element(element));
        }
        Ok(())
    }

    fn text(&mut self) -> String {
        let start = self.pos;
        let end = self.src[start..]
            .find('<')
            .map_or(self.src.len(), |i| start + i);
        self.pos = end;
        decode_entities(&self.src[start..end])
    }
}

fn push_text(parent: &mut Element, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(previous)) = parent.children.last_mut() {
        previous.push_str(&text);
    } else {
        parent.children.push(Node::Text(text));
    }
}

/// Decodes named and numeric character references. Unknown references are
/// kept verbatim.
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, semi))
        });
        if let Some((ch, semi)) = decoded {
            out.push(ch);
            rest = &rest[semi + 1..];
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}
