//! Pull cursor over the XML token stream.
//!
//! Wraps `quick_xml::Reader` into owned structural nodes with one-node
//! lookahead, which is all the schedule walker needs: start tags with their
//! attributes, end tags, text, and end-of-document. Declarations, comments,
//! processing instructions and DOCTYPE are discarded; CDATA folds into text;
//! self-closing tags are reported as a start tag followed by its end tag.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ParseError, Result};

#[derive(Debug)]
pub(crate) enum Node {
    Start(StartTag),
    End(String),
    Text(String),
    Eof,
}

#[derive(Debug)]
pub(crate) struct StartTag {
    pub name: String,
    attributes: Vec<(String, String)>,
}

impl StartTag {
    fn read(element: &BytesStart<'_>) -> Result<StartTag> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in element.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(StartTag { name, attributes })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub(crate) struct XmlCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    peeked: Option<Node>,
    pending_end: Option<String>,
}

impl<R: BufRead> XmlCursor<R> {
    pub fn new(input: R) -> XmlCursor<R> {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text_start = true;
        config.trim_text_end = true;
        XmlCursor {
            reader,
            buf: Vec::with_capacity(4096),
            peeked: None,
            pending_end: None,
        }
    }

    fn read_node(&mut self) -> Result<Node> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Node::End(name));
        }
        loop {
            self.buf.clear();
            let node = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(element) => Node::Start(StartTag::read(&element)?),
                Event::Empty(element) => {
                    let tag = StartTag::read(&element)?;
                    self.pending_end = Some(tag.name.clone());
                    Node::Start(tag)
                }
                Event::End(element) => {
                    Node::End(String::from_utf8_lossy(element.local_name().as_ref()).into_owned())
                }
                Event::Text(text) => Node::Text(text.unescape()?.into_owned()),
                Event::CData(data) => Node::Text(String::from_utf8_lossy(data.as_ref()).into_owned()),
                Event::Eof => Node::Eof,
                _ => continue,
            };
            return Ok(node);
        }
    }

    /// Consumes and returns the next structural node.
    pub fn next_node(&mut self) -> Result<Node> {
        match self.peeked.take() {
            Some(node) => Ok(node),
            None => self.read_node(),
        }
    }

    fn peek(&mut self) -> Result<&Node> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_node()?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    /// True if the next node closes `name`, consuming the end tag when so.
    /// Stray text between child elements is discarded along the way.
    pub fn next_is_end_of(&mut self, name: &str) -> Result<bool> {
        loop {
            if matches!(self.peek()?, Node::Text(_)) {
                self.next_node()?;
                continue;
            }
            match self.peek()? {
                Node::End(end) if end == name => {}
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
                _ => return Ok(false),
            }
            self.next_node()?;
            return Ok(true);
        }
    }

    /// Collects the text content up to the end tag of the element whose start
    /// tag was just consumed. Nested markup is skipped, not interpreted.
    pub fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next_node()? {
                Node::Text(chunk) => text.push_str(&chunk),
                Node::Start(_) => self.skip_to_end()?,
                Node::End(_) => return Ok(text),
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
            }
        }
    }

    /// Skip-consumes the remainder of the element whose start tag was just
    /// consumed, including all descendants.
    pub fn skip_to_end(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_node()? {
                Node::Start(_) => depth += 1,
                Node::End(_) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Node::Text(_) => {}
                Node::Eof => return Err(ParseError::UnexpectedDocumentEnd),
            }
        }
    }
}
