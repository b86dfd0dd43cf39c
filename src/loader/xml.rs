// src/loader/xml.rs
use crate::error::MapError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

/// Minimal owned element tree; TMX files are small enough to hold whole.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn required(&self, name: &str) -> Result<&str, MapError> {
        self.attr(name).ok_or_else(|| MapError::MissingAttribute {
            element: self.name.clone(),
            attribute: name.to_owned(),
        })
    }

    pub fn parse_required<T: FromStr>(&self, name: &str) -> Result<T, MapError> {
        let raw = self.required(name)?;
        self.parse_value(name, raw)
    }

    /// Parse an optional attribute; absent means `default`, present-but-garbage is an error.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, MapError> {
        match self.attr(name) {
            Some(raw) => self.parse_value(name, raw),
            None => Ok(default),
        }
    }

    /// Tiled writes flags as `0`/`1`.
    pub fn flag_or(&self, name: &str, default: bool) -> Result<bool, MapError> {
        match self.attr(name) {
            None => Ok(default),
            Some("1") | Some("true") => Ok(true),
            Some("0") | Some("false") => Ok(false),
            Some(other) => Err(self.invalid(name, other)),
        }
    }

    fn parse_value<T: FromStr>(&self, name: &str, raw: &str) -> Result<T, MapError> {
        raw.trim().parse().map_err(|_| self.invalid(name, raw))
    }

    fn invalid(&self, name: &str, raw: &str) -> MapError {
        MapError::InvalidAttribute {
            element: self.name.clone(),
            attribute: name.to_owned(),
            value: raw.to_owned(),
        }
    }

    #[cfg(test)]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, MapError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), MapError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(el);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(el);
            Ok(())
        }
        None => Err(MapError::MalformedXml {
            context: format!("second root element <{}>", el.name),
        }),
    }
}

/// Read a whole XML document into an [`Element`] tree.
pub(crate) fn parse_tree(xml: &str) -> Result<Element, MapError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let el = element_from(&e)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| MapError::MalformedXml {
                    context: "closing tag without an open element".into(),
                })?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(MapError::MalformedXml {
            context: format!("document ended inside <{}>", open.name),
        });
    }
    root.ok_or_else(|| MapError::MalformedXml {
        context: "document has no root element".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_tree_with_text_and_attributes() {
        let root = parse_tree(
            r#"<?xml version="1.0"?>
            <map width="2"><layer name="a &amp; b"><data>  abc </data></layer><empty/></map>"#,
        )
        .expect("parse");

        assert_eq!(root.name, "map");
        assert_eq!(root.parse_required::<u32>("width").expect("width"), 2);
        let layer = root.child("layer").expect("layer");
        assert_eq!(layer.attr("name"), Some("a & b"));
        assert_eq!(layer.child("data").expect("data").text.trim(), "abc");
        assert!(root.child("empty").is_some());
    }

    #[test]
    fn truncated_document_is_malformed() {
        let err = parse_tree("<map><layer>").expect_err("should fail");
        assert!(matches!(err, MapError::MalformedXml { .. }));
    }

    #[test]
    fn invalid_attribute_value_is_reported() {
        let root = parse_tree(r#"<map width="wide"/>"#).expect("parse");
        let err = root.parse_required::<u32>("width").expect_err("should fail");
        assert!(matches!(err, MapError::InvalidAttribute { attribute, .. } if attribute == "width"));
        let err = root.parse_required::<u32>("height").expect_err("should fail");
        assert!(matches!(err, MapError::MissingAttribute { attribute, .. } if attribute == "height"));
    }
}
