//! Bracketed-tag builder for the theme dialect:
//! `[tag attr="value"]content[/tag]` and self-closing `[tag attr="value"]`.

use std::fmt::Write;

use crate::sanitize::Attrs;

/// Escape an attribute value so it can neither end the quoted value nor
/// open or close a tag.
pub fn escape_attr(value: &str) -> String {
    escape_brackets(&html_escape::encode_double_quoted_attribute(value))
}

/// Escape plain editor text (titles, labels, quotes).
pub fn escape_text(value: &str) -> String {
    escape_brackets(&html_escape::encode_text(value))
}

/// Escape rich text, which may carry inline HTML from the editor. Only the
/// dialect's own delimiters are neutralized.
pub fn escape_rich_text(value: &str) -> String {
    escape_brackets(value)
}

fn escape_brackets(value: &str) -> String {
    value.replace('[', "&#91;").replace(']', "&#93;")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
}

impl Tag {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn attr_opt(self, name: &'static str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Append already-sanitized attributes in their given order.
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn open(&self) -> String {
        let mut out = format!("[{}", self.name);
        for (name, value) in &self.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
        }
        out.push(']');
        out
    }

    pub fn close(&self) -> String {
        format!("[/{}]", self.name)
    }

    /// `[tag]content[/tag]` on one line, for text-bearing primitives.
    pub fn inline(&self, content: &str) -> String {
        format!("{}{}{}", self.open(), content, self.close())
    }

    /// Tag wrapping child markup on their own lines; empty content collapses
    /// to `[tag][/tag]`.
    pub fn block(&self, content: &str) -> String {
        if content.is_empty() {
            format!("{}{}", self.open(), self.close())
        } else {
            format!("{}\n{}\n{}", self.open(), content, self.close())
        }
    }
}

/// `section > row > column` skeleton around `content`. The three opening
/// tags are emitted back to back so the nesting is visible at a glance.
pub fn structure(section_attrs: Attrs, content: &str) -> String {
    let section = Tag::new("section").attrs(section_attrs);
    let row = Tag::new("row").attr("width", "full");
    let column = Tag::new("column").attr("span", "12");

    let opening = format!("{}{}{}", section.open(), row.open(), column.open());
    let closing = format!("{}{}{}", column.close(), row.close(), section.close());
    if content.is_empty() {
        format!("{opening}{closing}")
    } else {
        format!("{opening}\n{content}\n{closing}")
    }
}
