//! Tag recognition over a raw, possibly truncated, text buffer.
//!
//! The stream grammar only knows three tag names (`node`, `group`, `edge`).
//! [`scan_tag`] classifies the text starting at a `<` into one of four
//! outcomes:
//!
//! - a complete opening or closing [`Tag`],
//! - [`Scan::Partial`]: the buffer ends before the tag could be decided, so
//!   the caller must wait for more input,
//! - [`Scan::Malformed`]: a recognized tag whose syntax is broken,
//! - [`Scan::Text`]: a `<` that is ordinary content (`a < b`, `x<5`, `<div>`).
//!
//! Attribute lists are parsed with winnow once the opening tag is complete.

use std::borrow::Cow;

use winnow::{
    Parser as _,
    ascii::multispace0,
    combinator::{alt, delimited, preceded, repeat, separated_pair, terminated},
    error::{ContextError, ErrMode},
    token::{take_till, take_while},
};

type IResult<O> = std::result::Result<O, ErrMode<ContextError>>;

/// The element names understood by the stream grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagName {
    Node,
    Group,
    Edge,
}

impl TagName {
    const ALL: [TagName; 3] = [TagName::Node, TagName::Group, TagName::Edge];

    fn as_str(self) -> &'static str {
        match self {
            TagName::Node => "node",
            TagName::Group => "group",
            TagName::Edge => "edge",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether `partial` is, or could still grow into, a tag name.
    fn could_become(partial: &str) -> bool {
        Self::ALL.into_iter().any(|tag| {
            partial.len() <= tag.as_str().len()
                && tag.as_str()[..partial.len()].eq_ignore_ascii_case(partial)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagKind {
    Open { self_closing: bool },
    Close,
}

/// A complete tag located in the buffer.
#[derive(Debug, Clone)]
pub(crate) struct Tag {
    pub name: TagName,
    pub kind: TagKind,
    /// Byte offset of the `<`.
    pub start: usize,
    /// Byte offset just past the `>`.
    pub end: usize,
    pub attributes: Attributes,
}

impl Tag {
    pub(crate) fn is_open(&self, name: TagName) -> bool {
        self.name == name && matches!(self.kind, TagKind::Open { .. })
    }

    pub(crate) fn is_open_with_body(&self, name: TagName) -> bool {
        self.name == name
            && matches!(
                self.kind,
                TagKind::Open {
                    self_closing: false
                }
            )
    }

    pub(crate) fn is_close(&self, name: TagName) -> bool {
        self.name == name && self.kind == TagKind::Close
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Scan {
    Tag(Tag),
    Partial,
    Malformed { end: usize, reason: &'static str },
    Text,
}

/// Classifies the text at `start`, which must point at a `<`.
pub(crate) fn scan_tag(buffer: &str, start: usize) -> Scan {
    let rest = &buffer[start..];
    debug_assert!(rest.starts_with('<'));

    let (closing, name_start) = match rest.as_bytes().get(1) {
        None => return Scan::Partial,
        Some(b'/') => (true, 2),
        Some(_) => (false, 1),
    };

    let name_len = rest[name_start..]
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();
    let name = &rest[name_start..name_start + name_len];
    let after_name = name_start + name_len;

    if after_name == rest.len() {
        return if name.is_empty() || TagName::could_become(name) {
            Scan::Partial
        } else {
            Scan::Text
        };
    }

    let Some(tag_name) = TagName::from_name(name) else {
        return Scan::Text;
    };

    if closing {
        return scan_close(rest, start, after_name, tag_name);
    }

    match rest.as_bytes()[after_name] {
        b'>' | b'/' => {}
        byte if byte.is_ascii_whitespace() => {}
        _ => return Scan::Text,
    }

    scan_open(rest, start, after_name, tag_name)
}

fn scan_close(rest: &str, start: usize, after_name: usize, name: TagName) -> Scan {
    let trailing = &rest[after_name..];
    let trimmed = trailing.trim_start();
    if trimmed.is_empty() {
        return Scan::Partial;
    }
    if !trimmed.starts_with('>') {
        return Scan::Text;
    }
    let end = start + after_name + (trailing.len() - trimmed.len()) + 1;
    Scan::Tag(Tag {
        name,
        kind: TagKind::Close,
        start,
        end,
        attributes: Attributes::default(),
    })
}

fn scan_open(rest: &str, start: usize, after_name: usize, name: TagName) -> Scan {
    let mut quote: Option<char> = None;
    let mut previous_significant: Option<char> = None;

    for (offset, ch) in rest[after_name..].char_indices() {
        let index = after_name + offset;
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) if ch == '<' => {
                return Scan::Malformed {
                    end: start + index,
                    reason: "unterminated attribute value",
                };
            }
            Some(_) => {}
            None => match ch {
                '"' | '\'' if previous_significant == Some('=') => quote = Some(ch),
                '<' => {
                    return Scan::Malformed {
                        end: start + index,
                        reason: "opening tag is not closed with `>`",
                    };
                }
                '>' => {
                    let inner = &rest[after_name..index];
                    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
                        Some(stripped) => (stripped, true),
                        None => (inner, false),
                    };
                    let end = start + index + 1;
                    return match Attributes::parse(inner) {
                        Some(attributes) => Scan::Tag(Tag {
                            name,
                            kind: TagKind::Open { self_closing },
                            start,
                            end,
                            attributes,
                        }),
                        None => Scan::Malformed {
                            end,
                            reason: "attribute list could not be parsed",
                        },
                    };
                }
                _ => {}
            },
        }
        if !ch.is_whitespace() {
            previous_significant = Some(ch);
        }
    }

    Scan::Partial
}

/// Iterates the complete tags found in `buffer[from..to]`, skipping text,
/// malformed tags and a trailing partial tag.
pub(crate) fn tags_between(buffer: &str, from: usize, to: usize) -> impl Iterator<Item = Tag> + '_ {
    let mut pos = from;
    std::iter::from_fn(move || {
        while pos < to {
            let relative = buffer[pos..to].find('<')?;
            let start = pos + relative;
            match scan_tag(&buffer[..to], start) {
                Scan::Tag(tag) => {
                    pos = tag.end;
                    return Some(tag);
                }
                Scan::Malformed { end, .. } => pos = end.max(start + 1),
                Scan::Text => pos = start + 1,
                Scan::Partial => return None,
            }
        }
        None
    })
}

/// Attribute name/value pairs read off an opening tag.
#[derive(Debug, Clone, Default)]
pub(crate) struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    /// Parses the text between the tag name and the closing `>`.
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let pairs = attribute_list.parse(text).ok()?;
        Some(Self {
            pairs: pairs
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), decode_entities(value).into_owned()))
                .collect(),
        })
    }

    /// Value of the attribute `name`; the first occurrence wins.
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Non-empty, trimmed value of `name`.
    pub(crate) fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn attribute_name<'a>(input: &mut &'a str) -> IResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')
    })
    .parse_next(input)
}

fn quoted_value<'a>(input: &mut &'a str) -> IResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .parse_next(input)
}

fn bare_value<'a>(input: &mut &'a str) -> IResult<&'a str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != '"' && c != '\'').parse_next(input)
}

fn attribute<'a>(input: &mut &'a str) -> IResult<(&'a str, &'a str)> {
    alt((
        separated_pair(
            attribute_name,
            (multispace0, '=', multispace0),
            alt((quoted_value, bare_value)),
        ),
        attribute_name.map(|name| (name, "")),
    ))
    .parse_next(input)
}

fn attribute_list<'a>(input: &mut &'a str) -> IResult<Vec<(&'a str, &'a str)>> {
    terminated(repeat(0.., preceded(multispace0, attribute)), multispace0).parse_next(input)
}

/// Decodes the five predefined XML entities.
pub(crate) fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    )
}
