//! Streaming post-processing of rendered HTML fragments.
//!
//! The markup renderer produces XHTML-well-formed fragments, which are read
//! here as an XML event stream and written back with targeted edits. Nothing
//! builds a DOM; each pass is a single read/write loop.
//!
//! | Pass | Effect |
//! |---|---|
//! | [`normalize_fragment`] | rewrite `src`/`href` to site URLs, annotate `<pre><code>` blocks |
//! | [`extract_text`] | flatten to whitespace-collapsed plain text |
//! | [`first_image_src`] | `src` of the first `<img>` |
//! | [`absolutize_urls`] | prefix root-relative `src`/`href` with the site base URL |
//!
//! ## Code block annotation
//!
//! ```text
//! <pre class="highlight"><code class="language-js" data-lang="js">
//!   → <pre class="highlight language-javascript line-numbers">
//!       <code class="language-js language-javascript">
//! ```
//!
//! The language comes from `data-lang`, else the first `language-*` class,
//! and is normalized through [`normalize_language_alias`]. Each annotated
//! block consumes one entry of the line-number flags computed from the raw
//! source; blocks without a language are left alone and consume nothing.

use crate::links::resolve_site_url;
use quick_xml::{
    Reader, Writer,
    events::{BytesStart, Event},
};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Elements whose boundaries do not separate words in extracted text.
const INLINE_ELEMENTS: &[&[u8]] = &[
    b"a", b"abbr", b"b", b"cite", b"code", b"em", b"i", b"kbd", b"mark", b"q", b"s", b"small",
    b"span", b"strong", b"sub", b"sup", b"u",
];

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn create_xml_reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content.as_bytes());
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);
    reader
}

fn into_string(writer: XmlWriter) -> String {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn attr_value(attr: &quick_xml::events::attributes::Attribute<'_>) -> String {
    attr.unescape_value().map_or_else(
        |_| String::from_utf8_lossy(&attr.value).into_owned(),
        Cow::into_owned,
    )
}

fn element_name(elem: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(elem.name().as_ref()).into_owned()
}

/// Map common language aliases to the names the highlighter expects.
pub fn normalize_language_alias(language: &str) -> String {
    let normalized = language.trim().to_lowercase();
    match normalized.as_str() {
        "js" => "javascript".into(),
        "ts" => "typescript".into(),
        "yml" => "yaml".into(),
        "sh" | "shell" | "shell-session" | "zsh" | "bash" => "bash".into(),
        "html" | "xml" | "svg" | "mathml" => "markup".into(),
        _ => normalized,
    }
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode an entity reference name (without `&` and `;`).
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "apos" => "'".to_string(),
        "quot" => "\"".to_string(),
        "nbsp" => "\u{a0}".to_string(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}

// ============================================================================
// Link rewriting and code block annotation
// ============================================================================

/// Rewrite `src` (as-is) and `href` (converting markup links) on one element.
fn rewrite_links(elem: &BytesStart<'_>, source_dir: &Path) -> BytesStart<'static> {
    let mut out = BytesStart::new(element_name(elem));
    for attr in elem.attributes().flatten() {
        match attr.key.as_ref() {
            b"src" => {
                let resolved = resolve_site_url(&attr_value(&attr), source_dir, false);
                out.push_attribute(("src", resolved.into_value().as_str()));
            }
            b"href" => {
                let resolved = resolve_site_url(&attr_value(&attr), source_dir, true);
                out.push_attribute(("href", resolved.into_value().as_str()));
            }
            key => out.push_attribute((key, attr.value.as_ref())),
        }
    }
    out
}

fn rewrite_event<'a>(event: Event<'a>, source_dir: &Path) -> Event<'a> {
    match event {
        Event::Start(elem) => Event::Start(rewrite_links(&elem, source_dir)),
        Event::Empty(elem) => Event::Empty(rewrite_links(&elem, source_dir)),
        other => other,
    }
}

fn detect_language(code: &BytesStart<'_>) -> Option<String> {
    let mut from_class = None;
    for attr in code.attributes().flatten() {
        match attr.key.as_ref() {
            b"data-lang" => {
                let value = attr_value(&attr);
                if !value.trim().is_empty() {
                    return Some(value.trim().to_string());
                }
            }
            b"class" if from_class.is_none() => {
                from_class = attr_value(&attr)
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
                    .filter(|l| !l.is_empty())
                    .map(str::to_string);
            }
            _ => {}
        }
    }
    from_class
}

fn add_classes(existing: &str, add: &[&str]) -> String {
    let mut classes: Vec<&str> = existing.split_whitespace().collect();
    for class in add {
        if !classes.contains(class) {
            classes.push(class);
        }
    }
    classes.join(" ")
}

/// Copy an element, merging `add` into its class list and dropping `drop` attributes.
fn with_classes(elem: &BytesStart<'_>, add: &[&str], drop: &[&[u8]]) -> BytesStart<'static> {
    let mut out = BytesStart::new(element_name(elem));
    let mut has_class = false;
    for attr in elem.attributes().flatten() {
        let key = attr.key.as_ref();
        if drop.contains(&key) {
            continue;
        }
        if key == b"class" {
            has_class = true;
            out.push_attribute(("class", add_classes(&attr_value(&attr), add).as_str()));
        } else {
            out.push_attribute((key, attr.value.as_ref()));
        }
    }
    if !has_class && !add.is_empty() {
        out.push_attribute(("class", add.join(" ").as_str()));
    }
    out
}

/// Annotate a `<pre><code>` pair; unchanged when no language is detected.
fn annotate_code_block(
    pre: BytesStart<'static>,
    code: BytesStart<'static>,
    line_numbers: &mut impl Iterator<Item = bool>,
) -> (BytesStart<'static>, BytesStart<'static>) {
    let Some(language) = detect_language(&code) else {
        return (pre, code);
    };
    let class = format!("language-{}", normalize_language_alias(&language));

    let code = with_classes(&code, &[class.as_str()], &[b"data-lang"]);
    let pre = if line_numbers.next().unwrap_or(false) {
        with_classes(&pre, &[class.as_str(), "line-numbers"], &[])
    } else {
        with_classes(&pre, &[class.as_str()], &[])
    };
    (pre, code)
}

/// Rewrite references to site URLs and annotate code blocks.
///
/// `source_dir` is the post's directory relative to the content root;
/// `line_numbers` holds one flag per source block in document order.
pub fn normalize_fragment(
    fragment: &str,
    source_dir: &Path,
    line_numbers: &[bool],
) -> Result<String, MarkupError> {
    let mut reader = create_xml_reader(fragment);
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(fragment.len())));
    let mut line_numbers = line_numbers.iter().copied();

    loop {
        match reader.read_event()? {
            Event::Start(elem) if elem.name().as_ref() == b"pre" => {
                let pre = rewrite_links(&elem, source_dir);

                // Look past whitespace for a directly nested <code>
                let mut between = Vec::new();
                let next = loop {
                    match reader.read_event()? {
                        Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {
                            between.push(Event::Text(t))
                        }
                        other => break other,
                    }
                };

                match next {
                    Event::Start(code) if code.name().as_ref() == b"code" => {
                        let code = rewrite_links(&code, source_dir);
                        let (pre, code) = annotate_code_block(pre, code, &mut line_numbers);
                        writer.write_event(Event::Start(pre))?;
                        for event in between {
                            writer.write_event(event)?;
                        }
                        writer.write_event(Event::Start(code))?;
                    }
                    other => {
                        writer.write_event(Event::Start(pre))?;
                        for event in between {
                            writer.write_event(event)?;
                        }
                        if matches!(other, Event::Eof) {
                            break;
                        }
                        writer.write_event(rewrite_event(other, source_dir))?;
                    }
                }
            }
            Event::Eof => break,
            event => writer.write_event(rewrite_event(event, source_dir))?,
        }
    }

    Ok(into_string(writer))
}

// ============================================================================
// Read-only passes
// ============================================================================

/// Plain text of a fragment: tags stripped, entities decoded, whitespace collapsed.
///
/// Block-level element boundaries separate words; inline ones do not.
pub fn extract_text(fragment: &str) -> Result<String, MarkupError> {
    let mut reader = create_xml_reader(fragment);
    let mut text = String::with_capacity(fragment.len());

    loop {
        match reader.read_event()? {
            Event::Start(elem) | Event::Empty(elem) => {
                if !INLINE_ELEMENTS.contains(&elem.name().as_ref()) {
                    text.push(' ');
                }
            }
            Event::End(elem) => {
                if !INLINE_ELEMENTS.contains(&elem.name().as_ref()) {
                    text.push(' ');
                }
            }
            Event::Text(t) => text.push_str(&reader.decoder().decode(&t)?),
            Event::CData(t) => text.push_str(&reader.decoder().decode(&t)?),
            Event::GeneralRef(r) => {
                let entity = reader.decoder().decode(&r)?;
                text.push_str(&decode_entity(&entity));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collapse_whitespace(&text))
}

/// `src` of the first `<img>` element, if any.
pub fn first_image_src(fragment: &str) -> Result<Option<String>, MarkupError> {
    let mut reader = create_xml_reader(fragment);
    loop {
        match reader.read_event()? {
            Event::Start(elem) | Event::Empty(elem) if elem.name().as_ref() == b"img" => {
                let src = elem
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"src")
                    .map(|a| attr_value(&a));
                if let Some(src) = src {
                    return Ok(Some(src));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Prefix root-relative `src`/`href` values with `base_url`.
///
/// Used for feed content, which readers display outside the site.
pub fn absolutize_urls(fragment: &str, base_url: &str) -> Result<String, MarkupError> {
    let absolutize = |elem: &BytesStart<'_>| {
        let mut out = BytesStart::new(element_name(elem));
        for attr in elem.attributes().flatten() {
            let key = attr.key.as_ref();
            let value = attr_value(&attr);
            if matches!(key, b"src" | b"href") && value.starts_with('/') && !value.starts_with("//")
            {
                let absolute = format!("{base_url}{value}");
                out.push_attribute((if key == b"src" { "src" } else { "href" }, absolute.as_str()));
            } else {
                out.push_attribute((key, attr.value.as_ref()));
            }
        }
        out
    };

    let mut reader = create_xml_reader(fragment);
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(fragment.len())));
    loop {
        match reader.read_event()? {
            Event::Start(elem) => writer.write_event(Event::Start(absolutize(&elem)))?,
            Event::Empty(elem) => writer.write_event(Event::Empty(absolutize(&elem)))?,
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }
    Ok(into_string(writer))
}
