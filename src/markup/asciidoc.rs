//! Built-in AsciiDoc renderer.
//!
//! Covers the subset of AsciiDoc that blog posts actually use and emits the
//! same HTML5 structure asciidoctor does for those constructs, so stylesheets
//! and the code-block post-processor see familiar markup:
//!
//! | Construct | Output |
//! |---|---|
//! | `== Title` … `====== Title` | `<h2 id="_title">` … `<h6>` |
//! | paragraph | `div.paragraph > p` |
//! | `NOTE:` / `[TIP]` paragraph | `div.admonitionblock.note` |
//! | `* a` / `- a` / `. a` | `div.ulist > ul` / `div.olist > ol` (nested by marker) |
//! | `image::path[alt]` | `div.imageblock > div.content > img` |
//! | `[source,lang]` + `----` | `pre.highlight > code.language-lang[data-lang]` |
//! | `----` / `....` | `div.listingblock pre` / `div.literalblock pre` |
//! | `____` / `****` / `====` | quote / sidebar / example blocks (nested content) |
//! | `.Title` | `div.title` on the next block |
//! | `include::file[]` | lines spliced in, resolved against the source directory |
//! | `:name: value` + `{name}` | document attributes and references |
//!
//! Inline: `*strong*`, `_emphasis_`, `` `mono` `` (plus doubled unconstrained
//! forms), `link:`, `mailto:`, bare URLs, `image:`, `xref:`, and `<<target,text>>`.
//!
//! ## Inline pipeline
//!
//! ```text
//! raw text
//!   → attribute references   {name} → value
//!   → macros                 stashed as finished HTML behind placeholders
//!   → escape                 & < >
//!   → quotes                 monospace stashed, strong/emphasis wrapped
//!   → restore placeholders
//! ```
//!
//! Stashing macro output before escaping keeps URLs and `<<xref>>` syntax out
//! of reach of the escaping and quote passes.

use super::{MarkupRenderer, RenderError};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

const MAX_INCLUDE_DEPTH: usize = 8;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

static ATTRIBUTE_ENTRY: LazyLock<Regex> = LazyLock::new(|| regex(r"^:([^:\s][^:]*):\s*(.*)$"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| regex(r"^(={1,6})\s+(\S.*)$"));
static BLOCK_IMAGE: LazyLock<Regex> = LazyLock::new(|| regex(r"^image::([^\[\s]+)\[(.*)\]$"));
static INCLUDE: LazyLock<Regex> = LazyLock::new(|| regex(r"^include::([^\[\s]+)\[(.*)\]$"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*(\*{1,5}|-|\.{1,5})\s+(\S.*)$"));
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| regex(r"^\[\[([A-Za-z_][\w\-.:]*)\]\]$"));
static ADMONITION: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s+(.*)$"));

static ATTRIBUTE_REF: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\{([A-Za-z0-9_][A-Za-z0-9_-]*)\}"));
static XREF_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| regex(r"<<([^,>\s]+)(?:,\s*([^>]+))?>>"));
static XREF_MACRO: LazyLock<Regex> = LazyLock::new(|| regex(r"xref:([^\[\s]+)\[([^\]]*)\]"));
static INLINE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"image:([^:\[\s][^\[\s]*)\[([^\]]*)\]"));
static LINK_MACRO: LazyLock<Regex> = LazyLock::new(|| regex(r"link:([^\[\s]+)\[([^\]]*)\]"));
static MAILTO_MACRO: LazyLock<Regex> = LazyLock::new(|| regex(r"mailto:([^\[\s]+)\[([^\]]*)\]"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(https?://[^\s\[<>\x{E000}\x{E001}]+)(?:\[([^\]]*)\])?"));
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| regex(r"\x{E000}(\d+)\x{E001}"));

static UNCONSTRAINED_MONO: LazyLock<Regex> = LazyLock::new(|| regex(r"``(.+?)``"));
static UNCONSTRAINED_STRONG: LazyLock<Regex> = LazyLock::new(|| regex(r"\*\*(.+?)\*\*"));
static UNCONSTRAINED_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| regex(r"__(.+?)__"));

/// AsciiDoc subset renderer. See the [module docs](self) for coverage.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiDocRenderer;

impl AsciiDocRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupRenderer for AsciiDocRenderer {
    fn render(&self, body: &str, base_dir: &Path) -> Result<String, RenderError> {
        let lines = expand_includes(body, base_dir, 0)?;
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let mut converter = Converter::new();
        converter.blocks(&refs);
        Ok(converter.out)
    }
}

/// Splice `include::` targets into the line stream.
///
/// Missing targets leave an "Unresolved directive" line behind, like
/// asciidoctor does; unreadable existing targets are an error.
fn expand_includes(body: &str, base_dir: &Path, depth: usize) -> Result<Vec<String>, RenderError> {
    let mut lines = Vec::new();
    for line in body.lines() {
        let Some(caps) = INCLUDE.captures(line.trim_end()) else {
            lines.push(line.to_string());
            continue;
        };

        let target = base_dir.join(&caps[1]);
        if depth < MAX_INCLUDE_DEPTH && target.is_file() {
            let content = std::fs::read_to_string(&target).map_err(|source| {
                RenderError::Include {
                    path: target.clone(),
                    source,
                }
            })?;
            let nested_base = target.parent().unwrap_or(base_dir);
            lines.extend(expand_includes(&content, nested_base, depth + 1)?);
        } else {
            tracing::warn!(path = %target.display(), "unresolved include directive");
            lines.push(format!("Unresolved directive - {}", line.trim()));
        }
    }
    Ok(lines)
}

// ============================================================================
// Block structure
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Listing,
    Literal,
    Quote,
    Sidebar,
    Example,
    Comment,
}

impl Delimiter {
    /// Delimiter lines are four or more repetitions of one marker character.
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        let first = line.chars().next()?;
        if line.chars().count() < 4 || !line.chars().all(|c| c == first) {
            return None;
        }
        match first {
            '-' => Some(Self::Listing),
            '.' => Some(Self::Literal),
            '_' => Some(Self::Quote),
            '*' => Some(Self::Sidebar),
            '=' => Some(Self::Example),
            '/' => Some(Self::Comment),
            _ => None,
        }
    }
}

/// Title, attribute list, and anchor waiting for the next block.
#[derive(Debug, Default)]
struct BlockMeta {
    title: Option<String>,
    attrs: Option<String>,
    id: Option<String>,
}

/// Parsed block attribute list, e.g. `[source,ini,linenums]`.
#[derive(Debug, Default)]
struct Attrs {
    positional: Vec<String>,
    named: HashMap<String, String>,
}

impl Attrs {
    fn parse(raw: &str) -> Self {
        let mut attrs = Attrs::default();
        for token in raw.split(',') {
            let token = token.trim();
            match token.split_once('=') {
                Some((key, value)) => {
                    let value = value.trim().trim_matches('"');
                    attrs
                        .named
                        .insert(key.trim().to_lowercase(), value.to_string());
                }
                None => attrs.positional.push(token.to_string()),
            }
        }
        attrs
    }

    /// First positional token without `%options`, `#id`, or `.role` shorthands.
    fn style(&self) -> Option<&str> {
        let first = self.positional.first()?;
        let end = first.find(['%', '#', '.']).unwrap_or(first.len());
        Some(&first[..end]).filter(|s| !s.is_empty())
    }

    fn positional(&self, index: usize) -> Option<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

fn is_block_attribute_line(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('[') && line.ends_with(']') && !line.starts_with("[[")
}

fn is_block_title(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('.')
        && chars
            .next()
            .is_some_and(|c| !c.is_whitespace() && c != '.')
}

fn ends_paragraph(line: &str) -> bool {
    line.trim().is_empty() || Delimiter::parse(line).is_some()
}

/// Lines between `lines[start]` and its matching closing delimiter.
///
/// Unterminated blocks run to the end of input.
fn take_delimited<'a>(lines: &[&'a str], start: usize) -> (Vec<&'a str>, usize) {
    let delimiter = lines[start].trim_end();
    let mut end = start + 1;
    while end < lines.len() && lines[end].trim_end() != delimiter {
        end += 1;
    }
    let content = lines[start + 1..end].to_vec();
    (content, (end + 1).min(lines.len()))
}

struct Converter {
    out: String,
    attributes: HashMap<String, String>,
    used_ids: HashMap<String, usize>,
}

impl Converter {
    fn new() -> Self {
        let attributes = [
            ("nbsp", "\u{a0}"),
            ("empty", ""),
            ("sp", " "),
            ("plus", "+"),
            ("startsb", "["),
            ("endsb", "]"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            out: String::new(),
            attributes,
            used_ids: HashMap::new(),
        }
    }

    fn blocks(&mut self, lines: &[&str]) {
        let mut meta = BlockMeta::default();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim_end();

            if line.trim().is_empty() {
                i += 1;
                continue;
            }
            if let Some(delimiter) = Delimiter::parse(line) {
                let (content, next) = take_delimited(lines, i);
                if delimiter != Delimiter::Comment {
                    self.delimited(delimiter, &content, std::mem::take(&mut meta));
                }
                i = next;
                continue;
            }
            if line.starts_with("//") {
                i += 1;
                continue;
            }
            if let Some(caps) = ATTRIBUTE_ENTRY.captures(line) {
                self.attributes
                    .insert(caps[1].trim().to_string(), caps[2].trim().to_string());
                i += 1;
                continue;
            }
            if let Some(caps) = ANCHOR.captures(line) {
                meta.id = Some(caps[1].to_string());
                i += 1;
                continue;
            }
            if is_block_attribute_line(line) {
                meta.attrs = Some(line[1..line.len() - 1].to_string());
                i += 1;
                continue;
            }
            if is_block_title(line) {
                meta.title = Some(line[1..].to_string());
                i += 1;
                continue;
            }
            if line == "'''" {
                self.out.push_str("<hr />\n");
                i += 1;
                continue;
            }
            if line == "<<<" {
                i += 1;
                continue;
            }
            if let Some(caps) = HEADING.captures(line) {
                self.heading(caps[1].len(), &caps[2], std::mem::take(&mut meta));
                i += 1;
                continue;
            }
            if let Some(caps) = BLOCK_IMAGE.captures(line) {
                self.block_image(&caps[1], &caps[2], std::mem::take(&mut meta));
                i += 1;
                continue;
            }
            if LIST_ITEM.is_match(line) {
                i = self.list(lines, i, std::mem::take(&mut meta));
                continue;
            }
            if line.starts_with([' ', '\t']) {
                let start = i;
                while i < lines.len() && !lines[i].trim().is_empty() {
                    i += 1;
                }
                self.literal_paragraph(&lines[start..i], std::mem::take(&mut meta));
                continue;
            }

            let start = i;
            while i < lines.len() && !ends_paragraph(lines[i]) {
                i += 1;
            }
            let text: Vec<&str> = lines[start..i]
                .iter()
                .map(|l| l.trim_end())
                .filter(|l| !l.starts_with("//"))
                .collect();
            self.paragraph(&text, std::mem::take(&mut meta));
        }
    }

    fn delimited(&mut self, delimiter: Delimiter, content: &[&str], meta: BlockMeta) {
        let attrs = meta.attrs.as_deref().map(Attrs::parse).unwrap_or_default();
        let id = self.id_attr(meta.id.as_deref());
        let title = self.title_html(meta.title.as_deref());

        match delimiter {
            Delimiter::Listing | Delimiter::Literal => {
                let body = escape_text(&content.join("\n"));
                match attrs.style() {
                    Some("source") => {
                        let language = attrs
                            .positional(1)
                            .or(attrs.named.get("language").map(String::as_str))
                            .filter(|l| !l.contains(char::is_whitespace));
                        let code_open = match language {
                            Some(lang) => {
                                let lang = escape_attr(lang);
                                format!(r#"<code class="language-{lang}" data-lang="{lang}">"#)
                            }
                            None => "<code>".to_string(),
                        };
                        self.out.push_str(&format!(
                            "<div class=\"listingblock\"{id}>\n{title}<div class=\"content\">\n<pre class=\"highlight\">{code_open}{body}</code></pre>\n</div>\n</div>\n"
                        ));
                    }
                    _ if delimiter == Delimiter::Listing => {
                        self.out.push_str(&format!(
                            "<div class=\"listingblock\"{id}>\n{title}<div class=\"content\">\n<pre>{body}</pre>\n</div>\n</div>\n"
                        ));
                    }
                    _ => {
                        self.out.push_str(&format!(
                            "<div class=\"literalblock\"{id}>\n{title}<div class=\"content\">\n<pre>{body}</pre>\n</div>\n</div>\n"
                        ));
                    }
                }
            }
            Delimiter::Quote => {
                self.out
                    .push_str(&format!("<div class=\"quoteblock\"{id}>\n{title}<blockquote>\n"));
                self.blocks(content);
                self.out.push_str("</blockquote>\n");
                if let Some(author) = attrs.positional(1) {
                    let author = self.inline(author);
                    self.out
                        .push_str(&format!("<div class=\"attribution\">\n\u{2014} {author}"));
                    if let Some(cite) = attrs.positional(2) {
                        let cite = self.inline(cite);
                        self.out.push_str(&format!("<br />\n<cite>{cite}</cite>"));
                    }
                    self.out.push_str("\n</div>\n");
                }
                self.out.push_str("</div>\n");
            }
            Delimiter::Sidebar | Delimiter::Example => {
                let class = if delimiter == Delimiter::Sidebar {
                    "sidebarblock"
                } else {
                    "exampleblock"
                };
                self.out.push_str(&format!(
                    "<div class=\"{class}\"{id}>\n{title}<div class=\"content\">\n"
                ));
                self.blocks(content);
                self.out.push_str("</div>\n</div>\n");
            }
            Delimiter::Comment => {}
        }
    }

    fn heading(&mut self, marker_len: usize, title: &str, meta: BlockMeta) {
        let id = match meta.id {
            Some(id) => id,
            None => self.section_id(title),
        };
        let text = self.inline(title);
        self.out.push_str(&format!(
            "<h{marker_len} id=\"{}\">{text}</h{marker_len}>\n",
            escape_attr(&id)
        ));
    }

    fn block_image(&mut self, target: &str, raw_attrs: &str, meta: BlockMeta) {
        let attrs = Attrs::parse(raw_attrs);
        let alt = attrs
            .named
            .get("alt")
            .map(String::as_str)
            .or(attrs.positional(0))
            .map(str::to_string)
            .unwrap_or_else(|| default_alt(target));

        let mut img = format!(
            r#"<img src="{}" alt="{}""#,
            escape_attr(target),
            escape_attr(&alt)
        );
        let width = attrs.named.get("width").map(String::as_str).or(attrs.positional(1));
        let height = attrs.named.get("height").map(String::as_str).or(attrs.positional(2));
        if let Some(width) = width {
            img.push_str(&format!(r#" width="{}""#, escape_attr(width)));
        }
        if let Some(height) = height {
            img.push_str(&format!(r#" height="{}""#, escape_attr(height)));
        }
        img.push_str(" />");

        let id = self.id_attr(meta.id.as_deref());
        let title = self.title_html(meta.title.as_deref());
        self.out.push_str(&format!(
            "<div class=\"imageblock\"{id}>\n<div class=\"content\">\n{img}\n</div>\n{title}</div>\n"
        ));
    }

    /// Consume list items starting at `start`, returning the next unread index.
    fn list(&mut self, lines: &[&str], start: usize, meta: BlockMeta) -> usize {
        let mut items: Vec<(String, String)> = Vec::new();
        let mut i = start;

        while i < lines.len() {
            let line = lines[i].trim_end();
            if let Some(caps) = LIST_ITEM.captures(line) {
                items.push((caps[1].to_string(), caps[2].to_string()));
                i += 1;
                continue;
            }
            if line.trim().is_empty() {
                // A blank line only continues the list when another item follows
                let next = (i..lines.len()).find(|&k| !lines[k].trim().is_empty());
                match next {
                    Some(k) if LIST_ITEM.is_match(lines[k].trim_end()) => {
                        i = k;
                        continue;
                    }
                    _ => break,
                }
            }
            if line.starts_with("//") {
                i += 1;
                continue;
            }
            if Delimiter::parse(line).is_some()
                || is_block_attribute_line(line)
                || HEADING.is_match(line)
            {
                break;
            }
            if let Some(last) = items.last_mut() {
                last.1.push('\n');
                last.1.push_str(line.trim());
            }
            i += 1;
        }

        self.render_list(&items, meta);
        i
    }

    fn render_list(&mut self, items: &[(String, String)], meta: BlockMeta) {
        let id = self.id_attr(meta.id.as_deref());
        let title = self.title_html(meta.title.as_deref());
        let mut open: Vec<&str> = Vec::new();

        for (marker, text) in items {
            if let Some(pos) = open.iter().position(|m| *m == marker.as_str()) {
                while open.len() > pos + 1 {
                    if let Some(inner) = open.pop() {
                        self.out.push_str("</li>\n");
                        self.out.push_str(close_list(inner));
                    }
                }
                self.out.push_str("</li>\n");
            } else {
                let (id, title) = if open.is_empty() {
                    (id.as_str(), title.as_str())
                } else {
                    ("", "")
                };
                if marker.starts_with('.') {
                    self.out.push_str(&format!(
                        "<div class=\"olist arabic\"{id}>\n{title}<ol class=\"arabic\">\n"
                    ));
                } else {
                    self.out
                        .push_str(&format!("<div class=\"ulist\"{id}>\n{title}<ul>\n"));
                }
                open.push(marker.as_str());
            }
            let text = self.inline(text);
            self.out.push_str(&format!("<li>\n<p>{text}</p>\n"));
        }

        while let Some(marker) = open.pop() {
            self.out.push_str("</li>\n");
            self.out.push_str(close_list(marker));
        }
    }

    fn literal_paragraph(&mut self, lines: &[&str], meta: BlockMeta) {
        let indent = lines
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        let body = lines
            .iter()
            .map(|l| l.get(indent..).unwrap_or("").trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        let id = self.id_attr(meta.id.as_deref());
        let title = self.title_html(meta.title.as_deref());
        self.out.push_str(&format!(
            "<div class=\"literalblock\"{id}>\n{title}<div class=\"content\">\n<pre>{}</pre>\n</div>\n</div>\n",
            escape_text(&body)
        ));
    }

    fn paragraph(&mut self, lines: &[&str], meta: BlockMeta) {
        if lines.is_empty() {
            return;
        }
        let attrs = meta.attrs.as_deref().map(Attrs::parse).unwrap_or_default();
        let id = self.id_attr(meta.id.as_deref());
        let title = self.title_html(meta.title.as_deref());

        let joined = lines.join("\n");
        let admonition = match attrs.style() {
            Some(style) if ADMONITION.is_match(&format!("{style}: x")) => {
                Some((style.to_string(), joined.clone()))
            }
            _ => ADMONITION
                .captures(&joined)
                .map(|caps| (caps[1].to_string(), caps[2].to_string())),
        };

        match admonition {
            Some((kind, text)) => {
                let text = self.paragraph_text(&text);
                let label = capitalize(&kind);
                self.out.push_str(&format!(
                    "<div class=\"admonitionblock {}\"{id}>\n<table>\n<tr>\n<td class=\"icon\">\n<div class=\"title\">{label}</div>\n</td>\n<td class=\"content\">\n{title}{text}\n</td>\n</tr>\n</table>\n</div>\n",
                    kind.to_lowercase()
                ));
            }
            None => {
                let text = self.paragraph_text(&joined);
                self.out.push_str(&format!(
                    "<div class=\"paragraph\"{id}>\n{title}<p>{text}</p>\n</div>\n"
                ));
            }
        }
    }

    /// Inline-convert paragraph text, honouring ` +` hard line breaks.
    fn paragraph_text(&self, text: &str) -> String {
        let converted = self.inline(text);
        let mut out = converted.replace(" +\n", "<br />\n");
        if let Some(stripped) = out.strip_suffix(" +") {
            out = stripped.to_string();
        }
        out
    }

    fn title_html(&self, title: Option<&str>) -> String {
        match title {
            Some(t) => format!("<div class=\"title\">{}</div>\n", self.inline(t)),
            None => String::new(),
        }
    }

    fn id_attr(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!(" id=\"{}\"", escape_attr(id)),
            None => String::new(),
        }
    }

    /// `_`-prefixed, `_`-separated id, unique within the document.
    fn section_id(&mut self, title: &str) -> String {
        let mut base = String::from("_");
        for ch in title.to_lowercase().chars() {
            if ch.is_alphanumeric() {
                base.push(ch);
            } else if !base.ends_with('_') {
                base.push('_');
            }
        }
        while base.len() > 1 && base.ends_with('_') {
            base.pop();
        }

        let count = self.used_ids.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{base}_{count}")
        }
    }

    fn inline(&self, text: &str) -> String {
        let mut stash: Vec<String> = Vec::new();
        let text = substitute_attributes(text, &self.attributes);
        let text = stash_macros(&text, &mut stash);
        let text = escape_text(&text);
        let text = apply_quotes(&text, &mut stash);
        restore(&text, &stash)
    }
}

fn close_list(marker: &str) -> &'static str {
    if marker.starts_with('.') {
        "</ol>\n</div>\n"
    } else {
        "</ul>\n</div>\n"
    }
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Alt text derived from an image file name: `my-cover_2.png` → `my cover 2`.
fn default_alt(target: &str) -> String {
    let file = target.rsplit('/').next().unwrap_or(target);
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    stem.replace(['-', '_'], " ")
}

// ============================================================================
// Inline substitutions
// ============================================================================

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

fn placeholder(stash: &mut Vec<String>, html: String) -> String {
    let index = stash.len();
    stash.push(html);
    format!("{PLACEHOLDER_OPEN}{index}{PLACEHOLDER_CLOSE}")
}

fn substitute_attributes(text: &str, attributes: &HashMap<String, String>) -> String {
    ATTRIBUTE_REF
        .replace_all(text, |caps: &Captures<'_>| match attributes.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn link_html(href: &str, text: Option<&str>) -> String {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => format!(r#"<a href="{}">{}</a>"#, escape_attr(href), escape_text(text)),
        None => format!(
            r#"<a href="{}" class="bare">{}</a>"#,
            escape_attr(href),
            escape_text(href)
        ),
    }
}

fn xref_href(target: &str) -> String {
    if target.contains(".adoc") || target.starts_with('#') {
        target.to_string()
    } else {
        format!("#{target}")
    }
}

fn stash_macros(text: &str, stash: &mut Vec<String>) -> String {
    let text = XREF_SHORTHAND.replace_all(text, |caps: &Captures<'_>| {
        let target = &caps[1];
        let label = caps.get(2).map_or(target, |m| m.as_str());
        let html = format!(
            r#"<a href="{}">{}</a>"#,
            escape_attr(&xref_href(target)),
            escape_text(label.trim())
        );
        placeholder(stash, html)
    });
    let text = XREF_MACRO.replace_all(&text, |caps: &Captures<'_>| {
        let target = &caps[1];
        let label = Some(&caps[2]).filter(|l| !l.trim().is_empty()).unwrap_or(target);
        let html = format!(
            r#"<a href="{}">{}</a>"#,
            escape_attr(&xref_href(target)),
            escape_text(label.trim())
        );
        placeholder(stash, html)
    });
    let text = INLINE_IMAGE.replace_all(&text, |caps: &Captures<'_>| {
        let target = &caps[1];
        let attrs = Attrs::parse(&caps[2]);
        let alt = attrs
            .positional(0)
            .map(str::to_string)
            .unwrap_or_else(|| default_alt(target));
        let html = format!(
            r#"<span class="image"><img src="{}" alt="{}" /></span>"#,
            escape_attr(target),
            escape_attr(&alt)
        );
        placeholder(stash, html)
    });
    let text = LINK_MACRO.replace_all(&text, |caps: &Captures<'_>| {
        let html = link_html(&caps[1], Some(&caps[2]));
        placeholder(stash, html)
    });
    let text = MAILTO_MACRO.replace_all(&text, |caps: &Captures<'_>| {
        let href = format!("mailto:{}", &caps[1]);
        let label = Some(&caps[2]).filter(|l| !l.trim().is_empty()).unwrap_or(&caps[1]);
        let html = link_html(&href, Some(label));
        placeholder(stash, html)
    });
    let text = BARE_URL.replace_all(&text, |caps: &Captures<'_>| {
        let url = &caps[1];
        match caps.get(2) {
            Some(label) => {
                let html = link_html(url, Some(label.as_str()));
                placeholder(stash, html)
            }
            None => {
                // Sentence punctuation after a bare URL is not part of it
                let trimmed = url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
                let tail = &url[trimmed.len()..];
                let html = link_html(trimmed, None);
                format!("{}{tail}", placeholder(stash, html))
            }
        }
    });
    text.into_owned()
}

fn apply_quotes(text: &str, stash: &mut Vec<String>) -> String {
    let text = UNCONSTRAINED_MONO
        .replace_all(text, |caps: &Captures<'_>| {
            placeholder(stash, format!("<code>{}</code>", &caps[1]))
        })
        .into_owned();
    let text = constrained(&text, '`', |inner| {
        placeholder(stash, format!("<code>{inner}</code>"))
    });

    let text = UNCONSTRAINED_STRONG
        .replace_all(&text, "<strong>$1</strong>")
        .into_owned();
    let text = constrained(&text, '*', |inner| format!("<strong>{inner}</strong>"));

    let text = UNCONSTRAINED_EMPHASIS
        .replace_all(&text, |caps: &Captures<'_>| {
            if nests_cleanly(&caps[1]) {
                format!("<em>{}</em>", &caps[1])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned();
    constrained(&text, '_', |inner| format!("<em>{inner}</em>"))
}

/// Whether the quote tags inside a candidate span are balanced, so wrapping
/// it cannot cross a span that is already open.
///
/// Runs after escaping, so every tag seen here came from the quote pass.
fn nests_cleanly(html: &str) -> bool {
    const TAGS: [&str; 4] = ["<strong>", "</strong>", "<em>", "</em>"];
    let mut open: Vec<&str> = Vec::new();
    let mut rest = html;
    while let Some(at) = rest.find('<') {
        rest = &rest[at..];
        match TAGS.into_iter().find(|tag| rest.starts_with(tag)) {
            Some("<strong>") => open.push("strong"),
            Some("<em>") => open.push("em"),
            Some("</strong>") if open.pop() != Some("strong") => return false,
            Some("</em>") if open.pop() != Some("em") => return false,
            _ => {}
        }
        rest = &rest[1..];
    }
    open.is_empty()
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace `mark`-delimited spans that sit on word boundaries.
fn constrained(text: &str, mark: char, mut wrap: impl FnMut(&str) -> String) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == mark && opens_at(&chars, i, mark) {
            if let Some(close) = closing_index(&chars, i, mark) {
                let inner: String = chars[i + 1..close].iter().collect();
                if nests_cleanly(&inner) {
                    out.push_str(&wrap(&inner));
                    i = close + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn opens_at(chars: &[char], i: usize, mark: char) -> bool {
    let boundary_before = i == 0 || (!is_word(chars[i - 1]) && chars[i - 1] != mark);
    let starts_content = chars
        .get(i + 1)
        .is_some_and(|c| !c.is_whitespace() && *c != mark);
    boundary_before && starts_content
}

fn closing_index(chars: &[char], open: usize, mark: char) -> Option<usize> {
    (open + 2..chars.len()).find(|&j| {
        chars[j] == mark
            && !chars[j - 1].is_whitespace()
            && chars
                .get(j + 1)
                .is_none_or(|c| !is_word(*c) && *c != mark)
    })
}

fn restore(text: &str, stash: &[String]) -> String {
    let mut current = text.to_string();
    // Stashed monospace may itself contain stashed macros
    for _ in 0..4 {
        if !current.contains(PLACEHOLDER_OPEN) {
            break;
        }
        current = PLACEHOLDER
            .replace_all(&current, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| stash.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn render(body: &str) -> String {
        AsciiDocRenderer::new()
            .render(body, Path::new("."))
            .unwrap()
    }

    // =========================================================================
    // Paragraphs and headings
    // =========================================================================

    #[test]
    fn paragraph_is_wrapped() {
        let html = render("Hello world.");
        assert_eq!(html, "<div class=\"paragraph\">\n<p>Hello world.</p>\n</div>\n");
    }

    #[test]
    fn blank_lines_separate_paragraphs() {
        let html = render("one\ntwo\n\nthree");
        assert_eq!(html.matches("<div class=\"paragraph\">").count(), 2);
        assert!(html.contains("<p>one\ntwo</p>"));
        assert!(html.contains("<p>three</p>"));
    }

    #[test]
    fn headings_get_section_ids() {
        let html = render("== First Section\n\n=== Deeper Part");
        assert!(html.contains(r#"<h2 id="_first_section">First Section</h2>"#));
        assert!(html.contains(r#"<h3 id="_deeper_part">Deeper Part</h3>"#));
    }

    #[test]
    fn duplicate_heading_ids_are_numbered() {
        let html = render("== Setup\n\n== Setup");
        assert!(html.contains(r#"id="_setup""#));
        assert!(html.contains(r#"id="_setup_2""#));
    }

    #[test]
    fn anchor_overrides_heading_id() {
        let html = render("[[custom]]\n== Title");
        assert!(html.contains(r#"<h2 id="custom">Title</h2>"#));
    }

    #[test]
    fn text_is_escaped() {
        let html = render("a < b && c > d");
        assert!(html.contains("a &lt; b &amp;&amp; c &gt; d"));
    }

    #[test]
    fn hard_line_breaks() {
        let html = render("first +\nsecond");
        assert!(html.contains("first<br />\nsecond"));
    }

    #[test]
    fn comments_are_dropped() {
        let html = render("// hidden\nvisible\n\n////\nblock comment\n////\n");
        assert!(!html.contains("hidden"));
        assert!(!html.contains("block comment"));
        assert!(html.contains("visible"));
    }

    // =========================================================================
    // Listing and literal blocks
    // =========================================================================

    #[test]
    fn source_block_carries_language() {
        let html = render("[source,ini]\n----\n[section]\nkey=value\n----");
        assert!(html.contains(
            r#"<pre class="highlight"><code class="language-ini" data-lang="ini">[section]
key=value</code></pre>"#
        ));
        assert!(html.starts_with("<div class=\"listingblock\">"));
    }

    #[test]
    fn source_block_with_options_shorthand() {
        let html = render("[source%linenums,java]\n----\nclass A {}\n----");
        assert!(html.contains(r#"data-lang="java""#));
    }

    #[test]
    fn source_block_without_language() {
        let html = render("[source]\n----\nplain\n----");
        assert!(html.contains("<pre class=\"highlight\"><code>plain</code></pre>"));
    }

    #[test]
    fn source_attributes_survive_blank_lines_and_titles() {
        let html = render("[source,js]\n\n.Example\n----\nlet x = 1;\n----");
        assert!(html.contains(r#"<div class="title">Example</div>"#));
        assert!(html.contains(r#"data-lang="js""#));
    }

    #[test]
    fn code_content_is_escaped_and_not_formatted() {
        let html = render("[source,html]\n----\n<b>*bold*</b> & more\n----");
        assert!(html.contains("&lt;b&gt;*bold*&lt;/b&gt; &amp; more"));
        assert!(!html.contains("<strong>"));
    }

    #[test]
    fn plain_listing_and_literal_blocks() {
        let listing = render("----\nraw text\n----");
        assert!(listing.contains("<div class=\"listingblock\">"));
        assert!(listing.contains("<pre>raw text</pre>"));

        let literal = render("....\nliteral text\n....");
        assert!(literal.contains("<div class=\"literalblock\">"));
        assert!(literal.contains("<pre>literal text</pre>"));
    }

    #[test]
    fn literal_delimiter_with_source_style_is_code() {
        let html = render("[source,sh]\n....\necho hi\n....");
        assert!(html.contains(r#"<code class="language-sh" data-lang="sh">echo hi</code>"#));
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let html = render("----\nno end");
        assert!(html.contains("<pre>no end</pre>"));
    }

    #[test]
    fn indented_lines_form_literal_paragraph() {
        let html = render("  indented\n    more");
        assert!(html.contains("<pre>indented\n  more</pre>"));
    }

    // =========================================================================
    // Images, lists, compound blocks
    // =========================================================================

    #[test]
    fn block_image_with_alt() {
        let html = render("image::images/cover.png[Cover]");
        assert!(html.contains(r#"<div class="imageblock">"#));
        assert!(html.contains(r#"<img src="images/cover.png" alt="Cover" />"#));
    }

    #[test]
    fn block_image_default_alt_and_size() {
        let html = render("image::img/my-cover_2.png[,640,480]");
        assert!(html.contains(r#"alt="my cover 2""#));
        assert!(html.contains(r#"width="640""#));
        assert!(html.contains(r#"height="480""#));
    }

    #[test]
    fn unordered_list_with_nesting() {
        let html = render("* one\n** nested\n* two");
        assert_eq!(
            html,
            "<div class=\"ulist\">\n<ul>\n<li>\n<p>one</p>\n<div class=\"ulist\">\n<ul>\n<li>\n<p>nested</p>\n</li>\n</ul>\n</div>\n</li>\n<li>\n<p>two</p>\n</li>\n</ul>\n</div>\n"
        );
    }

    #[test]
    fn ordered_list() {
        let html = render(". first\n. second");
        assert!(html.contains("<ol class=\"arabic\">"));
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn list_items_across_blank_lines() {
        let html = render("- a\n\n- b\n\nafter");
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn quote_block_with_attribution() {
        let html = render("[quote, Ada Lovelace, Notes]\n____\nInner *text*\n____");
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<strong>text</strong>"));
        assert!(html.contains("Ada Lovelace"));
        assert!(html.contains("<cite>Notes</cite>"));
    }

    #[test]
    fn sidebar_and_example_blocks_nest() {
        let html = render("****\nside\n****\n\n====\nexample\n====");
        assert!(html.contains("<div class=\"sidebarblock\">"));
        assert!(html.contains("<div class=\"exampleblock\">"));
        assert!(html.contains("<p>side</p>"));
    }

    #[test]
    fn admonition_paragraphs() {
        let html = render("NOTE: Mind the gap.");
        assert!(html.contains("<div class=\"admonitionblock note\">"));
        assert!(html.contains("<div class=\"title\">Note</div>"));
        assert!(html.contains("Mind the gap."));

        let styled = render("[TIP]\nUse the force.");
        assert!(styled.contains("<div class=\"admonitionblock tip\">"));
    }

    #[test]
    fn thematic_break() {
        assert!(render("a\n\n'''\n\nb").contains("<hr />"));
    }

    // =========================================================================
    // Inline formatting and macros
    // =========================================================================

    #[test]
    fn constrained_quotes() {
        let html = render("a *bold* and _em_ and `code` here");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>em</em>"));
        assert!(html.contains("<code>code</code>"));
    }

    #[test]
    fn adjacent_constrained_spans() {
        let html = render("*a* *b*");
        assert!(html.contains("<strong>a</strong> <strong>b</strong>"));
    }

    #[test]
    fn intraword_marks_are_literal() {
        let html = render("snake_case_name and 2*3*4");
        assert!(html.contains("snake_case_name"));
        assert!(html.contains("2*3*4"));
    }

    #[test]
    fn unconstrained_quotes() {
        let html = render("**un**constrained");
        assert!(html.contains("<strong>un</strong>constrained"));
    }

    #[test]
    fn overlapping_marks_do_not_cross() {
        let html = render("*bold _mixed* end_");
        assert!(html.contains("<strong>bold _mixed</strong> end_"));
        assert!(!html.contains("<em>"));

        let html = render("**bold __mixed** end__");
        assert!(html.contains("<strong>bold __mixed</strong> end__"));
    }

    #[test]
    fn nested_marks_still_apply() {
        let html = render("*bold _inner_ text* and _em *inner* text_");
        assert!(html.contains("<strong>bold <em>inner</em> text</strong>"));
        assert!(html.contains("<em>em <strong>inner</strong> text</em>"));
    }

    #[test]
    fn quote_tag_balance() {
        assert!(nests_cleanly("plain"));
        assert!(nests_cleanly("a <strong>b</strong> c"));
        assert!(nests_cleanly("<em><strong>x</strong></em>"));
        assert!(!nests_cleanly("mixed</strong> end"));
        assert!(!nests_cleanly("<strong>open"));
        assert!(!nests_cleanly("<em>a</strong>"));
    }

    #[test]
    fn monospace_protects_its_content() {
        let html = render("`*not bold*`");
        assert!(html.contains("<code>*not bold*</code>"));
    }

    #[test]
    fn link_macros_and_bare_urls() {
        let html = render(
            "See link:other.adoc[the other post], https://example.com[Example] and https://rust-lang.org.",
        );
        assert!(html.contains(r#"<a href="other.adoc">the other post</a>"#));
        assert!(html.contains(r#"<a href="https://example.com">Example</a>"#));
        assert!(html.contains(r#"<a href="https://rust-lang.org" class="bare">https://rust-lang.org</a>."#));
    }

    #[test]
    fn urls_with_ampersands_are_escaped_once() {
        let html = render("https://example.com/?a=1&b=2[q]");
        assert!(html.contains(r#"href="https://example.com/?a=1&amp;b=2""#));
    }

    #[test]
    fn cross_references() {
        let html = render("Read <<post-two.adoc#intro,part two>> or <<setup>>.");
        assert!(html.contains(r#"<a href="post-two.adoc#intro">part two</a>"#));
        assert!(html.contains(r##"<a href="#setup">setup</a>"##));

        let macro_form = render("xref:guide.adoc[Guide]");
        assert!(macro_form.contains(r#"<a href="guide.adoc">Guide</a>"#));
    }

    #[test]
    fn inline_image_and_mailto() {
        let html = render("icon image:icons/x.png[X] mail mailto:me@example.com[Me]");
        assert!(html.contains(r#"<span class="image"><img src="icons/x.png" alt="X" /></span>"#));
        assert!(html.contains(r#"<a href="mailto:me@example.com">Me</a>"#));
    }

    #[test]
    fn document_attributes_are_substituted() {
        let html = render(":project: Quire\n\nWelcome to {project}{nbsp}site, {unknown} stays.");
        assert!(html.contains("Welcome to Quire\u{a0}site, {unknown} stays."));
    }

    // =========================================================================
    // Includes
    // =========================================================================

    #[test]
    fn include_splices_file_relative_to_base_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("snippets")).unwrap();
        std::fs::write(tmp.path().join("snippets/config.ini"), "key=value\n").unwrap();

        let html = AsciiDocRenderer::new()
            .render(
                "[source,ini]\n----\ninclude::snippets/config.ini[]\n----",
                tmp.path(),
            )
            .unwrap();
        assert!(html.contains(">key=value</code>"));
    }

    #[test]
    fn missing_include_leaves_marker() {
        let tmp = TempDir::new().unwrap();
        let html = AsciiDocRenderer::new()
            .render("include::missing.adoc[]", tmp.path())
            .unwrap();
        assert!(html.contains("Unresolved directive - include::missing.adoc[]"));
    }

    // =========================================================================
    // Attribute list parsing
    // =========================================================================

    #[test]
    fn attrs_parse_style_and_named_values() {
        let attrs = Attrs::parse("source%linenums, java, opts=\"nowrap\"");
        assert_eq!(attrs.style(), Some("source"));
        assert_eq!(attrs.positional(1), Some("java"));
        assert_eq!(attrs.named.get("opts").map(String::as_str), Some("nowrap"));
    }

    #[test]
    fn delimiter_detection() {
        assert_eq!(Delimiter::parse("----"), Some(Delimiter::Listing));
        assert_eq!(Delimiter::parse("------"), Some(Delimiter::Listing));
        assert_eq!(Delimiter::parse("...."), Some(Delimiter::Literal));
        assert_eq!(Delimiter::parse("---"), None);
        assert_eq!(Delimiter::parse("--x-"), None);
    }
}
