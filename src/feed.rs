//! RSS 2.0 feed generation.
//!
//! The feed is written event by event with `quick-xml`, so escaping of text
//! and attributes is handled by the writer. Descriptions and full content go
//! into CDATA sections, with any `]]>` inside split across two sections.
//!
//! ```text
//! <rss version="2.0" xmlns:atom=... xmlns:content=...>
//!   <channel>
//!     <title/> <link/> <description/> <language/> <pubDate/> <lastBuildDate/>
//!     <atom:link href=".../feed.xml" rel="self" type="application/rss+xml"/>
//!     <item>
//!       <title/> <link/> <pubDate/> <guid isPermaLink="false"/>
//!       <description><![CDATA[...]]></description>
//!       <content:encoded><![CDATA[...]]></content:encoded>
//!     </item>
//!   </channel>
//! </rss>
//! ```

use crate::config::SiteConfig;
use crate::html::{self, MarkupError};
use crate::parse::truncate_chars;
use crate::types::Post;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;
use thiserror::Error;

/// Maximum characters of an item description.
pub const DESCRIPTION_LENGTH: usize = 400;

/// Output path relative to the output root.
pub const FEED_PATH: &str = "feed.xml";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Feed content error: {0}")]
    Markup(#[from] MarkupError),
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Make text safe for a CDATA section by splitting every `]]>`.
pub fn cdata_safe(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}

/// Item description: the teaser, or the plain text when the teaser is blank,
/// cut to [`DESCRIPTION_LENGTH`] characters.
pub fn feed_description(post: &Post) -> String {
    let content = if post.teaser.trim().is_empty() {
        &post.plain_text
    } else {
        &post.teaser
    };
    truncate_chars(content, DESCRIPTION_LENGTH)
}

/// RFC 2822 timestamp for a post date, at the start of the day in `zone`.
///
/// A midnight that occurs twice takes the earlier instant. A midnight skipped
/// by a DST change is read as UTC instead.
pub fn rfc2822_date(date: NaiveDate, zone: Tz) -> String {
    let midnight = date.and_time(NaiveTime::MIN);
    match zone.from_local_datetime(&midnight).earliest() {
        Some(local) => local.to_rfc2822(),
        None => zone.from_utc_datetime(&midnight).to_rfc2822(),
    }
}

fn write_text_element(writer: &mut XmlWriter, tag: &str, text: &str) -> Result<(), FeedError> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_cdata_element(writer: &mut XmlWriter, tag: &str, text: &str) -> Result<(), FeedError> {
    let safe = cdata_safe(text);
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::CData(BytesCData::new(safe.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_item(writer: &mut XmlWriter, config: &SiteConfig, post: &Post) -> Result<(), FeedError> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &post.title)?;
    write_text_element(writer, "link", &config.absolute_url(&post.url()))?;
    write_text_element(writer, "pubDate", &rfc2822_date(post.date, config.timezone()))?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&post.guid())))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    write_cdata_element(writer, "description", &feed_description(post))?;
    let content = html::absolutize_urls(&post.html_content, &config.site.base_url)?;
    write_cdata_element(writer, "content:encoded", &content)?;

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

/// Render the feed for `posts`, which must already be in listing order.
///
/// `now` is used for the channel's `pubDate` and `lastBuildDate`, shown in
/// the site time zone.
pub fn render_feed(
    config: &SiteConfig,
    posts: &[&Post],
    now: DateTime<Utc>,
) -> Result<String, FeedError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
    rss.push_attribute(("xmlns:content", "http://purl.org/rss/1.0/modules/content/"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    let site = &config.site;
    let build_date = now.with_timezone(&config.timezone()).to_rfc2822();
    write_text_element(&mut writer, "title", &site.title)?;
    write_text_element(&mut writer, "link", &site.base_url)?;
    write_text_element(&mut writer, "description", &site.description)?;
    write_text_element(&mut writer, "language", &site.language)?;
    write_text_element(&mut writer, "pubDate", &build_date)?;
    write_text_element(&mut writer, "lastBuildDate", &build_date)?;

    let self_url = config.absolute_url(&format!("/{FEED_PATH}"));
    let mut atom_link = BytesStart::new("atom:link");
    atom_link.push_attribute(("href", self_url.as_str()));
    atom_link.push_attribute(("rel", "self"));
    atom_link.push_attribute(("type", "application/rss+xml"));
    writer.write_event(Event::Empty(atom_link))?;

    for post in posts {
        write_item(&mut writer, config, post)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut xml = String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned();
    xml.push('\n');
    Ok(xml)
}
