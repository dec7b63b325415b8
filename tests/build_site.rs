//! End-to-end builds against a temporary content tree.
//!
//! Drives the public API the way the CLI does: open a site, run a full
//! build, then feed it file events. Uses the real AsciiDoc renderer and the
//! real image backend.

use quire::events::{EventKind, FileEvent};
use quire::site::{EventOutcome, Site};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CONFIG: &str = r#"[site]
title = "Thinking Out Loud"
description = "Notes on Java and AI"
base_url = "https://blog.example.org/"
language = "de-CH"
date_format = "%d.%m.%Y"
"#;

const POST_ONE: &str = "---
= First Post
Jane Doe
2026-01-12
:tags: Java,AI
---
A post with a picture and some configuration.

image::images/cover.png[Cover]

[source,ini,linenums]
----
[server]
port = 8080
----

See link:post-two.adoc[the next post].
";

const POST_TWO: &str = "---
= Second Post
John Roe
2026-01-13
:tags: AI
:teaser: Manual teaser override
---
Second body text.

[source,ini]
----
key = value
----
";

struct Blog {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Blog {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("content");
        let output = tmp.path().join("public");

        write(&input, "quire.toml", CONFIG);
        write(&input, "blog/2026/post-one.adoc", POST_ONE);
        write(&input, "blog/2026/post-two.adoc", POST_TWO);
        write(&input, "blog/2026/site.js", "console.log('blog');\n");

        let cover = input.join("blog/2026/images/cover.png");
        fs::create_dir_all(cover.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(1, 1, image::Rgba([200, 40, 40, 255]))
            .save(&cover)
            .unwrap();

        Self {
            _tmp: tmp,
            input,
            output,
        }
    }

    fn site(&self) -> Site {
        Site::open(&self.input, &self.output).unwrap()
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.output.join(relative))
            .unwrap_or_else(|e| panic!("reading {relative}: {e}"))
    }

    fn exists(&self, relative: &str) -> bool {
        self.output.join(relative).exists()
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// =========================================================================
// Full build
// =========================================================================

#[test]
fn full_build_produces_the_whole_tree() {
    let blog = Blog::new();
    let summary = blog.site().build_all(true).unwrap();
    assert_eq!(summary.posts, 2);
    assert_eq!(summary.tags, 2);

    for path in [
        "index.html",
        "archive.html",
        "search.html",
        "feed.xml",
        "assets/search-index.json",
        "assets/style-light.css",
        "assets/style-dark.css",
        "assets/code.css",
        "assets/theme.js",
        "assets/search.js",
        "assets/thumbnails/blog/2026/images/cover-thumb.png",
        "blog/2026/post-one/index.html",
        "blog/2026/post-two/index.html",
        "blog/2026/images/cover.png",
        "blog/2026/site.js",
        "tags/ai/index.html",
        "tags/java/index.html",
    ] {
        assert!(blog.exists(path), "missing {path}");
    }
}

#[test]
fn index_and_tag_pages() {
    let blog = Blog::new();
    blog.site().build_all(false).unwrap();

    let index = blog.read("index.html");
    let second = index.find("Second Post").unwrap();
    let first = index.find("First Post").unwrap();
    assert!(second < first, "newest post must come first");
    assert!(index.contains("Manual teaser override"));
    assert!(index.contains("/assets/thumbnails/blog/2026/images/cover-thumb.png"));
    assert!(index.contains("post-card-body--with-cover"));

    let java = blog.read("tags/java/index.html");
    assert!(java.contains("First Post"));
    assert!(!java.contains("Second Post"));

    let ai = blog.read("tags/ai/index.html");
    assert!(ai.contains("First Post") && ai.contains("Second Post"));
}

#[test]
fn post_page_links_and_code_blocks() {
    let blog = Blog::new();
    blog.site().build_all(false).unwrap();

    let one = blog.read("blog/2026/post-one/index.html");
    assert!(one.contains(r#"src="/blog/2026/images/cover.png""#));
    assert!(one.contains(r#"href="/blog/2026/post-two/""#));
    assert!(one.contains("line-numbers"));
    assert!(one.contains(r#"href="/tags/java/""#));
    assert!(one.contains("12.01.2026"));

    let two = blog.read("blog/2026/post-two/index.html");
    assert!(two.contains("language-ini"));
    assert!(!two.contains("line-numbers"));
}

#[test]
fn feed_contents() {
    let blog = Blog::new();
    blog.site().build_all(false).unwrap();

    let feed = blog.read("feed.xml");
    assert!(feed.contains(r#"<rss version="2.0""#));
    assert!(feed.contains("<title>Thinking Out Loud</title>"));
    assert!(feed.contains("<link>https://blog.example.org</link>"));
    assert!(feed.contains("<language>de-CH</language>"));
    assert!(feed.contains(r#"href="https://blog.example.org/feed.xml" rel="self""#));
    assert!(feed.contains("<link>https://blog.example.org/blog/2026/post-two/</link>"));
    assert!(feed.contains(r#"<guid isPermaLink="false">blog/2026/post-one/</guid>"#));
    assert!(feed.contains("<pubDate>Tue, 13 Jan 2026 00:00:00 +0100</pubDate>"));
    assert!(feed.contains("<description><![CDATA[Manual teaser override]]></description>"));
    assert!(feed.find("post-two").unwrap() < feed.find("post-one").unwrap());
}

#[test]
fn search_index_is_valid_json() {
    let blog = Blog::new();
    blog.site().build_all(false).unwrap();

    let json = blog.read("assets/search-index.json");
    let records: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["title"], "Second Post");
    assert_eq!(records[0]["date"], "2026-01-13");
    assert_eq!(records[0]["tags"], "AI");
    assert_eq!(records[0]["url"], "/blog/2026/post-two/");
    assert_eq!(records[0]["teaser"], "Manual teaser override");

    assert_eq!(records[1]["title"], "First Post");
    assert_eq!(records[1]["tags"], "Java, AI");
    let body = records[1]["body"].as_str().unwrap();
    assert!(body.starts_with("A post with a picture"));
    assert!(!body.contains('\n'));
}

// =========================================================================
// Incremental builds
// =========================================================================

#[test]
fn deleted_post_disappears_from_every_aggregate() {
    let blog = Blog::new();
    let mut site = blog.site();
    site.build_all(false).unwrap();

    fs::remove_file(blog.input.join("blog/2026/post-one.adoc")).unwrap();
    let outcome = site
        .handle_event(&FileEvent::new(EventKind::Deleted, "blog/2026/post-one.adoc"))
        .unwrap();
    assert!(matches!(outcome, EventOutcome::PostRemoved(_)));

    assert!(!blog.exists("blog/2026/post-one"));
    assert!(!blog.exists("tags/java"));
    for page in [
        "index.html",
        "archive.html",
        "tags/ai/index.html",
        "feed.xml",
        "assets/search-index.json",
    ] {
        assert!(!blog.read(page).contains("First Post"), "{page} still lists it");
    }
}

#[test]
fn renamed_tag_leaves_no_stale_page() {
    let blog = Blog::new();
    let mut site = blog.site();
    site.build_all(false).unwrap();

    write(
        &blog.input,
        "blog/2026/post-one.adoc",
        &POST_ONE.replace(":tags: Java,AI", ":tags: Kotlin,AI"),
    );
    site.handle_event(&FileEvent::new(EventKind::Modified, "blog/2026/post-one.adoc"))
        .unwrap();

    assert!(!blog.exists("tags/java"));
    assert!(blog.read("tags/kotlin/index.html").contains("First Post"));
}

#[test]
fn config_change_reaches_every_page() {
    let blog = Blog::new();
    let mut site = blog.site();
    site.build_all(false).unwrap();

    write(
        &blog.input,
        "quire.toml",
        &CONFIG.replace("%d.%m.%Y", "%Y/%m/%d"),
    );
    let outcome = site
        .handle_event(&FileEvent::new(EventKind::Modified, "quire.toml"))
        .unwrap();
    assert_eq!(outcome, EventOutcome::ConfigReloaded);

    assert!(blog.read("blog/2026/post-one/index.html").contains("2026/01/12"));
    assert!(blog.read("blog/2026/post-two/index.html").contains("2026/01/13"));
}

#[test]
fn rebuild_reuses_fresh_thumbnail() {
    let blog = Blog::new();
    let mut site = blog.site();
    site.build_all(false).unwrap();

    let thumb = blog
        .output
        .join("assets/thumbnails/blog/2026/images/cover-thumb.png");
    let first = fs::metadata(&thumb).unwrap().modified().unwrap();
    site.build_all(false).unwrap();
    let second = fs::metadata(&thumb).unwrap().modified().unwrap();
    assert_eq!(first, second);
}
