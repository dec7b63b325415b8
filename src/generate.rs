//! HTML page templates.
//!
//! Every page is a pure function from site configuration plus page data to
//! [`Markup`]. Writing the result to disk is the caller's job, so these
//! functions can be unit tested on their output string alone.
//!
//! ## Generated Pages
//!
//! - **Post page** (`/<dir>/<name>/index.html`): title, meta line, tags, body
//! - **Index page** (`/index.html`): cards with teaser and cover thumbnail
//! - **Archive page** (`/archive.html`): compact list of every post
//! - **Search page** (`/search.html`): filled client-side by `search.js`
//! - **Tag pages** (`/tags/<slug>/index.html`): posts carrying one tag
//!
//! ## Shared Layout
//!
//! All pages share [`base_document`]: a navbar with the site title, links to
//! home, archive and feed, a search form that submits `q` to `/search.html`,
//! and a light/dark toggle. The stylesheet link carries both theme URLs so
//! `theme.js` can swap them without a reload.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Post bodies are already-normalized HTML fragments and are inserted with
//! [`PreEscaped`]; everything else is escaped automatically.

use crate::assets;
use crate::config::SiteConfig;
use crate::types::{DEFAULT_STATUS, Post, TagRef};
use chrono::NaiveDate;
use maud::{DOCTYPE, Markup, PreEscaped, html};

/// What a listing shows for one post.
///
/// Built from a [`Post`] by the registry. `cover` is already resolved to a
/// thumbnail URL (or left as the original cover when thumbnailing fell back).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub title: String,
    pub url: String,
    pub date: NaiveDate,
    pub tags: Vec<TagRef>,
    pub teaser: String,
    pub cover: Option<String>,
}

impl PostSummary {
    pub fn from_post(post: &Post, cover: Option<String>) -> Self {
        Self {
            title: post.title.clone(),
            url: post.url(),
            date: post.date,
            tags: post.tags.clone(),
            teaser: post.teaser.clone(),
            cover,
        }
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure.
pub fn base_document(config: &SiteConfig, page_title: &str, content: Markup) -> Markup {
    let site_title = &config.site.title;
    let full_title = if page_title == site_title {
        site_title.clone()
    } else {
        format!("{page_title} | {site_title}")
    };

    html! {
        (DOCTYPE)
        html lang=(config.site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="description" content=(config.site.description);
                title { (full_title) }
                link id="theme-style" rel="stylesheet"
                    href=(assets::STYLE_LIGHT_URL)
                    data-light=(assets::STYLE_LIGHT_URL)
                    data-dark=(assets::STYLE_DARK_URL);
                link rel="stylesheet" href=(assets::CODE_CSS_URL);
                link rel="alternate" type="application/rss+xml" title=(site_title) href="/feed.xml";
                script src=(assets::THEME_JS_URL) {}
                script src=(assets::SEARCH_JS_URL) defer {}
            }
            body {
                (navbar(config))
                main.content {
                    (content)
                }
                (site_footer(config))
            }
        }
    }
}

/// Renders the top navigation bar.
fn navbar(config: &SiteConfig) -> Markup {
    html! {
        nav.navbar id="navbar" {
            a.brand href="/" { (config.site.title) }
            ul.nav-links {
                li { a href="/" { "Home" } }
                li { a href="/archive.html" { "Archive" } }
                li { a href="/feed.xml" { "RSS" } }
            }
            form.search-form action="/search.html" method="get" role="search" {
                input id="search-input" type="search" name="q" placeholder="Search" aria-label="Search";
            }
            button.theme-toggle id="theme-toggle" type="button" { "Dark" }
        }
    }
}

fn site_footer(config: &SiteConfig) -> Markup {
    html! {
        footer.site-footer {
            p {
                (config.site.title) " · "
                a href="/feed.xml" { "RSS" }
            }
        }
    }
}

/// Renders a post's tags as links to their tag pages.
pub fn tag_list(tags: &[TagRef]) -> Markup {
    html! {
        @if !tags.is_empty() {
            ul.tags {
                @for tag in tags {
                    li { a.tag href={ "/tags/" (tag.slug) "/" } { (tag.name) } }
                }
            }
        }
    }
}

fn post_date(config: &SiteConfig, date: NaiveDate) -> Markup {
    html! {
        time.post-date datetime=(date.to_string()) { (config.format_date(date)) }
    }
}

/// A compact list entry, shared by the archive and tag pages.
fn post_list(config: &SiteConfig, posts: &[PostSummary]) -> Markup {
    html! {
        ul.post-list {
            @for post in posts {
                li {
                    a.post-title href=(post.url) { (post.title) }
                    " "
                    (post_date(config, post.date))
                }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders a single post page.
pub fn render_post_page(config: &SiteConfig, post: &Post) -> Markup {
    let content = html! {
        article.post {
            header.post-header {
                h1.post-title { (post.title) }
                div.post-meta {
                    span.post-author { (post.author) }
                    " · "
                    (post_date(config, post.date))
                    @if post.status != DEFAULT_STATUS {
                        " "
                        span.post-status { (post.status) }
                    }
                }
                (tag_list(&post.tags))
            }
            div.post-content {
                (PreEscaped(&post.html_content))
            }
        }
    };

    base_document(config, &post.title, content)
}

/// Renders the index page with one card per post.
pub fn render_index(config: &SiteConfig, posts: &[PostSummary]) -> Markup {
    let content = html! {
        section.post-cards {
            @for post in posts {
                (post_card(config, post))
            }
        }
    };

    base_document(config, &config.site.title, content)
}

fn post_card(config: &SiteConfig, post: &PostSummary) -> Markup {
    let body_class = if post.cover.is_some() {
        "post-card-body post-card-body--with-cover"
    } else {
        "post-card-body"
    };

    html! {
        article.post-card {
            @if let Some(cover) = &post.cover {
                a.post-card-cover href=(post.url) {
                    img src=(cover) alt=(post.title) loading="lazy";
                }
            }
            div class=(body_class) {
                h2.post-title { a href=(post.url) { (post.title) } }
                div.post-meta { (post_date(config, post.date)) }
                (tag_list(&post.tags))
                @if !post.teaser.trim().is_empty() {
                    p.teaser { (post.teaser) }
                }
                a.teaser-more href=(post.url) { "Read more" }
            }
        }
    }
}

/// Renders the archive page.
pub fn render_archive(config: &SiteConfig, posts: &[PostSummary]) -> Markup {
    let content = html! {
        h1 { "Archive" }
        (post_list(config, posts))
    };

    base_document(config, "Archive", content)
}

/// Renders the search page. Results are filled in by `search.js`.
pub fn render_search(config: &SiteConfig) -> Markup {
    let content = html! {
        h1 { "Search" }
        p id="search-query" {}
        div id="search-results" {}
    };

    base_document(config, "Search", content)
}

/// Renders the page listing every post with one tag.
pub fn render_tag_page(config: &SiteConfig, tag_name: &str, posts: &[PostSummary]) -> Markup {
    let page_title = format!("Tag: {tag_name}");
    let content = html! {
        h1 { (page_title) }
        (post_list(config, posts))
    };

    base_document(config, &page_title, content)
}

// ============================================================================
// Tests
// ============================================================================
