//! # Quire
//!
//! A static blog generator for AsciiDoc posts. A content directory of `.adoc`
//! files, images and other assets becomes a complete site: one page per post,
//! an index with teasers and cover thumbnails, an archive, tag pages, an RSS
//! feed, and a client-side search index. While serving, the site is kept up
//! to date file by file instead of being rebuilt from scratch.
//!
//! # Architecture: Registry Plus Derived Pages
//!
//! ```text
//! content/*.adoc ── parse ──▶ Post ──▶ Site registry ──▶ post pages
//!                                           │
//!                                           └──────────▶ index, archive, tags,
//!                                                        feed, search index
//! content/*      ── copy ──────────────────────────────▶ output/*
//! ```
//!
//! Posts are immutable values keyed by their source path. Everything built
//! from more than one post (the aggregates) is regenerated from the whole
//! registry after any change, so aggregates can never drift from the posts.
//! A single post page only depends on its own post plus the config, which is
//! what makes the incremental path cheap.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`site`] | Post registry, full build, incremental event handling, aggregates |
//! | [`parse`] | Front matter and body of one `.adoc` file into a [`types::Post`] |
//! | [`markup`] | `MarkupRenderer` seam and the built-in AsciiDoc renderer |
//! | [`html`] | Streaming post-processing of rendered fragments: links, code blocks, text |
//! | [`links`] | Site-URL resolution for relative references |
//! | [`slug`] | Tag slugs |
//! | [`generate`] | Maud page templates |
//! | [`feed`] | RSS 2.0 feed via quick-xml |
//! | [`search_index`] | Hand-written `search-index.json` |
//! | [`imaging`] | Cover thumbnails: pure calculations, backend trait, `image` backend |
//! | [`assets`] | Bundled CSS/JS and file copy helpers |
//! | [`events`] | Classification of file-system events |
//! | [`watch`] | notify watcher feeding the site one event at a time |
//! | [`serve`] | tiny_http dev server |
//! | [`config`] | `quire.toml` loading and validation |
//! | [`types`] | Shared `Post` type and path helpers |
//! | [`output`] | CLI progress lines |
//!
//! # Design Decisions
//!
//! ## Maud Over Template Engines
//!
//! Pages are generated with [Maud](https://maud.lambda.xyz/). Templates are
//! checked at compile time, interpolation is escaped by default, and there is
//! no template directory to ship next to the binary.
//!
//! ## One Writer
//!
//! The [`site::Site`] is owned by exactly one thread. The watcher runs on its
//! own thread but only sends events over a channel; the dev server only
//! reads files. Nothing locks the registry because nothing shares it.
//!
//! ## Seams for Tests
//!
//! Rendering markup and touching image pixels are both behind traits
//! ([`markup::MarkupRenderer`], [`imaging::ImageBackend`]). Unit tests use
//! stubs that record calls, so the pipeline logic is tested without decoding
//! real images.

pub mod assets;
pub mod config;
pub mod events;
pub mod feed;
pub mod generate;
pub mod html;
pub mod imaging;
pub mod links;
pub mod markup;
pub mod output;
pub mod parse;
pub mod search_index;
pub mod serve;
pub mod site;
pub mod slug;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
