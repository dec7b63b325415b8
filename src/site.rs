//! The post registry and everything derived from it.
//!
//! A [`Site`] owns the parsed posts of one content tree, keyed by their
//! source path, together with the loaded configuration. It is the single
//! writer of the output directory: full builds and incremental updates both
//! go through it, one at a time.
//!
//! ## Full Build
//!
//! ```text
//! clean (optional) → load config → parse every .adoc (parallel, joined)
//!   → copy other files → write bundled assets → render posts → aggregates
//! ```
//!
//! Any post that fails to parse aborts a full build.
//!
//! ## Incremental Build
//!
//! [`Site::handle_event`] reacts to one [`FileEvent`] and touches only what
//! the change can affect. A changed post re-renders its own page; a changed
//! config re-renders every page. Aggregates are regenerated after any post
//! change.
//!
//! ## Aggregates
//!
//! Index, archive, search page, tag pages, feed and search index are always
//! rebuilt from the whole registry, never patched. Listings are sorted by
//! date descending, then title ascending ignoring case. The `tags/` directory
//! is deleted before tag pages are written, so a tag that disappears leaves
//! no page behind.

use crate::assets::{
    collect_source_files, copy_file, remove_dir_if_exists, remove_file_if_exists,
    write_bundled_assets, write_file,
};
use crate::config::{ConfigError, SiteConfig, load_config};
use crate::events::{EventKind, FileClass, FileEvent, classify};
use crate::feed::{FEED_PATH, FeedError, render_feed};
use crate::generate::{
    PostSummary, render_archive, render_index, render_post_page, render_search,
    render_tag_page,
};
use crate::imaging::{ImageBackend, RustBackend, resolve_cover_thumbnail};
use crate::markup::{AsciiDocRenderer, MarkupRenderer};
use crate::output::{BuildEvent, BuildSummary, print_build_event};
use crate::parse::{ParseError, parse_post};
use crate::search_index::{SEARCH_INDEX_PATH, render_search_index};
use crate::types::{Post, is_markup, strip_markup_extension, to_unix};
use chrono::Utc;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Failed to write bundled assets: {0}")]
    Bundled(std::io::Error),
    #[error("Failed to copy {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What an incremental build did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event did not require any work (e.g. the file vanished again).
    Ignored,
    PostRendered(PathBuf),
    PostRemoved(PathBuf),
    AssetCopied(PathBuf),
    AssetDeleted(PathBuf),
    ConfigReloaded,
}

/// Posts sharing one tag slug, in listing order.
#[derive(Debug)]
pub struct TagGroup<'a> {
    /// First-seen casing in listing order.
    pub name: String,
    pub slug: String,
    pub posts: Vec<&'a Post>,
}

/// Listing order: newest first, then title ascending ignoring case.
pub fn compare_posts(a: &Post, b: &Post) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.source_path.cmp(&b.source_path))
}

/// Group `posts` (already in listing order) by tag slug.
///
/// Groups appear in the order their slug is first met.
pub fn tag_index<'a>(posts: &[&'a Post]) -> Vec<TagGroup<'a>> {
    let mut groups: Vec<TagGroup<'a>> = Vec::new();
    for &post in posts {
        for tag in &post.tags {
            match groups.iter_mut().find(|g| g.slug == tag.slug) {
                Some(group) => group.posts.push(post),
                None => groups.push(TagGroup {
                    name: tag.name.clone(),
                    slug: tag.slug.clone(),
                    posts: vec![post],
                }),
            }
        }
    }
    groups
}

/// Canonical form of a directory path, or its absolute form when it does not
/// exist yet.
fn resolve_dir(path: &Path) -> std::io::Result<PathBuf> {
    fs::canonicalize(path).or_else(|_| std::path::absolute(path))
}

pub struct Site<B: ImageBackend = RustBackend> {
    input: PathBuf,
    output: PathBuf,
    config: SiteConfig,
    posts: HashMap<PathBuf, Post>,
    renderer: Box<dyn MarkupRenderer>,
    backend: B,
}

impl Site<RustBackend> {
    /// Open a content tree with the built-in AsciiDoc renderer and image
    /// backend. Fails when `quire.toml` is missing or invalid.
    pub fn open(input: &Path, output: &Path) -> Result<Self, BuildError> {
        Self::with_parts(
            input,
            output,
            Box::new(AsciiDocRenderer::new()),
            RustBackend::new(),
        )
    }
}

impl<B: ImageBackend> Site<B> {
    /// Open a content tree with a specific renderer and image backend.
    pub fn with_parts(
        input: &Path,
        output: &Path,
        renderer: Box<dyn MarkupRenderer>,
        backend: B,
    ) -> Result<Self, BuildError> {
        let input = fs::canonicalize(input)?;
        let output = resolve_dir(output)?;
        let config = load_config(&input)?;
        Ok(Self {
            input,
            output,
            config,
            posts: HashMap::new(),
            renderer,
            backend,
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// All posts in listing order.
    pub fn posts(&self) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.values().collect();
        posts.sort_by(|a, b| compare_posts(a, b));
        posts
    }

    /// Registered post for a source path relative to the content root.
    pub fn post(&self, source_path: &Path) -> Option<&Post> {
        self.posts.get(source_path)
    }

    /// Port for the dev server: the command-line value, else `dev.port`.
    pub fn resolve_serve_port(&self, cli_port: Option<u16>) -> u16 {
        cli_port.unwrap_or(self.config.dev.port)
    }

    // ========================================================================
    // Full build
    // ========================================================================

    /// Rebuild the whole site from the content tree.
    ///
    /// With `clean`, the output directory is deleted first.
    pub fn build_all(&mut self, clean: bool) -> Result<BuildSummary, BuildError> {
        let started = Instant::now();
        if clean {
            remove_dir_if_exists(&self.output)?;
        }
        fs::create_dir_all(&self.output)?;
        self.output = fs::canonicalize(&self.output)?;

        self.posts.clear();
        self.config = load_config(&self.input)?;

        let files = collect_source_files(&self.input, &self.output)?;
        let (markup, others): (Vec<&PathBuf>, Vec<&PathBuf>) =
            files.iter().partition(|path| is_markup(path));

        let input = self.input.as_path();
        let renderer = self.renderer.as_ref();
        let parsed: Vec<Result<Post, ParseError>> = markup
            .par_iter()
            .map(|relative| parse_post(&input.join(relative), input, renderer))
            .collect();
        for result in parsed {
            let post = result?;
            self.posts.insert(post.source_path.clone(), post);
        }
        tracing::info!(posts = self.posts.len(), "loaded posts");

        for relative in &others {
            self.copy_asset(relative)?;
        }
        write_bundled_assets(&self.output).map_err(BuildError::Bundled)?;

        self.render_all_posts()?;
        let tags = self.render_aggregates()?;

        Ok(BuildSummary {
            posts: self.posts.len(),
            tags,
            assets: others.len(),
            elapsed: started.elapsed(),
        })
    }

    fn copy_asset(&self, relative: &Path) -> Result<(), BuildError> {
        copy_file(&self.input.join(relative), &self.output.join(relative)).map_err(|source| {
            BuildError::Copy {
                path: relative.to_path_buf(),
                source,
            }
        })?;
        print_build_event(&BuildEvent::Copied(relative.to_path_buf()));
        Ok(())
    }

    fn render_post(&self, post: &Post) -> Result<(), BuildError> {
        let page = render_post_page(&self.config, post);
        write_file(&self.output.join(post.output_path()), &page.into_string())?;
        print_build_event(&BuildEvent::Rendered {
            source: post.source_path.clone(),
            output: post.output_path(),
        });
        Ok(())
    }

    fn render_all_posts(&self) -> Result<(), BuildError> {
        for post in self.posts() {
            self.render_post(post)?;
        }
        Ok(())
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    /// Image shown on the index card: a thumbnail when one can be made,
    /// otherwise the cover itself.
    fn index_cover(&self, post: &Post) -> Option<String> {
        let cover = post.cover_image.as_deref()?;
        let resolved = resolve_cover_thumbnail(&self.backend, &self.output, cover);
        if resolved.is_fallback() {
            tracing::debug!(post = %to_unix(&post.source_path), cover, "index shows original cover");
        }
        Some(resolved.into_value())
    }

    /// Regenerate every aggregate page. Returns the number of tag pages.
    fn render_aggregates(&self) -> Result<usize, BuildError> {
        let posts = self.posts();
        let listing: Vec<PostSummary> = posts
            .iter()
            .map(|post| PostSummary::from_post(post, None))
            .collect();
        let cards: Vec<PostSummary> = posts
            .iter()
            .map(|post| PostSummary::from_post(post, self.index_cover(post)))
            .collect();

        let config = &self.config;
        write_file(
            &self.output.join("index.html"),
            &render_index(config, &cards).into_string(),
        )?;
        write_file(
            &self.output.join("archive.html"),
            &render_archive(config, &listing).into_string(),
        )?;
        write_file(
            &self.output.join("search.html"),
            &render_search(config).into_string(),
        )?;

        let tags_dir = self.output.join("tags");
        remove_dir_if_exists(&tags_dir)?;
        let groups = tag_index(&posts);
        for group in &groups {
            let summaries: Vec<PostSummary> = group
                .posts
                .iter()
                .map(|post| PostSummary::from_post(post, None))
                .collect();
            let page = render_tag_page(config, &group.name, &summaries);
            write_file(
                &tags_dir.join(&group.slug).join("index.html"),
                &page.into_string(),
            )?;
        }

        let feed = render_feed(config, &posts, Utc::now())?;
        write_file(&self.output.join(FEED_PATH), &feed)?;
        write_file(
            &self.output.join(SEARCH_INDEX_PATH),
            &render_search_index(&posts),
        )?;

        tracing::debug!(posts = posts.len(), tags = groups.len(), "aggregates written");
        Ok(groups.len())
    }

    // ========================================================================
    // Incremental build
    // ========================================================================

    /// Apply one file change to the registry and the output tree.
    pub fn handle_event(&mut self, event: &FileEvent) -> Result<EventOutcome, BuildError> {
        let relative = event.path.clone();

        if event.kind == EventKind::Deleted {
            return match event.class {
                FileClass::Markup => {
                    self.posts.remove(&relative);
                    let stem = strip_markup_extension(&to_unix(&relative)).to_string();
                    remove_dir_if_exists(&self.output.join(stem))?;
                    print_build_event(&BuildEvent::Removed(relative.clone()));
                    self.render_aggregates()?;
                    Ok(EventOutcome::PostRemoved(relative))
                }
                FileClass::Asset | FileClass::Config => {
                    if remove_file_if_exists(&self.output.join(&relative))? {
                        print_build_event(&BuildEvent::Deleted(relative.clone()));
                    }
                    Ok(EventOutcome::AssetDeleted(relative))
                }
            };
        }

        let source = self.input.join(&relative);
        if !source.is_file() {
            tracing::debug!(path = %to_unix(&relative), "source vanished before it could be handled");
            return Ok(EventOutcome::Ignored);
        }

        match event.class {
            FileClass::Markup => {
                let post = parse_post(&source, &self.input, self.renderer.as_ref())?;
                self.render_post(&post)?;
                self.posts.insert(post.source_path.clone(), post);
                self.render_aggregates()?;
                Ok(EventOutcome::PostRendered(relative))
            }
            FileClass::Asset => {
                self.copy_asset(&relative)?;
                Ok(EventOutcome::AssetCopied(relative))
            }
            FileClass::Config => {
                self.copy_asset(&relative)?;
                self.config = load_config(&self.input)?;
                print_build_event(&BuildEvent::ConfigReloaded);
                self.render_all_posts()?;
                self.render_aggregates()?;
                Ok(EventOutcome::ConfigReloaded)
            }
        }
    }

    /// Classify a raw watcher path and handle it.
    ///
    /// Failures are logged and reported as `None` so a watch loop can keep
    /// going; irrelevant paths also yield `None`.
    pub fn dispatch(&mut self, raw_path: &Path, kind: EventKind) -> Option<EventOutcome> {
        let event = classify(&self.input, &self.output, raw_path, kind)?;
        match self.handle_event(&event) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(path = %to_unix(&event.path), error = %e, "failed to handle file event");
                None
            }
        }
    }
}
