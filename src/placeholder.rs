//! Placeholder substitution for blocked media elements.
//!
//! Runs once per finished document load while blocking is enabled:
//!
//! 1. sweep every `<img>`/`<video>` already in the document,
//! 2. install a watcher on `<body>` that converts media elements inside any
//!    subtree inserted later,
//! 3. convert each element at most once (`data-processed` marker).
//!
//! Conversion keeps the original `src` in `data-src`, assigns a
//! document-unique `data-id` (`media-N`), pins the element to its rendered
//! size when that size is known, and applies a neutral placeholder look.
//!
//! Hosts without live mutation observation get the sweep only.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::PlaceholderConfig;
use crate::dom::{Document, DomError, MutationRecord, NodeId, NodeTree, WatchId};
use crate::resources;

pub const MEDIA_TAGS: [&str; 2] = ["img", "video"];

pub const PROCESSED_ATTR: &str = "data-processed";
pub const ID_ATTR: &str = "data-id";
pub const ORIGINAL_SRC_ATTR: &str = "data-src";

/// Visual treatment of a placeholder. Only the size pinning and the
/// processed marker are contractual; these values are presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderStyle {
    pub background: String,
    pub border: String,
    /// CSS pixels.
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            background: String::from("#f0f0f0"),
            border: String::from("1px solid #ccc"),
            min_width: 50,
            min_height: 50,
        }
    }
}

impl From<&PlaceholderConfig> for PlaceholderStyle {
    fn from(config: &PlaceholderConfig) -> Self {
        Self {
            background: config.background.clone(),
            border: config.border.clone(),
            min_width: config.min_width,
            min_height: config.min_height,
        }
    }
}

/// How much of the document is covered after an injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Existing elements converted, later insertions watched.
    Watching,
    /// Existing elements converted, no watcher (host capability).
    SweepOnly,
    /// Nothing applied.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionReport {
    /// Elements converted by this run's sweep.
    pub converted: usize,
    pub coverage: Coverage,
}

/// State kept on the document between runs, like the page-global object of
/// the injected script: id counter and installed watcher.
#[derive(Debug, Default)]
struct PlaceholderSession {
    next_id: Cell<u64>,
    watch: Cell<Option<WatchId>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// PlaceholderRecord
// ─────────────────────────────────────────────────────────────────────────────

/// What a converted element remembers about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRecord {
    pub id: String,
    pub original_src: String,
    /// Pinned `(width, height)` in CSS pixels, if the element had a
    /// rendered size at conversion time.
    pub pinned_size: Option<(u32, u32)>,
}

impl PlaceholderRecord {
    /// Reads the record back from a processed element.
    pub fn read(tree: &NodeTree, node: NodeId) -> Option<Self> {
        if !is_processed(tree, node) {
            return None;
        }
        let pinned_size = match (
            tree.style_property(node, "width").and_then(parse_px),
            tree.style_property(node, "height").and_then(parse_px),
        ) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
        Some(Self {
            id: tree.attribute(node, ID_ATTR)?.to_string(),
            original_src: tree.attribute(node, ORIGINAL_SRC_ATTR)?.to_string(),
            pinned_size,
        })
    }
}

fn parse_px(value: &str) -> Option<u32> {
    value.strip_suffix("px")?.parse().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Injector
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PlaceholderInjector {
    style: PlaceholderStyle,
}

impl PlaceholderInjector {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &PlaceholderStyle {
        &self.style
    }

    /// The same behaviour as a script for hosts that execute JavaScript.
    pub fn script(&self) -> String {
        resources::placeholder_script(&self.style)
    }

    /// Sweeps the document and installs the watcher. Safe to call again on
    /// the same document: processed elements are skipped, ids keep counting
    /// and no second watcher is installed.
    pub fn run(&self, doc: &mut Document) -> InjectionReport {
        if doc.is_torn_down() {
            debug!("Document already torn down, placeholders skipped");
            return InjectionReport {
                converted: 0,
                coverage: Coverage::Skipped,
            };
        }

        let session = session_for(doc);

        let root = doc.root();
        let media = doc.tree().elements_by_tags(root, &MEDIA_TAGS);
        let converted = media
            .into_iter()
            .filter(|&node| convert_logged(doc.tree_mut(), node, &self.style, &session.next_id))
            .count();

        if session.watch.get().is_some() {
            return InjectionReport {
                converted,
                coverage: Coverage::Watching,
            };
        }

        let style = self.style.clone();
        let watched = session.clone();
        let callback = Box::new(move |tree: &mut NodeTree, record: &MutationRecord| {
            for &added in &record.added_nodes {
                for node in tree.elements_by_tags(added, &MEDIA_TAGS) {
                    convert_logged(tree, node, &style, &watched.next_id);
                }
            }
        });

        let body = doc.body();
        let coverage = match doc.observe(body, callback) {
            Ok(id) => {
                session.watch.set(Some(id));
                debug!(converted, "Placeholder watcher installed");
                Coverage::Watching
            }
            Err(DomError::ObservationUnsupported) => {
                info!(converted, "Host has no mutation observation, placeholders applied by sweep only");
                Coverage::SweepOnly
            }
            Err(e) => {
                warn!(error = %e, "Cannot install placeholder watcher, sweep only");
                Coverage::SweepOnly
            }
        };

        InjectionReport { converted, coverage }
    }

    /// Converts a single element. Returns `true` if it was converted now,
    /// `false` if it is not a media element, has no `src`, or was already
    /// processed.
    pub fn convert_element(&self, doc: &mut Document, node: NodeId) -> bool {
        let session = session_for(doc);
        convert_logged(doc.tree_mut(), node, &self.style, &session.next_id)
    }

    /// Removes the watcher installed by [`run`](Self::run), if any.
    pub fn detach(&self, doc: &mut Document) -> bool {
        match doc.extension::<PlaceholderSession>() {
            Some(session) => match session.watch.take() {
                Some(id) => doc.unobserve(id),
                None => false,
            },
            None => false,
        }
    }
}

fn session_for(doc: &mut Document) -> Rc<PlaceholderSession> {
    match doc.extension::<PlaceholderSession>() {
        Some(session) => session,
        None => {
            let session = Rc::new(PlaceholderSession::default());
            doc.insert_extension(session.clone());
            session
        }
    }
}

pub fn is_media_element(tree: &NodeTree, node: NodeId) -> bool {
    tree.tag_name(node).is_some_and(|tag| MEDIA_TAGS.contains(&tag))
}

pub fn is_processed(tree: &NodeTree, node: NodeId) -> bool {
    tree.attribute(node, PROCESSED_ATTR)
        .is_some_and(|value| !value.is_empty())
}

fn convert_logged(tree: &mut NodeTree, node: NodeId, style: &PlaceholderStyle, next_id: &Cell<u64>) -> bool {
    match convert(tree, node, style, next_id) {
        Ok(converted) => converted,
        Err(e) => {
            debug!(error = %e, "Placeholder conversion skipped");
            false
        }
    }
}

fn convert(
    tree: &mut NodeTree,
    node: NodeId,
    style: &PlaceholderStyle,
    next_id: &Cell<u64>,
) -> Result<bool, DomError> {
    if !is_media_element(tree, node) || is_processed(tree, node) {
        return Ok(false);
    }
    let Some(src) = tree
        .attribute(node, "src")
        .filter(|src| !src.is_empty())
        .map(str::to_owned)
    else {
        return Ok(false);
    };

    let seq = next_id.get();
    next_id.set(seq + 1);
    tree.set_attribute(node, ID_ATTR, &format!("media-{seq}"))?;
    tree.set_attribute(node, ORIGINAL_SRC_ATTR, &src)?;

    if let Some((width, height)) = tree.client_size(node)
        && width > 0
        && height > 0
    {
        tree.set_style_property(node, "width", &format!("{width}px"))?;
        tree.set_style_property(node, "height", &format!("{height}px"))?;
    }

    tree.set_style_property(node, "background-color", &style.background)?;
    tree.set_style_property(node, "border", &style.border)?;
    tree.set_style_property(node, "min-width", &format!("{}px", style.min_width))?;
    tree.set_style_property(node, "min-height", &format!("{}px", style.min_height))?;

    tree.set_attribute(node, PROCESSED_ATTR, "true")?;
    Ok(true)
}
