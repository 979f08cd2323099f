//! Typewriter reveal.
//!
//! Reveals inline content one character at a time. Each frame is the first
//! `n` characters of the content tree, cut so that every element on the path
//! to the cut point is kept and closed. Inline `pause` elements hold the
//! reveal for their duration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use stagehand_markup::domain::vocabulary as tags;
use stagehand_markup::{Element, Node};
use stagehand_stage::application::compiler::{CompileOptions, pause_duration};

use crate::application::context::PlaybackContext;
use crate::domain::config::PlaybackConfig;
use crate::domain::signal::{Suspend, Wake};

/// How a reveal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Every character was revealed on schedule.
    Completed,
    /// The user skipped to the full text.
    Skipped,
    /// The operation was cancelled; the full text was shown.
    Cancelled,
    /// A newer reveal on the same target took over.
    Superseded,
}

/// A surface a reveal writes to. Starting a reveal invalidates any reveal
/// still in flight on the same target.
#[derive(Debug, Clone, Default)]
pub struct RevealTarget {
    generation: Arc<AtomicU64>,
}

impl RevealTarget {
    /// Creates a fresh target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Character-by-character reveal animation.
#[derive(Debug, Clone, Copy)]
pub struct Typewriter {
    char_delay: Duration,
    pauses: CompileOptions,
}

impl Typewriter {
    /// Creates a typewriter using the reveal and pause timings of `config`.
    #[must_use]
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            char_delay: config.char_delay,
            pauses: config.compile_options(),
        }
    }

    /// Reveals `content` on `target` through `ctx`.
    ///
    /// A non-animated context, or a zero character delay with no inline
    /// pauses, shows the full content in a single frame.
    pub async fn reveal(
        &self,
        target: &RevealTarget,
        content: &[Node],
        ctx: &mut dyn PlaybackContext,
    ) -> RevealOutcome {
        let generation = target.begin();
        if !ctx.is_animated() {
            ctx.present_reveal(content.to_vec(), true);
            return RevealOutcome::Completed;
        }

        let total = char_count(content);
        let mut pauses = inline_pauses(content, self.pauses).into_iter().peekable();
        let mut skipped = false;

        for shown in 0..=total {
            while let Some((_, duration)) = pauses.next_if(|&(offset, _)| offset == shown) {
                if skipped {
                    continue;
                }
                ctx.present_reveal(truncate(content, shown), false);
                match ctx.suspend(Suspend::Pause, duration).await {
                    Wake::Elapsed => {}
                    Wake::Skipped => skipped = true,
                    Wake::Cancelled => {
                        ctx.present_reveal(content.to_vec(), true);
                        return RevealOutcome::Cancelled;
                    }
                }
                if !target.is_current(generation) {
                    return RevealOutcome::Superseded;
                }
            }

            if shown < total && !skipped && !self.char_delay.is_zero() {
                ctx.present_reveal(truncate(content, shown + 1), false);
                match ctx.suspend(Suspend::CharacterDelay, self.char_delay).await {
                    Wake::Elapsed => {}
                    Wake::Skipped => skipped = true,
                    Wake::Cancelled => {
                        ctx.present_reveal(content.to_vec(), true);
                        return RevealOutcome::Cancelled;
                    }
                }
                if !target.is_current(generation) {
                    return RevealOutcome::Superseded;
                }
            }
        }

        ctx.present_reveal(content.to_vec(), true);
        if skipped {
            RevealOutcome::Skipped
        } else {
            RevealOutcome::Completed
        }
    }
}

/// Number of revealable characters in `nodes`.
#[must_use]
pub fn char_count(nodes: &[Node]) -> usize {
    nodes.iter().map(node_chars).sum()
}

fn node_chars(node: &Node) -> usize {
    match node {
        Node::Text(text) => text.chars().count(),
        Node::Element(element) => char_count(&element.children),
    }
}

/// The first `limit` characters of `nodes`, as a structurally valid tree.
///
/// Elements on the path to the cut are shallow-cloned with their children
/// truncated recursively. Empty elements are kept once the reveal reaches
/// them.
#[must_use]
pub fn truncate(nodes: &[Node], limit: usize) -> Vec<Node> {
    let mut budget = limit;
    let mut out = Vec::new();
    truncate_into(nodes, &mut budget, &mut out);
    out
}

fn truncate_into(nodes: &[Node], budget: &mut usize, out: &mut Vec<Node>) -> bool {
    for node in nodes {
        let size = node_chars(node);
        if *budget == 0 && size > 0 {
            return true;
        }
        match node {
            Node::Text(text) if size > *budget => {
                out.push(Node::Text(text.chars().take(*budget).collect()));
                *budget = 0;
                return true;
            }
            Node::Text(text) => {
                out.push(Node::Text(text.clone()));
                *budget -= size;
            }
            Node::Element(element) => {
                let mut partial = element.shallow_clone();
                let exhausted = truncate_into(&element.children, budget, &mut partial.children);
                out.push(Node::Element(partial));
                if exhausted {
                    return true;
                }
            }
        }
    }
    false
}

/// Character offsets and durations of inline `pause` elements.
fn inline_pauses(nodes: &[Node], options: CompileOptions) -> Vec<(usize, Duration)> {
    let mut offset = 0;
    let mut out = Vec::new();
    collect_pauses(nodes, options, &mut offset, &mut out);
    out
}

fn collect_pauses(
    nodes: &[Node],
    options: CompileOptions,
    offset: &mut usize,
    out: &mut Vec<(usize, Duration)>,
) {
    for node in nodes {
        match node {
            Node::Text(text) => *offset += text.chars().count(),
            Node::Element(element) => {
                if is_pause(element) {
                    out.push((*offset, pause_duration(element, options)));
                }
                collect_pauses(&element.children, options, offset, out);
            }
        }
    }
}

fn is_pause(element: &Element) -> bool {
    element.name == tags::PAUSE
}
