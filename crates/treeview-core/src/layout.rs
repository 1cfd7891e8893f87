//! Row layout.
//!
//! Flattens a tree (or forest) into the ordered list of visible rows using an
//! iterative pre-order walk with an explicit stack, so deep trees cannot
//! overflow the call stack. Children come from an injected accessor, which
//! returns `None` for collapsed nodes and leaves out hidden children.

use crate::config::TreeOptions;

/// Row geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Indent per depth level.
    pub indent: f32,
    pub row_height: f32,
    /// Extra offset for every row after the first.
    pub root_offset: f32,
}

impl Metrics {
    pub fn from_options(options: &TreeOptions) -> Self {
        Self {
            indent: options.depth,
            row_height: options.height,
            root_offset: options.root_offset(),
        }
    }

    /// Vertical offset of the row at `index`.
    pub fn y_at(&self, index: usize) -> f32 {
        let base = index as f32 * self.row_height;
        if index > 0 { base + self.root_offset } else { base }
    }

    /// Height of the row at `index` (the first row may be taller).
    pub fn height_at(&self, index: usize) -> f32 {
        if index == 0 {
            self.row_height + self.root_offset
        } else {
            self.row_height
        }
    }

    /// Total height of `count` stacked rows.
    pub fn total_height(&self, count: usize) -> f32 {
        if count == 0 {
            0.0
        } else {
            self.y_at(count - 1) + self.row_height
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::from_options(&TreeOptions::default())
    }
}

/// One laid-out node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<N> {
    pub node: N,
    pub depth: usize,
    pub index: usize,
    pub x: f32,
    pub y: f32,
}

/// Lay out `roots` in document order.
///
/// Forest roots are walked one after another with a shared row counter, so
/// `y` is monotonic across the whole forest. An empty root list yields no
/// rows.
pub fn layout<N, F, I>(roots: &[N], mut children: F, metrics: &Metrics) -> Vec<Placement<N>>
where
    N: Copy,
    F: FnMut(N) -> Option<I>,
    I: IntoIterator<Item = N>,
{
    let mut order: Vec<(N, usize)> = Vec::new();
    let mut stack: Vec<(N, usize)> = Vec::new();
    let mut scratch: Vec<N> = Vec::new();

    for &root in roots {
        stack.push((root, 0));
        while let Some((node, depth)) = stack.pop() {
            order.push((node, depth));
            if let Some(kids) = children(node) {
                scratch.clear();
                scratch.extend(kids);
                // Reverse so the first child is popped first.
                stack.extend(scratch.iter().rev().map(|&c| (c, depth + 1)));
            }
        }
    }

    order
        .into_iter()
        .enumerate()
        .map(|(index, (node, depth))| Placement {
            node,
            depth,
            index,
            x: depth as f32 * metrics.indent,
            y: metrics.y_at(index),
        })
        .collect()
}
