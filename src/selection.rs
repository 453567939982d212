use std::cmp::Ordering;

use crate::document::{Document, NodeKey};

/// A caret position: a text block and a character offset inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// Anchor/focus pair. The anchor stays put while the focus moves when a
/// selection is extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn at_start(document: &Document) -> Option<Self> {
        let first = document.first_block()?;
        Some(Self::collapsed(Point::new(first.key, 0)))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn is_backward(&self, document: &Document) -> bool {
        compare_points(document, &self.anchor, &self.focus) == Some(Ordering::Greater)
    }

    pub fn ordered(&self, document: &Document) -> (Point, Point) {
        if self.is_backward(document) {
            (self.focus, self.anchor)
        } else {
            (self.anchor, self.focus)
        }
    }

    pub fn start(&self, document: &Document) -> Point {
        self.ordered(document).0
    }

    pub fn end(&self, document: &Document) -> Point {
        self.ordered(document).1
    }

    pub fn collapse_to_start(&self, document: &Document) -> Self {
        Self::collapsed(self.start(document))
    }

    pub fn collapse_to_end(&self, document: &Document) -> Self {
        Self::collapsed(self.end(document))
    }

    pub fn block_keys(&self, document: &Document) -> Vec<NodeKey> {
        let (start, end) = self.ordered(document);
        let keys = document.block_keys();
        let (Some(first), Some(last)) = (
            keys.iter().position(|key| *key == start.key),
            keys.iter().position(|key| *key == end.key),
        ) else {
            return Vec::new();
        };
        keys[first..=last].to_vec()
    }
}

pub fn compare_points(document: &Document, a: &Point, b: &Point) -> Option<Ordering> {
    let a_index = document.block_index(a.key)?;
    let b_index = document.block_index(b.key)?;
    Some(a_index.cmp(&b_index).then(a.offset.cmp(&b.offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Leaf, TextKind};

    fn two_blocks() -> (Document, NodeKey, NodeKey) {
        let mut document = Document::empty();
        let a = document.push_block(TextKind::Paragraph, vec![Leaf::plain("alpha")]);
        let b = document.push_block(TextKind::Paragraph, vec![Leaf::plain("beta")]);
        (document, a, b)
    }

    #[test]
    fn backward_selection_orders_points() {
        let (document, a, b) = two_blocks();
        let selection = Selection::new(Point::new(b, 2), Point::new(a, 1));
        assert!(selection.is_backward(&document));
        assert_eq!(selection.start(&document), Point::new(a, 1));
        assert_eq!(selection.end(&document), Point::new(b, 2));
        assert_eq!(selection.block_keys(&document), vec![a, b]);
    }

    #[test]
    fn collapsed_selection_touches_one_block() {
        let (document, _, b) = two_blocks();
        let selection = Selection::collapsed(Point::new(b, 0));
        assert!(selection.is_collapsed());
        assert!(!selection.is_expanded());
        assert_eq!(selection.block_keys(&document), vec![b]);
    }
}
