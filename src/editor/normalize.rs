use tracing::trace;

use super::EditorState;
use super::structure::lift_items;
use crate::document::{Document, ListKind, Node, TextBlock, TextKind, normalize_leaves};
use crate::selection::{Point, Selection};

/// Restores the document invariants after a change and repairs the
/// selection so that both points address existing blocks.
pub(crate) fn normalize(state: &mut EditorState) {
    normalize_document(&mut state.document);
    repair_selection(state);
}

pub(crate) fn normalize_document(document: &mut Document) {
    if lift_items(document, |item, _| item.kind != TextKind::ListItem) {
        trace!("lifted non-list blocks out of list containers");
    }
    wrap_orphan_list_items(document);

    let before = document.nodes.len();
    document
        .nodes
        .retain(|node| !matches!(node, Node::List(list) if list.items.is_empty()));
    if document.nodes.len() != before {
        trace!(removed = before - document.nodes.len(), "dropped empty lists");
    }

    for node in &mut document.nodes {
        match node {
            Node::Text(block) => normalize_leaves(&mut block.leaves),
            Node::List(list) => {
                for item in &mut list.items {
                    normalize_leaves(&mut item.leaves);
                }
            }
        }
    }

    if document.nodes.is_empty() {
        trace!("document became empty, inserting paragraph");
        document.push_block(TextKind::Paragraph, Vec::new());
    }
}

fn wrap_orphan_list_items(document: &mut Document) {
    let has_orphans = document
        .nodes
        .iter()
        .any(|node| matches!(node, Node::Text(block) if block.kind == TextKind::ListItem));
    if !has_orphans {
        return;
    }
    trace!("wrapping orphaned list items");

    let nodes = std::mem::take(&mut document.nodes);
    let mut rebuilt = Vec::with_capacity(nodes.len());
    let mut pending: Vec<TextBlock> = Vec::new();
    for node in nodes {
        match node {
            Node::Text(block) if block.kind == TextKind::ListItem => pending.push(block),
            other => {
                if !pending.is_empty() {
                    let list = document.new_list(ListKind::Bulleted, std::mem::take(&mut pending));
                    rebuilt.push(Node::List(list));
                }
                rebuilt.push(other);
            }
        }
    }
    if !pending.is_empty() {
        let list = document.new_list(ListKind::Bulleted, pending);
        rebuilt.push(Node::List(list));
    }
    document.nodes = rebuilt;
}

fn repair_selection(state: &mut EditorState) {
    let document = &state.document;
    let fallback = || {
        document
            .first_block()
            .map(|block| Point::new(block.key, 0))
    };
    let clamp = |point: Point| -> Option<Point> {
        match document.block(point.key) {
            Some(block) => Some(Point::new(point.key, point.offset.min(block.char_len()))),
            None => fallback(),
        }
    };

    let anchor = clamp(state.selection.anchor);
    let focus = clamp(state.selection.focus);
    if let (Some(anchor), Some(focus)) = (anchor, focus) {
        let repaired = Selection::new(anchor, focus);
        if repaired != state.selection {
            trace!(?repaired, "repaired selection");
            state.selection = repaired;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Leaf, NodeKey};

    #[test]
    fn paragraphs_inside_lists_are_lifted() {
        let mut document = Document::empty().with_list(
            ListKind::Numbered,
            vec![vec![Leaf::plain("a")], vec![Leaf::plain("b")]],
        );
        let b = document.block_keys()[1];
        document.block_mut(b).unwrap().kind = TextKind::Paragraph;

        normalize_document(&mut document);

        assert_eq!(document.nodes.len(), 2);
        assert!(matches!(&document.nodes[1], Node::Text(block) if block.kind == TextKind::Paragraph));
    }

    #[test]
    fn orphan_items_are_wrapped_and_empty_lists_dropped() {
        let mut document = Document::empty()
            .with_block(TextKind::ListItem, vec![Leaf::plain("x")])
            .with_block(TextKind::ListItem, vec![Leaf::plain("y")])
            .with_list(ListKind::Bulleted, Vec::new());

        normalize_document(&mut document);

        assert_eq!(document.nodes.len(), 1);
        assert!(matches!(&document.nodes[0], Node::List(list) if list.items.len() == 2));
    }

    #[test]
    fn empty_document_gets_paragraph() {
        let mut document = Document::empty();
        normalize_document(&mut document);
        assert_eq!(document.blocks().count(), 1);
        assert_eq!(document.first_block().unwrap().kind, TextKind::Paragraph);
    }

    #[test]
    fn selection_is_clamped_and_repaired() {
        let document =
            Document::empty().with_block(TextKind::Paragraph, vec![Leaf::plain("abc")]);
        let key = document.block_keys()[0];
        let mut state = EditorState::new(document);
        state.selection = Selection::new(Point::new(key, 10), Point::new(NodeKey::from(99), 1));

        normalize(&mut state);

        assert_eq!(state.selection.anchor, Point::new(key, 3));
        assert_eq!(state.selection.focus, Point::new(key, 0));
    }
}
