use crate::document::{Document, ListBlock, ListKind, Node, NodeKey, TextBlock, TextKind};

/// Moves every list item matching `lift` out of its list, splitting the list
/// around it. Items keep their type; the part of a list before the first
/// lifted item keeps the list's key.
pub(crate) fn lift_items(
    document: &mut Document,
    mut lift: impl FnMut(&TextBlock, ListKind) -> bool,
) -> bool {
    let mut changed = false;
    let nodes = std::mem::take(&mut document.nodes);
    let mut rebuilt = Vec::with_capacity(nodes.len());

    for node in nodes {
        let list = match node {
            Node::List(list) if list.items.iter().any(|item| lift(item, list.kind)) => list,
            other => {
                rebuilt.push(other);
                continue;
            }
        };

        changed = true;
        let kind = list.kind;
        let mut original_key = Some(list.key);
        let mut pending: Vec<TextBlock> = Vec::new();

        let mut flush = |pending: &mut Vec<TextBlock>,
                         rebuilt: &mut Vec<Node>,
                         document: &mut Document| {
            if pending.is_empty() {
                return;
            }
            let items = std::mem::take(pending);
            let list = match original_key.take() {
                Some(key) => ListBlock { key, kind, items },
                None => document.new_list(kind, items),
            };
            rebuilt.push(Node::List(list));
        };

        for item in list.items {
            if lift(&item, kind) {
                flush(&mut pending, &mut rebuilt, document);
                rebuilt.push(Node::Text(item));
            } else {
                pending.push(item);
            }
        }
        flush(&mut pending, &mut rebuilt, document);
    }

    document.nodes = rebuilt;
    changed
}

/// Wraps the given text blocks in a single new list. The blocks are lifted
/// out of any list first and become list items.
pub(crate) fn wrap_blocks(document: &mut Document, keys: &[NodeKey], kind: ListKind) -> bool {
    if keys.is_empty() {
        return false;
    }
    lift_items(document, |item, _| keys.contains(&item.key));

    let selected = |node: &Node| matches!(node, Node::Text(block) if keys.contains(&block.key));
    let Some(first) = document.nodes.iter().position(selected) else {
        return false;
    };
    let last = document
        .nodes
        .iter()
        .rposition(selected)
        .unwrap_or(first);

    let mut items = Vec::new();
    for node in document.nodes.drain(first..=last) {
        match node {
            Node::Text(mut block) => {
                block.kind = TextKind::ListItem;
                items.push(block);
            }
            Node::List(list) => items.extend(list.items),
        }
    }
    let list = document.new_list(kind, items);
    document.nodes.insert(first, Node::List(list));
    true
}

pub(crate) fn insert_block_after(document: &mut Document, after: NodeKey, block: TextBlock) -> bool {
    let Some(location) = document.locate(after) else {
        return false;
    };
    match location.item {
        None => {
            document.nodes.insert(location.node + 1, Node::Text(block));
            true
        }
        Some(item) => match document.nodes.get_mut(location.node) {
            Some(Node::List(list)) => {
                list.items.insert(item + 1, block);
                true
            }
            _ => false,
        },
    }
}

pub(crate) fn remove_block(document: &mut Document, key: NodeKey) -> Option<TextBlock> {
    let location = document.locate(key)?;
    match location.item {
        None => match document.nodes.remove(location.node) {
            Node::Text(block) => Some(block),
            Node::List(_) => None,
        },
        Some(item) => match document.nodes.get_mut(location.node) {
            Some(Node::List(list)) => Some(list.items.remove(item)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Leaf;

    fn list_document() -> Document {
        Document::empty().with_list(
            ListKind::Bulleted,
            vec![
                vec![Leaf::plain("a")],
                vec![Leaf::plain("b")],
                vec![Leaf::plain("c")],
            ],
        )
    }

    #[test]
    fn lifting_middle_item_splits_list() {
        let mut document = list_document();
        let list_key = document.nodes[0].key();
        let b = document.block_keys()[1];

        assert!(lift_items(&mut document, |item, _| item.key == b));

        assert_eq!(document.nodes.len(), 3);
        assert_eq!(document.nodes[0].key(), list_key);
        assert!(matches!(&document.nodes[1], Node::Text(block) if block.key == b));
        assert!(matches!(&document.nodes[2], Node::List(list) if list.items.len() == 1));
        assert_ne!(document.nodes[2].key(), list_key);
    }

    #[test]
    fn wrapping_lifts_and_regroups() {
        let mut document = list_document();
        let keys = document.block_keys();
        assert!(wrap_blocks(&mut document, &keys[1..], ListKind::Numbered));

        assert_eq!(document.nodes.len(), 2);
        let Node::List(numbered) = &document.nodes[1] else {
            panic!("expected list");
        };
        assert_eq!(numbered.kind, ListKind::Numbered);
        assert_eq!(numbered.items.len(), 2);
    }

    #[test]
    fn insert_and_remove_inside_list() {
        let mut document = list_document();
        let a = document.block_keys()[0];
        let block = document.new_block(TextKind::ListItem, vec![Leaf::plain("new")]);
        let new_key = block.key;
        assert!(insert_block_after(&mut document, a, block));
        assert_eq!(document.block_index(new_key), Some(1));

        let removed = remove_block(&mut document, new_key).unwrap();
        assert_eq!(removed.text(), "new");
        assert_eq!(document.block_index(new_key), None);
    }
}
