use super::EditorState;
use super::change::Change;
use super::content::marks_in_range;
use crate::document::{BlockType, ListKind, Mark, TextKind};

pub fn toggle_mark(state: &EditorState, mark: Mark) -> EditorState {
    state.change().toggle_mark(mark).finish()
}

pub fn toggle_block(state: &EditorState, block: BlockType) -> EditorState {
    let change = match block {
        BlockType::Paragraph => toggle_text_block(state, TextKind::Paragraph),
        BlockType::HeadingOne => toggle_text_block(state, TextKind::HeadingOne),
        BlockType::HeadingTwo => toggle_text_block(state, TextKind::HeadingTwo),
        BlockType::BlockQuote => toggle_text_block(state, TextKind::BlockQuote),
        BlockType::ListItem => toggle_text_block(state, TextKind::ListItem),
        BlockType::BulletedList => toggle_list(state, ListKind::Bulleted),
        BlockType::NumberedList => toggle_list(state, ListKind::Numbered),
    };
    change.finish()
}

fn toggle_text_block(state: &EditorState, kind: TextKind) -> Change {
    let is_active = has_block(state, kind.into());
    let is_list = has_block(state, BlockType::ListItem);
    let target = if is_active { TextKind::Paragraph } else { kind };

    let change = state.change().set_block(target);
    if is_list {
        change
            .unwrap_block(ListKind::Bulleted)
            .unwrap_block(ListKind::Numbered)
    } else {
        change
    }
}

fn toggle_list(state: &EditorState, kind: ListKind) -> Change {
    let is_list = has_block(state, BlockType::ListItem);
    let is_type = in_list_of(state, kind);

    if is_list && is_type {
        state
            .change()
            .set_block(TextKind::Paragraph)
            .unwrap_block(ListKind::Bulleted)
            .unwrap_block(ListKind::Numbered)
    } else if is_list {
        state.change().unwrap_block(kind.other()).wrap_block(kind)
    } else {
        state.change().set_block(TextKind::ListItem).wrap_block(kind)
    }
}

/// Whether any selected block has the given type. For list types this asks
/// whether a selected block sits inside such a list.
pub fn has_block(state: &EditorState, block: BlockType) -> bool {
    match block.list_kind() {
        Some(kind) => in_list_of(state, kind),
        None => state
            .selected_blocks()
            .iter()
            .any(|selected| BlockType::from(selected.kind) == block),
    }
}

pub fn in_list_of(state: &EditorState, kind: ListKind) -> bool {
    state.selected_blocks().iter().any(|block| {
        state
            .document
            .closest_list(block.key)
            .is_some_and(|list| list.kind == kind)
    })
}

/// Whether the mark is active: on a caret, for the next typed text; on a
/// range, for any selected character.
pub fn has_mark(state: &EditorState, mark: Mark) -> bool {
    if state.is_collapsed() {
        return state.active_marks().contains(mark);
    }
    let (start, end) = state.selection.ordered(&state.document);
    state.selected_blocks().iter().any(|block| {
        let from = if block.key == start.key { start.offset } else { 0 };
        let to = if block.key == end.key {
            end.offset
        } else {
            block.char_len()
        };
        marks_in_range(&block.leaves, from, to)
            .iter()
            .any(|marks| marks.contains(mark))
    })
}
