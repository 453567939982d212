use tracing::debug;

use super::EditorState;
use super::content::{
    insert_at, marks_in_range, next_word_boundary, previous_word_boundary, split_off, take_range,
    update_marks,
};
use super::normalize::normalize;
use super::structure::{insert_block_after, lift_items, remove_block, wrap_blocks};
use crate::document::{Document, ListKind, Mark, Marks, NodeKey, TextBlock, TextKind};
use crate::selection::{Point, Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    WordLeft,
    WordRight,
    DocumentStart,
    DocumentEnd,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SetBlock(TextKind),
    WrapBlock(ListKind),
    UnwrapBlock(ListKind),
    SplitBlock,
    ToggleMark(Mark),
    DeleteRange,
    ExtendToStartOfBlock,
    InsertText(String),
    DeleteBackward,
    DeleteForward,
    Move { motion: Motion, extend: bool },
    Select(Selection),
    SelectAll,
    Focus,
    Blur,
}

pub fn apply(state: &EditorState, command: &Command) -> EditorState {
    Change::new(state).apply(command.clone()).finish()
}

/// An ordered batch of commands applied to a copy of the state.
#[derive(Clone, Debug)]
pub struct Change {
    state: EditorState,
    commands: Vec<Command>,
}

impl Change {
    pub fn new(state: &EditorState) -> Self {
        Self {
            state: state.clone(),
            commands: Vec::new(),
        }
    }

    pub fn apply(mut self, command: Command) -> Self {
        execute(&mut self.state, &command);
        self.commands.push(command);
        self
    }

    pub fn set_block(self, kind: TextKind) -> Self {
        self.apply(Command::SetBlock(kind))
    }

    pub fn wrap_block(self, kind: ListKind) -> Self {
        self.apply(Command::WrapBlock(kind))
    }

    pub fn unwrap_block(self, kind: ListKind) -> Self {
        self.apply(Command::UnwrapBlock(kind))
    }

    pub fn split_block(self) -> Self {
        self.apply(Command::SplitBlock)
    }

    pub fn toggle_mark(self, mark: Mark) -> Self {
        self.apply(Command::ToggleMark(mark))
    }

    pub fn delete(self) -> Self {
        self.apply(Command::DeleteRange)
    }

    pub fn extend_to_start_of_block(self) -> Self {
        self.apply(Command::ExtendToStartOfBlock)
    }

    pub fn insert_text(self, text: impl Into<String>) -> Self {
        self.apply(Command::InsertText(text.into()))
    }

    pub fn delete_backward(self) -> Self {
        self.apply(Command::DeleteBackward)
    }

    pub fn delete_forward(self) -> Self {
        self.apply(Command::DeleteForward)
    }

    pub fn move_to(self, motion: Motion, extend: bool) -> Self {
        self.apply(Command::Move { motion, extend })
    }

    pub fn select(self, selection: Selection) -> Self {
        self.apply(Command::Select(selection))
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn finish(mut self) -> EditorState {
        normalize(&mut self.state);
        debug!(commands = ?self.commands, "change applied");
        self.state
    }
}

fn execute(state: &mut EditorState, command: &Command) {
    match command {
        Command::SetBlock(kind) => set_block(state, *kind),
        Command::WrapBlock(kind) => {
            let keys = state.selection.block_keys(&state.document);
            wrap_blocks(&mut state.document, &keys, *kind);
        }
        Command::UnwrapBlock(kind) => unwrap_block(state, *kind),
        Command::SplitBlock => split_block(state),
        Command::ToggleMark(mark) => toggle_mark(state, *mark),
        Command::DeleteRange => {
            delete_range(state);
        }
        Command::ExtendToStartOfBlock => {
            let focus = state.selection.focus;
            state.selection.focus = Point::new(focus.key, 0);
        }
        Command::InsertText(text) => insert_text(state, text),
        Command::DeleteBackward => delete_backward(state),
        Command::DeleteForward => delete_forward(state),
        Command::Move { motion, extend } => move_selection(state, *motion, *extend),
        Command::Select(selection) => {
            state.selection = *selection;
            state.stored_marks = None;
        }
        Command::SelectAll => {
            let document = &state.document;
            if let (Some(first), Some(last)) = (document.first_block(), document.last_block()) {
                state.selection =
                    Selection::new(Point::new(first.key, 0), Point::new(last.key, last.char_len()));
            }
            state.stored_marks = None;
        }
        Command::Focus => state.focused = true,
        Command::Blur => state.focused = false,
    }
}

fn clamp(document: &Document, point: Point) -> Option<Point> {
    let block = document.block(point.key)?;
    Some(Point::new(point.key, point.offset.min(block.char_len())))
}

fn set_block(state: &mut EditorState, kind: TextKind) {
    for key in state.selection.block_keys(&state.document) {
        if let Some(block) = state.document.block_mut(key) {
            block.kind = kind;
        }
    }
}

fn unwrap_block(state: &mut EditorState, kind: ListKind) {
    let keys = state.selection.block_keys(&state.document);
    lift_items(&mut state.document, |item, list_kind| {
        list_kind == kind && keys.contains(&item.key)
    });
}

fn split_block(state: &mut EditorState) {
    if state.selection.is_expanded() {
        delete_range(state);
    }
    let Some(at) = clamp(&state.document, state.selection.focus) else {
        return;
    };
    let Some(block) = state.document.block_mut(at.key) else {
        return;
    };
    let kind = block.kind;
    let tail = split_off(&mut block.leaves, at.offset);
    let new_block = state.document.new_block(kind, tail);
    let new_key = new_block.key;
    if insert_block_after(&mut state.document, at.key, new_block) {
        state.selection = Selection::collapsed(Point::new(new_key, 0));
    }
}

fn covered_range(block: &TextBlock, start: Point, end: Point) -> (usize, usize) {
    let from = if block.key == start.key { start.offset } else { 0 };
    let to = if block.key == end.key {
        end.offset
    } else {
        block.char_len()
    };
    (from.min(block.char_len()), to.min(block.char_len()))
}

fn toggle_mark(state: &mut EditorState, mark: Mark) {
    if state.selection.is_collapsed() {
        let mut marks = state.active_marks();
        marks.toggle(mark);
        state.stored_marks = Some(marks);
        return;
    }

    let (start, end) = state.selection.ordered(&state.document);
    let keys = state.selection.block_keys(&state.document);
    let mut found: Vec<Marks> = Vec::new();
    for key in &keys {
        if let Some(block) = state.document.block(*key) {
            let (from, to) = covered_range(block, start, end);
            found.extend(marks_in_range(&block.leaves, from, to));
        }
    }
    let remove = !found.is_empty() && found.iter().all(|marks| marks.contains(mark));

    for key in keys {
        if let Some(block) = state.document.block_mut(key) {
            let (from, to) = covered_range(block, start, end);
            update_marks(&mut block.leaves, from, to, |marks| {
                if remove {
                    marks.remove(mark);
                } else {
                    marks.insert(mark);
                }
            });
        }
    }
}

fn delete_range(state: &mut EditorState) -> bool {
    if state.selection.is_collapsed() {
        return false;
    }
    let (start, end) = state.selection.ordered(&state.document);
    let (Some(start), Some(end)) = (clamp(&state.document, start), clamp(&state.document, end))
    else {
        return false;
    };

    if start.key == end.key {
        if let Some(block) = state.document.block_mut(start.key) {
            take_range(&mut block.leaves, start.offset, end.offset);
        }
    } else {
        let keys = state.selection.block_keys(&state.document);
        let mut tail = Vec::new();
        if let Some(block) = state.document.block_mut(end.key) {
            tail = split_off(&mut block.leaves, end.offset);
        }
        for key in keys.iter().filter(|key| **key != start.key) {
            remove_block(&mut state.document, *key);
        }
        if let Some(block) = state.document.block_mut(start.key) {
            split_off(&mut block.leaves, start.offset);
            block.leaves.extend(tail);
        }
    }

    state.selection = Selection::collapsed(start);
    true
}

fn insert_text(state: &mut EditorState, text: &str) {
    if text.is_empty() {
        return;
    }
    let marks = state.active_marks();
    delete_range(state);
    let Some(at) = clamp(&state.document, state.selection.focus) else {
        return;
    };
    if let Some(block) = state.document.block_mut(at.key) {
        insert_at(&mut block.leaves, at.offset, text, marks);
        let caret = Point::new(at.key, at.offset + text.chars().count());
        state.selection = Selection::collapsed(caret);
        state.stored_marks = None;
    }
}

fn delete_backward(state: &mut EditorState) {
    if delete_range(state) {
        return;
    }
    let Some(at) = clamp(&state.document, state.selection.focus) else {
        return;
    };
    if at.offset > 0 {
        if let Some(block) = state.document.block_mut(at.key) {
            take_range(&mut block.leaves, at.offset - 1, at.offset);
        }
        state.selection = Selection::collapsed(Point::new(at.key, at.offset - 1));
        return;
    }
    if let Some(previous) = neighbour(&state.document, at.key, -1) {
        join_blocks(state, previous, at.key);
    }
}

fn delete_forward(state: &mut EditorState) {
    if delete_range(state) {
        return;
    }
    let Some(at) = clamp(&state.document, state.selection.focus) else {
        return;
    };
    let len = state.document.block(at.key).map_or(0, TextBlock::char_len);
    if at.offset < len {
        if let Some(block) = state.document.block_mut(at.key) {
            take_range(&mut block.leaves, at.offset, at.offset + 1);
        }
        return;
    }
    if let Some(next) = neighbour(&state.document, at.key, 1) {
        join_blocks(state, at.key, next);
    }
}

fn join_blocks(state: &mut EditorState, first: NodeKey, second: NodeKey) {
    let Some(removed) = remove_block(&mut state.document, second) else {
        return;
    };
    if let Some(block) = state.document.block_mut(first) {
        let seam = block.char_len();
        block.leaves.extend(removed.leaves);
        state.selection = Selection::collapsed(Point::new(first, seam));
    }
}

fn neighbour(document: &Document, key: NodeKey, step: isize) -> Option<NodeKey> {
    let keys = document.block_keys();
    let index = keys.iter().position(|candidate| *candidate == key)?;
    let target = index.checked_add_signed(step)?;
    keys.get(target).copied()
}

fn move_selection(state: &mut EditorState, motion: Motion, extend: bool) {
    state.stored_marks = None;
    let document = &state.document;

    if !extend && state.selection.is_expanded() {
        match motion {
            Motion::Left => {
                state.selection = state.selection.collapse_to_start(document);
                return;
            }
            Motion::Right => {
                state.selection = state.selection.collapse_to_end(document);
                return;
            }
            _ => {}
        }
    }

    let Some(focus) = clamp(document, state.selection.focus) else {
        return;
    };
    let Some(target) = motion_target(document, focus, motion) else {
        return;
    };
    state.selection = if extend {
        Selection::new(state.selection.anchor, target)
    } else {
        Selection::collapsed(target)
    };
}

fn motion_target(document: &Document, from: Point, motion: Motion) -> Option<Point> {
    let block = document.block(from.key)?;
    let len = block.char_len();
    let previous = neighbour(document, from.key, -1).and_then(|key| document.block(key));
    let next = neighbour(document, from.key, 1).and_then(|key| document.block(key));

    let target = match motion {
        Motion::Left if from.offset > 0 => Point::new(from.key, from.offset - 1),
        Motion::WordLeft if from.offset > 0 => {
            Point::new(from.key, previous_word_boundary(&block.text(), from.offset))
        }
        Motion::Left | Motion::WordLeft => match previous {
            Some(previous) => Point::new(previous.key, previous.char_len()),
            None => Point::new(from.key, 0),
        },
        Motion::Right if from.offset < len => Point::new(from.key, from.offset + 1),
        Motion::WordRight if from.offset < len => {
            Point::new(from.key, next_word_boundary(&block.text(), from.offset))
        }
        Motion::Right | Motion::WordRight => match next {
            Some(next) => Point::new(next.key, 0),
            None => Point::new(from.key, len),
        },
        Motion::Up => match previous {
            Some(previous) => Point::new(previous.key, from.offset.min(previous.char_len())),
            None => Point::new(from.key, 0),
        },
        Motion::Down => match next {
            Some(next) => Point::new(next.key, from.offset.min(next.char_len())),
            None => Point::new(from.key, len),
        },
        Motion::LineStart => Point::new(from.key, 0),
        Motion::LineEnd => Point::new(from.key, len),
        Motion::DocumentStart => {
            let first = document.first_block()?;
            Point::new(first.key, 0)
        }
        Motion::DocumentEnd => {
            let last = document.last_block()?;
            Point::new(last.key, last.char_len())
        }
    };
    Some(target)
}
