use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::document::{BlockType, Document, Mark, Marks, NodeKey, TextBlock};
use crate::html;
use crate::selection::{Point, Selection};

mod change;
mod content;
mod input;
mod normalize;
mod structure;
mod toolbar;

pub use change::{Change, Command, Motion, apply};
pub use content::{char_to_byte_idx, next_word_boundary, previous_word_boundary};
pub use input::{default_key_behavior, is_mod, on_key_down, shortcut_type};
pub use toolbar::{has_block, has_mark, in_list_of, toggle_block, toggle_mark};

use normalize::{normalize, normalize_document};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct EditorState {
    pub document: Document,
    pub selection: Selection,
    /// Marks for the next insertion, set by toggling a mark on a caret.
    pub stored_marks: Option<Marks>,
    pub focused: bool,
}

impl EditorState {
    pub fn new(mut document: Document) -> Self {
        normalize_document(&mut document);
        let start = document
            .first_block()
            .map(|block| Point::new(block.key, 0))
            .unwrap_or(Point::new(NodeKey::from(0), 0));
        let mut state = Self {
            document,
            selection: Selection::collapsed(start),
            stored_marks: None,
            focused: true,
        };
        normalize(&mut state);
        state
    }

    pub fn from_html(value: &str) -> Self {
        Self::new(html::deserialize(value))
    }

    pub fn to_html(&self) -> String {
        html::serialize(&self.document)
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        normalize(&mut self);
        self
    }

    pub fn change(&self) -> Change {
        Change::new(self)
    }

    pub fn is_collapsed(&self) -> bool {
        self.selection.is_collapsed()
    }

    pub fn is_expanded(&self) -> bool {
        self.selection.is_expanded()
    }

    pub fn is_blurred(&self) -> bool {
        !self.focused
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_collapsed()
    }

    pub fn start(&self) -> Point {
        self.selection.start(&self.document)
    }

    pub fn end(&self) -> Point {
        self.selection.end(&self.document)
    }

    pub fn start_block(&self) -> Option<&TextBlock> {
        self.document.block(self.start().key)
    }

    pub fn focus_block(&self) -> Option<&TextBlock> {
        self.document.block(self.selection.focus.key)
    }

    pub fn selected_blocks(&self) -> Vec<&TextBlock> {
        self.selection
            .block_keys(&self.document)
            .into_iter()
            .filter_map(|key| self.document.block(key))
            .collect()
    }

    pub fn active_marks(&self) -> Marks {
        if let Some(marks) = self.stored_marks {
            return marks;
        }
        let start = self.start();
        self.document
            .block(start.key)
            .map(|block| block.marks_at(start.offset))
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
struct Snapshot {
    document: Document,
    selection: Selection,
}

#[derive(Debug)]
struct History {
    undos: Vec<Snapshot>,
    redos: Vec<Snapshot>,
    limit: usize,
}

impl History {
    fn new(limit: usize) -> Self {
        Self {
            undos: Vec::new(),
            redos: Vec::new(),
            limit,
        }
    }

    fn record(&mut self, snapshot: Snapshot) {
        if self.limit == 0 {
            return;
        }
        self.undos.push(snapshot);
        if self.undos.len() > self.limit {
            let excess = self.undos.len() - self.limit;
            self.undos.drain(..excess);
        }
        self.redos.clear();
    }
}

pub type ChangeCallback = Box<dyn FnMut(&str)>;

/// The rich-text editor adapter.
pub struct Editor {
    state: EditorState,
    serialized: String,
    history: History,
    on_change: Option<ChangeCallback>,
}

impl Editor {
    pub fn new(value: &str) -> Self {
        let value = if value.trim().is_empty() {
            html::EMPTY_DOCUMENT
        } else {
            value
        };
        Self::from_state(EditorState::from_html(value))
    }

    pub fn from_document(document: Document) -> Self {
        Self::from_state(EditorState::new(document))
    }

    pub fn from_state(state: EditorState) -> Self {
        let serialized = state.to_html();
        Self {
            state,
            serialized,
            history: History::new(DEFAULT_HISTORY_LIMIT),
            on_change: None,
        }
    }

    pub fn with_on_change(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history.limit = limit;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn document(&self) -> &Document {
        &self.state.document
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn serialized(&self) -> &str {
        &self.serialized
    }

    pub fn can_undo(&self) -> bool {
        !self.history.undos.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.redos.is_empty()
    }

    /// Replaces the current snapshot. Returns true when the document
    /// changed, in which case the history is updated and the callback runs.
    pub fn on_change(&mut self, next: EditorState) -> bool {
        let document_changed = next.document != self.state.document;
        let previous = std::mem::replace(&mut self.state, next);
        if document_changed {
            self.history.record(Snapshot {
                document: previous.document,
                selection: previous.selection,
            });
            self.publish();
        }
        document_changed
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if self.handle_history_key(key) {
            return true;
        }
        if let Some(change) = on_key_down(&self.state, key) {
            debug!(code = ?key.code, commands = ?change.commands(), "key handled by interceptor");
            self.on_change(change.finish());
            return true;
        }
        match default_key_behavior(&self.state, key) {
            Some(change) => {
                self.on_change(change.finish());
                true
            }
            None => false,
        }
    }

    fn handle_history_key(&mut self, key: &KeyEvent) -> bool {
        if !is_mod(key.modifiers) {
            return false;
        }
        match key.code {
            KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.redo();
                true
            }
            KeyCode::Char('Z') => {
                self.redo();
                true
            }
            KeyCode::Char('z') => {
                self.undo();
                true
            }
            KeyCode::Char('y') => {
                self.redo();
                true
            }
            _ => false,
        }
    }

    pub fn toggle_mark(&mut self, mark: Mark) -> bool {
        let next = toggle_mark(&self.state, mark);
        self.on_change(next)
    }

    pub fn toggle_block(&mut self, block: BlockType) -> bool {
        let next = toggle_block(&self.state, block);
        self.on_change(next)
    }

    pub fn dispatch(&mut self, command: Command) -> bool {
        let next = apply(&self.state, &command);
        self.on_change(next)
    }

    pub fn select(&mut self, selection: Selection) {
        self.dispatch(Command::Select(selection));
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.dispatch(if focused { Command::Focus } else { Command::Blur });
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undos.pop() else {
            return false;
        };
        let current = Snapshot {
            document: self.state.document.clone(),
            selection: self.state.selection,
        };
        self.history.redos.push(current);
        self.restore(snapshot);
        debug!(remaining = self.history.undos.len(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redos.pop() else {
            return false;
        };
        let current = Snapshot {
            document: self.state.document.clone(),
            selection: self.state.selection,
        };
        self.history.undos.push(current);
        self.restore(snapshot);
        debug!(remaining = self.history.redos.len(), "redo");
        true
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state.document = snapshot.document;
        self.state.selection = snapshot.selection;
        self.state.stored_marks = None;
        normalize(&mut self.state);
        self.publish();
    }

    fn publish(&mut self) {
        self.serialized = self.state.to_html();
        debug!(len = self.serialized.len(), "document changed");
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.serialized);
        }
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("serialized", &self.serialized)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
