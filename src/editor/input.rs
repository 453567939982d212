use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{Change, Command, EditorState, Motion};
use crate::document::{ListKind, Mark, TextKind};

pub fn is_mod(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER)
}

pub fn shortcut_type(prefix: &str) -> Option<TextKind> {
    match prefix {
        "*" | "-" | "+" => Some(TextKind::ListItem),
        ">" => Some(TextKind::BlockQuote),
        "#" => Some(TextKind::HeadingOne),
        "##" => Some(TextKind::HeadingTwo),
        _ => None,
    }
}

fn chord_mark(code: KeyCode) -> Option<Mark> {
    match code {
        KeyCode::Char('b') | KeyCode::Char('B') => Some(Mark::Bold),
        KeyCode::Char('i') | KeyCode::Char('I') => Some(Mark::Italic),
        KeyCode::Char('u') | KeyCode::Char('U') => Some(Mark::Underline),
        _ => None,
    }
}

pub fn on_key_down(state: &EditorState, key: &KeyEvent) -> Option<Change> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if is_mod(key.modifiers) {
        let mark = chord_mark(key.code)?;
        return Some(state.change().toggle_mark(mark));
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => on_space(state),
        KeyCode::Backspace => on_backspace(state),
        KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => on_enter(state),
        _ => None,
    }
}

fn on_space(state: &EditorState) -> Option<Change> {
    if state.is_expanded() {
        return None;
    }
    let block = state.start_block()?;
    let offset = state.start().offset;
    let prefix: String = block
        .text()
        .chars()
        .take(offset)
        .filter(|ch| !ch.is_whitespace())
        .collect();
    let kind = shortcut_type(&prefix)?;
    if block.kind == kind {
        return None;
    }

    let mut change = state.change().set_block(kind);
    if kind == TextKind::ListItem {
        change = change.wrap_block(ListKind::Bulleted);
    } else if block.kind == TextKind::ListItem {
        change = change
            .unwrap_block(ListKind::Bulleted)
            .unwrap_block(ListKind::Numbered);
    }
    Some(change.extend_to_start_of_block().delete())
}

fn on_backspace(state: &EditorState) -> Option<Change> {
    if state.is_expanded() || state.start().offset != 0 {
        return None;
    }
    let block = state.start_block()?;
    if block.kind == TextKind::Paragraph {
        return None;
    }

    let mut change = state.change().set_block(TextKind::Paragraph);
    if block.kind == TextKind::ListItem {
        change = change
            .unwrap_block(ListKind::Bulleted)
            .unwrap_block(ListKind::Numbered);
    }
    Some(change)
}

fn on_enter(state: &EditorState) -> Option<Change> {
    if state.is_expanded() {
        return None;
    }
    let block = state.start_block()?;
    if state.start().offset == 0 && block.is_empty() {
        return on_backspace(state);
    }
    if state.end().offset != block.char_len() {
        return None;
    }
    if !matches!(
        block.kind,
        TextKind::HeadingOne | TextKind::HeadingTwo | TextKind::BlockQuote
    ) {
        return None;
    }
    Some(state.change().split_block().set_block(TextKind::Paragraph))
}

/// Plain editing for keys the interceptor declined. `None` means the key
/// has no editing meaning and is left to the host.
pub fn default_key_behavior(state: &EditorState, key: &KeyEvent) -> Option<Change> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let modifiers = key.modifiers;
    let extend = modifiers.contains(KeyModifiers::SHIFT);
    let by_word = modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
    let change = state.change();

    let change = match key.code {
        KeyCode::Char('a') | KeyCode::Char('A') if is_mod(modifiers) => {
            change.apply(Command::SelectAll)
        }
        KeyCode::Char(_) if is_mod(modifiers) || modifiers.contains(KeyModifiers::ALT) => {
            return None;
        }
        KeyCode::Char(ch) => change.insert_text(ch.to_string()),
        KeyCode::Enter if extend => change.insert_text("\n"),
        KeyCode::Enter => change.split_block(),
        KeyCode::Backspace if by_word && state.is_collapsed() => change
            .move_to(Motion::WordLeft, true)
            .delete_backward(),
        KeyCode::Backspace => change.delete_backward(),
        KeyCode::Delete if by_word && state.is_collapsed() => change
            .move_to(Motion::WordRight, true)
            .delete_forward(),
        KeyCode::Delete => change.delete_forward(),
        KeyCode::Left if by_word => change.move_to(Motion::WordLeft, extend),
        KeyCode::Right if by_word => change.move_to(Motion::WordRight, extend),
        KeyCode::Left => change.move_to(Motion::Left, extend),
        KeyCode::Right => change.move_to(Motion::Right, extend),
        KeyCode::Up => change.move_to(Motion::Up, extend),
        KeyCode::Down => change.move_to(Motion::Down, extend),
        KeyCode::Home if is_mod(modifiers) => change.move_to(Motion::DocumentStart, extend),
        KeyCode::End if is_mod(modifiers) => change.move_to(Motion::DocumentEnd, extend),
        KeyCode::Home => change.move_to(Motion::LineStart, extend),
        KeyCode::End => change.move_to(Motion::LineEnd, extend),
        _ => return None,
    };
    Some(change)
}
