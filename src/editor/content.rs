use crate::document::{Leaf, Marks, normalize_leaves};

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

pub(crate) fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

pub fn previous_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut idx = offset.min(chars.len());
    if idx == 0 {
        return 0;
    }

    while idx > 0 && chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    if idx == 0 {
        return 0;
    }

    while idx > 0 && is_word_char(chars[idx - 1]) {
        idx -= 1;
    }
    if idx > 0 && !is_word_char(chars[idx - 1]) && !chars[idx - 1].is_whitespace() {
        while idx > 0 && !is_word_char(chars[idx - 1]) && !chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
    }
    idx
}

pub fn next_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut idx = offset.min(len);
    if idx >= len {
        return len;
    }

    if chars[idx].is_whitespace() {
        while idx < len && chars[idx].is_whitespace() {
            idx += 1;
        }
        return idx;
    }

    if is_word_char(chars[idx]) {
        while idx < len && is_word_char(chars[idx]) {
            idx += 1;
        }
    }
    while idx < len && !chars[idx].is_whitespace() && !is_word_char(chars[idx]) {
        idx += 1;
    }
    while idx < len && chars[idx].is_whitespace() {
        idx += 1;
    }
    idx
}

/// Splits the leaf containing `offset` so that a leaf boundary falls on it.
/// Returns the index of the first leaf at or after the offset.
pub(crate) fn split_leaves_at(leaves: &mut Vec<Leaf>, offset: usize) -> usize {
    let mut consumed = 0;
    for idx in 0..leaves.len() {
        let len = leaves[idx].char_len();
        if offset == consumed {
            return idx;
        }
        if offset < consumed + len {
            let byte_idx = char_to_byte_idx(&leaves[idx].text, offset - consumed);
            let tail = leaves[idx].text.split_off(byte_idx);
            let marks = leaves[idx].marks;
            leaves.insert(idx + 1, Leaf::new(tail, marks));
            return idx + 1;
        }
        consumed += len;
    }
    leaves.len()
}

pub(crate) fn take_range(leaves: &mut Vec<Leaf>, from: usize, to: usize) -> Vec<Leaf> {
    if from >= to {
        return Vec::new();
    }
    let start = split_leaves_at(leaves, from);
    let end = split_leaves_at(leaves, to);
    let taken = leaves.drain(start..end).collect();
    normalize_leaves(leaves);
    taken
}

pub(crate) fn split_off(leaves: &mut Vec<Leaf>, offset: usize) -> Vec<Leaf> {
    let idx = split_leaves_at(leaves, offset);
    let tail = leaves.split_off(idx);
    normalize_leaves(leaves);
    tail
}

pub(crate) fn insert_at(leaves: &mut Vec<Leaf>, offset: usize, text: &str, marks: Marks) {
    let idx = split_leaves_at(leaves, offset);
    leaves.insert(idx, Leaf::new(text, marks));
    normalize_leaves(leaves);
}

/// Applies `update` to the marks of every character in `from..to`.
pub(crate) fn update_marks(
    leaves: &mut Vec<Leaf>,
    from: usize,
    to: usize,
    update: impl Fn(&mut Marks),
) {
    if from >= to {
        return;
    }
    let start = split_leaves_at(leaves, from);
    let end = split_leaves_at(leaves, to);
    for leaf in &mut leaves[start..end] {
        update(&mut leaf.marks);
    }
    normalize_leaves(leaves);
}

pub(crate) fn marks_in_range(leaves: &[Leaf], from: usize, to: usize) -> Vec<Marks> {
    let mut found = Vec::new();
    let mut consumed = 0;
    for leaf in leaves {
        let len = leaf.char_len();
        if len > 0 && consumed < to && consumed + len > from {
            found.push(leaf.marks);
        }
        consumed += len;
    }
    found
}
