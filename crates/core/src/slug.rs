// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slugify strings for use as workspace name components.

/// Slugify a string for use as a workspace name component.
///
/// Splits the lowercased input on anything that is not ASCII alphanumeric,
/// drops empty pieces and immediate repeats, and joins words with hyphens
/// while they fit the length budget. A first word longer than the whole
/// budget is hard-truncated; otherwise truncation happens at word
/// boundaries.
pub fn slugify(input: &str, max_len: usize) -> String {
    let lowered = input.to_lowercase();
    let mut words: Vec<&str> = Vec::new();
    for piece in lowered.split(|c: char| !c.is_ascii_alphanumeric()) {
        if piece.is_empty() {
            continue;
        }
        if words.last() == Some(&piece) {
            continue;
        }
        words.push(piece);
    }

    let mut out = String::new();
    for word in words {
        if out.is_empty() {
            if word.len() > max_len {
                out.push_str(&word[..max_len]);
                break;
            }
            out.push_str(word);
        } else if out.len() + 1 + word.len() <= max_len {
            out.push('-');
            out.push_str(word);
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
