//! Reformats long type names, such as those in compiler messages about concept types, into an
//! indented tree.

use std::iter::Peekable;
use std::str::Chars;

#[inline]
fn closer(open: char) -> Option<char> {
    match open {
        '<' => Some('>'),
        '(' => Some(')'),
        '[' => Some(']'),
        _ => None,
    }
}

#[inline]
fn is_closer(c: char) -> bool {
    matches!(c, '>' | ')' | ']')
}

fn newline(out: &mut String, indent: usize, depth: usize) {
    out.push('\n');
    out.extend(std::iter::repeat_n(' ', indent * depth));
}

/// Skips a bracketed group whose opener has already been consumed.
fn skip_group(chars: &mut Peekable<Chars<'_>>) {
    let mut depth = 1;
    for c in chars.by_ref() {
        if closer(c).is_some() {
            depth += 1;
        } else if is_closer(c) {
            depth -= 1;
            if depth == 0 {
                return;
            }
        }
    }
}

/// Breaks `s` after every opening bracket and comma, indenting each nesting level by `indent`
/// spaces. Groups nested deeper than `collapse_depth` are shown as `<...>`.
///
/// ```
/// use tenh::pretty::print_pretty_typestring;
///
/// let s = "Tensor<Space<3>, f64>";
/// assert_eq!(print_pretty_typestring(s, 2, usize::MAX), "Tensor<\n  Space<\n    3\n  >,\n  f64\n>");
/// assert_eq!(print_pretty_typestring(s, 2, 1), "Tensor<\n  Space<...>,\n  f64\n>");
/// ```
pub fn print_pretty_typestring(s: &str, indent: usize, collapse_depth: usize) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    let mut chars = s.trim().chars().peekable();
    let mut depth = 0;
    let mut previous = None;

    while let Some(c) = chars.next() {
        match c {
            // `->` in function types is not a bracket
            '>' if previous == Some('-') => out.push(c),
            c if closer(c).is_some() => {
                let close = closer(c).unwrap_or(c);
                out.push(c);
                if chars.peek() == Some(&close) {
                    // empty group, such as `()`
                    chars.next();
                    out.push(close);
                } else if depth >= collapse_depth {
                    skip_group(&mut chars);
                    out.push_str("...");
                    out.push(close);
                } else {
                    depth += 1;
                    newline(&mut out, indent, depth);
                }
            }
            c if is_closer(c) => {
                depth = depth.saturating_sub(1);
                newline(&mut out, indent, depth);
                out.push(c);
            }
            ',' => {
                out.push(c);
                while chars.next_if(|c| c.is_whitespace()).is_some() {}
                newline(&mut out, indent, depth);
            }
            c => out.push(c),
        }
        previous = Some(c);
    }
    out
}
