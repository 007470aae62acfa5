//! Logical line scanning
//!
//! Splits source text into logical lines: physical lines joined inside
//! brackets, across backslash continuations and inside triple-quoted strings.
//! Blank and comment-only lines are dropped. Each line records its
//! indentation width, with tabs advancing to the next multiple of 8.

use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalLine {
    /// Byte offset of the first token
    pub start: usize,
    /// Byte offset one past the last byte (before the newline)
    pub end: usize,
    pub indent: usize,
}

/// Byte offsets of physical line starts, for offset to (line, column).
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex { starts }
    }

    /// 1-based line and 0-based byte column.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        (line, offset - self.starts[line - 1])
    }

    /// Inverse of [`LineIndex::position`].
    pub fn offset(&self, lineno: usize, col_offset: usize) -> usize {
        self.starts
            .get(lineno.saturating_sub(1))
            .map_or(0, |start| start + col_offset)
    }
}

const TAB_SIZE: usize = 8;

pub fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, ParseError> {
    let bytes = source.as_bytes();
    let mut lines = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        // Indentation of this physical line
        let mut indent = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b' ' => indent += 1,
                b'\t' => indent = (indent / TAB_SIZE + 1) * TAB_SIZE,
                b'\x0c' => indent = 0,
                _ => break,
            }
            pos += 1;
        }

        match bytes.get(pos) {
            None => break,
            Some(b'\n') => {
                pos += 1;
                continue;
            }
            Some(b'\r') if bytes.get(pos + 1) == Some(&b'\n') => {
                pos += 2;
                continue;
            }
            Some(b'#') => {
                pos = skip_comment(bytes, pos);
                continue;
            }
            Some(_) => {}
        }

        let start = pos;
        let end = scan_line(source, &mut pos)?;
        lines.push(LogicalLine { start, end, indent });
    }

    Ok(lines)
}

fn skip_comment(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos] != b'\n' {
        pos += 1;
    }
    pos
}

/// Scan from `pos` to the newline that ends the logical line. Returns the end
/// offset and leaves `pos` after the newline.
fn scan_line(source: &str, pos: &mut usize) -> Result<usize, ParseError> {
    let bytes = source.as_bytes();
    let mut open: Vec<(u8, usize)> = Vec::new();

    while *pos < bytes.len() {
        let b = bytes[*pos];
        match b {
            b'\n' if open.is_empty() => {
                let end = trim_cr(bytes, *pos);
                *pos += 1;
                return Ok(end);
            }
            b'#' => *pos = skip_comment(bytes, *pos),
            b'\'' | b'"' => *pos = skip_string(source, *pos)?,
            b'\\' => match (bytes.get(*pos + 1), bytes.get(*pos + 2)) {
                (Some(b'\n'), _) => *pos += 2,
                (Some(b'\r'), Some(b'\n')) => *pos += 3,
                (None, _) => {
                    return Err(ParseError::at(
                        source,
                        *pos,
                        "unexpected EOF while scanning line continuation",
                    ));
                }
                _ => {
                    return Err(ParseError::at(
                        source,
                        *pos,
                        "unexpected character after line continuation character",
                    ));
                }
            },
            b'(' | b'[' | b'{' => {
                open.push((b, *pos));
                *pos += 1;
            }
            b')' | b']' | b'}' => {
                match open.pop() {
                    None => {
                        return Err(ParseError::at(
                            source,
                            *pos,
                            format!("unmatched '{}'", b as char),
                        ));
                    }
                    Some((opener, _)) if closer_for(opener) != b => {
                        return Err(ParseError::at(
                            source,
                            *pos,
                            format!(
                                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                b as char, opener as char
                            ),
                        ));
                    }
                    Some(_) => {}
                }
                *pos += 1;
            }
            _ => *pos += 1,
        }
    }

    if let Some((opener, at)) = open.first() {
        return Err(ParseError::at(
            source,
            *at,
            format!("'{}' was never closed", *opener as char),
        ));
    }
    Ok(trim_cr(bytes, bytes.len()))
}

fn trim_cr(bytes: &[u8], end: usize) -> usize {
    if end > 0 && bytes[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

fn closer_for(opener: u8) -> u8 {
    match opener {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

/// Skip a string literal starting at the quote at `pos`.
fn skip_string(source: &str, pos: usize) -> Result<usize, ParseError> {
    let bytes = source.as_bytes();
    let quote = bytes[pos];
    let triple = bytes.get(pos + 1) == Some(&quote) && bytes.get(pos + 2) == Some(&quote);
    let mut i = if triple { pos + 3 } else { pos + 1 };

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if !triple => {
                return Err(ParseError::at(source, pos, "unterminated string literal"));
            }
            b if b == quote => {
                if !triple {
                    return Ok(i + 1);
                }
                if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                    return Ok(i + 3);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    let message = if triple {
        "unterminated triple-quoted string literal"
    } else {
        "unterminated string literal"
    };
    Err(ParseError::at(source, pos, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<(&str, usize)> {
        logical_lines(source)
            .unwrap()
            .into_iter()
            .map(|line| (&source[line.start..line.end], line.indent))
            .collect()
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let source = "a = 1\n\n   # note\nif a:\n    b = 2\n";
        assert_eq!(texts(source), vec![("a = 1", 0), ("if a:", 0), ("b = 2", 4)]);
    }

    #[test]
    fn joins_bracketed_lines() {
        let source = "x = [1,\n  2]\ny = 3";
        assert_eq!(texts(source), vec![("x = [1,\n  2]", 0), ("y = 3", 0)]);
    }

    #[test]
    fn joins_backslash_and_triple_quotes() {
        let source = "x = 1 + \\\n  2\ns = '''a\nb'''\n";
        assert_eq!(texts(source), vec![("x = 1 + \\\n  2", 0), ("s = '''a\nb'''", 0)]);
    }

    #[test]
    fn hash_inside_string_is_not_a_comment() {
        assert_eq!(texts("s = '#(' # real"), vec![("s = '#(' # real", 0)]);
    }

    #[test]
    fn tabs_round_to_eight() {
        assert_eq!(texts("if x:\n\tpass"), vec![("if x:", 0), ("pass", 8)]);
    }

    #[test]
    fn unclosed_bracket_points_at_opener() {
        let err = logical_lines("x = (").unwrap_err();
        assert_eq!(err.message, "'(' was never closed");
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn mismatched_closer() {
        let err = logical_lines("x = (1]").unwrap_err();
        assert!(err.message.contains("does not match"));
    }

    #[test]
    fn crlf_lines() {
        assert_eq!(texts("a = 1\r\nb = 2\r\n"), vec![("a = 1", 0), ("b = 2", 0)]);
    }

    #[test]
    fn line_index_positions() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.position(0), (1, 0));
        assert_eq!(index.position(4), (2, 1));
        assert_eq!(index.offset(2, 1), 4);
    }
}
