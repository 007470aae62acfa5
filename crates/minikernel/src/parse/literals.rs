//! Numeric and string literal scanning
//!
//! Scanners work on raw text and report the literal's byte length together
//! with its value, so the grammar can advance the stream past it. f-strings
//! are split into literal text and replacement fields here; the field
//! expressions themselves are parsed by the expression grammar.

use std::iter::Peekable;
use std::ops::Range;
use std::str::Chars;

use crate::ast::Constant;
use crate::value::Complex;

// ============ Numbers ============

/// Scan a numeric literal at the start of `text`. `None` when `text` does
/// not start with one; otherwise the literal's length and its value.
pub(super) fn scan_number(text: &str) -> Option<(usize, Result<Constant, &'static str>)> {
    let bytes = text.as_bytes();
    let first = *bytes.first()?;
    let leading_dot = first == b'.' && bytes.get(1).is_some_and(u8::is_ascii_digit);
    if !first.is_ascii_digit() && !leading_dot {
        return None;
    }

    if first == b'0' {
        let radix = match bytes.get(1) {
            Some(b'x' | b'X') => Some((16, "invalid hexadecimal literal")),
            Some(b'o' | b'O') => Some((8, "invalid octal literal")),
            Some(b'b' | b'B') => Some((2, "invalid binary literal")),
            _ => None,
        };
        if let Some((radix, invalid)) = radix {
            let len = 2 + bytes[2..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count();
            return Some((len, parse_radix(&text[2..len], radix, invalid)));
        }
    }

    let mut end = digit_run(bytes, 0);
    let mut is_float = false;
    if bytes.get(end) == Some(&b'.') {
        is_float = true;
        end = digit_run(bytes, end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
            is_float = true;
            end = digit_run(bytes, exp);
        }
    }
    let body = &text[..end];
    let imaginary = matches!(bytes.get(end), Some(b'j' | b'J'));
    let len = if imaginary { end + 1 } else { end };

    if bytes
        .get(len)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        || !underscores_ok(body, u8::is_ascii_digit)
    {
        return Some((len, Err("invalid decimal literal")));
    }
    let digits = body.replace('_', "");

    let value = if imaginary {
        digits
            .parse::<f64>()
            .map(|im| Constant::Complex(Complex::new(0.0, im)))
            .map_err(|_| "invalid imaginary literal")
    } else if is_float {
        digits
            .parse::<f64>()
            .map(Constant::Float)
            .map_err(|_| "invalid decimal literal")
    } else if digits.len() > 1 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
        Err("leading zeros in decimal integer literals are not permitted")
    } else {
        Ok(integer(&digits))
    };
    Some((len, value))
}

/// An integer constant from canonical decimal digits, wide when it does not
/// fit in an `i64`.
fn integer(digits: &str) -> Constant {
    match digits.parse::<i64>() {
        Ok(value) => Constant::Int(value),
        Err(_) => {
            let trimmed = digits.trim_start_matches('0');
            Constant::BigInt(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
        }
    }
}

fn digit_run(bytes: &[u8], start: usize) -> usize {
    start
        + bytes[start.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'_')
            .count()
}

/// Underscores only between two digits.
fn underscores_ok(body: &str, digit: fn(&u8) -> bool) -> bool {
    let bytes = body.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_' || (i > 0 && digit(&bytes[i - 1]) && bytes.get(i + 1).is_some_and(digit))
    })
}

fn parse_radix(digits: &str, radix: u32, invalid: &'static str) -> Result<Constant, &'static str> {
    // `0x_ff` is allowed: one underscore may follow the prefix
    let trimmed = digits.strip_prefix('_').unwrap_or(digits);
    if trimmed.is_empty() || !underscores_ok(trimmed, u8::is_ascii_alphanumeric) {
        return Err(invalid);
    }
    let cleaned = trimmed.replace('_', "");
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid);
    }
    Ok(match i64::from_str_radix(&cleaned, radix) {
        Ok(value) => Constant::Int(value),
        Err(_) => integer(&to_decimal(&cleaned, radix)),
    })
}

/// Decimal digits of a valid base-`radix` numeral of any length.
fn to_decimal(digits: &str, radix: u32) -> String {
    const BASE: u64 = 1_000_000_000;
    // little-endian limbs in base 10^9
    let mut limbs: Vec<u64> = vec![0];
    for c in digits.chars() {
        let mut carry = u64::from(c.to_digit(radix).unwrap_or(0));
        for limb in &mut limbs {
            let next = *limb * u64::from(radix) + carry;
            *limb = next % BASE;
            carry = next / BASE;
        }
        while carry > 0 {
            limbs.push(carry % BASE);
            carry /= BASE;
        }
    }
    let mut out = String::new();
    for (i, limb) in limbs.iter().rev().enumerate() {
        if i == 0 {
            out.push_str(&limb.to_string());
        } else {
            out.push_str(&format!("{limb:09}"));
        }
    }
    out
}

// ============ Strings ============

#[derive(Debug)]
pub(super) enum Piece {
    Text(String),
    Bytes(Vec<u8>),
    Format(Vec<FormatPart>),
}

#[derive(Debug)]
pub(super) struct StringPiece {
    pub value: Piece,
    pub unicode: bool,
}

/// One part of an f-string body.
#[derive(Debug, PartialEq)]
pub(super) enum FormatPart {
    Text(String),
    Field(Field),
}

/// A `{expr!conversion:spec}` replacement field.
#[derive(Debug, PartialEq)]
pub(super) struct Field {
    /// Byte range of the expression, relative to the literal's prefix
    pub expr: Range<usize>,
    /// Source text echoed before the value by `{expr=}`
    pub debug: Option<String>,
    pub conversion: Option<char>,
    pub spec: Option<Vec<FormatPart>>,
}

/// Scan one string literal, prefix included, at the start of `text`.
pub(super) fn scan_string(text: &str) -> Option<(usize, Result<StringPiece, &'static str>)> {
    let bytes = text.as_bytes();
    let prefix_len = bytes
        .iter()
        .take(3)
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if prefix_len > 2 {
        return None;
    }
    let quote = *bytes.get(prefix_len)?;
    if quote != b'\'' && quote != b'"' {
        return None;
    }
    let (raw, is_bytes, unicode, format) = match text[..prefix_len].to_ascii_lowercase().as_str()
    {
        "" => (false, false, false, false),
        "r" => (true, false, false, false),
        "u" => (false, false, true, false),
        "b" => (false, true, false, false),
        "br" | "rb" => (true, true, false, false),
        "f" => (false, false, false, true),
        "rf" | "fr" => (true, false, false, true),
        _ => return None,
    };

    let triple =
        bytes.get(prefix_len + 1) == Some(&quote) && bytes.get(prefix_len + 2) == Some(&quote);
    let delimiter = if triple { 3 } else { 1 };
    let content_start = prefix_len + delimiter;
    let mut i = content_start;
    let content_end = loop {
        match bytes.get(i) {
            None => {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Some((text.len(), Err(message)));
            }
            Some(b'\\') => i += 2,
            Some(b'\n') if !triple => return Some((i, Err("unterminated string literal"))),
            Some(&c)
                if c == quote
                    && (!triple
                        || (bytes.get(i + 1) == Some(&quote)
                            && bytes.get(i + 2) == Some(&quote))) =>
            {
                break i;
            }
            Some(_) => i += 1,
        }
    };

    let content = &text[content_start..content_end];
    let value = if format {
        FormatScanner {
            text,
            pos: content_start,
            end: content_end,
            raw,
        }
        .parts(0)
        .map(Piece::Format)
    } else if is_bytes {
        decode_bytes(content, raw).map(Piece::Bytes)
    } else if raw {
        Ok(Piece::Text(content.to_string()))
    } else {
        decode_text(content).map(Piece::Text)
    };
    let len = content_end + delimiter;
    Some((len, value.map(|value| StringPiece { value, unicode })))
}

/// Splits an f-string body into text and fields.
struct FormatScanner<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
    raw: bool,
}

impl FormatScanner<'_> {
    fn peek(&self, ahead: usize) -> Option<u8> {
        let at = self.pos + ahead;
        (at < self.end).then(|| self.text.as_bytes()[at])
    }

    /// Parts up to the end of the body, or up to the `}` closing a format
    /// spec when `level > 0`.
    fn parts(&mut self, level: usize) -> Result<Vec<FormatPart>, &'static str> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut run = self.pos;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' if !self.raw => {
                    if self.peek(1) == Some(b'N') && self.peek(2) == Some(b'{') {
                        let close = self.text[self.pos..self.end]
                            .find('}')
                            .ok_or("malformed \\N character escape")?;
                        self.pos += close + 1;
                    } else {
                        // skip the escaped character, whatever its width
                        let width = self.text[self.pos + 1..self.end]
                            .chars()
                            .next()
                            .map_or(0, char::len_utf8);
                        self.pos += 1 + width;
                    }
                }
                b'{' | b'}' if level == 0 && self.peek(1) == Some(b) => {
                    literal.push_str(&self.decode(run, self.pos + 1)?);
                    self.pos += 2;
                    run = self.pos;
                }
                b'}' if level > 0 => break,
                b'}' => return Err("f-string: single '}' is not allowed"),
                b'{' => {
                    literal.push_str(&self.decode(run, self.pos)?);
                    self.pos += 1;
                    let field = self.field(level)?;
                    if let Some(debug) = &field.debug {
                        literal.push_str(debug);
                    }
                    if !literal.is_empty() {
                        parts.push(FormatPart::Text(std::mem::take(&mut literal)));
                    }
                    parts.push(FormatPart::Field(field));
                    run = self.pos;
                }
                _ => self.pos += 1,
            }
        }
        literal.push_str(&self.decode(run, self.pos)?);
        if !literal.is_empty() {
            parts.push(FormatPart::Text(literal));
        }
        Ok(parts)
    }

    fn decode(&self, start: usize, end: usize) -> Result<String, &'static str> {
        let run = &self.text[start..end];
        if self.raw {
            Ok(run.to_string())
        } else {
            decode_text(run)
        }
    }

    /// A replacement field, the opening brace already consumed.
    fn field(&mut self, level: usize) -> Result<Field, &'static str> {
        if level >= 2 {
            return Err("f-string: expressions nested too deeply");
        }
        let start = self.pos;
        let mut depth = 0usize;
        let mut debug = None;
        let expr_end = loop {
            let Some(b) = self.peek(0) else {
                return Err("f-string: expecting '}'");
            };
            match b {
                b'\\' => return Err("f-string expression part cannot include a backslash"),
                b'#' => return Err("f-string expression part cannot include '#'"),
                b'\'' | b'"' => self.skip_quoted(b)?,
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' if depth == 0 => return Err("f-string: unmatched ')'"),
                b'}' if depth == 0 => break self.pos,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    self.pos += 1;
                }
                b'!' if depth == 0 && self.peek(1) != Some(b'=') => break self.pos,
                b':' if depth == 0 => break self.pos,
                b'=' if depth == 0
                    && self.peek(1) != Some(b'=')
                    && !matches!(self.text.as_bytes()[self.pos - 1], b'=' | b'!' | b'<' | b'>') =>
                {
                    let end = self.pos;
                    self.pos += 1;
                    while matches!(self.peek(0), Some(b' ' | b'\t' | b'\n' | b'\r')) {
                        self.pos += 1;
                    }
                    debug = Some(self.text[start..self.pos].to_string());
                    break end;
                }
                _ => self.pos += 1,
            }
        };
        if self.text[start..expr_end].trim().is_empty() {
            return Err("f-string: empty expression not allowed");
        }

        let mut conversion = None;
        if self.peek(0) == Some(b'!') {
            let c = self.peek(1).ok_or("f-string: expecting '}'")?;
            if !matches!(c, b's' | b'r' | b'a') {
                return Err("f-string: invalid conversion character: expected 's', 'r', or 'a'");
            }
            conversion = Some(char::from(c));
            self.pos += 2;
        }
        let mut spec = None;
        if self.peek(0) == Some(b':') {
            self.pos += 1;
            spec = Some(self.parts(level + 1)?);
        }
        if self.peek(0) != Some(b'}') {
            return Err("f-string: expecting '}'");
        }
        self.pos += 1;
        if debug.is_some() && conversion.is_none() && spec.is_none() {
            conversion = Some('r');
        }
        Ok(Field {
            expr: start..expr_end,
            debug,
            conversion,
            spec,
        })
    }

    /// Skip a string literal nested inside a field expression.
    fn skip_quoted(&mut self, quote: u8) -> Result<(), &'static str> {
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        let width = if triple { 3 } else { 1 };
        self.pos += width;
        loop {
            match self.peek(0) {
                None => return Err("f-string: unterminated string"),
                Some(b) if b == quote
                    && (!triple || (self.peek(1) == Some(quote) && self.peek(2) == Some(quote))) =>
                {
                    self.pos += width;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

fn decode_text(content: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            'x' => out.push(hex_char(&mut chars, 2).ok_or("truncated \\xXX escape")?),
            'u' => out.push(hex_char(&mut chars, 4).ok_or("truncated \\uXXXX escape")?),
            'U' => out.push(hex_char(&mut chars, 8).ok_or("truncated \\UXXXXXXXX escape")?),
            'N' => out.push(named_char(&mut chars)?),
            '0'..='7' => {
                let code = octal(&mut chars, escaped);
                out.push(char::from_u32(code).ok_or("invalid octal escape")?);
            }
            other => match simple_escape(other) {
                Some(c) => out.push(c),
                None => {
                    out.push('\\');
                    out.push(other);
                }
            },
        }
    }
    Ok(out)
}

/// `{NAME}` after `\N`, looked up case-insensitively.
fn named_char(chars: &mut Peekable<Chars<'_>>) -> Result<char, &'static str> {
    if chars.next_if_eq(&'{').is_none() {
        return Err("malformed \\N character escape");
    }
    let mut name = String::new();
    loop {
        match chars.next() {
            Some('}') => break,
            Some(c) => name.push(c),
            None => return Err("malformed \\N character escape"),
        }
    }
    if name.is_empty() {
        return Err("malformed \\N character escape");
    }
    unicode_names2::character(&name.to_ascii_uppercase()).ok_or("unknown Unicode character name")
}

fn decode_bytes(content: &str, raw: bool) -> Result<Vec<u8>, &'static str> {
    if !content.is_ascii() {
        return Err("bytes can only contain ASCII literal characters");
    }
    if raw {
        return Ok(content.as_bytes().to_vec());
    }
    let mut out = Vec::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c as u8);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push(b'\\');
            break;
        };
        match escaped {
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            'x' => {
                let code = hex_char(&mut chars, 2).ok_or("truncated \\xXX escape")?;
                out.push(code as u8);
            }
            '0'..='7' => {
                let code = u8::try_from(octal(&mut chars, escaped))
                    .map_err(|_| "invalid octal escape")?;
                out.push(code);
            }
            other => match simple_escape(other) {
                Some(c) => out.push(c as u8),
                None => {
                    out.push(b'\\');
                    out.push(other as u8);
                }
            },
        }
    }
    Ok(out)
}

fn simple_escape(c: char) -> Option<char> {
    Some(match c {
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        _ => return None,
    })
}

fn hex_char(chars: &mut Peekable<Chars<'_>>, count: usize) -> Option<char> {
    let mut code = 0;
    for _ in 0..count {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}

/// Up to three octal digits, the first already consumed.
fn octal(chars: &mut Peekable<Chars<'_>>, first: char) -> u32 {
    let mut code = first.to_digit(8).unwrap_or(0);
    for _ in 0..2 {
        match chars.peek().and_then(|c| c.to_digit(8)) {
            Some(digit) => {
                code = code * 8 + digit;
                chars.next();
            }
            None => break,
        }
    }
    code
}
