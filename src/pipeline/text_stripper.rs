// Stage 2: 正規化済みPDFからプレーンテキストのヘッダ行を削除する

use std::path::Path;

use serde::Serialize;

use crate::marker::{LineScope, PlainTextMarker, contains};

/// How a plain-text marker occurrence was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRemoval {
    /// The marker line plus its configured scope were deleted.
    Lines { first: usize, last: usize },
    /// Only the marker line was deleted.
    MarkerLine,
    /// The line also draws other text; only the show-text operations
    /// drawing the marker were cut out of it.
    ShowOperator,
    /// No complete show-text operation could be isolated on the line;
    /// only the signature bytes were erased from it.
    Signature,
}

/// A located occurrence of a plain-text marker (1-based line number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMatch {
    pub line: usize,
    pub marker: &'static str,
    pub removal: TextRemoval,
}

enum LineEdit {
    Keep,
    Drop,
    Replace(Vec<u8>),
}

/// Data lines of one `stream ... endstream` body (0-based, inclusive).
#[derive(Debug, Clone, Copy)]
struct StreamSpan {
    first: usize,
    last: usize,
}

/// Delete every marker occurrence from the content streams of a normalized PDF.
///
/// Works on raw bytes: lines are split on every PDF end-of-line (`\r\n`, `\r`,
/// `\n`) and keep their terminators, so everything outside the edited lines is
/// copied through unchanged. Only stream bodies are edited; a signature found
/// in object dictionaries or other structure is left alone. When no marker is
/// present the output equals the input.
pub fn strip_plain_text(input: &[u8], markers: &[PlainTextMarker]) -> (Vec<u8>, Vec<TextMatch>) {
    let lines = split_lines(input);
    let spans = stream_spans(&lines);
    let mut edits: Vec<LineEdit> = lines.iter().map(|_| LineEdit::Keep).collect();
    let mut matches = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(marker) = markers.iter().find(|m| m.matches(line)) else {
            continue;
        };
        let Some(span) = spans[idx] else {
            tracing::debug!(line = idx + 1, marker = marker.label, "marker outside any stream; skipped");
            continue;
        };

        let (removal, rewritten) = plan_removal(&lines, idx, span, marker.scope, markers);
        match removal {
            TextRemoval::Lines { first, last } => {
                for edit in &mut edits[first - 1..last] {
                    *edit = LineEdit::Drop;
                }
            }
            TextRemoval::MarkerLine => edits[idx] = LineEdit::Drop,
            TextRemoval::ShowOperator | TextRemoval::Signature => {
                if let Some(bytes) = rewritten
                    && !matches!(edits[idx], LineEdit::Drop)
                {
                    edits[idx] = LineEdit::Replace(bytes);
                }
            }
        }

        tracing::debug!(line = idx + 1, marker = marker.label, ?removal, "plain-text marker");
        matches.push(TextMatch {
            line: idx + 1,
            marker: marker.label,
            removal,
        });
    }

    let mut output = Vec::with_capacity(input.len());
    for (line, edit) in lines.iter().zip(edits) {
        match edit {
            LineEdit::Keep => output.extend_from_slice(line),
            LineEdit::Drop => {}
            LineEdit::Replace(bytes) => output.extend_from_slice(&bytes),
        }
    }

    (output, matches)
}

/// File-level wrapper around [`strip_plain_text`].
pub fn strip_plain_text_file(
    input: &Path,
    output: &Path,
    markers: &[PlainTextMarker],
) -> crate::error::Result<Vec<TextMatch>> {
    let bytes = std::fs::read(input)?;
    let (stripped, matches) = strip_plain_text(&bytes, markers);
    std::fs::write(output, stripped)?;
    Ok(matches)
}

/// Split on `\r\n`, `\r` and `\n`, keeping each line's terminator.
pub fn split_lines(input: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'\n' => {
                lines.push(&input[start..=i]);
                start = i + 1;
            }
            b'\r' => {
                if input.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                lines.push(&input[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < input.len() {
        lines.push(&input[start..]);
    }
    lines
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| !is_whitespace(b))
        .map_or(0, |p| p + 1);
    &line[..end]
}

fn opens_stream(line: &[u8]) -> bool {
    let line = trim_end(line);
    line.ends_with(b"stream") && !line.ends_with(b"endstream")
}

/// For every line, the stream body it belongs to, if any.
///
/// The `stream` keyword line and the line carrying `endstream` are structure.
fn stream_spans(lines: &[&[u8]]) -> Vec<Option<StreamSpan>> {
    let mut spans = vec![None; lines.len()];
    let mut i = 0;
    while i < lines.len() {
        if !opens_stream(lines[i]) {
            i += 1;
            continue;
        }
        let first = i + 1;
        let stop = (first..lines.len())
            .find(|&j| contains(lines[j], b"endstream"))
            .unwrap_or(lines.len());
        if stop > first {
            let span = StreamSpan {
                first,
                last: stop - 1,
            };
            for slot in &mut spans[first..stop] {
                *slot = Some(span);
            }
        }
        i = stop;
    }
    spans
}

/// Choose how to remove the marker found on line `idx` (0-based).
///
/// A line (or widened region) is dropped only if it is operator-balanced and
/// every string it shows carries a marker signature.
fn plan_removal(
    lines: &[&[u8]],
    idx: usize,
    span: StreamSpan,
    scope: LineScope,
    markers: &[PlainTextMarker],
) -> (TextRemoval, Option<Vec<u8>>) {
    let first = idx.saturating_sub(scope.before).max(span.first);
    let last = (idx + scope.after).min(span.last);

    if (first, last) != (idx, idx) {
        let region = &lines[first..=last];
        if region_balance(region).is_balanced()
            && region.iter().all(|l| shows_only_markers(l, markers))
        {
            return (
                TextRemoval::Lines {
                    first: first + 1,
                    last: last + 1,
                },
                None,
            );
        }
        tracing::warn!(
            line = idx + 1,
            "deletion scope is unbalanced or draws other text; narrowing to the marker line"
        );
    }

    let line = lines[idx];
    if region_balance(&[line]).is_balanced() && shows_only_markers(line, markers) {
        return (TextRemoval::MarkerLine, None);
    }

    match remove_show_operations(line, markers) {
        Some(rewritten) if !markers.iter().any(|m| m.matches(&rewritten)) => {
            (TextRemoval::ShowOperator, Some(rewritten))
        }
        _ => (TextRemoval::Signature, Some(erase_signatures(line, markers))),
    }
}

/// Whether every string on `line` contains a marker signature.
fn shows_only_markers(line: &[u8], markers: &[PlainTextMarker]) -> bool {
    tokenize(line)
        .iter()
        .filter(|t| t.kind == TokenKind::Str)
        .all(|t| markers.iter().any(|m| m.matches(&line[t.start..t.end])))
}

/// Cut every show-text operation whose string carries a marker out of `line`.
///
/// `'` and `"` leave their line-advance and spacing side effects behind.
/// Returns `None` when no complete operation on the line draws a marker.
fn remove_show_operations(line: &[u8], markers: &[PlainTextMarker]) -> Option<Vec<u8>> {
    let tokens = tokenize(line);
    let mut cuts: Vec<(usize, usize, Vec<u8>)> = Vec::new();
    let mut operands_from: Option<usize> = None;
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Open => {
                depth += 1;
                operands_from.get_or_insert(i);
            }
            TokenKind::Close => depth = depth.saturating_sub(1),
            TokenKind::Word if depth == 0 && !is_operand_word(token.text(line)) => {
                if let Some(from) = operands_from.take() {
                    let operands = &tokens[from..i];
                    let draws_marker = operands.iter().any(|t| {
                        t.kind == TokenKind::Str
                            && markers.iter().any(|m| m.matches(t.text(line)))
                    });
                    if draws_marker
                        && let Some(replacement) = show_replacement(token.text(line), operands, line)
                    {
                        cuts.push((tokens[from].start, token.end, replacement));
                    }
                }
            }
            _ => {
                operands_from.get_or_insert(i);
            }
        }
    }

    if cuts.is_empty() {
        return None;
    }
    let mut out = Vec::with_capacity(line.len());
    let mut pos = 0;
    for (start, end, replacement) in cuts {
        out.extend_from_slice(&line[pos..start]);
        out.extend_from_slice(&replacement);
        pos = end;
    }
    out.extend_from_slice(&line[pos..]);
    Some(out)
}

/// Bytes left in place of a removed show-text operation.
fn show_replacement(operator: &[u8], operands: &[Token], line: &[u8]) -> Option<Vec<u8>> {
    match operator {
        b"Tj" | b"TJ" => Some(Vec::new()),
        b"'" => Some(b"T*".to_vec()),
        b"\"" => match operands {
            [aw, ac, _] => Some([aw.text(line), &b" Tw "[..], ac.text(line), &b" Tc T*"[..]].concat()),
            _ => None,
        },
        _ => None,
    }
}

fn erase_signatures(line: &[u8], markers: &[PlainTextMarker]) -> Vec<u8> {
    let mut out = line.to_vec();
    for marker in markers {
        while contains(&out, marker.signature) {
            out = erase_first(&out, marker.signature);
        }
    }
    out
}

fn erase_first(haystack: &[u8], needle: &[u8]) -> Vec<u8> {
    match haystack.windows(needle.len()).position(|w| w == needle) {
        Some(pos) => [&haystack[..pos], &haystack[pos + needle.len()..]].concat(),
        None => haystack.to_vec(),
    }
}

/// Net count of block-opening minus block-closing operators.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub text: i64,
    pub graphics: i64,
}

impl Balance {
    pub fn is_balanced(&self) -> bool {
        self.text == 0 && self.graphics == 0
    }
}

/// Count `BT`/`ET` and `q`/`Q` tokens across `lines`, skipping strings and comments.
pub fn region_balance(lines: &[&[u8]]) -> Balance {
    let mut balance = Balance::default();
    for line in lines {
        for token in tokenize(line) {
            if token.kind != TokenKind::Word {
                continue;
            }
            match token.text(line) {
                b"BT" => balance.text += 1,
                b"ET" => balance.text -= 1,
                b"q" => balance.graphics += 1,
                b"Q" => balance.graphics -= 1,
                _ => {}
            }
        }
    }
    balance
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    /// `(...)` or `<...>`
    Str,
    Open,
    Close,
    /// Bare keyword or number
    Word,
    /// Names, dictionary brackets and stray delimiters
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

impl Token {
    fn text<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        &line[self.start..self.end]
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_operand_word(word: &[u8]) -> bool {
    matches!(word, b"true" | b"false" | b"null")
        || word
            .iter()
            .all(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.'))
}

fn regular_end(line: &[u8], mut i: usize) -> usize {
    while i < line.len() && !is_whitespace(line[i]) && !is_delimiter(line[i]) {
        i += 1;
    }
    i
}

/// Tokens of one content-stream line. A `%` comment ends the line.
fn tokenize(line: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < line.len() {
        let b = line[i];
        if is_whitespace(b) {
            i += 1;
            continue;
        }
        let start = i;
        let kind = match b {
            b'%' => break,
            b'(' => {
                i = skip_literal(line, i);
                TokenKind::Str
            }
            b'<' if line.get(i + 1) == Some(&b'<') => {
                i += 2;
                TokenKind::Other
            }
            b'<' => {
                i = line[i..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map_or(line.len(), |p| i + p + 1);
                TokenKind::Str
            }
            b'>' if line.get(i + 1) == Some(&b'>') => {
                i += 2;
                TokenKind::Other
            }
            b'[' => {
                i += 1;
                TokenKind::Open
            }
            b']' => {
                i += 1;
                TokenKind::Close
            }
            b'/' => {
                i = regular_end(line, i + 1);
                TokenKind::Other
            }
            _ if is_delimiter(b) => {
                i += 1;
                TokenKind::Other
            }
            _ => {
                i = regular_end(line, i);
                TokenKind::Word
            }
        };
        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }
    tokens
}

/// Index just past the literal string starting at `start` (which holds `(`).
fn skip_literal(line: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < line.len() {
        match line[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    line.len()
}
