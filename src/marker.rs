//! Compiled-in signatures of the publisher's copyright header and watermark.

use serde::Deserialize;

/// Number of neighbouring lines deleted together with a plain-text marker line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LineScope {
    pub before: usize,
    pub after: usize,
}

impl LineScope {
    pub const fn single_line() -> Self {
        Self {
            before: 0,
            after: 0,
        }
    }
}

/// A literal byte signature that appears verbatim in a normalized content stream line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainTextMarker {
    pub label: &'static str,
    pub signature: &'static [u8],
    pub scope: LineScope,
}

impl PlainTextMarker {
    pub const fn new(label: &'static str, signature: &'static [u8]) -> Self {
        Self {
            label,
            signature,
            scope: LineScope::single_line(),
        }
    }

    pub fn with_scope(self, scope: LineScope) -> Self {
        Self { scope, ..self }
    }

    /// Whether `line` contains this marker's signature.
    pub fn matches(&self, line: &[u8]) -> bool {
        contains(line, self.signature)
    }
}

/// A watermark string, written as the hex digits found between `<` and `>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexMarker {
    pub label: &'static str,
    pub hex: &'static str,
}

impl HexMarker {
    pub const fn new(label: &'static str, hex: &'static str) -> Self {
        Self { label, hex }
    }

    /// Decoded bytes a string operand must equal to count as this watermark.
    pub fn target(&self) -> crate::error::Result<Vec<u8>> {
        hex::decode(self.hex).map_err(|e| {
            crate::error::UnmarkError::config(format!("invalid hex marker '{}': {e}", self.label))
        })
    }
}

/// A [`HexMarker`] with its target bytes decoded once, ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledHexMarker {
    pub label: &'static str,
    pub target: Vec<u8>,
}

impl CompiledHexMarker {
    pub fn compile(markers: &[HexMarker]) -> crate::error::Result<Vec<Self>> {
        markers
            .iter()
            .map(|m| {
                Ok(Self {
                    label: m.label,
                    target: m.target()?,
                })
            })
            .collect()
    }
}

/// Red copyright header lines rendered as plain text at the top of each page.
pub const HEADER_MARKERS: [PlainTextMarker; 4] = [
    PlainTextMarker::new("for-personal", b"For personal,"),
    PlainTextMarker::new("non-commercial", b"non-commercial use only."),
    PlainTextMarker::new(
        "reprints-notice",
        br"Do not edit, alter or reproduce. For commercial reproduction or distribution, contact Dow Jones Reprints & Licensing at \(800\) 843-0008 or",
    ),
    PlainTextMarker::new("reprints-url", b"www.djreprints.com"),
];

/// Large watermark text, drawn as UTF-16BE hex strings.
pub const WATERMARK_MARKERS: [HexMarker; 2] = [
    HexMarker::new(
        "for-personal",
        "0046006f007200200070006500720073006f006e0061006c002c",
    ),
    HexMarker::new(
        "non-commercial",
        "0020006e006f006e002d0063006f006d006d00650072006300690061006c00200075007300650020006f006e006c0079002e",
    ),
];

/// Header markers with the configured deletion scope applied.
pub fn header_markers(scope: LineScope) -> Vec<PlainTextMarker> {
    HEADER_MARKERS.iter().map(|m| m.with_scope(scope)).collect()
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}
