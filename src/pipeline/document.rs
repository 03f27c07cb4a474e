use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle of the document flowing through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub enum DocumentState {
    Source,
    Normalized,
    TextStripped,
    Rebuilt,
    Expanded,
    Final,
}

impl DocumentState {
    /// The stage that moves a document out of this state, if any.
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            DocumentState::Source => Some(Stage::Normalize),
            DocumentState::Normalized => Some(Stage::StripText),
            DocumentState::TextStripped => Some(Stage::Rebuild),
            DocumentState::Rebuilt => Some(Stage::Expand),
            DocumentState::Expanded => Some(Stage::StripHex),
            DocumentState::Final => None,
        }
    }
}

/// One step of the pipeline. Each stage consumes exactly one intermediate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Stage {
    Normalize,
    StripText,
    Rebuild,
    Expand,
    StripHex,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Normalize,
        Stage::StripText,
        Stage::Rebuild,
        Stage::Expand,
        Stage::StripHex,
    ];

    /// State of the document after this stage succeeds.
    pub fn output_state(self) -> DocumentState {
        match self {
            Stage::Normalize => DocumentState::Normalized,
            Stage::StripText => DocumentState::TextStripped,
            Stage::Rebuild => DocumentState::Rebuilt,
            Stage::Expand => DocumentState::Expanded,
            Stage::StripHex => DocumentState::Final,
        }
    }

    /// File name used for this stage's output inside the working directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Stage::Normalize => "1-normalized.pdf",
            Stage::StripText => "2-text-stripped.pdf",
            Stage::Rebuild => "3-rebuilt.pdf",
            Stage::Expand => "4-expanded.pdf",
            Stage::StripHex => "5-final.pdf",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalizer",
            Stage::StripText => "plain-text stripper",
            Stage::Rebuild => "rebuilder",
            Stage::Expand => "object expander",
            Stage::StripHex => "hex watermark stripper",
        };
        f.write_str(name)
    }
}

/// The PDF under transformation: the file holding its current bytes plus its state.
///
/// A `Document` is moved from stage to stage; `advance` consumes it, so no stage can
/// keep using a file that has been handed on.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    state: DocumentState,
    owned: bool,
}

impl Document {
    /// Wrap the caller's input file. The source file is never deleted by the pipeline.
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: DocumentState::Source,
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Hand the document to the next state, now backed by `path`.
    ///
    /// The superseded file is removed when `discard` is set and the pipeline
    /// created it.
    pub fn advance(self, path: PathBuf, discard: bool) -> Self {
        let state = match self.state.next_stage() {
            Some(stage) => stage.output_state(),
            None => DocumentState::Final,
        };
        if discard
            && self.owned
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::debug!(path = %self.path.display(), "could not remove intermediate: {e}");
        }
        Self {
            path,
            state,
            owned: true,
        }
    }
}
