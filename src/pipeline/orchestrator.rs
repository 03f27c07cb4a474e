// 5段階パイプライン: Source -> Normalized -> TextStripped -> Rebuilt -> Expanded -> Final

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::config::settings::Settings;
use crate::error::UnmarkError;
use crate::marker::{CompiledHexMarker, PlainTextMarker, WATERMARK_MARKERS, header_markers};
use crate::pipeline::document::{Document, DocumentState, Stage};
use crate::pipeline::hex_stripper::{HexStripOptions, HexStripReport, strip_hex_watermarks};
use crate::pipeline::text_stripper::{TextMatch, strip_plain_text_file};
use crate::tools::Toolchain;

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub millis: u128,
}

/// Summary of one successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub final_state: DocumentState,
    pub timings: Vec<StageTiming>,
    pub text_matches: Vec<TextMatch>,
    pub hex: HexStripReport,
    pub linearized: bool,
}

impl RunReport {
    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Drives one document through all five stages.
pub struct Pipeline<T: Toolchain> {
    toolchain: T,
    header_markers: Vec<PlainTextMarker>,
    hex_markers: Vec<CompiledHexMarker>,
    settings: Settings,
}

impl<T: Toolchain> Pipeline<T> {
    /// Build a pipeline using the compiled-in markers and the given settings.
    pub fn new(toolchain: T, settings: Settings) -> crate::error::Result<Self> {
        Ok(Self {
            toolchain,
            header_markers: header_markers(settings.header_scope),
            hex_markers: CompiledHexMarker::compile(&WATERMARK_MARKERS)?,
            settings,
        })
    }

    /// Replace the plain-text markers. Used by tests and alternative publishers.
    pub fn with_header_markers(mut self, markers: Vec<PlainTextMarker>) -> Self {
        self.header_markers = markers;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Run the whole pipeline on `input`, producing `output`.
    ///
    /// Either every stage succeeds and `output` is written, or the first failing
    /// stage's error is returned and `output` is not created. Intermediate files
    /// live in a temporary directory that is removed in both cases, unless
    /// `keep_intermediates` is set.
    pub fn run(&self, input: &Path, output: &Path) -> crate::error::Result<RunReport> {
        if !input.is_file() {
            return Err(UnmarkError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file not found: {}", input.display()),
            )));
        }

        let work_dir = tempfile::Builder::new()
            .prefix("pdf_unmark-")
            .tempdir()?;
        tracing::debug!(dir = %work_dir.path().display(), "created working directory");

        let result = self.run_in(work_dir.path(), input, output);

        if self.settings.keep_intermediates {
            let kept = work_dir.keep();
            tracing::info!(dir = %kept.display(), "kept intermediate files");
        }

        result
    }

    fn run_in(
        &self,
        work_dir: &Path,
        input: &Path,
        output: &Path,
    ) -> crate::error::Result<RunReport> {
        let mut doc = Document::source(input);
        let mut timings = Vec::with_capacity(Stage::ALL.len());
        let mut text_matches = Vec::new();
        let mut hex = HexStripReport::default();
        let discard = !self.settings.keep_intermediates;

        while let Some(stage) = doc.state().next_stage() {
            let target = work_dir.join(stage.file_name());
            tracing::info!(%stage, "running stage");
            let started = Instant::now();

            match stage {
                Stage::Normalize => self.toolchain.normalize(doc.path(), &target),
                Stage::StripText => strip_plain_text_file(doc.path(), &target, &self.header_markers)
                    .map(|m| text_matches = m),
                Stage::Rebuild => self.toolchain.rebuild(doc.path(), &target),
                Stage::Expand => self.toolchain.expand(doc.path(), &target),
                Stage::StripHex => self.strip_hex(doc.path(), &target).map(|r| hex = r),
            }
            .map_err(|e| e.in_stage(stage))?;

            timings.push(StageTiming {
                stage,
                millis: started.elapsed().as_millis(),
            });
            doc = doc.advance(target, discard);
        }

        let linearized = self.settings.linearize;
        if linearized {
            crate::linearize::linearize_in_place(
                &self.settings.qpdf_path,
                doc.path(),
                self.settings.tool_timeout(),
            )
            .map_err(|e| e.in_stage(Stage::StripHex))?;
        }

        publish(doc.path(), output).map_err(|e| e.in_stage(Stage::StripHex))?;

        tracing::info!(
            text_matches = text_matches.len(),
            hex_matches = hex.matches.len(),
            skipped_streams = hex.skipped.len(),
            "wrote {}",
            output.display()
        );

        Ok(RunReport {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            final_state: doc.state(),
            timings,
            text_matches,
            hex,
            linearized,
        })
    }

    fn strip_hex(&self, input: &Path, output: &Path) -> crate::error::Result<HexStripReport> {
        strip_hex_watermarks(
            input,
            output,
            &self.hex_markers,
            HexStripOptions {
                compress_output: self.settings.compress_output,
            },
        )
    }
}

/// Move the Final file to the caller's output path.
///
/// When a direct rename is refused (e.g. across filesystems) the file is
/// copied into a temporary sibling of `output` and renamed over it, so a file
/// already at `output` is only ever replaced whole.
fn publish(final_path: &Path, output: &Path) -> crate::error::Result<()> {
    if std::fs::rename(final_path, output).is_ok() {
        return Ok(());
    }

    let parent = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".pdf_unmark-")
        .tempfile_in(parent)?;
    let mut source = std::fs::File::open(final_path)?;
    std::io::copy(&mut source, staged.as_file_mut())?;
    staged.persist(output).map_err(|e| e.error)?;
    std::fs::remove_file(final_path)?;
    Ok(())
}
