pub mod command;
pub mod external;

use std::path::Path;

/// The three structural services the pipeline delegates to.
///
/// Each call reads `input`, writes exactly one file at `output` and leaves
/// `input` untouched. The orchestrator only depends on this trait, so an
/// in-process implementation can replace the external tools.
pub trait Toolchain {
    /// Turn a PDF into an uncompressed, line-oriented rendering.
    fn normalize(&self, input: &Path, output: &Path) -> crate::error::Result<()>;

    /// Turn a (possibly line-edited) normalized rendering back into a valid PDF.
    fn rebuild(&self, input: &Path, output: &Path) -> crate::error::Result<()>;

    /// Rewrite a PDF with object streams unpacked and content streams editable.
    fn expand(&self, input: &Path, output: &Path) -> crate::error::Result<()>;
}
