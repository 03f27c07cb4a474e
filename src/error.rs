use thiserror::Error;

use crate::pipeline::document::Stage;

#[derive(Debug, Error)]
pub enum UnmarkError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("External tool error: {0}")]
    ExternalToolError(String),

    #[error("Cannot open PDF object model: {0}")]
    NoObjectModelError(String),

    #[error("Marker not decodable in object {} {}: {message}", .object_id.0, .object_id.1)]
    MarkerNotDecodableError {
        object_id: lopdf::ObjectId,
        message: String,
    },

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<UnmarkError>,
    },
}

/// Generates factory methods for [`UnmarkError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl UnmarkError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an external tool error.
    external_tool => ExternalToolError,
    /// Create an object model error.
    no_object_model => NoObjectModelError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
}

impl UnmarkError {
    /// Create a marker decoding error for one content stream object.
    pub fn marker_not_decodable(object_id: lopdf::ObjectId, msg: impl Into<String>) -> Self {
        Self::MarkerNotDecodableError {
            object_id,
            message: msg.into(),
        }
    }

    /// Attach the failing pipeline stage. Already-attributed errors keep their stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::StageFailed { .. } => self,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The pipeline stage that produced this error, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The originating error with any stage attribution stripped.
    pub fn root(&self) -> &UnmarkError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<lopdf::Error> for UnmarkError {
    fn from(e: lopdf::Error) -> Self {
        Self::NoObjectModelError(e.to_string())
    }
}

impl From<serde_json::Error> for UnmarkError {
    fn from(e: serde_json::Error) -> Self {
        Self::IoError(std::io::Error::other(e))
    }
}

impl From<serde_yml::Error> for UnmarkError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UnmarkError>;
