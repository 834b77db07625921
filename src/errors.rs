//! Error Types
//!
//! This module defines the error types used throughout the exporter.
//!
//! # Overview
//!
//! The main error type [`ExportError`] covers the failures that leave a
//! document structurally incomplete:
//! - Asset builder failures (a cache builder could not produce its entity)
//! - Storage failures (a buffer, image, or document could not be persisted)
//! - Configuration and pipeline misuse
//!
//! Consistency problems (a builder result whose hash disagrees with its key,
//! a primitive without indices) and numeric anomalies (NaN, absurd bounds)
//! are not errors. They are logged and processing continues.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, ExportError>`.
//!
//! ```rust,ignore
//! use scene_gltf::errors::{ExportError, Result};
//!
//! fn export() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::hash::ContentHash;

/// Boxed error produced by a caller-supplied asset builder.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the exporter.
#[derive(Error, Debug)]
pub enum ExportError {
    // ========================================================================
    // Asset Construction Errors
    // ========================================================================
    /// An asset-cache builder failed. Nothing was inserted for `hash`.
    #[error("Failed to build {kind} {hash}: {source}")]
    Builder {
        /// Which table the builder was filling (`mesh`, `image`, ...)
        kind: &'static str,
        /// The lookup key the builder was invoked for
        hash: ContentHash,
        #[source]
        source: BoxedError,
    },

    /// Image data could not be decoded, resized, or encoded.
    #[error("Image error: {0}")]
    InvalidImage(String),

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// File storage failed for the named entry.
    #[error("Storage error for '{name}': {source}")]
    Storage {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A non file-backed storage collaborator rejected the named entry.
    #[error("Storage failed for '{name}': {reason}")]
    StorageFailed { name: String, reason: String },

    // ========================================================================
    // Format & Configuration Errors
    // ========================================================================
    /// JSON serialization or settings parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings were readable but not usable.
    #[error("Invalid settings: {0}")]
    Settings(String),

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// A pipeline stage was invoked before the stage it depends on.
    #[error("Document is not ready: {0}")]
    NotBuilt(&'static str),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for ExportError {
    fn from(err: image::ImageError) -> Self {
        ExportError::InvalidImage(err.to_string())
    }
}

/// Alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;
