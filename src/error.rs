//! Error types for convexuv.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`MeshError`].

use std::path::PathBuf;

use nalgebra::Point2;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh construction, I/O and flip repair.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// An edge has more than two incident faces.
    #[error("edge ({v0}, {v1}) has more than two incident faces")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// The mesh (or the selected patch) has no boundary.
    #[error("mesh has no boundary")]
    NoBoundary,

    /// The UV image of the boundary loop intersects itself.
    #[error(
        "boundary is not a simple polygon: segment ({:?}, {:?}) intersects ({:?}, {:?})",
        .first[0], .first[1], .second[0], .second[1]
    )]
    NonSimpleBoundary {
        /// Endpoints of the first offending boundary segment.
        first: [Point2<f64>; 2],
        /// Endpoints of the second offending boundary segment.
        second: [Point2<f64>; 2],
    },

    /// The boundary polygon has fewer than three distinct points or no area.
    #[error("boundary polygon is degenerate: {0}")]
    DegenerateBoundary(String),

    /// Two corners of a triangle share a UV position, or the corner angle
    /// produced a non-finite weight.
    #[error("degenerate corner at vertex {vertex}: neighbor {neighbor} coincides in UV space")]
    DegenerateCorner {
        /// Index of the apex vertex.
        vertex: usize,
        /// Index of the coinciding neighbor.
        neighbor: usize,
    },

    /// One of the two axis solves failed.
    #[error("cannot solve the linear system")]
    CannotSolveLinearSystem {
        /// The solver failure.
        #[source]
        source: Box<MeshError>,
    },

    /// Iterative solver broke down (division by a vanishing inner product).
    #[error("solver breakdown after {iterations} iterations: {reason}")]
    SolverBreakdown {
        /// Iterations completed before the breakdown.
        iterations: usize,
        /// What vanished.
        reason: &'static str,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations (residual {residual:e})")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
        /// Relative residual norm reached.
        residual: f64,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid mesh state for the requested operation.
    #[error("invalid mesh state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Wrap a solver failure into [`MeshError::CannotSolveLinearSystem`].
    pub fn cannot_solve(source: MeshError) -> Self {
        MeshError::CannotSolveLinearSystem {
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_simple_message_lists_segments() {
        let err = MeshError::NonSimpleBoundary {
            first: [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
            second: [Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("boundary is not a simple polygon"));
        assert!(msg.contains("intersects"));
    }

    #[test]
    fn test_cannot_solve_keeps_source() {
        use std::error::Error;

        let err = MeshError::cannot_solve(MeshError::ConvergenceFailed {
            iterations: 10,
            residual: 0.5,
        });
        let source = err.source().expect("source should be attached");
        assert!(source.to_string().contains("10 iterations"));
    }
}
