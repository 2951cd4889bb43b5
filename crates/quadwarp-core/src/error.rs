/// Errors produced by quad handling, the homography solver and the warp engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    #[error("expected exactly 4 corner points, got {got}")]
    InvalidPointCount { got: usize },

    #[error("degenerate quad: {reason}")]
    DegenerateQuad { reason: &'static str },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[error("singular matrix (det={det:e})")]
    SingularMatrix { det: f64 },

    #[error("linear system is degenerate (zero pivot in column {column})")]
    NumericalDegeneracy { column: usize },

    #[error("output of {width}x{height} exceeds the limit of {limit} pixels")]
    OutputTooLarge {
        width: usize,
        height: usize,
        limit: usize,
    },

    #[error("invalid RGBA buffer length (expected {expected} bytes, got {got})")]
    BufferSize { expected: usize, got: usize },
}

impl WarpError {
    /// `true` for errors caused by the caller's corner points or parameters.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            WarpError::InvalidPointCount { .. }
                | WarpError::DegenerateQuad { .. }
                | WarpError::InvalidParameter { .. }
        )
    }

    /// `true` for allocation/buffer problems rather than geometry problems.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            WarpError::OutputTooLarge { .. } | WarpError::BufferSize { .. }
        )
    }
}
