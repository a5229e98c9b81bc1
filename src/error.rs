use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation core.
///
/// Errors are raised and propagated, never masked: a violated invariant at
/// runtime indicates a bug worth diagnosing, so the driver halts rather than
/// patching state and continuing.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or inconsistent run configuration, rejected before any
    /// simulation state is built.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Numerical degeneracy at runtime (NaN predicted time, near-zero
    /// contact normal).
    #[error("numerical error: {0}")]
    Numerics(String),

    /// Two balls found overlapping beyond tolerance.
    #[error("balls {i} and {j} overlap at t={time}")]
    Overlap { i: u32, j: u32, time: f64 },

    /// A bookkeeping invariant no longer holds (grid desync, time reversal,
    /// out-of-bounds transit).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Propagated I/O errors from frame export.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
