use thiserror::Error;

/// Errors raised by the reactive cell types when a write cannot be applied.
///
/// The watch engine itself never fails: primitives and empty values are
/// simply skipped. Only positional collection edits and writes to derived
/// cells can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// A positional edit addressed a slot past the end of the collection.
    #[error("index {index} is out of bounds for collection of length {len}")]
    IndexOutOfBounds {
        /// Requested slot.
        index: usize,
        /// Length of the collection at the time of the edit.
        len: usize,
    },

    /// The cell is derived from another cell and cannot be written directly.
    #[error("cell is read-only")]
    ReadOnly,
}
