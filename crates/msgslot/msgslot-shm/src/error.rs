pub type ShmResult<T> = Result<T, ShmError>;

/// Failures while opening or attaching to a slot file.
///
/// Protocol errors on an open slot are plain [`msgslot_core::SlotError`]s.
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error("slot file I/O failed")]
    Io(#[from] std::io::Error),

    #[error("invalid slot file: {0}")]
    Layout(&'static str),
}
