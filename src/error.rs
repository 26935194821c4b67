use thiserror::Error;

/// Failures raised while acquiring or releasing the overlay's native resources.
///
/// `WindowCreation` and `HookInstall` abort startup. `ShapeRegion` and
/// `HookRemoval` are logged and otherwise ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("failed to create overlay window: {0}")]
    WindowCreation(String),

    #[error("failed to install global keyboard hook: {0}")]
    HookInstall(String),

    #[error("failed to apply round window shape: {0}")]
    ShapeRegion(String),

    #[error("failed to remove global keyboard hook: {0}")]
    HookRemoval(String),
}

impl AppError {
    /// Whether startup must stop when this error is returned.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::WindowCreation(_) | Self::HookInstall(_))
    }
}
