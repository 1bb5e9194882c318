use crate::editing::Path;

/// Result of applying an edit operation
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Path the operation addressed
    pub path: Path,
    pub structural: bool,
    /// Normalisation fixes applied after the edit
    pub normalize_passes: usize,
    pub version: u64,
}
