pub mod annotations;
pub mod editing;
pub mod io;
pub mod models;
pub mod services;
pub mod session;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use annotations::{Annotation, AnnotationError, AnnotationStore};
pub use editing::*;
pub use io::*;
pub use models::*;
pub use services::*;
pub use session::*;
