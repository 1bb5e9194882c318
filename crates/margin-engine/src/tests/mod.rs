use tempfile::TempDir;

pub fn create_test_pages_dir() -> TempDir {
    TempDir::new().unwrap()
}
