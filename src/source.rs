//! Process-wide registry of in-memory program sources.
//!
//! Compiler-emitted host code embeds its kernel IR as string payloads and
//! registers them under a file path before the first launch, so the
//! runtime never has to touch the filesystem for generated code. Paths
//! that were never registered fall back to an ordinary disk read.

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::error::Result;

lazy_static! {
    static ref SOURCES: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());
}

/// Registers `text` as the contents of `path`. Re-registering replaces
/// the previous contents.
pub fn register_file(path: &str, text: &str) {
    let mut sources = SOURCES.lock().unwrap();
    sources.insert(path.to_string(), text.to_string());
}

/// Returns the registered contents of `path`, or reads it from disk.
pub fn load_file(path: &str) -> Result<String> {
    {
        let sources = SOURCES.lock().unwrap();
        if let Some(text) = sources.get(path) {
            return Ok(text.clone());
        }
    }
    Ok(fs::read_to_string(path)?)
}

/// Returns the registered contents of `path` as raw bytes, or reads the
/// file from disk. Pre-compiled code objects go through this entry since
/// they are not generally valid UTF-8 on disk.
pub fn load_file_bytes(path: &str) -> Result<Vec<u8>> {
    {
        let sources = SOURCES.lock().unwrap();
        if let Some(text) = sources.get(path) {
            return Ok(text.clone().into_bytes());
        }
    }
    Ok(fs::read(path)?)
}

/// Writes `text` to `path` on disk, unconditionally.
pub fn store_file(path: &str, text: &str) -> Result<()> {
    Ok(fs::write(path, text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_text_wins() {
        register_file("reg-a.ll", "define void @a() { ret void }");
        assert_eq!(
            load_file("reg-a.ll").unwrap(),
            "define void @a() { ret void }"
        );

        register_file("reg-a.ll", "define void @b() { ret void }");
        assert_eq!(
            load_file("reg-a.ll").unwrap(),
            "define void @b() { ret void }"
        );
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(load_file("does/not/exist.ll").is_err());
    }

    #[test]
    fn disk_fallback_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.ll");
        let path = path.to_str().unwrap();

        store_file(path, "target datalayout = \"e\"").unwrap();
        assert_eq!(load_file(path).unwrap(), "target datalayout = \"e\"");
    }
}
