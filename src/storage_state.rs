//! Atomic storage-state persistence (spec §6 "Persisted state").
//!
//! Writes go to `<path>.tmp`, the existing file (if any) is moved to
//! `<path>.bak`, then the tmp file is renamed onto `path` — so a crash
//! mid-write never leaves a half-written storage-state file live.

use std::path::Path;

use crate::errors::CliError;

pub fn write_atomic(path: &Path, contents: &str) -> Result<(), CliError> {
    let tmp_path = path.with_extension("json.tmp");
    let bak_path = path.with_extension("json.bak");

    std::fs::write(&tmp_path, contents)?;
    if path.exists() {
        std::fs::rename(path, &bak_path)?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_then_renames_into_place() {
        let dir = std::env::temp_dir().join(format!("agent-loop-storage-state-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");

        write_atomic(&path, "{\"v\":1}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"v\":1}");

        write_atomic(&path, "{\"v\":2}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"v\":2}");
        assert!(path.with_extension("json.bak").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
