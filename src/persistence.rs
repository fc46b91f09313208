//! Durable JSON state: one file on disk holding every device's last-known
//! output state, written atomically so a crash mid-write never corrupts it.

use crate::error::PersistError;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// `device_key -> output_key -> {state, brightness}` as loaded from or
/// about to be written to disk.
pub type PersistedState = HashMap<String, HashMap<String, Value>>;

/// Loads persisted state from `path`. A missing file is not an error: it
/// means the gateway has never persisted state before, and every output
/// starts at its constructed default.
pub fn load(path: &Path) -> Result<PersistedState, PersistError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::new()),
        Err(e) => Err(e.into()),
    }
}

/// Writes `state` to `path` atomically: serialize to a temp file in the
/// same directory, flush, then rename over the destination. A reader never
/// observes a partially-written file.
pub fn save_atomic(path: &Path, state: &PersistedState) -> Result<(), PersistError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string_pretty(state)?;
    temp.write_all(serialized.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_missing_file_returns_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.json");
        let state = load(&path).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheiber_state.json");

        let mut state = PersistedState::new();
        let mut device = HashMap::new();
        device.insert("s1".to_string(), json!({ "state": true, "brightness": 200 }));
        state.insert("10".to_string(), device);

        save_atomic(&path, &state).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheiber_state.json");
        save_atomic(&path, &PersistedState::new()).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
