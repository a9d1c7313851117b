//! Last used postal code

use crate::location::PostalCode;
use log::warn;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::prelude::*;
use std::path::{Path, PathBuf};

/// Key the postal code is stored under
pub const ZIP_CODE_KEY: &str = "zip_code";
pub const DEFAULT_PREFERENCE_FILE: &str = ".daylight_zip";

/// Single persisted postal code
pub trait PreferenceStore: Send + Sync {
    fn get(&self) -> Option<PostalCode>;
    fn set(&mut self, code: &PostalCode) -> Result<(), String>;
    fn clear(&mut self) -> Result<(), String>;
}

/// In-memory store, forgotten when the process ends
#[derive(Debug, Default)]
pub struct MemoryPreference {
    values: HashMap<String, String>,
}

impl MemoryPreference {
    pub fn new() -> MemoryPreference {
        MemoryPreference::default()
    }
}

impl PreferenceStore for MemoryPreference {
    fn get(&self) -> Option<PostalCode> {
        self.values.get(ZIP_CODE_KEY).and_then(|v| v.parse().ok())
    }

    fn set(&mut self, code: &PostalCode) -> Result<(), String> {
        self.values
            .insert(ZIP_CODE_KEY.to_string(), code.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), String> {
        self.values.remove(ZIP_CODE_KEY);
        Ok(())
    }
}

/// Store backed by a TOML file
///
/// ```TOML
/// zip_code = '90210'
/// ```
///
/// Other keys in the file are kept as they are.
#[derive(Debug, Clone)]
pub struct TomlPreference {
    filename: PathBuf,
}

impl TomlPreference {
    pub fn new(filename: &Path) -> TomlPreference {
        TomlPreference {
            filename: filename.to_path_buf(),
        }
    }

    fn read(&self) -> Result<toml::value::Table, String> {
        if !self.filename.exists() {
            return Ok(toml::value::Table::new());
        }
        let s = fs::read_to_string(&self.filename).map_err(|why| why.to_string())?;
        toml::de::from_str(&s).map_err(|why| why.to_string())
    }

    fn save(&self, table: &toml::value::Table) -> Result<(), String> {
        let s = toml::to_string(table).map_err(|why| why.to_string())?;
        let mut file = File::create(&self.filename).map_err(|why| why.to_string())?;
        file.write_all(s.as_bytes()).map_err(|why| why.to_string())
    }
}

impl PreferenceStore for TomlPreference {
    fn get(&self) -> Option<PostalCode> {
        let table = match self.read() {
            Ok(t) => t,
            Err(why) => {
                warn!("{}: {}", self.filename.display(), why);
                return None;
            }
        };
        let value = table.get(ZIP_CODE_KEY)?.as_str()?;
        match value.parse() {
            Ok(code) => Some(code),
            Err(why) => {
                warn!("{}: {}", self.filename.display(), why);
                None
            }
        }
    }

    fn set(&mut self, code: &PostalCode) -> Result<(), String> {
        let mut table = self.read()?;
        table.insert(
            ZIP_CODE_KEY.to_string(),
            toml::Value::String(code.to_string()),
        );
        self.save(&table)
    }

    fn clear(&mut self) -> Result<(), String> {
        let mut table = self.read()?;
        if table.remove(ZIP_CODE_KEY).is_none() {
            return Ok(());
        }
        self.save(&table)
    }
}

#[test]
fn memory_preference_test() {
    let mut pref = MemoryPreference::new();
    assert_eq!(pref.get(), None);
    let code: PostalCode = "10001".parse().unwrap();
    pref.set(&code).unwrap();
    assert_eq!(pref.get(), Some(code));
    pref.clear().unwrap();
    assert_eq!(pref.get(), None);
}

#[test]
fn toml_preference_test() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file = dir.path().join("zip.toml");
    let mut pref = TomlPreference::new(&file);
    assert_eq!(pref.get(), None);

    let code: PostalCode = "02134".parse().unwrap();
    if let Err(why) = pref.set(&code) {
        assert!(false, "{}", why);
    }

    // a new store on the same file sees the saved code
    let restarted = TomlPreference::new(&file);
    assert_eq!(restarted.get(), Some(code));

    pref.clear().unwrap();
    assert_eq!(restarted.get(), None);
    assert!(file.exists());
}

#[test]
fn toml_preference_keeps_other_keys_test() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file = dir.path().join("zip.toml");
    fs::write(&file, "theme = 'dark'\nzip_code = 'abc'\n").unwrap();
    let mut pref = TomlPreference::new(&file);
    // an invalid stored value reads as nothing
    assert_eq!(pref.get(), None);

    pref.set(&"94103".parse().unwrap()).unwrap();
    pref.clear().unwrap();
    let s = fs::read_to_string(&file).unwrap();
    assert!(s.contains("theme"));
    assert!(!s.contains(ZIP_CODE_KEY));
}
