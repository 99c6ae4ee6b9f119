//! # Smali patcher
//!
//! Finds methods in apktool smali output by structural fingerprint and injects instruction
//! blocks into them at the places a constant is loaded.
//!
//! ```no_run
//!  use smali_patcher::find_smali_files;
//!  use smali_patcher::patch::{BytecodeContext, PatchSet, ResourceTable, SettingsRecorder};
//!  use smali_patcher::patches::HideTrendingSearchesPatch;
//!  use std::path::PathBuf;
//!
//!  let classes = find_smali_files(&PathBuf::from("smali")).unwrap();
//!  let mut bytecode = BytecodeContext::new(classes, Default::default());
//!  let resources = ResourceTable::new()
//!      .with("drawable", "yt_outline_arrow_time_black", 0x7f080001)
//!      .with("drawable", "yt_outline_search_black", 0x7f080123)
//!      .with("drawable", "yt_outline_fire_black", 0x7f080321);
//!  let mut settings = SettingsRecorder::default();
//!
//!  // the "settings" and "shared-resource-id" patches it depends on are registered by the host tool
//!  let set = PatchSet::new().with(HideTrendingSearchesPatch);
//!  match set.apply(&mut bytecode, &resources, &mut settings) {
//!      Ok(outcomes) => {
//!          for o in outcomes.iter().filter(|o| o.result.is_err()) {
//!              eprintln!("{}: {:?}", o.name, o.result);
//!          }
//!          for c in &bytecode.classes { c.save().unwrap(); }
//!      }
//!      Err(e) => eprintln!("{e}"),
//!  }
//! ```
use crate::types::{SmaliClass, SmaliError};
use std::path::PathBuf;

pub mod config;
pub mod dex;
pub mod error;
pub mod fingerprint;
pub mod literal;
pub mod patch;
pub mod patcher;
pub mod patches;
pub mod registers;
pub mod smali_ops;
mod smali_parse;
mod smali_write;
#[cfg(test)]
mod tests;
pub mod types;

/// Recurses a base path, typically a 'smali' folder from apktool returning a Vector of all found smali classes
///
/// # Examples
///
/// ```no_run
///  use smali_patcher::find_smali_files;
///  use std::path::PathBuf;
///  use std::str::FromStr;
///
///  let mut p = PathBuf::from_str("smali").unwrap();
///  let mut classes = find_smali_files(&p).unwrap();
///  println!("{:} smali classes loaded.", classes.len());
/// ```
pub fn find_smali_files(dir: &PathBuf) -> Result<Vec<SmaliClass>, SmaliError> {
    let mut results = vec![];

    let entries = dir
        .read_dir()
        .map_err(|e| SmaliError::new(&format!("Error reading directory {}: {}", dir.display(), e)))?;
    for p in entries.flatten() {
        // Directory: recurse sub-directory
        if let Ok(f) = p.file_type() {
            if f.is_dir() {
                let mut new_dir = dir.clone();
                new_dir.push(p.file_name());
                let dir_hs = find_smali_files(&new_dir)?;
                results.extend(dir_hs);
            } else if p.file_name().to_string_lossy().ends_with(".smali") {
                // It's a smali file
                let class = SmaliClass::read_from_file(&p.path())?;
                results.push(class);
            }
        }
    }

    Ok(results)
}
