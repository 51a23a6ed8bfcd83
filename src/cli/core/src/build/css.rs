/* src/cli/core/src/build/css.rs */

// Content-hash dedup of per-entry stylesheets.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tessera_server::TesseraError;
use tessera_server::manifest::asset_public_path;
use tessera_server::naming::content_hash;

#[derive(Debug, Default)]
pub(crate) struct CssTable {
  /// Entry name -> published stylesheet path.
  pub by_entry: BTreeMap<String, String>,
  /// Files removed because an earlier entry published the same bytes.
  pub removed: Vec<String>,
}

/// Resolve each entry's `<entry>.css` through a content-hash table. Entries
/// are visited in sorted order, so the first one with given bytes keeps its
/// file and later duplicates are deleted and pointed at it.
pub(crate) fn dedup_css<'a>(
  client_dir: &Path,
  entry_names: impl IntoIterator<Item = &'a str>,
) -> Result<CssTable, TesseraError> {
  let mut names: Vec<&str> = entry_names.into_iter().collect();
  names.sort_unstable();
  names.dedup();

  let mut published: HashMap<String, String> = HashMap::new();
  let mut table = CssTable::default();
  for name in names {
    let file = format!("{name}.css");
    let path = client_dir.join(&file);
    let Ok(bytes) = std::fs::read(&path) else { continue };
    let hash = content_hash(&bytes);
    match published.get(&hash) {
      Some(existing) => {
        std::fs::remove_file(&path)?;
        table.by_entry.insert(name.to_string(), existing.clone());
        table.removed.push(file);
      }
      None => {
        let public = asset_public_path(&file);
        published.insert(hash, public.clone());
        table.by_entry.insert(name.to_string(), public);
      }
    }
  }
  Ok(table)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_css_resolves_to_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let client = dir.path();
    std::fs::write(client.join("b_2.css"), "body{color:red}").unwrap();
    std::fs::write(client.join("a_1.css"), "body{color:red}").unwrap();
    std::fs::write(client.join("c_3.css"), "body{color:blue}").unwrap();

    let table = dedup_css(client, ["b_2", "a_1", "c_3", "d_4"]).unwrap();
    assert_eq!(table.by_entry["a_1"], "/assets/a_1.css");
    assert_eq!(table.by_entry["b_2"], "/assets/a_1.css");
    assert_eq!(table.by_entry["c_3"], "/assets/c_3.css");
    assert!(!table.by_entry.contains_key("d_4"));
    assert_eq!(table.removed, vec!["b_2.css".to_string()]);
    assert!(client.join("a_1.css").is_file());
    assert!(!client.join("b_2.css").exists());
  }
}
