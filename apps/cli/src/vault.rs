//! Vault layout helpers: note discovery, deck derivation, media resolution.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recursively collect the Markdown files under `path` in a stable order.
/// Hidden directories (`.obsidian` and friends) are skipped.
pub fn collect_markdown_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_into(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_into(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    Ok(())
}

/// Name the vault after its root directory.
pub fn vault_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vault".to_string())
}

/// The note name used in deep links and the `Source` field: the file stem.
pub fn note_name(file: &Path) -> String {
    file.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "note".to_string())
}

/// Deck name derived from the note's folder path inside the vault:
/// `programming/rust/ownership.md` becomes `programming::rust`. Notes at the
/// vault root derive nothing.
pub fn folder_deck(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parent = relative.parent()?;
    if parent.as_os_str().is_empty() {
        return None;
    }
    let components: Vec<String> = parent
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(components.join("::"))
}

/// Resolve a media reference the way links resolve in a vault: a direct
/// relative path first, then the first file anywhere under the root whose
/// name matches.
pub fn resolve_media(root: &Path, name: &str) -> Option<PathBuf> {
    let direct = root.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    let wanted = Path::new(name).file_name()?.to_owned();
    find_by_name(root, &wanted)
}

fn find_by_name(dir: &Path, wanted: &std::ffi::OsStr) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut dirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            dirs.push(path);
        } else if path.file_name() == Some(wanted) {
            return Some(path);
        }
    }
    dirs.into_iter().find_map(|d| find_by_name(&d, wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_deck_joins_components() {
        let root = Path::new("/vault");
        let file = Path::new("/vault/programming/rust/ownership.md");
        assert_eq!(
            folder_deck(root, file),
            Some("programming::rust".to_string())
        );
    }

    #[test]
    fn root_note_has_no_folder_deck() {
        let root = Path::new("/vault");
        let file = Path::new("/vault/inbox.md");
        assert_eq!(folder_deck(root, file), None);
    }

    #[test]
    fn vault_and_note_names() {
        assert_eq!(vault_name(Path::new("/home/me/My Vault")), "My Vault");
        assert_eq!(note_name(Path::new("/v/notes/Biology.md")), "Biology");
    }
}
