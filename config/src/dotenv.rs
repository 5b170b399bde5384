//! `.env` reader: KEY=VALUE lines into a map. Applying to the process env happens in `lib`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn dotenv_path(dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Strips one pair of matching quotes. Double quotes honour `\"`.
fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return inner.replace("\\\"", "\"");
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_string();
        }
    }
    value.to_string()
}

/// One pair per line; `#` lines and blanks skipped; optional leading `export `.
pub(crate) fn parse(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let l = l.strip_prefix("export ").unwrap_or(l);
            let (k, v) = l.split_once('=')?;
            let key = k.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(v.trim())))
        })
        .collect()
}

/// Missing file is an empty map, not an error.
pub(crate) fn load(dir: Option<&Path>) -> std::io::Result<HashMap<String, String>> {
    match dotenv_path(dir) {
        Some(path) => Ok(parse(&std::fs::read_to_string(path)?)),
        None => Ok(HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_noise() {
        let m = parse(
            "\n# comment\nOPENAI_API_KEY=sk-1\nNOT_A_PAIR\n=orphan\nDGUI_MODEL = gpt-4o \n",
        );
        assert_eq!(m.len(), 2);
        assert_eq!(m["OPENAI_API_KEY"], "sk-1");
        assert_eq!(m["DGUI_MODEL"], "gpt-4o");
    }

    #[test]
    fn quotes_are_stripped() {
        let m = parse("A=\"hello \\\"there\\\"\"\nB='single # kept'\nC=\"\"");
        assert_eq!(m["A"], "hello \"there\"");
        assert_eq!(m["B"], "single # kept");
        assert_eq!(m["C"], "");
    }

    #[test]
    fn export_prefix_is_accepted() {
        let m = parse("export RUST_LOG=debug");
        assert_eq!(m["RUST_LOG"], "debug");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(dir.path())).unwrap().is_empty());
    }
}
