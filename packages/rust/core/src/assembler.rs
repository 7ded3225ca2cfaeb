//! Final script assembly and the on-disk script file.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use scriptcrew_shared::{Result, ScriptCrewError};

/// Separator between fragments: exactly one blank line.
pub const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Join fragments, in order, into the final script.
pub fn assemble(fragments: &[String]) -> String {
    fragments.join(FRAGMENT_SEPARATOR)
}

/// Slug used in the script file name: lowercase alphanumerics joined by `_`.
pub fn category_slug(category: &str) -> String {
    let mut slug = String::with_capacity(category.len());
    for c in category.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// `script_<slug>.txt`
pub fn script_file_name(category: &str) -> String {
    format!("script_{}.txt", category_slug(category))
}

/// Write `script` into `dir` under the category's file name.
///
/// The file is written to a hidden temp file first and renamed into place.
#[instrument(skip(script), fields(chars = script.len()))]
pub fn save_script(dir: &Path, category: &str, script: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| ScriptCrewError::io(dir, e))?;

    let file_name = script_file_name(category);
    let target = dir.join(&file_name);
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, script).map_err(|e| ScriptCrewError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| ScriptCrewError::io(&target, e))?;

    debug!(path = %target.display(), "wrote script");
    Ok(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "scriptcrew-assembler-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn assemble_uses_one_blank_line() {
        let fragments = vec!["Intro.".to_string(), "[A]".to_string(), "[B]".to_string()];
        assert_eq!(assemble(&fragments), "Intro.\n\n[A]\n\n[B]");
        assert_eq!(assemble(&fragments), assemble(&fragments));
    }

    #[test]
    fn assemble_edge_cases() {
        assert_eq!(assemble(&[]), "");
        assert_eq!(assemble(&["only".to_string()]), "only");
    }

    #[test]
    fn slug_is_filesystem_friendly() {
        assert_eq!(category_slug("Tecnologia e Privacidade"), "tecnologia_e_privacidade");
        assert_eq!(
            category_slug("  Inteligência Artificial & o Futuro!  "),
            "inteligência_artificial_o_futuro"
        );
        assert_eq!(category_slug("???"), "untitled");
        assert_eq!(script_file_name("IA"), "script_ia.txt");
    }

    #[test]
    fn save_script_writes_file_without_temp_leftovers() {
        let tmp = temp_dir();
        let path = save_script(&tmp, "Test Topic", "Intro.\n\n[A]").unwrap();

        assert_eq!(path, tmp.join("script_test_topic.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Intro.\n\n[A]");
        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
