//! Clip discovery and output naming.

use crate::constants::output::{EXTENSION, FILE_PREFIX};
use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Recursively collect clips with `extension` under `dir`, sorted by path.
///
/// The extension match ignores ASCII case.
pub fn collect_clips(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut clips = Vec::new();
    collect_clips_recursive(dir, OsStr::new(extension), &mut clips)?;
    if clips.is_empty() {
        return Err(Error::NoAudioClips {
            path: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }
    clips.sort();
    Ok(clips)
}

fn collect_clips_recursive(dir: &Path, extension: &OsStr, clips: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_clips_recursive(&path, extension, clips)?;
        } else if has_extension(&path, extension) {
            clips.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extension: &OsStr) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Row identifier for a clip: the file name split on `_` and `.`, first two
/// pieces joined with `_`.
///
/// `10534_SSW_20170429.ogg` becomes `10534_SSW`; `abc.ogg` becomes `abc_ogg`.
pub fn row_id_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
    name.split(['_', '.']).take(2).collect::<Vec<_>>().join("_")
}

/// Result table path for a threshold, e.g. `pseudo_0.5.csv`.
pub fn output_path_for(output_dir: &Path, threshold: f32) -> PathBuf {
    output_dir.join(format!("{FILE_PREFIX}{}{EXTENSION}", format_threshold(threshold)))
}

/// Shortest decimal form, always with a fractional part (`0.5`, `1.0`).
fn format_threshold(threshold: f32) -> String {
    let s = threshold.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_row_id_for() {
        assert_eq!(row_id_for(Path::new("/data/10534_SSW_20170429.ogg")), "10534_SSW");
        assert_eq!(row_id_for(Path::new("abc.ogg")), "abc_ogg");
        assert_eq!(row_id_for(Path::new("7019_COR.ogg")), "7019_COR");
        assert_eq!(row_id_for(Path::new("noext")), "noext");
    }

    #[test]
    fn test_row_id_for_unicode() {
        assert_eq!(row_id_for(Path::new("ääni_tiedostö_1.ogg")), "ääni_tiedostö");
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("/out"), 0.5),
            PathBuf::from("/out/pseudo_0.5.csv")
        );
        assert_eq!(
            output_path_for(Path::new("."), 1.0),
            PathBuf::from("./pseudo_1.0.csv")
        );
        assert_eq!(
            output_path_for(Path::new("."), 0.35),
            PathBuf::from("./pseudo_0.35.csv")
        );
    }

    #[test]
    fn test_collect_clips_sorted_recursive_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("site_b");
        std::fs::create_dir(&sub).unwrap();
        for p in [
            dir.path().join("2_B.ogg"),
            dir.path().join("1_A.OGG"),
            sub.join("0_C.ogg"),
            dir.path().join("notes.txt"),
        ] {
            std::fs::write(p, b"").unwrap();
        }

        let clips = collect_clips(dir.path(), "ogg").unwrap();
        let names: Vec<_> = clips
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("1_A.OGG"),
                PathBuf::from("2_B.ogg"),
                PathBuf::from("site_b/0_C.ogg"),
            ]
        );
    }

    #[test]
    fn test_collect_clips_empty_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            collect_clips(dir.path(), "ogg"),
            Err(Error::NoAudioClips { .. })
        ));
    }
}
