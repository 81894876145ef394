// src/asset/write.rs

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::errors::{BuildError, Result};

/// Write `content` to `dest` so readers see either the old file or the
/// complete new one.
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `dest`. Missing parent directories are created.
pub fn write_atomic(dest: &Path, content: &[u8]) -> Result<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| BuildError::io(parent, e))?;
    if let Err(e) = tmp.write_all(content).and_then(|()| tmp.flush()) {
        return Err(BuildError::io(tmp.path(), e));
    }

    // Temp files are created owner-only; published assets should be readable.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| BuildError::io(tmp.path(), e))?;
    }

    tmp.persist(dest).map_err(|e| BuildError::io(dest, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/out.txt");

        write_atomic(&dest, b"first").unwrap();
        write_atomic(&dest, b"second").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"second");
        let leftovers = fs::read_dir(dest.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "no temporary files left behind");
    }
}
