/// "Show in file manager" pass-through.
///
/// Directories are opened; files are opened with the file selected where the
/// platform's file manager supports it (Explorer, Finder). On other Unix
/// desktops the containing directory is opened through `xdg-open`.
use crate::error::RevealError;
use std::path::Path;
use std::process::Command;

/// Build the command that reveals `path`, or `None` on unsupported targets.
#[cfg(target_os = "windows")]
pub fn reveal_command(path: &Path) -> Option<Command> {
    let mut cmd = Command::new("explorer");
    if path.is_dir() {
        cmd.arg(path);
    } else {
        cmd.arg("/select,").arg(path);
    }
    Some(cmd)
}

#[cfg(target_os = "macos")]
pub fn reveal_command(path: &Path) -> Option<Command> {
    let mut cmd = Command::new("open");
    if !path.is_dir() {
        cmd.arg("-R");
    }
    cmd.arg(path);
    Some(cmd)
}

#[cfg(all(unix, not(target_os = "macos")))]
pub fn reveal_command(path: &Path) -> Option<Command> {
    let target = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    };
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    Some(cmd)
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn reveal_command(_path: &Path) -> Option<Command> {
    None
}

/// Launch the file manager for `path` without waiting for it.
pub fn reveal_path(path: &Path) -> Result<(), RevealError> {
    let mut cmd = reveal_command(path).ok_or(RevealError::Unsupported)?;
    cmd.spawn().map_err(|source| RevealError::Launch {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(all(test, unix, not(target_os = "macos")))]
mod tests {
    use super::*;

    #[test]
    fn files_reveal_their_parent_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, b"x").unwrap();

        let cmd = reveal_command(&file).expect("supported on unix");
        assert_eq!(cmd.get_program(), "xdg-open");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, [tmp.path().as_os_str()]);
    }

    #[test]
    fn directories_are_opened_directly() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cmd = reveal_command(tmp.path()).expect("supported on unix");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, [tmp.path().as_os_str()]);
    }
}
