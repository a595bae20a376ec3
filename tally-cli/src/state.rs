use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

/// Overrides the default `~/.tally` directory.
pub const HOME_ENV: &str = "TALLY_HOME";

pub fn tally_home() -> Result<PathBuf> {
    home_from(std::env::var_os(HOME_ENV), std::env::var_os("HOME"))
}

fn home_from(tally_home: Option<OsString>, home: Option<OsString>) -> Result<PathBuf> {
    if let Some(dir) = tally_home.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = home.filter(|h| !h.is_empty()).context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tally"))
}

pub fn ensure_tally_home() -> Result<PathBuf> {
    let dir = tally_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_defaults_under_user_home() {
        let dir = home_from(None, Some("/home/ana".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/home/ana/.tally"));
    }

    #[test]
    fn test_override_wins_unless_empty() {
        let dir = home_from(Some("/srv/tally".into()), Some("/home/ana".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/tally"));
        let dir = home_from(Some("".into()), Some("/home/ana".into())).unwrap();
        assert_eq!(dir, PathBuf::from("/home/ana/.tally"));
        assert!(home_from(None, None).is_err());
    }
}
