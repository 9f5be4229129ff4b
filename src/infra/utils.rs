//! Small helpers organized by focused structs, associated fns only.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;

use crate::cli::AppContext;

/// User-supplied path helpers
pub struct PathUtils;

impl PathUtils
{
    /// Expand `~` and `$VAR` in a user path; unknown variables leave it as is
    pub fn expand(path: &Path) -> PathBuf
    {
        let raw = path.to_string_lossy();
        match shellexpand::full(&raw)
        {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(
                shellexpand::tilde(&raw).as_ref(),
            ),
        }
    }

    /// `path` relative to `root` when below it, with `/` separators
    pub fn display_relative(
        path: &Path,
        root: &Path,
    ) -> String
    {
        let rel = path
            .strip_prefix(root)
            .or_else(|_| path.strip_prefix("."))
            .unwrap_or(path);

        let shown = rel.to_string_lossy();
        if shown.is_empty()
        {
            return path
                .to_string_lossy()
                .replace('\\', "/");
        }
        shown.replace('\\', "/")
    }

    /// File stem used in artifact names
    pub fn stem(path: &Path) -> Cow<'_, str>
    {
        path.file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or(Cow::Borrowed("out"))
    }
}

/// Terminal colors that honor `--no-color`
#[derive(Debug, Clone, Copy)]
pub struct Paint
{
    enabled: bool,
}

impl Paint
{
    pub fn new(ctx: &AppContext) -> Self
    {
        Self { enabled: !ctx.no_color }
    }

    /// Success marker text
    pub fn ok(
        &self,
        s: &str,
    ) -> String
    {
        if self.enabled { s.green().to_string() } else { s.to_string() }
    }

    /// Dry-run and warning text
    pub fn warn(
        &self,
        s: &str,
    ) -> String
    {
        if self.enabled { s.yellow().to_string() } else { s.to_string() }
    }

    /// Checksums and flag keys
    pub fn accent(
        &self,
        s: &str,
    ) -> String
    {
        if self.enabled { s.cyan().to_string() } else { s.to_string() }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn relative_display()
    {
        let root = Path::new("/work/app");
        assert_eq!(
            PathUtils::display_relative(Path::new("/work/app/src/a.js"), root),
            "src/a.js"
        );
        assert_eq!(PathUtils::display_relative(Path::new("/elsewhere/b.js"), root), "/elsewhere/b.js");
        assert_eq!(PathUtils::display_relative(Path::new("./lib/c.js"), root), "lib/c.js");
    }

    #[test]
    fn stems()
    {
        assert_eq!(PathUtils::stem(Path::new("src/app.js")), "app");
        assert_eq!(PathUtils::stem(Path::new("lib.min.js")), "lib.min");
    }

    #[test]
    fn tilde_expands()
    {
        let plain = PathUtils::expand(Path::new("dist/out"));
        assert_eq!(plain, PathBuf::from("dist/out"));
    }

    #[test]
    fn paint_respects_no_color()
    {
        let ctx = AppContext { quiet: false, no_color: true, dry_run: false };
        assert_eq!(Paint::new(&ctx).ok("done"), "done");
    }
}
