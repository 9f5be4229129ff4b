//! Gitignore-aware script discovery.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Extra ignore globs (early prune + late filter)
//! - Extension filter for script files
//! - Deterministic ordering for stable output and tests
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Walker over script files below one or more roots.
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Lowercase extensions to keep; empty keeps everything
    extensions: Vec<String>,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g. "node_modules/**",
    /// "**/*.min.js"). Patterns match on paths relative to the walk root.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self { ignore_patterns: builder.build()?, extensions: Vec::new() })
    }

    /// Keep only files with one of these extensions (case-insensitive).
    pub fn with_extensions(
        mut self,
        extensions: &[String],
    ) -> Self
    {
        self.extensions = extensions
            .iter()
            .map(|e| {
                e.trim_start_matches('.')
                    .to_ascii_lowercase()
            })
            .collect();
        self
    }

    fn wants(
        &self,
        path: &Path,
    ) -> bool
    {
        if self
            .extensions
            .is_empty()
        {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|want| want.eq_ignore_ascii_case(ext))
            })
    }

    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // Dotfiles are scripts too; .git is excluded through ignore globs
        b.hidden(false);

        // Respect .ignore/.gitignore/.git/info/exclude and global gitignore
        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);

        // Early directory pruning using extra ignores, on relative paths
        let extra = self
            .ignore_patterns
            .clone();
        let base = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            let rel = ent
                .path()
                .strip_prefix(&base)
                .unwrap_or(ent.path());

            !(is_dir && !rel.as_os_str().is_empty() && extra.is_match(rel))
        });

        b
    }

    /// Script files under `root`, sorted.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();
        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<PathBuf> = walker
            .filter_map(|res| res.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root_path)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
                    && self.wants(abs)
            })
            .collect();

        out.sort();
        out
    }

    /// Expand a mix of file and directory arguments into script files.
    ///
    /// Files named explicitly are kept even if their extension is not a
    /// script extension; directories are walked.
    pub fn expand(
        &self,
        paths: &[PathBuf],
    ) -> Vec<PathBuf>
    {
        let mut out = Vec::new();
        for path in paths
        {
            if path.is_dir()
            {
                out.extend(self.walk_files(path));
            }
            else
            {
                out.push(path.clone());
            }
        }
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn relative(
        root: &Path,
        files: Vec<PathBuf>,
    ) -> Vec<PathBuf>
    {
        files
            .into_iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_path_buf()
            })
            .collect()
    }

    #[test]
    fn keeps_only_script_extensions() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "src/app.js", "x()")?;
        write_file(root, "src/mod.mjs", "y()")?;
        write_file(root, "README.md", "# readme")?;

        let walker = FileWalker::new(&[])?.with_extensions(&["js".into(), ".mjs".into()]);
        let files = relative(root, walker.walk_files(root));

        assert_eq!(files, vec![PathBuf::from("src/app.js"), PathBuf::from("src/mod.mjs")]);
        Ok(())
    }

    #[test]
    fn additional_globs_prune_and_filter() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "node_modules/pkg/index.js", "js")?;
        write_file(root, "src/vendor.min.js", "js")?;
        write_file(root, "src/lib.js", "js")?;

        let ignores = vec!["node_modules/**".to_string(), "**/*.min.js".to_string()];
        let walker = FileWalker::new(&ignores)?.with_extensions(&["js".into()]);
        let files = relative(root, walker.walk_files(root));

        assert_eq!(files, vec![PathBuf::from("src/lib.js")]);
        Ok(())
    }

    #[test]
    fn expand_keeps_explicit_files() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "dir/a.js", "a")?;
        write_file(root, "loose.txt", "b")?;

        let walker = FileWalker::new(&[])?.with_extensions(&["js".into()]);
        let files = walker.expand(&[root.join("dir"), root.join("loose.txt")]);

        assert_eq!(files, vec![root.join("dir/a.js"), root.join("loose.txt")]);
        Ok(())
    }
}
