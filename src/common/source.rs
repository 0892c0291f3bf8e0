use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};

/// One compilation unit's worth of source code.
/// Essentially a string with a path, the path serving as the
/// unit's name; snippets without a backing file point to
/// `./snippet`. A `Source` is shared behind an `Rc` so that
/// tokens, diagnostics, and errors can all refer back to it
/// without copying the text around.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Wraps already-loaded text with the path it came from.
    /// Does not check that the file actually contains `contents`;
    /// prefer `Source::file` or `Source::snippet`.
    pub fn new(contents: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: contents.to_string(),
            path: path.to_owned(),
        })
    }

    /// Reads a compilation unit from disk.
    pub fn file(path: &Path) -> std::io::Result<Rc<Source>> {
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        Ok(Source::new(&contents, path))
    }

    /// Builds a `Source` from a bare string, for tests and the like.
    pub fn snippet(contents: &str) -> Rc<Source> {
        Source::new(contents, &PathBuf::from("./snippet"))
    }

    /// The file stem, used as the generated class name.
    /// `foo/bar.k` compiles to class `bar`.
    pub fn class_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snippet".to_string())
    }
}
