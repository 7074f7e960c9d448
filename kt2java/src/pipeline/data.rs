use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// A named byte buffer exchanged with the pipeline: a Kotlin input or a
/// generated Java output. `name` is a `/`-separated path relative to the
/// input or output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFile {
    pub name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl DataFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Name relative to `root`, with `/` separators on every platform
    pub fn from_path(root: &Path, path: &Path, content: Vec<u8>) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path);
        Self::new(relative_name(relative), content)
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Relative location under an output root. `None` when the name is
    /// absolute or climbs out of the root with `..`.
    pub fn relative_path(&self) -> Option<PathBuf> {
        let path = Path::new(&self.name);
        let contained = path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        (contained && !self.name.is_empty()).then(|| path.to_path_buf())
    }
}

pub(crate) fn relative_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Ordered collection of [`DataFile`]s
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFiles {
    files: Vec<DataFile>,
}

impl DataFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: DataFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DataFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataFile> {
        self.files.iter()
    }

    pub fn as_slice(&self) -> &[DataFile] {
        &self.files
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|file| file.name.as_str())
    }

    pub fn total_size(&self) -> usize {
        self.files.iter().map(DataFile::size).sum()
    }
}

impl From<Vec<DataFile>> for DataFiles {
    fn from(files: Vec<DataFile>) -> Self {
        Self { files }
    }
}

impl FromIterator<DataFile> for DataFiles {
    fn from_iter<T: IntoIterator<Item = DataFile>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DataFiles {
    type Item = DataFile;
    type IntoIter = std::vec::IntoIter<DataFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a DataFiles {
    type Item = &'a DataFile;
    type IntoIter = std::slice::Iter<'a, DataFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_relative_to_root() {
        let file = DataFile::from_path(
            Path::new("/work/src"),
            Path::new("/work/src/app/model/User.kt"),
            b"class User".to_vec(),
        );
        assert_eq!(file.name, "app/model/User.kt");
        assert_eq!(file.as_str(), Some("class User"));
        assert_eq!(file.size(), 10);
    }

    #[test]
    fn test_relative_path_rejects_escapes() {
        assert!(DataFile::new("a/B.java", "").relative_path().is_some());
        assert!(DataFile::new("../B.java", "").relative_path().is_none());
        assert!(DataFile::new("/tmp/B.java", "").relative_path().is_none());
        assert!(DataFile::new("", "").relative_path().is_none());
    }

    #[test]
    fn test_collection() {
        let files: DataFiles = vec![DataFile::new("A.kt", "val a = 1"), DataFile::new("B.kt", "")]
            .into_iter()
            .collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files.names().collect::<Vec<_>>(), vec!["A.kt", "B.kt"]);
        assert_eq!(files.total_size(), 9);
        assert_eq!(files.get(1).map(|f| f.name.as_str()), Some("B.kt"));
    }
}
