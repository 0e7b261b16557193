use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A named text file that is part of a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckFile {
    pub name: String,
    pub text: String,
}

impl DeckFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// The compiled input of one simulation run: the main input file and an optional
/// layer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub input: DeckFile,
    pub layers: Option<DeckFile>,
}

impl Deck {
    pub fn files(&self) -> impl Iterator<Item = &DeckFile> {
        std::iter::once(&self.input).chain(self.layers.as_ref())
    }

    /// Writes every file of the deck into `dir` and returns the written paths.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        self.files()
            .map(|file| {
                let path = dir.join(&file.name);
                fs::write(&path, &file.text)?;
                Ok(path)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_to_dir_writes_all_files() {
        let deck = Deck {
            input: DeckFile::new("tri.inp", "title\n"),
            layers: Some(DeckFile::new("layer.inp", "0 end\n")),
        };
        let dir = tempdir().unwrap();
        let target = dir.path().join("run");

        let written = deck.write_to_dir(&target).unwrap();

        assert_eq!(written, vec![target.join("tri.inp"), target.join("layer.inp")]);
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "0 end\n");
    }
}
