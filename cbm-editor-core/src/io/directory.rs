//! A document stored as a directory of numbered images, `000.png`, `001.png`...
//!
//! Files whose stem is not exactly such a zero-padded number (`0.png`, `+1.png`, `0001.png`), or with
//! another extension, are not part of the document and are never touched.

use super::{DocumentStore, ImageCodec, IoError, PngCodec};
use crate::state::Document;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "png";

pub struct DirectoryStore<Codec = PngCodec> {
    codec: Codec,
}
impl Default for DirectoryStore<PngCodec> {
    fn default() -> Self {
        Self { codec: PngCodec }
    }
}
impl<Codec: ImageCodec> DirectoryStore<Codec> {
    pub fn new(codec: Codec) -> Self {
        Self { codec }
    }
}

fn file_stem(index: usize) -> String {
    format!("{index:03}")
}

/// The numbered image files in `dir`, in index order.
fn numbered_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>, IoError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file()
            || path.extension().and_then(std::ffi::OsStr::to_str) != Some(EXTENSION)
        {
            continue;
        }
        let Some(index) = path
            .file_stem()
            .and_then(std::ffi::OsStr::to_str)
            .and_then(|stem| {
                let index = stem.parse::<usize>().ok()?;
                // Exactly the name this store writes, so no two files claim an index.
                (file_stem(index) == stem).then_some(index)
            })
        else {
            continue;
        };
        files.push((index, path));
    }
    files.sort_unstable_by_key(|&(index, _)| index);
    Ok(files)
}

impl<Codec: ImageCodec> DocumentStore for DirectoryStore<Codec> {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let images = numbered_files(path)?
            .into_iter()
            .map(|(_, file)| self.codec.load(&file).map_err(|e| e.in_file(file)))
            .collect::<Result<_, _>>()?;
        log::debug!("Loaded {path:?}");
        Ok(Document {
            path: Some(path.to_owned()),
            images,
        })
    }
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let file_path = |index: usize| path.join(format!("{}.{EXTENSION}", file_stem(index)));
        // Nothing is written unless every image can be.
        for (index, image) in document.images.iter().enumerate() {
            self.codec.check(image).map_err(|e| e.in_file(file_path(index)))?;
        }
        std::fs::create_dir_all(path)?;
        for (index, image) in document.images.iter().enumerate() {
            let file = file_path(index);
            self.codec
                .save(image, &file)
                .map_err(|e| e.in_file(file))?;
        }
        // Images deleted since the last save.
        for (index, stale) in numbered_files(path)? {
            if index >= document.images.len() {
                log::trace!("Removing stale {stale:?}");
                std::fs::remove_file(&stale)?;
            }
        }
        log::debug!("Saved {} image(s) to {path:?}", document.images.len());
        Ok(())
    }
    fn decompress(&self, _: &mut Document) {
        // Images are always held decoded.
    }
}

#[cfg(test)]
mod test {
    use super::DirectoryStore;
    use crate::{
        color::PaletteEntry,
        io::{DocumentStore, IoError},
        state::{Document, Image, Palette},
    };

    fn image(color: u8) -> Image {
        let palette = Palette::new(vec![PaletteEntry::from_rgb(color, color, color)]).unwrap();
        Image::new(1, 1, Some(palette), vec![0]).unwrap()
    }
    fn store() -> DirectoryStore {
        DirectoryStore::default()
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("HANGAR");
        let store = store();
        let document = Document {
            path: None,
            images: (0..12).map(image).collect(),
        };
        store.save(&document, &path).unwrap();

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        // Numeric order, not lexical: 010 and 011 come last.
        assert_eq!(loaded.images, document.images);
    }
    #[test]
    fn ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store
            .save(
                &Document {
                    path: None,
                    images: vec![image(1)],
                },
                dir.path(),
            )
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("cover.png"), "not even a png").unwrap();

        let loaded = store.load(dir.path()).unwrap();
        assert_eq!(loaded.images, vec![image(1)]);
        assert!(dir.path().join("cover.png").exists());
    }
    #[test]
    fn removes_deleted_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let mut document = Document {
            path: None,
            images: vec![image(1), image(2), image(3)],
        };
        store.save(&document, dir.path()).unwrap();
        document.images.remove(1);
        store.save(&document, dir.path()).unwrap();

        assert!(!dir.path().join("002.png").exists());
        assert_eq!(store.load(dir.path()).unwrap().images, document.images);
    }
    #[test]
    fn only_padded_names_are_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        let document = Document {
            path: None,
            images: vec![image(1)],
        };
        store.save(&document, dir.path()).unwrap();
        for alias in ["0.png", "+0.png", "0000.png"] {
            std::fs::copy(dir.path().join("000.png"), dir.path().join(alias)).unwrap();
        }

        assert_eq!(store.load(dir.path()).unwrap().images, document.images);
        store.save(&document, dir.path()).unwrap();
        assert_eq!(store.load(dir.path()).unwrap().images, document.images);
        for alias in ["0.png", "+0.png", "0000.png"] {
            assert!(dir.path().join(alias).exists());
        }
    }
    #[test]
    fn unencodable_image_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("HANGAR");
        let document = Document {
            path: None,
            images: vec![image(1), Image::default()],
        };
        let err = store().save(&document, &path).unwrap_err();
        assert_eq!(err.to_string(), path.join("001.png").display().to_string());
        assert!(!path.exists());

        // Previously saved contents are left alone too.
        let saved = Document {
            path: None,
            images: vec![image(1), image(2), image(3)],
        };
        store().save(&saved, &path).unwrap();
        store().save(&document, &path).unwrap_err();
        assert_eq!(store().load(&path).unwrap().images, saved.images);
    }
    #[test]
    fn broken_image_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("000.png");
        std::fs::write(&file, "garbage, certainly not a png").unwrap();
        let err = store().load(dir.path()).unwrap_err();
        assert!(matches!(&err, IoError::File { source, .. } if matches!(**source, IoError::Decode(_))));
        assert_eq!(err.to_string(), file.display().to_string());

        // Each link of the chain shows up once.
        let rendered = format!("{:#}", anyhow::Error::from(err));
        let prefix = format!("{}: decode failed: ", file.display());
        assert!(rendered.starts_with(&prefix), "{rendered}");
        assert_eq!(rendered.matches("decode failed").count(), 1, "{rendered}");
        assert_eq!(rendered.matches("000.png").count(), 1, "{rendered}");
    }
    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = store()
            .load(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }
}
