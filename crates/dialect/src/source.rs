//! Game file resolution
//!
//! A game is either a bare `.wgsl` file, a directory containing `main.wgsl`
//! plus assets, or a zip archive of the same. Both backing stores sit behind
//! [`GameSource`], which resolves relative asset paths to bytes. The archive
//! variant is unpacked once into a flat name-to-bytes map so later reads
//! never touch the decoder again.

use crate::error::DialectError;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Magic bytes at the start of a zip archive
pub const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Default entry file inside a directory or archive game
pub const DEFAULT_ENTRY: &str = "main.wgsl";

/// Byte/text resolver over the game's root
#[derive(Debug)]
pub enum GameSource {
    /// Paths resolve relative to this directory
    Directory(PathBuf),
    /// Flat map of archive entry name to raw bytes
    Archive(HashMap<String, Vec<u8>>),
}

impl GameSource {
    /// Builds a source from raw bytes, detecting the archive magic
    ///
    /// Bytes beginning with `PK\x03\x04` are unpacked as a zip archive;
    /// anything else is rejected.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DialectError> {
        if bytes.len() < ZIP_MAGIC.len() || bytes[..ZIP_MAGIC.len()] != ZIP_MAGIC {
            return Err(DialectError::Syntax {
                message: "game bytes are neither WGSL text nor a zip archive".to_string(),
            });
        }

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|source| DialectError::Archive {
            path: "<archive>".to_string(),
            source,
        })?;

        let mut entries = HashMap::new();
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(|source| DialectError::Archive {
                path: format!("<archive entry {index}>"),
                source,
            })?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().trim_start_matches("./").to_string();
            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents).map_err(|source| DialectError::Io { path: name.clone(), source })?;
            entries.insert(name, contents);
        }

        Ok(GameSource::Archive(entries))
    }

    /// Reads a file relative to the game root
    ///
    /// Directory reads reject `..` components so a game cannot reach outside
    /// its own tree. Archive lookups tolerate a leading `./`.
    pub fn read_bytes(&self, file_path: &str) -> Result<Vec<u8>, DialectError> {
        match self {
            GameSource::Directory(base) => {
                let requested = Path::new(file_path);
                if requested.components().any(|c| matches!(c, Component::ParentDir)) {
                    return Err(DialectError::PathTraversal { path: file_path.to_string() });
                }
                match std::fs::read(base.join(requested)) {
                    Ok(bytes) => Ok(bytes),
                    Err(source) if source.kind() == std::io::ErrorKind::NotFound => Err(DialectError::AssetNotFound { path: file_path.to_string() }),
                    Err(source) => Err(DialectError::Io {
                        path: file_path.to_string(),
                        source,
                    }),
                }
            }
            GameSource::Archive(entries) => {
                let stripped = file_path.strip_prefix("./").unwrap_or(file_path);
                entries.get(stripped).cloned().ok_or_else(|| DialectError::AssetNotFound { path: file_path.to_string() })
            }
        }
    }

    /// Reads a file as UTF-8 text
    pub fn read_text(&self, file_path: &str) -> Result<String, DialectError> {
        let bytes = self.read_bytes(file_path)?;
        String::from_utf8(bytes).map_err(|_| DialectError::InvalidUtf8 { path: file_path.to_string() })
    }
}

/// A game source paired with the name of its entry shader
#[derive(Debug)]
pub struct GameBundle {
    /// Resolver for the game's files
    pub source: GameSource,
    /// Entry file name, relative to the root
    pub entry: String,
}

impl GameBundle {
    /// Opens a game from a filesystem path
    ///
    /// * a path ending in `.wgsl` becomes a directory source rooted at the
    ///   file's parent, with the file itself as the entry;
    /// * a directory becomes a directory source with `main.wgsl` as entry;
    /// * any other file is sniffed for the zip magic and unpacked.
    pub fn open(path: &Path) -> Result<Self, DialectError> {
        if path.extension().is_some_and(|ext| ext == "wgsl") {
            let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new(".")).to_path_buf();
            let entry = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| DialectError::AssetNotFound { path: path.display().to_string() })?;
            return Ok(Self {
                source: GameSource::Directory(parent),
                entry,
            });
        }

        if path.is_dir() {
            return Ok(Self {
                source: GameSource::Directory(path.to_path_buf()),
                entry: DEFAULT_ENTRY.to_string(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => DialectError::AssetNotFound { path: path.display().to_string() },
            _ => DialectError::Io {
                path: path.display().to_string(),
                source,
            },
        })?;
        Ok(Self {
            source: GameSource::from_bytes(bytes)?,
            entry: DEFAULT_ENTRY.to_string(),
        })
    }

    /// Reads the entry shader source
    pub fn entry_text(&self) -> Result<String, DialectError> {
        self.source.read_text(&self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn archive_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_archive_magic_detection() {
        let bytes = archive_with(&[("main.wgsl", b"// game")]);
        assert_eq!(&bytes[..4], &ZIP_MAGIC);

        let source = GameSource::from_bytes(bytes).unwrap();
        assert_eq!(source.read_text("main.wgsl").unwrap(), "// game");
    }

    #[test]
    fn test_non_archive_bytes_rejected() {
        assert!(GameSource::from_bytes(b"struct GameState {}".to_vec()).is_err());
    }

    #[test]
    fn test_archive_missing_entry_is_not_found() {
        let source = GameSource::from_bytes(archive_with(&[("main.wgsl", b"")])).unwrap();
        match source.read_bytes("player.png") {
            Err(DialectError::AssetNotFound { path }) => assert_eq!(path, "player.png"),
            other => panic!("expected AssetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_archive_tolerates_dot_slash() {
        let source = GameSource::from_bytes(archive_with(&[("sfx/bump.ogg", b"\x01\x02")])).unwrap();
        assert_eq!(source.read_bytes("./sfx/bump.ogg").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_directory_rejects_traversal() {
        let source = GameSource::Directory(PathBuf::from("."));
        assert!(matches!(source.read_bytes("../secret"), Err(DialectError::PathTraversal { .. })));
    }

    #[test]
    fn test_wgsl_path_resolves_to_parent_directory() {
        let bundle = GameBundle::open(Path::new("games/pong/main.wgsl")).unwrap();
        assert_eq!(bundle.entry, "main.wgsl");
        match bundle.source {
            GameSource::Directory(base) => assert_eq!(base, PathBuf::from("games/pong")),
            other => panic!("expected directory source, got {other:?}"),
        }
    }
}
