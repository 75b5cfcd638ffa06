//! Asset access
//!
//! The renderer only ever asks for a byte stream by name. Where the bytes come from
//! (an application bundle, a directory, memory) is up to the [`AssetProvider`].

pub mod image_loader;

pub use image_loader::ImageData;

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Source of named asset byte streams
pub trait AssetProvider {
    /// Open the asset called `name` for reading
    fn open(&self, name: &str) -> Result<Box<dyn Read + '_>, AssetError>;
}

/// Assets stored as files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Resolve names against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AssetError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetProvider for DirectoryAssets {
    fn open(&self, name: &str) -> Result<Box<dyn Read + '_>, AssetError> {
        let path = self.resolve(name)?;
        log::debug!("Opening asset {:?}", path);
        match std::fs::File::open(&path) {
            Ok(file) => Ok(Box::new(std::io::BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(name.to_string()))
            }
            Err(e) => Err(AssetError::IoError(e)),
        }
    }
}

/// Assets held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(name.into(), bytes);
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl AssetProvider for MemoryAssets {
    fn open(&self, name: &str) -> Result<Box<dyn Read + '_>, AssetError> {
        self.entries
            .get(name)
            .map(|bytes| Box::new(Cursor::new(bytes.as_slice())) as Box<dyn Read + '_>)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Asset name would resolve outside the asset root
    #[error("Invalid asset name: {0}")]
    InvalidName(String),

    /// Failed to decode asset contents
    #[error("Failed to decode asset: {0}")]
    DecodeFailed(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
