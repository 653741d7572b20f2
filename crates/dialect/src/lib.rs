//! WGSL game dialect preprocessor
//!
//! Games for the wgslbox runtime are written in an extended WGSL dialect:
//! `@`-prefixed directives reference assets (`@texture`, `@sound`,
//! `@model`, ...), pull in other source files (`@import`), and reach into
//! engine-managed state (`@engine.*`). This crate compiles that dialect to
//! standard WGSL plus a [`GameManifest`]: the ordered asset lists, binding
//! decisions and byte layout the host must materialize for the shader to
//! read the right memory.
//!
//! The crate is pure CPU code. The companion `wgslbox` crate turns a
//! manifest into GPU resources and runs the per-frame schedule.

mod error;
mod manifest;
mod preprocess;
mod scan;
mod source;

pub mod keys;
pub mod layout;

pub use error::DialectError;
pub use manifest::GameManifest;
pub use preprocess::{Preprocessor, DEFAULT_HEIGHT, DEFAULT_TITLE, DEFAULT_WIDTH, STR_ARRAY_LEN};
pub use scan::DirectiveScan;
pub use source::{GameBundle, GameSource, DEFAULT_ENTRY, ZIP_MAGIC};

/// Compiles an opened game bundle into its manifest
///
/// Reads the entry shader, inlines imports (the entry itself counts as
/// already imported), and runs the full preprocessing pipeline.
pub fn preprocess_game(bundle: &GameBundle) -> Result<GameManifest, DialectError> {
    let entry_text = bundle.entry_text()?;
    let mut preprocessor = Preprocessor::new(&bundle.source);
    preprocessor.mark_imported(&bundle.entry);
    preprocessor.preprocess(&entry_text)
}

/// Opens and compiles a game from a filesystem path
pub fn load_game(path: &std::path::Path) -> Result<GameManifest, DialectError> {
    let bundle = GameBundle::open(path)?;
    preprocess_game(&bundle)
}
