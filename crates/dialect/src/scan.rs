//! Directive scanning
//!
//! Pulls the `@`-prefixed directive families out of a fully inlined source
//! and records every referenced asset in first-occurrence order. The order
//! matters: an asset's position in its list becomes its binding slot, so
//! the scan is the single point that fixes binding numbers.

use crate::error::DialectError;
use regex::Regex;

/// Everything the scanner extracts from one inlined source
#[derive(Debug, Default)]
pub struct DirectiveScan {
    /// `@set_title("...")` payload, if present
    pub title: Option<String>,
    /// `@set_size(w, h)` payload, if present and well formed
    pub size: Option<(u32, u32)>,
    /// Static texture paths, deduplicated, first occurrence first
    pub textures: Vec<String>,
    /// Video paths, deduplicated, first occurrence first
    pub videos: Vec<String>,
    /// Camera device indices, deduplicated and sorted ascending
    pub cameras: Vec<u32>,
    /// Sound paths, deduplicated, first occurrence first
    pub sounds: Vec<String>,
    /// Model paths, deduplicated, first occurrence first
    pub models: Vec<String>,
    /// OSC parameter names, deduplicated, first occurrence first
    pub osc_params: Vec<String>,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

impl DirectiveScan {
    /// Scans `source` for every directive family except `@import`
    ///
    /// Imports must already be inlined; anything an imported file references
    /// is collected here exactly like top-level references.
    pub fn run(source: &str) -> Result<Self, DialectError> {
        let mut scan = Self::default();

        if let Some(cap) = Regex::new(r#"@set_title\("([^"]+)"\)"#).unwrap().captures(source) {
            scan.title = Some(cap[1].to_string());
        }

        if let Some(cap) = Regex::new(r"@set_size\((\d+)\s*,\s*(\d+)\)").unwrap().captures(source) {
            let width = cap[1].parse().map_err(|_| DialectError::Syntax {
                message: format!("@set_size width out of range: {}", &cap[1]),
            })?;
            let height = cap[2].parse().map_err(|_| DialectError::Syntax {
                message: format!("@set_size height out of range: {}", &cap[2]),
            })?;
            scan.size = Some((width, height));
        } else if source.contains("@set_size(") {
            tracing::warn!("malformed @set_size directive, falling back to 800x600");
        }

        // One pass over both texture forms: @texture_index() loads the
        // texture just like @texture() does, and whichever form appears
        // first in the source fixes the slot.
        for cap in Regex::new(r#"@texture(?:_index)?\("([^"]+)"\)"#).unwrap().captures_iter(source) {
            push_unique(&mut scan.textures, cap[1].to_string());
        }

        for cap in Regex::new(r#"@video\("([^"]+)"\)"#).unwrap().captures_iter(source) {
            push_unique(&mut scan.videos, cap[1].to_string());
        }

        for cap in Regex::new(r"@camera\((\d+)\)").unwrap().captures_iter(source) {
            let index: u32 = cap[1].parse().map_err(|_| DialectError::Syntax {
                message: format!("@camera index out of range: {}", &cap[1]),
            })?;
            push_unique(&mut scan.cameras, index);
        }
        scan.cameras.sort_unstable();

        for cap in Regex::new(r#"@sound\("([^"]+)"\)"#).unwrap().captures_iter(source) {
            push_unique(&mut scan.sounds, cap[1].to_string());
        }

        for cap in Regex::new(r#"@model\("([^"]+)"\)"#).unwrap().captures_iter(source) {
            push_unique(&mut scan.models, cap[1].to_string());
        }

        for cap in Regex::new(r#"@osc\("([^"]+)"\)"#).unwrap().captures_iter(source) {
            push_unique(&mut scan.osc_params, cap[1].to_string());
        }

        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins_slot_order() {
        let scan = DirectiveScan::run(
            r#"
            let a = textureLoad(@texture("b.png"), xy, 0);
            let b = textureLoad(@texture("a.png"), xy, 0);
            let c = textureLoad(@texture("b.png"), xy, 0);
            "#,
        )
        .unwrap();
        assert_eq!(scan.textures, vec!["b.png", "a.png"]);
    }

    #[test]
    fn test_texture_index_registers_the_texture() {
        let scan = DirectiveScan::run(r#"let i = @texture_index("tiles.png");"#).unwrap();
        assert_eq!(scan.textures, vec!["tiles.png"]);
    }

    #[test]
    fn test_mixed_texture_forms_keep_source_order() {
        // An @texture_index above an @texture must claim the earlier slot.
        let scan = DirectiveScan::run(
            r#"
            let i = @texture_index("tiles.png");
            let a = textureLoad(@texture("player.png"), xy, 0);
            let t = textureLoad(@texture("tiles.png"), xy, 0);
            "#,
        )
        .unwrap();
        assert_eq!(scan.textures, vec!["tiles.png", "player.png"]);
    }

    #[test]
    fn test_sound_forms_collect_one_entry() {
        let scan = DirectiveScan::run(
            r#"
            @sound("bump.ogg").play();
            @sound("bump.ogg").stop();
            let n = @sound("bump.ogg");
            "#,
        )
        .unwrap();
        assert_eq!(scan.sounds, vec!["bump.ogg"]);
    }

    #[test]
    fn test_cameras_are_sorted() {
        let scan = DirectiveScan::run("let a = textureLoad(@camera(2), xy, 0); let b = textureLoad(@camera(0), xy, 0);").unwrap();
        assert_eq!(scan.cameras, vec![0, 2]);
    }

    #[test]
    fn test_title_and_size() {
        let scan = DirectiveScan::run("@set_title(\"Bob-Bonker\")\n@set_size(800, 600)\n").unwrap();
        assert_eq!(scan.title.as_deref(), Some("Bob-Bonker"));
        assert_eq!(scan.size, Some((800, 600)));
    }

    #[test]
    fn test_malformed_size_falls_back() {
        let scan = DirectiveScan::run("@set_size(800)\n").unwrap();
        assert_eq!(scan.size, None);
    }

    #[test]
    fn test_osc_params_in_order() {
        let scan = DirectiveScan::run(r#"let a = @osc("bass"); let b = @osc("treble"); let c = @osc("bass");"#).unwrap();
        assert_eq!(scan.osc_params, vec!["bass", "treble"]);
    }
}
