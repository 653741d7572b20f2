//! Dialect-to-WGSL preprocessing
//!
//! Drives the full compilation of a game source: `@import` inlining with
//! single inclusion, directive scanning, GameState layout, generated-header
//! emission, and textual rewriting of every directive into the generated
//! identifiers. The output is a [`GameManifest`] whose `generated_wgsl`
//! compiles as standard WGSL against the bindings the host allocates from
//! the same manifest.
//!
//! Rewrites are textual, anchored on the full directive token including its
//! quoted argument. WGSL itself never uses `@` in expression position, so a
//! directive lexeme cannot collide with real code.

use crate::error::DialectError;
use crate::keys::{OSC_SLOT_COUNT, WGSL_BUTTON_CONSTANTS, WGSL_KEY_CONSTANTS};
use crate::layout::StateLayout;
use crate::manifest::GameManifest;
use crate::scan::DirectiveScan;
use crate::source::GameSource;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;

/// Title used when a game has no `@set_title`
pub const DEFAULT_TITLE: &str = "WGSL Game";
/// Framebuffer width used when a game has no (valid) `@set_size`
pub const DEFAULT_WIDTH: u32 = 800;
/// Framebuffer height used when a game has no (valid) `@set_size`
pub const DEFAULT_HEIGHT: u32 = 600;
/// Fixed element count of every `@str` literal
pub const STR_ARRAY_LEN: usize = 128;

/// One-shot compiler from dialect source to manifest + standard WGSL
pub struct Preprocessor<'a> {
    source: &'a GameSource,
    imported: HashSet<String>,
}

impl<'a> Preprocessor<'a> {
    /// Creates a preprocessor reading imports from `source`
    pub fn new(source: &'a GameSource) -> Self {
        Self {
            source,
            imported: HashSet::new(),
        }
    }

    /// Marks a path as already imported
    ///
    /// Used for the entry file itself, so a helper that imports the entry
    /// back does not duplicate it.
    pub fn mark_imported(&mut self, path: &str) {
        self.imported.insert(path.to_string());
    }

    /// Compiles a top-level source into a manifest
    pub fn preprocess(mut self, top_level: &str) -> Result<GameManifest, DialectError> {
        let mut body = self.inline_imports(top_level.to_string())?;
        let scan = DirectiveScan::run(&body)?;

        // Pull the GameState struct out of the body; it is re-emitted at the
        // top of the generated header (possibly padded to the 16-byte floor).
        let state_re = Regex::new(r"struct\s+GameState\s*\{([^}]*)\}").unwrap();
        let state = match state_re.captures(&body) {
            Some(cap) => {
                let layout = StateLayout::parse(&cap[1])?;
                body = state_re.replace(&body, "").into_owned();
                layout
            }
            None => StateLayout::sentinel(),
        };

        // Window metadata is host-side only; erase the directives.
        body = Regex::new(r"@set_title\([^)]*\)[^\n]*").unwrap().replace_all(&body, "").into_owned();
        body = Regex::new(r"@set_size\([^)]*\)[^\n]*").unwrap().replace_all(&body, "").into_owned();

        let mut osc_params = scan.osc_params.clone();
        if osc_params.len() > OSC_SLOT_COUNT {
            tracing::warn!(
                "game declares {} OSC parameters but only {} slots exist; extras share slot {}",
                osc_params.len(),
                OSC_SLOT_COUNT,
                OSC_SLOT_COUNT - 1
            );
            osc_params.truncate(OSC_SLOT_COUNT);
        }

        let header = emit_header(&scan, &state);
        let body = rewrite_directives(body, &scan)?;
        let (width, height) = scan.size.unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        Ok(GameManifest {
            title: scan.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            width,
            height,
            textures: scan.textures,
            videos: scan.videos,
            cameras: scan.cameras,
            sounds: scan.sounds,
            models: scan.models,
            osc_params,
            game_state_size: state.padded_size,
            game_state_alignment: state.alignment,
            generated_wgsl: header + &body,
        })
    }

    /// Inlines every `@import("path")` depth-first, each file at most once
    ///
    /// The first occurrence of a path is replaced with the file's contents;
    /// later occurrences (including cyclic ones) become a comment. Inlined
    /// text is rescanned, so nested imports resolve before the importing
    /// file's remaining directives.
    fn inline_imports(&mut self, mut source: String) -> Result<String, DialectError> {
        let import_re = Regex::new(r#"@import\("([^"]+)"\)"#).unwrap();

        while let Some(cap) = import_re.captures(&source) {
            let token = cap.get(0).unwrap().as_str().to_string();
            let path = cap[1].to_string();

            let replacement = if self.imported.contains(&path) {
                format!("// Already imported: {path}")
            } else {
                self.imported.insert(path.clone());
                let imported = self.source.read_text(&path)?;
                format!("// Imported from {path}\n{imported}\n")
            };

            source = source.replacen(&token, &replacement, 1);
        }

        Ok(source)
    }
}

/// Emits the generated header: structs, constants and bindings
fn emit_header(scan: &DirectiveScan, state: &StateLayout) -> String {
    let mut header = String::new();
    header.push_str("// Preprocessed WGSL - generated from directives\n\n");

    // GameState, padded up to the 16-byte floor when needed so the WGSL
    // layout matches the bytes the host reserves.
    header.push_str("struct GameState {\n");
    for field in &state.fields {
        let _ = writeln!(header, "    {}: {},", field.name, field.wgsl_type());
    }
    for pad in 0..state.padding_words() {
        let _ = writeln!(header, "    _state_pad{pad}: u32,");
    }
    header.push_str("}\n\n");

    header.push_str("// Engine host struct that contains all engine state\n");
    header.push_str("struct GameEngineHost {\n");
    header.push_str("    buttons: array<i32, 12>, // virtual gamepad state (BTN_*)\n");
    header.push_str("    time: f32, // seconds since start\n");
    header.push_str("    delta_time: f32, // seconds since last frame\n");
    header.push_str("    screen_width: f32,\n");
    header.push_str("    screen_height: f32,\n");
    header.push_str("    mouse: vec4f, // xy = position, zw = last click, negated after release\n");
    header.push_str("    state: GameState, // game state that persists across frames\n");
    if !scan.sounds.is_empty() {
        let _ = writeln!(header, "    audio: array<u32, {}>, // audio trigger counters", scan.sounds.len());
    }
    let _ = writeln!(header, "    osc: array<f32, {OSC_SLOT_COUNT}>, // OSC float parameters: /u/name or /u/N");
    let _ = writeln!(header, "    keys: array<u32, {}>, // raw key state: 1 = down, indexed by KEY_*", crate::keys::KEY_COUNT);
    header.push_str("}\n\n");

    header.push_str("// Button constants for the gamepad buttons array\n");
    for (index, name) in WGSL_BUTTON_CONSTANTS.iter().enumerate() {
        let _ = writeln!(header, "const {name}: u32 = {index}u;");
    }
    header.push('\n');

    header.push_str("// Key constants for the raw key state array - same on every host\n");
    for (name, index) in WGSL_KEY_CONSTANTS {
        let _ = writeln!(header, "const {name}: u32 = {index}u;");
    }
    header.push('\n');

    header.push_str("// Bindings: group 0 = sampler + textures, group 1 = engine state\n");
    header.push_str("@group(0) @binding(0) var _engine_sampler: sampler;\n");
    let mut binding = 1u32;
    for (index, path) in scan.textures.iter().enumerate() {
        let _ = writeln!(header, "@group(0) @binding({binding}) var _texture_{index}: texture_2d<f32>; // {path}");
        binding += 1;
    }
    for (index, path) in scan.videos.iter().enumerate() {
        let _ = writeln!(header, "@group(0) @binding({binding}) var _video_{index}: texture_2d<f32>; // {path}");
        binding += 1;
    }
    for (index, device) in scan.cameras.iter().enumerate() {
        let _ = writeln!(header, "@group(0) @binding({binding}) var _camera_{index}: texture_2d<f32>; // camera {device}");
        binding += 1;
    }

    header.push_str("\n@group(1) @binding(0) var<storage, read_write> _engine: GameEngineHost;\n");

    if !scan.models.is_empty() {
        header.push_str("\n// Model data buffers\n");
        for (index, path) in scan.models.iter().enumerate() {
            let base = 1 + index * 2;
            let _ = writeln!(header, "struct Model{index}Positions {{ data: array<vec3f> }}");
            let _ = writeln!(header, "@group(2) @binding({base}) var<storage, read> _model_{index}_positions: Model{index}Positions; // {path}");
            let _ = writeln!(header, "struct Model{index}Normals {{ data: array<vec3f> }}");
            let _ = writeln!(header, "@group(2) @binding({}) var<storage, read> _model_{index}_normals: Model{index}Normals;", base + 1);
        }
    }

    header.push('\n');
    header
}

/// Rewrites every directive occurrence in the body to generated identifiers
fn rewrite_directives(mut body: String, scan: &DirectiveScan) -> Result<String, DialectError> {
    // Sounds: the .play()/.stop() forms must go before the bare legacy form,
    // which is a prefix of both.
    for (index, path) in scan.sounds.iter().enumerate() {
        let escaped = regex::escape(path);
        let play_re = Regex::new(&format!(r#"@sound\("{escaped}"\)\.play\(\)"#)).unwrap();
        body = play_re.replace_all(&body, format!("_engine.audio[{index}]++")).into_owned();

        let stop_re = Regex::new(&format!(r#"@sound\("{escaped}"\)\.stop\(\)"#)).unwrap();
        body = stop_re.replace_all(&body, format!("/* stop sound {index} - not implemented */")).into_owned();

        let bare_re = Regex::new(&format!(r#"@sound\("{escaped}"\)"#)).unwrap();
        body = bare_re.replace_all(&body, format!("_engine.audio[{index}]")).into_owned();
    }

    // Textures. @texture_index flattens to the slot number itself.
    for (index, path) in scan.textures.iter().enumerate() {
        let escaped = regex::escape(path);
        let index_re = Regex::new(&format!(r#"@texture_index\("{escaped}"\)"#)).unwrap();
        body = index_re.replace_all(&body, format!("{index}u")).into_owned();

        let texture_re = Regex::new(&format!(r#"@texture\("{escaped}"\)"#)).unwrap();
        body = texture_re.replace_all(&body, format!("_texture_{index}")).into_owned();
    }

    for (index, path) in scan.videos.iter().enumerate() {
        let escaped = regex::escape(path);
        let video_re = Regex::new(&format!(r#"@video\("{escaped}"\)"#)).unwrap();
        body = video_re.replace_all(&body, format!("_video_{index}")).into_owned();
    }

    for (index, device) in scan.cameras.iter().enumerate() {
        let camera_re = Regex::new(&format!(r"@camera\({device}\)")).unwrap();
        body = camera_re.replace_all(&body, format!("_camera_{index}")).into_owned();
    }

    // Models: member accessors first, then the bare form gets a usage hint.
    for (index, path) in scan.models.iter().enumerate() {
        let escaped = regex::escape(path);
        let positions_re = Regex::new(&format!(r#"@model\("{escaped}"\)\.positions"#)).unwrap();
        body = positions_re.replace_all(&body, format!("_model_{index}_positions.data")).into_owned();

        let normals_re = Regex::new(&format!(r#"@model\("{escaped}"\)\.normals"#)).unwrap();
        body = normals_re.replace_all(&body, format!("_model_{index}_normals.data")).into_owned();

        let bare_re = Regex::new(&format!(r#"@model\("{escaped}"\)"#)).unwrap();
        body = bare_re
            .replace_all(&body, format!("/* @model(\"{path}\") - use .positions or .normals */"))
            .into_owned();
    }

    // OSC: names resolve to their slot; overflow parameters share the last
    // slot rather than running off the array.
    for (index, name) in scan.osc_params.iter().enumerate() {
        let slot = index.min(OSC_SLOT_COUNT - 1);
        let escaped = regex::escape(name);
        let osc_re = Regex::new(&format!(r#"@osc\("{escaped}"\)"#)).unwrap();
        body = osc_re.replace_all(&body, format!("_engine.osc[{slot}]")).into_owned();
    }

    body = rewrite_str_literals(body);

    // Engine field access. Longer names first so a shorter field is never a
    // prefix match inside a longer one.
    body = body.replace("@engine.sampler", "_engine_sampler");
    for field in [
        "screen_height",
        "screen_width",
        "delta_time",
        "buttons",
        "mouse",
        "state",
        "audio",
        "keys",
        "time",
        "osc",
    ] {
        body = body.replace(&format!("@engine.{field}"), &format!("_engine.{field}"));
    }

    Ok(body)
}

/// Expands `@str("...")` into a fixed 128-element `u32` array literal
///
/// Literals longer than 128 characters are truncated; shorter ones are
/// zero-padded. Escapes `\n \r \t \" \\` are honored; any other backslash
/// sequence is kept verbatim.
fn rewrite_str_literals(body: String) -> String {
    let str_re = Regex::new(r#"@str\("((?:[^"\\]|\\.)*)"\)"#).unwrap();

    str_re
        .replace_all(&body, |cap: &regex::Captures<'_>| {
            let mut codes: Vec<u32> = unescape(&cap[1]).chars().map(|c| c as u32).collect();
            codes.truncate(STR_ARRAY_LEN);
            codes.resize(STR_ARRAY_LEN, 0);

            let list = codes.iter().map(|c| format!("{c}u")).collect::<Vec<_>>().join(", ");
            format!("array<u32, {STR_ARRAY_LEN}>({list})")
        })
        .into_owned()
}

/// Resolves the `@str` escape sequences in a single pass
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fmt::Write as _;

    fn archive(entries: &[(&str, &str)]) -> GameSource {
        GameSource::Archive(entries.iter().map(|(name, text)| (name.to_string(), text.as_bytes().to_vec())).collect::<HashMap<_, _>>())
    }

    fn preprocess(entries: &[(&str, &str)]) -> GameManifest {
        let source = archive(entries);
        let mut pre = Preprocessor::new(&source);
        pre.mark_imported("main.wgsl");
        let text = source.read_text("main.wgsl").unwrap();
        pre.preprocess(&text).unwrap()
    }

    #[test]
    fn test_import_inlines_once() {
        let manifest = preprocess(&[
            ("main.wgsl", "@import(\"helpers.wgsl\")\n@import(\"helpers.wgsl\")\nfn f() {}"),
            ("helpers.wgsl", "fn helper() -> f32 { return 1.0; }"),
        ]);
        assert_eq!(manifest.generated_wgsl.matches("fn helper").count(), 1);
        assert!(manifest.generated_wgsl.contains("// Already imported: helpers.wgsl"));
    }

    #[test]
    fn test_import_cycle_is_cut() {
        let manifest = preprocess(&[
            ("main.wgsl", "@import(\"a.wgsl\")"),
            ("a.wgsl", "fn a() {}\n@import(\"b.wgsl\")"),
            ("b.wgsl", "fn b() {}\n@import(\"a.wgsl\")"),
        ]);
        assert_eq!(manifest.generated_wgsl.matches("fn a()").count(), 1);
        assert_eq!(manifest.generated_wgsl.matches("fn b()").count(), 1);
    }

    #[test]
    fn test_missing_import_reports_path() {
        let source = archive(&[("main.wgsl", "@import(\"missing.wgsl\")")]);
        let pre = Preprocessor::new(&source);
        match pre.preprocess("@import(\"missing.wgsl\")") {
            Err(DialectError::AssetNotFound { path }) => assert_eq!(path, "missing.wgsl"),
            other => panic!("expected AssetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_bob_demo_manifest() {
        let manifest = preprocess(&[(
            "main.wgsl",
            r#"
            @set_title("Bob-Bonker")
            @set_size(800, 600)
            @import("helpers.wgsl")
            struct GameState { player_pos: vec2f, player_vel: vec2f, at_edge: u32 }
            @compute @workgroup_size(1) fn update() {
                if @engine.buttons[BTN_RIGHT] == 1 { @engine.state.player_vel.x = 200.0; }
                @sound("bump.ogg").play();
            }
            @fragment fn fs_render() -> @location(0) vec4f {
                return textureSample(@texture("player.png"), @engine.sampler, vec2f(0.5));
            }
            "#,
        ), ("helpers.wgsl", "fn clamp01(v: f32) -> f32 { return clamp(v, 0.0, 1.0); }")]);

        assert_eq!(manifest.title, "Bob-Bonker");
        assert_eq!(manifest.width, 800);
        assert_eq!(manifest.game_state_size, 24);
        assert_eq!(manifest.game_state_alignment, 8);
        assert_eq!(manifest.textures, vec!["player.png"]);
        assert_eq!(manifest.sounds, vec!["bump.ogg"]);

        let wgsl = &manifest.generated_wgsl;
        assert!(wgsl.contains("@group(0) @binding(0) var _engine_sampler: sampler;"));
        assert!(wgsl.contains("@group(0) @binding(1) var _texture_0: texture_2d<f32>;"));
        assert!(wgsl.contains("_engine.audio[0]++"));
        assert!(wgsl.contains("_engine.state.player_vel.x"));
        assert!(wgsl.contains("textureSample(_texture_0, _engine_sampler"));
        assert!(!wgsl.contains("@set_title"));
        assert!(!wgsl.contains("@set_size"));
    }

    #[test]
    fn test_sentinel_state_keeps_offsets() {
        let manifest = preprocess(&[("main.wgsl", "fn f() {}")]);
        assert_eq!(manifest.game_state_size, 16);
        assert_eq!(manifest.game_state_alignment, 4);
        assert!(manifest.generated_wgsl.contains("_state_pad0"));
        assert!(manifest.generated_wgsl.contains("state: GameState"));
    }

    #[test]
    fn test_key_constant_for_a_is_nineteen() {
        let manifest = preprocess(&[("main.wgsl", "fn f() {}")]);
        assert!(manifest.generated_wgsl.contains("const KEY_A: u32 = 19u;"));
    }

    #[test]
    fn test_texture_index_rewrite() {
        let manifest = preprocess(&[(
            "main.wgsl",
            r#"let a = @texture_index("tiles.png"); let t = textureLoad(@texture("tiles.png"), vec2i(0), 0);"#,
        )]);
        assert!(manifest.generated_wgsl.contains("let a = 0u;"));
        assert!(manifest.generated_wgsl.contains("textureLoad(_texture_0,"));
    }

    #[test]
    fn test_model_accessors() {
        let manifest = preprocess(&[(
            "main.wgsl",
            r#"let p = @model("bunny.obj").positions[i]; let n = @model("bunny.obj").normals[i];"#,
        )]);
        assert!(manifest.generated_wgsl.contains("_model_0_positions.data[i]"));
        assert!(manifest.generated_wgsl.contains("_model_0_normals.data[i]"));
        assert!(manifest.generated_wgsl.contains("@group(2) @binding(1)"));
        assert!(manifest.generated_wgsl.contains("@group(2) @binding(2)"));
    }

    #[test]
    fn test_video_and_camera_bindings_follow_textures() {
        let manifest = preprocess(&[(
            "main.wgsl",
            r#"
            let a = textureSample(@texture("bg.png"), @engine.sampler, uv);
            let b = textureSample(@video("clip.gif"), @engine.sampler, uv);
            let c = textureSample(@camera(0), @engine.sampler, uv);
            "#,
        )]);
        let wgsl = &manifest.generated_wgsl;
        assert!(wgsl.contains("@group(0) @binding(1) var _texture_0"));
        assert!(wgsl.contains("@group(0) @binding(2) var _video_0"));
        assert!(wgsl.contains("@group(0) @binding(3) var _camera_0"));
    }

    #[test]
    fn test_str_literal_padding_and_escapes() {
        let manifest = preprocess(&[("main.wgsl", r#"let s = @str("Hi\n");"#)]);
        let wgsl = &manifest.generated_wgsl;
        assert!(wgsl.contains("array<u32, 128>(72u, 105u, 10u, 0u"));
    }

    #[test]
    fn test_str_literal_truncates_at_128() {
        let long = "x".repeat(200);
        let source = format!(r#"let s = @str("{long}");"#);
        let manifest = preprocess(&[("main.wgsl", source.as_str())]);
        let wgsl = &manifest.generated_wgsl;
        let literal = wgsl.split("array<u32, 128>(").nth(1).unwrap().split(')').next().unwrap();
        assert_eq!(literal.split(", ").count(), 128);
        assert!(literal.ends_with("120u"));
        assert!(!literal.contains(", 0u"));
    }

    #[test]
    fn test_osc_overflow_clamps_to_last_slot() {
        let mut body = String::new();
        for i in 0..65 {
            let _ = writeln!(body, "let v{i} = @osc(\"param{i}\");");
        }
        let manifest = preprocess(&[("main.wgsl", body.as_str())]);
        assert_eq!(manifest.osc_params.len(), 64);
        assert!(manifest.generated_wgsl.contains("let v63 = _engine.osc[63];"));
        assert!(manifest.generated_wgsl.contains("let v64 = _engine.osc[63];"));
    }

    #[test]
    fn test_output_has_no_remaining_directives() {
        let manifest = preprocess(&[(
            "main.wgsl",
            r#"
            @set_title("t")
            struct GameState { score: u32 }
            @compute @workgroup_size(1) fn update() {
                @sound("s.ogg").play();
                @engine.state.score = u32(@osc("level"));
            }
            "#,
        )]);
        let rescan = DirectiveScan::run(&manifest.generated_wgsl).unwrap();
        assert!(rescan.textures.is_empty());
        assert!(rescan.sounds.is_empty());
        assert!(rescan.osc_params.is_empty());
        assert!(rescan.title.is_none());

        // Rewriting the already-rewritten body is a no-op.
        let again = rewrite_directives(manifest.generated_wgsl.clone(), &rescan).unwrap();
        assert_eq!(again, manifest.generated_wgsl);
    }

    #[test]
    fn test_binding_order_is_deterministic() {
        let source = r#"
            fn a() { let t = textureLoad(@texture("first.png"), vec2i(0), 0); }
            fn b() { let t = textureLoad(@texture("second.png"), vec2i(0), 0); }
        "#;
        let first = preprocess(&[("main.wgsl", source)]);
        let second = preprocess(&[("main.wgsl", source)]);
        assert_eq!(first.textures, second.textures);
        assert_eq!(first.generated_wgsl, second.generated_wgsl);
    }
}
