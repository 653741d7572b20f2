//! End-to-end preprocessing of complete game bundles: a zip archive built
//! in memory, and the demo games shipped in `games/`.

use std::io::Write as _;
use std::path::Path;
use wgslbox_dialect::{load_game, preprocess_game, GameBundle, GameSource};

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, text) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(text.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn archive_game_preprocesses_end_to_end() {
    let bytes = zip_bytes(&[
        (
            "main.wgsl",
            r#"
            @set_title("Zipped")
            @set_size(320, 240)
            @import("math.wgsl")
            struct GameState { score: u32, cooldown: f32 }
            @compute @workgroup_size(1) fn update() {
                @engine.state.cooldown -= @engine.delta_time;
                if @engine.buttons[BTN_A] == 1 && @engine.state.cooldown <= 0.0 {
                    @engine.state.score += reward();
                    @engine.state.cooldown = 0.5;
                    @sound("coin.wav").play();
                }
            }
            @vertex fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4f {
                return vec4f(0.0, 0.0, 0.0, 1.0);
            }
            @fragment fn fs_render() -> @location(0) vec4f {
                return textureSample(@texture("hud.png"), @engine.sampler, vec2f(0.5));
            }
            "#,
        ),
        ("math.wgsl", "fn reward() -> u32 { return 10u; }"),
    ]);

    let bundle = GameBundle {
        source: GameSource::from_bytes(bytes).unwrap(),
        entry: "main.wgsl".to_string(),
    };
    let manifest = preprocess_game(&bundle).unwrap();

    assert_eq!(manifest.title, "Zipped");
    assert_eq!((manifest.width, manifest.height), (320, 240));
    assert_eq!(manifest.textures, vec!["hud.png"]);
    assert_eq!(manifest.sounds, vec!["coin.wav"]);
    // u32 + f32 = 8 bytes, padded up to the 16-byte floor.
    assert_eq!(manifest.game_state_size, 16);

    let wgsl = &manifest.generated_wgsl;
    assert_eq!(wgsl.matches("fn reward").count(), 1);
    assert!(wgsl.contains("_engine.state.score += reward();"));
    assert!(wgsl.contains("_engine.audio[0]++"));
    assert!(wgsl.contains("@group(0) @binding(1) var _texture_0"));
}

fn games_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../games")
}

#[test]
fn shipped_bob_demo_preprocesses() {
    let manifest = load_game(&games_dir().join("bob")).unwrap();

    assert_eq!(manifest.title, "Bob-Bonker");
    assert_eq!((manifest.width, manifest.height), (800, 600));
    assert_eq!(manifest.textures, vec!["player.png"]);
    assert_eq!(manifest.sounds, vec!["bump.wav"]);
    assert_eq!(manifest.game_state_size, 24);
    assert_eq!(manifest.game_state_alignment, 8);
    assert_eq!(manifest.generated_wgsl.matches("fn clamp_to_screen").count(), 1);
}

#[test]
fn shipped_cube_demo_preprocesses() {
    let manifest = load_game(&games_dir().join("cube")).unwrap();

    assert_eq!(manifest.models, vec!["cube.obj"]);
    assert!(manifest.generated_wgsl.contains("_model_0_positions.data[index]"));
    assert!(manifest.generated_wgsl.contains("_model_0_normals.data[index]"));
    assert!(manifest.generated_wgsl.contains("@group(2) @binding(1)"));
}

#[test]
fn shipped_plasma_demo_preprocesses() {
    let manifest = load_game(&games_dir().join("plasma.wgsl")).unwrap();

    assert_eq!(manifest.title, "Plasma");
    assert!(manifest.textures.is_empty());
    assert_eq!(manifest.osc_params, vec!["speed", "zoom"]);
    assert_eq!(manifest.game_state_size, 16);
    assert!(manifest.generated_wgsl.contains("_engine.osc[0]"));
    assert!(manifest.generated_wgsl.contains("_engine.osc[1]"));
}
