//! Host-block layout verification runner
//!
//! Runs the layout probe over a set of representative GameState shapes and
//! reports, per case, whether every sentinel the shader wrote landed at the
//! byte offset the calculator predicted. Exits non-zero on any mismatch.

use wgslbox_verification::{wgpu_helpers, LayoutProbe};

/// One probe configuration
struct Case {
    name: &'static str,
    state_body: Option<&'static str>,
    sound_count: usize,
}

const CASES: &[Case] = &[
    Case {
        name: "no state, no sounds",
        state_body: None,
        sound_count: 0,
    },
    Case {
        name: "player state with one sound",
        state_body: Some("player_pos: vec2f, player_vel: vec2f, at_edge: u32"),
        sound_count: 1,
    },
    Case {
        name: "snake arrays",
        state_body: Some("snake_x: array<i32, 400>, snake_y: array<i32, 400>, snake_len: u32, direction: i32"),
        sound_count: 2,
    },
    Case {
        name: "vec3 after scalar",
        state_body: Some("t: f32, axis: vec3f, colors: array<vec4f, 3>"),
        sound_count: 0,
    },
    Case {
        name: "small state padded to floor",
        state_body: Some("score: f32"),
        sound_count: 3,
    },
    Case {
        name: "mixed vectors",
        state_body: Some("a: vec2f, b: f32, c: vec2f, d: array<vec3f, 5>, e: i32"),
        sound_count: 0,
    },
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (device, queue) = wgpu_helpers::create_headless_device()?;

    let mut failures = 0usize;
    for case in CASES {
        let probe = LayoutProbe::build(case.state_body, case.sound_count)?;
        let layout = probe.manifest.host_layout();
        let mismatches = probe.run(&device, &queue)?;

        if mismatches.is_empty() {
            println!(
                "PASS {} (state {} bytes, total {} bytes, {} sentinels)",
                case.name,
                probe.manifest.game_state_size,
                layout.total_size,
                probe.expectations.len()
            );
        } else {
            failures += 1;
            println!("FAIL {}", case.name);
            for mismatch in &mismatches {
                println!("  {mismatch}");
            }
        }
    }

    if failures > 0 {
        println!("{failures} of {} cases failed", CASES.len());
        std::process::exit(1);
    }

    println!("all {} cases passed", CASES.len());
    Ok(())
}
