//! std430 layout calculation
//!
//! The engine and the shader share one storage buffer (the host block), so
//! the byte offsets computed here must match the offsets the WGSL compiler
//! assigns to the generated `GameEngineHost` struct exactly. Field offsets
//! are therefore derived with the real std430 rules — every field rounded up
//! to its own alignment — rather than a plain size sum, which diverges as
//! soon as a `vec3f` follows a scalar.

use crate::error::DialectError;
use crate::keys::{KEY_COUNT, OSC_SLOT_COUNT};
use regex::Regex;

/// Rounds `value` up to the next multiple of `alignment`
pub fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Field types recognized inside a `GameState` struct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U32,
    I32,
    F32,
    Vec2f,
    Vec3f,
    Vec4f,
}

impl FieldType {
    /// Parses a WGSL type name
    ///
    /// Accepts both the shorthand (`vec2f`) and the generic (`vec2<f32>`)
    /// spellings; the emitted struct always uses the shorthand.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.as_str() {
            "u32" => Some(Self::U32),
            "i32" => Some(Self::I32),
            "f32" => Some(Self::F32),
            "vec2f" | "vec2<f32>" => Some(Self::Vec2f),
            "vec3f" | "vec3<f32>" => Some(Self::Vec3f),
            "vec4f" | "vec4<f32>" => Some(Self::Vec4f),
            _ => None,
        }
    }

    /// Size in bytes under std430
    pub fn size(self) -> usize {
        match self {
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::Vec2f => 8,
            Self::Vec3f => 12,
            Self::Vec4f => 16,
        }
    }

    /// Alignment in bytes under std430
    pub fn alignment(self) -> usize {
        match self {
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::Vec2f => 8,
            Self::Vec3f | Self::Vec4f => 16,
        }
    }

    /// Element stride when used in a fixed-size array
    ///
    /// `vec3f` elements pad out to 16 bytes; everything else is dense.
    pub fn array_stride(self) -> usize {
        align_to(self.size(), self.alignment())
    }

    /// The WGSL spelling of this type
    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::Vec2f => "vec2f",
            Self::Vec3f => "vec3f",
            Self::Vec4f => "vec4f",
        }
    }
}

/// One field of the user's `GameState` struct, with its resolved offset
#[derive(Debug, Clone)]
pub struct StateField {
    /// Field name as written
    pub name: String,
    /// Element type
    pub ty: FieldType,
    /// `Some(n)` for `array<T, n>` fields
    pub count: Option<u32>,
    /// Byte offset from the start of the struct
    pub offset: usize,
}

impl StateField {
    /// Size of the field in bytes
    pub fn size(&self) -> usize {
        match self.count {
            Some(n) => self.ty.array_stride() * n as usize,
            None => self.ty.size(),
        }
    }

    /// Alignment requirement of the field
    pub fn alignment(&self) -> usize {
        self.ty.alignment()
    }

    /// The WGSL spelling of the field's type
    pub fn wgsl_type(&self) -> String {
        match self.count {
            Some(n) => format!("array<{}, {}>", self.ty.wgsl_name(), n),
            None => self.ty.wgsl_name().to_string(),
        }
    }
}

/// Resolved layout of a `GameState` struct
#[derive(Debug, Clone)]
pub struct StateLayout {
    /// Fields in declaration order with resolved offsets
    pub fields: Vec<StateField>,
    /// Struct alignment (max member alignment, min 4)
    pub alignment: usize,
    /// Byte just past the last member, before any rounding
    pub raw_end: usize,
    /// std430 struct size: `raw_end` rounded up to the struct alignment
    pub size: usize,
    /// Bytes the host block reserves for the state: `max(16, size)`
    pub padded_size: usize,
}

impl StateLayout {
    /// Parses the body of a `struct GameState { ... }` declaration
    ///
    /// `body` is the text between the braces. Unknown field types are a
    /// syntax error; the downstream compiler could not lay them out either
    /// way, and silently guessing a size would corrupt every later offset.
    pub fn parse(body: &str) -> Result<Self, DialectError> {
        let field_re = Regex::new(r"(\w+)\s*:\s*(array\s*<\s*(\w+(?:\s*<\s*\w+\s*>)?)\s*,\s*(\d+)\s*>|\w+(?:\s*<\s*\w+\s*>)?)").unwrap();

        // Strip line comments so a commented-out field does not get laid out.
        let stripped: String = body.lines().map(|line| line.split("//").next().unwrap_or("")).collect::<Vec<_>>().join("\n");

        let mut fields = Vec::new();
        let mut alignment = 4usize;
        let mut cursor = 0usize;

        for cap in field_re.captures_iter(&stripped) {
            let name = cap[1].to_string();
            let (ty, count) = if let Some(element) = cap.get(3) {
                let count: u32 = cap[4].parse().map_err(|_| DialectError::Syntax {
                    message: format!("invalid array length for GameState field `{name}`"),
                })?;
                let ty = FieldType::parse(element.as_str()).ok_or_else(|| DialectError::Syntax {
                    message: format!("unsupported array element type `{}` for GameState field `{name}`", element.as_str()),
                })?;
                (ty, Some(count))
            } else {
                let ty = FieldType::parse(&cap[2]).ok_or_else(|| DialectError::Syntax {
                    message: format!("unsupported type `{}` for GameState field `{name}`", &cap[2]),
                })?;
                (ty, None)
            };

            let offset = align_to(cursor, ty.alignment());
            let field = StateField { name, ty, count, offset };
            cursor = offset + field.size();
            alignment = alignment.max(ty.alignment());
            fields.push(field);
        }

        let size = align_to(cursor, alignment);
        Ok(Self {
            fields,
            alignment,
            raw_end: cursor,
            size,
            padded_size: size.max(16),
        })
    }

    /// The sentinel layout used when no `GameState` struct exists
    ///
    /// 16 bytes of padding keep the `state` field — and everything after
    /// it — at the same offsets whether or not a game declares state.
    pub fn sentinel() -> Self {
        Self {
            fields: Vec::new(),
            alignment: 4,
            raw_end: 0,
            size: 0,
            padded_size: 16,
        }
    }

    /// Number of `u32` padding fields the emitted struct needs
    ///
    /// Non-zero only when the natural std430 size falls below the 16-byte
    /// floor; the pads make the WGSL struct agree with [`Self::padded_size`].
    pub fn padding_words(&self) -> usize {
        if self.size < 16 {
            (16 - self.raw_end) / 4
        } else {
            0
        }
    }
}

/// Byte offset of `buttons[12]` in the host block
pub const BUTTONS_OFFSET: usize = 0;
/// Byte offset of `time`
pub const TIME_OFFSET: usize = 48;
/// Byte offset of `delta_time`
pub const DELTA_TIME_OFFSET: usize = 52;
/// Byte offset of `screen_width`
pub const SCREEN_WIDTH_OFFSET: usize = 56;
/// Byte offset of `screen_height`
pub const SCREEN_HEIGHT_OFFSET: usize = 60;
/// Byte offset of `mouse`
pub const MOUSE_OFFSET: usize = 64;
/// Byte offset of the user state; constant regardless of the state's shape
pub const STATE_OFFSET: usize = 80;

/// Byte length of the volatile prefix (buttons through mouse)
pub const PREFIX_SIZE: usize = STATE_OFFSET;

/// Region offsets of one concrete host block
///
/// Everything below `state` is fixed; the audio, OSC and key regions float
/// behind the state size and sound count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostLayout {
    /// Bytes reserved for the user state (already padded, >= 16)
    pub state_size: usize,
    /// Number of `u32` audio trigger counters
    pub sound_count: usize,
    /// Byte offset of `audio[sound_count]`
    pub audio_offset: usize,
    /// Byte offset of `osc[64]`
    pub osc_offset: usize,
    /// Byte offset of `keys[194]`
    pub keys_offset: usize,
    /// Total buffer size, rounded up to a multiple of 16
    pub total_size: usize,
}

impl HostLayout {
    /// Computes the region offsets for a given state size and sound count
    pub fn new(state_size: usize, sound_count: usize) -> Self {
        let audio_offset = STATE_OFFSET + state_size;
        let osc_offset = audio_offset + 4 * sound_count;
        let keys_offset = osc_offset + 4 * OSC_SLOT_COUNT;
        let total_size = align_to(keys_offset + 4 * KEY_COUNT, 16);
        Self {
            state_size,
            sound_count,
            audio_offset,
            osc_offset,
            keys_offset,
            total_size,
        }
    }

    /// Byte length of the audio counter region
    pub fn audio_size(&self) -> usize {
        4 * self.sound_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_sizes_and_alignments() {
        assert_eq!(FieldType::Vec3f.size(), 12);
        assert_eq!(FieldType::Vec3f.alignment(), 16);
        assert_eq!(FieldType::Vec3f.array_stride(), 16);
        assert_eq!(FieldType::Vec2f.array_stride(), 8);
        assert_eq!(FieldType::U32.array_stride(), 4);
    }

    #[test]
    fn test_player_state_layout() {
        // vec2f + vec2f + u32: offsets 0/8/16, natural size 20, rounds to 24.
        let layout = StateLayout::parse("player_pos: vec2f, player_vel: vec2f, at_edge: u32").unwrap();
        assert_eq!(layout.fields[0].offset, 0);
        assert_eq!(layout.fields[1].offset, 8);
        assert_eq!(layout.fields[2].offset, 16);
        assert_eq!(layout.alignment, 8);
        assert_eq!(layout.size, 24);
        assert_eq!(layout.padded_size, 24);
        assert_eq!(layout.padding_words(), 0);
    }

    #[test]
    fn test_vec3_after_scalar_gets_aligned() {
        // The vec3f must start at 16, not 4.
        let layout = StateLayout::parse("a: f32, b: vec3f").unwrap();
        assert_eq!(layout.fields[1].offset, 16);
        assert_eq!(layout.raw_end, 28);
        assert_eq!(layout.size, 32);
    }

    #[test]
    fn test_large_arrays() {
        let layout = StateLayout::parse(
            "snake_x: array<i32, 400>,
             snake_y: array<i32, 400>,
             snake_len: u32,
             direction: i32",
        )
        .unwrap();
        assert_eq!(layout.fields[1].offset, 1600);
        assert_eq!(layout.fields[2].offset, 3200);
        assert_eq!(layout.size, 3208);
    }

    #[test]
    fn test_vec3_array_uses_sixteen_byte_stride() {
        let layout = StateLayout::parse("points: array<vec3f, 4>").unwrap();
        assert_eq!(layout.fields[0].size(), 64);
        assert_eq!(layout.alignment, 16);
        assert_eq!(layout.size, 64);
    }

    #[test]
    fn test_small_state_is_padded_to_sixteen() {
        let layout = StateLayout::parse("score: f32").unwrap();
        assert_eq!(layout.size, 4);
        assert_eq!(layout.padded_size, 16);
        assert_eq!(layout.padding_words(), 3);
    }

    #[test]
    fn test_sentinel_layout() {
        let layout = StateLayout::sentinel();
        assert_eq!(layout.padded_size, 16);
        assert_eq!(layout.alignment, 4);
        assert_eq!(layout.padding_words(), 4);
    }

    #[test]
    fn test_commented_fields_are_skipped() {
        let layout = StateLayout::parse("a: f32, // b: vec4f,\n c: f32").unwrap();
        assert_eq!(layout.fields.len(), 2);
        assert_eq!(layout.fields[1].name, "c");
        assert_eq!(layout.fields[1].offset, 4);
    }

    #[test]
    fn test_generic_vector_spelling() {
        let layout = StateLayout::parse("pos: vec2<f32>, dirs: array<vec3<f32>, 2>").unwrap();
        assert_eq!(layout.fields[0].ty, FieldType::Vec2f);
        assert_eq!(layout.fields[1].offset, 16);
        assert_eq!(layout.fields[1].size(), 32);
        assert_eq!(layout.fields[1].wgsl_type(), "array<vec3f, 2>");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(StateLayout::parse("m: mat4x4f").is_err());
        assert!(StateLayout::parse("m: array<mat4x4f, 2>").is_err());
    }

    #[test]
    fn test_host_layout_empty_state() {
        // 80 prefix + 16 state + 0 audio + 256 osc + 776 keys = 1128 -> 1136.
        let layout = HostLayout::new(16, 0);
        assert_eq!(layout.audio_offset, 96);
        assert_eq!(layout.osc_offset, 96);
        assert_eq!(layout.keys_offset, 352);
        assert_eq!(layout.total_size, 1136);
        assert_eq!(layout.total_size % 16, 0);
    }

    #[test]
    fn test_host_layout_with_state_and_sound() {
        // 24-byte state, one sound: audio at 104, osc at 108.
        let layout = HostLayout::new(24, 1);
        assert_eq!(layout.audio_offset, 104);
        assert_eq!(layout.osc_offset, 108);
        assert_eq!(layout.keys_offset, 364);
        assert_eq!(layout.total_size % 16, 0);
    }
}
