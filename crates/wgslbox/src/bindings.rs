//! Bind group planning
//!
//! Turns a manifest into the three fixed bind-group layouts the generated
//! shader expects. The plan is pure data so the numbering scheme can be
//! tested without a GPU; [`BindingPlan::create_layouts`] materializes the
//! wgpu objects.
//!
//! - group 0 (fragment): binding 0 sampler, then static textures, video
//!   textures and camera textures in manifest order;
//! - group 1 (fragment + compute): the host block as read_write storage;
//! - group 2 (vertex + fragment, only with models): model `i` positions at
//!   binding `1 + 2i`, normals at `2 + 2i`.

use wgslbox_dialect::GameManifest;

/// Bind group layout entries for one game, prior to GPU materialization
#[derive(Debug)]
pub struct BindingPlan {
    /// Sampler + texture entries
    pub group0: Vec<wgpu::BindGroupLayoutEntry>,
    /// Host block entry
    pub group1: Vec<wgpu::BindGroupLayoutEntry>,
    /// Model buffer entries, absent when the game has no models
    pub group2: Option<Vec<wgpu::BindGroupLayoutEntry>>,
}

/// Materialized bind group layouts
pub struct BindGroupLayouts {
    pub group0: wgpu::BindGroupLayout,
    pub group1: wgpu::BindGroupLayout,
    pub group2: Option<wgpu::BindGroupLayout>,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn model_buffer_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl BindingPlan {
    /// Derives the binding plan for a manifest
    ///
    /// Binding numbers are a pure function of the manifest's ordered asset
    /// lists; the same game always produces the same plan.
    pub fn for_manifest(manifest: &GameManifest) -> Self {
        let mut group0 = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        for binding in 1..manifest.group0_binding_count() as u32 {
            group0.push(texture_entry(binding));
        }

        let group1 = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];

        let group2 = if manifest.models.is_empty() {
            None
        } else {
            let mut entries = Vec::with_capacity(manifest.models.len() * 2);
            for model in 0..manifest.models.len() as u32 {
                entries.push(model_buffer_entry(1 + model * 2));
                entries.push(model_buffer_entry(2 + model * 2));
            }
            Some(entries)
        };

        Self { group0, group1, group2 }
    }

    /// Creates the wgpu bind group layouts for this plan
    pub fn create_layouts(&self, device: &wgpu::Device) -> BindGroupLayouts {
        BindGroupLayouts {
            group0: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Textures Bind Group Layout"),
                entries: &self.group0,
            }),
            group1: device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Host Block Bind Group Layout"),
                entries: &self.group1,
            }),
            group2: self.group2.as_ref().map(|entries| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Model Buffers Bind Group Layout"),
                    entries,
                })
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(textures: usize, videos: usize, cameras: usize, models: usize) -> GameManifest {
        GameManifest {
            title: "t".to_string(),
            width: 800,
            height: 600,
            textures: (0..textures).map(|i| format!("t{i}.png")).collect(),
            videos: (0..videos).map(|i| format!("v{i}.gif")).collect(),
            cameras: (0..cameras as u32).collect(),
            sounds: Vec::new(),
            models: (0..models).map(|i| format!("m{i}.obj")).collect(),
            osc_params: Vec::new(),
            game_state_size: 16,
            game_state_alignment: 4,
            generated_wgsl: String::new(),
        }
    }

    #[test]
    fn test_bare_game_has_only_sampler_and_host_block() {
        let plan = BindingPlan::for_manifest(&manifest(0, 0, 0, 0));
        assert_eq!(plan.group0.len(), 1);
        assert!(matches!(plan.group0[0].ty, wgpu::BindingType::Sampler(_)));
        assert_eq!(plan.group1.len(), 1);
        assert!(plan.group2.is_none());
    }

    #[test]
    fn test_texture_bindings_are_contiguous() {
        let plan = BindingPlan::for_manifest(&manifest(2, 1, 1, 0));
        let bindings: Vec<u32> = plan.group0.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_host_block_visible_to_fragment_and_compute() {
        let plan = BindingPlan::for_manifest(&manifest(0, 0, 0, 0));
        assert_eq!(plan.group1[0].visibility, wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE);
        assert!(matches!(
            plan.group1[0].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                ..
            }
        ));
    }

    #[test]
    fn test_model_bindings_skip_zero() {
        let plan = BindingPlan::for_manifest(&manifest(0, 0, 0, 2));
        let bindings: Vec<u32> = plan.group2.unwrap().iter().map(|e| e.binding).collect();
        assert_eq!(bindings, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_model_buffers_are_read_only() {
        let plan = BindingPlan::for_manifest(&manifest(0, 0, 0, 1));
        for entry in plan.group2.unwrap() {
            assert_eq!(entry.visibility, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT);
            assert!(matches!(
                entry.ty,
                wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    ..
                }
            ));
        }
    }
}
