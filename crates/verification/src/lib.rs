//! Verification harness for the wgslbox host-block contract
//!
//! The dialect crate computes byte offsets on the CPU; the WGSL compiler
//! computes them again on the GPU. This crate proves they agree by running
//! generated probe shaders on a headless device and reading the host block
//! back. Unit-testable pieces (probe construction, expected offsets) live
//! in the library; the GPU runs happen in the `verify_layout` binary.

pub mod layout_probe;
pub mod wgpu_helpers;

pub use layout_probe::{Expectation, LayoutProbe};
