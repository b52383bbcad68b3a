//! # Hydrant Graphics
//!
//! Render index core: decides what must be recomputed when scene data
//! changes and shares the resulting GPU-side resources between primitives.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`ChangeTracker`] - per-rprim [`DirtyBits`] and pass-level flags
//! - [`ResourceRegistry`] - instance tables sharing topologies, index ranges
//!   and geometric shaders by content id, plus the buffer source queue
//! - [`BasisCurves`] and [`ImagePlane`] - rprim sync drivers
//! - [`RenderIndex`] - owns rprims and syncs them, in parallel for large passes
//!
//! ## Example
//!
//! ```ignore
//! use hydrant_graphics::{RenderConfig, RenderIndex, RprimKind};
//! use hydrant_core::{PrimPath, tokens};
//!
//! let index = RenderIndex::new(RenderConfig::from_env());
//! index.insert_rprim(RprimKind::BasisCurves, PrimPath::new("/hair"))?;
//! index.sync_all(&delegate, &tokens::REFINED);
//! index.resource_registry().commit();
//! ```

pub mod basis_curves;
pub mod buffer;
pub mod change_tracker;
pub mod computations;
pub mod config;
pub mod dirty;
pub mod draw_item;
pub mod error;
pub mod image_plane;
pub mod instance;
pub mod render_index;
pub mod repr;
pub mod resource_registry;
pub mod rprim;
pub mod scene_delegate;
pub mod shader_key;

// Re-export main types for convenience
pub use basis_curves::BasisCurves;
pub use buffer::{BufferArrayRange, BufferSource, BufferSourceHandle, BufferSpec};
pub use change_tracker::ChangeTracker;
pub use config::RenderConfig;
pub use dirty::{ALL_SCENE_DIRTY_BITS, CLEAN, CustomBitAllocator, DirtyBits};
pub use draw_item::{DrawItem, DrawingCoord, RprimSharedData};
pub use error::{GraphicsError, Result};
pub use image_plane::ImagePlane;
pub use instance::{InstanceGuard, InstanceRegistry};
pub use render_index::{RenderIndex, RprimKind, SyncStats};
pub use repr::{
    BasisCurvesGeomStyle, BasisCurvesReprDesc, ImagePlaneGeomStyle, ImagePlaneReprDesc, Repr,
    ReprConfigs,
};
pub use resource_registry::{CommitStats, ResourceRegistry};
pub use rprim::{Rprim, SyncContext};
pub use scene_delegate::{Interpolation, SceneDelegate};
pub use shader_key::{GeometricShader, GeometricShaderKey, PrimitiveType};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version. Call once at startup.
pub fn init() {
    log::info!("Hydrant Graphics v{} initialized", VERSION);
}
