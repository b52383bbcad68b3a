//! Common utilities for render index integration tests.
//!
//! Provides an in-memory scene delegate and builders for the curve and image
//! plane scenes the suites sync.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use hydrant_core::{
    BasisCurvesTopology, CurveBasis, CurveType, CurveWrap, MeshTopology, PrimPath, Token, Value,
};
use hydrant_graphics::{Interpolation, RenderConfig, SceneDelegate};
use parking_lot::RwLock;

/// Route library logs to the test harness. Safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config with deterministic thread settings.
pub fn test_config() -> RenderConfig {
    RenderConfig {
        safe_mode: true,
        sync_threads: Some(4),
        ..RenderConfig::default()
    }
}

// ============================================================================
// Scene data
// ============================================================================

/// Authored data of one prim.
#[derive(Debug, Clone, Default)]
pub struct PrimData {
    pub curves: BasisCurvesTopology,
    pub mesh: MeshTopology,
    pub primvars: Vec<(Token, Interpolation, Value)>,
    pub refine_level: i32,
    pub hidden: bool,
    pub transform: Option<[f64; 16]>,
    pub extent: Option<[[f32; 3]; 2]>,
    /// Per instancer level, outermost last.
    pub instance_primvars: Vec<Vec<(Token, Value)>>,
}

impl PrimData {
    pub fn with_primvar(mut self, name: &str, interpolation: Interpolation, value: Value) -> Self {
        self.set_primvar(name, interpolation, value);
        self
    }

    /// Add or replace a primvar.
    pub fn set_primvar(&mut self, name: &str, interpolation: Interpolation, value: Value) {
        let name = Token::new(name);
        if let Some(entry) = self.primvars.iter_mut().find(|(n, _, _)| *n == name) {
            entry.1 = interpolation;
            entry.2 = value;
        } else {
            self.primvars.push((name, interpolation, value));
        }
    }
}

/// In-memory scene delegate that counts the calls the drivers make.
#[derive(Default)]
pub struct TestDelegate {
    prims: RwLock<HashMap<PrimPath, PrimData>>,
    topology_fetches: AtomicUsize,
    value_fetches: AtomicUsize,
}

impl TestDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prim(&self, path: &PrimPath, data: PrimData) {
        self.prims.write().insert(path.clone(), data);
    }

    /// Edit the data of an existing prim.
    pub fn update(&self, path: &PrimPath, f: impl FnOnce(&mut PrimData)) {
        if let Some(data) = self.prims.write().get_mut(path) {
            f(data);
        }
    }

    pub fn topology_fetch_count(&self) -> usize {
        self.topology_fetches.load(Ordering::Relaxed)
    }

    pub fn value_fetch_count(&self) -> usize {
        self.value_fetches.load(Ordering::Relaxed)
    }

    fn with<R: Default>(&self, id: &PrimPath, f: impl FnOnce(&PrimData) -> R) -> R {
        self.prims.read().get(id).map(f).unwrap_or_default()
    }
}

impl SceneDelegate for TestDelegate {
    fn basis_curves_topology(&self, id: &PrimPath) -> BasisCurvesTopology {
        self.topology_fetches.fetch_add(1, Ordering::Relaxed);
        self.with(id, |data| data.curves.clone())
    }

    fn mesh_topology(&self, id: &PrimPath) -> MeshTopology {
        self.topology_fetches.fetch_add(1, Ordering::Relaxed);
        self.with(id, |data| data.mesh.clone())
    }

    fn primvar_names(&self, id: &PrimPath, interpolation: Interpolation) -> Vec<Token> {
        self.with(id, |data| {
            data.primvars
                .iter()
                .filter(|(_, interp, _)| *interp == interpolation)
                .map(|(name, _, _)| name.clone())
                .collect()
        })
    }

    fn get(&self, id: &PrimPath, name: &Token) -> Value {
        self.value_fetches.fetch_add(1, Ordering::Relaxed);
        self.with(id, |data| {
            data.primvars
                .iter()
                .find(|(n, _, _)| n == name)
                .map(|(_, _, value)| value.clone())
                .unwrap_or_default()
        })
    }

    fn refine_level(&self, id: &PrimPath) -> i32 {
        self.with(id, |data| data.refine_level)
    }

    fn visible(&self, id: &PrimPath) -> bool {
        !self.with(id, |data| data.hidden)
    }

    fn transform(&self, id: &PrimPath) -> [f64; 16] {
        self.prims
            .read()
            .get(id)
            .and_then(|data| data.transform)
            .unwrap_or(hydrant_graphics::scene_delegate::IDENTITY)
    }

    fn extent(&self, id: &PrimPath) -> Option<[[f32; 3]; 2]> {
        self.with(id, |data| data.extent)
    }

    fn instancer_levels(&self, id: &PrimPath) -> usize {
        self.with(id, |data| data.instance_primvars.len())
    }

    fn instance_primvar_names(&self, id: &PrimPath, level: usize) -> Vec<Token> {
        self.with(id, |data| {
            data.instance_primvars
                .get(level)
                .map(|level| level.iter().map(|(name, _)| name.clone()).collect())
                .unwrap_or_default()
        })
    }

    fn instance_primvar(&self, id: &PrimPath, level: usize, name: &Token) -> Value {
        self.with(id, |data| {
            data.instance_primvars
                .get(level)
                .and_then(|level| level.iter().find(|(n, _)| n == name))
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
    }
}

// ============================================================================
// Scene builders
// ============================================================================

/// Linear curves with the given per-curve point counts.
pub fn linear_curves(counts: &[i32]) -> BasisCurvesTopology {
    BasisCurvesTopology::new(
        CurveType::Linear,
        CurveBasis::Bezier,
        CurveWrap::NonPeriodic,
        counts.to_vec(),
    )
}

/// Cubic curves with the given basis and per-curve point counts.
pub fn cubic_curves(basis: CurveBasis, counts: &[i32]) -> BasisCurvesTopology {
    BasisCurvesTopology::new(CurveType::Cubic, basis, CurveWrap::NonPeriodic, counts.to_vec())
}

/// `n` points along the x axis.
pub fn points(n: usize) -> Value {
    Value::Vec3fArray((0..n).map(|i| [i as f32, 0.0, 0.0]).collect())
}

/// A curve prim with points matching its topology and a constant color.
pub fn curve_prim(topology: BasisCurvesTopology) -> PrimData {
    let n = topology.calculate_needed_number_of_control_points();
    PrimData {
        curves: topology,
        ..PrimData::default()
    }
    .with_primvar("points", Interpolation::Vertex, points(n))
    .with_primvar(
        "displayColor",
        Interpolation::Constant,
        Value::Vec3fArray(vec![[1.0, 0.5, 0.0]]),
    )
}

/// A unit quad image plane with uvs.
pub fn image_plane_prim() -> PrimData {
    PrimData {
        mesh: MeshTopology::new(vec![4], vec![0, 1, 2, 3]),
        extent: Some([[-1.0, -1.0, 0.0], [1.0, 1.0, 0.0]]),
        ..PrimData::default()
    }
    .with_primvar(
        "points",
        Interpolation::Vertex,
        Value::Vec3fArray(vec![
            [-1.0, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ]),
    )
    .with_primvar(
        "uv",
        Interpolation::Varying,
        Value::Vec2fArray(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
    )
}

/// Decode a staged `f32` buffer.
pub fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Decode a staged `i32` buffer.
pub fn ints(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
