use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use hydrant_core::{
    BasisCurvesTopology, CurveBasis, CurveType, CurveWrap, MeshTopology, PrimPath, Token, Value,
    tokens,
};
use hydrant_graphics::{
    DirtyBits, InstanceRegistry, Interpolation, RenderConfig, RenderIndex, RprimKind,
    SceneDelegate,
};

const POINTS_PER_CURVE: i32 = 8;

/// Every prim is a small bundle of identical hair strands.
struct HairDelegate {
    topology: BasisCurvesTopology,
    points: Value,
    widths: Value,
}

impl HairDelegate {
    fn new(strands: usize) -> Self {
        let topology = BasisCurvesTopology::new(
            CurveType::Cubic,
            CurveBasis::CatmullRom,
            CurveWrap::NonPeriodic,
            vec![POINTS_PER_CURVE; strands],
        );
        let n = topology.calculate_needed_number_of_control_points();
        Self {
            topology,
            points: Value::Vec3fArray((0..n).map(|i| [i as f32, 0.0, 0.0]).collect()),
            widths: Value::FloatArray(vec![0.01; n]),
        }
    }
}

impl SceneDelegate for HairDelegate {
    fn basis_curves_topology(&self, _id: &PrimPath) -> BasisCurvesTopology {
        self.topology.clone()
    }

    fn mesh_topology(&self, _id: &PrimPath) -> MeshTopology {
        MeshTopology::default()
    }

    fn primvar_names(&self, _id: &PrimPath, interpolation: Interpolation) -> Vec<Token> {
        match interpolation {
            Interpolation::Vertex => vec![tokens::POINTS, tokens::WIDTHS],
            _ => Vec::new(),
        }
    }

    fn get(&self, _id: &PrimPath, name: &Token) -> Value {
        if *name == tokens::POINTS {
            self.points.clone()
        } else if *name == tokens::WIDTHS {
            self.widths.clone()
        } else {
            Value::Empty
        }
    }

    fn refine_level(&self, _id: &PrimPath) -> i32 {
        1
    }
}

fn populated_index(prims: usize) -> RenderIndex {
    let index = RenderIndex::new(RenderConfig::default());
    for i in 0..prims {
        let _ = index.insert_rprim(RprimKind::BasisCurves, PrimPath::new(&format!("/hair_{i}")));
    }
    index
}

// ---------------------------------------------------------------------------
// Instance sharing
// ---------------------------------------------------------------------------

fn bench_instance_registration(c: &mut Criterion) {
    let registry: InstanceRegistry<Arc<u64>> = InstanceRegistry::new();
    c.bench_function("instance_register_1k_keys", |b| {
        b.iter(|| {
            for key in 0..1_000u64 {
                registry.register(black_box(key % 64), |instance| {
                    if instance.value().is_none() {
                        instance.set_value(Arc::new(key));
                    }
                });
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Sync passes
// ---------------------------------------------------------------------------

fn bench_initial_sync(c: &mut Criterion) {
    let delegate = HairDelegate::new(16);
    c.bench_function("initial_sync_1k_curves", |b| {
        b.iter_batched(
            || populated_index(1_000),
            |index| {
                black_box(index.sync_all(&delegate, &tokens::REFINED));
                index
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_widths_resync(c: &mut Criterion) {
    let delegate = HairDelegate::new(16);
    let index = populated_index(1_000);
    index.sync_all(&delegate, &tokens::REFINED);
    index.resource_registry().commit();
    let ids = index.rprim_ids();

    c.bench_function("widths_resync_1k_curves", |b| {
        b.iter(|| {
            for id in &ids {
                index.change_tracker().mark_rprim_dirty(id, DirtyBits::DIRTY_WIDTHS);
            }
            black_box(index.sync_all(&delegate, &tokens::REFINED));
            black_box(index.resource_registry().commit());
        });
    });
}

fn bench_commit(c: &mut Criterion) {
    let delegate = HairDelegate::new(64);
    c.bench_function("commit_initial_1k_curves", |b| {
        b.iter_batched(
            || {
                let index = populated_index(1_000);
                index.sync_all(&delegate, &tokens::REFINED);
                index
            },
            |index| {
                black_box(index.resource_registry().commit());
                index
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(sharing, bench_instance_registration);
criterion_group!(sync, bench_initial_sync, bench_widths_resync, bench_commit);
criterion_main!(sharing, sync);
