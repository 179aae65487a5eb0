use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use plugwork::{AttributeDescriptor, Modifier, PlugRef, SceneContext};
use plugwork_scene::{DataType, MemoryScene, NodeId, SceneGraph};

fn scene_with_transforms(count: usize) -> (MemoryScene, Vec<NodeId>) {
    let mut scene = MemoryScene::new();
    let nodes = (0..count)
        .map(|_| scene.create_node("transform", None, None))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_default();
    (scene, nodes)
}

fn chain(nodes: &[NodeId]) -> Modifier {
    let mut modifier = Modifier::new("chain");
    for pair in nodes.windows(2) {
        let _ = modifier.connect(PlugRef::named(pair[0], "tx"), PlugRef::named(pair[1], "ty"));
        let _ = modifier.set_plug_value(PlugRef::named(pair[1], "tz"), 1.0);
    }
    modifier
}

// ---------------------------------------------------------------------------
// Modifier
// ---------------------------------------------------------------------------

fn bench_commit_rollback_small(c: &mut Criterion) {
    c.bench_function("modifier_commit_rollback_16", |b| {
        b.iter_batched(
            || {
                let (scene, nodes) = scene_with_transforms(16);
                (scene, chain(&nodes))
            },
            |(mut scene, mut modifier)| {
                black_box(modifier.commit(&mut scene)).ok();
                black_box(modifier.rollback(&mut scene)).ok();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_commit_rollback_large(c: &mut Criterion) {
    c.bench_function("modifier_commit_rollback_256", |b| {
        b.iter_batched(
            || {
                let (scene, nodes) = scene_with_transforms(256);
                (scene, chain(&nodes))
            },
            |(mut scene, mut modifier)| {
                black_box(modifier.commit(&mut scene)).ok();
                black_box(modifier.rollback(&mut scene)).ok();
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_create_nodes(c: &mut Criterion) {
    c.bench_function("modifier_create_64_nodes", |b| {
        b.iter_batched(
            || {
                let mut modifier = Modifier::new("create");
                for _ in 0..64 {
                    let _ = modifier.create_node("network", None, None);
                }
                (MemoryScene::new(), modifier)
            },
            |(mut scene, mut modifier)| {
                black_box(modifier.commit(&mut scene)).ok();
            },
            BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Staged compounds
// ---------------------------------------------------------------------------

fn bench_staged_compound(c: &mut Criterion) {
    let parent = AttributeDescriptor::builder("group")
        .with_children_count(8)
        .build();
    let children: Vec<_> = (0..8)
        .map(|i| {
            AttributeDescriptor::builder(format!("member{i}"))
                .with_data_type(DataType::Float)
                .with_parent("group")
                .build()
        })
        .collect::<Result<_, _>>()
        .unwrap_or_default();
    let Ok(parent) = parent else {
        return;
    };

    c.bench_function("context_staged_compound_8", |b| {
        b.iter_batched(
            || {
                let mut ctx = SceneContext::new(MemoryScene::new());
                let node = ctx.create_node("network", None, None).map(|node| node.id());
                (ctx, node)
            },
            |(mut ctx, node)| {
                let Ok(node) = node else { return };
                ctx.batch("group", |ctx, modifier| {
                    ctx.add_attribute_with(node, &parent, modifier)?;
                    for child in &children {
                        ctx.add_attribute_with(node, child, modifier)?;
                    }
                    Ok(())
                })
                .ok();
                black_box(ctx);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_commit_rollback_small,
    bench_commit_rollback_large,
    bench_create_nodes,
    bench_staged_compound,
);
criterion_main!(benches);
