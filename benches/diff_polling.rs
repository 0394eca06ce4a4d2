use criterion::{criterion_group, criterion_main, Criterion, black_box};

use voxedit::core::{Axis, Color, EngineConfig, IVec3};
use voxedit::voxel::{VoxelData, VoxelSpec};

fn filled(size: i32) -> VoxelData {
    let mut voxels = VoxelData::new(&EngineConfig::default());
    let specs: Vec<VoxelSpec> = (0..size)
        .flat_map(|x| (0..size).flat_map(move |y| (0..size).map(move |z| IVec3::new(x, y, z))))
        .map(|p| VoxelSpec::new(p, Color::new(p.x as u8, p.y as u8, p.z as u8)))
        .collect();
    voxels.mass_add_voxels(&specs);
    voxels
}

fn bench_full_plane_poll(c: &mut Criterion) {
    let mut voxels = filled(32);

    c.bench_function("full_plane_poll_32", |b| {
        b.iter(|| {
            // force the next poll back to a full snapshot
            voxels.invalidate_plane_buffer("bench", Axis::Z, 0);
            let diff = voxels.get_new_on_plane_since("bench", Axis::Z, 0);
            black_box(diff.added.len())
        });
    });
}

fn bench_incremental_poll(c: &mut Criterion) {
    let mut voxels = filled(32);
    let ids: Vec<_> = voxels
        .get_visible_layer_voxels()
        .iter()
        .take(256)
        .map(|v| v.id)
        .collect();
    voxels.get_new_since("bench");

    c.bench_function("recolor_256_then_poll", |b| {
        let mut shade = 0u8;
        b.iter(|| {
            shade = shade.wrapping_add(1);
            voxels.mass_set_color(black_box(&ids), Color::new(shade, 0, 0));
            black_box(voxels.get_new_since("bench").added.len())
        });
    });
}

fn bench_undo_redo_mass_move(c: &mut Criterion) {
    let mut voxels = filled(16);
    let ids: Vec<_> = voxels.get_visible_layer_voxels().iter().map(|v| v.id).collect();
    voxels.mass_move_voxels(&ids, IVec3::new(0, -20, 0));

    c.bench_function("undo_redo_mass_move_4k", |b| {
        b.iter(|| {
            voxels.undo();
            voxels.redo();
            black_box(voxels.get_new_since("bench").added.len())
        });
    });
}

fn bench_visible_view_after_edit(c: &mut Criterion) {
    let mut voxels = filled(32);
    voxels.get_visible_layer_voxels();

    c.bench_function("visible_view_patch", |b| {
        b.iter(|| {
            voxels.add_voxel(VoxelSpec::new(IVec3::new(100, 0, 0), Color::default()));
            let count = voxels.get_visible_layer_voxels().len();
            voxels.undo();
            black_box(count)
        });
    });
}

criterion_group!(
    benches,
    bench_full_plane_poll,
    bench_incremental_poll,
    bench_undo_redo_mass_move,
    bench_visible_view_after_edit,
);
criterion_main!(benches);
