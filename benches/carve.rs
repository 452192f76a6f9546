// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use liquidseam::{BuiltinEnergy, Carver, Raster};

fn scene() -> Raster<u8> {
    Raster::from_fn(320, 200, 3, |x, y, c| ((x * 13 + y * 7 + c * 31 + x * y) % 251) as u8)
        .unwrap()
}

fn active(energy: BuiltinEnergy) -> Carver<u8> {
    let mut carver = Carver::new(scene()).unwrap();
    carver.init(0.0).unwrap();
    carver.set_energy_function(energy).unwrap();
    carver
}

fn energy_map(c: &mut Criterion) {
    c.bench_function("energy map 320x200 grad-norm", |b| {
        b.iter_with_setup(
            || active(BuiltinEnergy::GradNorm),
            |mut carver| black_box(carver.energy_map().unwrap()),
        )
    });
}

fn shrink_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("carve");
    group.sample_size(10);
    group.bench_function("width -10% 320x200", |b| {
        b.iter_with_setup(
            || active(BuiltinEnergy::GradXAbs),
            |mut carver| {
                carver.resize(288, 200).unwrap();
                black_box(carver.width())
            },
        )
    });
    group.finish();
}

criterion_group!(benches, energy_map, shrink_width);
criterion_main!(benches);
