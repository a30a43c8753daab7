use criterion::{criterion_group, criterion_main, Criterion};
use dyn_stack::{GlobalPodBuffer, PodStack};
use std::sync::Arc;

use gridla::dist::{self, spawn_world, Dist, DistMat, Grid};
use gridla::linalg::householder::{self, Direction, ReflectorParams};
use gridla::linalg::lu::{no_pivoting, partial_pivoting, LuParams};
use gridla::{Conj, Mat, Parallelism};

fn random_mat(m: usize, n: usize) -> Mat<f64> {
    Mat::from_fn(m, n, |_, _| rand::random::<f64>())
}

pub fn lu(c: &mut Criterion) {
    let params = LuParams::default();
    for n in [64, 128, 256, 512] {
        let a = random_mat(n, n);

        c.bench_function(&format!("gridla-st-plu-{n}"), |b| {
            let mut lu = a.clone();
            let mut perm = vec![0usize; n];
            let mut perm_inv = vec![0usize; n];
            let mut mem =
                GlobalPodBuffer::new(partial_pivoting::lu_in_place_req::<f64>(n, n, params).unwrap());
            b.iter(|| {
                lu.as_mut().copy_from(a.as_ref());
                partial_pivoting::lu_in_place(
                    lu.as_mut(),
                    &mut perm,
                    &mut perm_inv,
                    params,
                    Parallelism::None,
                    PodStack::new(&mut mem),
                )
                .unwrap();
            })
        });

        c.bench_function(&format!("gridla-mt-plu-{n}"), |b| {
            let mut lu = a.clone();
            let mut perm = vec![0usize; n];
            let mut perm_inv = vec![0usize; n];
            let mut mem =
                GlobalPodBuffer::new(partial_pivoting::lu_in_place_req::<f64>(n, n, params).unwrap());
            b.iter(|| {
                lu.as_mut().copy_from(a.as_ref());
                partial_pivoting::lu_in_place(
                    lu.as_mut(),
                    &mut perm,
                    &mut perm_inv,
                    params,
                    Parallelism::Rayon(0),
                    PodStack::new(&mut mem),
                )
                .unwrap();
            })
        });

        c.bench_function(&format!("gridla-st-nopiv-lu-{n}"), |b| {
            let mut lu = a.clone();
            let mut mem =
                GlobalPodBuffer::new(no_pivoting::lu_in_place_req::<f64>(n, n, params).unwrap());
            b.iter(|| {
                lu.as_mut().copy_from(a.as_ref());
                no_pivoting::lu_in_place(lu.as_mut(), params, Parallelism::None, PodStack::new(&mut mem))
                    .unwrap();
            })
        });
    }
}

pub fn dist_lu(c: &mut Criterion) {
    let params = LuParams { blocksize: 32 };
    for n in [64, 128, 256] {
        let a = random_mat(n, n);
        for (size, height) in [(1, 1), (4, 2)] {
            c.bench_function(&format!("gridla-dist-plu-{size}x{height}-{n}"), |b| {
                b.iter(|| {
                    spawn_world(size, |transport| {
                        let grid = Grid::new(Arc::new(transport), height).unwrap();
                        let mut da =
                            DistMat::from_mat(&grid, a.as_ref(), Dist::Mc, Dist::Mr).unwrap();
                        let mut p = DistMat::<usize>::new(&grid, n, 1, Dist::Vc, Dist::Star).unwrap();
                        dist::lu::lu_in_place(da.as_mut(), p.as_mut(), params).unwrap()
                    })
                })
            });
        }
    }
}

pub fn reflectors(c: &mut Criterion) {
    let params = ReflectorParams::default();
    for n in [64, 128, 256, 512] {
        let h = random_mat(n / 2, n);
        let t = Mat::from_fn(n / 2, 1, |_, _| 1.0 + rand::random::<f64>());
        let a = random_mat(n, n);

        c.bench_function(&format!("gridla-st-reflectors-{n}"), |b| {
            let mut x = a.clone();
            let mut mem = GlobalPodBuffer::new(
                householder::apply_packed_reflectors_req::<f64>(n / 2, n, 0, n, params).unwrap(),
            );
            b.iter(|| {
                householder::apply_packed_reflectors(
                    Conj::No,
                    Direction::Forward,
                    0,
                    h.as_ref(),
                    t.as_ref(),
                    x.as_mut(),
                    params,
                    Parallelism::None,
                    PodStack::new(&mut mem),
                )
                .unwrap();
            })
        });
    }
}

criterion_group!(benches, lu, dist_lu, reflectors);
criterion_main!(benches);
