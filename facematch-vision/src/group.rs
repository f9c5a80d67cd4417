//! Clustering of raw detector windows into face regions.
//!
//! Windows are partitioned into classes of near-identical rectangles, each class is
//! averaged, and classes with too few members or nested inside a stronger class are
//! dropped. Output order follows the first window of each class.

use crate::face::FaceRegion;

/// Relative tolerance used to decide that two windows describe the same face.
pub const GROUP_EPS: f64 = 0.2;

fn similar(a: &FaceRegion, b: &FaceRegion, eps: f64) -> bool {
    let delta = eps * f64::from(a.width.min(b.width) + a.height.min(b.height)) * 0.5;
    let (ax, ay, aw, ah) = (a.x as i64, a.y as i64, a.width as i64, a.height as i64);
    let (bx, by, bw, bh) = (b.x as i64, b.y as i64, b.width as i64, b.height as i64);
    [ax - bx, ay - by, ax + aw - bx - bw, ay + ah - by - bh]
        .iter()
        .all(|d| (d.abs() as f64) <= delta)
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Label every window with its class; labels are numbered by first appearance.
fn partition(rects: &[FaceRegion], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = rj.min(ri);
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; rects.len()];
    let mut classes = 0;
    let labels: Vec<usize> = (0..rects.len())
        .map(|i| {
            let root = find(&mut parent, i);
            if class_of_root[root] == usize::MAX {
                class_of_root[root] = classes;
                classes += 1;
            }
            class_of_root[root]
        })
        .collect();
    (labels, classes)
}

/// Merge overlapping windows; a class needs more than `min_neighbors` members to survive.
///
/// `min_neighbors == 0` disables grouping and returns the windows unchanged.
pub fn group_rectangles(rects: &[FaceRegion], min_neighbors: u32, eps: f64) -> Vec<FaceRegion> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, classes) = partition(rects, eps);
    let mut totals = vec![[0u64; 4]; classes];
    let mut votes = vec![0u32; classes];
    for (r, &label) in rects.iter().zip(&labels) {
        let t = &mut totals[label];
        t[0] += u64::from(r.x);
        t[1] += u64::from(r.y);
        t[2] += u64::from(r.width);
        t[3] += u64::from(r.height);
        votes[label] += 1;
    }

    let averaged: Vec<FaceRegion> = totals
        .iter()
        .zip(&votes)
        .map(|(t, &n)| {
            let avg = |v: u64| (v as f64 / f64::from(n)).round() as u32;
            FaceRegion::new(avg(t[0]), avg(t[1]), avg(t[2]), avg(t[3]))
        })
        .collect();

    let mut kept = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = votes[i];
        if n1 <= min_neighbors {
            continue;
        }
        let nested = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = votes[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (f64::from(r2.width) * eps).round() as i64;
            let dy = (f64::from(r2.height) * eps).round() as i64;
            let (x1, y1) = (r1.x as i64, r1.y as i64);
            let (x2, y2) = (r2.x as i64, r2.y as i64);
            x1 >= x2 - dx
                && y1 >= y2 - dy
                && x1 + r1.width as i64 <= x2 + r2.width as i64 + dx
                && y1 + r1.height as i64 <= y2 + r2.height as i64 + dy
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            kept.push(*r1);
        }
    }
    kept
}
