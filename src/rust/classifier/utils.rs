use ndarray::{Array1, ArrayView1};

pub(crate) fn l2_normalize(vec: &mut Array1<f32>) {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        vec.mapv_inplace(|x| x / norm);
    }
}

/// Index of the largest score; ties resolve to the lowest index.
pub(crate) fn argmax(scores: ArrayView1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}
