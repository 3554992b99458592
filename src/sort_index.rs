use ndarray::ArrayView1;
use std::cmp::Ordering;

/// Indices that sort `v` ascending. Non-comparable pairs keep their order.
pub(crate) fn sort_index(v: ArrayView1<f64>) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..v.len()).collect();
    idx.sort_by(|&a, &b| v[a].partial_cmp(&v[b]).unwrap_or(Ordering::Equal));
    idx
}

/// Indices that sort `v` descending.
pub(crate) fn sort_index_desc(v: ArrayView1<f64>) -> Vec<usize> {
    let mut idx = sort_index(v);
    idx.reverse();
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sort_index_ascending() {
        let v = array![3.0, 1.0, 2.0];
        assert_eq!(sort_index(v.view()), vec![1, 2, 0]);
    }

    #[test]
    fn test_sort_index_descending() {
        let v = array![3.0, 1.0, 2.0];
        assert_eq!(sort_index_desc(v.view()), vec![0, 2, 1]);
    }
}
