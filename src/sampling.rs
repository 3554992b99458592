use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

/// Vector of uniform draws in `[0, 1)`.
pub(crate) fn uniform_vec<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Array1<f64> {
    Array1::from_iter((0..dim).map(|_| rng.random::<f64>()))
}

/// Standard normal draw scaled to `mean + sdev * z`.
pub(crate) fn normal_scalar<R: Rng + ?Sized>(mean: f64, sdev: f64, rng: &mut R) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + sdev * z
}

/// Vector of independent normal draws with per-coordinate mean and sdev.
pub(crate) fn normal_vec<R: Rng + ?Sized>(
    mean: &Array1<f64>,
    sdev: &Array1<f64>,
    rng: &mut R,
) -> Array1<f64> {
    Array1::from_iter(
        mean.iter()
            .zip(sdev.iter())
            .map(|(&m, &s)| normal_scalar(m, s, rng)),
    )
}
