use rand::Rng;

/// Uniform in-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    let mut remaining = items.len();
    while remaining > 1 {
        let pick = rng.gen_range(0..remaining);
        remaining -= 1;
        items.swap(remaining, pick);
    }
}
