// The egg mask: which cells of the grid accept paint.
//
// The mask is computed once from an axis-aligned ellipse inscribed in the
// grid and never mutated afterwards. Every store (client-side and relay-side)
// recomputes it from the grid size, so it never travels over the wire.

/// Default canvas size (cells per side).
pub const DEFAULT_GRID_SIZE: usize = 20;

/// Compute the paintable-cell mask for an `n × n` grid.
///
/// Cell `(x, y)` is paintable iff it lies within the ellipse with semi-axes
/// `n / 2` centered on `(⌊n/2⌋, ⌊n/2⌋)`:
///
/// ```text
/// dx²/a² + dy²/b² ≤ 1
/// ```
///
/// Indexed as `mask[y][x]`. Deterministic; any positive `n` is valid.
pub fn egg_mask(n: usize) -> Vec<Vec<bool>> {
    #[expect(clippy::cast_precision_loss)]
    let semi_axis = n as f64 / 2.0;
    let center = (n / 2) as f64;
    let mut mask = vec![vec![false; n]; n];

    for (y, row) in mask.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            let dx = x as f64 - center;
            let dy = y as f64 - center;
            let ellipse = (dx * dx) / (semi_axis * semi_axis) + (dy * dy) / (semi_axis * semi_axis);
            *cell = ellipse <= 1.0;
        }
    }
    mask
}
