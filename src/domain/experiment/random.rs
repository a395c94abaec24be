//! Source of uniform draws used for weighted variant selection

/// Produces uniform random values in `[0, 1)`
pub trait RandomSource: Send {
    /// Draw the next value
    fn draw(&mut self) -> f64;
}
