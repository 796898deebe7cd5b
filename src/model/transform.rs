//! Margin → prediction transform.
//!
//! Persisted with each stage model so that inference never needs the
//! training objective.

/// Inference-time output transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputTransform {
    /// Output is the raw margin. Regression.
    #[default]
    Identity,
    /// `1 / (1 + exp(-margin))` on a single group. Binary classification.
    Sigmoid,
    /// Row-wise softmax over all groups. Multiclass classification.
    Softmax,
}

impl OutputTransform {
    /// Apply the transform in place to a row-major `[n_rows, n_outputs]` buffer.
    ///
    /// Sigmoid clamps margins to `[-500, 500]`; softmax subtracts the row max
    /// first. NaN propagates.
    ///
    /// # Panics
    ///
    /// If `n_outputs` is 0 or does not divide `margins.len()`.
    #[inline]
    pub fn transform_inplace(&self, margins: &mut [f32], n_outputs: usize) {
        assert!(n_outputs > 0, "n_outputs must be > 0");
        assert!(
            margins.len() % n_outputs == 0,
            "margins.len() must be divisible by n_outputs"
        );

        match self {
            OutputTransform::Identity => {}
            OutputTransform::Sigmoid => margins.iter_mut().for_each(|x| *x = sigmoid(*x)),
            OutputTransform::Softmax => margins.chunks_exact_mut(n_outputs).for_each(softmax_inplace),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputTransform::Identity => "identity",
            OutputTransform::Sigmoid => "sigmoid",
            OutputTransform::Softmax => "softmax",
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-500.0, 500.0);
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[inline]
fn softmax_inplace(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut sum = 0.0f32;
    for x in row.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    if sum > 0.0 {
        row.iter_mut().for_each(|x| *x /= sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_keeps_margins() {
        let mut m = vec![1.0, -2.0, 3.5];
        OutputTransform::Identity.transform_inplace(&mut m, 1);
        assert_eq!(m, vec![1.0, -2.0, 3.5]);
    }

    #[test]
    fn sigmoid_is_a_probability() {
        let mut m = vec![0.0, -10.0, 10.0, f32::INFINITY, f32::NEG_INFINITY];
        OutputTransform::Sigmoid.transform_inplace(&mut m, 1);
        assert_abs_diff_eq!(m[0], 0.5, epsilon = 1e-6);
        assert!(m[1] > 0.0 && m[1] < 0.001);
        assert!(m[2] < 1.0 && m[2] > 0.999);
        assert!(m[3] > 0.999);
        assert!(m[4] < 0.001);
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let mut m = vec![1.0, 2.0, 3.0, 100.0, 200.0, 300.0];
        OutputTransform::Softmax.transform_inplace(&mut m, 3);

        for row in m.chunks(3) {
            assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
            assert!(row[0] < row[1] && row[1] < row[2]);
        }
        assert!(m[5] > 0.99);
    }

    #[test]
    fn softmax_uniform_on_ties() {
        let mut m = vec![0.0; 3];
        OutputTransform::Softmax.transform_inplace(&mut m, 3);
        assert_abs_diff_eq!(m[0], 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(m[0], m[2], epsilon = 1e-6);
    }

    #[test]
    fn nan_propagates() {
        let mut m = vec![f32::NAN];
        OutputTransform::Sigmoid.transform_inplace(&mut m, 1);
        assert!(m[0].is_nan());
    }

    #[test]
    #[should_panic(expected = "divisible by n_outputs")]
    fn panics_on_ragged_buffer() {
        let mut m = vec![1.0, 2.0, 3.0];
        OutputTransform::Softmax.transform_inplace(&mut m, 2);
    }
}
