use ndarray::{Array, Array2};
use ndarray_linalg::Scalar;
use num_traits::Float;

use crate::Result;

/// Generate the Vandermonde matrix of `degree` for observations `x`
///
/// The Vandermonde matrix is a (n x degree + 1) matrix. Each row is a
/// geometric progression for an individual observation `x` from power `0` to
/// `degree` inclusive. At degree one this is exactly the design matrix of a
/// straight-line fit with intercept: a column of ones next to the column of
/// observations.
///
/// # Panics
///
/// The generator panics in the event that `degree` cannot be converted to
/// `i32`. As the maximum value which can be represented by an `i32` is
/// `2_147_483_647i32` this is unlikely to occur so the error probably does
/// not need to be gracefully handled.
///
/// # Examples
///
/// ```
/// use flow_correction::math::vandermonde;
/// use ndarray::arr2;
///
/// let observations: Vec<f64> = vec![2., 3.];
/// let design = vandermonde(&observations, 1).unwrap();
///
/// let expected = arr2(&[[1., 2.], [1., 3.]]);
/// assert_eq!(design, expected);
/// ```
pub fn vandermonde<T: Copy + Scalar>(x: &[T], degree: usize) -> Result<Array2<T>> {
    let vals = x.iter().flat_map(|xi| {
        (0..=degree).map(|i| xi.powi(i32::try_from(i).expect("{i} doesn't fit in `i32`")))
    });

    Ok(Array::from_iter(vals).into_shape((x.len(), degree + 1))?)
}

/// Arithmetic mean of `values`
///
/// # Panics
///
/// Panics if `values` is empty. Callers hold non-empty series by
/// construction.
///
/// # Examples
///
/// ```
/// use flow_correction::math::mean;
///
/// let values = [1.0, 2.0, 3.0];
/// assert_eq!(mean(&values), 2.0);
/// ```
pub fn mean<E: Float>(values: &[E]) -> E {
    assert!(!values.is_empty(), "mean of an empty slice is undefined");
    let sum = values.iter().fold(E::zero(), |acc, &v| acc + v);
    sum / E::from(values.len()).expect("length must fit in the scalar type")
}

/// Sample standard deviation of `values`, with the n - 1 denominator
///
/// Returns `None` for fewer than two values, where the estimator is
/// undefined.
pub fn sample_standard_deviation<E: Float>(values: &[E]) -> Option<E> {
    if values.len() < 2 {
        return None;
    }

    let centre = mean(values);
    let sum_of_squares = values
        .iter()
        .map(|&v| (v - centre).powi(2))
        .fold(E::zero(), |acc, v| acc + v);

    let denominator = E::from(values.len() - 1).expect("length must fit in the scalar type");
    Some((sum_of_squares / denominator).sqrt())
}
