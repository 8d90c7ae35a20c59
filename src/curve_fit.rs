use libm::fabs;

/// Largest number of coefficients a fit can produce.
pub const MAX_ORDER: usize = 20;

/// Least squares polynomial fit over `N` sample points.
///
/// Produces `NCOEFFS` coefficients, i.e. a polynomial of order `NCOEFFS - 1`,
/// ordered from the highest degree term down to the constant term.
pub trait CurveFitter {
    fn fit_curve<const N: usize, const NCOEFFS: usize>(
        &self,
        px: &[f64; N],
        py: &[f64; N],
    ) -> [f64; NCOEFFS];
}

/// Solves the normal equations of the fit with Cramer's rule.
///
/// The abscissas are normalized by their largest magnitude before the power
/// sums are taken, since raw stick readings far from 1.0 make the normal
/// equations badly conditioned. Coefficients are scaled back afterwards.
///
/// A singular system (e.g. all abscissas identical) is not an error, it
/// simply yields non-finite coefficients.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeastSquaresFit;

struct FitDimensions<const N: usize, const NCOEFFS: usize>;

impl<const N: usize, const NCOEFFS: usize> FitDimensions<N, NCOEFFS> {
    const VALID: () = {
        assert!(NCOEFFS >= 2, "fit needs at least 2 coefficients");
        assert!(NCOEFFS <= MAX_ORDER, "matrix size out of bounds");
        assert!(N >= 1, "not enough points to fit");
    };
}

impl CurveFitter for LeastSquaresFit {
    fn fit_curve<const N: usize, const NCOEFFS: usize>(
        &self,
        px: &[f64; N],
        py: &[f64; N],
    ) -> [f64; NCOEFFS] {
        #[allow(clippy::let_unit_value)]
        let () = FitDimensions::<N, NCOEFFS>::VALID;

        let scale = match px.iter().fold(0f64, |acc, x| acc.max(fabs(*x))) {
            s if s > 0. && s.is_finite() => s,
            _ => 1.,
        };

        let mut t = [0f64; NCOEFFS];
        let mut s = [0f64; MAX_ORDER * 2 + 1];

        for i in 0..N {
            let x = px[i] / scale;
            let y = py[i];
            for j in 0..NCOEFFS * 2 - 1 {
                s[j] += curve_fit_power(x, j as u32);
            }
            for j in 0..NCOEFFS {
                t[j] += y * curve_fit_power(x, j as u32);
            }
        }

        //Master matrix LHS of linear equation
        let mut matrix = [[0f64; NCOEFFS]; NCOEFFS];

        for i in 0..NCOEFFS {
            for j in 0..NCOEFFS {
                matrix[i][j] = s[i + j];
            }
        }

        let denom = det(&matrix);
        trace!("Fit determinant: {}", denom);

        let mut coeffs = [0f64; NCOEFFS];

        for i in 0..NCOEFFS {
            coeffs[NCOEFFS - i - 1] =
                det(&sub_col(&matrix, &t, i)) / denom / curve_fit_power(scale, i as u32);
        }

        coeffs
    }
}

/// Calculate the power of a number
fn curve_fit_power(base: f64, exponent: u32) -> f64 {
    if exponent == 0 {
        return 1.0;
    }

    let mut val = base;

    for _ in 1..exponent {
        val *= base;
    }

    val
}

/// Substitutes a column in a matrix with a vector
fn sub_col<const N: usize>(matrix: &[[f64; N]; N], t: &[f64; N], col: usize) -> [[f64; N]; N] {
    let mut m = *matrix;

    for i in 0..N {
        m[i][col] = t[i];
    }

    m
}

/// Calculate the determinant of a matrix
fn det<const N: usize>(matrix: &[[f64; N]; N]) -> f64 {
    let mut m = *matrix;
    let sign = trianglize(&mut m);

    if sign == 0 {
        return 0.;
    }

    let mut p = 1f64;

    for i in 0..N {
        p *= m[i][i];
    }

    p * (sign as f64)
}

/// Bring a matrix into upper triangular form in place, using partial pivoting.
///
/// Returns the sign the determinant picks up from row swaps, or 0 if the matrix is singular.
fn trianglize<const N: usize>(matrix: &mut [[f64; N]; N]) -> i32 {
    let mut sign = 1;

    for i in 0..N {
        let mut max = i;
        for row in i + 1..N {
            if fabs(matrix[row][i]) > fabs(matrix[max][i]) {
                max = row;
            }
        }
        if max != i {
            sign = -sign;
            matrix.swap(i, max);
        }
        if matrix[i][i] == 0. {
            return 0;
        }
        for row in i + 1..N {
            let factor = matrix[row][i] / matrix[i][i];
            if factor == 0. {
                continue;
            }
            for col in i..N {
                matrix[row][col] -= factor * matrix[i][col];
            }
        }
    }

    sign
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn determinant_with_row_swap() {
        let m = [[0., 2., 1.], [1., 1., 0.], [2., 0., 3.]];

        // 0*(3-0) - 2*(3-0) + 1*(0-2)
        assert_abs_diff_eq!(det(&m), -8., epsilon = 1e-12);
    }

    #[test]
    fn singular_determinant_is_zero() {
        let m = [[1., 2.], [2., 4.]];

        assert_eq!(det(&m), 0.);
    }

    #[test]
    fn recovers_exact_cubic() {
        let f = |x: f64| 2. * x * x * x - 3. * x * x + 0.5 * x + 7.;
        let px = [-2., -1., 0., 1., 2.5];
        let py = px.map(f);

        let coeffs: [f64; 4] = LeastSquaresFit.fit_curve(&px, &py);

        assert_abs_diff_eq!(coeffs[0], 2., epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[1], -3., epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[2], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[3], 7., epsilon = 1e-9);
    }

    #[test]
    fn fits_line_through_noisy_points() {
        let px = [0., 1., 2., 3.];
        let py = [1., 2.9, 5.1, 7.];

        let coeffs: [f64; 2] = LeastSquaresFit.fit_curve(&px, &py);

        // simple linear regression
        let n = 4.;
        let sx = 6.;
        let sy = 16.;
        let sxx = 14.;
        let sxy = 0. + 2.9 + 10.2 + 21.;
        let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
        let intercept = (sy - slope * sx) / n;

        assert_abs_diff_eq!(coeffs[0], slope, epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[1], intercept, epsilon = 1e-9);
    }

    #[test]
    fn stick_sized_abscissas_stay_accurate() {
        let px = [27.5, 53.2537879754, 127.5, 201.7462120246, 227.5];

        let coeffs: [f64; 4] = LeastSquaresFit.fit_curve(&px, &px);

        assert_abs_diff_eq!(coeffs[0], 0., epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[1], 0., epsilon = 1e-7);
        assert_abs_diff_eq!(coeffs[2], 1., epsilon = 1e-6);
        assert_abs_diff_eq!(coeffs[3], 0., epsilon = 1e-4);
    }

    #[test]
    fn identical_abscissas_are_not_finite() {
        let px = [1.; 5];
        let py = [1., 2., 3., 4., 5.];

        let coeffs: [f64; 4] = LeastSquaresFit.fit_curve(&px, &py);

        assert!(coeffs.iter().all(|c| !c.is_finite()));
    }
}
