//! Ordinary least squares over (index, value) points

use super::Regressor;
use crate::error::{Error, Result};

/// Fitted line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit by least squares; fails when the x values have no spread
    pub fn fit(points: &[(f64, f64)]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Computation("cannot fit a line to zero points".into()));
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

        let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
        let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();

        if sxx == 0.0 {
            return Err(Error::Computation(format!(
                "degenerate least-squares system ({} point(s) with identical x)",
                points.len()
            )));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(Error::Computation("least-squares fit is not finite".into()));
        }

        Ok(Self { slope, intercept })
    }
}

impl Regressor for LinearFit {
    fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_exact_line() {
        let points = vec![(0.0, 100.0), (1.0, 110.0), (2.0, 120.0), (3.0, 130.0)];
        let fit = LinearFit::fit(&points).unwrap();
        assert!((fit.slope - 10.0).abs() < 1e-9);
        assert!((fit.intercept - 100.0).abs() < 1e-9);
        assert!((fit.predict(6.0) - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_flat_line() {
        let points = vec![(0.0, 5.0), (1.0, 5.0), (2.0, 5.0)];
        let fit = LinearFit::fit(&points).unwrap();
        assert_eq!(fit.slope, 0.0);
    }

    #[test]
    fn test_single_point_is_degenerate() {
        assert!(matches!(
            LinearFit::fit(&[(0.0, 1.0)]),
            Err(Error::Computation(_))
        ));
        assert!(LinearFit::fit(&[]).is_err());
    }
}
