// In-sample fit metrics reported after training

use ndarray::{Array1, ArrayView1};

pub fn rmse(predicted: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sse: f64 = predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    (sse / actual.len() as f64).sqrt()
}

pub fn accuracy(predicted: &Array1<usize>, actual: &Array1<usize>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p == a)
        .count();
    correct as f64 / actual.len() as f64
}

/// Share of positive labels.
pub fn positive_rate(labels: &Array1<usize>) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|&&l| l == 1).count() as f64 / labels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rmse() {
        let p = array![1.0, 2.0, 3.0];
        let a = array![1.0, 2.0, 5.0];
        assert!((rmse(p.view(), a.view()) - (4.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        let empty = Array1::<f64>::zeros(0);
        assert_eq!(rmse(empty.view(), empty.view()), 0.0);
    }

    #[test]
    fn test_accuracy_and_positive_rate() {
        let p = array![1, 0, 1, 1];
        let a = array![1, 0, 0, 1];
        assert_eq!(accuracy(&p, &a), 0.75);
        assert_eq!(positive_rate(&a), 0.5);
    }
}
