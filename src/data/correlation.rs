use super::error::DashboardError;
use super::model::{Metric, Table};

/// Below this many snapshot rows a correlation matrix is mostly noise.
pub const MIN_CORRELATION_ROWS: usize = 11;

/// Square Pearson correlation matrix over a fixed list of metrics.
///
/// `values[i][j]` is `None` when the pair has fewer than two complete rows
/// or one side has zero variance.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub metrics: Vec<Metric>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.metrics.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }
}

/// Pairwise-complete Pearson correlation across `metrics`.
///
/// Each pair only uses rows where both values are present. The upper triangle
/// is computed and mirrored, so the result is symmetric with a unit diagonal.
pub fn correlate(
    snapshot: &Table,
    metrics: &[Metric],
    min_rows: usize,
) -> Result<CorrelationMatrix, DashboardError> {
    if snapshot.len() < min_rows {
        return Err(DashboardError::InsufficientData {
            required: min_rows,
            available: snapshot.len(),
        });
    }

    let columns: Vec<Vec<Option<f64>>> = metrics
        .iter()
        .map(|m| snapshot.iter().map(|r| m.value(r)).collect())
        .collect();

    let n = metrics.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        metrics: metrics.to_vec(),
        values,
    })
}

/// Pearson's r over the rows where both sides are present.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
