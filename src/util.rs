/// Summary of a run of scores at one level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreTrend {
    pub games: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub best: i64,
    /// last score minus the mean of the ones before it
    pub last_delta: Option<f64>,
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Scores are expected oldest first
pub fn score_trend(scores: &[i64]) -> Option<ScoreTrend> {
    let values: Vec<f64> = scores.iter().map(|&s| s as f64).collect();
    let (last, earlier) = values.split_last()?;

    Some(ScoreTrend {
        games: values.len(),
        mean: mean(&values)?,
        std_dev: std_dev(&values)?,
        best: scores.iter().copied().max()?,
        last_delta: mean(earlier).map(|m| last - m),
    })
}
