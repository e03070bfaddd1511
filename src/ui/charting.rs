/// Chart coordinates for a run of scores: x is the 1-based game number
pub fn score_points(scores: &[i64]) -> Vec<(f64, f64)> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| ((i + 1) as f64, score as f64))
        .collect()
}

/// Compute X (games) and Y (score) bounds for the score chart
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let games = points.last().map_or(1.0, |p| p.0).max(1.0);
    let highest = points.iter().map(|p| p.1).fold(0.0, f64::max);

    // leave headroom above the best game so its point isn't drawn on the border
    (games, (highest + (highest / 10.0).ceil()).max(10.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.1}")
    }
}
