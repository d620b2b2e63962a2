//! Result types for scoring runs.

/// Perplexity values produced by [`crate::BatchScorer::run`], one per row in
/// row order.
///
/// # Examples
/// ```
/// use pplcsv_core::PerplexityScores;
///
/// let scores = PerplexityScores::from_values(vec![10.5, 22.5]);
/// assert_eq!(scores.len(), 2);
/// assert_eq!(scores.values(), [10.5, 22.5]);
/// assert_eq!(scores.average(), Some(16.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerplexityScores {
    values: Vec<f64>,
}

impl PerplexityScores {
    /// Wraps an ordered sequence of scores.
    #[must_use]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Returns the scores in row order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consumes the result and returns the underlying scores.
    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Returns the number of scored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether no rows were scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the scores in row order.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }

    /// Returns the arithmetic mean of the scores, skipping `NaN` entries.
    ///
    /// Rows whose text had no scored token carry `NaN`. Returns `None` when
    /// no row has a score.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_core::PerplexityScores;
    ///
    /// assert_eq!(PerplexityScores::default().average(), None);
    /// assert_eq!(PerplexityScores::from_values(vec![2.0, 4.0]).average(), Some(3.0));
    /// assert_eq!(PerplexityScores::from_values(vec![2.0, f64::NAN]).average(), Some(2.0));
    /// ```
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        let (total, count) = self
            .values
            .iter()
            .filter(|value| !value.is_nan())
            .fold((0.0_f64, 0_usize), |(total, count), value| (total + value, count + 1));
        (count > 0).then(|| total / count as f64)
    }
}

impl<'a> IntoIterator for &'a PerplexityScores {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
