use crate::quiz::{QuizResult, percentage};

const SHORT_TITLE_LEN: usize = 15;

/// One bar in the score history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Title cut to fit a chart label.
    pub name: String,
    pub full_title: String,
    pub percentage: u32,
}

/// Aggregates over the results collected during the current process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub total_taken: usize,
    pub overall_accuracy: u32,
    pub perfect_scores: usize,
    pub history: Vec<HistoryEntry>,
}

impl SessionStats {
    pub fn from_results(results: &[QuizResult]) -> Self {
        let total_score: usize = results.iter().map(|result| result.score).sum();
        let total_questions: usize = results.iter().map(|result| result.total_questions).sum();

        Self {
            total_taken: results.len(),
            overall_accuracy: percentage(total_score, total_questions),
            perfect_scores: results.iter().filter(|result| result.is_perfect()).count(),
            history: results
                .iter()
                .map(|result| HistoryEntry {
                    name: short_title(&result.quiz_title),
                    full_title: result.quiz_title.clone(),
                    percentage: result.percentage(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_taken == 0
    }
}

fn short_title(title: &str) -> String {
    if title.chars().count() <= SHORT_TITLE_LEN {
        return title.to_string();
    }

    let mut short: String = title.chars().take(SHORT_TITLE_LEN).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{new_id, now};

    fn result(title: &str, score: usize, total_questions: usize) -> QuizResult {
        QuizResult {
            id: new_id(),
            quiz_id: new_id(),
            quiz_title: title.to_string(),
            score,
            total_questions,
            date: now(),
        }
    }

    #[test]
    fn aggregates_results() {
        let stats = SessionStats::from_results(&[
            result("Capitals", 5, 5),
            result("European rivers and lakes", 1, 5),
        ]);

        assert_eq!(stats.total_taken, 2);
        assert_eq!(stats.overall_accuracy, 60);
        assert_eq!(stats.perfect_scores, 1);
        assert_eq!(
            stats.history,
            vec![
                HistoryEntry {
                    name: "Capitals".to_string(),
                    full_title: "Capitals".to_string(),
                    percentage: 100,
                },
                HistoryEntry {
                    name: "European rivers...".to_string(),
                    full_title: "European rivers and lakes".to_string(),
                    percentage: 20,
                },
            ]
        );
    }

    #[test]
    fn empty_results_have_zero_accuracy() {
        let stats = SessionStats::from_results(&[]);

        assert!(stats.is_empty());
        assert_eq!(stats.overall_accuracy, 0);
        assert!(stats.history.is_empty());
    }
}
