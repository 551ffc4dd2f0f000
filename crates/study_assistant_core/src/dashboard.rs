//! crates/study_assistant_core/src/dashboard.rs
//!
//! Progress statistics derived from the full attempt log. Nothing is cached;
//! callers recompute whenever the log changes.

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::QuizAttempt;

pub const STRENGTH_THRESHOLD: f64 = 80.0;
pub const WEAKNESS_THRESHOLD: f64 = 60.0;
const MAX_LISTED_TOPICS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
    /// Percentage of correct results, `0..=100`.
    pub performance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_quizzes: usize,
    /// Mean of per-attempt percentages. Zero when there are no attempts.
    pub average_score: f64,
    /// Every topic seen, in first-seen order.
    pub topics: Vec<TopicPerformance>,
    /// Up to three topics at or above 80%, best first.
    pub strengths: Vec<TopicPerformance>,
    /// Up to three topics at or below 60%, worst first.
    pub weaknesses: Vec<TopicPerformance>,
}

fn attempt_percentage(attempt: &QuizAttempt) -> f64 {
    if attempt.total_questions == 0 {
        return 0.0;
    }
    attempt.score as f64 * 100.0 / attempt.total_questions as f64
}

/// Aggregates the attempt log into dashboard statistics.
pub fn summarize(attempts: &[QuizAttempt]) -> ProgressSummary {
    let total_quizzes = attempts.len();
    let average_score = if total_quizzes == 0 {
        0.0
    } else {
        attempts.iter().map(attempt_percentage).sum::<f64>() / total_quizzes as f64
    };

    // Topics are free text and compared verbatim.
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u32, u32)> = Vec::new();
    for result in attempts.iter().flat_map(|a| &a.results) {
        let slot = *index.entry(result.topic.as_str()).or_insert_with(|| {
            counts.push((result.topic.as_str(), 0, 0));
            counts.len() - 1
        });
        let (_, correct, total) = &mut counts[slot];
        if result.is_correct {
            *correct += 1;
        }
        *total += 1;
    }

    let topics: Vec<TopicPerformance> = counts
        .into_iter()
        .map(|(topic, correct, total)| TopicPerformance {
            topic: topic.to_string(),
            correct,
            total,
            performance: correct as f64 * 100.0 / total as f64,
        })
        .collect();

    let mut strengths: Vec<TopicPerformance> = topics
        .iter()
        .filter(|t| t.performance >= STRENGTH_THRESHOLD)
        .cloned()
        .collect();
    strengths.sort_by(|a, b| b.performance.total_cmp(&a.performance));
    strengths.truncate(MAX_LISTED_TOPICS);

    let mut weaknesses: Vec<TopicPerformance> = topics
        .iter()
        .filter(|t| t.performance <= WEAKNESS_THRESHOLD)
        .cloned()
        .collect();
    weaknesses.sort_by(|a, b| a.performance.total_cmp(&b.performance));
    weaknesses.truncate(MAX_LISTED_TOPICS);

    ProgressSummary {
        total_quizzes,
        average_score,
        topics,
        strengths,
        weaknesses,
    }
}
