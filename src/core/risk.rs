//! Risk assessment business logic - A fixed questionnaire scored into five levels.

use crate::{
    core::incentive::{self, SideEffect},
    entities::{RiskAssessment, risk_assessment, risk_assessment::AssessmentStatus},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// One selectable answer.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnswerOption {
    /// Option key, e.g. "A"
    pub key: &'static str,
    /// Display text
    pub text: &'static str,
    /// Points added to the total
    pub score: i32,
}

/// One questionnaire item.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Question {
    /// Question id, e.g. "q1"
    pub id: &'static str,
    /// Display text
    pub text: &'static str,
    /// Allowed answers
    pub options: &'static [AnswerOption],
}

const fn option(key: &'static str, text: &'static str, score: i32) -> AnswerOption {
    AnswerOption { key, text, score }
}

/// The questionnaire every assessment uses.
pub const QUESTIONS: &[Question] = &[
    Question {
        id: "q1",
        text: "How long do you plan to keep this money invested?",
        options: &[
            option("A", "Less than 1 year", 1),
            option("B", "1 to 3 years", 2),
            option("C", "3 to 5 years", 3),
            option("D", "More than 5 years", 4),
        ],
    },
    Question {
        id: "q2",
        text: "Your portfolio drops 20% in a month. What do you do?",
        options: &[
            option("A", "Sell everything", 1),
            option("B", "Sell some", 2),
            option("C", "Hold", 3),
            option("D", "Buy more", 4),
        ],
    },
    Question {
        id: "q3",
        text: "How much investing experience do you have?",
        options: &[
            option("A", "None", 1),
            option("B", "Deposits and money market funds", 2),
            option("C", "Bond and balanced funds", 3),
            option("D", "Stocks or equity funds", 4),
        ],
    },
    Question {
        id: "q4",
        text: "What share of your savings would this investment be?",
        options: &[
            option("A", "More than 75%", 1),
            option("B", "50% to 75%", 2),
            option("C", "25% to 50%", 3),
            option("D", "Less than 25%", 4),
        ],
    },
    Question {
        id: "q5",
        text: "Which goal fits you best?",
        options: &[
            option("A", "Protect what I have", 1),
            option("B", "Steady income", 2),
            option("C", "Balanced growth", 3),
            option("D", "Maximum growth", 4),
        ],
    },
];

/// Display label for a risk level.
#[must_use]
pub const fn level_label(level: i32) -> &'static str {
    match level {
        ..=1 => "CONSERVATIVE",
        2 => "MODERATE",
        3 => "BALANCED",
        4 => "GROWTH",
        _ => "AGGRESSIVE",
    }
}

/// Maps a total score (5..=20) to a level (1..=5).
#[must_use]
pub const fn score_to_level(score: i32) -> i32 {
    match score {
        ..=7 => 1,
        8..=10 => 2,
        11..=13 => 3,
        14..=16 => 4,
        _ => 5,
    }
}

/// A started assessment and the questions to answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStarted {
    /// Id to submit against
    pub assessment_id: i64,
    /// Questionnaire
    pub questions: &'static [Question],
}

/// Outcome of a submitted assessment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    /// Assessment id
    pub assessment_id: i64,
    /// Total score
    pub score: i32,
    /// Level 1..=5
    pub level: i32,
    /// Label for `level`
    pub label: &'static str,
    /// `RISK_ASSESSMENT` task completion
    pub task: SideEffect,
}

/// Scores a full set of answers.
///
/// # Errors
/// Returns [`Error::Validation`] naming the first unanswered question or invalid option.
pub fn score_answers(answers: &BTreeMap<String, String>) -> Result<i32> {
    QUESTIONS.iter().try_fold(0, |total, question| {
        let answer = answers
            .get(question.id)
            .ok_or_else(|| Error::validation(format!("question {} is unanswered", question.id)))?;
        let chosen = question
            .options
            .iter()
            .find(|o| o.key.eq_ignore_ascii_case(answer.trim()))
            .ok_or_else(|| {
                Error::validation(format!(
                    "'{answer}' is not a valid answer to {}",
                    question.id
                ))
            })?;
        Ok(total + chosen.score)
    })
}

/// Opens a new IN_PROGRESS assessment.
pub async fn start_assessment(
    db: &DatabaseConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<AssessmentStarted> {
    let assessment = risk_assessment::ActiveModel {
        user_id: Set(user_id),
        status: Set(AssessmentStatus::InProgress),
        answers: Set(None),
        score: Set(None),
        level: Set(None),
        created_at: Set(now),
        submitted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(AssessmentStarted {
        assessment_id: assessment.id,
        questions: QUESTIONS,
    })
}

/// Scores and stores the answers, then completes the `RISK_ASSESSMENT` task.
///
/// # Errors
/// * [`Error::NotFound`] if the assessment does not exist or belongs to someone else
/// * [`Error::Validation`] if it was already submitted or the answers are incomplete
pub async fn submit_assessment(
    db: &DatabaseConnection,
    user_id: i64,
    assessment_id: i64,
    answers: BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Result<AssessmentResult> {
    let assessment = RiskAssessment::find_by_id(assessment_id)
        .filter(risk_assessment::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("RiskAssessment", assessment_id))?;

    if assessment.status == AssessmentStatus::Submitted {
        return Err(Error::validation(format!(
            "assessment {assessment_id} was already submitted"
        )));
    }

    let score = score_answers(&answers)?;
    let level = score_to_level(score);

    let mut active: risk_assessment::ActiveModel = assessment.into();
    active.status = Set(AssessmentStatus::Submitted);
    active.answers = Set(Some(serde_json::to_string(&answers)?));
    active.score = Set(Some(score));
    active.level = Set(Some(level));
    active.submitted_at = Set(Some(now));
    active.update(db).await?;

    info!(user_id, assessment_id, score, level, "risk assessment submitted");
    let task =
        incentive::complete_task_best_effort(db, user_id, incentive::RISK_ASSESSMENT, now).await;

    Ok(AssessmentResult {
        assessment_id,
        score,
        level,
        label: level_label(level),
        task,
    })
}

/// Level of the user's most recent submitted assessment.
pub async fn latest_level(db: &DatabaseConnection, user_id: i64) -> Result<Option<i32>> {
    Ok(RiskAssessment::find()
        .filter(risk_assessment::Column::UserId.eq(user_id))
        .filter(risk_assessment::Column::Status.eq(AssessmentStatus::Submitted))
        .order_by_desc(risk_assessment::Column::SubmittedAt)
        .order_by_desc(risk_assessment::Column::Id)
        .one(db)
        .await?
        .and_then(|a| a.level))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn answers(key: &str) -> BTreeMap<String, String> {
        QUESTIONS
            .iter()
            .map(|q| (q.id.to_string(), key.to_string()))
            .collect()
    }

    #[test]
    fn test_score_to_level_bounds() {
        assert_eq!(score_to_level(5), 1);
        assert_eq!(score_to_level(8), 2);
        assert_eq!(score_to_level(13), 3);
        assert_eq!(score_to_level(14), 4);
        assert_eq!(score_to_level(20), 5);
        assert_eq!(level_label(3), "BALANCED");
    }

    #[test]
    fn test_score_answers() {
        assert_eq!(score_answers(&answers("A")).unwrap(), 5);
        assert_eq!(score_answers(&answers("d")).unwrap(), 20);

        let mut partial = answers("B");
        partial.remove("q3");
        assert!(matches!(score_answers(&partial), Err(Error::Validation { .. })));

        let mut invalid = answers("B");
        invalid.insert("q1".to_string(), "Z".to_string());
        assert!(matches!(score_answers(&invalid), Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_submit_assessment() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(latest_level(&db, DEMO_USER).await?, None);

        let started = start_assessment(&db, DEMO_USER, Utc::now()).await?;
        assert_eq!(started.questions.len(), 5);

        let result =
            submit_assessment(&db, DEMO_USER, started.assessment_id, answers("C"), Utc::now())
                .await?;
        assert_eq!(result.score, 15);
        assert_eq!(result.level, 4);
        assert_eq!(result.label, "GROWTH");
        assert_eq!(result.task, SideEffect::Applied);
        assert_eq!(latest_level(&db, DEMO_USER).await?, Some(4));

        let again =
            submit_assessment(&db, DEMO_USER, started.assessment_id, answers("C"), Utc::now())
                .await;
        assert!(matches!(again, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_unknown_assessment() -> Result<()> {
        let db = setup_test_db().await?;
        let result = submit_assessment(&db, DEMO_USER, 42, answers("A"), Utc::now()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }
}
