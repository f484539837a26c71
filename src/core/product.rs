//! Product business logic - Recommends financial products for a risk level.
//!
//! Products come from the seed catalog and are read-only at runtime.

use crate::{
    core::risk,
    entities::{Product, product},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;

/// Level used for users who never submitted an assessment.
pub const DEFAULT_RISK_LEVEL: i32 = 1;

/// Products suited to the user and the level they were picked for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    /// Risk level used for filtering
    pub risk_level: i32,
    /// Label of `risk_level`
    pub label: &'static str,
    /// Whether the level came from a submitted assessment
    pub assessed: bool,
    /// Matching products, highest expected return first
    pub products: Vec<product::Model>,
}

/// Retrieves every product at or below `risk_level`, highest expected return first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn products_up_to_level(
    db: &DatabaseConnection,
    risk_level: i32,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::RiskLevel.lte(risk_level))
        .order_by_desc(product::Column::ExpectedReturn)
        .order_by_asc(product::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Recommends products for the user's latest assessed level.
pub async fn recommend(db: &DatabaseConnection, user_id: i64) -> Result<Recommendations> {
    let assessed_level = risk::latest_level(db, user_id).await?;
    let risk_level = assessed_level.unwrap_or(DEFAULT_RISK_LEVEL);

    Ok(Recommendations {
        risk_level,
        label: risk::level_label(risk_level),
        assessed: assessed_level.is_some(),
        products: products_up_to_level(db, risk_level).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::risk::QUESTIONS, test_utils::*};
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_unassessed_user_gets_lowest_risk() -> Result<()> {
        let db = setup_test_db().await?;
        let recs = recommend(&db, DEMO_USER).await?;

        assert_eq!(recs.risk_level, 1);
        assert!(!recs.assessed);
        assert_eq!(recs.products.len(), 1);
        assert_eq!(recs.products[0].code, "MMF");
        Ok(())
    }

    #[tokio::test]
    async fn test_recommendations_follow_assessment() -> Result<()> {
        let db = setup_test_db().await?;
        let started = risk::start_assessment(&db, DEMO_USER, Utc::now()).await?;
        let answers: BTreeMap<String, String> = QUESTIONS
            .iter()
            .map(|q| (q.id.to_string(), "C".to_string()))
            .collect();
        risk::submit_assessment(&db, DEMO_USER, started.assessment_id, answers, Utc::now())
            .await?;

        let recs = recommend(&db, DEMO_USER).await?;
        assert_eq!(recs.risk_level, 4);
        assert!(recs.assessed);
        let codes: Vec<_> = recs.products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["EQUITY", "BOND", "MMF"]);
        Ok(())
    }
}
