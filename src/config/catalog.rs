//! Seed catalog loading from config.toml
//!
//! The catalog lists the incentive tasks, achievements and financial products the
//! service ships with. Seeding is idempotent: rows are matched by `code` and only
//! missing codes are inserted, so editing `config.toml` and restarting adds new
//! entries without touching existing ones.

use crate::{
    entities::{Achievement, Product, Task, User, achievement, product, task, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Id of the seeded demo user every request acts as by default.
pub const DEMO_USER_ID: i64 = 1;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Catalog {
    /// Incentive tasks
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    /// One-time achievements
    #[serde(default)]
    pub achievements: Vec<AchievementConfig>,
    /// Financial products available for recommendation
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Configuration for a single task
#[derive(Debug, Deserialize, Clone)]
pub struct TaskConfig {
    /// Stable code, e.g. `ADD_TRANSACTION`
    pub code: String,
    /// Display title
    pub title: String,
    /// Points granted on claim
    pub points: i64,
    /// Progress required
    #[serde(default = "default_target")]
    pub target: i32,
    /// Resets every calendar day
    #[serde(default)]
    pub daily: bool,
}

const fn default_target() -> i32 {
    1
}

/// Configuration for a single achievement
#[derive(Debug, Deserialize, Clone)]
pub struct AchievementConfig {
    /// Stable code, e.g. `FIRST_STEP`
    pub code: String,
    /// Display title
    pub title: String,
    /// Description shown when unlocked
    pub description: String,
}

/// Configuration for a single financial product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Stable code
    pub code: String,
    /// Display name
    pub name: String,
    /// 1 (lowest) to 5 (highest)
    pub risk_level: i32,
    /// Expected annual return as a fraction
    pub expected_return: f64,
    /// Minimum purchase in minor units
    #[serde(default)]
    pub min_amount: i64,
    /// Short description
    #[serde(default)]
    pub description: String,
}

/// Loads the catalog from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load catalog from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file {}: {e}", path_ref.display()),
    })?;
    parse_catalog(&contents)
}

/// Parses catalog TOML.
pub fn parse_catalog(contents: &str) -> Result<Catalog> {
    let catalog: Catalog = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog: {e}"),
    })?;

    if let Some(product) = catalog
        .products
        .iter()
        .find(|p| !(1..=5).contains(&p.risk_level))
    {
        return Err(Error::Config {
            message: format!(
                "Product {} has risk_level {} (expected 1..=5)",
                product.code, product.risk_level
            ),
        });
    }

    Ok(catalog)
}

impl Catalog {
    /// Inserts every task, achievement and product whose code is not yet present.
    ///
    /// Returns the number of rows inserted.
    pub async fn seed(&self, db: &DatabaseConnection) -> Result<usize> {
        let mut inserted = 0;

        for cfg in &self.tasks {
            let exists = Task::find()
                .filter(task::Column::Code.eq(cfg.code.as_str()))
                .one(db)
                .await?
                .is_some();
            if !exists {
                task::ActiveModel {
                    code: Set(cfg.code.clone()),
                    title: Set(cfg.title.clone()),
                    points: Set(cfg.points),
                    target: Set(cfg.target),
                    daily: Set(cfg.daily),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                inserted += 1;
            }
        }

        for cfg in &self.achievements {
            let exists = Achievement::find()
                .filter(achievement::Column::Code.eq(cfg.code.as_str()))
                .one(db)
                .await?
                .is_some();
            if !exists {
                achievement::ActiveModel {
                    code: Set(cfg.code.clone()),
                    title: Set(cfg.title.clone()),
                    description: Set(cfg.description.clone()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                inserted += 1;
            }
        }

        for cfg in &self.products {
            let exists = Product::find()
                .filter(product::Column::Code.eq(cfg.code.as_str()))
                .one(db)
                .await?
                .is_some();
            if !exists {
                product::ActiveModel {
                    code: Set(cfg.code.clone()),
                    name: Set(cfg.name.clone()),
                    risk_level: Set(cfg.risk_level),
                    expected_return: Set(cfg.expected_return),
                    min_amount: Set(cfg.min_amount),
                    description: Set(cfg.description.clone()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
                inserted += 1;
            }
        }

        info!("Catalog seeding inserted {inserted} rows");
        Ok(inserted)
    }
}

/// Creates the demo user if it does not exist yet.
pub async fn seed_demo_user(db: &DatabaseConnection) -> Result<user::Model> {
    if let Some(existing) = User::find_by_id(DEMO_USER_ID).one(db).await? {
        return Ok(existing);
    }

    let demo = user::ActiveModel {
        id: Set(DEMO_USER_ID),
        name: Set("demo".to_string()),
        points: Set(0),
        created_at: Set(chrono::Utc::now()),
    };
    Ok(demo.insert(db).await?)
}
