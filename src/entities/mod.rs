//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod achievement;
pub mod audit_log;
pub mod family;
pub mod family_member;
pub mod ledger;
pub mod points_ledger;
pub mod product;
pub mod reminder;
pub mod risk_assessment;
pub mod task;
pub mod transaction;
pub mod user;
pub mod user_achievement;
pub mod user_task;

// Re-export specific types to avoid conflicts
pub use achievement::{Entity as Achievement, Model as AchievementModel};
pub use audit_log::{Entity as AuditLog, Model as AuditLogModel};
pub use family::{Entity as Family, Model as FamilyModel};
pub use family_member::{Entity as FamilyMember, Model as FamilyMemberModel};
pub use ledger::{Entity as Ledger, Model as LedgerModel};
pub use points_ledger::{Entity as PointsLedger, Model as PointsLedgerModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use reminder::{Entity as Reminder, Model as ReminderModel};
pub use risk_assessment::{Entity as RiskAssessment, Model as RiskAssessmentModel};
pub use task::{Entity as Task, Model as TaskModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user::{Entity as User, Model as UserModel};
pub use user_achievement::{Entity as UserAchievement, Model as UserAchievementModel};
pub use user_task::{Entity as UserTask, Model as UserTaskModel};
