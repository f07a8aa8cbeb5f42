/// Database models
///
/// Plain sqlx models for everything outside the reorder path. Each model
/// exposes associated functions in `Model::operation(&pool, ..)` form.
///
/// # Models
///
/// - `user`: accounts
/// - `board`: ownership root, seeding, and the full board view
/// - `column`: ordered lanes of a board
/// - `label`: board-scoped colored tags
/// - `task`: cards with label and assignee sets

pub mod board;
pub mod column;
pub mod label;
pub mod task;
pub mod user;
