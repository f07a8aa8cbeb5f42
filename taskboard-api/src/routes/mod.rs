/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh, me)
/// - `boards`: Board listing, creation, seeding, detail, and deletion
/// - `columns`: Column creation
/// - `labels`: Label creation
/// - `tasks`: Task creation, deletion, and batch reorder

pub mod auth;
pub mod boards;
pub mod columns;
pub mod health;
pub mod labels;
pub mod tasks;
