//! # mindmap-store
//!
//! SQLite persistence for the mind map service. The schema lives in
//! `migrations/` and is applied on connect.
//!
//! ```rust,ignore
//! let db = Database::connect("sqlite://mindmap.db?mode=rwc").await?;
//! let user = db.create_user(&new_user, Utc::now()).await?;
//! ```

mod db;
mod error;
mod mindmaps;
pub mod models;
mod sessions;
mod subscriptions;
mod users;

pub use db::Database;
pub use error::{Result, StoreError};
pub use models::{MindMap, MindMapSummary, NewMindMap, NewUser, Session, User};
pub use sessions::SESSION_TTL_DAYS;
