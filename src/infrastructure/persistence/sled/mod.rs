//! Sled 持久化实现

mod project_store;

pub use project_store::{SledProjectStore, CURRENT_PROJECT_KEY, PROJECTS_KEY, THEME_KEY};
