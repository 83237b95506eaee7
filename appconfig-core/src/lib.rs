//! App Configuration Core
//!
//! Provider framework shared by the App Configuration provider and CLI:
//! resources and their state, attribute schemas, diffing, and the Provider trait.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
