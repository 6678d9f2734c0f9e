/// API routes and handlers
pub mod drops;
pub mod uploads;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(drops::routes()).merge(uploads::routes())
}
