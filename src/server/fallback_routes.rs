use axum::extract::State;
use axum::http::Uri;
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::Router;
use tracing::debug;

use crate::server::server::AppState;
use crate::utils::constants::NOT_FOUND_PATH;

const NOT_FOUND_HTML: &str = r#"<html>
    <head>
        <title>404 Not Found</title>
    </head>
    <body>
        <h1>404 Not Found</h1>
        <p>The requested resource could not be found.</p>
    </body>
</html>
"#;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(to_frontend))
        .route(NOT_FOUND_PATH, get(not_found))
        .fallback(to_not_found)
}

async fn to_frontend(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.server.frontend_url)
}

async fn not_found() -> Html<&'static str> {
    Html(NOT_FOUND_HTML)
}

async fn to_not_found(uri: Uri) -> Redirect {
    debug!("unmatched route '{}'", uri.path());
    Redirect::temporary(NOT_FOUND_PATH)
}
