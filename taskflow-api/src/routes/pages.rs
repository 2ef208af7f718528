/// Server-rendered pages
///
/// Templates live under `templates/pages/` and are compiled in by Askama. The
/// pages are thin shells: the scripts in `WEB_DIR/js` talk to the JSON API.

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    Extension,
};
use taskflow_shared::{
    auth::middleware::{unauthenticated_response, AuthContext, RequestSurface},
    models::User,
};

use crate::{app::AppState, error::ApiResult};

/// Landing page.
#[derive(Template)]
#[template(path = "pages/index.html")]
struct IndexPage;

/// Login, registration and code verification.
#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginPage;

/// The task board.
#[derive(Template)]
#[template(path = "pages/tasks.html")]
struct TasksPage<'a> {
    first_name: &'a str,
    last_name: &'a str,
}

pub async fn index() -> ApiResult<Html<String>> {
    Ok(Html(IndexPage.render()?))
}

pub async fn login() -> ApiResult<Html<String>> {
    Ok(Html(LoginPage.render()?))
}

/// Renders the board for the signed-in user.
///
/// A valid token whose user no longer exists is sent back to the login page.
pub async fn tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Response> {
    let Some(user) = User::find_by_id(&state.db, auth.user_id).await? else {
        tracing::info!(user_id = auth.user_id, "Token for a deleted user, redirecting to login");
        return Ok(unauthenticated_response(RequestSurface::Page));
    };

    let page = TasksPage {
        first_name: user.first_name.as_deref().unwrap_or_default(),
        last_name: user.last_name.as_deref().unwrap_or_default(),
    };

    Ok(Html(page.render()?).into_response())
}
