use std::fmt::Debug;

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use uuid::Uuid;

use super::json_error;
use crate::cache::WebViewCache;
use crate::compiler::Compiler;
use crate::compiler::SendMode;
use crate::store::Store;
use crate::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ViewError {
    #[error("Newsletter not found")]
    NotFound,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for ViewError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ViewError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::NotFound => json_error(self.status_code(), "Newsletter not found"),
            Self::Unexpected(_) => json_error(self.status_code(), "Something went wrong"),
        }
    }
}

/// `GET /newsletters/{id}/view`
///
/// Public "view in browser" page. Drafts are not visible.
#[tracing::instrument(name = "Viewing newsletter", skip(store, compiler, web_views))]
pub async fn view_newsletter(
    newsletter_id: web::Path<Uuid>,
    store: web::Data<dyn Store>,
    compiler: web::Data<Compiler>,
    web_views: web::Data<WebViewCache>,
) -> Result<HttpResponse, ViewError> {
    let newsletter_id = newsletter_id.into_inner();

    let html = match web_views.get(&newsletter_id) {
        Some(html) => html,
        None => {
            let newsletter = store
                .published_newsletter(newsletter_id)
                .await?
                .ok_or(ViewError::NotFound)?;
            let email = compiler.compile(&newsletter.content, &SendMode::Live);
            web_views.insert(newsletter_id, email.html)
        }
    };

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(html.as_str().to_owned()))
}
