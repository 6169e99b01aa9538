use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use bookstore_codec::Payload;
use bookstore_core::BookId;
use bookstore_infra::NewBook;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CurrentUser;
use crate::negotiation::Negotiated;

pub fn public_router() -> Router {
    Router::new().route("/books", get(list_books))
}

pub fn router() -> Router {
    Router::new()
        .route("/books", post(create_book))
        .route("/books/user", get(list_my_books))
        .route("/books/:id", get(get_book).put(update_book).delete(delete_book))
}

pub async fn list_books(
    Extension(services): Extension<Arc<AppServices>>,
    negotiated: Negotiated,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let page = match query.page_request() {
        Ok(page) => page,
        Err(e) => return errors::domain_error(e),
    };
    let search = query.search.as_deref().unwrap_or_default().trim();

    match services.books.search(search, page).await {
        Ok((rows, total)) => negotiated.respond(
            StatusCode::OK,
            "books",
            &dto::book_page_to_payload(&rows, page.summarize(total)),
        ),
        Err(e) => errors::store_error(e),
    }
}

pub async fn list_my_books(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let page = match query.page_request() {
        Ok(page) => page,
        Err(e) => return errors::domain_error(e),
    };

    match services.books.list_by_owner(current.user_id(), page).await {
        Ok((rows, total)) => negotiated.respond(
            StatusCode::OK,
            "books",
            &dto::book_page_to_payload(&rows, page.summarize(total)),
        ),
        Err(e) => errors::store_error(e),
    }
}

pub async fn create_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
    Json(body): Json<dto::CreateBookRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error(e);
    }

    let new_book = NewBook {
        title: body.title.trim().to_string(),
        description: body.description,
        cover_image: body.cover_image,
        price: body.price,
        owner: current.user_id(),
    };

    match services.books.insert(new_book).await {
        Ok(book) => {
            tracing::info!(book_id = %book.id, owner = %book.owner, "book created");
            negotiated.respond(StatusCode::CREATED, "book", &dto::book_to_payload(&book))
        }
        Err(e) => errors::store_error(e),
    }
}

pub async fn get_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BookId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error(e),
    };

    match services.books.get(current.user_id(), id).await {
        Ok(Some(book)) => negotiated.respond(StatusCode::OK, "book", &dto::book_to_payload(&book)),
        Ok(None) => book_not_found(id),
        Err(e) => errors::store_error(e),
    }
}

pub async fn update_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateBookRequest>,
) -> axum::response::Response {
    let id: BookId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error(e),
    };
    let changes = match body.into_changes() {
        Ok(changes) => changes,
        Err(e) => return errors::domain_error(e),
    };

    match services.books.update(current.user_id(), id, changes).await {
        Ok(true) => negotiated.respond(
            StatusCode::RESET_CONTENT,
            "book",
            &Payload::new().with("detail", "book updated successfully"),
        ),
        Ok(false) => book_not_found(id),
        Err(e) => errors::store_error(e),
    }
}

pub async fn delete_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    negotiated: Negotiated,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BookId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error(e),
    };

    match services.books.delete(current.user_id(), id).await {
        Ok(true) => negotiated.respond(StatusCode::NO_CONTENT, "book", &Payload::new()),
        Ok(false) => book_not_found(id),
        Err(e) => errors::store_error(e),
    }
}

fn book_not_found(id: BookId) -> axum::response::Response {
    errors::json_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("No book with this id: {id} found"),
    )
}
