/// Book Routes
///
/// Reads are public. Writes go through the access-token gate and then the
/// role gate: create/update for `user` and `admin`, delete for `admin`.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::{require_role, Claims, Role, SessionService};
use crate::books::{BookCreate, BookRepository, BookUpdate};
use crate::error::{AppError, DatabaseError};

const WRITERS: &[Role] = &[Role::User, Role::Admin];
const DELETERS: &[Role] = &[Role::Admin];

fn book_not_found() -> AppError {
    AppError::Database(DatabaseError::NotFound("Book not found".to_string()))
}

async fn authorize(claims: &Claims, session: &SessionService, allowed: &[Role]) -> Result<(), AppError> {
    let user = session.current_user(claims).await?;
    require_role(user.role, allowed)?;
    Ok(())
}

/// GET /api/v1/books
pub async fn list_books(books: web::Data<dyn BookRepository>) -> Result<HttpResponse, AppError> {
    let books = books.list().await?;
    Ok(HttpResponse::Ok().json(books))
}

/// GET /api/v1/books/{book_id}
pub async fn get_book(
    path: web::Path<Uuid>,
    books: web::Data<dyn BookRepository>,
) -> Result<HttpResponse, AppError> {
    let book = books.get(path.into_inner()).await?.ok_or_else(book_not_found)?;
    Ok(HttpResponse::Ok().json(book))
}

/// POST /api/v1/books
pub async fn create_book(
    form: web::Json<BookCreate>,
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
    books: web::Data<dyn BookRepository>,
) -> Result<HttpResponse, AppError> {
    authorize(&claims, &session, WRITERS).await?;

    let book = books.create(form.into_inner().validate()?).await?;
    tracing::info!(book_id = %book.uid, user_id = %claims.sub, "Book created");

    Ok(HttpResponse::Created().json(book))
}

/// PATCH /api/v1/books/{book_id}
pub async fn update_book(
    path: web::Path<Uuid>,
    form: web::Json<BookUpdate>,
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
    books: web::Data<dyn BookRepository>,
) -> Result<HttpResponse, AppError> {
    authorize(&claims, &session, WRITERS).await?;

    let book = books
        .update(path.into_inner(), form.into_inner().validate()?)
        .await?
        .ok_or_else(book_not_found)?;

    Ok(HttpResponse::Ok().json(book))
}

/// DELETE /api/v1/books/{book_id}
pub async fn delete_book(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
    books: web::Data<dyn BookRepository>,
) -> Result<HttpResponse, AppError> {
    authorize(&claims, &session, DELETERS).await?;

    let book_id = path.into_inner();
    if !books.delete(book_id).await? {
        return Err(book_not_found());
    }
    tracing::info!(book_id = %book_id, user_id = %claims.sub, "Book deleted");

    Ok(HttpResponse::NoContent().finish())
}
