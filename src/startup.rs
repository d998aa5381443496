use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use actix_web::dev::Server;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthGate, SessionService};
use crate::books::BookRepository;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::TokenGate;
use crate::routes::{
    create_book, delete_book, get_all_users, get_book, get_current_user, health_check, list_books,
    login, logout, refresh_token, signup, update_book,
};

pub const API_PREFIX: &str = "/api/v1";

/// Build and start the HTTP server on `listener`.
///
/// All state is injected: the session service, the gate (sharing the same
/// codec and revocation store) and the book repository.
pub fn run(
    listener: TcpListener,
    session: SessionService,
    gate: AuthGate,
    books: Arc<dyn BookRepository>,
) -> Result<Server, std::io::Error> {
    let session = web::Data::new(session);
    let books: web::Data<dyn BookRepository> = web::Data::from(books);

    let server = HttpServer::new(move || {
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(ValidationError::InvalidFormat(err.to_string())).into()
        });

        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())

            // Shared state
            .app_data(json_config)
            .app_data(session.clone())
            .app_data(books.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope(API_PREFIX)
                    .service(
                        web::scope("/auth")
                            // Public
                            .route("/signup", web::post().to(signup))
                            .route("/login", web::post().to(login))
                            // Refresh token required
                            .service(
                                web::resource("/refresh_token")
                                    .wrap(TokenGate::refresh(gate.clone()))
                                    .route(web::get().to(refresh_token)),
                            )
                            // Access token required
                            .service(
                                web::resource("/logout")
                                    .wrap(TokenGate::access(gate.clone()))
                                    .route(web::get().to(logout)),
                            )
                            .service(
                                web::resource("/me")
                                    .wrap(TokenGate::access(gate.clone()))
                                    .route(web::get().to(get_current_user)),
                            )
                            .service(
                                web::resource("/all_users")
                                    .wrap(TokenGate::access(gate.clone()))
                                    .route(web::get().to(get_all_users)),
                            ),
                    )
                    .service(
                        // Writes are matched first by method guard; reads fall through
                        web::scope("/books")
                            .service(
                                web::resource("")
                                    .guard(guard::Post())
                                    .wrap(TokenGate::access(gate.clone()))
                                    .route(web::post().to(create_book)),
                            )
                            .service(web::resource("").route(web::get().to(list_books)))
                            .service(
                                web::resource("/{book_id}")
                                    .guard(guard::Any(guard::Patch()).or(guard::Delete()))
                                    .wrap(TokenGate::access(gate.clone()))
                                    .route(web::patch().to(update_book))
                                    .route(web::delete().to(delete_book)),
                            )
                            .service(web::resource("/{book_id}").route(web::get().to(get_book))),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
