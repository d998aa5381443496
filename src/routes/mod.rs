mod auth;
mod books;
mod health_check;

pub use auth::{
    get_all_users, get_current_user, login, logout, refresh_token, signup, AccessTokenResponse,
    LoginRequest, LoginResponse, MessageResponse, REFRESH_TOKEN_COOKIE,
};
pub use books::{create_book, delete_book, get_book, list_books, update_book};
pub use health_check::health_check;
