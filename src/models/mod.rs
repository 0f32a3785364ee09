//! Data models for Bookshelf

pub mod book;
pub mod user;

// Re-export commonly used types
pub use book::{AuthorCount, Book, BookPage, BookQuery, CreateBook, ListParams, UpdateBook};
pub use user::{LoginRequest, RegisterRequest, TokenClaims};
