//! Data models for the library client

pub mod book;

pub use book::{Book, BookDraft};
