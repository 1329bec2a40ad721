pub mod calendar;
pub mod chat;
pub mod cli;
pub mod core;
pub mod rag;
pub mod view;
