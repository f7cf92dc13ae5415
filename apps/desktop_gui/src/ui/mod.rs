//! Pure presentation: maps the application state to one of four screens.

pub mod app;
