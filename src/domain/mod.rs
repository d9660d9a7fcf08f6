pub mod calendar_grid;
pub mod event_index;
pub mod models;
