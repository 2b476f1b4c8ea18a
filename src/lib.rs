pub mod app;
pub mod clock;
pub mod config;
pub mod feedback;
pub mod images;
pub mod meal_type;
pub mod menu;
pub mod photos;
pub mod state;
pub mod storage;
