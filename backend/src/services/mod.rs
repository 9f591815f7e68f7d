pub mod congrats_service;
pub mod history_service;
pub mod slice_service;
