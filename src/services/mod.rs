pub mod capture_service;
pub mod gallery_service;
pub mod worker;

pub use capture_service::{save_capture, CaptureRequest, IdSource};
pub use worker::spawn_operation;
