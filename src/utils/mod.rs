pub mod activity_log;
pub mod api_response;
pub mod lifecycle;
pub mod reminders;
pub mod undo;
