pub mod error;
pub mod event;
pub mod protocol;
pub mod record;
pub mod reporter;
pub mod state;
