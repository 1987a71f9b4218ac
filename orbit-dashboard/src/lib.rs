pub mod create_dialog;
pub mod mutation;
pub mod query;
pub mod toast;
