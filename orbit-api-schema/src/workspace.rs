pub mod create;
pub mod list;

/// Both workspace procedures live on this path; the method selects the operation.
pub const WORKSPACE_PATH: &str = "/workspace";
