pub mod bookmarks;
pub mod drill;
pub mod export;
pub mod import;
pub mod init_config;
pub mod migrate;
pub mod stats;
