pub mod config;
pub mod logging;

pub mod artifact;
pub mod bucket;
pub mod checksum;
pub mod downloader;
pub mod manifest;
pub mod updater;
