#![allow(dead_code)]

pub mod bucket_server;
