#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod collectors;
pub mod exporter;

#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
