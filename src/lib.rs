pub mod candidates;
pub mod cli;
pub mod engine;
pub mod gemfile;
pub mod lockfile;
pub mod model;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod selection;
pub mod update;
pub mod version;
pub mod workspace;
pub mod writer;
