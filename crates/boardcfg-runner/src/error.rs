//! Error types for the command-line front end.

use std::io;
use std::path::PathBuf;

use boardcfg_agent::{ConfigureError, EngineError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("cannot read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported configuration file {0}: expected .json, .yaml or .yml")]
    UnknownFormat(PathBuf),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("{0}")]
    Configure(#[from] ConfigureError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
