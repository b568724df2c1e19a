use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required setting '{key}' (set it in the config file or via {env})")]
    Missing { key: &'static str, env: &'static str },

    #[error("invalid setting '{key}': {message}")]
    Invalid { key: String, message: String },

    #[error("domain error: {0}")]
    Domain(#[from] tplcheck_domain::DomainError),
}
