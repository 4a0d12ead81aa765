use thiserror::Error;

/// Boxed cause carried by engine-facing errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the viewer session.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The render engine could not be constructed. The session cannot run.
    #[error("failed to initialize render engine: {0}")]
    EngineInit(#[source] BoxError),

    /// A synchronous engine or camera call failed while configuring the view.
    #[error("render engine call failed: {0}")]
    Engine(#[source] BoxError),

    /// Loading an asset failed. The previously displayed model stays current.
    #[error("failed to load asset from {url}: {source}")]
    AssetLoad {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("unknown model '{0}'")]
    UnknownModelKey(String),

    #[error("malformed host message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("failed to parse viewer configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid viewer configuration: {0}")]
    InvalidConfig(String),
}

impl ViewerError {
    pub(crate) fn asset_load(url: &str, source: anyhow::Error) -> Self {
        Self::AssetLoad {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn engine(source: anyhow::Error) -> Self {
        Self::Engine(source.into())
    }

    /// Returns `true` for errors the session recovers from without tearing down.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::EngineInit(_))
    }
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn asset_load_message_names_url_and_cause() {
        let err = ViewerError::asset_load("https://cdn/x.glb", anyhow!("HTTP 404"));
        assert_eq!(
            err.to_string(),
            "failed to load asset from https://cdn/x.glb: HTTP 404"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn engine_init_is_fatal() {
        let err = ViewerError::EngineInit(anyhow!("no canvas").into());
        assert!(!err.is_recoverable());
    }
}
