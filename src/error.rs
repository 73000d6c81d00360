pub type KinemaResult<T> = Result<T, KinemaError>;

#[derive(thiserror::Error, Debug)]
pub enum KinemaError {
    #[error("config error: {0}")]
    Config(String),

    #[error("action error: {0}")]
    Action(String),

    #[error("node error: {0}")]
    Node(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinemaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn action(msg: impl Into<String>) -> Self {
        Self::Action(msg.into())
    }

    pub fn node(msg: impl Into<String>) -> Self {
        Self::Node(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(KinemaError::config("x").to_string().contains("config error:"));
        assert!(KinemaError::action("x").to_string().contains("action error:"));
        assert!(KinemaError::node("x").to_string().contains("node error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = KinemaError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
