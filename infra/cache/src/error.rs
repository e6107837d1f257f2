use std::borrow::Cow;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error{}: {source}", format_context(.context))]
    Redis {
        #[source]
        source: redis::RedisError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },
}

impl From<redis::RedisError> for CacheError {
    fn from(source: redis::RedisError) -> Self {
        Self::Redis { source, context: None }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization { source, context: None }
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
