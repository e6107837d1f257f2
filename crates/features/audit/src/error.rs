use std::borrow::Cow;

/// Audit slice error type.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The audit file could not be read or appended to.
    #[error("Audit I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },
    /// A record could not be encoded, or a stored line could not be decoded.
    #[error("Audit serialization error{}: {source}", format_context(.context))]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },
    /// Subscribing to payment activity failed.
    #[error("Audit subscription error{}: {source}", format_context(.context))]
    Bus {
        #[source]
        source: qpay_event_bus::EventBusError,
        context: Option<Cow<'static, str>>,
    },
    /// A failed append could not be rolled back; the file may hold a partial line.
    #[error("Audit trail disabled{}: {message}", format_context(.context))]
    Disabled { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    /// The stored chain does not hash to the digests it carries.
    #[error("Audit chain broken{}: {message}", format_context(.context))]
    Tampered { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

pub(crate) trait AuditResultExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, AuditError>;
}

impl<T> AuditResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, AuditError> {
        self.map_err(|source| AuditError::Io { source, context: Some(context.into()) })
    }
}

impl<T> AuditResultExt<T> for Result<T, serde_json::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, AuditError> {
        self.map_err(|source| AuditError::Serialization { source, context: Some(context.into()) })
    }
}
