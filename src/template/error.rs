use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Fatal render failures. Template-not-found is only returned here when the
/// loader has no not-found handler.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0:?} not found")]
    NotFound(String),

    #[error("failed to load template {name:?}")]
    Load {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("template {name:?} is not valid UTF-8")]
    Encoding { name: String },

    #[error("template error")]
    Template(#[from] tera::Error),
}

/// `error: cause: cause` rendering of a whole error chain
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Whether a render failed because the output sink did
pub(crate) fn is_write_failure(err: &tera::Error) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<io::Error>() {
            return true;
        }
        if let Some(tera_err) = e.downcast_ref::<tera::Error>() {
            if matches!(tera_err.kind, tera::ErrorKind::Io(_)) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_joins_causes() {
        let inner = tera::Error::msg("Variable `user` not found in context");
        let outer = tera::Error::chain("Failed to render 'index.html'", inner);
        assert_eq!(
            error_chain(&outer),
            "Failed to render 'index.html': Variable `user` not found in context"
        );
    }

    #[test]
    fn test_render_error_causes_listed_once() {
        let inner = tera::Error::msg("Variable `user` not found in context");
        let err = RenderError::from(tera::Error::chain("Failed to render 'index.html'", inner));
        assert_eq!(
            error_chain(&err),
            "template error: Failed to render 'index.html': Variable `user` not found in context"
        );

        let err = RenderError::Load {
            name: "a.html".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(error_chain(&err), "failed to load template \"a.html\": denied");
    }

    #[test]
    fn test_is_write_failure() {
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "client went away");
        let wrapped = tera::Error::chain("Failed to render 'a.html'", tera::Error::io_error(io));
        assert!(is_write_failure(&wrapped));
        assert!(!is_write_failure(&tera::Error::msg("syntax")));
    }
}
