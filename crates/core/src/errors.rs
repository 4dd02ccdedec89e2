use thiserror::Error;

use crate::domain::filter::FilterError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("upstream catalog responded with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("upstream catalog unreachable: {0}")]
    Transport(String),
    #[error("malformed catalog payload: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("internal failure: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("upstream failure ({status}): {message}")]
    Upstream { status: u16, message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Upstream { status, .. } => *status,
            Self::ServiceUnavailable { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Upstream { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Upstream { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn status_code(&self) -> u16 {
        InterfaceError::from(self.clone()).status_code()
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Upstream { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Filter(_) => Self::BadRequest { message, correlation_id },
            ApplicationError::Catalog(CatalogError::Upstream { status, .. }) => {
                Self::Upstream { status, message, correlation_id }
            }
            ApplicationError::Catalog(CatalogError::Transport(_)) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Catalog(CatalogError::Malformed(_))
            | ApplicationError::Internal(_) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, CatalogError, InterfaceError};
    use crate::domain::filter::FilterError;

    #[test]
    fn application_error_reports_its_http_status() {
        let error = ApplicationError::from(CatalogError::Transport("connection refused".to_owned()));

        assert_eq!(error.status_code(), 503);
        assert!(error.detail().contains("connection refused"));
        assert_eq!(ApplicationError::Internal("boom".to_owned()).status_code(), 500);
    }

    #[test]
    fn upstream_status_is_passed_through() {
        let error = ApplicationError::from(CatalogError::Upstream {
            status: 503,
            message: "Service Unavailable".to_owned(),
        })
        .into_interface("req-1");

        assert_eq!(error.status_code(), 503);
        assert!(error.detail().contains("Service Unavailable"));
        assert_eq!(error.correlation_id(), "req-1");
    }

    #[test]
    fn malformed_price_range_is_a_client_error() {
        let error: InterfaceError =
            ApplicationError::from(FilterError::InvalidPriceRange("abc".to_owned())).into();
        assert_eq!(error.status_code(), 400);
        assert!(error.detail().contains("abc"));
    }

    #[test]
    fn transport_and_payload_failures_map_to_server_errors() {
        let transport: InterfaceError =
            ApplicationError::from(CatalogError::Transport("dns".to_owned())).into();
        let malformed: InterfaceError =
            ApplicationError::from(CatalogError::Malformed("eof".to_owned())).into();
        let internal: InterfaceError = ApplicationError::Internal("boom".to_owned()).into();

        assert_eq!(transport.status_code(), 503);
        assert_eq!(malformed.status_code(), 500);
        assert_eq!(internal.status_code(), 500);
        assert!(internal.detail().contains("boom"));
    }
}
