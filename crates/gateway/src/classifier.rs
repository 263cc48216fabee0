//! Protocol error classification
//!
//! Maps gateway error codes to what they mean for the request they reference.
//! Only codes whose meaning is documented are mapped; anything else is
//! `Unclassified` and surfaces to the caller as a protocol error.

use std::collections::HashMap;

use tws_core::RequestId;

use crate::error::RequestError;

/// Non-failure notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// The order referenced by the id was cancelled
    OrderCancelled,
    /// Connectivity with the gateway's upstream was restored
    ConnectivityRestored,
    /// Data farm connection status change
    DataFarmStatus,
}

/// Failures scoped to a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidOrderType,
    AmbiguousContract,
}

/// Semantic meaning of an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Informational(Notice),
    RequestFailure(FailureKind),
    /// The order is already filled or cancelled; a cancel has nothing left to do
    AlreadyTerminal,
    /// The connection to the gateway is unusable; every pending request fails
    ConnectionFault,
    Unclassified,
}

/// Who an error applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Request(RequestId),
    Global,
}

/// Result of classifying one error event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: ErrorClass,
    pub scope: ErrorScope,
    pub code: i32,
    pub message: String,
}

impl Classification {
    /// The error a failed request is completed with, if this classification fails one
    pub fn request_error(&self) -> Option<RequestError> {
        let code = self.code;
        let message = self.message.clone();
        match self.class {
            ErrorClass::RequestFailure(FailureKind::InvalidOrderType) => {
                Some(RequestError::InvalidOrderType { code, message })
            }
            ErrorClass::RequestFailure(FailureKind::AmbiguousContract) => {
                Some(RequestError::AmbiguousContract { code, message })
            }
            ErrorClass::ConnectionFault => Some(RequestError::ConnectionLost {
                reason: format!("{} (code {})", message, code),
            }),
            ErrorClass::Unclassified => Some(RequestError::Protocol { code, message }),
            ErrorClass::Informational(_) | ErrorClass::AlreadyTerminal => None,
        }
    }
}

/// Code table lookup
///
/// Stateless apart from its table; extra codes can be mapped with
/// [`with_code`](Self::with_code) as the gateway documentation is worked through.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    table: HashMap<i32, ErrorClass>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        let mut table = HashMap::new();

        table.insert(202, ErrorClass::Informational(Notice::OrderCancelled));

        // order cannot be cancelled (already filled or cancelled)
        table.insert(161, ErrorClass::AlreadyTerminal);
        table.insert(10148, ErrorClass::AlreadyTerminal);

        table.insert(387, ErrorClass::RequestFailure(FailureKind::InvalidOrderType));
        table.insert(200, ErrorClass::RequestFailure(FailureKind::AmbiguousContract));

        // not connected, connectivity lost, socket port reset
        for code in [504, 1100, 1300] {
            table.insert(code, ErrorClass::ConnectionFault);
        }

        for code in [1101, 1102] {
            table.insert(code, ErrorClass::Informational(Notice::ConnectivityRestored));
        }
        for code in [2104, 2106, 2107, 2108, 2158] {
            table.insert(code, ErrorClass::Informational(Notice::DataFarmStatus));
        }

        Self { table }
    }

    /// Map (or remap) a code
    pub fn with_code(mut self, code: i32, class: ErrorClass) -> Self {
        self.table.insert(code, class);
        self
    }

    pub fn class_of(&self, code: i32) -> ErrorClass {
        self.table
            .get(&code)
            .copied()
            .unwrap_or(ErrorClass::Unclassified)
    }

    pub fn classify(
        &self,
        code: i32,
        request_id: Option<RequestId>,
        message: &str,
    ) -> Classification {
        Classification {
            class: self.class_of(code),
            scope: request_id.map_or(ErrorScope::Global, ErrorScope::Request),
            code,
            message: message.to_string(),
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let classifier = ErrorClassifier::new();
        assert_eq!(
            classifier.class_of(202),
            ErrorClass::Informational(Notice::OrderCancelled)
        );
        assert_eq!(classifier.class_of(161), ErrorClass::AlreadyTerminal);
        assert_eq!(
            classifier.class_of(387),
            ErrorClass::RequestFailure(FailureKind::InvalidOrderType)
        );
        assert_eq!(
            classifier.class_of(200),
            ErrorClass::RequestFailure(FailureKind::AmbiguousContract)
        );
        assert_eq!(classifier.class_of(1100), ErrorClass::ConnectionFault);
        assert_eq!(
            classifier.class_of(2104),
            ErrorClass::Informational(Notice::DataFarmStatus)
        );
    }

    #[test]
    fn test_unlisted_codes_unclassified() {
        let classifier = ErrorClassifier::new();
        for code in [0, 103, 321, 399, 10089] {
            assert_eq!(classifier.class_of(code), ErrorClass::Unclassified);
        }
    }

    #[test]
    fn test_scope_and_errors() {
        let classifier = ErrorClassifier::new();

        let c = classifier.classify(387, Some(RequestId::new(4)), "Unsupported order type");
        assert_eq!(c.scope, ErrorScope::Request(RequestId::new(4)));
        assert_eq!(
            c.request_error(),
            Some(RequestError::InvalidOrderType {
                code: 387,
                message: "Unsupported order type".to_string()
            })
        );

        let c = classifier.classify(321, Some(RequestId::new(4)), "Error validating request");
        assert!(matches!(
            c.request_error(),
            Some(RequestError::Protocol { code: 321, .. })
        ));

        let c = classifier.classify(202, Some(RequestId::new(4)), "Order Canceled");
        assert_eq!(c.request_error(), None);

        let c = classifier.classify(1100, None, "Connectivity between IB and TWS has been lost");
        assert_eq!(c.scope, ErrorScope::Global);
        assert!(matches!(
            c.request_error(),
            Some(RequestError::ConnectionLost { .. })
        ));
    }

    #[test]
    fn test_with_code_extends_table() {
        let classifier = ErrorClassifier::new().with_code(
            201,
            ErrorClass::RequestFailure(FailureKind::InvalidOrderType),
        );
        assert_eq!(
            classifier.class_of(201),
            ErrorClass::RequestFailure(FailureKind::InvalidOrderType)
        );
    }
}
