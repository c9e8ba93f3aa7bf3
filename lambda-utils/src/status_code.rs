use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt::{Display, Formatter};

/// Integer that doesn't correspond to any [`StatusCode`] variant.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unknown HTTP status code {0}")]
pub struct UnknownStatusCode(pub u16);

macro_rules! status_codes {
  ($(($num:literal, $variant:ident, $phrase:literal);)+) => {
    /// HTTP status code returned to API Gateway.
    ///
    /// This is a closed set: unlike [`http::StatusCode`], arbitrary integers can't be represented.
    /// Serializes as a bare integer (e.g., `404`).
    #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
    #[serde(try_from = "u16", into = "u16")]
    #[repr(u16)]
    pub enum StatusCode {
      $(
        #[doc = concat!("`", stringify!($num), " ", $phrase, "`")]
        $variant = $num,
      )+
    }

    impl StatusCode {
      /// Return the integer value of the status code (e.g., `404`).
      pub fn as_u16(self) -> u16 {
        self as u16
      }

      /// Return the standard reason phrase (e.g., `Not Found`).
      pub fn canonical_reason(self) -> &'static str {
        match self {
          $(StatusCode::$variant => $phrase,)+
        }
      }
    }

    impl TryFrom<u16> for StatusCode {
      type Error = UnknownStatusCode;

      fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
          $($num => Ok(StatusCode::$variant),)+
          _ => Err(UnknownStatusCode(value)),
        }
      }
    }
  };
}

status_codes! {
  (100, Continue, "Continue");
  (101, SwitchingProtocols, "Switching Protocols");
  (102, Processing, "Processing");
  (103, EarlyHints, "Early Hints");

  (200, Ok, "OK");
  (201, Created, "Created");
  (202, Accepted, "Accepted");
  (203, NonAuthoritativeInformation, "Non Authoritative Information");
  (204, NoContent, "No Content");
  (205, ResetContent, "Reset Content");
  (206, PartialContent, "Partial Content");
  (207, MultiStatus, "Multi-Status");
  (208, AlreadyReported, "Already Reported");
  (226, ImUsed, "IM Used");

  (300, MultipleChoices, "Multiple Choices");
  (301, MovedPermanently, "Moved Permanently");
  (302, Found, "Found");
  (303, SeeOther, "See Other");
  (304, NotModified, "Not Modified");
  (305, UseProxy, "Use Proxy");
  (307, TemporaryRedirect, "Temporary Redirect");
  (308, PermanentRedirect, "Permanent Redirect");

  (400, BadRequest, "Bad Request");
  (401, Unauthorized, "Unauthorized");
  (402, PaymentRequired, "Payment Required");
  (403, Forbidden, "Forbidden");
  (404, NotFound, "Not Found");
  (405, MethodNotAllowed, "Method Not Allowed");
  (406, NotAcceptable, "Not Acceptable");
  (407, ProxyAuthenticationRequired, "Proxy Authentication Required");
  (408, RequestTimeout, "Request Timeout");
  (409, Conflict, "Conflict");
  (410, Gone, "Gone");
  (411, LengthRequired, "Length Required");
  (412, PreconditionFailed, "Precondition Failed");
  (413, PayloadTooLarge, "Payload Too Large");
  (414, UriTooLong, "URI Too Long");
  (415, UnsupportedMediaType, "Unsupported Media Type");
  (416, RangeNotSatisfiable, "Range Not Satisfiable");
  (417, ExpectationFailed, "Expectation Failed");
  (418, ImATeapot, "I'm a teapot");
  (421, MisdirectedRequest, "Misdirected Request");
  (422, UnprocessableEntity, "Unprocessable Entity");
  (423, Locked, "Locked");
  (424, FailedDependency, "Failed Dependency");
  (425, TooEarly, "Too Early");
  (426, UpgradeRequired, "Upgrade Required");
  (428, PreconditionRequired, "Precondition Required");
  (429, TooManyRequests, "Too Many Requests");
  (431, RequestHeaderFieldsTooLarge, "Request Header Fields Too Large");
  (451, UnavailableForLegalReasons, "Unavailable For Legal Reasons");

  (500, InternalServerError, "Internal Server Error");
  (501, NotImplemented, "Not Implemented");
  (502, BadGateway, "Bad Gateway");
  (503, ServiceUnavailable, "Service Unavailable");
  (504, GatewayTimeout, "Gateway Timeout");
  (505, HttpVersionNotSupported, "HTTP Version Not Supported");
  (506, VariantAlsoNegotiates, "Variant Also Negotiates");
  (507, InsufficientStorage, "Insufficient Storage");
  (508, LoopDetected, "Loop Detected");
  (510, NotExtended, "Not Extended");
  (511, NetworkAuthenticationRequired, "Network Authentication Required");
}

impl StatusCode {
  /// Whether the status code is in the 4xx range.
  pub fn is_client_error(self) -> bool {
    (400..500).contains(&self.as_u16())
  }

  /// Whether the status code is in the 5xx range.
  pub fn is_server_error(self) -> bool {
    (500..600).contains(&self.as_u16())
  }
}

impl Default for StatusCode {
  fn default() -> Self {
    StatusCode::Ok
  }
}

impl From<StatusCode> for u16 {
  fn from(status_code: StatusCode) -> u16 {
    status_code.as_u16()
  }
}

impl From<StatusCode> for http::StatusCode {
  fn from(status_code: StatusCode) -> http::StatusCode {
    // Every variant is in the 100..=999 range accepted by `http`.
    http::StatusCode::from_u16(status_code.as_u16())
      .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
  }
}

impl TryFrom<http::StatusCode> for StatusCode {
  type Error = UnknownStatusCode;

  fn try_from(status_code: http::StatusCode) -> Result<Self, Self::Error> {
    StatusCode::try_from(status_code.as_u16())
  }
}

impl Display for StatusCode {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.as_u16(), self.canonical_reason())
  }
}

#[cfg(test)]
mod tests {
  use super::{StatusCode, UnknownStatusCode};

  use pretty_assertions::assert_eq;

  #[test]
  fn test_default_is_ok() {
    assert_eq!(StatusCode::default(), StatusCode::Ok);
    assert_eq!(StatusCode::default().as_u16(), 200);
  }

  #[test]
  fn test_try_from_u16() {
    assert_eq!(StatusCode::try_from(404u16), Ok(StatusCode::NotFound));
    assert_eq!(StatusCode::try_from(500u16), Ok(StatusCode::InternalServerError));
    assert_eq!(StatusCode::try_from(299u16), Err(UnknownStatusCode(299)));
    assert_eq!(StatusCode::try_from(0u16), Err(UnknownStatusCode(0)));
  }

  #[test]
  fn test_serde_as_integer() {
    assert_eq!(serde_json::to_string(&StatusCode::NotFound).unwrap(), "404");
    assert_eq!(
      serde_json::from_str::<StatusCode>("201").unwrap(),
      StatusCode::Created
    );

    let err = serde_json::from_str::<StatusCode>("299").unwrap_err();
    assert!(
      err.to_string().contains("unknown HTTP status code 299"),
      "{err}"
    );
  }

  #[test]
  fn test_http_conversion() {
    assert_eq!(
      http::StatusCode::from(StatusCode::ImATeapot),
      http::StatusCode::IM_A_TEAPOT
    );
    assert_eq!(
      StatusCode::try_from(http::StatusCode::BAD_GATEWAY),
      Ok(StatusCode::BadGateway)
    );
  }

  #[test]
  fn test_display() {
    assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
    assert!(StatusCode::Conflict.is_client_error());
    assert!(!StatusCode::Conflict.is_server_error());
    assert!(StatusCode::GatewayTimeout.is_server_error());
  }
}
