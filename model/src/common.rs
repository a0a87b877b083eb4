use serde::{Deserialize, Serialize};
use std::fmt;

/// Returned by `FromStr` on enums declared with [`wire_enum!`] when the text
/// matches no enumerator name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown {} \"{}\"", self.kind, self.name)
    }
}

impl std::error::Error for UnknownName {}

/// Declares an i32-backed wire enum together with its static name table.
///
/// Every variant is listed once as `Variant = value => "name"`. The macro
/// derives the numeric conversions and serde encoding, and generates
/// `ALL`, `name()`, `from_name()`, `Display` and `FromStr` from that single
/// table, so the mapping in both directions cannot drift apart.
/// The first listed variant is the `Default`.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i32)]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::num_enum::IntoPrimitive,
            ::num_enum::TryFromPrimitive,
            ::serde_repr::Serialize_repr,
            ::serde_repr::Deserialize_repr,
        )]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(name.trim()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ALL[0]
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::UnknownName;

            fn from_str(s: &str) -> Result<Self, <Self as ::std::str::FromStr>::Err> {
                Self::from_name(s).ok_or_else(|| $crate::UnknownName {
                    kind: stringify!($name),
                    name: s.to_string(),
                })
            }
        }
    };
}

wire_enum! {
    /// Outcome of every agent call.
    pub enum ApiStatus {
        Ok = 0 => "ok",
        Err = 1 => "err",
        InvalidArg = 2 => "invalid-arg",
        ExistsAlready = 3 => "exists-already",
        OutOfMem = 4 => "out-of-mem",
        NotFound = 5 => "not-found",
        OutOfResource = 6 => "out-of-resource",
        Retry = 7 => "retry",
        OperationNotAllowed = 8 => "operation-not-allowed",
        OperationNotSupported = 9 => "operation-not-supported",
        InUse = 10 => "in-use",
    }
}

/// Agent specific error code that accompanies a non-OK [`ApiStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 == 0 {
            f.write_str("none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Status header carried by every unary reply.
pub trait ApiReply {
    fn api_status(&self) -> ApiStatus;

    fn error_code(&self) -> ErrorCode {
        ErrorCode::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

/// Reply of the get-style calls: a status plus the matching objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub api_status: ApiStatus,
    #[serde(default)]
    pub error_code: ErrorCode,
    #[serde(default = "Vec::new")]
    pub response: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn ok(response: Vec<T>) -> Self {
        Self {
            api_status: ApiStatus::Ok,
            error_code: ErrorCode::default(),
            response,
        }
    }

    pub fn failed(api_status: ApiStatus) -> Self {
        Self {
            api_status,
            error_code: ErrorCode::default(),
            response: vec![],
        }
    }
}

impl<T> ApiReply for ListResponse<T> {
    fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }
}

/// Reply of calls that only report an outcome (create, update, delete...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub api_status: ApiStatus,
    #[serde(default)]
    pub error_code: ErrorCode,
}

impl StatusResponse {
    pub fn with_status(api_status: ApiStatus) -> Self {
        Self {
            api_status,
            error_code: ErrorCode::default(),
        }
    }
}

impl ApiReply for StatusResponse {
    fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }
}

/// One notification of a server-streaming call. The agent terminates every
/// stream with `End`; a subscription that closes without it was cut off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFrame<T> {
    Record(T),
    End,
}
