//! Request-level errors.
//!
//! Every error is fatal to the request that raised it: the handler releases
//! the request's transfer session and hands the error back to the transport,
//! which turns [`WebAdminError::code`] into a client-visible failure. Nothing
//! is retried.

use alloc::string::String;
use core::fmt;

use crate::domain::ports::TransportError;
use crate::domain::value_objects::{FlashAddress, SectorIndex};

/// Transport code for a flash read failure.
pub const ERR_FLASH_READ: i16 = -100;
/// Transport code for a failed parameter save.
pub const ERR_SAVE_PARAMS: i16 = -101;
/// Transport code for an unknown form field.
pub const ERR_UNKNOWN_FIELD: i16 = -102;
/// Transport code for a flash erase or write failure.
pub const ERR_FLASH_WRITE: i16 = -103;
/// Transport code for a failure to lift flash erase protection.
pub const ERR_FLASH_WRITE_PROTECT: i16 = -104;
/// Transport code for a payload that does not fit its flash region.
pub const ERR_REGION_OVERFLOW: i16 = -105;
/// Transport code for a form value longer than its field.
pub const ERR_FIELD_TOO_LONG: i16 = -106;
/// Transport code for a response body that could not be encoded.
pub const ERR_ENCODE: i16 = -107;
/// Transport code for a full signal queue (shared with the transport).
pub const ERR_TASKQ_FULL: i16 = -7;

/// Where a failed commit was headed.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// A sector of the asset region.
    Sector(SectorIndex),
    /// The firmware upgrade subsystem.
    Upgrade,
}

impl fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sector(sector) => write!(f, "{}", sector),
            Self::Upgrade => write!(f, "upgrade image"),
        }
    }
}

/// Errors surfaced by the web administration handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WebAdminError {
    /// Reading flash failed.
    StorageRead {
        /// Address of the failed read.
        address: FlashAddress,
    },

    /// Erasing or writing flash (or the upgrade image) failed.
    StorageWrite {
        /// Destination of the failed commit.
        target: WriteTarget,
    },

    /// Flash erase protection could not be lifted before an upload.
    EraseProtect,

    /// The transport's signal queue was full, so paused body delivery
    /// could not be resumed.
    FlowControlQueueFull,

    /// A submitted form field has no counterpart in the parameter record.
    UnknownField(String),

    /// A submitted form value does not fit its parameter field.
    FieldTooLong {
        /// Field name as submitted.
        field: &'static str,
        /// Largest accepted value length in bytes.
        max: usize,
    },

    /// The parameter store refused to persist the record.
    SaveParams,

    /// The payload (or a stored length prefix) exceeds the flash region.
    RegionOverflow {
        /// Bytes the payload needs, prefix included.
        requested: usize,
        /// Bytes the region provides.
        capacity: usize,
    },

    /// A JSON response body could not be encoded.
    Encode,

    /// The transport rejected a response operation.
    Transport(TransportError),
}

impl WebAdminError {
    /// Numeric code handed to the transport.
    pub fn code(&self) -> i16 {
        match self {
            Self::StorageRead { .. } => ERR_FLASH_READ,
            Self::StorageWrite { .. } => ERR_FLASH_WRITE,
            Self::EraseProtect => ERR_FLASH_WRITE_PROTECT,
            Self::FlowControlQueueFull => ERR_TASKQ_FULL,
            Self::UnknownField(_) => ERR_UNKNOWN_FIELD,
            Self::FieldTooLong { .. } => ERR_FIELD_TOO_LONG,
            Self::SaveParams => ERR_SAVE_PARAMS,
            Self::RegionOverflow { .. } => ERR_REGION_OVERFLOW,
            Self::Encode => ERR_ENCODE,
            Self::Transport(e) => e.code(),
        }
    }
}

impl fmt::Display for WebAdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageRead { address } => write!(f, "Flash read at {} failed", address),
            Self::StorageWrite { target } => write!(f, "Flash write to {} failed", target),
            Self::EraseProtect => write!(f, "Cannot disable flash erase protection"),
            Self::FlowControlQueueFull => {
                write!(f, "Signal queue full, cannot resume request body")
            }
            Self::UnknownField(name) => write!(f, "Unknown field: {}", name),
            Self::FieldTooLong { field, max } => {
                write!(f, "Value for {} exceeds {} bytes", field, max)
            }
            Self::SaveParams => write!(f, "Cannot save params"),
            Self::RegionOverflow {
                requested,
                capacity,
            } => write!(
                f,
                "Payload of {} bytes does not fit region of {} bytes",
                requested, capacity
            ),
            Self::Encode => write!(f, "Cannot encode response body"),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl core::error::Error for WebAdminError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for WebAdminError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for WebAdminError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "WebAdminError({})", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            WebAdminError::StorageRead {
                address: FlashAddress::new(0),
            },
            WebAdminError::StorageWrite {
                target: WriteTarget::Upgrade,
            },
            WebAdminError::EraseProtect,
            WebAdminError::FlowControlQueueFull,
            WebAdminError::UnknownField("foo".into()),
            WebAdminError::FieldTooLong {
                field: "zone",
                max: 31,
            },
            WebAdminError::SaveParams,
            WebAdminError::RegionOverflow {
                requested: 1,
                capacity: 0,
            },
            WebAdminError::Encode,
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in &errors[i + 1..] {
                assert_ne!(a.code(), b.code(), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_unknown_field_display() {
        let err = WebAdminError::UnknownField("foo".into());
        assert_eq!(err.code(), ERR_UNKNOWN_FIELD);
        assert!(format!("{}", err).contains("foo"));
    }

    #[test]
    fn test_storage_write_display() {
        let err = WebAdminError::StorageWrite {
            target: WriteTarget::Sector(SectorIndex::new(0x7D)),
        };
        assert_eq!(format!("{}", err), "Flash write to Sector(0x7D) failed");
    }

    #[test]
    fn test_transport_error_keeps_its_code() {
        let err: WebAdminError = TransportError::Other(-9).into();
        assert_eq!(err.code(), -9);
    }
}
