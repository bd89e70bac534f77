use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt;

/// The error type for `try_*` methods that may allocate.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The computed capacity exceeded the table's maximum (usually `isize::MAX`
    /// bytes).
    CapacityOverflow,

    /// The allocator returned an error.
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str("memory allocation failed because the computed capacity exceeded the table's maximum")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes (align {}) failed",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}

/// Whether memory allocation errors should return an error or abort.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    /// Error to return on capacity overflow.
    #[cold]
    pub(crate) fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("hash table capacity overflow"),
        }
    }

    /// Error to return on allocation error.
    #[cold]
    pub(crate) fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => handle_alloc_error(layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            TryReserveError::CapacityOverflow.to_string(),
            "memory allocation failed because the computed capacity exceeded the table's maximum"
        );

        let layout = Layout::from_size_align(64, 8).unwrap();
        assert_eq!(
            TryReserveError::AllocError { layout }.to_string(),
            "memory allocation of 64 bytes (align 8) failed"
        );
    }

    #[test]
    fn fallible_overflow_is_returned() {
        assert_eq!(
            Fallibility::Fallible.capacity_overflow(),
            TryReserveError::CapacityOverflow
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn infallible_overflow_panics() {
        let _ = Fallibility::Infallible.capacity_overflow();
    }
}
