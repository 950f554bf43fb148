/// In-band error codes written to a unit's error register.
///
/// These never abort a run; programs read them back with `le` and branch on
/// them. Zero is reserved for "no error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(i64)]
pub enum ErrorCode {
    /// An operand was missing because the work stack ran empty.
    StackEmpty = 1,
    /// An operand had the wrong type.
    TypeMismatch = 2,
    /// Integer division or modulo by zero.
    DivisionByZero = 3,
    /// Integer result did not fit.
    Overflow = 4,
    /// Operand had the right type but an unusable value.
    BadValue = 5,
    /// Named hallway or floor does not exist.
    NotFound = 6,
    /// Call stack did not hold a well-formed return record.
    CorruptReturn = 7,
}

impl ErrorCode {
    /// Value stored in the error register.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    /// Converts an error register value back into a code.
    #[must_use]
    pub const fn from_i64(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::StackEmpty),
            2 => Some(Self::TypeMismatch),
            3 => Some(Self::DivisionByZero),
            4 => Some(Self::Overflow),
            5 => Some(Self::BadValue),
            6 => Some(Self::NotFound),
            7 => Some(Self::CorruptReturn),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;

    const ALL: [ErrorCode; 7] = [
        ErrorCode::StackEmpty,
        ErrorCode::TypeMismatch,
        ErrorCode::DivisionByZero,
        ErrorCode::Overflow,
        ErrorCode::BadValue,
        ErrorCode::NotFound,
        ErrorCode::CorruptReturn,
    ];

    #[test]
    fn codes_round_trip_and_skip_zero() {
        for code in ALL {
            assert_ne!(code.as_i64(), 0);
            assert_eq!(ErrorCode::from_i64(code.as_i64()), Some(code));
        }
        assert_eq!(ErrorCode::from_i64(0), None);
        assert_eq!(ErrorCode::from_i64(99), None);
    }
}
