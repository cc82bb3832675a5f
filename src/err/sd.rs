use thiserror::Error;

/// Errors decoding an SD message (spec §4.6).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdReadError {
    #[error("SD entries array length {0} is not a multiple of the 16-byte entry size")]
    EntriesLengthNotAligned(u32),

    #[error("SD entry option reference {index}+{count} exceeds options array of {options_len}")]
    OptionIndexOutOfBounds {
        index: u8,
        count: u8,
        options_len: usize,
    },

    #[error("SD message shorter than the minimum 12-byte header")]
    TooShort,

    #[error("SD option at byte {offset} declares a length that runs past the options array")]
    OptionLengthOutOfBounds { offset: usize },
}

/// Errors encoding an SD message (spec §4.6).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdWriteError {
    #[error("more than 255 distinct options required for entry option run")]
    TooManyOptions,
}

/// Umbrella error type for anything that flows out of the SD subsystem.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdError {
    #[error(transparent)]
    Read(#[from] SdReadError),

    #[error(transparent)]
    Write(#[from] SdWriteError),
}
