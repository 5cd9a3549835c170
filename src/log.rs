#![allow(unused)]

macro_rules! info {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::info!($($tt)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($tt)*);
    };
}

macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::debug!($($tt)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($tt)*);
    };
}

macro_rules! warning {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::warn!($($tt)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($tt)*);
    };
}

macro_rules! error {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::error!($($tt)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($tt)*);
    };
}

pub(crate) use {debug, error, info, warning};
