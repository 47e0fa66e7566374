// SPDX-License-Identifier: Apache-2.0 OR MIT
// Diagnostic macros - format only when the level passes the filter

/// Report an error-level diagnostic
///
/// # Examples
/// ```ignore
/// diag_error!(diag, "dispatcher", "bad logger identifier: {}", id);
/// ```
#[macro_export]
macro_rules! diag_error {
    ($diag:expr, $component:expr, $($arg:tt)+) => {
        $crate::diag_report!($diag, $crate::diag::Severity::Error, $component, $($arg)+)
    };
}

/// Report a warning-level diagnostic
#[macro_export]
macro_rules! diag_warning {
    ($diag:expr, $component:expr, $($arg:tt)+) => {
        $crate::diag_report!($diag, $crate::diag::Severity::Warning, $component, $($arg)+)
    };
}

/// Report an info-level diagnostic
#[macro_export]
macro_rules! diag_info {
    ($diag:expr, $component:expr, $($arg:tt)+) => {
        $crate::diag_report!($diag, $crate::diag::Severity::Info, $component, $($arg)+)
    };
}

/// Report a debug-level diagnostic
#[macro_export]
macro_rules! diag_debug {
    ($diag:expr, $component:expr, $($arg:tt)+) => {
        $crate::diag_report!($diag, $crate::diag::Severity::Debug, $component, $($arg)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! diag_report {
    ($diag:expr, $severity:expr, $component:expr, $($arg:tt)+) => {{
        let diag: &$crate::diag::Diagnostics = &$diag;
        if diag.should_log($severity) {
            diag.report($severity, $component, &format!($($arg)+));
        } else {
            diag.count($severity);
        }
    }};
}
