use core::fmt::Display;

use serde_core::ser::Error;

use crate::value::Value;

#[cfg(all(debug_assertions, feature = "debug"))]
std::thread_local! {
    static PATH_STACK: core::cell::RefCell<Vec<&'static str>> =
        const { core::cell::RefCell::new(Vec::new()) };
}

// -----------------------------------------------------------------------------
// Path frames

/// Runs `f` with the element's type path pushed onto the serialization
/// trace.
///
/// The trace only exists in debug builds with the `debug` feature; release
/// builds run `f` directly.
#[cfg(all(debug_assertions, feature = "debug"))]
pub(super) fn with_frame<R>(path: &'static str, f: impl FnOnce() -> R) -> R {
    PATH_STACK.with_borrow_mut(|stack| stack.push(path));
    let output = f();
    PATH_STACK.with_borrow_mut(|stack| {
        stack.pop();
    });
    output
}

#[cfg(not(all(debug_assertions, feature = "debug")))]
#[inline(always)]
pub(super) fn with_frame<R>(_path: &'static str, f: impl FnOnce() -> R) -> R {
    f()
}

// -----------------------------------------------------------------------------
// Error helpers

/// A helper function for generating a custom serialization error message.
///
/// This should be preferred over [`Error::custom`] as it will include the
/// serialization trace when one is being kept.
pub(super) fn make_custom_error<E: Error>(msg: impl Display) -> E {
    #[cfg(all(debug_assertions, feature = "debug"))]
    return PATH_STACK.with_borrow(|stack| {
        if stack.is_empty() {
            E::custom(&msg)
        } else {
            E::custom(format_args!("{msg} (trace: {})", stack.join(" > ")))
        }
    });

    #[cfg(not(all(debug_assertions, feature = "debug")))]
    E::custom(msg)
}

/// Annotates an element-level failure with its position in the container.
///
/// Every failure raised while resolving or delegating to an element's codec
/// passes through here exactly once per container level, so a higher layer
/// can reassemble the full positional path across nested containers.
pub(super) fn element_error<E: Error>(index: usize, err: impl Display) -> E {
    make_custom_error(format_args!(
        "error at element index {index} of the container value: {err}"
    ))
}

/// Annotates a map-entry value failure with its key.
pub(super) fn entry_error<E: Error>(key: &dyn Value, err: impl Display) -> E {
    make_custom_error(format_args!(
        "error at the entry value for key of type `{}`: {err}",
        key.type_path()
    ))
}

/// A resolution failure: no codec is known for an element's runtime type.
pub(super) fn no_codec_error<E: Error>(index: usize, type_path: &'static str) -> E {
    make_custom_error(format_args!(
        "no element codec registered for type `{type_path}` (element index {index} of the container value)"
    ))
}
