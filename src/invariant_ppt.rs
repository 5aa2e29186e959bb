//! Runtime invariant checks with contract-test support
//!
//! Controller transitions assert their invariants through [`assert_invariant!`].
//! Every checked invariant is recorded in a thread-local log so a test can
//! prove that the checks actually ran, not merely that nothing panicked.
//!
//! ```rust,ignore
//! use camwidget::invariant_ppt::*;
//!
//! assert_invariant!(
//!     surface.is_some() == session.is_some(),
//!     "Surface has a source iff a session is alive"
//! );
//!
//! #[test]
//! fn contract_stream_lifecycle() {
//!     // ... drive the controller ...
//!     contract_test("stream lifecycle", &[
//!         "Surface has a source iff a session is alive",
//!     ]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Assert an invariant and record that it was checked.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().insert(message.to_string());
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Panics unless every listed invariant was checked on this thread.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let log = INVARIANT_LOG.with(|log| log.borrow().clone());

    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| !log.contains(*invariant))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().clear();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_invariant_satisfies_contract() {
        clear_invariant_log();
        assert_invariant!(true, "always holds", "tests");
        contract_test("single", &["always holds"]);
    }

    #[test]
    #[should_panic(expected = "CONTRACT FAILURE")]
    fn test_unchecked_invariant_fails_contract() {
        clear_invariant_log();
        contract_test("missing", &["never checked"]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [tests]")]
    fn test_violation_panics() {
        assert_invariant!(false, "must fail", "tests");
    }
}
