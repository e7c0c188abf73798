//! The test currently driving requests.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Identity of a test and whether it is expected to fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestContext {
    pub node_id: String,
    pub xfail: bool,
}

/// Atomically swapped test context read by the recorder at finalize time.
///
/// Only meaningful when tests run one at a time; concurrent tests would
/// stamp each other's rows.
#[derive(Debug, Default)]
pub struct CurrentTest {
    inner: ArcSwap<TestContext>,
}

impl CurrentTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node_id: impl Into<String>, xfail: bool) {
        self.inner.store(Arc::new(TestContext {
            node_id: node_id.into(),
            xfail,
        }));
    }

    pub fn clear(&self) {
        self.inner.store(Arc::new(TestContext::default()));
    }

    pub fn get(&self) -> Arc<TestContext> {
        self.inner.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let current = CurrentTest::new();
        assert_eq!(current.get().node_id, "");

        current.set("tests/test_s3.py::test_get_object", true);
        let ctx = current.get();
        assert_eq!(ctx.node_id, "tests/test_s3.py::test_get_object");
        assert!(ctx.xfail);

        current.clear();
        assert_eq!(*current.get(), TestContext::default());
    }
}
