//! A fixture owning a scratch buffer, carved out of a per-case pool.

use crate::check::check_elements_equal;
use crate::errors::{HarnessError, TestError, TestResult};
use crate::fixture::{Fixture, SharedState, SubcaseLog};
use crate::group::TestGroup;
use crate::params::ParamRecord;
use futures::future::LocalBoxFuture;

/// Case-level state: how big each buffer is and what to fill it with.
#[derive(Debug)]
pub struct ScratchPool {
    capacity: usize,
    pattern: u8,
    ready: bool,
}

impl SharedState for ScratchPool {
    fn create(params: &ParamRecord) -> Result<Self, TestError> {
        Ok(Self {
            capacity: params.get::<usize>("capacity").unwrap_or(16),
            pattern: 0,
            ready: false,
        })
    }

    fn init(&mut self) -> LocalBoxFuture<'_, TestResult> {
        Box::pin(async move {
            if self.capacity == 0 {
                return Err(TestError::operation("pool capacity must be positive"));
            }
            self.ready = true;
            Ok(())
        })
    }

    fn finalize(&mut self) -> LocalBoxFuture<'_, TestResult> {
        Box::pin(async move {
            self.ready = false;
            Ok(())
        })
    }
}

/// Per-subcase state: a buffer of `capacity` bytes.
#[derive(Debug)]
pub struct ScratchFixture {
    pub buffer: Vec<u8>,
    pub pattern: u8,
    capacity: usize,
}

impl Fixture for ScratchFixture {
    type Shared = ScratchPool;

    fn create(shared: &ScratchPool, _params: &ParamRecord) -> Result<Self, TestError> {
        if !shared.ready {
            return Err(TestError::operation("pool used before init"));
        }
        Ok(Self {
            buffer: Vec::new(),
            pattern: shared.pattern,
            capacity: shared.capacity,
        })
    }

    fn init<'a>(&'a mut self, log: &'a mut SubcaseLog) -> LocalBoxFuture<'a, TestResult> {
        Box::pin(async move {
            self.buffer = vec![0; self.capacity];
            log.debug(format!("allocated {} bytes", self.capacity));
            Ok(())
        })
    }

    fn finalize<'a>(&'a mut self, log: &'a mut SubcaseLog) -> LocalBoxFuture<'a, TestResult> {
        Box::pin(async move {
            if self.buffer.len() != self.capacity {
                log.fail(format!(
                    "buffer resized from {} to {} bytes",
                    self.capacity,
                    self.buffer.len()
                ));
            }
            self.buffer.clear();
            Ok(())
        })
    }
}

pub(super) fn group() -> Result<TestGroup<ScratchFixture>, HarnessError> {
    let mut g = TestGroup::<ScratchFixture>::new();

    g.test("fill")?
        .desc("Filling a range leaves the rest of the buffer untouched.")
        .params(|u| {
            u.combine("capacity", [4, 64])
                .begin_subcases()
                .expand("start", |p: &ParamRecord| {
                    let capacity = p.get::<usize>("capacity").unwrap_or(0);
                    [0, capacity / 2, capacity - 1]
                })
        })?
        .before_all_subcases(|pool| {
            Box::pin(async move {
                pool.pattern = 0xab;
                Ok(())
            })
        })
        .body_sync(|t| {
            let start: usize = t.param("start")?;
            let pattern = t.pattern;
            t.buffer[start..].fill(pattern);
            let expected: Vec<u8> = (0..t.buffer.len())
                .map(|i| if i < start { 0 } else { pattern })
                .collect();
            let result = check_elements_equal(&t.buffer, &expected);
            t.expect_ok(result);
            Ok(())
        })?;

    g.test("cleanup_order")?
        .desc("Cleanups registered in a body run after it, most recent first.")
        .body_sync(|t| {
            let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
            for i in 0..3 {
                let order = std::rc::Rc::clone(&order);
                t.track_for_cleanup(move || order.borrow_mut().push(i));
            }
            t.info("registered 3 cleanups");
            t.expect(order.borrow().is_empty(), "cleanups ran early");
            Ok(())
        })?;

    Ok(g)
}
