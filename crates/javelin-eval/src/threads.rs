//! Program threads.
//!
//! Every `Thread.start()` runs on its own native thread with a fresh
//! [`Evaluator`] over the shared [`Runtime`](crate::runtime::Runtime).
//! Completion is published through a [`ThreadSignal`]; whatever a thread
//! wrote before finishing is visible to anyone who observed it finish.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::heap::{HeapObject, NativeSlot, ObjRef};
use crate::value::Value;

/// Completion flag of one program thread.
#[derive(Debug, Default)]
pub struct ThreadSignal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl ThreadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    /// Block until [`finish`](Self::finish) has been called.
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock()
    }
}

fn signal_of(ev: &Evaluator, obj: ObjRef) -> EvalResult<Option<Arc<ThreadSignal>>> {
    ev.rt.heap.with(obj, |o| match o {
        HeapObject::Instance(inst) => match &inst.native {
            NativeSlot::Thread(signal) => Some(signal.clone()),
            _ => None,
        },
        _ => None,
    })
}

/// `thread.start()`: run `thread.run()` on a new execution context.
pub fn start(ev: &mut Evaluator, obj: ObjRef) -> EvalResult<()> {
    let signal = Arc::new(ThreadSignal::new());
    let claimed = ev.rt.heap.with(obj, |o| match o {
        HeapObject::Instance(inst) if matches!(inst.native, NativeSlot::None) => {
            inst.native = NativeSlot::Thread(signal.clone());
            true
        }
        _ => false,
    })?;
    if !claimed {
        return Err(ev.exception("IllegalThreadStateException", "Thread already started"));
    }

    let rt = ev.rt.clone();
    let n = rt.thread_counter.fetch_add(1, Ordering::Relaxed);
    let name = format!("Thread-{n}");
    let handle = std::thread::Builder::new()
        .name(name.clone())
        .stack_size(rt.config.worker_stack_size)
        .spawn({
            let rt = rt.clone();
            let signal = signal.clone();
            move || {
                debug!(thread = %name, "thread started");
                let mut ev = Evaluator::new(rt, name.as_str());
                let result = ev.call_method(Value::Ref(obj), "run", Vec::new());
                crate::runtime::settle(&mut ev, result.map(|_| ()));
                signal.finish();
                debug!(thread = %name, "thread finished");
            }
        })
        .map_err(|e| {
            signal.finish();
            EvalError::Thread(format!("could not spawn a thread: {e}"))
        })?;
    rt.threads.lock().push(handle);
    Ok(())
}

/// `thread.join()`: wait for a started thread. Unstarted threads return
/// immediately.
pub fn join(ev: &mut Evaluator, obj: ObjRef) -> EvalResult<()> {
    if let Some(signal) = signal_of(ev, obj)? {
        signal.wait();
    }
    Ok(())
}

/// `thread.isAlive()`
pub fn is_alive(ev: &mut Evaluator, obj: ObjRef) -> EvalResult<bool> {
    Ok(signal_of(ev, obj)?.is_some_and(|s| !s.is_done()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_wakes_waiter() {
        let signal = Arc::new(ThreadSignal::new());
        let waiter = {
            let signal = signal.clone();
            std::thread::spawn(move || {
                signal.wait();
                signal.is_done()
            })
        };
        signal.finish();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_finished_signal_does_not_block() {
        let signal = ThreadSignal::new();
        signal.finish();
        signal.wait();
        assert!(signal.is_done());
    }
}
