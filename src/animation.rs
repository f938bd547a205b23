use serde::Serialize;
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time};

pub const STEPS: u32 = 50;
pub const DURATION: Duration = Duration::from_secs(1);

pub fn frame_interval() -> Duration {
    DURATION / STEPS
}

/// Values shown while counting from `start` to `end` in [`STEPS`] equal
/// increments. Ends on the first value that reaches or passes `end`, which is
/// always emitted exactly.
#[derive(Debug, Clone)]
pub struct CountUp {
    end: f64,
    increment: f64,
    current: f64,
    done: bool,
}

impl CountUp {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            end: end as f64,
            increment: (end - start) as f64 / f64::from(STEPS),
            current: start as f64,
            done: false,
        }
    }

    fn reached(&self) -> bool {
        (self.increment > 0.0 && self.current >= self.end)
            || (self.increment < 0.0 && self.current <= self.end)
            || self.increment == 0.0
    }
}

impl Iterator for CountUp {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.done {
            return None;
        }
        self.current += self.increment;
        if self.reached() {
            self.current = self.end;
            self.done = true;
        }
        Some(round_half_up(self.current))
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub counter: &'static str,
    pub value: i64,
    pub last: bool,
}

/// A count-up playing on a timer. Dropping the handle stops it.
#[derive(Debug)]
pub struct CountUpTask {
    handle: JoinHandle<()>,
}

impl CountUpTask {
    /// Sends one frame per tick until the count-up completes or the receiver
    /// goes away.
    pub fn spawn(counter: &'static str, target: i64, frames: mpsc::Sender<Frame>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(frame_interval());
            ticker.tick().await;
            let mut values = CountUp::new(0, target).peekable();
            while let Some(value) = values.next() {
                ticker.tick().await;
                let frame = Frame {
                    counter,
                    value,
                    last: values.peek().is_none(),
                };
                if frames.send(frame).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for CountUpTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
