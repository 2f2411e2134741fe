/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: u32 },
    /// Reported exactly once, on the tick that reaches zero.
    Expired,
    /// Not started, stopped, or already expired.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownState {
    Ready,
    Running,
    Stopped,
    Expired,
}

/// One-shot exam countdown. Driven externally, one `tick` per second.
#[derive(Debug, Clone)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    state: CountdownState,
}

impl Countdown {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total: total_seconds,
            remaining: total_seconds,
            state: CountdownState::Ready,
        }
    }

    /// Starts the countdown. Only valid once; a stopped countdown stays stopped.
    pub fn start(&mut self) -> bool {
        if self.state != CountdownState::Ready {
            return false;
        }
        self.state = CountdownState::Running;
        true
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    pub fn stop(&mut self) {
        if matches!(self.state, CountdownState::Ready | CountdownState::Running) {
            self.state = CountdownState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    pub fn has_expired(&self) -> bool {
        self.state == CountdownState::Expired
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.total - self.remaining
    }
}
