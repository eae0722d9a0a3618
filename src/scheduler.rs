//! 周期计时源：由界面帧循环轮询，取消立即生效

use chrono::{DateTime, TimeDelta, Utc};

/// 周期上限（一年），超出的周期按此处理
fn max_period() -> TimeDelta {
    TimeDelta::days(365)
}

/// 到期时间超出可表示范围时停在最大时间，计时源保持挂起而不是丢失
fn advance(at: DateTime<Utc>, period: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(period).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 周期计时源
#[cfg_attr(test, mockall::automock)]
pub trait Scheduler {
    /// 开始周期计时，首次触发在一个周期之后
    fn schedule_periodic(&mut self, period: std::time::Duration);
    /// 取消计时，返回后不再产生任何触发
    fn cancel(&mut self);
}

/// 基于帧循环的计时源：每帧调用 `poll` 取出已到期的触发次数
#[derive(Debug, Default)]
pub struct FrameScheduler {
    period: TimeDelta,
    next_due: Option<DateTime<Utc>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, now: DateTime<Utc>, period: std::time::Duration) {
        // 至少 1 毫秒，否则 poll 会死循环
        self.period = TimeDelta::from_std(period)
            .unwrap_or_else(|_| max_period())
            .clamp(TimeDelta::milliseconds(1), max_period());
        self.next_due = Some(advance(now, self.period));
    }

    pub fn is_scheduled(&self) -> bool {
        self.next_due.is_some()
    }

    /// 返回自上次轮询以来到期的周期数，并推进下一次到期时间
    pub fn poll(&mut self, now: DateTime<Utc>) -> u32 {
        let Some(mut next) = self.next_due else { return 0 };
        let mut due = 0;
        while now >= next && next < DateTime::<Utc>::MAX_UTC {
            due += 1;
            next = advance(next, self.period);
        }
        self.next_due = Some(next);
        due
    }

    /// 距下一次触发的时长，用于安排下一帧重绘
    pub fn until_next(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        let next = self.next_due?;
        Some((next - now).to_std().unwrap_or_default())
    }
}

impl Scheduler for FrameScheduler {
    fn schedule_periodic(&mut self, period: std::time::Duration) {
        self.schedule_at(Utc::now(), period);
    }

    fn cancel(&mut self) {
        self.next_due = None;
    }
}
