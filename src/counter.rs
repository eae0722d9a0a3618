//! 倒计时状态机：时长循环、刻度位移计数、到点提示与自动切换工作/休息

use crate::scheduler::Scheduler;
use crate::signal::Notifier;

/// 刻度像素上限：最长档位的总位移不超出 u32
pub const MAX_PIXELS_PER_MINUTE: u32 = u32::MAX / Phase::Focus.minutes();

/// 倒计时时长档位
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// 专注工作 25 分钟
    Focus,
    /// 长休息 15 分钟
    LongBreak,
    /// 短休息 5 分钟
    ShortBreak,
}

impl Phase {
    pub const fn minutes(self) -> u32 {
        match self {
            Phase::Focus => 25,
            Phase::LongBreak => 15,
            Phase::ShortBreak => 5,
        }
    }

    /// 手动切换顺序：25 → 15 → 5 → 25
    pub fn next(self) -> Self {
        match self {
            Phase::Focus => Phase::LongBreak,
            Phase::LongBreak => Phase::ShortBreak,
            Phase::ShortBreak => Phase::Focus,
        }
    }

    /// 倒计时走完后的下一档：25 与 5 互换，15 不参与
    pub fn after_countdown(self) -> Self {
        match self {
            Phase::Focus => Phase::ShortBreak,
            Phase::ShortBreak => Phase::Focus,
            Phase::LongBreak => Phase::LongBreak,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "专注",
            Phase::LongBreak => "长休息",
            Phase::ShortBreak => "短休息",
        }
    }
}

/// 计时器状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
}

/// 停止原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// 用户点击「停止」
    Manual,
    /// 倒计时走到 0
    Automatic,
}

/// 重绘请求
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    fn request_redraw(&self);
}

impl Renderer for egui::Context {
    fn request_redraw(&self) {
        self.request_repaint();
    }
}

/// 番茄钟核心状态，由应用持有唯一实例
pub struct CountdownController<S, N, R> {
    phase: Phase,
    state: TimerState,
    pixels_per_minute: u32,
    remaining_offset: u32,
    tick_period: std::time::Duration,
    scheduler: S,
    notifier: N,
    renderer: R,
}

impl<S: Scheduler, N: Notifier, R: Renderer> CountdownController<S, N, R> {
    pub fn new(
        pixels_per_minute: u32,
        tick_period: std::time::Duration,
        scheduler: S,
        notifier: N,
        renderer: R,
    ) -> Self {
        let phase = Phase::Focus;
        let pixels_per_minute = pixels_per_minute.clamp(1, MAX_PIXELS_PER_MINUTE);
        Self {
            phase,
            state: TimerState::Stopped,
            pixels_per_minute,
            remaining_offset: phase.minutes() * pixels_per_minute,
            tick_period,
            scheduler,
            notifier,
            renderer,
        }
    }

    fn reset_offset(&mut self) {
        self.remaining_offset = self.phase.minutes() * self.pixels_per_minute;
    }

    /// 开始倒计时；已在计时中则忽略，不会重复创建计时源
    pub fn start(&mut self) {
        if self.state == TimerState::Running {
            log::warn!("start ignored: countdown already running");
            return;
        }
        self.scheduler.schedule_periodic(self.tick_period);
        self.state = TimerState::Running;
        log::debug!("Countdown started: {} min", self.phase.minutes());
        self.renderer.request_redraw();
    }

    /// 停止倒计时并复位刻度；自动停止时在工作/休息之间切换
    pub fn stop(&mut self, reason: StopReason) {
        if self.state != TimerState::Running {
            log::warn!("stop ignored: countdown not running");
            return;
        }
        self.scheduler.cancel();
        self.state = TimerState::Stopped;
        if reason == StopReason::Automatic {
            self.phase = self.phase.after_countdown();
        }
        self.reset_offset();
        log::debug!("Countdown stopped ({:?}), next {} min", reason, self.phase.minutes());
        self.renderer.request_redraw();
    }

    /// 切换时长（仅停止时有效）
    pub fn cycle_duration(&mut self) {
        if self.state == TimerState::Running {
            return;
        }
        self.phase = self.phase.next();
        self.reset_offset();
        self.renderer.request_redraw();
    }

    /// 计时源每触发一次，刻度前进一分钟；走到 0 时提示并自动停止
    pub fn on_tick(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        self.remaining_offset = self.remaining_offset.saturating_sub(self.pixels_per_minute);
        self.renderer.request_redraw();

        if self.remaining_offset == 0 {
            if let Err(e) = self.notifier.signal() {
                self.notifier.report_error(&e.to_string());
            }
            self.stop(StopReason::Automatic);
        }
    }

    /// 退出前取消计时源
    pub fn shutdown(&mut self) {
        if self.state == TimerState::Running {
            self.scheduler.cancel();
            self.state = TimerState::Stopped;
        }
    }

    /// 刻度尺的左移像素
    pub fn display_offset(&self) -> u32 {
        self.remaining_offset
    }

    pub fn remaining_minutes(&self) -> u32 {
        self.remaining_offset / self.pixels_per_minute
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn minutes(&self) -> u32 {
        self.phase.minutes()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn pixels_per_minute(&self) -> u32 {
        self.pixels_per_minute
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CounterError;
    use crate::scheduler::{FrameScheduler, MockScheduler};
    use crate::signal::MockNotifier;
    use chrono::{TimeDelta, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::time::Duration;

    const MINUTE: Duration = Duration::from_secs(60);

    fn quiet_scheduler() -> MockScheduler {
        let mut s = MockScheduler::new();
        s.expect_schedule_periodic().return_const(());
        s.expect_cancel().return_const(());
        s
    }

    fn ok_notifier() -> MockNotifier {
        let mut n = MockNotifier::new();
        n.expect_signal().returning(|| Ok(()));
        n
    }

    fn any_renderer() -> MockRenderer {
        let mut r = MockRenderer::new();
        r.expect_request_redraw().return_const(());
        r
    }

    type Controller = CountdownController<MockScheduler, MockNotifier, MockRenderer>;

    fn controller() -> Controller {
        CountdownController::new(9, MINUTE, quiet_scheduler(), ok_notifier(), any_renderer())
    }

    #[test]
    fn starts_stopped_at_25() {
        let c = controller();
        assert_eq!(c.state(), TimerState::Stopped);
        assert_eq!(c.minutes(), 25);
        assert_eq!(c.display_offset(), 225);
        assert_eq!(c.remaining_minutes(), 25);
    }

    #[test]
    fn cycle_sequence_while_stopped() {
        let mut c = controller();
        let mut seen = Vec::new();
        for _ in 0..3 {
            c.cycle_duration();
            seen.push((c.minutes(), c.display_offset()));
        }
        assert_eq!(seen, vec![(15, 135), (5, 45), (25, 225)]);
    }

    #[test]
    fn offset_matches_interval_after_every_cycle() {
        let mut c = controller();
        for _ in 0..10 {
            c.cycle_duration();
            assert_eq!(c.display_offset(), c.minutes() * c.pixels_per_minute());
        }
    }

    #[test]
    fn cycle_ignored_while_running() {
        let mut c = controller();
        c.start();
        c.on_tick();
        c.cycle_duration();
        assert_eq!(c.phase(), Phase::Focus);
        assert_eq!(c.display_offset(), 216);
        assert!(c.is_running());
    }

    #[test]
    fn full_countdown_signals_once_and_swaps_to_rest() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_schedule_periodic().with(mockall::predicate::eq(MINUTE)).times(1).return_const(());
        scheduler.expect_cancel().times(1).return_const(());
        let mut notifier = MockNotifier::new();
        notifier.expect_signal().times(1).returning(|| Ok(()));
        notifier.expect_report_error().never();
        let mut c = CountdownController::new(9, MINUTE, scheduler, notifier, any_renderer());

        c.start();
        c.on_tick();
        assert_eq!(c.display_offset(), 216);
        for _ in 1..25 {
            c.on_tick();
        }
        assert_eq!(c.state(), TimerState::Stopped);
        assert_eq!(c.phase(), Phase::ShortBreak);
        assert_eq!(c.display_offset(), 45);
    }

    #[rstest]
    #[case(Phase::Focus, Phase::ShortBreak)]
    #[case(Phase::ShortBreak, Phase::Focus)]
    #[case(Phase::LongBreak, Phase::LongBreak)]
    fn automatic_stop_swaps_work_and_rest(#[case] from: Phase, #[case] to: Phase) {
        let mut c = controller();
        while c.phase() != from {
            c.cycle_duration();
        }
        c.start();
        for _ in 0..from.minutes() {
            c.on_tick();
        }
        assert!(!c.is_running());
        assert_eq!(c.phase(), to);
        assert_eq!(c.display_offset(), to.minutes() * 9);
    }

    #[test]
    fn manual_stop_keeps_interval_and_resets_offset() {
        let mut c = controller();
        c.cycle_duration();
        c.start();
        c.on_tick();
        c.on_tick();
        assert_eq!(c.display_offset(), 117);
        c.stop(StopReason::Manual);
        assert_eq!(c.phase(), Phase::LongBreak);
        assert_eq!(c.display_offset(), 135);
        assert_eq!(c.state(), TimerState::Stopped);
    }

    #[test]
    fn second_start_does_not_duplicate_tick_source() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_schedule_periodic().times(1).return_const(());
        let mut c = CountdownController::new(9, MINUTE, scheduler, ok_notifier(), any_renderer());
        c.start();
        c.start();
        assert!(c.is_running());
    }

    #[test]
    fn stop_while_stopped_is_noop() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_cancel().never();
        let mut c = CountdownController::new(9, MINUTE, scheduler, ok_notifier(), any_renderer());
        c.stop(StopReason::Automatic);
        assert_eq!(c.phase(), Phase::Focus);
        assert_eq!(c.display_offset(), 225);
    }

    #[test]
    fn tick_while_stopped_is_ignored() {
        let mut notifier = MockNotifier::new();
        notifier.expect_signal().never();
        let mut c = CountdownController::new(9, MINUTE, quiet_scheduler(), notifier, any_renderer());
        c.on_tick();
        assert_eq!(c.display_offset(), 225);
    }

    #[test]
    fn signal_failure_is_reported_and_stop_still_happens() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_signal()
            .times(1)
            .returning(|| Err(CounterError::Signal(std::io::Error::other("no player"))));
        notifier
            .expect_report_error()
            .withf(|msg: &str| msg.contains("no player"))
            .times(1)
            .return_const(());
        let mut c = CountdownController::new(9, MINUTE, quiet_scheduler(), notifier, any_renderer());
        while c.phase() != Phase::ShortBreak {
            c.cycle_duration();
        }
        c.start();
        for _ in 0..5 {
            c.on_tick();
        }
        assert!(!c.is_running());
        assert_eq!(c.phase(), Phase::Focus);
        assert_eq!(c.display_offset(), 225);
    }

    #[test]
    fn every_mutation_requests_redraw() {
        let mut renderer = MockRenderer::new();
        // cycle + start + tick + stop
        renderer.expect_request_redraw().times(4).return_const(());
        let mut c = CountdownController::new(9, MINUTE, quiet_scheduler(), ok_notifier(), renderer);
        c.cycle_duration();
        c.start();
        c.on_tick();
        c.stop(StopReason::Manual);
    }

    #[test]
    fn offset_stays_multiple_of_scale() {
        let mut c = CountdownController::new(7, MINUTE, quiet_scheduler(), ok_notifier(), any_renderer());
        c.start();
        for _ in 0..40 {
            assert_eq!(c.display_offset() % 7, 0);
            assert!(c.display_offset() <= c.minutes() * 7);
            c.on_tick();
        }
    }

    #[test]
    fn oversized_scale_is_capped_and_full_countdown_still_works() {
        let mut c = CountdownController::new(u32::MAX, MINUTE, quiet_scheduler(), ok_notifier(), any_renderer());
        assert_eq!(c.pixels_per_minute(), MAX_PIXELS_PER_MINUTE);
        assert_eq!(c.display_offset(), 25 * MAX_PIXELS_PER_MINUTE);
        c.start();
        for _ in 0..25 {
            c.on_tick();
        }
        assert_eq!(c.phase(), Phase::ShortBreak);
        assert_eq!(c.display_offset(), 5 * MAX_PIXELS_PER_MINUTE);
    }

    #[test]
    fn shutdown_cancels_running_timer() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_schedule_periodic().return_const(());
        scheduler.expect_cancel().times(1).return_const(());
        let mut c = CountdownController::new(9, MINUTE, scheduler, ok_notifier(), any_renderer());
        c.start();
        c.shutdown();
        assert!(!c.is_running());
        c.shutdown();
    }

    #[test]
    fn frame_scheduler_drives_countdown_and_drops_stray_ticks() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut c = CountdownController::new(9, MINUTE, FrameScheduler::new(), ok_notifier(), any_renderer());
        while c.phase() != Phase::ShortBreak {
            c.cycle_duration();
        }
        c.start();
        c.scheduler_mut().schedule_at(t0, MINUTE);

        // 卡顿一帧后一次性补上 7 个触发，走完 5 分钟后的触发被丢弃
        let due = c.scheduler_mut().poll(t0 + TimeDelta::minutes(7));
        assert_eq!(due, 7);
        for _ in 0..due {
            c.on_tick();
        }
        assert!(!c.is_running());
        assert!(!c.scheduler().is_scheduled());
        assert_eq!(c.phase(), Phase::Focus);
        assert_eq!(c.display_offset(), 225);
    }
}
