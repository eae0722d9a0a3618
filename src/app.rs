//! egui 主界面：番茄图案、滑动刻度尺、指针，以及开始/停止、切换时长、退出

use std::sync::Arc;

use chrono::Utc;
use eframe::egui;

use crate::config::{self, CounterConfig};
use crate::counter::{CountdownController, StopReason, TimerState};
use crate::scheduler::FrameScheduler;
use crate::signal::{DesktopNotifier, supported_formats};

pub type Counter = CountdownController<FrameScheduler, DesktopNotifier, egui::Context>;

/// 界面配色
mod palette {
    /// 番茄红背景
    pub const BG_RGB: (u8, u8, u8) = (138, 8, 8);
    /// 番茄本体
    pub const TOMATO_RGB: (u8, u8, u8) = (214, 40, 30);
    /// 蒂叶
    pub const LEAF_RGB: (u8, u8, u8) = (46, 139, 60);
    /// 刻度尺底色
    pub const SCALE_BG_RGB: (u8, u8, u8) = (250, 240, 220);
    pub const SCALE_INK_RGB: (u8, u8, u8) = (40, 30, 30);
    /// 计时中指针（黑）与停止时指针（灰）
    pub const POINTER_RGB: (u8, u8, u8) = (20, 20, 20);
    pub const POINTER_STOP_RGB: (u8, u8, u8) = (150, 150, 150);
    pub const TEXT_WHITE: (u8, u8, u8) = (255, 255, 255);
}

fn rgb(c: (u8, u8, u8)) -> egui::Color32 {
    egui::Color32::from_rgb(c.0, c.1, c.2)
}

/// 刻度尺放大倍数：1 个刻度像素在屏幕上的逻辑像素
const SCALE_ZOOM: f32 = 3.0;
/// 刻度尺最长显示的分钟数
const SCALE_MAX_MINUTES: u32 = 25;
const SCALE_HEIGHT: f32 = 44.0;
const POINTER_WIDTH: f32 = 14.0;

/// 设置中文字体，避免中文乱码。优先使用系统自带字体。
fn setup_chinese_fonts(ctx: &egui::Context) {
    #[cfg(windows)]
    let system_font_paths = [
        r"C:\Windows\Fonts\msyh.ttc",   // 微软雅黑
        r"C:\Windows\Fonts\simhei.ttf", // 黑体
        r"C:\Windows\Fonts\simsun.ttc", // 宋体
    ];

    #[cfg(target_os = "macos")]
    let system_font_paths = ["/System/Library/Fonts/PingFang.ttc"];

    #[cfg(not(any(windows, target_os = "macos")))]
    let system_font_paths = [
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    ];

    for path in system_font_paths {
        if let Ok(bytes) = std::fs::read(path) {
            let mut fonts = egui::FontDefinitions::default();
            fonts.font_data.insert(
                "chinese".to_owned(),
                Arc::new(egui::FontData::from_owned(bytes)),
            );
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                fonts
                    .families
                    .entry(family)
                    .or_default()
                    .insert(0, "chinese".to_owned());
            }
            ctx.set_fonts(fonts);
            log::debug!("Loaded CJK font from {}", path);
            return;
        }
    }
    log::warn!("No CJK system font found, labels may not render");
}

/// 刻度尺左端的 x 坐标：0 分钟刻度与指针对齐后，按剩余位移左移
pub fn scale_origin_x(pointer_x: f32, display_offset: u32) -> f32 {
    pointer_x - display_offset as f32 * SCALE_ZOOM
}

/// 带文字居中显示的按钮，返回 Response（与 egui::Button 一致便于 .clicked()）
fn centered_button(ui: &mut egui::Ui, text: impl Into<egui::WidgetText>, size: egui::Vec2) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());
    let visuals = ui.style().interact(&response);
    let expanded = rect.expand(visuals.expansion);
    ui.painter().rect_filled(expanded, visuals.corner_radius, visuals.bg_fill);
    ui.painter().rect_stroke(
        expanded,
        visuals.corner_radius,
        visuals.bg_stroke,
        egui::StrokeKind::Outside,
    );
    let widget_text: egui::WidgetText = text.into();
    let galley = widget_text.into_galley(ui, None, rect.width() - 8.0, egui::TextStyle::Button);
    let pos = rect.center() - galley.size() / 2.0;
    let text_color = if ui.is_enabled() {
        ui.visuals().text_color()
    } else {
        ui.visuals().gray_out(ui.visuals().text_color())
    };
    ui.painter().galley(pos, galley, text_color);
    response
}

/// 用户命令（软键与按键共用）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    StartStop,
    CycleMinutes,
    Exit,
}

/// 按键：Enter 相当于手机的 SELECT 键（切换时长），空格开始/停止，Esc 退出。
/// 有控件获得焦点时 Enter/空格交给该控件，避免与按钮点击重复触发
fn shortcut_commands(
    pressed: impl Fn(egui::Key) -> bool,
    widget_focused: bool,
    running: bool,
) -> Vec<Command> {
    let mut commands = Vec::new();
    if !widget_focused {
        if pressed(egui::Key::Enter) && !running {
            commands.push(Command::CycleMinutes);
        }
        if pressed(egui::Key::Space) {
            commands.push(Command::StartStop);
        }
    }
    if pressed(egui::Key::Escape) {
        commands.push(Command::Exit);
    }
    commands
}

pub struct TomatoApp {
    counter: Counter,
    /// 待显示的错误提示（最早的在前）
    notices: Vec<String>,
}

impl TomatoApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &CounterConfig) -> Self {
        setup_chinese_fonts(&cc.egui_ctx);
        let notifier = DesktopNotifier::load(
            config.sound_file.as_deref(),
            &config::config_dir(),
            &config::cache_dir(),
            supported_formats(),
        );
        if notifier.sound().is_none() {
            log::warn!("No ring available, falling back to terminal bell");
        }
        let counter = CountdownController::new(
            config.pixels_per_minute,
            config.tick_period(),
            FrameScheduler::new(),
            notifier,
            cc.egui_ctx.clone(),
        );
        Self {
            counter,
            notices: Vec::new(),
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, command: Command) {
        log::debug!("Command: {:?}", command);
        match command {
            Command::StartStop => match self.counter.state() {
                TimerState::Running => self.counter.stop(StopReason::Manual),
                TimerState::Stopped => self.counter.start(),
            },
            Command::CycleMinutes => self.counter.cycle_duration(),
            Command::Exit => {
                self.counter.shutdown();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn key_commands(&self, ctx: &egui::Context) -> Vec<Command> {
        let widget_focused = ctx.memory(|m| m.focused().is_some());
        let running = self.counter.is_running();
        ctx.input(|i| shortcut_commands(|key| i.key_pressed(key), widget_focused, running))
    }

    /// 推进计时：取出本帧到期的触发并逐个交给状态机
    fn drive_ticks(&mut self, ctx: &egui::Context) {
        if !self.counter.scheduler().is_scheduled() {
            return;
        }
        let now = Utc::now();
        let due = self.counter.scheduler_mut().poll(now);
        for _ in 0..due {
            self.counter.on_tick();
        }
        if let Some(wait) = self.counter.scheduler().until_next(now) {
            ctx.request_repaint_after(wait);
        }
    }
}

impl eframe::App for TomatoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drive_ticks(ctx);
        self.notices.extend(self.counter.notifier_mut().take_notices());

        for command in self.key_commands(ctx) {
            self.dispatch(ctx, command);
        }

        let mut clicked = None;
        egui::TopBottomPanel::bottom("commands")
            .frame(egui::Frame::NONE.fill(rgb(palette::BG_RGB)).inner_margin(8.0))
            .show(ctx, |ui| {
                clicked = self.ui_command_bar(ui);
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(rgb(palette::BG_RGB)))
            .show(ctx, |ui| self.ui_counter(ui));

        if let Some(command) = clicked {
            self.dispatch(ctx, command);
        }

        if !self.notices.is_empty() {
            self.ui_notice(ctx);
        }
    }
}

impl TomatoApp {
    /// 底部软键栏
    fn ui_command_bar(&self, ui: &mut egui::Ui) -> Option<Command> {
        let btn_size = egui::vec2(96.0, 32.0);
        let running = self.counter.is_running();
        let mut clicked = None;
        ui.horizontal(|ui| {
            let label = if running { "停止" } else { "开始" };
            if centered_button(ui, label, btn_size).clicked() {
                clicked = Some(Command::StartStop);
            }
            let cycle = ui.add_enabled_ui(!running, |ui| centered_button(ui, "切换时长", btn_size));
            if cycle.inner.clicked() {
                clicked = Some(Command::CycleMinutes);
            }
            if centered_button(ui, "退出", btn_size).clicked() {
                clicked = Some(Command::Exit);
            }
        });
        clicked
    }

    /// 番茄 + 刻度尺 + 指针
    fn ui_counter(&self, ui: &mut egui::Ui) {
        let rect = ui.available_rect_before_wrap();
        let painter = ui.painter_at(rect);
        let center = rect.center();

        // 番茄本体与蒂叶
        let radius = (rect.width().min(rect.height()) * 0.42).max(40.0);
        painter.circle_filled(center, radius, rgb(palette::TOMATO_RGB));
        for angle in [-0.6f32, 0.0, 0.6] {
            let tip = center + egui::vec2(angle.sin(), -angle.cos()) * radius * 0.35
                - egui::vec2(0.0, radius * 0.85);
            painter.line_segment(
                [center - egui::vec2(0.0, radius * 0.95), tip],
                egui::Stroke::new(6.0, rgb(palette::LEAF_RGB)),
            );
        }

        // 刻度尺窗口
        let window = egui::Rect::from_center_size(
            center,
            egui::vec2(radius * 1.6, SCALE_HEIGHT),
        );
        painter.rect_filled(window, 4.0, rgb(palette::SCALE_BG_RGB));
        let scale_painter = painter.with_clip_rect(window);
        let ink = rgb(palette::SCALE_INK_RGB);
        let origin = scale_origin_x(center.x, self.counter.display_offset());
        let step = self.counter.pixels_per_minute() as f32 * SCALE_ZOOM;
        for minute in 0..=SCALE_MAX_MINUTES {
            let x = origin + minute as f32 * step;
            let major = minute % 5 == 0;
            let len = if major { 14.0 } else { 7.0 };
            scale_painter.line_segment(
                [egui::pos2(x, window.max.y), egui::pos2(x, window.max.y - len)],
                egui::Stroke::new(1.5, ink),
            );
            if major {
                scale_painter.text(
                    egui::pos2(x, window.min.y + 4.0),
                    egui::Align2::CENTER_TOP,
                    minute.to_string(),
                    egui::FontId::proportional(13.0),
                    ink,
                );
            }
        }

        // 指针：计时中为黑色，停止时为灰色
        let pointer_color = if self.counter.is_running() {
            rgb(palette::POINTER_RGB)
        } else {
            rgb(palette::POINTER_STOP_RGB)
        };
        let tip = egui::pos2(center.x, window.max.y - 2.0);
        painter.add(egui::Shape::convex_polygon(
            vec![
                tip,
                egui::pos2(center.x + POINTER_WIDTH / 2.0, window.max.y + POINTER_WIDTH),
                egui::pos2(center.x - POINTER_WIDTH / 2.0, window.max.y + POINTER_WIDTH),
            ],
            pointer_color,
            egui::Stroke::NONE,
        ));

        // 阶段与剩余分钟
        painter.text(
            egui::pos2(center.x, window.max.y + POINTER_WIDTH + 12.0),
            egui::Align2::CENTER_TOP,
            format!(
                "{} {} 分钟 · 剩余 {}",
                self.counter.phase().label(),
                self.counter.minutes(),
                self.counter.remaining_minutes()
            ),
            egui::FontId::proportional(16.0),
            rgb(palette::TEXT_WHITE),
        );
    }

    /// 错误提示窗口（非阻塞，点「确定」关闭）
    fn ui_notice(&mut self, ctx: &egui::Context) {
        let mut dismissed = false;
        egui::Window::new("异常")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(&self.notices[0]);
                    ui.add_space(12.0);
                    if ui.button("确定").clicked() {
                        dismissed = true;
                    }
                });
            });
        if dismissed {
            self.notices.remove(0);
        }
    }
}
