//! 倒计时结束提示：提示音资源、格式协商、错误提示队列

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::CounterError;

/// 构建时生成的内置铃声
const BUNDLED_RING: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/ring.wav"));

/// 提示音文件名（不含扩展名）
pub const RING_STEM: &str = "ring";

/// 提示与错误报告
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    /// 播放提示音（尽力而为）
    fn signal(&mut self) -> Result<(), CounterError>;
    /// 向用户显示一条非阻塞的错误提示
    fn report_error(&mut self, message: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundFormat {
    Wav,
    Mpeg,
}

impl SoundFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            SoundFormat::Wav => "audio/x-wav",
            SoundFormat::Mpeg => "audio/mpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SoundFormat::Wav => "wav",
            SoundFormat::Mpeg => "mp3",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wav" => Some(SoundFormat::Wav),
            "mp3" => Some(SoundFormat::Mpeg),
            _ => None,
        }
    }
}

/// 当前平台播放器支持的格式（Media.SoundPlayer 只支持 wav）
#[cfg(windows)]
pub fn supported_formats() -> &'static [SoundFormat] {
    &[SoundFormat::Wav]
}

#[cfg(not(windows))]
pub fn supported_formats() -> &'static [SoundFormat] {
    &[SoundFormat::Mpeg, SoundFormat::Wav]
}

/// 用户放入配置目录的 ring.<ext> 按此格式查找：默认 mp3，平台支持 wav 时改用 wav
pub fn preferred_format(supported: &[SoundFormat]) -> SoundFormat {
    if supported.contains(&SoundFormat::Wav) {
        SoundFormat::Wav
    } else {
        SoundFormat::Mpeg
    }
}

/// 已就绪的提示音文件
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundAsset {
    pub path: PathBuf,
    pub format: SoundFormat,
}

impl SoundAsset {
    /// 在目录中查找 ring.<ext>
    pub fn locate(dir: &Path, format: SoundFormat) -> Result<Self, CounterError> {
        let path = dir.join(format!("{}.{}", RING_STEM, format.extension()));
        std::fs::metadata(&path)
            .map_err(|e| CounterError::resource_load(path.display().to_string(), e))?;
        Ok(Self { path, format })
    }

    /// 用户配置的提示音文件，按扩展名判断格式
    pub fn from_file(path: &Path, supported: &[SoundFormat]) -> Result<Self, CounterError> {
        let format = SoundFormat::from_path(path)
            .filter(|f| supported.contains(f))
            .ok_or_else(|| CounterError::UnsupportedSound {
                path: path.to_path_buf(),
            })?;
        std::fs::metadata(path)
            .map_err(|e| CounterError::resource_load(path.display().to_string(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            format,
        })
    }

    /// 把内置铃声写入目录（已存在且内容一致则跳过）
    pub fn install_bundled(dir: &Path) -> Result<Self, CounterError> {
        let path = dir.join(format!("{}.{}", RING_STEM, SoundFormat::Wav.extension()));
        let up_to_date = std::fs::read(&path).is_ok_and(|bytes| bytes == BUNDLED_RING);
        if !up_to_date {
            std::fs::create_dir_all(dir)
                .and_then(|_| std::fs::write(&path, BUNDLED_RING))
                .map_err(|e| CounterError::resource_load(path.display().to_string(), e))?;
            log::debug!("Installed bundled ring to {}", path.display());
        }
        Ok(Self {
            path,
            format: SoundFormat::Wav,
        })
    }

    fn player_command(&self) -> Command {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            let script = format!(
                "(New-Object Media.SoundPlayer '{}').PlaySync()",
                self.path.display().to_string().replace('\'', "''")
            );
            let mut cmd = Command::new("powershell");
            cmd.args(["-NoProfile", "-NonInteractive", "-Command", &script])
                .creation_flags(CREATE_NO_WINDOW);
            cmd
        }
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("afplay");
            cmd.arg(&self.path);
            cmd
        }
        #[cfg(not(any(windows, target_os = "macos")))]
        {
            let program = match self.format {
                SoundFormat::Wav => "paplay",
                SoundFormat::Mpeg => "mpg123",
            };
            let mut cmd = Command::new(program);
            if self.format == SoundFormat::Mpeg {
                cmd.arg("-q");
            }
            cmd.arg(&self.path);
            cmd
        }
    }

    /// 启动播放进程，不等待其结束
    pub fn play(&self) -> Result<(), CounterError> {
        spawn_reaped(self.player_command()).map(|_| ())
    }
}

/// 启动子进程，由后台线程等待其退出并回收
fn spawn_reaped(
    mut cmd: Command,
) -> Result<std::thread::JoinHandle<Option<std::process::ExitStatus>>, CounterError> {
    let mut child = cmd
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(CounterError::Signal)?;
    Ok(std::thread::spawn(move || match child.wait() {
        Ok(status) => {
            if !status.success() {
                log::warn!("Sound player exited with {}", status);
            }
            Some(status)
        }
        Err(e) => {
            log::warn!("Failed to wait for sound player: {}", e);
            None
        }
    }))
}

/// 无提示音资源时的降级提示：终端响铃
fn ring_bell() -> Result<(), CounterError> {
    use std::io::Write;
    let mut out = std::io::stdout();
    out.write_all(b"\x07")
        .and_then(|_| out.flush())
        .map_err(CounterError::Signal)
}

/// 桌面提示：播放提示音，错误进入提示队列由界面显示
#[derive(Debug, Default)]
pub struct DesktopNotifier {
    sound: Option<SoundAsset>,
    notices: Vec<String>,
}

impl DesktopNotifier {
    pub fn new(sound: Option<SoundAsset>) -> Self {
        Self {
            sound,
            notices: Vec::new(),
        }
    }

    /// 启动时加载提示音；失败则报告一次并以无提示音方式继续
    ///
    /// 查找顺序：配置中的 `sound_file`，`user_dir` 下按协商格式的 ring.<ext>，
    /// 最后是写入 `cache_dir` 的内置铃声（仅平台支持 wav 时）
    pub fn load(
        sound_file: Option<&Path>,
        user_dir: &Path,
        cache_dir: &Path,
        supported: &[SoundFormat],
    ) -> Self {
        let loaded = match sound_file {
            Some(path) => SoundAsset::from_file(path, supported),
            None => match SoundAsset::locate(user_dir, preferred_format(supported)) {
                Ok(asset) => Ok(asset),
                Err(_) if supported.contains(&SoundFormat::Wav) => {
                    SoundAsset::install_bundled(cache_dir)
                }
                Err(e) => Err(e),
            },
        };
        match loaded {
            Ok(asset) => {
                log::info!(
                    "Using {} ({})",
                    asset.path.display(),
                    asset.format.content_type()
                );
                Self::new(Some(asset))
            }
            Err(e) => {
                let mut notifier = Self::new(None);
                notifier.report_error(&e.to_string());
                notifier
            }
        }
    }

    pub fn sound(&self) -> Option<&SoundAsset> {
        self.sound.as_ref()
    }

    /// 取走待显示的提示，取走后清空
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

impl Notifier for DesktopNotifier {
    fn signal(&mut self) -> Result<(), CounterError> {
        match &self.sound {
            Some(asset) => asset.play(),
            None => ring_bell(),
        }
    }

    fn report_error(&mut self, message: &str) {
        log::error!("{}", message);
        self.notices.push(message.to_owned());
    }
}
