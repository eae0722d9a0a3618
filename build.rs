//! 构建时生成：提示音 ring.wav（写入 OUT_DIR，供 include_bytes! 打包）与 Windows 应用图标 icon.ico

use std::io::Write;

/// 番茄红（与界面背景一致）
const R: u8 = 138;
const G: u8 = 8;
const B: u8 = 8;

const SAMPLE_RATE: u32 = 22_050;

#[cfg_attr(not(windows), allow(dead_code))]
fn make_rgba_circle(size: u32) -> Vec<u8> {
    let cx = (size as f32) * 0.5;
    let cy = (size as f32) * 0.5;
    let r = (size as f32) * 0.44;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32) + 0.5 - cx;
            let dy = (y as f32) + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d <= r {
                rgba.extend_from_slice(&[R, G, B, 255]);
            } else {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    rgba
}

/// 三声短促的 880Hz 铃声，16 位单声道 PCM
fn make_ring_samples() -> Vec<i16> {
    let beep = SAMPLE_RATE as usize / 5;
    let gap = SAMPLE_RATE as usize / 10;
    let mut samples = Vec::with_capacity(3 * (beep + gap));
    for _ in 0..3 {
        for i in 0..beep {
            let t = i as f32 / SAMPLE_RATE as f32;
            // 首尾淡入淡出，避免爆音
            let fade = (i.min(beep - i) as f32 / 400.0).min(1.0);
            let v = (t * 880.0 * std::f32::consts::TAU).sin() * 0.6 * fade;
            samples.push((v * i16::MAX as f32) as i16);
        }
        samples.extend(std::iter::repeat_n(0, gap));
    }
    samples
}

fn write_wav(path: &std::path::Path, samples: &[i16]) -> std::io::Result<()> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // 单声道
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::File::create(path)?.write_all(&out)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
    write_wav(&out_dir.join("ring.wav"), &make_ring_samples()).expect("write ring.wav");

    #[cfg(windows)]
    {
        let icon_path = out_dir.join("icon.ico");

        let mut icon_dir = ico::IconDir::new(ico::ResourceType::Icon);
        for &size in &[16u32, 32u32, 48u32] {
            let rgba = make_rgba_circle(size);
            let image = ico::IconImage::from_rgba_data(size, size, rgba);
            let entry = ico::IconDirEntry::encode(&image).expect("encode icon entry");
            icon_dir.add_entry(entry);
        }

        let mut file = std::fs::File::create(&icon_path).expect("create icon.ico");
        icon_dir.write(&mut file).expect("write icon.ico");

        let mut res = winres::WindowsResource::new();
        res.set_icon(&icon_path.to_string_lossy());
        if let Err(e) = res.compile() {
            eprintln!("winres: {} (若未装 Windows SDK/rc.exe，可忽略，图标将不嵌入 exe)", e);
        }
    }
}
