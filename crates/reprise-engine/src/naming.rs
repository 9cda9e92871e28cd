//! 输出文件命名
//!
//! 两类输出共用同一套时间戳语法（精确到秒）：
//!
//! ```text
//! MovementData_<yyyy-MM-dd_HH-mm-ss>.csv
//! RecordedData_<effect>_Passthrough<bool>_<yyyy-MM-dd_HH-mm-ss>.csv
//! ```
//!
//! 时间戳只到秒，快速 tick 源下同一秒内可能产生多个文件，
//! 这里按「时间戳加一秒直到无冲突」保证唯一，不扩展文件名语法。

use chrono::{DateTime, Duration as ChronoDuration, Local};
use reprise_scene::{EffectVariant, EnvironmentMode};
use std::path::{Path, PathBuf};

/// 轨迹录制文件前缀
pub const MOVEMENT_PREFIX: &str = "MovementData_";

/// 指标输出文件前缀
pub const METRICS_PREFIX: &str = "RecordedData_";

/// 输出文件扩展名
pub const LOG_EXTENSION: &str = ".csv";

/// 文件名时间戳格式
const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// 文件名是否符合轨迹录制命名
pub fn is_movement_log(file_name: &str) -> bool {
    file_name.starts_with(MOVEMENT_PREFIX) && file_name.ends_with(LOG_EXTENSION)
}

/// 轨迹录制文件名
pub fn movement_file_name(stamp: &DateTime<Local>) -> String {
    format!("{MOVEMENT_PREFIX}{}{LOG_EXTENSION}", stamp.format(STAMP_FORMAT))
}

/// 指标输出文件名
pub fn metrics_file_name(
    effect: EffectVariant,
    environment: EnvironmentMode,
    stamp: &DateTime<Local>,
) -> String {
    let flag = if environment.passthrough_flag() {
        "True"
    } else {
        "False"
    };
    format!(
        "{METRICS_PREFIX}{effect}_Passthrough{flag}_{}{LOG_EXTENSION}",
        stamp.format(STAMP_FORMAT)
    )
}

/// 扫描清单文件名
pub fn manifest_file_name(stamp: &DateTime<Local>) -> String {
    format!("SweepManifest_{}.json", stamp.format(STAMP_FORMAT))
}

/// 以当前时间为起点生成不冲突的路径
///
/// `render` 把一个时间戳变成文件名；已存在时把时间戳往后拨一秒重试。
pub fn unique_stamped_path(
    dir: &Path,
    render: impl Fn(&DateTime<Local>) -> String,
) -> PathBuf {
    unique_stamped_path_from(dir, Local::now(), render)
}

/// 以给定时间为起点生成不冲突的路径
///
/// 录制文件用录制开始的时刻命名，与落盘时刻无关。
pub fn unique_stamped_path_from(
    dir: &Path,
    start: DateTime<Local>,
    render: impl Fn(&DateTime<Local>) -> String,
) -> PathBuf {
    let mut stamp = start;
    loop {
        let candidate = dir.join(render(&stamp));
        if !candidate.exists() {
            return candidate;
        }
        stamp += ChronoDuration::seconds(1);
    }
}
