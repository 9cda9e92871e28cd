//! 显示设备（HMD）刷新率协商
//!
//! 刷新率只在启动时协商一次，与扫描引擎完全解耦。
//! 设备缺失或拒绝请求都只降级：记录警告，继续以默认刷新率运行。

/// 显示设备能力接口
pub trait DisplayLink: Send + Sync {
    /// 设备支持的刷新率列表（Hz），设备缺失时为空
    fn supported_refresh_rates(&self) -> Vec<f64>;

    /// 请求切换刷新率，返回设备是否接受
    fn request_refresh_rate(&self, rate: f64) -> bool;
}

/// 一次性刷新率协商
///
/// 选择规则：
/// - `preferred` 给定且在支持列表中（±0.1 Hz 容差）则选它
/// - 否则选支持列表中的最高值
/// - 列表为空或设备拒绝时返回 `None`（调用方降级）
pub fn negotiate_refresh_rate(display: &dyn DisplayLink, preferred: Option<f64>) -> Option<f64> {
    let rates = display.supported_refresh_rates();
    if rates.is_empty() {
        tracing::warn!("Display reports no refresh rates, keeping default");
        return None;
    }

    let chosen = preferred
        .and_then(|p| rates.iter().copied().find(|r| (r - p).abs() < 0.1))
        .or_else(|| {
            if let Some(p) = preferred {
                tracing::warn!(
                    preferred = p,
                    "Preferred refresh rate unsupported, falling back to highest"
                );
            }
            rates.iter().copied().fold(None, |best, r| match best {
                Some(b) if b >= r => Some(b),
                _ => Some(r),
            })
        })?;

    if display.request_refresh_rate(chosen) {
        tracing::info!(rate = chosen, "Display refresh rate set");
        Some(chosen)
    } else {
        tracing::warn!(rate = chosen, "Display rejected refresh rate request");
        None
    }
}
