//! 集成测试共用件

use reprise_engine::TickSource;
use std::time::Duration;

/// 按脚本给定不规则步长的 tick 源，耗尽后返回 `None`
pub struct ScriptedTicks {
    dts: Vec<Duration>,
    cursor: usize,
}

impl ScriptedTicks {
    pub fn from_secs(dts: &[f64]) -> Self {
        ScriptedTicks {
            dts: dts.iter().map(|s| Duration::from_secs_f64(*s)).collect(),
            cursor: 0,
        }
    }
}

impl TickSource for ScriptedTicks {
    fn next_tick(&mut self) -> Option<Duration> {
        let dt = self.dts.get(self.cursor).copied();
        self.cursor += 1;
        dt
    }
}
