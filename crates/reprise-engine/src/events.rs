//! 引擎到宿主的事件通道
//!
//! 引擎内的非致命情况（录制已保存、写入失败、单元进度、计数器降级）
//! 不直接打印，而是投递到一条无界 channel，由宿主（CLI、测试）自行
//! 消费。发送端永不阻塞：没有接收者时事件被丢弃并留一条 trace。

use std::path::PathBuf;

/// 引擎事件
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessEvent {
    /// 录制成功落盘
    RecordingSaved { path: PathBuf, samples: usize },

    /// 输出写入失败（已降级）
    WriteFailed { path: PathBuf, detail: String },

    /// 一个扫描单元开始
    CellStarted {
        index: usize,
        total: usize,
        label: String,
    },

    /// 一个扫描单元完成
    CellCompleted {
        index: usize,
        label: String,
        output: Option<PathBuf>,
        rows: usize,
    },

    /// 某个性能计数器打开失败（该指标记 0）
    CounterDegraded { category: String, name: String },

    /// 全部单元完成
    SweepCompleted {
        cells: usize,
        manifest: Option<PathBuf>,
    },

    /// 扫描被宿主提前中断
    SweepInterrupted { completed_cells: usize },
}

/// 事件发送端
///
/// 可随意克隆；所有克隆共享同一条 channel。
#[derive(Clone)]
pub struct EventBus {
    tx: crossbeam_channel::Sender<HarnessEvent>,
}

impl EventBus {
    /// 创建事件通道，返回发送端和接收端
    pub fn channel() -> (EventBus, crossbeam_channel::Receiver<HarnessEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (EventBus { tx }, rx)
    }

    /// 创建没有接收者的发送端（事件全部丢弃，测试和无头场景用）
    pub fn sink() -> EventBus {
        let (bus, _rx) = Self::channel();
        bus
    }

    /// 投递一个事件（永不阻塞）
    pub fn emit(&self, event: HarnessEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("Event dropped, no receiver: {:?}", e.0);
        }
    }
}
