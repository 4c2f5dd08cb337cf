//! RAII single-slot holder for the current best animated artifact
//!
//! 槽位里最多一个产物：
//! - 更小的候选替换它 → 旧产物随 `ScratchFile` drop 被删除
//! - 否则新候选立即 drop（删除）
//! - 槽位本身 drop（提前返回、错误传播）→ 当前产物被删除

use std::path::PathBuf;

use shared_utils::{FileSize, ScratchFile, TrialParams};

/// One encoded trial on disk.
#[derive(Debug)]
pub struct Trial {
    pub file: ScratchFile,
    pub size: FileSize,
    pub params: TrialParams,
}

impl Trial {
    /// Keep the artifact on disk and hand over its path.
    pub fn into_path(self) -> PathBuf {
        self.file.persist()
    }
}

#[derive(Debug, Default)]
pub struct BestSlot {
    current: Option<Trial>,
}

impl BestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `trial` if it is strictly smaller than the held one.
    /// Returns whether it was kept.
    pub fn offer(&mut self, trial: Trial) -> bool {
        let keep = self
            .current
            .as_ref()
            .map_or(true, |best| trial.size < best.size);
        if keep {
            self.current = Some(trial);
        }
        keep
    }

    pub fn best(&self) -> Option<&Trial> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn take(&mut self) -> Option<Trial> {
        self.current.take()
    }
}
