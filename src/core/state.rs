/// 单个块或单个任务的结果，由工作任务设置一次，协调器在汇合后读取
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Failed(String),
}

impl TaskStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }

    /// 失败原因
    pub fn reason(&self) -> Option<&str> {
        match self {
            TaskStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for TaskStatus {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => TaskStatus::Completed,
            Err(e) => TaskStatus::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DownloadError;

    #[test]
    fn test_status_from_result() {
        let ok: Result<(), DownloadError> = Ok(());
        assert_eq!(TaskStatus::from(ok), TaskStatus::Completed);

        let failed: Result<(), DownloadError> = Err(DownloadError::UnexpectedStatus { status: 500 });
        let status = TaskStatus::from(failed);
        assert!(status.is_failed());
        assert!(status.reason().unwrap().contains("500"));
    }

    #[test]
    fn test_status_default_is_pending() {
        let status = TaskStatus::default();
        assert!(!status.is_completed());
        assert!(!status.is_failed());
        assert_eq!(status.reason(), None);
    }
}
